//! Shape tessellation helpers.
//!
//! Converts compound shapes and circles into renderer-friendly triangle meshes
//! (`crate::scene::Mesh2D`) using `lyon::tessellation::FillTessellator`.
//!
//! Notes:
//! - Glyph meshes are produced in the shape's *local* coordinates; the draw item carries
//!   the local -> world transform. Tweens then never force a re-tessellation.
//! - Winding / fill rule matters: fonts are usually authored for non-zero, but the
//!   style may ask for even-odd.

use lyon::math::Point;
use lyon::tessellation::{
    BuffersBuilder, FillOptions, FillRule, FillTessellator, FillVertex, FillVertexConstructor,
    VertexBuffers,
};

use crate::font::outline::CompoundShape;
use crate::scene::Mesh2D;

/// Tessellation options.
///
/// - `tolerance`: smaller => more triangles (smoother curves), larger => fewer.
/// - `fill_rule`: only used for circles; shapes carry their own in `ShapeStyle`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct TessellateOptions {
    pub tolerance: f32,
    pub fill_rule: FillRule,
}

impl Default for TessellateOptions {
    fn default() -> Self {
        Self {
            tolerance: 0.1,
            fill_rule: FillRule::NonZero,
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum TessellateError {
    #[error("lyon tessellation failed: {0}")]
    Lyon(String),
}

struct PositionCtor;

impl FillVertexConstructor<[f32; 2]> for PositionCtor {
    fn new_vertex(&mut self, v: FillVertex) -> [f32; 2] {
        let p = v.position();
        [p.x, p.y]
    }
}

/// Tessellate a compound shape (local coordinates) using its style's fill rule.
pub fn tessellate_shape(
    shape: &CompoundShape,
    opts: TessellateOptions,
) -> Result<Mesh2D, TessellateError> {
    let mut buffers: VertexBuffers<[f32; 2], u32> = VertexBuffers::new();
    if shape.is_empty() {
        return Ok(Mesh2D::default());
    }

    let fill = FillOptions::tolerance(opts.tolerance).with_fill_rule(shape.style.fill_rule);
    FillTessellator::new()
        .tessellate_path(
            &shape.to_path(),
            &fill,
            &mut BuffersBuilder::new(&mut buffers, PositionCtor),
        )
        .map_err(|e| TessellateError::Lyon(format!("{e:?}")))?;

    Ok(mesh_from_buffers(buffers))
}

/// Tessellate a filled circle in world coordinates.
pub fn tessellate_circle(
    center: Point,
    radius: f32,
    opts: TessellateOptions,
) -> Result<Mesh2D, TessellateError> {
    let mut buffers: VertexBuffers<[f32; 2], u32> = VertexBuffers::new();
    if radius <= 0.0 {
        return Ok(Mesh2D::default());
    }

    let fill = FillOptions::tolerance(opts.tolerance).with_fill_rule(opts.fill_rule);
    FillTessellator::new()
        .tessellate_circle(
            center,
            radius,
            &fill,
            &mut BuffersBuilder::new(&mut buffers, PositionCtor),
        )
        .map_err(|e| TessellateError::Lyon(format!("{e:?}")))?;

    Ok(mesh_from_buffers(buffers))
}

#[inline]
fn mesh_from_buffers(buffers: VertexBuffers<[f32; 2], u32>) -> Mesh2D {
    Mesh2D {
        positions: buffers.vertices,
        indices: buffers.indices,
    }
}
