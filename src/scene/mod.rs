//! Scene graph for the syllable view.
//!
//! The stage is deliberately small and fixed-shape:
//! - one **background** circle that grows to cover the viewport,
//! - one **glyph** made of a white disc and the compound glyph shape, both inside a
//!   group that scales about the disc center, plus an invisible **hit-zone** circle
//!   (outside the group, so pressing the glyph does not shrink its own hit region).
//!
//! Everything is in window pixels, Y down. Renderers consume the flattened
//! `DrawItem2D` list; the tween engine reaches node properties through
//! [`PropertyHost`].
//!
//! The stage holds no animation state of its own: transforms are plain values that the
//! `SceneCoordinator` snaps and the tween engine interpolates.

pub mod coordinator;

use lyon::math::{Point, Transform};

use crate::anim::{
    CircleDelta, GroupDelta, NodeId, PropertyHost, PropertyKind, PropertyValue, ShapeDelta,
    TweenTarget,
};
use crate::font::outline::{CompoundShape, OutlineCommand, ShapeStyle, compile};
use crate::font::tessellate::{
    TessellateError, TessellateOptions, tessellate_circle, tessellate_shape,
};
use crate::font::transform::{Square, fit_to_box, flip_vertical, recenter};

/// Simple RGBA color (linear space assumed; the renderer targets an sRGB view).
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Rgba {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Rgba {
    pub const WHITE: Self = Self::new(1.0, 1.0, 1.0, 1.0);
    pub const BLACK: Self = Self::new(0.0, 0.0, 0.0, 1.0);
    pub const TRANSPARENT: Self = Self::new(0.0, 0.0, 0.0, 0.0);

    #[inline]
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Multiply alpha by `opacity`.
    #[inline]
    pub fn with_opacity(self, opacity: f32) -> Self {
        Self {
            a: self.a * opacity.clamp(0.0, 1.0),
            ..self
        }
    }

    #[inline]
    pub fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

/// An owned CPU triangle mesh, 2D positions only.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh2D {
    pub positions: Vec<[f32; 2]>,
    pub indices: Vec<u32>,
}

impl Mesh2D {
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty() || self.indices.is_empty()
    }
}

/// A draw item produced by flattening the stage.
///
/// - `transform` maps mesh coordinates to window pixels.
/// - `z` is painter's order; higher draws later.
#[derive(Debug, Clone)]
pub struct DrawItem2D {
    pub mesh: Mesh2D,
    pub fill: Rgba,
    pub transform: Transform,
    pub z: i32,
}

/// A filled circle.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Circle {
    pub center: Point,
    pub radius: f32,
    pub fill: Rgba,
    pub opacity: f32,
}

impl Circle {
    #[inline]
    pub fn new(center: Point, radius: f32, fill: Rgba) -> Self {
        Self {
            center,
            radius,
            fill,
            opacity: 1.0,
        }
    }

    #[inline]
    pub fn contains(&self, p: Point) -> bool {
        (p - self.center).square_length() <= self.radius * self.radius
    }

    #[inline]
    fn is_visible(&self) -> bool {
        self.radius > 0.0 && self.opacity > 0.0
    }
}

/// Uniform scale applied to a set of nodes about `pivot`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Group {
    pub pivot: Point,
    pub scale: f32,
}

impl Group {
    #[inline]
    pub fn transform(&self) -> Transform {
        Transform::translation(-self.pivot.x, -self.pivot.y)
            .then_scale(self.scale, self.scale)
            .then_translate(self.pivot.to_vector())
    }
}

/// The nodes that make up the interactive glyph.
#[derive(Debug, Clone)]
pub struct GlyphNodes {
    pub group: Group,
    pub disc: Circle,
    pub shape: CompoundShape,
    pub hit_zone: Circle,
}

impl GlyphNodes {
    /// Disc, hit-zone and group pivot at `center` with radius `size`; the shape fitted
    /// to a `size` box around `center`.
    pub fn new(mut shape: CompoundShape, center: Point, size: f32, disc_fill: Rgba) -> Self {
        fit_to_box(&mut shape, Square::new(center, size));
        let mut hit_zone = Circle::new(center, size, Rgba::TRANSPARENT);
        hit_zone.opacity = 0.0;
        Self {
            group: Group {
                pivot: center,
                scale: 1.0,
            },
            disc: Circle::new(center, size, disc_fill),
            shape,
            hit_zone,
        }
    }

    /// Snap every node onto a new layout. Values caught mid-tween keep their relative
    /// place (lengths scale, positions translate); transient scale/rotation are kept.
    pub fn relayout(&mut self, layout: Relayout) {
        let center = layout.to.center;
        self.group.pivot = center;
        self.disc.center = center;
        self.disc.radius = layout.length(self.disc.radius);
        self.hit_zone.center = center;
        self.hit_zone.radius = layout.to.size;

        let position = layout.point(self.shape.placement.position);
        fit_to_box(&mut self.shape, layout.to);
        self.shape.placement.position = position;
    }
}

/// Maps values laid out for one square onto another: positions move with the center,
/// lengths scale with the size.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Relayout {
    pub from: Square,
    pub to: Square,
}

impl Relayout {
    #[inline]
    pub fn new(from: Square, to: Square) -> Self {
        Self { from, to }
    }

    #[inline]
    pub fn point(&self, p: Point) -> Point {
        p + (self.to.center - self.from.center)
    }

    /// A degenerate source size maps everything to the target size.
    #[inline]
    pub fn length(&self, v: f32) -> f32 {
        if self.from.size > f32::EPSILON {
            v * self.to.size / self.from.size
        } else {
            self.to.size
        }
    }

    pub fn value(&self, v: PropertyValue) -> PropertyValue {
        match v {
            PropertyValue::Scalar(s) => PropertyValue::Scalar(self.length(s)),
            PropertyValue::Point(p) => PropertyValue::Point(self.point(p)),
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct CircleNode(NodeId);

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct ShapeNode(NodeId);

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct GroupNode(NodeId);

impl TweenTarget for CircleNode {
    type Delta = CircleDelta;

    #[inline]
    fn node(self) -> NodeId {
        self.0
    }
}

impl TweenTarget for ShapeNode {
    type Delta = ShapeDelta;

    #[inline]
    fn node(self) -> NodeId {
        self.0
    }
}

impl TweenTarget for GroupNode {
    type Delta = GroupDelta;

    #[inline]
    fn node(self) -> NodeId {
        self.0
    }
}

pub const BACKGROUND: CircleNode = CircleNode(NodeId(0));
pub const GROUP: GroupNode = GroupNode(NodeId(1));
pub const DISC: CircleNode = CircleNode(NodeId(2));
pub const GLYPH: ShapeNode = ShapeNode(NodeId(3));
pub const HIT_ZONE: CircleNode = CircleNode(NodeId(4));

/// Background plus (once loaded) the glyph.
#[derive(Debug, Clone)]
pub struct Stage {
    pub background: Circle,
    glyph: Option<GlyphNodes>,
}

impl Stage {
    pub fn new(background: Circle) -> Self {
        Self {
            background,
            glyph: None,
        }
    }

    #[inline]
    pub fn glyph(&self) -> Option<&GlyphNodes> {
        self.glyph.as_ref()
    }

    #[inline]
    pub fn glyph_mut(&mut self) -> Option<&mut GlyphNodes> {
        self.glyph.as_mut()
    }

    #[inline]
    pub fn set_glyph(&mut self, glyph: GlyphNodes) {
        self.glyph = Some(glyph);
    }

    /// Swap the displayed glyph shape in one assignment and return the outgoing one.
    ///
    /// No frame can observe zero or two glyph shapes.
    pub fn replace_glyph(&mut self, shape: CompoundShape) -> Option<CompoundShape> {
        let glyph = self.glyph.as_mut()?;
        Some(std::mem::replace(&mut glyph.shape, shape))
    }

    /// Whether `p` (window pixels) is inside the glyph hit-zone.
    #[inline]
    pub fn hit_test(&self, p: Point) -> bool {
        self.glyph.as_ref().is_some_and(|g| g.hit_zone.contains(p))
    }

    /// Flatten visible nodes into z-ordered draw items. The hit-zone is never drawn.
    pub fn draw_items(&self, opts: TessellateOptions) -> Result<Vec<DrawItem2D>, TessellateError> {
        let mut items = Vec::new();

        if self.background.is_visible() {
            items.push(DrawItem2D {
                mesh: tessellate_circle(self.background.center, self.background.radius, opts)?,
                fill: self.background.fill.with_opacity(self.background.opacity),
                transform: Transform::identity(),
                z: 0,
            });
        }

        let Some(glyph) = &self.glyph else {
            return Ok(items);
        };
        let group = glyph.group.transform();

        if glyph.disc.is_visible() {
            items.push(DrawItem2D {
                mesh: tessellate_circle(glyph.disc.center, glyph.disc.radius, opts)?,
                fill: glyph.disc.fill.with_opacity(glyph.disc.opacity),
                transform: group,
                z: 1,
            });
        }

        let shape = &glyph.shape;
        if let Some(fill) = shape.style.fill
            && shape.opacity > 0.0
            && !shape.is_empty()
        {
            items.push(DrawItem2D {
                mesh: tessellate_shape(shape, opts)?,
                fill: fill.with_opacity(shape.opacity),
                transform: shape.world_transform().then(&group),
                z: 2,
            });
        }

        Ok(items)
    }

    fn circle(&self, node: NodeId) -> Option<&Circle> {
        match node {
            n if n == BACKGROUND.node() => Some(&self.background),
            n if n == DISC.node() => self.glyph.as_ref().map(|g| &g.disc),
            n if n == HIT_ZONE.node() => self.glyph.as_ref().map(|g| &g.hit_zone),
            _ => None,
        }
    }

    fn circle_mut(&mut self, node: NodeId) -> Option<&mut Circle> {
        match node {
            n if n == BACKGROUND.node() => Some(&mut self.background),
            n if n == DISC.node() => self.glyph.as_mut().map(|g| &mut g.disc),
            n if n == HIT_ZONE.node() => self.glyph.as_mut().map(|g| &mut g.hit_zone),
            _ => None,
        }
    }
}

impl PropertyHost for Stage {
    fn read(&self, node: NodeId, kind: PropertyKind) -> Option<PropertyValue> {
        use PropertyValue::{Point as P, Scalar as S};

        if let Some(c) = self.circle(node) {
            return match kind {
                PropertyKind::Radius => Some(S(c.radius)),
                PropertyKind::Position => Some(P(c.center)),
                PropertyKind::Opacity => Some(S(c.opacity)),
                _ => None,
            };
        }

        let glyph = self.glyph.as_ref()?;
        if node == GLYPH.node() {
            let p = glyph.shape.placement;
            return match kind {
                PropertyKind::Scale => Some(S(p.scale)),
                PropertyKind::Rotation => Some(S(p.rotation)),
                PropertyKind::Position => Some(P(p.position)),
                PropertyKind::Opacity => Some(S(glyph.shape.opacity)),
                PropertyKind::Radius => None,
            };
        }
        if node == GROUP.node() && kind == PropertyKind::Scale {
            return Some(S(glyph.group.scale));
        }
        None
    }

    fn write(&mut self, node: NodeId, kind: PropertyKind, value: PropertyValue) {
        if let Some(c) = self.circle_mut(node) {
            match (kind, value) {
                (PropertyKind::Radius, PropertyValue::Scalar(v)) => c.radius = v,
                (PropertyKind::Position, PropertyValue::Point(p)) => c.center = p,
                (PropertyKind::Opacity, PropertyValue::Scalar(v)) => c.opacity = v,
                _ => {}
            }
            return;
        }

        let Some(glyph) = self.glyph.as_mut() else {
            return;
        };
        if node == GLYPH.node() {
            let shape = &mut glyph.shape;
            match (kind, value) {
                (PropertyKind::Scale, PropertyValue::Scalar(v)) => shape.placement.scale = v,
                (PropertyKind::Rotation, PropertyValue::Scalar(v)) => shape.placement.rotation = v,
                (PropertyKind::Position, PropertyValue::Point(p)) => shape.placement.position = p,
                (PropertyKind::Opacity, PropertyValue::Scalar(v)) => shape.opacity = v,
                _ => {}
            }
        } else if node == GROUP.node()
            && let (PropertyKind::Scale, PropertyValue::Scalar(v)) = (kind, value)
        {
            glyph.group.scale = v;
        }
    }
}

/// Build the shape that takes `current`'s place when the glyph is swapped mid-gesture.
///
/// The new outline is flipped (font Y-up to window Y-down), fitted to `size`, placed on
/// `current`'s world center with its scale and rotation, and shown at full opacity with
/// `current`'s style copied.
pub fn replace(current: &CompoundShape, commands: &[OutlineCommand], size: f32) -> CompoundShape {
    let mut next = compile(commands).with_style(current.style);
    let pivot = next.local_center();
    flip_vertical(&mut next, pivot);

    let center = current
        .bounds()
        .map_or(current.placement.position, |b| b.center());
    fit_to_box(&mut next, Square::new(center, size));
    next.placement.scale = current.placement.scale;
    next.placement.rotation = current.placement.rotation;
    recenter(&mut next, center);
    next.opacity = 1.0;
    next
}

/// Compile a freshly loaded glyph for display: flipped and hidden (opacity 0).
pub fn prepare_glyph(commands: &[OutlineCommand], style: ShapeStyle) -> CompoundShape {
    let mut shape = compile(commands).with_style(style);
    let pivot = shape.local_center();
    flip_vertical(&mut shape, pivot);
    shape.opacity = 0.0;
    shape
}
