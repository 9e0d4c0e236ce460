//! Geometric helpers for compiled glyph shapes.
//!
//! - `fit_to_box`: uniform rescale so the larger dimension matches a square box, then
//!   move the shape's center onto the box center.
//! - `flip_vertical`: mirror across a horizontal axis. Font outlines are Y-up while the
//!   render surface is Y-down, so every glyph goes through this once.
//! - `recenter`: translate so the world bounds center lands on a point.
//!
//! Cloning is `CompoundShape::clone`: contours are owned `Vec`s, so a clone never
//! aliases the original.

use lyon::math::{Point, point};

use crate::font::outline::CompoundShape;

/// An axis-aligned square described by its center and side length.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Square {
    pub center: Point,
    pub size: f32,
}

impl Square {
    #[inline]
    pub fn new(center: Point, size: f32) -> Self {
        Self { center, size }
    }
}

/// Rescale the shape's resting outline so its larger dimension equals `target.size`
/// and place its center at `target.center`.
///
/// Transient placement scale/rotation (e.g. from a running tween) is left untouched;
/// only the geometry and the position change. Re-applying with the same box is a no-op
/// within floating point tolerance.
pub fn fit_to_box(shape: &mut CompoundShape, target: Square) {
    let Some(bounds) = shape.local_bounds() else {
        shape.placement.position = target.center;
        return;
    };

    let extent = bounds.width().max(bounds.height());
    if extent > f32::EPSILON {
        let factor = target.size / extent;
        let pivot = bounds.center();
        shape.map_points(|p| pivot + (p - pivot) * factor);
    }
    shape.placement.position = target.center;
}

/// Mirror every anchor and control point across the horizontal line `y = around.y`
/// (local coordinates).
///
/// Applying it twice with the same axis restores the input.
pub fn flip_vertical(shape: &mut CompoundShape, around: Point) {
    let axis2 = 2.0 * around.y;
    shape.map_points(|p| point(p.x, axis2 - p.y));
}

/// Translate the shape so its world bounds center equals `target`. Never rescales.
pub fn recenter(shape: &mut CompoundShape, target: Point) {
    let Some(bounds) = shape.bounds() else {
        shape.placement.position = target;
        return;
    };
    shape.placement.position += target - bounds.center();
}
