//! Glyph outline compilation.
//!
//! A font describes a glyph as an ordered stream of drawing commands
//! (move/line/quad/curve/close). This module turns such a stream into a
//! [`CompoundShape`]: a set of contours that share one style and one placement
//! transform, and that can be measured, transformed and tessellated as a unit.
//!
//! Coordinates:
//! - Contours are stored in *local* units (font units straight out of the outline,
//!   later rescaled by `font::transform::fit_to_box`).
//! - `Placement` maps local space into world space: the local bounds center is moved to
//!   `position`, scaled by `scale`, and rotated by `rotation` degrees (clockwise on a
//!   Y-down surface).
//!
//! Contour order is preserved exactly as the `MoveTo`s appear in the stream. Fill rule
//! resolution for nested contours (holes) depends on it.

use std::fmt::Write as _;

use kurbo::PathEl;
use log::{trace, warn};
use lyon::geom::{CubicBezierSegment, LineSegment, QuadraticBezierSegment};
use lyon::math::{Angle, Box2D, Point, Transform, point};
use lyon::path::Path;
use lyon::tessellation::FillRule;

use crate::scene::Rgba;

/// One instruction of a glyph outline, as produced by a font source.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum OutlineCommand {
    MoveTo(Point),
    LineTo(Point),
    CubicCurveTo {
        ctrl1: Point,
        ctrl2: Point,
        to: Point,
    },
    QuadraticCurveTo {
        ctrl: Point,
        to: Point,
    },
    ClosePath,
    /// A command this crate does not understand (kept so sources can pass it through).
    Unknown(char),
}

/// A segment between two consecutive anchors of a contour.
///
/// The segment start is implied by the previous anchor.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Segment {
    Line { to: Point },
    Quadratic { ctrl: Point, to: Point },
    Cubic { ctrl1: Point, ctrl2: Point, to: Point },
}

impl Segment {
    #[inline]
    pub fn to(&self) -> Point {
        match *self {
            Segment::Line { to } | Segment::Quadratic { to, .. } | Segment::Cubic { to, .. } => to,
        }
    }

    fn map(self, f: impl Fn(Point) -> Point) -> Self {
        match self {
            Segment::Line { to } => Segment::Line { to: f(to) },
            Segment::Quadratic { ctrl, to } => Segment::Quadratic {
                ctrl: f(ctrl),
                to: f(to),
            },
            Segment::Cubic { ctrl1, ctrl2, to } => Segment::Cubic {
                ctrl1: f(ctrl1),
                ctrl2: f(ctrl2),
                to: f(to),
            },
        }
    }

    /// Tight bounds of the curve starting at `from`.
    fn bounds(&self, from: Point) -> Box2D {
        match *self {
            Segment::Line { to } => LineSegment { from, to }.bounding_box(),
            Segment::Quadratic { ctrl, to } => {
                QuadraticBezierSegment { from, ctrl, to }.bounding_box()
            }
            Segment::Cubic { ctrl1, ctrl2, to } => CubicBezierSegment {
                from,
                ctrl1,
                ctrl2,
                to,
            }
            .bounding_box(),
        }
    }
}

/// Box union that keeps degenerate (zero-area) boxes, e.g. of horizontal lines.
#[inline]
pub(crate) fn union(a: Box2D, b: Box2D) -> Box2D {
    Box2D::new(a.min.min(b.min), a.max.max(b.max))
}

/// One loop of connected segments.
#[derive(Debug, Clone, PartialEq)]
pub struct Contour {
    pub start: Point,
    pub segments: Vec<Segment>,
    pub closed: bool,
}

impl Contour {
    pub fn new(start: Point) -> Self {
        Self {
            start,
            segments: Vec::new(),
            closed: false,
        }
    }

    fn map_points(&mut self, f: impl Fn(Point) -> Point + Copy) {
        self.start = f(self.start);
        for seg in &mut self.segments {
            *seg = seg.map(f);
        }
    }

    fn bounds_with(&self, xf: &Transform) -> Box2D {
        let mut from = xf.transform_point(self.start);
        let mut bounds = Box2D::new(from, from);
        for seg in &self.segments {
            let seg = seg.map(|p| xf.transform_point(p));
            bounds = union(bounds, seg.bounds(from));
            from = seg.to();
        }
        bounds
    }
}

/// Immutable style descriptor. Copied, never shared, when a shape is built.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ShapeStyle {
    pub fill: Option<Rgba>,
    pub fill_rule: FillRule,
}

impl Default for ShapeStyle {
    fn default() -> Self {
        Self {
            fill: Some(Rgba::BLACK),
            fill_rule: FillRule::NonZero,
        }
    }
}

/// Where a shape sits in world space.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Placement {
    /// World position of the local bounds center.
    pub position: Point,
    /// Uniform scale about the local bounds center.
    pub scale: f32,
    /// Rotation in degrees. Not normalized; 370 is a valid value.
    pub rotation: f32,
}

impl Default for Placement {
    fn default() -> Self {
        Self {
            position: point(0.0, 0.0),
            scale: 1.0,
            rotation: 0.0,
        }
    }
}

/// A styled collection of contours rendered and transformed as a unit.
#[derive(Debug, Clone, PartialEq)]
pub struct CompoundShape {
    contours: Vec<Contour>,
    pub style: ShapeStyle,
    pub placement: Placement,
    pub opacity: f32,
}

impl Default for CompoundShape {
    fn default() -> Self {
        Self {
            contours: Vec::new(),
            style: ShapeStyle::default(),
            placement: Placement::default(),
            opacity: 1.0,
        }
    }
}

impl CompoundShape {
    #[inline]
    pub fn with_style(mut self, style: ShapeStyle) -> Self {
        self.style = style;
        self
    }

    #[inline]
    pub fn contours(&self) -> &[Contour] {
        &self.contours
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.contours.is_empty()
    }

    /// Bounds of the untransformed contours.
    pub fn local_bounds(&self) -> Option<Box2D> {
        self.bounds_with(&Transform::identity())
    }

    /// Pivot of the placement transform: the local bounds center.
    pub fn local_center(&self) -> Point {
        self.local_bounds()
            .map_or(point(0.0, 0.0), |b| b.center())
    }

    /// Local -> world transform built from `placement`.
    pub fn world_transform(&self) -> Transform {
        let pivot = self.local_center();
        let p = self.placement;
        Transform::translation(-pivot.x, -pivot.y)
            .then_scale(p.scale, p.scale)
            .then_rotate(Angle::degrees(p.rotation))
            .then_translate(p.position.to_vector())
    }

    /// Tight world-space bounds (curves included, not just control points).
    pub fn bounds(&self) -> Option<Box2D> {
        self.bounds_with(&self.world_transform())
    }

    fn bounds_with(&self, xf: &Transform) -> Option<Box2D> {
        self.contours
            .iter()
            .map(|c| c.bounds_with(xf))
            .reduce(union)
    }

    /// Apply `f` to every anchor and control point of every contour.
    pub(crate) fn map_points(&mut self, f: impl Fn(Point) -> Point + Copy) {
        for contour in &mut self.contours {
            contour.map_points(f);
        }
    }

    /// Build a lyon path in local coordinates.
    pub fn to_path(&self) -> Path {
        let mut b = Path::builder();
        for contour in &self.contours {
            b.begin(contour.start);
            for seg in &contour.segments {
                match *seg {
                    Segment::Line { to } => {
                        b.line_to(to);
                    }
                    Segment::Quadratic { ctrl, to } => {
                        b.quadratic_bezier_to(ctrl, to);
                    }
                    Segment::Cubic { ctrl1, ctrl2, to } => {
                        b.cubic_bezier_to(ctrl1, ctrl2, to);
                    }
                }
            }
            b.end(contour.closed);
        }
        b.build()
    }

    /// Absolute SVG-style path data for the local contours.
    pub fn to_path_data(&self) -> String {
        let mut out = String::new();
        for contour in &self.contours {
            let _ = write!(out, "M{} {}", contour.start.x, contour.start.y);
            for seg in &contour.segments {
                let _ = match *seg {
                    Segment::Line { to } => write!(out, "L{} {}", to.x, to.y),
                    Segment::Quadratic { ctrl, to } => {
                        write!(out, "Q{} {} {} {}", ctrl.x, ctrl.y, to.x, to.y)
                    }
                    Segment::Cubic { ctrl1, ctrl2, to } => write!(
                        out,
                        "C{} {} {} {} {} {}",
                        ctrl1.x, ctrl1.y, ctrl2.x, ctrl2.y, to.x, to.y
                    ),
                };
            }
            if contour.closed {
                out.push('Z');
            }
        }
        out
    }
}

/// A problem found while compiling an outline. Compilation always continues.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum OutlineIssue {
    /// A drawing command arrived before any `MoveTo`; it was skipped.
    MalformedOutline {
        index: usize,
        command: OutlineCommand,
    },
}

/// Single-pass compiler from outline commands to a `CompoundShape`.
///
/// The shape under construction is private until `finish`, so callers never observe a
/// partial build.
#[derive(Debug, Default)]
pub struct PathCompiler {
    shape: CompoundShape,
    issues: Vec<OutlineIssue>,
}

impl PathCompiler {
    pub fn new() -> Self {
        Self::default()
    }

    fn current(&mut self) -> Option<&mut Contour> {
        self.shape.contours.last_mut()
    }

    /// Feed one command. `index` is only used for issue reporting.
    pub fn push(&mut self, index: usize, command: OutlineCommand) {
        let segment = match command {
            OutlineCommand::MoveTo(p) => {
                // An unclosed previous contour stays open.
                self.shape.contours.push(Contour::new(p));
                return;
            }
            OutlineCommand::ClosePath => {
                if let Some(contour) = self.current() {
                    contour.closed = true;
                }
                return;
            }
            OutlineCommand::Unknown(tag) => {
                trace!("ignoring unknown outline command {tag:?} at {index}");
                return;
            }
            OutlineCommand::LineTo(to) => Segment::Line { to },
            OutlineCommand::QuadraticCurveTo { ctrl, to } => Segment::Quadratic { ctrl, to },
            OutlineCommand::CubicCurveTo { ctrl1, ctrl2, to } => {
                Segment::Cubic { ctrl1, ctrl2, to }
            }
        };

        match self.current() {
            Some(contour) => contour.segments.push(segment),
            None => {
                warn!("outline command {command:?} at {index} has no open contour; skipped");
                self.issues
                    .push(OutlineIssue::MalformedOutline { index, command });
            }
        }
    }

    pub fn finish(self) -> (CompoundShape, Vec<OutlineIssue>) {
        (self.shape, self.issues)
    }
}

/// Compile an outline command stream, also returning the issues that were skipped.
pub fn compile_with_report<'a>(
    commands: impl IntoIterator<Item = &'a OutlineCommand>,
) -> (CompoundShape, Vec<OutlineIssue>) {
    let mut compiler = PathCompiler::new();
    for (index, command) in commands.into_iter().enumerate() {
        compiler.push(index, *command);
    }
    compiler.finish()
}

/// Compile an outline command stream into a compound shape (one contour per `MoveTo`).
pub fn compile<'a>(commands: impl IntoIterator<Item = &'a OutlineCommand>) -> CompoundShape {
    compile_with_report(commands).0
}

/// Errors from [`parse_path_data`].
#[derive(thiserror::Error, Debug)]
pub enum PathDataError {
    #[error("invalid path data: {0}")]
    Svg(#[from] kurbo::SvgParseError),
}

/// Parse SVG path data into outline commands.
///
/// Relative commands, implicit repeats, `H`/`V`, smooth curves and arcs are resolved by
/// `kurbo`; the result only contains absolute move/line/quad/cubic/close commands.
pub fn parse_path_data(data: &str) -> Result<Vec<OutlineCommand>, PathDataError> {
    let path = kurbo::BezPath::from_svg(data)?;
    Ok(path.elements().iter().map(|el| command_from_el(*el)).collect())
}

fn command_from_el(el: PathEl) -> OutlineCommand {
    let p = |p: kurbo::Point| point(p.x as f32, p.y as f32);
    match el {
        PathEl::MoveTo(to) => OutlineCommand::MoveTo(p(to)),
        PathEl::LineTo(to) => OutlineCommand::LineTo(p(to)),
        PathEl::QuadTo(ctrl, to) => OutlineCommand::QuadraticCurveTo {
            ctrl: p(ctrl),
            to: p(to),
        },
        PathEl::CurveTo(ctrl1, ctrl2, to) => OutlineCommand::CubicCurveTo {
            ctrl1: p(ctrl1),
            ctrl2: p(ctrl2),
            to: p(to),
        },
        PathEl::ClosePath => OutlineCommand::ClosePath,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn square(x: f32, y: f32, w: f32) -> Vec<OutlineCommand> {
        vec![
            OutlineCommand::MoveTo(point(x, y)),
            OutlineCommand::LineTo(point(x + w, y)),
            OutlineCommand::LineTo(point(x + w, y + w)),
            OutlineCommand::LineTo(point(x, y + w)),
            OutlineCommand::ClosePath,
        ]
    }

    #[test]
    fn one_contour_per_move_to_in_order() {
        let mut cmds = square(0.0, 0.0, 10.0);
        cmds.extend(square(20.0, 0.0, 5.0));
        cmds.extend(square(40.0, 0.0, 2.0));

        let shape = compile(&cmds);
        let starts: Vec<Point> = shape.contours().iter().map(|c| c.start).collect();
        assert_eq!(
            starts,
            vec![point(0.0, 0.0), point(20.0, 0.0), point(40.0, 0.0)]
        );
        assert!(shape.contours().iter().all(|c| c.closed));
        assert!(shape.contours().iter().all(|c| c.segments.len() == 3));
    }

    #[test]
    fn move_to_leaves_previous_contour_open() {
        let cmds = [
            OutlineCommand::MoveTo(point(0.0, 0.0)),
            OutlineCommand::LineTo(point(5.0, 0.0)),
            OutlineCommand::MoveTo(point(10.0, 10.0)),
            OutlineCommand::LineTo(point(15.0, 10.0)),
            OutlineCommand::ClosePath,
        ];
        let shape = compile(&cmds);
        assert_eq!(shape.contours().len(), 2);
        assert!(!shape.contours()[0].closed);
        assert!(shape.contours()[1].closed);
    }

    #[test]
    fn drawing_before_move_to_is_skipped_and_reported() {
        let cmds = [
            OutlineCommand::LineTo(point(1.0, 1.0)),
            OutlineCommand::QuadraticCurveTo {
                ctrl: point(2.0, 2.0),
                to: point(3.0, 3.0),
            },
            OutlineCommand::MoveTo(point(0.0, 0.0)),
            OutlineCommand::LineTo(point(4.0, 0.0)),
        ];
        let (shape, issues) = compile_with_report(&cmds);

        assert_eq!(shape.contours().len(), 1);
        assert_eq!(shape.contours()[0].segments, vec![Segment::Line {
            to: point(4.0, 0.0)
        }]);
        assert_eq!(issues.len(), 2);
        assert!(matches!(
            issues[0],
            OutlineIssue::MalformedOutline { index: 0, .. }
        ));
    }

    #[test]
    fn unknown_commands_are_ignored() {
        let cmds = [
            OutlineCommand::MoveTo(point(0.0, 0.0)),
            OutlineCommand::Unknown('A'),
            OutlineCommand::LineTo(point(1.0, 0.0)),
        ];
        let (shape, issues) = compile_with_report(&cmds);
        assert_eq!(shape.contours()[0].segments.len(), 1);
        assert!(issues.is_empty());
    }

    #[test]
    fn curve_bounds_are_tight() {
        // Control points reach y = 10 but the curve only reaches y = 7.5.
        let cmds = [
            OutlineCommand::MoveTo(point(0.0, 0.0)),
            OutlineCommand::CubicCurveTo {
                ctrl1: point(0.0, 10.0),
                ctrl2: point(10.0, 10.0),
                to: point(10.0, 0.0),
            },
        ];
        let bounds = compile(&cmds).local_bounds().expect("non-empty");
        assert!((bounds.max.y - 7.5).abs() < 1e-4, "{bounds:?}");
        assert!((bounds.max.x - 10.0).abs() < 1e-4);
    }

    #[test]
    fn world_bounds_follow_placement() {
        let mut shape = compile(&square(0.0, 0.0, 10.0));
        shape.placement = Placement {
            position: point(100.0, 50.0),
            scale: 2.0,
            rotation: 0.0,
        };
        let b = shape.bounds().expect("non-empty");
        assert!((b.min.x - 90.0).abs() < 1e-4);
        assert!((b.max.y - 60.0).abs() < 1e-4);

        shape.placement.rotation = 90.0;
        let c = shape.bounds().expect("non-empty").center();
        assert!((c.x - 100.0).abs() < 1e-3 && (c.y - 50.0).abs() < 1e-3);
    }

    #[test]
    fn path_data_parses_all_commands() {
        let cmds = parse_path_data("M0 0 L10,0 Q15 5 10 10 C5 12 -2 8 0 0 Z").expect("valid");
        assert_eq!(cmds, vec![
            OutlineCommand::MoveTo(point(0.0, 0.0)),
            OutlineCommand::LineTo(point(10.0, 0.0)),
            OutlineCommand::QuadraticCurveTo {
                ctrl: point(15.0, 5.0),
                to: point(10.0, 10.0),
            },
            OutlineCommand::CubicCurveTo {
                ctrl1: point(5.0, 12.0),
                ctrl2: point(-2.0, 8.0),
                to: point(0.0, 0.0),
            },
            OutlineCommand::ClosePath,
        ]);
    }

    #[test]
    fn path_data_resolves_relative_and_repeated_commands() {
        let cmds = parse_path_data("m10 10 l5 0 0 5 L0 0 1 1 z").expect("valid");
        assert_eq!(cmds, vec![
            OutlineCommand::MoveTo(point(10.0, 10.0)),
            OutlineCommand::LineTo(point(15.0, 10.0)),
            OutlineCommand::LineTo(point(15.0, 15.0)),
            OutlineCommand::LineTo(point(0.0, 0.0)),
            OutlineCommand::LineTo(point(1.0, 1.0)),
            OutlineCommand::ClosePath,
        ]);
    }

    #[test]
    fn path_data_rejects_malformed_input() {
        assert!(matches!(
            parse_path_data("M 0 0 L 5"),
            Err(PathDataError::Svg(_))
        ));
        assert!(parse_path_data("M 0 0 X 1 1").is_err());
    }

    #[test]
    fn path_data_writes_back_what_it_reads() {
        let text = "M0 0L10 0Q15 5 10 10ZM20 20L30 20";
        let shape = compile(&parse_path_data(text).expect("valid"));
        assert_eq!(shape.to_path_data(), text);
    }
}
