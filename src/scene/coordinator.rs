//! SceneCoordinator: the composition root of the core.
//!
//! Owns the stage (background + glyph), the tween engine, the outline source and the
//! interaction controller, and is the only writer of node properties outside tweens.
//!
//! Lifecycle:
//! - `new`: zero-radius background at the viewport center; glyph `Pending`.
//! - `load(ch)` / `on_outline_loaded(result)`: build the glyph (hidden) and run the
//!   entrance: background grows to cover the viewport, then the disc grows while the
//!   glyph fades in from 1.5x, then the hit-zone is armed.
//! - `resize`: snap everything to the new viewport (no tweens). A no-op for the glyph
//!   until a load has succeeded.
//! - `tick(dt)`: advance tweens and route their events to the entrance and the
//!   controller.
//!
//! Pointer input arrives as window-pixel positions; the coordinator hit-tests the
//! hit-zone and synthesizes enter/leave/down/up for the controller.

use std::time::Duration;

use log::{debug, error, info, warn};
use lyon::math::{Point, point};

use crate::anim::sequence::Sequence;
use crate::anim::{
    CircleDelta, DEFAULT_OVERSHOOT, Ease, Motion, PropertyKind, PropertyValue, ShapeDelta,
    TweenEngine,
};
use crate::font::outline::{OutlineCommand, ShapeStyle};
use crate::font::tessellate::{TessellateError, TessellateOptions};
use crate::font::transform::Square;
use crate::font::{FontError, OutlineSource};
use crate::interact::{
    EventResponse, InteractionConfig, InteractionContext, InteractionController, PointerEvent,
};
use crate::scene::{
    BACKGROUND, Circle, DISC, DrawItem2D, GLYPH, GlyphNodes, Relayout, Rgba, Stage,
    prepare_glyph,
};

/// Viewport in window pixels.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    #[inline]
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    #[inline]
    pub fn center(&self) -> Point {
        point(self.width * 0.5, self.height * 0.5)
    }

    /// Radius that covers the whole viewport from its center.
    #[inline]
    pub fn cover_radius(&self) -> f32 {
        self.width.max(self.height)
    }

    /// `min(width / divisor, height / divisor, cap)`.
    #[inline]
    pub fn target_size(&self, divisor: f32, cap: f32) -> f32 {
        (self.width / divisor).min(self.height / divisor).min(cap)
    }
}

/// Scene-level tunables.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneConfig {
    pub size_divisor: f32,
    pub size_cap: f32,
    pub background: Rgba,
    pub disc: Rgba,
    pub glyph_style: ShapeStyle,
    pub background_in: Motion,
    pub glyph_in: Motion,
    /// Glyph scale the entrance starts from.
    pub glyph_in_scale: f32,
    pub interaction: InteractionConfig,
    pub tessellation: TessellateOptions,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            size_divisor: 3.0,
            size_cap: 250.0,
            background: Rgba::BLACK,
            disc: Rgba::WHITE,
            glyph_style: ShapeStyle::default(),
            background_in: Motion::new(500, Ease::InCirc),
            glyph_in: Motion::new(400, Ease::OutBack(DEFAULT_OVERSHOOT)),
            glyph_in_scale: 1.5,
            interaction: InteractionConfig::default(),
            tessellation: TessellateOptions::default(),
        }
    }
}

impl SceneConfig {
    #[inline]
    pub fn with_interaction(mut self, interaction: InteractionConfig) -> Self {
        self.interaction = interaction;
        self
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum GlyphStatus {
    Pending,
    Ready,
    Failed,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum EntranceStep {
    BackgroundIn,
    GlyphIn,
    Arm,
}

pub struct SceneCoordinator {
    viewport: Viewport,
    config: SceneConfig,
    status: GlyphStatus,
    stage: Stage,
    tweens: TweenEngine,
    outlines: Box<dyn OutlineSource>,
    controller: InteractionController,
    entrance: Option<Sequence<EntranceStep>>,
    pointer_inside: bool,
}

impl SceneCoordinator {
    pub fn new(viewport: Viewport, config: SceneConfig, outlines: Box<dyn OutlineSource>) -> Self {
        let controller = InteractionController::new(config.interaction.clone());
        Self::with_controller(viewport, config, outlines, controller)
    }

    /// Like `new`, with a caller-built controller (e.g. a seeded rng).
    pub fn with_controller(
        viewport: Viewport,
        config: SceneConfig,
        outlines: Box<dyn OutlineSource>,
        controller: InteractionController,
    ) -> Self {
        let background = Circle::new(viewport.center(), 0.0, config.background);
        Self {
            viewport,
            config,
            status: GlyphStatus::Pending,
            stage: Stage::new(background),
            tweens: TweenEngine::new(),
            outlines,
            controller,
            entrance: None,
            pointer_inside: false,
        }
    }

    #[inline]
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    #[inline]
    pub fn status(&self) -> GlyphStatus {
        self.status
    }

    #[inline]
    pub fn is_ready(&self) -> bool {
        self.status == GlyphStatus::Ready
    }

    #[inline]
    pub fn stage(&self) -> &Stage {
        &self.stage
    }

    #[inline]
    pub fn controller(&self) -> &InteractionController {
        &self.controller
    }

    #[inline]
    pub fn tweens(&self) -> &TweenEngine {
        &self.tweens
    }

    /// Whether the entrance choreography is still running.
    #[inline]
    pub fn is_entering(&self) -> bool {
        self.entrance.is_some()
    }

    /// Current glyph target size for this viewport.
    #[inline]
    pub fn target_size(&self) -> f32 {
        self.size_for(self.viewport)
    }

    #[inline]
    fn size_for(&self, viewport: Viewport) -> f32 {
        viewport.target_size(self.config.size_divisor, self.config.size_cap)
    }

    /// Fetch `ch` from the outline source and hand the result to `on_outline_loaded`.
    pub fn load(&mut self, ch: char) -> Result<(), FontError> {
        self.status = GlyphStatus::Pending;
        let result = self.outlines.outline(ch);
        self.on_outline_loaded(result)
    }

    /// Accept a finished glyph load.
    ///
    /// A failure leaves the scene not ready (interaction and resize stay no-ops) and is
    /// returned to the caller unchanged; nothing is retried here.
    pub fn on_outline_loaded(
        &mut self,
        result: Result<Vec<OutlineCommand>, FontError>,
    ) -> Result<(), FontError> {
        let commands = match result {
            Ok(commands) => commands,
            Err(err) => {
                error!("glyph load failed: {err}");
                self.status = GlyphStatus::Failed;
                return Err(err);
            }
        };

        let center = self.viewport.center();
        let size = self.target_size();
        let shape = prepare_glyph(&commands, self.config.glyph_style);
        let mut glyph = GlyphNodes::new(shape, center, size, self.config.disc);
        glyph.disc.radius = 0.0;

        self.controller.disarm();
        self.stage.background.center = center;
        self.stage.set_glyph(glyph);
        self.status = GlyphStatus::Ready;
        info!("glyph loaded ({} commands); size {size}", commands.len());

        self.entrance = Some(Sequence::new("entrance", [
            EntranceStep::BackgroundIn,
            EntranceStep::GlyphIn,
            EntranceStep::Arm,
        ]));
        self.pump_entrance();
        Ok(())
    }

    /// Snap the scene to a new viewport. No animation.
    ///
    /// Tweens already moving a radius or position are remapped onto the new layout, so
    /// they finish where a fresh layout would have put the node.
    pub fn resize(&mut self, viewport: Viewport) {
        let previous = self.viewport;
        self.viewport = viewport;
        if !self.is_ready() {
            debug!("resize to {viewport:?} deferred: glyph {:?}", self.status);
            return;
        }

        let backdrop = Relayout::new(
            Square::new(previous.center(), previous.cover_radius()),
            Square::new(viewport.center(), viewport.cover_radius()),
        );
        let layout = Relayout::new(
            Square::new(previous.center(), self.size_for(previous)),
            Square::new(viewport.center(), self.target_size()),
        );

        let background = &mut self.stage.background;
        background.center = backdrop.to.center;
        background.radius = backdrop.length(background.radius);
        if let Some(glyph) = self.stage.glyph_mut() {
            glyph.relayout(layout);
        }

        let backdrop_fn = move |v: PropertyValue| backdrop.value(v);
        let layout_fn = move |v: PropertyValue| layout.value(v);
        self.tweens.retarget(BACKGROUND, PropertyKind::Radius, backdrop_fn);
        self.tweens.retarget(BACKGROUND, PropertyKind::Position, backdrop_fn);
        self.tweens.retarget(DISC, PropertyKind::Radius, layout_fn);
        self.tweens.retarget(DISC, PropertyKind::Position, layout_fn);
        self.tweens.retarget(GLYPH, PropertyKind::Position, layout_fn);
        debug!("resized to {viewport:?}; size {}", layout.to.size);
    }

    /// Advance all tweens by `dt` and run whatever they unblock.
    pub fn tick(&mut self, dt: Duration) {
        let events = self.tweens.tick(dt, &mut self.stage);
        for event in events {
            if let Some(entrance) = self.entrance.as_mut() {
                if entrance.notify(event) {
                    self.pump_entrance();
                } else if entrance.is_finished() {
                    warn!("entrance interrupted; arming input");
                    self.entrance = None;
                    self.controller.arm();
                }
            }

            let size = self.target_size();
            let mut ctx = InteractionContext {
                stage: &mut self.stage,
                tweens: &mut self.tweens,
                outlines: self.outlines.as_ref(),
                size,
            };
            self.controller.on_tween_event(event, &mut ctx);
        }
    }

    /// Flatten the stage for rendering.
    pub fn draw_items(&self) -> Result<Vec<DrawItem2D>, TessellateError> {
        self.stage.draw_items(self.config.tessellation)
    }

    /// Deliver a hit-zone event directly.
    pub fn dispatch(&mut self, event: PointerEvent) -> EventResponse {
        if !self.is_ready() {
            return EventResponse::Ignored;
        }
        let size = self.target_size();
        let mut ctx = InteractionContext {
            stage: &mut self.stage,
            tweens: &mut self.tweens,
            outlines: self.outlines.as_ref(),
            size,
        };
        self.controller.handle(event, &mut ctx)
    }

    /// Cursor moved to `p`; synthesizes enter/leave on hit-zone crossings.
    pub fn pointer_moved(&mut self, p: Point) -> EventResponse {
        let inside = self.stage.hit_test(p);
        if inside == self.pointer_inside {
            return EventResponse::Ignored;
        }
        self.pointer_inside = inside;
        self.dispatch(if inside {
            PointerEvent::Enter
        } else {
            PointerEvent::Leave
        })
    }

    pub fn pointer_pressed(&mut self, p: Point) -> EventResponse {
        self.pointer_moved(p);
        if !self.pointer_inside {
            return EventResponse::Ignored;
        }
        self.dispatch(PointerEvent::Down)
    }

    pub fn pointer_released(&mut self, p: Point) -> EventResponse {
        let crossed = self.pointer_moved(p);
        if !self.pointer_inside {
            return crossed;
        }
        self.dispatch(PointerEvent::Up)
    }

    /// The cursor left the window.
    pub fn pointer_left(&mut self) -> EventResponse {
        if !self.pointer_inside {
            return EventResponse::Ignored;
        }
        self.pointer_inside = false;
        self.dispatch(PointerEvent::Leave)
    }

    fn pump_entrance(&mut self) {
        let Some(entrance) = self.entrance.as_mut() else {
            return;
        };

        while let Some(step) = entrance.next_ready() {
            debug!("entrance step {step:?}");
            let wait = match step {
                EntranceStep::BackgroundIn => {
                    let m = self.config.background_in;
                    Some(self.tweens.animate(
                        &self.stage,
                        BACKGROUND,
                        [CircleDelta::Radius(self.viewport.cover_radius())],
                        m.duration,
                        m.ease,
                    ))
                }
                EntranceStep::GlyphIn => {
                    let size = self
                        .viewport
                        .target_size(self.config.size_divisor, self.config.size_cap);
                    if let Some(glyph) = self.stage.glyph_mut() {
                        glyph.shape.placement.scale = self.config.glyph_in_scale;
                    }
                    let m = self.config.glyph_in;
                    self.tweens.animate(
                        &self.stage,
                        DISC,
                        [CircleDelta::Radius(size)],
                        m.duration,
                        m.ease,
                    );
                    Some(self.tweens.animate(
                        &self.stage,
                        GLYPH,
                        [ShapeDelta::Scale(1.0), ShapeDelta::Opacity(1.0)],
                        m.duration,
                        m.ease,
                    ))
                }
                EntranceStep::Arm => {
                    self.controller.arm();
                    None
                }
            };
            entrance.wait_for(wait);
        }

        if entrance.is_finished() {
            info!("entrance finished");
            self.entrance = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anim::TweenTarget;

    struct NoFont;

    impl OutlineSource for NoFont {
        fn outline(&self, ch: char) -> Result<Vec<OutlineCommand>, FontError> {
            Err(FontError::MissingGlyph { ch })
        }
    }

    fn block() -> Vec<OutlineCommand> {
        vec![
            OutlineCommand::MoveTo(point(0.0, 0.0)),
            OutlineCommand::LineTo(point(800.0, 0.0)),
            OutlineCommand::LineTo(point(800.0, 900.0)),
            OutlineCommand::LineTo(point(0.0, 900.0)),
            OutlineCommand::ClosePath,
        ]
    }

    #[test]
    fn target_size_is_a_third_capped() {
        assert_eq!(Viewport::new(900.0, 600.0).target_size(3.0, 250.0), 200.0);
        assert_eq!(Viewport::new(300.0, 300.0).target_size(3.0, 250.0), 100.0);
        assert_eq!(Viewport::new(3000.0, 2400.0).target_size(3.0, 250.0), 250.0);
    }

    #[test]
    fn construction_centers_a_zero_background() {
        let scene = SceneCoordinator::new(
            Viewport::new(800.0, 400.0),
            SceneConfig::default(),
            Box::new(NoFont),
        );
        assert_eq!(scene.stage().background.center, point(400.0, 200.0));
        assert_eq!(scene.stage().background.radius, 0.0);
        assert!(scene.stage().glyph().is_none());
        assert_eq!(scene.status(), GlyphStatus::Pending);
    }

    #[test]
    fn failed_load_stays_not_ready() {
        let mut scene = SceneCoordinator::new(
            Viewport::new(800.0, 400.0),
            SceneConfig::default(),
            Box::new(NoFont),
        );
        assert!(matches!(
            scene.load('집'),
            Err(FontError::MissingGlyph { ch: '집' })
        ));
        assert_eq!(scene.status(), GlyphStatus::Failed);

        scene.resize(Viewport::new(100.0, 100.0));
        assert_eq!(scene.stage().background.radius, 0.0);
        assert_eq!(scene.dispatch(PointerEvent::Down), EventResponse::Ignored);
        assert_eq!(scene.pointer_pressed(point(50.0, 50.0)), EventResponse::Ignored);
    }

    #[test]
    fn interrupted_entrance_still_arms_input() {
        let mut scene = SceneCoordinator::new(
            Viewport::new(900.0, 600.0),
            SceneConfig::default(),
            Box::new(NoFont),
        );
        scene.on_outline_loaded(Ok(block())).expect("loaded");
        assert!(scene.is_entering());

        let id = scene
            .tweens
            .driving(BACKGROUND.node(), PropertyKind::Radius)
            .expect("background entrance running");
        assert!(scene.tweens.cancel(id));
        scene.tick(Duration::from_millis(10));

        assert!(!scene.is_entering());
        assert!(scene.controller().handlers().down);
        assert_eq!(scene.dispatch(PointerEvent::Down), EventResponse::Consumed);
    }
}
