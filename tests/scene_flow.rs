//! End-to-end scene behavior with an in-memory outline source.

use std::time::Duration;

use lyon::math::point;
use pretty_assertions::assert_eq;
use rand::SeedableRng;
use rand::rngs::StdRng;

use syllable::font::outline::{OutlineCommand, parse_path_data};
use syllable::font::{FontError, OutlineSource};
use syllable::interact::{
    EventResponse, HandlerSet, InteractionConfig, InteractionController, InteractionState,
    PointerEvent,
};
use syllable::scene::coordinator::{GlyphStatus, SceneConfig, SceneCoordinator, Viewport};

/// Font-unit outlines (Y up), keyed by character.
struct Outlines;

impl OutlineSource for Outlines {
    fn outline(&self, ch: char) -> Result<Vec<OutlineCommand>, FontError> {
        let data = match ch {
            // Two strokes and a closed loop, roughly a syllable block.
            '집' => "M0 0L800 0L800 300L0 300Z M100 400L700 400L700 900L100 900Z M250 550L250 750L550 750L550 550Z",
            'A' => "M0 0L100 0L50 400Z",
            'B' => "M0 0L600 0Q650 100 600 200L0 200Z",
            _ => return Err(FontError::MissingGlyph { ch }),
        };
        parse_path_data(data).map_err(|e| FontError::Other(e.to_string()))
    }
}

fn scene_with(viewport: Viewport, config: SceneConfig) -> SceneCoordinator {
    let controller = InteractionController::with_rng(
        config.interaction.clone(),
        Box::new(StdRng::seed_from_u64(42)),
    );
    SceneCoordinator::with_controller(viewport, config, Box::new(Outlines), controller)
}

fn scene(width: f32, height: f32) -> SceneCoordinator {
    scene_with(Viewport::new(width, height), SceneConfig::default())
}

fn run_for(scene: &mut SceneCoordinator, millis: u64) {
    for _ in 0..millis / 10 {
        scene.tick(Duration::from_millis(10));
    }
}

fn glyph_extent(scene: &SceneCoordinator) -> f32 {
    let b = scene
        .stage()
        .glyph()
        .expect("glyph")
        .shape
        .bounds()
        .expect("bounds");
    b.width().max(b.height())
}

fn close(a: f32, b: f32) -> bool {
    (a - b).abs() < 1e-2
}

#[test]
fn resize_snaps_to_the_new_target_size() {
    let mut scene = scene(900.0, 600.0);
    assert_eq!(scene.target_size(), 200.0);
    scene.load('집').unwrap();
    run_for(&mut scene, 1000);
    assert!(!scene.is_entering());
    assert!(close(glyph_extent(&scene), 200.0), "{}", glyph_extent(&scene));

    scene.resize(Viewport::new(300.0, 300.0));
    assert_eq!(scene.target_size(), 100.0);

    // Applied immediately, without any tween.
    assert!(scene.tweens().is_idle());
    let glyph = scene.stage().glyph().expect("glyph");
    assert_eq!(glyph.disc.radius, 100.0);
    assert_eq!(glyph.hit_zone.radius, 100.0);
    assert_eq!(glyph.disc.center, point(150.0, 150.0));
    assert!(close(glyph_extent(&scene), 100.0));
    let center = glyph.shape.bounds().expect("bounds").center();
    assert!(close(center.x, 150.0) && close(center.y, 150.0));
    assert_eq!(scene.stage().background.center, point(150.0, 150.0));
    assert_eq!(scene.stage().background.radius, 300.0);
}

#[test]
fn resize_while_pending_only_records_the_viewport() {
    let mut scene = scene(900.0, 600.0);
    assert_eq!(scene.status(), GlyphStatus::Pending);

    scene.resize(Viewport::new(300.0, 300.0));
    assert_eq!(scene.stage().background.center, point(450.0, 300.0));
    assert!(scene.stage().glyph().is_none());

    // The load then builds against the latest viewport.
    scene.load('집').unwrap();
    let glyph = scene.stage().glyph().expect("glyph");
    assert_eq!(glyph.hit_zone.center, point(150.0, 150.0));
    assert_eq!(glyph.hit_zone.radius, 100.0);
    assert_eq!(scene.stage().background.center, point(150.0, 150.0));
}

#[test]
fn failed_load_is_surfaced_once_and_blocks_everything() {
    let mut scene = scene(900.0, 600.0);
    let err = scene.load('?').unwrap_err();
    assert!(matches!(err, FontError::MissingGlyph { ch: '?' }));
    assert_eq!(scene.status(), GlyphStatus::Failed);

    scene.resize(Viewport::new(300.0, 300.0));
    run_for(&mut scene, 1000);
    assert_eq!(scene.stage().background.radius, 0.0);
    assert_eq!(scene.pointer_pressed(point(150.0, 150.0)), EventResponse::Ignored);
    assert_eq!(scene.dispatch(PointerEvent::Down), EventResponse::Ignored);

    // A fresh load recovers.
    scene.load('A').unwrap();
    assert!(scene.is_ready());
}

#[test]
fn entrance_runs_strictly_in_order() {
    let mut scene = scene(900.0, 600.0);
    scene.load('집').unwrap();

    let glyph = scene.stage().glyph().expect("glyph");
    assert_eq!(glyph.disc.radius, 0.0);
    assert_eq!(glyph.shape.opacity, 0.0);
    assert_eq!(scene.controller().handlers(), HandlerSet::NONE);

    run_for(&mut scene, 250);
    let radius = scene.stage().background.radius;
    assert!(radius > 0.0 && radius < 900.0, "{radius}");
    assert_eq!(scene.stage().glyph().expect("glyph").disc.radius, 0.0);
    assert_eq!(scene.dispatch(PointerEvent::Down), EventResponse::Ignored);

    // Background done: the glyph entrance starts from 1.5x, still transparent.
    run_for(&mut scene, 250);
    assert_eq!(scene.stage().background.radius, 900.0);
    let glyph = scene.stage().glyph().expect("glyph");
    assert_eq!(glyph.shape.placement.scale, 1.5);
    assert_eq!(glyph.shape.opacity, 0.0);
    assert!(!scene.controller().handlers().down);

    run_for(&mut scene, 390);
    assert!(!scene.controller().handlers().down);
    assert!(scene.stage().glyph().expect("glyph").disc.radius > 0.0);

    run_for(&mut scene, 10);
    let glyph = scene.stage().glyph().expect("glyph");
    assert_eq!(glyph.disc.radius, 200.0);
    assert_eq!(glyph.shape.placement.scale, 1.0);
    assert_eq!(glyph.shape.opacity, 1.0);
    assert!(scene.controller().handlers().down);
    assert!(!scene.is_entering());
}

#[test]
fn click_activates_and_rearms() {
    let mut scene = scene(900.0, 600.0);
    scene.load('집').unwrap();
    run_for(&mut scene, 1000);

    let center = point(450.0, 300.0);
    assert_eq!(scene.pointer_pressed(center), EventResponse::Consumed);
    assert_eq!(scene.controller().state(), InteractionState::Pressed);
    run_for(&mut scene, 100);

    assert_eq!(scene.pointer_released(center), EventResponse::Consumed);
    assert_eq!(scene.controller().state(), InteractionState::ReturningFromPress);
    assert_eq!(scene.pointer_pressed(center), EventResponse::Ignored);

    run_for(&mut scene, 200);
    assert_eq!(scene.controller().state(), InteractionState::Idle);
    run_for(&mut scene, 200);

    let glyph = scene.stage().glyph().expect("glyph");
    assert_eq!(glyph.group.scale, 1.0);
    assert_eq!(glyph.shape.placement.scale, 1.0);
    assert_eq!(glyph.shape.placement.rotation, 0.0);
    assert_eq!(glyph.shape.placement.position, center);
    assert!(scene.tweens().is_idle());
}

#[test]
fn dragging_off_restores_without_activation() {
    let mut scene = scene(900.0, 600.0);
    scene.load('집').unwrap();
    run_for(&mut scene, 1000);

    scene.pointer_pressed(point(450.0, 300.0));
    run_for(&mut scene, 50);
    assert_eq!(scene.pointer_moved(point(10.0, 10.0)), EventResponse::Consumed);
    assert_eq!(scene.controller().state(), InteractionState::ReturningFromLeave);
    assert_eq!(scene.pointer_released(point(10.0, 10.0)), EventResponse::Ignored);

    run_for(&mut scene, 200);
    let glyph = scene.stage().glyph().expect("glyph");
    assert_eq!(glyph.group.scale, 1.0);
    assert_eq!(glyph.shape.placement.rotation, 0.0);
    assert_eq!(scene.controller().state(), InteractionState::Idle);
    assert!(scene.controller().handlers().down);
}

#[test]
fn activation_cycles_replacement_glyphs_in_place() {
    let config = SceneConfig::default()
        .with_interaction(InteractionConfig::default().with_replacements(['A', 'B']));
    let mut scene = scene_with(Viewport::new(900.0, 600.0), config);
    scene.load('집').unwrap();
    run_for(&mut scene, 1000);

    let center = point(450.0, 300.0);
    for expect_wide in [false, true, false] {
        scene.pointer_pressed(center);
        scene.pointer_released(center);

        let shape = &scene.stage().glyph().expect("glyph").shape;
        let local = shape.local_bounds().expect("bounds");
        assert_eq!(local.width() > local.height(), expect_wide);
        let c = shape.bounds().expect("bounds").center();
        assert!(close(c.x, center.x) && close(c.y, center.y), "{c:?}");

        run_for(&mut scene, 400);
        assert!(close(glyph_extent(&scene), 200.0));
    }
}

#[test]
fn resize_during_glyph_entrance_lands_on_the_new_layout() {
    let mut scene = scene(900.0, 600.0);
    scene.load('집').unwrap();
    run_for(&mut scene, 600);
    assert!(scene.is_entering());

    scene.resize(Viewport::new(300.0, 300.0));
    run_for(&mut scene, 1000);

    let glyph = scene.stage().glyph().expect("glyph");
    assert_eq!(glyph.disc.radius, 100.0);
    assert_eq!(glyph.hit_zone.radius, glyph.disc.radius);
    assert_eq!(glyph.disc.center, point(150.0, 150.0));
    assert!(close(glyph_extent(&scene), 100.0));
    assert_eq!(scene.stage().background.radius, 300.0);
}

#[test]
fn resize_during_background_entrance_still_covers_the_viewport() {
    let mut scene = scene(300.0, 300.0);
    scene.load('집').unwrap();
    run_for(&mut scene, 200);
    let radius = scene.stage().background.radius;
    assert!(radius > 0.0 && radius < 300.0, "{radius}");

    scene.resize(Viewport::new(900.0, 600.0));
    // The snap keeps the entrance at the same relative progress.
    assert!(close(scene.stage().background.radius, radius * 3.0));
    run_for(&mut scene, 1500);

    assert_eq!(scene.stage().background.radius, 900.0);
    assert_eq!(scene.stage().background.center, point(450.0, 300.0));
    let glyph = scene.stage().glyph().expect("glyph");
    assert_eq!(glyph.disc.radius, 200.0);
    let c = glyph.shape.bounds().expect("bounds").center();
    assert!(close(c.x, 450.0) && close(c.y, 300.0), "{c:?}");
}

#[test]
fn resize_during_settle_settles_on_the_new_center() {
    let mut scene = scene(900.0, 600.0);
    scene.load('집').unwrap();
    run_for(&mut scene, 1000);

    let center = point(450.0, 300.0);
    scene.pointer_pressed(center);
    run_for(&mut scene, 100);
    scene.pointer_released(center);
    // Pop done, settle running.
    run_for(&mut scene, 250);
    assert!(!scene.tweens().is_idle());

    scene.resize(Viewport::new(300.0, 300.0));
    run_for(&mut scene, 400);

    let glyph = scene.stage().glyph().expect("glyph");
    let p = glyph.shape.placement.position;
    assert!(close(p.x, 150.0) && close(p.y, 150.0), "{p:?}");
    assert_eq!(glyph.disc.center, point(150.0, 150.0));
    assert_eq!(glyph.shape.placement.rotation, 0.0);
    assert!(scene.tweens().is_idle());
}
