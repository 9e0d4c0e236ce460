//! `syllable` library crate root.
//!
//! Renders a single Hangul syllable block from font outlines and animates it in response
//! to pointer input and window resize.
//!
//! Layers, leaves first:
//! - `font`: outline source, outline -> `CompoundShape` compiler, shape transforms,
//!   tessellation.
//! - `anim`: easing, the frame-driven tween engine, step sequences.
//! - `interact`: the pointer state machine for the glyph.
//! - `scene`: the stage and the `SceneCoordinator` that composes everything.
//! - `render`: winit + wgpu shell.
//!
//! The binary stays thin and calls `run_app`.

pub mod anim;
pub mod font;
pub mod interact;
pub mod render;
pub mod scene;

pub use render::app::AppConfig;

/// Run the winit/wgpu syllable view.
///
/// Note: this function does **not** initialize logging; callers decide their own
/// logging setup.
pub fn run_app(config: AppConfig) -> anyhow::Result<()> {
    render::app::run(config)
}
