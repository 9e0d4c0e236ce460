//! Rendering module root.
//!
//! The `render` module owns the window/event-loop integration and the GPU renderer.
//!
//! Entrypoint: `render::app::run(config)`.

pub mod app;

/// GPU context (device, queue, surface).
pub mod gpu;

/// Frame timing.
pub mod util;

/// Batched solid-color mesh renderer for scene draw items.
pub mod mesh_renderer;

/// The syllable view driven by the app runner.
pub mod view;
