//! App entrypoint for the rendering layer.
//!
//! This module owns:
//! - the winit application lifecycle + event loop
//! - creating the window
//! - delegating to an injected async state builder
//!
//! Design:
//! - The app runner is generic over a state type `S: AppState` (resize, input, render,
//!   redraw request).
//! - The builder is async and receives the created window; it runs once on resume via
//!   `pollster::block_on`.
//! - Window or state creation failures stop the event loop and are returned from
//!   `run_with_builder`.

use std::{future::Future, path::PathBuf, pin::Pin, sync::Arc};

use anyhow::Context as _;
use log::{error, info, warn};
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    window::{Window, WindowAttributes, WindowId},
};

use crate::font::FontQuery;
use crate::render::view::SyllableView;
use crate::scene::coordinator::SceneConfig;

/// App-facing configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Window title.
    pub title: String,
    /// ControlFlow for the event loop. Default is `Poll` (tweens need every frame).
    pub control_flow: ControlFlow,
    /// The syllable to show.
    pub character: char,
    /// Explicit font file; when unset, `font_query` is resolved against system fonts.
    pub font_path: Option<PathBuf>,
    pub font_query: FontQuery,
    pub scene: SceneConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            title: "syllable".to_string(),
            control_flow: ControlFlow::Poll,
            character: '집',
            font_path: None,
            font_query: FontQuery::hangul(),
            scene: SceneConfig::default(),
        }
    }
}

impl AppConfig {
    #[inline]
    pub fn with_font_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.font_path = Some(path.into());
        self
    }

    #[inline]
    pub fn with_character(mut self, character: char) -> Self {
        self.character = character;
        self
    }
}

/// What a state must implement to be driven by the app runner.
pub trait AppState: 'static {
    /// Handle window resize.
    fn resize(&mut self, new_size: PhysicalSize<u32>);

    /// Pointer/keyboard input. Ignored by default.
    fn input(&mut self, _event: &WindowEvent) {}

    /// Render one frame.
    fn render(&mut self) -> anyhow::Result<()>;

    /// Request a redraw on the underlying window (used for continuous animation).
    fn request_redraw(&self);
}

/// Run the syllable view with `config`.
pub fn run(config: AppConfig) -> anyhow::Result<()> {
    let view_config = config.clone();
    run_with_builder(config, move |window| async move {
        SyllableView::new(window, view_config).await
    })
}

/// Run the winit event loop with an injected async state builder.
pub fn run_with_builder<S, B, Fut>(config: AppConfig, builder: B) -> anyhow::Result<()>
where
    S: AppState,
    B: FnOnce(Arc<Window>) -> Fut + 'static,
    Fut: Future<Output = anyhow::Result<S>> + 'static,
{
    let event_loop = EventLoop::new().context("winit: failed to create EventLoop")?;
    event_loop.set_control_flow(config.control_flow);

    let mut app = App::<S>::new_with_builder(config, builder);
    event_loop
        .run_app(&mut app)
        .context("winit: run_app failed")?;

    match app.failure.take() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

/// Type-erased async builder for creating a state `S` from a created window.
///
/// The future is boxed and pinned so `pollster::block_on(...)` can drive it.
type BoxedStateBuilder<S> = Box<
    dyn FnOnce(Arc<Window>) -> Pin<Box<dyn Future<Output = anyhow::Result<S>> + 'static>> + 'static,
>;

/// Application state used by winit.
struct App<S: AppState> {
    config: AppConfig,
    builder: Option<BoxedStateBuilder<S>>,
    state: Option<S>,
    failure: Option<anyhow::Error>,
    exiting: bool,
}

impl<S: AppState> App<S> {
    fn new_with_builder<B, Fut>(config: AppConfig, builder: B) -> Self
    where
        B: FnOnce(Arc<Window>) -> Fut + 'static,
        Fut: Future<Output = anyhow::Result<S>> + 'static,
    {
        Self {
            config,
            builder: Some(Box::new(|window| Box::pin(builder(window)))),
            state: None,
            failure: None,
            exiting: false,
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        error!("{err:#}");
        self.failure = Some(err);
        self.exiting = true;
        self.state = None;
        event_loop.exit();
    }
}

impl<S: AppState> ApplicationHandler for App<S> {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        // Resumed can fire more than once on some platforms; build only once.
        let Some(builder) = self.builder.take() else {
            return;
        };

        let window = match event_loop
            .create_window(WindowAttributes::default().with_title(self.config.title.as_str()))
        {
            Ok(window) => Arc::new(window),
            Err(err) => {
                let err = anyhow::anyhow!("winit: failed to create window: {err}");
                self.fail(event_loop, err);
                return;
            }
        };

        match pollster::block_on(builder(window)) {
            Ok(state) => {
                state.request_redraw();
                self.state = Some(state);
            }
            Err(err) => self.fail(event_loop, err.context("failed to initialize view")),
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        if self.exiting {
            return;
        }
        let Some(state) = self.state.as_mut() else {
            return;
        };

        match event {
            WindowEvent::CloseRequested => {
                info!("Close requested; exiting");
                self.exiting = true;
                self.state = None;
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                state.resize(size);
                state.request_redraw();
            }
            WindowEvent::RedrawRequested => {
                if let Err(err) = state.render() {
                    warn!("render error: {err:#}");
                }
            }
            other => state.input(&other),
        }
    }
}
