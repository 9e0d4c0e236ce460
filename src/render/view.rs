//! The runnable syllable view.
//!
//! Binds the pieces together for a window:
//! - resolves the font (explicit file or system query) into an `OutlineSource`,
//! - owns the `SceneCoordinator` and feeds it resize, pointer and frame ticks,
//! - renders the flattened stage with `MeshRenderer`.
//!
//! Coordinates are physical pixels throughout, matching winit's `CursorMoved` positions
//! and the surface size.

use std::sync::Arc;

use anyhow::Context as _;
use log::{info, warn};
use lyon::math::{Point, point};
use winit::{
    dpi::PhysicalSize,
    event::{ElementState, MouseButton, WindowEvent},
    window::Window,
};

use crate::font::{FaceOutlines, FontSystem, ResolvedFace};
use crate::render::app::{AppConfig, AppState};
use crate::render::gpu::Gpu;
use crate::render::mesh_renderer::MeshRenderer;
use crate::render::util::FrameClock;
use crate::scene::coordinator::{SceneCoordinator, Viewport};

pub struct SyllableView {
    window: Arc<Window>,
    gpu: Gpu,
    renderer: MeshRenderer,
    scene: SceneCoordinator,
    clock: FrameClock,
    cursor: Option<Point>,
}

impl SyllableView {
    pub async fn new(window: Arc<Window>, config: AppConfig) -> anyhow::Result<Self> {
        let gpu = Gpu::new(window.clone()).await?;
        let renderer = MeshRenderer::new(&gpu)?;

        let face = resolve_face(&config)?;
        info!(
            "using font face {:?} ({} units/em)",
            face.face_id, face.units_per_em
        );

        let mut scene = SceneCoordinator::new(
            viewport_of(gpu.size),
            config.scene.clone(),
            Box::new(FaceOutlines::new(face)),
        );
        // A missing glyph leaves an empty (but running) window; the error is logged by
        // the coordinator.
        if let Err(err) = scene.load(config.character) {
            warn!("showing background only: {err}");
        }

        Ok(Self {
            window,
            gpu,
            renderer,
            scene,
            clock: FrameClock::new(),
            cursor: None,
        })
    }

    #[inline]
    pub fn scene(&self) -> &SceneCoordinator {
        &self.scene
    }
}

fn resolve_face(config: &AppConfig) -> anyhow::Result<ResolvedFace> {
    if let Some(path) = &config.font_path {
        let mut fonts = FontSystem::empty();
        return fonts
            .load_file(path)
            .with_context(|| format!("font: failed to load {}", path.display()));
    }

    let fonts = FontSystem::new().context("font: failed to initialize FontSystem")?;
    fonts
        .resolve(&config.font_query)
        .context("font: failed to resolve a face")
}

#[inline]
fn viewport_of(size: PhysicalSize<u32>) -> Viewport {
    Viewport::new(size.width as f32, size.height as f32)
}

impl AppState for SyllableView {
    fn resize(&mut self, new_size: PhysicalSize<u32>) {
        self.gpu.resize(new_size);
        if new_size.width > 0 && new_size.height > 0 {
            self.scene.resize(viewport_of(new_size));
        }
    }

    fn input(&mut self, event: &WindowEvent) {
        match *event {
            WindowEvent::CursorMoved { position, .. } => {
                let p = point(position.x as f32, position.y as f32);
                self.cursor = Some(p);
                self.scene.pointer_moved(p);
            }
            WindowEvent::CursorLeft { .. } => {
                self.cursor = None;
                self.scene.pointer_left();
            }
            WindowEvent::MouseInput {
                state,
                button: MouseButton::Left,
                ..
            } => {
                let Some(p) = self.cursor else {
                    return;
                };
                match state {
                    ElementState::Pressed => self.scene.pointer_pressed(p),
                    ElementState::Released => self.scene.pointer_released(p),
                };
            }
            _ => {}
        }
    }

    fn render(&mut self) -> anyhow::Result<()> {
        let dt = self.clock.tick();
        self.scene.tick(dt);

        if !self.gpu.is_drawable() {
            self.request_redraw();
            return Ok(());
        }

        let (surface_texture, view) = match self.gpu.acquire_frame() {
            Ok(v) => v,
            Err(wgpu::SurfaceError::Outdated)
            | Err(wgpu::SurfaceError::Lost)
            | Err(wgpu::SurfaceError::Other) => {
                self.gpu.resize(self.gpu.size);
                self.request_redraw();
                return Ok(());
            }
            Err(wgpu::SurfaceError::Timeout) => {
                self.request_redraw();
                return Ok(());
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                return Err(anyhow::anyhow!("wgpu SurfaceError::OutOfMemory"));
            }
        };

        let items = self
            .scene
            .draw_items()
            .context("failed to tessellate the stage")?;

        let mut encoder = self
            .gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Syllable Encoder"),
            });

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Syllable Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        // Matches the disc so the page reads white before the entrance.
                        load: wgpu::LoadOp::Clear(wgpu::Color::WHITE),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });
            self.renderer.draw_items(&self.gpu, &mut pass, &items)?;
        }

        self.gpu.queue.submit(Some(encoder.finish()));
        self.window.pre_present_notify();
        surface_texture.present();

        self.request_redraw();
        Ok(())
    }

    fn request_redraw(&self) {
        self.window.request_redraw();
    }
}
