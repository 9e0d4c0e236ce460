use std::sync::Arc;

use anyhow::Context as _;
use log::debug;
use winit::{dpi::PhysicalSize, window::Window};

/// GPU context for the window:
/// - owns `wgpu::Instance`, `wgpu::Adapter`, `wgpu::Device`, `wgpu::Queue`
/// - owns the window `Surface` and the current `SurfaceConfiguration`
///
/// The renderer draws into an sRGB view of the surface texture.
pub struct Gpu {
    pub instance: wgpu::Instance,
    pub adapter: wgpu::Adapter,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,

    /// The surface is tied to the window.
    pub surface: wgpu::Surface<'static>,
    pub surface_format: wgpu::TextureFormat,

    pub size: PhysicalSize<u32>,
    pub config: wgpu::SurfaceConfiguration,
}

impl Gpu {
    /// Create a GPU context for the given window and configure its surface.
    ///
    /// Prefers an sRGB surface format when one is offered.
    pub async fn new(window: Arc<Window>) -> anyhow::Result<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());

        let size = window.inner_size();

        // The surface holds its own `Arc<Window>`, which keeps it 'static.
        let surface = instance
            .create_surface(window)
            .context("wgpu: failed to create surface")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                compatible_surface: Some(&surface),
                ..Default::default()
            })
            .await
            .context("wgpu: failed to request adapter")?;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor::default())
            .await
            .context("wgpu: failed to request device")?;

        let caps = surface.get_capabilities(&adapter);
        let surface_format = caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| caps.formats.first().copied())
            .context("wgpu: surface reported no supported formats")?;
        debug!("surface format {surface_format:?}, size {size:?}");

        let config = Self::make_surface_config(size, surface_format);
        if size.width > 0 && size.height > 0 {
            surface.configure(&device, &config);
        }

        Ok(Self {
            instance,
            adapter,
            device,
            queue,
            surface,
            surface_format,
            size,
            config,
        })
    }

    /// Reconfigure the surface for a new size. Call on `WindowEvent::Resized`.
    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        self.size = new_size;
        // winit reports 0x0 while minimized; wgpu rejects 0-sized surfaces.
        if new_size.width == 0 || new_size.height == 0 {
            self.config.width = 0;
            self.config.height = 0;
            return;
        }

        self.config = Self::make_surface_config(new_size, self.surface_format);
        self.surface.configure(&self.device, &self.config);
    }

    /// Whether the surface currently has a drawable size.
    #[inline]
    pub fn is_drawable(&self) -> bool {
        self.config.width > 0 && self.config.height > 0
    }

    /// Acquire the next frame and an sRGB view of it.
    ///
    /// `SurfaceError` is returned as-is so callers can reconfigure, retry or exit.
    pub fn acquire_frame(
        &self,
    ) -> Result<(wgpu::SurfaceTexture, wgpu::TextureView), wgpu::SurfaceError> {
        let surface_texture = self.surface.get_current_texture()?;

        let view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor {
                format: Some(self.surface_format.add_srgb_suffix()),
                ..Default::default()
            });

        Ok((surface_texture, view))
    }

    fn make_surface_config(
        size: PhysicalSize<u32>,
        surface_format: wgpu::TextureFormat,
    ) -> wgpu::SurfaceConfiguration {
        wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            view_formats: vec![surface_format.add_srgb_suffix()],
            alpha_mode: wgpu::CompositeAlphaMode::Auto,
            width: size.width,
            height: size.height,
            desired_maximum_frame_latency: 2,
            present_mode: wgpu::PresentMode::AutoVsync,
        }
    }
}
