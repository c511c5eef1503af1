//! # GPU Management Module
//!
//! The `gpu` module owns the wgpu objects every other part of the renderer
//! builds on: the surface tied to the window, the device and queue, and the
//! surface configuration.
//!
//! ## Features
//!
//! - **Fallible Initialisation**: Surface, adapter and device failures are
//!   returned as [`Error`] instead of panicking, so the application can log
//!   them and shut down cleanly.
//! - **Present Mode Selection**: When the frame rate is capped by the
//!   [`crate::FrameLimiter`], vsync is turned off so the two don't fight;
//!   uncapped runs fall back to vsync.
//! - **Dynamic Surface Resizing** and **Depth Texture Creation**.
//!
//! ## Example Usage
//!
//! ```ignore
//! let gpu = Gpu::new_async(window, 800, 600, true).await?;
//! let depth = gpu.create_depth_texture(800, 600);
//! ```

use wgpu::InstanceDescriptor;

use crate::error::{Error, Result};

/// GPU resources shared by the scene and the overlay.
pub struct Gpu {
    /// Rendering target tied to the window (or canvas on the web).
    pub surface: wgpu::Surface<'static>,

    /// Creates buffers, textures and pipelines.
    pub device: wgpu::Device,

    /// Receives command buffers and buffer/texture writes.
    pub queue: wgpu::Queue,

    /// Current size, format and present mode of the surface.
    pub surface_config: wgpu::SurfaceConfiguration,

    /// Format picked from the surface capabilities.
    pub surface_format: wgpu::TextureFormat,
}

impl Gpu {
    pub fn aspect_ratio(&self) -> f32 {
        self.surface_config.width as f32 / self.surface_config.height.max(1) as f32
    }

    /// Reconfigures the surface. Zero-sized requests (a minimised window) are
    /// ignored, since wgpu rejects zero-area surfaces.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.surface_config.width = width;
        self.surface_config.height = height;
        self.surface.configure(&self.device, &self.surface_config);
    }

    /// Reapplies the current configuration, e.g. after the surface was lost.
    pub fn reconfigure(&self) {
        self.surface.configure(&self.device, &self.surface_config);
    }

    pub fn create_depth_texture(&self, width: u32, height: u32) -> wgpu::TextureView {
        let texture = self.device.create_texture(
            &(wgpu::TextureDescriptor {
                label: Some("Depth Texture"),
                size: wgpu::Extent3d {
                    width: width.max(1),
                    height: height.max(1),
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: crate::Renderer::DEPTH_FORMAT,
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                    | wgpu::TextureUsages::TEXTURE_BINDING,
                view_formats: &[],
            }),
        );
        texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some("Depth Texture View"),
            format: Some(crate::Renderer::DEPTH_FORMAT),
            dimension: Some(wgpu::TextureViewDimension::D2),
            aspect: wgpu::TextureAspect::All,
            base_mip_level: 0,
            base_array_layer: 0,
            array_layer_count: None,
            mip_level_count: None,
            usage: None,
        })
    }

    /// Creates the instance, surface, adapter and device for `window`.
    ///
    /// `vsync` selects between `AutoVsync` and `AutoNoVsync`; both are always
    /// supported, falling back to FIFO where needed.
    pub async fn new_async(
        window: impl Into<wgpu::SurfaceTarget<'static>>,
        width: u32,
        height: u32,
        vsync: bool,
    ) -> Result<Self> {
        let instance = wgpu::Instance::new(&InstanceDescriptor::default());

        let surface = instance.create_surface(window)?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or(Error::NoAdapter)?;

        let info = adapter.get_info();
        log::info!("Using adapter {} ({:?}, {:?})", info.name, info.device_type, info.backend);
        log::debug!("Adapter features: {:#?}", adapter.features());

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("WGPU Device"),
                    memory_hints: wgpu::MemoryHints::default(),
                    required_features: wgpu::Features::default(),
                    #[cfg(not(target_arch = "wasm32"))]
                    required_limits: wgpu::Limits::default().using_resolution(adapter.limits()),
                    #[cfg(all(target_arch = "wasm32", feature = "webgpu"))]
                    required_limits: wgpu::Limits::default().using_resolution(adapter.limits()),
                    #[cfg(all(target_arch = "wasm32", feature = "webgl"))]
                    required_limits: wgpu::Limits::downlevel_webgl2_defaults()
                        .using_resolution(adapter.limits()),
                },
                None,
            )
            .await?;

        let surface_capabilities = surface.get_capabilities(&adapter);

        let surface_format = surface_capabilities
            .formats
            .iter()
            .copied()
            .find(|f| !f.is_srgb()) // egui wants a non-srgb surface texture
            .or_else(|| surface_capabilities.formats.first().copied())
            .ok_or(Error::NoSurfaceFormat)?;
        log::info!("Surface format: {surface_format:?}");

        let alpha_mode = surface_capabilities
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: width.max(1),
            height: height.max(1),
            present_mode: if vsync {
                wgpu::PresentMode::AutoVsync
            } else {
                wgpu::PresentMode::AutoNoVsync
            },
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };

        surface.configure(&device, &surface_config);

        Ok(Self {
            surface,
            device,
            queue,
            surface_config,
            surface_format,
        })
    }
}
