//! # `renderer.rs` - Renderer Module
//!
//! The `Renderer` ties the GPU resources, the cube [`Scene`] and the `egui`
//! overlay into a single frame.
//!
//! ## Key Features
//!
//! - **Depth Buffering**: A `Depth32Float` depth attachment so the cube's faces
//!   occlude each other correctly from every viewpoint.
//! - **GUI Rendering**: An `egui_wgpu::Renderer` draws the overlay in the same
//!   render pass, on top of the scene.
//! - **Surface Errors**: Acquiring the next surface texture can fail (for
//!   example after a resize or when the window is occluded). Such errors are
//!   returned to the caller, which decides whether to reconfigure or give up.
//!
//! ## Usage
//!
//! ```ignore
//! let mut renderer = Renderer::new(window, width, height, options).await?;
//! loop {
//!     renderer.render_frame(screen_descriptor, paint_jobs, textures_delta, &camera, delta_time)?;
//! }
//! ```

use crate::camera::Camera;
use crate::error::Result;
use crate::gpu::Gpu;
use crate::scene::Scene;
use crate::texture::TextureImage;

/// Settings fixed when the renderer is created.
#[derive(Debug, Clone)]
pub struct RendererOptions {
    /// Present with vsync. Turned off when a frame cap already paces the loop.
    pub vsync: bool,
    /// Image applied to the cube.
    pub image: TextureImage,
    /// Cube rotation in degrees per second.
    pub spin: f32,
}

/// The rendering backend: GPU state, depth buffer, overlay renderer and scene.
pub struct Renderer {
    gpu: Gpu,

    depth_texture_view: wgpu::TextureView,

    egui_renderer: egui_wgpu::Renderer,

    scene: Scene,
}

impl Renderer {
    pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

    pub async fn new(
        window: impl Into<wgpu::SurfaceTarget<'static>>,
        width: u32,
        height: u32,
        options: RendererOptions,
    ) -> Result<Self> {
        let gpu = Gpu::new_async(window, width, height, options.vsync).await?;

        let depth_texture_view = gpu.create_depth_texture(width, height);

        let egui_renderer = egui_wgpu::Renderer::new(
            &gpu.device,
            gpu.surface_config.format,
            Some(Self::DEPTH_FORMAT),
            1,
            false,
        );

        let scene = Scene::new(
            &gpu.device,
            &gpu.queue,
            gpu.surface_format,
            &options.image,
            options.spin,
        );

        Ok(Self {
            gpu,
            depth_texture_view,
            egui_renderer,
            scene,
        })
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.gpu.resize(width, height);
        self.depth_texture_view = self.gpu.create_depth_texture(width, height);
    }

    /// Reconfigures the surface with its current size after it was lost or
    /// became outdated.
    pub fn recover_surface(&mut self) {
        self.gpu.reconfigure();
    }

    /// Updates the scene from `camera`, then draws the cube followed by the overlay.
    pub fn render_frame(
        &mut self,
        screen_descriptor: egui_wgpu::ScreenDescriptor,
        paint_jobs: Vec<egui::epaint::ClippedPrimitive>,
        textures_delta: egui::TexturesDelta,
        camera: &Camera,
        delta_time: crate::Duration,
    ) -> Result<(), wgpu::SurfaceError> {
        let delta_time = delta_time.as_secs_f32();

        self.scene
            .update(&self.gpu.queue, self.gpu.aspect_ratio(), camera, delta_time);

        for (id, image_delta) in &textures_delta.set {
            self.egui_renderer
                .update_texture(&self.gpu.device, &self.gpu.queue, *id, image_delta);
        }

        let surface_texture = match self.gpu.surface.get_current_texture() {
            Ok(surface_texture) => surface_texture,
            Err(error) => {
                for id in &textures_delta.free {
                    self.egui_renderer.free_texture(id);
                }
                return Err(error);
            }
        };

        let mut encoder = self
            .gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        self.egui_renderer.update_buffers(
            &self.gpu.device,
            &self.gpu.queue,
            &mut encoder,
            &paint_jobs,
            &screen_descriptor,
        );

        let surface_texture_view =
            surface_texture
                .texture
                .create_view(&wgpu::TextureViewDescriptor {
                    label: Some("Surface Texture View"),
                    aspect: wgpu::TextureAspect::default(),
                    format: Some(self.gpu.surface_format),
                    dimension: None,
                    base_mip_level: 0,
                    mip_level_count: None,
                    base_array_layer: 0,
                    array_layer_count: None,
                    usage: None,
                });

        encoder.insert_debug_marker("Render cube");

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &surface_texture_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: 0.2,
                            g: 0.3,
                            b: 0.3,
                            a: 1.0,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_texture_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            self.scene.render(&mut render_pass);

            self.egui_renderer.render(
                &mut render_pass.forget_lifetime(),
                &paint_jobs,
                &screen_descriptor,
            );
        }

        self.gpu.queue.submit(std::iter::once(encoder.finish()));
        surface_texture.present();

        for id in &textures_delta.free {
            self.egui_renderer.free_texture(id);
        }

        Ok(())
    }
}
