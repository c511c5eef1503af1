//! # Scene
//!
//! The `scene` module holds everything needed to draw the textured cube: the
//! vertex and index buffers, the transform uniforms, the texture and the render
//! pipeline tying them to the WGSL shader.
//!
//! Each frame [`Scene::update`] rebuilds the uniforms from the camera (view and
//! projection) and the cube's own rotation (model), then [`Scene::render`]
//! records the indexed draw into the caller's render pass.
//!
//! ## Example Usage
//! ```ignore
//! let mut scene = Scene::new(&device, &queue, surface_format, &TextureImage::checkerboard(256, 8), 0.0);
//! scene.update(&queue, aspect_ratio, &camera, delta_time);
//! scene.render(&mut render_pass);
//! ```

use crate::camera::Camera;
use crate::renderer::Renderer;
use crate::texture::{Texture, TextureImage};
use crate::uniform_binding::UniformBinding;
use crate::uniform_buffer::UniformBuffer;
use crate::vertex::{Vertex, VERTICES};
use crate::{INDICES, SHADER_SOURCE};

/// The cube and the GPU state needed to draw it.
pub struct Scene {
    /// Object-to-world transform, rebuilt from `spin_angle` every frame.
    pub model: nalgebra_glm::Mat4,

    /// Rotation rate about the world up axis, degrees per second.
    pub spin: f32,

    /// Accumulated rotation in degrees, kept within `[0, 360)`.
    pub spin_angle: f32,

    pub vertex_buffer: wgpu::Buffer,

    pub index_buffer: wgpu::Buffer,

    pub uniform: UniformBinding,

    pub texture: Texture,

    pub pipeline: wgpu::RenderPipeline,
}

impl Scene {
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        surface_format: wgpu::TextureFormat,
        image: &TextureImage,
        spin: f32,
    ) -> Self {
        let vertex_buffer = wgpu::util::DeviceExt::create_buffer_init(
            device,
            &wgpu::util::BufferInitDescriptor {
                label: Some("Cube Vertex Buffer"),
                contents: bytemuck::cast_slice(&VERTICES),
                usage: wgpu::BufferUsages::VERTEX,
            },
        );

        let index_buffer = wgpu::util::DeviceExt::create_buffer_init(
            device,
            &wgpu::util::BufferInitDescriptor {
                label: Some("Cube Index Buffer"),
                contents: bytemuck::cast_slice(&INDICES),
                usage: wgpu::BufferUsages::INDEX,
            },
        );

        let uniform = UniformBinding::new(device);

        let texture = Texture::new(device, queue, image);

        let pipeline = Self::create_pipeline(device, surface_format, &uniform, &texture);

        Self {
            model: nalgebra_glm::Mat4::identity(),
            spin,
            spin_angle: 0.0,
            vertex_buffer,
            index_buffer,
            uniform,
            texture,
            pipeline,
        }
    }

    pub fn render<'rpass>(&'rpass self, renderpass: &mut wgpu::RenderPass<'rpass>) {
        renderpass.set_pipeline(&self.pipeline);
        renderpass.set_bind_group(UniformBinding::GROUP, &self.uniform.bind_group, &[]);
        renderpass.set_bind_group(Texture::GROUP, &self.texture.bind_group, &[]);

        renderpass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        renderpass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint32);

        renderpass.draw_indexed(0..(INDICES.len() as _), 0, 0..1);
    }

    /// Writes this frame's transforms: the camera's view, a projection for the
    /// current aspect ratio and the cube's model matrix.
    pub fn update(&mut self, queue: &wgpu::Queue, aspect_ratio: f32, camera: &Camera, delta_time: f32) {
        if self.spin != 0.0 {
            self.spin_angle = advance_angle(self.spin_angle, self.spin, delta_time);
            self.model = spin_model(self.spin_angle, &camera.world_up());
        }

        self.uniform.write(
            queue,
            &UniformBuffer {
                model: self.model,
                view: camera.view_matrix(),
                projection: camera.projection_matrix(aspect_ratio),
            },
        );
    }

    fn create_pipeline(
        device: &wgpu::Device,
        surface_format: wgpu::TextureFormat,
        uniform: &UniformBinding,
        texture: &Texture,
    ) -> wgpu::RenderPipeline {
        let shader_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Cube Shader"),
            source: wgpu::ShaderSource::Wgsl(std::borrow::Cow::Borrowed(SHADER_SOURCE)),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Cube Pipeline Layout"),
            bind_group_layouts: &[&uniform.bind_group_layout, &texture.bind_group_layout],
            push_constant_ranges: &[],
        });

        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Cube Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader_module,
                entry_point: Some("vertex_main"),
                buffers: &[Vertex::description(&Vertex::vertex_attributes())],
                compilation_options: Default::default(),
            },
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw, // Faces are wound counter-clockwise from outside.
                cull_mode: Some(wgpu::Face::Back),
                polygon_mode: wgpu::PolygonMode::Fill,
                conservative: false,
                unclipped_depth: false,
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: Renderer::DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState {
                count: 1,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader_module,
                entry_point: Some("fragment_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            multiview: None,
            cache: None,
        })
    }
}

fn advance_angle(angle: f32, rate: f32, delta_time: f32) -> f32 {
    (angle + rate * delta_time).rem_euclid(360.0)
}

/// Rotation of `angle` degrees about `axis`, built fresh so no error accumulates.
fn spin_model(angle: f32, axis: &nalgebra_glm::Vec3) -> nalgebra_glm::Mat4 {
    nalgebra_glm::rotation(angle.to_radians(), axis)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spin_angle_wraps() {
        assert_eq!(advance_angle(350.0, 20.0, 1.0), 10.0);
        assert_eq!(advance_angle(10.0, -20.0, 1.0), 350.0);
    }

    #[test]
    fn long_spins_stay_rigid() {
        let axis = nalgebra_glm::Vec3::y();
        let mut angle = 0.0;
        for _ in 0..1_000_000 {
            angle = advance_angle(angle, 90.0, 1.0 / 144.0);
        }
        assert!((0.0..360.0).contains(&angle));

        let model = spin_model(angle, &axis);
        let linear = nalgebra_glm::mat4_to_mat3(&model);
        let gram = linear.transpose() * linear;
        assert!((gram - nalgebra_glm::Mat3::identity()).abs().max() < 1e-5);
        let up = nalgebra_glm::vec4(0.0, 1.0, 0.0, 0.0);
        assert!((model * up - up).norm() < 1e-6);
    }
}
