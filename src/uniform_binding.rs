//! # Uniform Binding
//!
//! Owns the GPU buffer behind [`UniformBuffer`] together with the bind group
//! layout and bind group that expose it to the vertex stage at
//! `@group(0) @binding(0)`.

use std::num::NonZeroU64;

use crate::uniform_buffer::UniformBuffer;

/// GPU side of the per-frame transforms.
pub struct UniformBinding {
    /// Buffer holding one [`UniformBuffer`], rewritten every frame.
    pub buffer: wgpu::Buffer,

    /// Bind group pointing at [`Self::buffer`], set at group index 0.
    pub bind_group: wgpu::BindGroup,

    /// Layout of [`Self::bind_group`], needed when building the pipeline layout.
    pub bind_group_layout: wgpu::BindGroupLayout,
}

impl UniformBinding {
    /// Group index the shader declares the transforms at.
    pub const GROUP: u32 = 0;

    pub fn new(device: &wgpu::Device) -> Self {
        let buffer = wgpu::util::DeviceExt::create_buffer_init(
            device,
            &wgpu::util::BufferInitDescriptor {
                label: Some("Transform Uniform Buffer"),
                contents: bytemuck::cast_slice(&[UniformBuffer::default()]),
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            },
        );

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: NonZeroU64::new(std::mem::size_of::<UniformBuffer>() as u64),
                },
                count: None,
            }],
            label: Some("transform_bind_group_layout"),
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
            label: Some("transform_bind_group"),
        });

        Self {
            buffer,
            bind_group,
            bind_group_layout,
        }
    }

    /// Queues a write of `uniforms` to the GPU buffer. Takes effect at the next
    /// queue submission.
    pub fn write(&self, queue: &wgpu::Queue, uniforms: &UniformBuffer) {
        queue.write_buffer(&self.buffer, 0, bytemuck::bytes_of(uniforms));
    }
}
