//! # Uniform Buffer
//!
//! CPU-side mirror of the `Uniforms` block in the WGSL shader. The three
//! matrices are stored column-major as 32-bit floats, which is both how
//! `nalgebra-glm` keeps them in memory and what WGSL's `mat4x4<f32>` expects.

use nalgebra_glm::Mat4;

/// Transforms applied to the cube each frame.
///
/// The vertex shader computes `projection * view * model * position`.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct UniformBuffer {
    /// Object space to world space.
    pub model: Mat4,
    /// World space to eye space, from [`crate::Camera::view_matrix`].
    pub view: Mat4,
    /// Eye space to clip space, from [`crate::Camera::projection_matrix`].
    pub projection: Mat4,
}

impl Default for UniformBuffer {
    fn default() -> Self {
        Self {
            model: Mat4::identity(),
            view: Mat4::identity(),
            projection: Mat4::identity(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_the_shader_block_size() {
        // three mat4x4<f32>, no padding
        assert_eq!(std::mem::size_of::<UniformBuffer>(), 3 * 64);
    }

    #[test]
    fn matrices_are_column_major() {
        let uniforms = UniformBuffer {
            model: nalgebra_glm::translation(&nalgebra_glm::vec3(1.0, 2.0, 3.0)),
            ..UniformBuffer::default()
        };
        let floats: &[f32] = bytemuck::cast_slice(std::slice::from_ref(&uniforms));
        // translation lives in the fourth column, i.e. floats 12..15
        assert_eq!(&floats[12..15], &[1.0, 2.0, 3.0]);
    }
}
