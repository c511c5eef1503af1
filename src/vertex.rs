//! # Vertex Module
//!
//! Vertex layout and geometry for the textured cube.
//!
//! Each face has its own four vertices so it can carry its own texture
//! coordinates; the cube therefore has 24 vertices and 36 indices (see
//! [`crate::INDICES`]). Faces are wound counter-clockwise when seen from
//! outside the cube, and texture coordinates put `(0, 0)` at the top-left of
//! the image, matching how decoded images are laid out in memory.

/// A single vertex: homogeneous position and texture coordinate.
///
/// The layout is `#[repr(C)]` and `Pod` so slices of vertices can be uploaded
/// to a vertex buffer with `bytemuck::cast_slice`.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    /// Object-space position `[x, y, z, w]`.
    pub position: [f32; 4],

    /// Texture coordinate `[u, v]`.
    pub tex_coords: [f32; 2],
}

impl Vertex {
    /// Shader locations: `0` position, `1` texture coordinate.
    pub fn vertex_attributes() -> Vec<wgpu::VertexAttribute> {
        wgpu::vertex_attr_array![0 => Float32x4, 1 => Float32x2].to_vec()
    }

    pub fn description(attributes: &[wgpu::VertexAttribute]) -> wgpu::VertexBufferLayout {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes,
        }
    }
}

const fn vertex(x: f32, y: f32, z: f32, u: f32, v: f32) -> Vertex {
    Vertex {
        position: [x, y, z, 1.0],
        tex_coords: [u, v],
    }
}

/// Unit cube centred on the origin. Per face: bottom-left, bottom-right,
/// top-right, top-left as seen from outside.
pub const VERTICES: [Vertex; 24] = [
    // +Z
    vertex(-0.5, -0.5, 0.5, 0.0, 1.0),
    vertex(0.5, -0.5, 0.5, 1.0, 1.0),
    vertex(0.5, 0.5, 0.5, 1.0, 0.0),
    vertex(-0.5, 0.5, 0.5, 0.0, 0.0),
    // -Z
    vertex(0.5, -0.5, -0.5, 0.0, 1.0),
    vertex(-0.5, -0.5, -0.5, 1.0, 1.0),
    vertex(-0.5, 0.5, -0.5, 1.0, 0.0),
    vertex(0.5, 0.5, -0.5, 0.0, 0.0),
    // +X
    vertex(0.5, -0.5, 0.5, 0.0, 1.0),
    vertex(0.5, -0.5, -0.5, 1.0, 1.0),
    vertex(0.5, 0.5, -0.5, 1.0, 0.0),
    vertex(0.5, 0.5, 0.5, 0.0, 0.0),
    // -X
    vertex(-0.5, -0.5, -0.5, 0.0, 1.0),
    vertex(-0.5, -0.5, 0.5, 1.0, 1.0),
    vertex(-0.5, 0.5, 0.5, 1.0, 0.0),
    vertex(-0.5, 0.5, -0.5, 0.0, 0.0),
    // +Y
    vertex(-0.5, 0.5, 0.5, 0.0, 1.0),
    vertex(0.5, 0.5, 0.5, 1.0, 1.0),
    vertex(0.5, 0.5, -0.5, 1.0, 0.0),
    vertex(-0.5, 0.5, -0.5, 0.0, 0.0),
    // -Y
    vertex(-0.5, -0.5, -0.5, 0.0, 1.0),
    vertex(0.5, -0.5, -0.5, 1.0, 1.0),
    vertex(0.5, -0.5, 0.5, 1.0, 0.0),
    vertex(-0.5, -0.5, 0.5, 0.0, 0.0),
];

#[cfg(test)]
mod tests {
    use nalgebra_glm::Vec3;

    use super::*;
    use crate::INDICES;

    fn position(index: u32) -> Vec3 {
        let [x, y, z, _] = VERTICES[index as usize].position;
        nalgebra_glm::vec3(x, y, z)
    }

    #[test]
    fn layout_is_tightly_packed() {
        assert_eq!(std::mem::size_of::<Vertex>(), 24);
        let layout = Vertex::description(&Vertex::vertex_attributes()).array_stride;
        assert_eq!(layout, 24);
    }

    #[test]
    fn indices_stay_in_range() {
        assert_eq!(INDICES.len(), 36);
        assert!(INDICES.iter().all(|&i| (i as usize) < VERTICES.len()));
    }

    #[test]
    fn triangles_face_outwards() {
        for triangle in INDICES.chunks(3) {
            let (a, b, c) = (position(triangle[0]), position(triangle[1]), position(triangle[2]));
            let normal = nalgebra_glm::cross(&(b - a), &(c - a));
            let centroid = (a + b + c) / 3.0;
            assert!(
                nalgebra_glm::dot(&normal, &centroid) > 0.0,
                "triangle {triangle:?} is wound inwards"
            );
        }
    }

    #[test]
    fn every_face_spans_the_full_texture() {
        for face in VERTICES.chunks(4) {
            let mut coords: Vec<[f32; 2]> = face.iter().map(|v| v.tex_coords).collect();
            coords.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
            assert_eq!(coords, vec![[0.0, 0.0], [0.0, 1.0], [1.0, 0.0], [1.0, 1.0]]);
        }
    }
}
