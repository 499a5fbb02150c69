//! # Vertex Data Structures
//!
//! GPU vertex format shared by every mesh the viewer draws.

use crate::gfx::scene::{Material, Mesh};

/// Color used when a mesh has no color attribute, or its material ignores it
const UNPAINTED: [f32; 3] = [1.0, 1.0, 1.0];

/// A 3D vertex with position, normal and per-vertex color.
///
/// The `#[repr(C)]` layout is what [`Vertex3D::desc`] describes to the GPU.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex3D {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    /// Linear RGB multiplied with the material base color in the shader
    pub color: [f32; 3],
}

impl Vertex3D {
    /// Returns the vertex buffer layout for wgpu rendering.
    ///
    /// - Attribute 0: position (Float32x3)
    /// - Attribute 1: normal (Float32x3)
    /// - Attribute 2: color (Float32x3)
    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        use std::mem;
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<Vertex3D>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 6]>() as wgpu::BufferAddress,
                    shader_location: 2,
                    format: wgpu::VertexFormat::Float32x3,
                },
            ],
        }
    }

    /// Interleaves a mesh's attributes for upload
    ///
    /// Colors come from the mesh only when `material` has vertex colors
    /// switched on; otherwise every vertex is white.
    pub fn from_mesh(mesh: &Mesh, material: Option<&Material>) -> Vec<Vertex3D> {
        let colors = match (material, mesh.colors.as_ref()) {
            (Some(material), Some(colors)) if material.vertex_colors => Some(colors.as_slice()),
            _ => None,
        };

        mesh.positions
            .iter()
            .enumerate()
            .map(|(i, position)| Vertex3D {
                position: *position,
                normal: mesh.normals.get(i).copied().unwrap_or([0.0, 1.0, 0.0]),
                color: colors
                    .and_then(|c| c.get(i).copied())
                    .unwrap_or(UNPAINTED),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::scene::{ColorAttribute, MaterialKind};

    fn triangle() -> Mesh {
        Mesh::new(
            "tri",
            vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            vec![0, 1, 2],
        )
    }

    #[test]
    fn test_layout_matches_struct() {
        let layout = Vertex3D::desc();
        assert_eq!(layout.array_stride, 36);
        assert_eq!(layout.attributes.len(), 3);
        assert_eq!(layout.attributes[2].offset, 24);
    }

    #[test]
    fn test_colors_follow_material_flag() {
        let mut mesh = triangle();
        mesh.colors = Some(ColorAttribute::from_colors(vec![[1.0, 0.0, 0.0]; 3]));

        let plain = Material::new("plain", MaterialKind::Standard);
        let painted = Material::new("painted", MaterialKind::Standard).with_vertex_colors(true);

        let vertices = Vertex3D::from_mesh(&mesh, Some(&plain));
        assert!(vertices.iter().all(|v| v.color == UNPAINTED));

        let vertices = Vertex3D::from_mesh(&mesh, Some(&painted));
        assert!(vertices.iter().all(|v| v.color == [1.0, 0.0, 0.0]));
    }

    #[test]
    fn test_normals_are_carried_over() {
        let mesh = triangle();
        let vertices = Vertex3D::from_mesh(&mesh, None);
        assert_eq!(vertices.len(), 3);
        for v in &vertices {
            assert!((v.normal[2] - 1.0).abs() < 1e-5, "normal {:?}", v.normal);
        }
    }
}
