use cgmath::{InnerSpace, Vector3, Zero};

use super::material::MaterialId;

/// Color every vertex gets when a color attribute is first allocated
pub const DEFAULT_VERTEX_COLOR: [f32; 3] = [1.0, 1.0, 1.0];

/// Per-vertex RGB colors with a version counter for change tracking
#[derive(Debug, Clone, PartialEq)]
pub struct ColorAttribute {
    colors: Vec<[f32; 3]>,
    version: u64,
}

impl ColorAttribute {
    /// `count` vertices, all set to `color`
    pub fn filled(count: usize, color: [f32; 3]) -> Self {
        Self {
            colors: vec![color; count],
            version: 0,
        }
    }

    pub fn from_colors(colors: Vec<[f32; 3]>) -> Self {
        Self { colors, version: 0 }
    }

    pub fn as_slice(&self) -> &[[f32; 3]] {
        &self.colors
    }

    pub fn get(&self, vertex: usize) -> Option<[f32; 3]> {
        self.colors.get(vertex).copied()
    }

    /// Overwrites one vertex color; out-of-range indices are ignored
    pub fn set(&mut self, vertex: usize, color: [f32; 3]) -> bool {
        match self.colors.get_mut(vertex) {
            Some(slot) => {
                *slot = color;
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    /// Bumped whenever the GPU copy needs refreshing
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn mark_dirty(&mut self) {
        self.version += 1;
    }
}

/// Triangle geometry plus its material reference
#[derive(Debug, Clone)]
pub struct Mesh {
    pub name: String,
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    /// Triangle list, three indices per face
    pub indices: Vec<u32>,
    pub colors: Option<ColorAttribute>,
    pub material: Option<MaterialId>,
}

impl Mesh {
    /// Creates a mesh, computing smooth normals from the faces
    pub fn new(name: &str, positions: Vec<[f32; 3]>, indices: Vec<u32>) -> Self {
        let normals = Self::calculate_vertex_normals(&positions, &indices);
        Self::with_normals(name, positions, normals, indices)
    }

    pub fn with_normals(
        name: &str,
        positions: Vec<[f32; 3]>,
        normals: Vec<[f32; 3]>,
        indices: Vec<u32>,
    ) -> Self {
        Self {
            name: name.to_string(),
            positions,
            normals,
            indices,
            colors: None,
            material: None,
        }
    }

    pub fn with_material(mut self, material: MaterialId) -> Self {
        self.material = Some(material);
        self
    }

    pub fn with_colors(mut self, colors: ColorAttribute) -> Self {
        self.colors = Some(colors);
        self
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Vertex indices `[a, b, c]` of one face
    pub fn triangle(&self, face: usize) -> Option<[u32; 3]> {
        let start = face.checked_mul(3)?;
        match self.indices.get(start..start + 3) {
            Some(&[a, b, c]) => Some([a, b, c]),
            _ => None,
        }
    }

    /// Returns the color attribute, allocating a white one sized to the
    /// vertex count if there is none (or if it no longer matches)
    pub fn ensure_colors(&mut self) -> &mut ColorAttribute {
        let count = self.positions.len();
        let stale = self.colors.as_ref().map_or(true, |c| c.len() != count);
        if stale {
            self.colors = Some(ColorAttribute::filled(count, DEFAULT_VERTEX_COLOR));
        }
        self.colors.get_or_insert_with(|| ColorAttribute::filled(count, DEFAULT_VERTEX_COLOR))
    }

    /// Area-weighted smooth normals for an indexed triangle list
    pub fn calculate_vertex_normals(positions: &[[f32; 3]], indices: &[u32]) -> Vec<[f32; 3]> {
        let mut normals = vec![Vector3::<f32>::zero(); positions.len()];

        for triangle in indices.chunks_exact(3) {
            let [i0, i1, i2] = [triangle[0] as usize, triangle[1] as usize, triangle[2] as usize];
            let (Some(v0), Some(v1), Some(v2)) =
                (positions.get(i0), positions.get(i1), positions.get(i2))
            else {
                continue;
            };

            let v0 = Vector3::from(*v0);
            let edge1 = Vector3::from(*v1) - v0;
            let edge2 = Vector3::from(*v2) - v0;
            let face_normal = edge1.cross(edge2);

            for index in [i0, i1, i2] {
                normals[index] += face_normal;
            }
        }

        normals
            .into_iter()
            .map(|n| {
                if n.magnitude2() > 0.0 {
                    n.normalize().into()
                } else {
                    [0.0, 1.0, 0.0]
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle() -> Mesh {
        Mesh::new(
            "tri",
            vec![[-1.0, -1.0, 0.0], [1.0, -1.0, 0.0], [0.0, 1.0, 0.0]],
            vec![0, 1, 2],
        )
    }

    #[test]
    fn test_normals_face_the_front() {
        let mesh = triangle();
        for n in &mesh.normals {
            assert!((n[2] - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn test_ensure_colors_allocates_white() {
        let mut mesh = triangle();
        assert!(mesh.colors.is_none());

        let colors = mesh.ensure_colors();
        assert_eq!(colors.len(), 3);
        assert!(colors.as_slice().iter().all(|c| *c == DEFAULT_VERTEX_COLOR));
    }

    #[test]
    fn test_ensure_colors_keeps_existing() {
        let mut mesh = triangle().with_colors(ColorAttribute::filled(3, [0.0, 1.0, 0.0]));
        assert_eq!(mesh.ensure_colors().get(0), Some([0.0, 1.0, 0.0]));
    }

    #[test]
    fn test_triangle_lookup() {
        let mesh = triangle();
        assert_eq!(mesh.triangle(0), Some([0, 1, 2]));
        assert_eq!(mesh.triangle(1), None);
    }
}
