//! Node hierarchy of a loaded model
//!
//! Nodes, meshes and materials are stored in flat arenas and addressed by
//! index newtypes. Node transforms are local; world matrices are composed on
//! demand by walking up the parent chain.

use cgmath::{Matrix4, One, Quaternion, Vector3, Vector4};

use super::{
    material::{Material, MaterialId, MaterialLibrary},
    mesh::Mesh,
};
use crate::gfx::picking::AABB;

/// Index of a node inside its [`SceneGraph`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

/// Index of a mesh inside its [`SceneGraph`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MeshId(pub(crate) usize);

/// Translation / rotation / scale of a node relative to its parent
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub translation: Vector3<f32>,
    pub rotation: Quaternion<f32>,
    pub scale: Vector3<f32>,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            translation: Vector3::new(0.0, 0.0, 0.0),
            rotation: Quaternion::one(),
            scale: Vector3::new(1.0, 1.0, 1.0),
        }
    }
}

impl Transform {
    pub fn from_translation(translation: Vector3<f32>) -> Self {
        Self {
            translation,
            ..Default::default()
        }
    }

    /// `T * R * S`
    pub fn matrix(&self) -> Matrix4<f32> {
        Matrix4::from_translation(self.translation)
            * Matrix4::from(self.rotation)
            * Matrix4::from_nonuniform_scale(self.scale.x, self.scale.y, self.scale.z)
    }
}

#[derive(Debug, Clone)]
pub struct Node {
    pub name: String,
    pub transform: Transform,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub mesh: Option<MeshId>,
}

/// A loaded model: node tree rooted at a single group node
#[derive(Debug, Clone)]
pub struct SceneGraph {
    nodes: Vec<Node>,
    meshes: Vec<Mesh>,
    materials: MaterialLibrary,
}

impl SceneGraph {
    /// Creates a graph holding only an empty root group
    pub fn new(root_name: &str) -> Self {
        Self {
            nodes: vec![Node {
                name: root_name.to_string(),
                transform: Transform::default(),
                parent: None,
                children: Vec::new(),
                mesh: None,
            }],
            meshes: Vec::new(),
            materials: MaterialLibrary::new(),
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Appends a child node under `parent`
    ///
    /// # Panics
    /// Panics if `parent` does not belong to this graph
    pub fn add_node(&mut self, parent: NodeId, name: &str, transform: Transform) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            name: name.to_string(),
            transform,
            parent: Some(parent),
            children: Vec::new(),
            mesh: None,
        });
        self.nodes[parent.0].children.push(id);
        id
    }

    pub fn add_mesh(&mut self, mesh: Mesh) -> MeshId {
        self.meshes.push(mesh);
        MeshId(self.meshes.len() - 1)
    }

    pub fn add_material(&mut self, material: Material) -> MaterialId {
        self.materials.add(material)
    }

    /// Appends a child node that draws `mesh`
    pub fn add_mesh_node(&mut self, parent: NodeId, name: &str, transform: Transform, mesh: MeshId) -> NodeId {
        let id = self.add_node(parent, name, transform);
        self.nodes[id.0].mesh = Some(mesh);
        id
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.0)
    }

    pub fn mesh(&self, id: MeshId) -> Option<&Mesh> {
        self.meshes.get(id.0)
    }

    pub fn mesh_mut(&mut self, id: MeshId) -> Option<&mut Mesh> {
        self.meshes.get_mut(id.0)
    }

    pub fn meshes(&self) -> impl Iterator<Item = (MeshId, &Mesh)> {
        self.meshes.iter().enumerate().map(|(i, m)| (MeshId(i), m))
    }

    pub fn materials(&self) -> &MaterialLibrary {
        &self.materials
    }

    pub fn materials_mut(&mut self) -> &mut MaterialLibrary {
        &mut self.materials
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Every node that draws a mesh, in insertion order
    pub fn mesh_nodes(&self) -> impl Iterator<Item = (NodeId, MeshId)> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(i, n)| n.mesh.map(|m| (NodeId(i), m)))
    }

    /// `id` followed by all of its descendants, depth first in child order
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let Some(node) = self.node(current) else {
                continue;
            };
            out.push(current);
            stack.extend(node.children.iter().rev().copied());
        }
        out
    }

    /// Local-to-world matrix of a node
    pub fn world_matrix(&self, id: NodeId) -> Matrix4<f32> {
        let mut matrix = Matrix4::one();
        let mut current = Some(id);
        while let Some(node) = current.and_then(|c| self.node(c)) {
            matrix = node.transform.matrix() * matrix;
            current = node.parent;
        }
        matrix
    }

    /// How many meshes reference `material`
    pub fn material_users(&self, material: MaterialId) -> usize {
        self.meshes
            .iter()
            .filter(|m| m.material == Some(material))
            .count()
    }

    /// World-space bounds of every vertex under the root, `None` for an empty graph
    pub fn bounding_box(&self) -> Option<AABB> {
        self.bounding_box_of(self.root())
    }

    /// World-space bounds of every vertex under `id`
    pub fn bounding_box_of(&self, id: NodeId) -> Option<AABB> {
        let mut bounds: Option<AABB> = None;

        for node_id in self.descendants(id) {
            let Some(mesh) = self
                .node(node_id)
                .and_then(|n| n.mesh)
                .and_then(|m| self.mesh(m))
            else {
                continue;
            };
            if mesh.positions.is_empty() {
                continue;
            }

            let world = self.world_matrix(node_id);
            let transformed: Vec<[f32; 3]> = mesh
                .positions
                .iter()
                .map(|p| {
                    let v = world * Vector4::new(p[0], p[1], p[2], 1.0);
                    [v.x, v.y, v.z]
                })
                .collect();
            let mesh_bounds = AABB::from_vertices(&transformed);

            bounds = Some(match bounds {
                Some(b) => b.union(&mesh_bounds),
                None => mesh_bounds,
            });
        }

        bounds
    }

    /// Totals for UI display
    pub fn statistics(&self) -> SceneStatistics {
        SceneStatistics {
            node_count: self.nodes.len(),
            mesh_count: self.meshes.len(),
            material_count: self.materials.len(),
            total_triangles: self.meshes.iter().map(Mesh::triangle_count).sum(),
            total_vertices: self.meshes.iter().map(Mesh::vertex_count).sum(),
        }
    }
}

/// Scene statistics for debugging and UI display
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SceneStatistics {
    pub node_count: usize,
    pub mesh_count: usize,
    pub material_count: usize,
    pub total_triangles: usize,
    pub total_vertices: usize,
}
