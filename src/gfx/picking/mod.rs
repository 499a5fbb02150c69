//! # Triangle Picking System
//!
//! Turns a pointer position into a world-space ray and finds the nearest
//! triangle it hits.
//!
//! ## How it works
//!
//! 1. **Pointer to NDC**: Normalize the pointer against the 3D viewport's own
//!    rectangle (the panel to its left is not part of it)
//! 2. **NDC to Ray**: Unproject through the camera, starting at the eye
//! 3. **Ray-Triangle Intersection**: Walk every pickable node and its
//!    descendants, reject meshes by bounding box, then test each triangle
//! 4. **Selection**: Return the closest hit; on equal distance the first found wins
//!
//! ## Usage
//!
//! ```no_run
//! use meshpaint::gfx::picking::{Raycaster, Viewport};
//! # fn demo(camera: &meshpaint::gfx::OrbitCamera, scene: &meshpaint::gfx::scene::Scene) {
//! let viewport = Viewport::new(300.0, 0.0, 900.0, 800.0);
//! if let Some(ndc) = viewport.normalize((750.0, 400.0)) {
//!     if let (Some(ray), Some(model)) = (Raycaster::ray_from_camera(ndc, camera), scene.model()) {
//!         let hit = Raycaster::new().intersect(&ray, model, scene.pickables());
//!     }
//! }
//! # }
//! ```

use cgmath::{InnerSpace, Matrix4, SquareMatrix, Vector2, Vector3, Vector4, Zero};

use crate::gfx::{
    camera::orbit_camera::OrbitCamera,
    scene::{
        graph::{MeshId, NodeId, SceneGraph},
        material::Side,
    },
};

const DETERMINANT_EPSILON: f32 = 1e-8;

/// A 3D ray for intersection testing
#[derive(Debug, Clone, Copy)]
pub struct Ray {
    /// Ray origin point in world space
    pub origin: Vector3<f32>,
    /// Ray direction (normalized)
    pub direction: Vector3<f32>,
}

impl Ray {
    /// Create a new ray
    pub fn new(origin: Vector3<f32>, direction: Vector3<f32>) -> Self {
        Self {
            origin,
            direction: direction.normalize(),
        }
    }

    /// Get a point along the ray at distance t
    pub fn point_at(&self, t: f32) -> Vector3<f32> {
        self.origin + self.direction * t
    }

    /// Möller–Trumbore ray/triangle test returning the ray parameter of the hit
    ///
    /// With `cull_back_faces` a triangle is only hit from the side its
    /// counter-clockwise winding faces.
    pub fn intersect_triangle(
        &self,
        a: Vector3<f32>,
        b: Vector3<f32>,
        c: Vector3<f32>,
        cull_back_faces: bool,
    ) -> Option<f32> {
        let edge1 = b - a;
        let edge2 = c - a;
        let pvec = self.direction.cross(edge2);
        let det = edge1.dot(pvec);

        if cull_back_faces {
            if det < DETERMINANT_EPSILON {
                return None;
            }
        } else if det.abs() < DETERMINANT_EPSILON {
            return None;
        }

        let inv_det = 1.0 / det;
        let tvec = self.origin - a;
        let u = tvec.dot(pvec) * inv_det;
        if !(0.0..=1.0).contains(&u) {
            return None;
        }

        let qvec = tvec.cross(edge1);
        let v = self.direction.dot(qvec) * inv_det;
        if v < 0.0 || u + v > 1.0 {
            return None;
        }

        let t = edge2.dot(qvec) * inv_det;
        (t >= 0.0).then_some(t)
    }
}

/// Axis-aligned bounding box for intersection testing
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AABB {
    /// Minimum corner of the bounding box
    pub min: Vector3<f32>,
    /// Maximum corner of the bounding box
    pub max: Vector3<f32>,
}

impl AABB {
    /// Create a new AABB
    pub fn new(min: Vector3<f32>, max: Vector3<f32>) -> Self {
        Self { min, max }
    }

    /// Create AABB from a set of vertices
    pub fn from_vertices(vertices: &[[f32; 3]]) -> Self {
        if vertices.is_empty() {
            return Self::new(Vector3::zero(), Vector3::zero());
        }

        let mut min = Vector3::from(vertices[0]);
        let mut max = min;

        for vertex in vertices.iter().skip(1) {
            min.x = min.x.min(vertex[0]);
            min.y = min.y.min(vertex[1]);
            min.z = min.z.min(vertex[2]);
            max.x = max.x.max(vertex[0]);
            max.y = max.y.max(vertex[1]);
            max.z = max.z.max(vertex[2]);
        }

        Self::new(min, max)
    }

    /// Smallest box containing both boxes
    pub fn union(&self, other: &AABB) -> AABB {
        AABB::new(
            Vector3::new(
                self.min.x.min(other.min.x),
                self.min.y.min(other.min.y),
                self.min.z.min(other.min.z),
            ),
            Vector3::new(
                self.max.x.max(other.max.x),
                self.max.y.max(other.max.y),
                self.max.z.max(other.max.z),
            ),
        )
    }

    pub fn center(&self) -> Vector3<f32> {
        (self.min + self.max) * 0.5
    }

    /// Extents along each axis
    pub fn size(&self) -> Vector3<f32> {
        self.max - self.min
    }

    /// Test ray-AABB intersection
    /// Returns the distance to intersection point, or None if no intersection
    pub fn intersect_ray(&self, ray: &Ray) -> Option<f32> {
        let mut t_near = f32::NEG_INFINITY;
        let mut t_far = f32::INFINITY;

        for axis in 0..3 {
            let origin = ray.origin[axis];
            let direction = ray.direction[axis];
            let (min, max) = (self.min[axis], self.max[axis]);

            if direction.abs() < f32::EPSILON {
                // Parallel to this slab: must already be inside it
                if origin < min || origin > max {
                    return None;
                }
                continue;
            }

            let inv = 1.0 / direction;
            let (t0, t1) = ((min - origin) * inv, (max - origin) * inv);
            t_near = t_near.max(t0.min(t1));
            t_far = t_far.min(t0.max(t1));
        }

        if t_near <= t_far && t_far >= 0.0 {
            Some(if t_near >= 0.0 { t_near } else { t_far })
        } else {
            None
        }
    }

    /// Apply a transformation matrix to the AABB
    pub fn transform(&self, matrix: &Matrix4<f32>) -> Self {
        // Transform all 8 corners of the AABB and compute new bounds
        let corners = [
            Vector3::new(self.min.x, self.min.y, self.min.z),
            Vector3::new(self.max.x, self.min.y, self.min.z),
            Vector3::new(self.min.x, self.max.y, self.min.z),
            Vector3::new(self.min.x, self.min.y, self.max.z),
            Vector3::new(self.max.x, self.max.y, self.min.z),
            Vector3::new(self.max.x, self.min.y, self.max.z),
            Vector3::new(self.min.x, self.max.y, self.max.z),
            Vector3::new(self.max.x, self.max.y, self.max.z),
        ];

        let transformed_corners: Vec<[f32; 3]> = corners
            .iter()
            .map(|corner| transform_point(matrix, *corner).into())
            .collect();

        Self::from_vertices(&transformed_corners)
    }
}

/// The sub-rectangle of the window the 3D scene is drawn into, in physical pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn aspect(&self) -> f32 {
        if self.height > 0.0 {
            self.width / self.height
        } else {
            1.0
        }
    }

    pub fn contains(&self, position: (f32, f32)) -> bool {
        let (px, py) = position;
        px >= self.x && px <= self.x + self.width && py >= self.y && py <= self.y + self.height
    }

    /// Maps a window position to normalized device coordinates (-1 to 1, y up)
    /// relative to this viewport; `None` if the position lies outside it
    pub fn normalize(&self, position: (f32, f32)) -> Option<Vector2<f32>> {
        if self.width <= 0.0 || self.height <= 0.0 || !self.contains(position) {
            return None;
        }

        let (px, py) = position;
        let ndc_x = (px - self.x) / self.width * 2.0 - 1.0;
        let ndc_y = 1.0 - (py - self.y) / self.height * 2.0; // Flip Y axis
        Some(Vector2::new(ndc_x, ndc_y))
    }
}

/// Nearest triangle hit by a pick ray
#[derive(Debug, Clone, PartialEq)]
pub struct Intersection {
    /// Node drawing the hit mesh
    pub node: NodeId,
    pub mesh: MeshId,
    /// Index of the hit face in the mesh's triangle list
    pub face_index: usize,
    /// Vertex indices of the hit face
    pub face: [u32; 3],
    /// Distance from the ray origin
    pub distance: f32,
    /// World space intersection point
    pub point: Vector3<f32>,
}

/// Ray caster for pointer picking
#[derive(Debug, Default)]
pub struct Raycaster {
    /// Skip the per-mesh bounding box rejection
    pub exhaustive: bool,
}

impl Raycaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the ray from the camera eye through a point given in NDC
    pub fn ray_from_camera(ndc: Vector2<f32>, camera: &OrbitCamera) -> Option<Ray> {
        let view_proj = camera.projection_matrix() * camera.view_matrix();
        let inv_view_proj = view_proj.invert()?;

        let unproject = |z: f32| {
            let world = inv_view_proj * Vector4::new(ndc.x, ndc.y, z, 1.0);
            (world.w.abs() > f32::EPSILON).then(|| world.truncate() / world.w)
        };
        let near = unproject(-1.0)?;
        let far = unproject(1.0)?;

        let direction = far - near;
        if direction.magnitude2() <= f32::EPSILON {
            return None;
        }
        Some(Ray::new(camera.eye, far - camera.eye))
    }

    /// Nearest hit among `roots` and all of their descendants
    pub fn intersect(&self, ray: &Ray, graph: &SceneGraph, roots: &[NodeId]) -> Option<Intersection> {
        let mut closest: Option<Intersection> = None;

        for &root in roots {
            for node_id in graph.descendants(root) {
                let Some(hit) = self.intersect_node(ray, graph, node_id) else {
                    continue;
                };
                // Strict comparison keeps the first hit on ties
                if closest
                    .as_ref()
                    .map_or(true, |best| hit.distance < best.distance)
                {
                    closest = Some(hit);
                }
            }
        }

        closest
    }

    /// Nearest hit on the mesh drawn by one node, ignoring its children
    fn intersect_node(&self, ray: &Ray, graph: &SceneGraph, node_id: NodeId) -> Option<Intersection> {
        let mesh_id = graph.node(node_id)?.mesh?;
        let mesh = graph.mesh(mesh_id)?;
        if mesh.positions.is_empty() {
            return None;
        }

        let world = graph.world_matrix(node_id);

        if !self.exhaustive {
            let world_aabb = AABB::from_vertices(&mesh.positions).transform(&world);
            world_aabb.intersect_ray(ray)?;
        }

        let side = mesh
            .material
            .and_then(|m| graph.materials().get(m))
            .map_or(Side::Front, |m| m.side);
        // A mirroring transform flips the winding seen in world space
        let mirrored = world.determinant() < 0.0;

        let mut closest: Option<(usize, [u32; 3], f32)> = None;

        for face_index in 0..mesh.triangle_count() {
            let Some(face) = mesh.triangle(face_index) else {
                continue;
            };
            let Some([a, b, c]) = face_positions(&mesh.positions, face) else {
                continue;
            };
            let (a, b, c) = (
                transform_point(&world, a),
                transform_point(&world, b),
                transform_point(&world, c),
            );
            let (b, c) = if mirrored { (c, b) } else { (b, c) };

            let Some(t) = ray.intersect_triangle(a, b, c, side == Side::Front) else {
                continue;
            };
            if closest.map_or(true, |(_, _, best)| t < best) {
                closest = Some((face_index, face, t));
            }
        }

        closest.map(|(face_index, face, distance)| Intersection {
            node: node_id,
            mesh: mesh_id,
            face_index,
            face,
            distance,
            point: ray.point_at(distance),
        })
    }
}

fn face_positions(positions: &[[f32; 3]], face: [u32; 3]) -> Option<[Vector3<f32>; 3]> {
    let get = |i: u32| positions.get(i as usize).map(|p| Vector3::from(*p));
    Some([get(face[0])?, get(face[1])?, get(face[2])?])
}

fn transform_point(matrix: &Matrix4<f32>, point: Vector3<f32>) -> Vector3<f32> {
    let homogeneous = matrix * point.extend(1.0);
    if homogeneous.w.abs() > f32::EPSILON && homogeneous.w != 1.0 {
        homogeneous.truncate() / homogeneous.w
    } else {
        homogeneous.truncate()
    }
}

#[cfg(test)]
mod tests {
    use cgmath::Deg;

    use super::*;
    use crate::gfx::scene::{
        graph::Transform,
        material::{Material, MaterialKind},
        mesh::Mesh,
    };

    fn camera_at(eye: Vector3<f32>, aspect: f32) -> OrbitCamera {
        let mut camera = OrbitCamera::new(1.0, 0.0, 0.0, Vector3::zero(), aspect)
            .with_projection(Deg(75.0), 0.1, 1000.0);
        camera.look_from(eye, Vector3::zero());
        camera
    }

    fn triangle_graph(side: Side) -> SceneGraph {
        let mut graph = SceneGraph::new("root");
        let material = graph.add_material(Material::new("m", MaterialKind::Standard).with_side(side));
        let mesh = graph.add_mesh(
            Mesh::new(
                "tri",
                vec![[-1.0, -1.0, 0.0], [1.0, -1.0, 0.0], [0.0, 1.0, 0.0]],
                vec![0, 1, 2],
            )
            .with_material(material),
        );
        graph.add_mesh_node(graph.root(), "tri", Transform::default(), mesh);
        graph
    }

    #[test]
    fn test_aabb_creation() {
        let vertices = vec![[0.0, 0.0, 0.0], [1.0, 1.0, 1.0], [-1.0, -1.0, -1.0]];
        let aabb = AABB::from_vertices(&vertices);

        assert_eq!(aabb.min, Vector3::new(-1.0, -1.0, -1.0));
        assert_eq!(aabb.max, Vector3::new(1.0, 1.0, 1.0));
        assert_eq!(aabb.center(), Vector3::zero());
        assert_eq!(aabb.size(), Vector3::new(2.0, 2.0, 2.0));
    }

    #[test]
    fn test_ray_aabb_intersection() {
        let aabb = AABB::new(Vector3::new(-1.0, -1.0, -1.0), Vector3::new(1.0, 1.0, 1.0));

        // Ray hitting the box
        let ray = Ray::new(Vector3::new(0.0, 0.0, -5.0), Vector3::new(0.0, 0.0, 1.0));
        assert_eq!(aabb.intersect_ray(&ray), Some(4.0));

        // Ray missing the box
        let ray_miss = Ray::new(Vector3::new(5.0, 0.0, -5.0), Vector3::new(0.0, 0.0, 1.0));
        assert!(aabb.intersect_ray(&ray_miss).is_none());
    }

    #[test]
    fn test_flat_aabb_is_hit_head_on() {
        let aabb = AABB::new(Vector3::new(-1.0, -1.0, 0.0), Vector3::new(1.0, 1.0, 0.0));
        let ray = Ray::new(Vector3::new(0.0, 0.0, 5.0), Vector3::new(0.0, 0.0, -1.0));
        assert_eq!(aabb.intersect_ray(&ray), Some(5.0));
    }

    #[test]
    fn test_triangle_culling() {
        let (a, b, c) = (
            Vector3::new(-1.0, -1.0, 0.0),
            Vector3::new(1.0, -1.0, 0.0),
            Vector3::new(0.0, 1.0, 0.0),
        );
        let front = Ray::new(Vector3::new(0.0, 0.0, 5.0), Vector3::new(0.0, 0.0, -1.0));
        let back = Ray::new(Vector3::new(0.0, 0.0, -5.0), Vector3::new(0.0, 0.0, 1.0));

        assert_eq!(front.intersect_triangle(a, b, c, true), Some(5.0));
        assert!(back.intersect_triangle(a, b, c, true).is_none());
        assert_eq!(back.intersect_triangle(a, b, c, false), Some(5.0));
    }

    #[test]
    fn test_viewport_normalization_uses_its_own_rectangle() {
        let viewport = Viewport::new(300.0, 0.0, 900.0, 800.0);

        let center = viewport.normalize((750.0, 400.0)).unwrap();
        assert!(center.x.abs() < 1e-6 && center.y.abs() < 1e-6);

        let top_left = viewport.normalize((300.0, 0.0)).unwrap();
        assert_eq!((top_left.x, top_left.y), (-1.0, 1.0));

        // Inside the window but over the side panel
        assert!(viewport.normalize((100.0, 400.0)).is_none());
    }

    #[test]
    fn test_center_ray_points_at_target() {
        let camera = camera_at(Vector3::new(0.0, 0.0, 5.0), 1.0);
        let ray = Raycaster::ray_from_camera(Vector2::new(0.0, 0.0), &camera).unwrap();

        assert!((ray.origin - Vector3::new(0.0, 0.0, 5.0)).magnitude() < 1e-5);
        assert!((ray.direction - Vector3::new(0.0, 0.0, -1.0)).magnitude() < 1e-4);
    }

    #[test]
    fn test_pick_nearest_face() {
        let graph = triangle_graph(Side::Front);
        let camera = camera_at(Vector3::new(0.0, 0.0, 5.0), 1.0);
        let ray = Raycaster::ray_from_camera(Vector2::new(0.0, 0.0), &camera).unwrap();

        let roots = graph.node(graph.root()).unwrap().children.clone();
        let hit = Raycaster::new().intersect(&ray, &graph, &roots).unwrap();

        assert_eq!(hit.face, [0, 1, 2]);
        assert!((hit.distance - 5.0).abs() < 1e-4);
        assert!(hit.point.magnitude() < 1e-4);
    }

    #[test]
    fn test_single_sided_is_missed_from_behind() {
        let camera = camera_at(Vector3::new(0.0, 0.0, -5.0), 1.0);
        let ray = Raycaster::ray_from_camera(Vector2::new(0.0, 0.0), &camera).unwrap();

        let single = triangle_graph(Side::Front);
        let roots = single.node(single.root()).unwrap().children.clone();
        assert!(Raycaster::new().intersect(&ray, &single, &roots).is_none());

        let double = triangle_graph(Side::Double);
        let roots = double.node(double.root()).unwrap().children.clone();
        assert!(Raycaster::new().intersect(&ray, &double, &roots).is_some());
    }

    #[test]
    fn test_recurses_into_children_and_prefers_closest() {
        let mut graph = triangle_graph(Side::Front);
        let first = graph.node(graph.root()).unwrap().children[0];
        let mesh = graph.node(first).unwrap().mesh.unwrap();
        // Same triangle, nested one level down and 1 unit closer to the camera
        graph.add_mesh_node(
            first,
            "closer",
            Transform::from_translation(Vector3::new(0.0, 0.0, 1.0)),
            mesh,
        );

        let camera = camera_at(Vector3::new(0.0, 0.0, 5.0), 1.0);
        let ray = Raycaster::ray_from_camera(Vector2::new(0.0, 0.0), &camera).unwrap();
        let hit = Raycaster::new().intersect(&ray, &graph, &[first]).unwrap();

        assert_eq!(graph.node(hit.node).unwrap().name, "closer");
        assert!((hit.distance - 4.0).abs() < 1e-4);
    }

    #[test]
    fn test_nodes_outside_roots_are_ignored() {
        let graph = triangle_graph(Side::Front);
        let camera = camera_at(Vector3::new(0.0, 0.0, 5.0), 1.0);
        let ray = Raycaster::ray_from_camera(Vector2::new(0.0, 0.0), &camera).unwrap();

        assert!(Raycaster::new().intersect(&ray, &graph, &[]).is_none());
    }

    #[test]
    fn test_bounds_rejection_matches_exhaustive_search() {
        let graph = triangle_graph(Side::Front);
        let roots = graph.node(graph.root()).unwrap().children.clone();
        let bounded = Raycaster::new();
        let exhaustive = Raycaster { exhaustive: true };

        let through = Ray::new(Vector3::new(0.2, -0.2, 5.0), Vector3::new(0.0, 0.0, -1.0));
        let a = bounded.intersect(&through, &graph, &roots).unwrap();
        let b = exhaustive.intersect(&through, &graph, &roots).unwrap();
        assert_eq!((a.node, a.face_index, a.face), (b.node, b.face_index, b.face));
        assert!((a.distance - b.distance).abs() < 1e-5);

        // Outside the box, and outside the triangle
        let beside = Ray::new(Vector3::new(3.0, 3.0, 5.0), Vector3::new(0.0, 0.0, -1.0));
        assert!(bounded.intersect(&beside, &graph, &roots).is_none());
        assert!(exhaustive.intersect(&beside, &graph, &roots).is_none());
    }
}
