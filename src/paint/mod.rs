//! # Mesh Painting
//!
//! Turns a pointer click into a recolored triangle.
//!
//! A click is normalized against the 3D viewport, cast into the scene with
//! [`Raycaster`], and the three vertices of the nearest hit triangle get the
//! current [`PaintColor`]. Every mesh that shares a material with another mesh
//! is given a private copy of it the first time it is painted, so enabling
//! vertex colors on one mesh never changes how its siblings look.
//!
//! A miss clears the selection and touches nothing.

pub mod color;

use std::collections::HashMap;

use log::{debug, info};

use crate::{
    error::PaintError,
    gfx::{
        camera::orbit_camera::OrbitCamera,
        picking::{Raycaster, Viewport},
        scene::{
            graph::{MeshId, NodeId, SceneGraph},
            material::MaterialId,
            scene::Scene,
        },
    },
};

pub use color::PaintColor;

/// The triangle the last successful pick landed on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PickedFace {
    pub node: NodeId,
    pub mesh: MeshId,
    pub face_index: usize,
    /// Vertex indices of the face
    pub face: [u32; 3],
}

/// Selection state machine; every hit moves to `Selected`, every miss back to `Unselected`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Selection {
    #[default]
    Unselected,
    Selected(PickedFace),
}

impl Selection {
    pub fn picked(&self) -> Option<&PickedFace> {
        match self {
            Selection::Selected(face) => Some(face),
            Selection::Unselected => None,
        }
    }
}

/// What a click did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickOutcome {
    /// The pointer was outside the 3D viewport, or no model is loaded
    Ignored,
    /// The ray hit nothing
    Missed,
    Painted(PickedFace),
}

/// Pick handler plus the clone-on-paint bookkeeping for the current model
#[derive(Debug, Default)]
pub struct PaintEngine {
    selection: Selection,
    raycaster: Raycaster,
    /// Material each already-painted mesh owns
    private_materials: HashMap<MeshId, MaterialId>,
}

impl PaintEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selection(&self) -> Selection {
        self.selection
    }

    /// Forgets the selection and clone bookkeeping; call whenever the model changes
    pub fn reset(&mut self) {
        self.selection = Selection::Unselected;
        self.private_materials.clear();
    }

    /// Picks at `pointer` (window pixels) and paints the hit triangle with `color`
    ///
    /// A hit always updates the selection, even if the paint itself is then
    /// refused because of the mesh's material.
    pub fn pick_and_paint(
        &mut self,
        pointer: (f32, f32),
        viewport: &Viewport,
        camera: &OrbitCamera,
        scene: &mut Scene,
        color: PaintColor,
    ) -> Result<PickOutcome, PaintError> {
        let Some(ndc) = viewport.normalize(pointer) else {
            return Ok(PickOutcome::Ignored);
        };
        let Some(ray) = Raycaster::ray_from_camera(ndc, camera) else {
            return Ok(PickOutcome::Ignored);
        };

        let pickables = scene.pickables().to_vec();
        let Some(graph) = scene.model_mut() else {
            return Ok(PickOutcome::Ignored);
        };

        let Some(hit) = self.raycaster.intersect(&ray, graph, &pickables) else {
            info!("nothing selected");
            self.selection = Selection::Unselected;
            return Ok(PickOutcome::Missed);
        };

        let picked = PickedFace {
            node: hit.node,
            mesh: hit.mesh,
            face_index: hit.face_index,
            face: hit.face,
        };
        debug!(
            "picked face {} of mesh {:?} at distance {:.3}",
            picked.face_index, picked.mesh, hit.distance
        );
        self.selection = Selection::Selected(picked);

        self.paint_face(graph, &picked, color)?;
        Ok(PickOutcome::Painted(picked))
    }

    /// Re-applies `color` to the last picked triangle
    pub fn paint_selection(
        &mut self,
        scene: &mut Scene,
        color: PaintColor,
    ) -> Result<PickedFace, PaintError> {
        let picked = *self.selection.picked().ok_or(PaintError::NoSelection)?;
        let graph = scene.model_mut().ok_or(PaintError::NoSelection)?;
        self.paint_face(graph, &picked, color)?;
        Ok(picked)
    }

    fn paint_face(
        &mut self,
        graph: &mut SceneGraph,
        picked: &PickedFace,
        color: PaintColor,
    ) -> Result<(), PaintError> {
        let material = self.material_for_paint(graph, picked.mesh)?;

        let mesh = graph.mesh_mut(picked.mesh).ok_or(PaintError::NoSelection)?;
        let colors = mesh.ensure_colors();
        let rgb = color.to_array();
        for vertex in picked.face {
            colors.set(vertex as usize, rgb);
        }
        colors.mark_dirty();

        if let Some(material) = graph.materials_mut().get_mut(material) {
            material.vertex_colors = true;
            material.mark_dirty();
        }

        info!(
            "painted face {} of '{}' {}",
            picked.face_index,
            graph.mesh(picked.mesh).map_or("?", |m| m.name.as_str()),
            color
        );
        Ok(())
    }

    /// Material the mesh may recolor, cloning a shared one the first time round
    fn material_for_paint(
        &mut self,
        graph: &mut SceneGraph,
        mesh_id: MeshId,
    ) -> Result<MaterialId, PaintError> {
        let mesh = graph.mesh(mesh_id).ok_or(PaintError::NoSelection)?;
        let missing = || PaintError::MaterialMissing {
            mesh: mesh.name.clone(),
        };
        let material_id = mesh.material.ok_or_else(missing)?;
        let material = graph.materials().get(material_id).ok_or_else(missing)?;

        if !material.kind.supports_vertex_colors() {
            return Err(PaintError::UnsupportedMaterial {
                name: material.name.clone(),
                kind: material.kind,
            });
        }

        if let Some(&owned) = self.private_materials.get(&mesh_id) {
            return Ok(owned);
        }

        let owned = if graph.material_users(material_id) > 1 {
            let name = format!("{} ({})", material.name, mesh.name);
            let copy = graph
                .materials_mut()
                .duplicate(material_id, name)
                .ok_or(PaintError::NoSelection)?;
            if let Some(mesh) = graph.mesh_mut(mesh_id) {
                mesh.material = Some(copy);
            }
            debug!("cloned shared material for mesh {:?}", mesh_id);
            copy
        } else {
            material_id
        };

        self.private_materials.insert(mesh_id, owned);
        Ok(owned)
    }
}

#[cfg(test)]
mod tests {
    use cgmath::{Deg, Vector3, Zero};

    use super::*;
    use crate::gfx::scene::{
        graph::Transform,
        material::{Material, MaterialKind},
        mesh::Mesh,
    };

    const VIEWPORT: Viewport = Viewport {
        x: 0.0,
        y: 0.0,
        width: 600.0,
        height: 600.0,
    };

    fn camera() -> OrbitCamera {
        let mut camera = OrbitCamera::new(5.0, 0.0, 0.0, Vector3::zero(), 1.0)
            .with_projection(Deg(75.0), 0.1, 1000.0);
        camera.look_from(Vector3::new(0.0, 0.0, 5.0), Vector3::zero());
        camera
    }

    /// Two triangles with separate vertices covering the square -1..1 in XY
    fn quad_mesh(name: &str, material: Option<MaterialId>) -> Mesh {
        let mesh = Mesh::new(
            name,
            vec![
                [-1.0, -1.0, 0.0],
                [1.0, -1.0, 0.0],
                [1.0, 1.0, 0.0],
                [-1.0, -1.0, 0.0],
                [1.0, 1.0, 0.0],
                [-1.0, 1.0, 0.0],
            ],
            vec![0, 1, 2, 3, 4, 5],
        );
        match material {
            Some(m) => mesh.with_material(m),
            None => mesh,
        }
    }

    fn scene_with(graph: SceneGraph) -> Scene {
        let mut scene = Scene::new([0.0; 3]);
        scene.attach(graph);
        scene
    }

    fn quad_scene(kind: MaterialKind) -> Scene {
        let mut graph = SceneGraph::new("root");
        let material = graph.add_material(Material::new("plane", kind));
        let mesh = graph.add_mesh(quad_mesh("plane", Some(material)));
        graph.add_mesh_node(graph.root(), "plane", Transform::default(), mesh);
        scene_with(graph)
    }

    fn colors_of(scene: &Scene, mesh: usize) -> Vec<[f32; 3]> {
        scene
            .model()
            .and_then(|g| g.mesh(MeshId(mesh)))
            .and_then(|m| m.colors.as_ref())
            .map(|c| c.as_slice().to_vec())
            .unwrap_or_default()
    }

    #[test]
    fn test_center_click_paints_single_triangle_plane() {
        let mut graph = SceneGraph::new("root");
        let material = graph.add_material(Material::new("m", MaterialKind::Standard));
        let mesh = graph.add_mesh(
            Mesh::new(
                "tri",
                vec![[-1.0, -1.0, 0.0], [1.0, -1.0, 0.0], [0.0, 1.0, 0.0]],
                vec![0, 1, 2],
            )
            .with_material(material),
        );
        graph.add_mesh_node(graph.root(), "tri", Transform::default(), mesh);
        let mut scene = scene_with(graph);

        let red: PaintColor = "#ff0000".parse().unwrap();
        let mut engine = PaintEngine::new();
        let outcome = engine
            .pick_and_paint((300.0, 300.0), &VIEWPORT, &camera(), &mut scene, red)
            .unwrap();

        assert!(matches!(outcome, PickOutcome::Painted(_)));
        assert_eq!(colors_of(&scene, 0), vec![[1.0, 0.0, 0.0]; 3]);

        let material = scene.model().unwrap().materials().get(material).unwrap();
        assert!(material.vertex_colors);
        assert_eq!(material.version(), 1);
    }

    #[test]
    fn test_second_click_only_touches_new_triangle() {
        let mut scene = quad_scene(MaterialKind::Standard);
        let mut engine = PaintEngine::new();
        let red = PaintColor::new(1.0, 0.0, 0.0);
        let green = PaintColor::new(0.0, 1.0, 0.0);

        // Lower right of the view: first triangle
        engine
            .pick_and_paint((340.0, 310.0), &VIEWPORT, &camera(), &mut scene, red)
            .unwrap();
        let after_first = colors_of(&scene, 0);
        assert_eq!(&after_first[0..3], &[[1.0, 0.0, 0.0]; 3]);
        assert_eq!(&after_first[3..6], &[[1.0, 1.0, 1.0]; 3]);

        // Upper left: second triangle
        let outcome = engine
            .pick_and_paint((260.0, 290.0), &VIEWPORT, &camera(), &mut scene, green)
            .unwrap();
        let PickOutcome::Painted(picked) = outcome else {
            panic!("expected a hit, got {:?}", outcome);
        };
        assert_eq!(picked.face_index, 1);

        let after_second = colors_of(&scene, 0);
        assert_eq!(&after_second[0..3], &[[1.0, 0.0, 0.0]; 3]);
        assert_eq!(&after_second[3..6], &[[0.0, 1.0, 0.0]; 3]);
    }

    #[test]
    fn test_miss_clears_selection_without_mutation() {
        let mut scene = quad_scene(MaterialKind::Phong);
        let mut engine = PaintEngine::new();
        let red = PaintColor::new(1.0, 0.0, 0.0);

        engine
            .pick_and_paint((300.0, 300.0), &VIEWPORT, &camera(), &mut scene, red)
            .unwrap();
        assert!(matches!(engine.selection(), Selection::Selected(_)));
        let before = colors_of(&scene, 0);
        let version = scene.model().unwrap().mesh(MeshId(0)).unwrap().colors.as_ref().unwrap().version();

        let outcome = engine
            .pick_and_paint((10.0, 10.0), &VIEWPORT, &camera(), &mut scene, PaintColor::new(0.0, 0.0, 1.0))
            .unwrap();

        assert_eq!(outcome, PickOutcome::Missed);
        assert_eq!(engine.selection(), Selection::Unselected);
        assert_eq!(colors_of(&scene, 0), before);
        let mesh = scene.model().unwrap().mesh(MeshId(0)).unwrap();
        assert_eq!(mesh.colors.as_ref().unwrap().version(), version);
    }

    #[test]
    fn test_miss_on_untouched_model_allocates_nothing() {
        let mut scene = quad_scene(MaterialKind::Standard);
        let mut engine = PaintEngine::new();

        let outcome = engine
            .pick_and_paint((5.0, 590.0), &VIEWPORT, &camera(), &mut scene, PaintColor::default())
            .unwrap();

        assert_eq!(outcome, PickOutcome::Missed);
        let graph = scene.model().unwrap();
        assert!(graph.mesh(MeshId(0)).unwrap().colors.is_none());
        assert_eq!(graph.materials().len(), 1);
        assert_eq!(graph.materials().iter().next().unwrap().1.version(), 0);
    }

    #[test]
    fn test_pointer_outside_viewport_is_ignored() {
        let mut scene = quad_scene(MaterialKind::Standard);
        let mut engine = PaintEngine::new();
        let viewport = Viewport::new(300.0, 0.0, 600.0, 600.0);

        let outcome = engine
            .pick_and_paint((100.0, 300.0), &viewport, &camera(), &mut scene, PaintColor::default())
            .unwrap();

        assert_eq!(outcome, PickOutcome::Ignored);
        assert!(colors_of(&scene, 0).is_empty());
    }

    #[test]
    fn test_shared_material_is_cloned_before_painting() {
        let mut graph = SceneGraph::new("root");
        let shared = graph.add_material(Material::new("shared", MaterialKind::Standard));
        let left = graph.add_mesh(quad_mesh("left", Some(shared)));
        let right = graph.add_mesh(quad_mesh("right", Some(shared)));
        graph.add_mesh_node(graph.root(), "left", Transform::default(), left);
        graph.add_mesh_node(
            graph.root(),
            "right",
            Transform::from_translation(Vector3::new(0.0, 0.0, -10.0)),
            right,
        );
        let mut scene = scene_with(graph);
        let mut engine = PaintEngine::new();

        engine
            .pick_and_paint((300.0, 300.0), &VIEWPORT, &camera(), &mut scene, PaintColor::default())
            .unwrap();
        engine
            .pick_and_paint((340.0, 310.0), &VIEWPORT, &camera(), &mut scene, PaintColor::default())
            .unwrap();

        let graph = scene.model().unwrap();
        let left_material = graph.mesh(left).unwrap().material.unwrap();
        assert_ne!(left_material, shared);
        assert_eq!(graph.materials().len(), 2, "clone happens once per mesh");
        assert_eq!(graph.materials().get(left_material).unwrap().name, "shared (left)");

        let original = graph.materials().get(shared).unwrap();
        assert!(!original.vertex_colors);
        assert_eq!(original.version(), 0);
        assert_eq!(graph.mesh(right).unwrap().material, Some(shared));
        assert!(graph.mesh(right).unwrap().colors.is_none());
    }

    #[test]
    fn test_unsupported_material_is_not_mutated() {
        let mut scene = quad_scene(MaterialKind::SpecularGlossiness);
        let mut engine = PaintEngine::new();

        let err = engine
            .pick_and_paint((300.0, 300.0), &VIEWPORT, &camera(), &mut scene, PaintColor::default())
            .unwrap_err();

        assert!(matches!(
            err,
            PaintError::UnsupportedMaterial { kind: MaterialKind::SpecularGlossiness, .. }
        ));
        assert!(colors_of(&scene, 0).is_empty());
        assert!(matches!(engine.selection(), Selection::Selected(_)));
    }

    #[test]
    fn test_mesh_without_material_is_reported() {
        let mut graph = SceneGraph::new("root");
        let mesh = graph.add_mesh(quad_mesh("bare", None));
        graph.add_mesh_node(graph.root(), "bare", Transform::default(), mesh);
        let mut scene = scene_with(graph);

        let err = PaintEngine::new()
            .pick_and_paint((300.0, 300.0), &VIEWPORT, &camera(), &mut scene, PaintColor::default())
            .unwrap_err();

        assert_eq!(err, PaintError::MaterialMissing { mesh: "bare".to_string() });
        assert!(colors_of(&scene, 0).is_empty());
    }

    #[test]
    fn test_paint_selection_requires_a_pick() {
        let mut scene = quad_scene(MaterialKind::Basic);
        let mut engine = PaintEngine::new();

        assert_eq!(
            engine.paint_selection(&mut scene, PaintColor::default()),
            Err(PaintError::NoSelection)
        );
        assert!(colors_of(&scene, 0).is_empty());

        engine
            .pick_and_paint((340.0, 310.0), &VIEWPORT, &camera(), &mut scene, PaintColor::new(1.0, 0.0, 0.0))
            .unwrap();
        let picked = engine
            .paint_selection(&mut scene, PaintColor::new(0.0, 0.0, 1.0))
            .unwrap();

        assert_eq!(picked.face_index, 0);
        assert_eq!(&colors_of(&scene, 0)[0..3], &[[0.0, 0.0, 1.0]; 3]);
    }
}
