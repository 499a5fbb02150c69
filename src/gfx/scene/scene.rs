use cgmath::{InnerSpace, Vector3};

use super::graph::{NodeId, SceneGraph};
use crate::config::LightingConfig;

/// A light in the scene
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Light {
    /// Parallel light shining from `direction` towards the origin
    Directional {
        direction: Vector3<f32>,
        color: [f32; 3],
        intensity: f32,
    },
    Ambient {
        color: [f32; 3],
        intensity: f32,
    },
}

/// Main scene: baseline lights plus at most one attached model
pub struct Scene {
    pub background: [f32; 3],
    lights: Vec<Light>,
    model: Option<SceneGraph>,
    pickables: Vec<NodeId>,
    generation: u64,
}

impl Scene {
    pub fn new(background: [f32; 3]) -> Self {
        Self {
            background,
            lights: Vec::new(),
            model: None,
            pickables: Vec::new(),
            generation: 0,
        }
    }

    /// Replaces the light list with exactly one directional and one ambient light
    ///
    /// Calling it any number of times leaves the same two lights behind.
    pub fn ensure_baseline_lighting(&mut self, lighting: &LightingConfig) {
        let direction = Vector3::from(lighting.directional_position);
        let direction = if direction.magnitude2() > 0.0 {
            direction.normalize()
        } else {
            Vector3::unit_y()
        };

        self.lights = vec![
            Light::Directional {
                direction,
                color: lighting.directional_color,
                intensity: lighting.directional_intensity,
            },
            Light::Ambient {
                color: lighting.ambient_color,
                intensity: 1.0,
            },
        ];
    }

    /// Attaches `model` and makes the root's immediate children pickable
    ///
    /// Returns the previously attached model, which is no longer drawn or picked.
    pub fn attach(&mut self, model: SceneGraph) -> Option<SceneGraph> {
        self.pickables = model
            .node(model.root())
            .map(|root| root.children.clone())
            .unwrap_or_default();
        self.generation += 1;
        self.model.replace(model)
    }

    pub fn model(&self) -> Option<&SceneGraph> {
        self.model.as_ref()
    }

    pub fn model_mut(&mut self) -> Option<&mut SceneGraph> {
        self.model.as_mut()
    }

    pub fn lights(&self) -> &[Light] {
        &self.lights
    }

    /// Top-level nodes that pick rays are tested against (recursively)
    pub fn pickables(&self) -> &[NodeId] {
        &self.pickables
    }

    /// Changes every time the attached model is replaced
    pub fn generation(&self) -> u64 {
        self.generation
    }
}
