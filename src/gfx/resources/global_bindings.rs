//! Per-frame and per-draw uniform data
//!
//! Group 0 holds the camera and the scene's two baseline lights. Group 1
//! holds one mesh node's world transform and material factors.

use cgmath::{InnerSpace, Matrix, Matrix4, SquareMatrix, Vector3};

use crate::{
    gfx::{
        camera::{Camera, OrbitCamera},
        scene::{Light, Material, Scene},
    },
    wgpu_utils::{single_uniform_bind_group, single_uniform_layout, UniformBuffer},
};

/// Set in [`DrawUniformContent::flags`] when the material ignores lighting
pub const FLAG_UNLIT: u32 = 1;

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct GlobalUBOContent {
    pub view_position: [f32; 4],
    pub view_proj: [[f32; 4]; 4],
    /// Direction the light travels *from*, normalized; w unused
    pub light_direction: [f32; 4],
    /// RGB premultiplied by intensity
    pub light_color: [f32; 4],
    pub ambient_color: [f32; 4],
}

impl GlobalUBOContent {
    pub fn new(camera: &OrbitCamera, scene: &Scene) -> Self {
        let mut content = Self {
            view_position: [camera.eye.x, camera.eye.y, camera.eye.z, 1.0],
            view_proj: camera.build_view_projection_matrix().into(),
            light_direction: [0.0, 1.0, 0.0, 0.0],
            light_color: [0.0; 4],
            ambient_color: [0.0; 4],
        };

        for light in scene.lights() {
            match *light {
                Light::Directional {
                    direction,
                    color,
                    intensity,
                } => {
                    let direction = if direction.magnitude2() > 0.0 {
                        direction.normalize()
                    } else {
                        Vector3::unit_y()
                    };
                    content.light_direction = [direction.x, direction.y, direction.z, 0.0];
                    content.light_color = scaled(color, intensity);
                }
                Light::Ambient { color, intensity } => {
                    content.ambient_color = scaled(color, intensity);
                }
            }
        }
        content
    }
}

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct DrawUniformContent {
    pub model: [[f32; 4]; 4],
    pub normal_matrix: [[f32; 4]; 4],
    pub base_color: [f32; 4],
    pub flags: u32,
    _padding: [u32; 3],
}

impl DrawUniformContent {
    pub fn new(world: Matrix4<f32>, material: Option<&Material>) -> Self {
        let normal_matrix = world
            .invert()
            .map(|m| m.transpose())
            .unwrap_or(Matrix4::identity());

        let (base_color, flags) = match material {
            Some(material) => (
                material.base_color,
                if material.kind.is_unlit() { FLAG_UNLIT } else { 0 },
            ),
            None => ([1.0, 1.0, 1.0, 1.0], 0),
        };

        Self {
            model: world.into(),
            normal_matrix: normal_matrix.into(),
            base_color,
            flags,
            _padding: [0; 3],
        }
    }
}

fn scaled(color: [f32; 3], intensity: f32) -> [f32; 4] {
    [
        color[0] * intensity,
        color[1] * intensity,
        color[2] * intensity,
        1.0,
    ]
}

pub type GlobalUBO = UniformBuffer<GlobalUBOContent>;
pub type DrawUBO = UniformBuffer<DrawUniformContent>;

/// Bind group layouts for both groups, plus the global bind group
pub struct GlobalBindings {
    global_layout: wgpu::BindGroupLayout,
    draw_layout: wgpu::BindGroupLayout,
    bind_group: wgpu::BindGroup,
}

impl GlobalBindings {
    pub fn new(device: &wgpu::Device, ubo: &GlobalUBO) -> Self {
        let global_layout = single_uniform_layout(device, "Global Bind Group Layout");
        let draw_layout = single_uniform_layout(device, "Draw Bind Group Layout");
        let bind_group = single_uniform_bind_group(
            device,
            &global_layout,
            ubo.binding_resource(),
            "Global Bind Group",
        );

        Self {
            global_layout,
            draw_layout,
            bind_group,
        }
    }

    /// Per-node uniform buffer and its bind group
    pub fn create_draw_binding(
        &self,
        device: &wgpu::Device,
        content: &DrawUniformContent,
    ) -> (DrawUBO, wgpu::BindGroup) {
        let ubo = DrawUBO::new_with_data(device, content);
        let bind_group = single_uniform_bind_group(
            device,
            &self.draw_layout,
            ubo.binding_resource(),
            "Draw Bind Group",
        );
        (ubo, bind_group)
    }

    pub fn layouts(&self) -> Vec<wgpu::BindGroupLayout> {
        vec![self.global_layout.clone(), self.draw_layout.clone()]
    }

    pub fn bind_group(&self) -> &wgpu::BindGroup {
        &self.bind_group
    }
}

#[cfg(test)]
mod tests {
    use cgmath::{Deg, Vector3, Zero};

    use super::*;
    use crate::{config::LightingConfig, gfx::scene::MaterialKind};

    #[test]
    fn test_lights_are_folded_into_globals() {
        let mut scene = Scene::new([0.0; 3]);
        scene.ensure_baseline_lighting(&LightingConfig::default());
        let camera = OrbitCamera::new(5.0, 0.0, 0.0, Vector3::zero(), 1.0)
            .with_projection(Deg(75.0), 0.1, 1000.0);

        let content = GlobalUBOContent::new(&camera, &scene);

        let d = 1.0 / 3f32.sqrt();
        for axis in 0..3 {
            assert!((content.light_direction[axis] - d).abs() < 1e-5);
        }
        assert_eq!(content.light_color, [2.0, 2.0, 2.0, 1.0]);
        assert!((content.ambient_color[0] - 128.0 / 255.0).abs() < 1e-6);
    }

    #[test]
    fn test_draw_uniform_flags_unlit() {
        let unlit = Material::new("flat", MaterialKind::Basic).with_base_color([0.2, 0.4, 0.6, 1.0]);
        let content = DrawUniformContent::new(Matrix4::identity(), Some(&unlit));
        assert_eq!(content.flags, FLAG_UNLIT);
        assert_eq!(content.base_color, [0.2, 0.4, 0.6, 1.0]);

        let lit = Material::new("lit", MaterialKind::Standard);
        assert_eq!(DrawUniformContent::new(Matrix4::identity(), Some(&lit)).flags, 0);
    }

    #[test]
    fn test_normal_matrix_undoes_scale() {
        let world = Matrix4::from_nonuniform_scale(2.0, 1.0, 1.0);
        let content = DrawUniformContent::new(world, None);
        assert!((content.normal_matrix[0][0] - 0.5).abs() < 1e-6);
        assert_eq!(content.normal_matrix[1][1], 1.0);
    }
}
