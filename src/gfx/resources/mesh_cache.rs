//! GPU copies of the attached model's meshes
//!
//! Buffers are keyed by [`MeshId`] and dropped wholesale when the scene's
//! generation changes. A mesh is re-uploaded when its color attribute or
//! material version moves past what was last uploaded.

use std::collections::HashMap;

use cgmath::{Matrix4, SquareMatrix};
use log::debug;
use wgpu::util::DeviceExt;

use super::global_bindings::{DrawUBO, DrawUniformContent, GlobalBindings};
use crate::gfx::{
    rendering::vertex::Vertex3D,
    scene::{Material, MaterialId, Mesh, MeshId, NodeId, Scene, SceneGraph, Side},
};

pub const PIPELINE_FRONT: &str = "Front";
pub const PIPELINE_FRONT_MIRRORED: &str = "FrontMirrored";
pub const PIPELINE_DOUBLE: &str = "Double";

/// The versions a GPU copy was built from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadStamp {
    material: Option<MaterialId>,
    material_version: u64,
    colors: Option<u64>,
}

impl UploadStamp {
    pub fn of(mesh: &Mesh, graph: &SceneGraph) -> Self {
        let material_version = mesh
            .material
            .and_then(|id| graph.materials().get(id))
            .map_or(0, |m| m.version());

        Self {
            material: mesh.material,
            material_version,
            colors: mesh.colors.as_ref().map(|c| c.version()),
        }
    }
}

pub struct GpuMesh {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub index_count: u32,
    stamp: UploadStamp,
}

struct NodeDraw {
    mesh: MeshId,
    pipeline: &'static str,
    ubo: DrawUBO,
    bind_group: wgpu::BindGroup,
}

/// One draw call's worth of state, borrowed from the cache
pub struct DrawItem<'a> {
    pub pipeline: &'static str,
    pub mesh: &'a GpuMesh,
    pub bind_group: &'a wgpu::BindGroup,
}

#[derive(Default)]
pub struct MeshCache {
    generation: Option<u64>,
    meshes: HashMap<MeshId, GpuMesh>,
    draws: Vec<(NodeId, NodeDraw)>,
}

impl MeshCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Brings GPU buffers and per-node uniforms in line with `scene`
    pub fn sync(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        bindings: &GlobalBindings,
        scene: &Scene,
    ) {
        if self.generation != Some(scene.generation()) {
            debug!(
                "scene generation {} replaces {:?}, dropping {} GPU meshes",
                scene.generation(),
                self.generation,
                self.meshes.len()
            );
            self.meshes.clear();
            self.draws.clear();
            self.generation = Some(scene.generation());
        }

        let Some(graph) = scene.model() else {
            return;
        };

        for (mesh_id, mesh) in graph.meshes() {
            let stamp = UploadStamp::of(mesh, graph);
            let material = mesh.material.and_then(|id| graph.materials().get(id));

            match self.meshes.get_mut(&mesh_id) {
                Some(gpu) if gpu.stamp == stamp => {}
                Some(gpu) => {
                    let vertices = Vertex3D::from_mesh(mesh, material);
                    queue.write_buffer(&gpu.vertex_buffer, 0, bytemuck::cast_slice(&vertices));
                    gpu.stamp = stamp;
                }
                None => {
                    if let Some(gpu) = upload(device, mesh, material, stamp) {
                        self.meshes.insert(mesh_id, gpu);
                    }
                }
            }
        }

        if self.draws.is_empty() {
            for (node, mesh_id) in graph.mesh_nodes() {
                let (content, pipeline) = draw_state(graph, node, mesh_id);
                let (ubo, bind_group) = bindings.create_draw_binding(device, &content);
                self.draws.push((
                    node,
                    NodeDraw {
                        mesh: mesh_id,
                        pipeline,
                        ubo,
                        bind_group,
                    },
                ));
            }
        } else {
            for (node, draw) in self.draws.iter_mut() {
                let (content, pipeline) = draw_state(graph, *node, draw.mesh);
                draw.ubo.update_content(queue, content);
                draw.pipeline = pipeline;
            }
        }
    }

    pub fn draw_items(&self) -> impl Iterator<Item = DrawItem<'_>> {
        self.draws.iter().filter_map(|(_, draw)| {
            self.meshes.get(&draw.mesh).map(|mesh| DrawItem {
                pipeline: draw.pipeline,
                mesh,
                bind_group: &draw.bind_group,
            })
        })
    }

    pub fn len(&self) -> usize {
        self.meshes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }
}

fn upload(
    device: &wgpu::Device,
    mesh: &Mesh,
    material: Option<&Material>,
    stamp: UploadStamp,
) -> Option<GpuMesh> {
    if mesh.positions.is_empty() || mesh.indices.is_empty() {
        return None;
    }

    let vertices = Vertex3D::from_mesh(mesh, material);
    let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(&format!("{} Vertex Buffer", mesh.name)),
        contents: bytemuck::cast_slice(&vertices),
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
    });
    let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(&format!("{} Index Buffer", mesh.name)),
        contents: bytemuck::cast_slice(&mesh.indices),
        usage: wgpu::BufferUsages::INDEX,
    });

    Some(GpuMesh {
        vertex_buffer,
        index_buffer,
        index_count: mesh.indices.len() as u32,
        stamp,
    })
}

fn draw_state(
    graph: &SceneGraph,
    node: NodeId,
    mesh_id: MeshId,
) -> (DrawUniformContent, &'static str) {
    let world = graph.world_matrix(node);
    let material = graph
        .mesh(mesh_id)
        .and_then(|m| m.material)
        .and_then(|id| graph.materials().get(id));
    let side = material.map_or(Side::Front, |m| m.side);

    (DrawUniformContent::new(world, material), pipeline_for(side, world))
}

/// Picks the pipeline whose culling matches what picking treats as visible
pub fn pipeline_for(side: Side, world: Matrix4<f32>) -> &'static str {
    match side {
        Side::Double => PIPELINE_DOUBLE,
        Side::Front if world.determinant() < 0.0 => PIPELINE_FRONT_MIRRORED,
        Side::Front => PIPELINE_FRONT,
    }
}
