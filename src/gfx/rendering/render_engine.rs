//! WGPU-based rendering engine
//!
//! Draws the attached model into the 3D viewport rectangle of the window and
//! then hands the frame to a UI callback for the overlay pass.

use std::sync::Arc;

use anyhow::{anyhow, Context};
use log::{info, warn};
use wgpu::TextureFormat;

use crate::gfx::{
    camera::OrbitCamera,
    picking::Viewport,
    resources::{
        global_bindings::{GlobalBindings, GlobalUBO, GlobalUBOContent},
        mesh_cache::{MeshCache, PIPELINE_DOUBLE, PIPELINE_FRONT, PIPELINE_FRONT_MIRRORED},
        texture_resource::TextureResource,
    },
    scene::Scene,
};

use super::pipeline_manager::{PipelineConfig, PipelineManager};

const SHADER: &str = "mesh";

/// Core rendering engine managing GPU resources and draw calls
pub struct RenderEngine {
    surface: wgpu::Surface<'static>,
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    config: wgpu::SurfaceConfiguration,
    depth_texture: TextureResource,
    format: TextureFormat,
    pipeline_manager: PipelineManager,
    global_ubo: GlobalUBO,
    global_bindings: GlobalBindings,
    mesh_cache: MeshCache,
}

impl RenderEngine {
    /// Creates a new render engine for the given window
    ///
    /// # Errors
    /// Fails when no adapter or device is available, or the mesh pipelines
    /// cannot be built.
    pub async fn new(
        window: impl Into<wgpu::SurfaceTarget<'static>>,
        width: u32,
        height: u32,
    ) -> anyhow::Result<RenderEngine> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let surface = instance
            .create_surface(window)
            .context("failed to create surface")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("failed to request adapter")?;
        info!("using adapter {:?}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("WGPU Device"),
                required_features: wgpu::Features::default(),
                required_limits: wgpu::Limits {
                    max_texture_dimension_2d: 4096,
                    ..wgpu::Limits::downlevel_defaults()
                },
                memory_hints: wgpu::MemoryHints::default(),
                trace: wgpu::Trace::Off,
            })
            .await
            .context("failed to request a device")?;
        let device = Arc::new(device);
        let queue = Arc::new(queue);

        let surface_capabilities = surface.get_capabilities(&adapter);
        // Colors are written as given, without sRGB conversion
        let format = surface_capabilities
            .formats
            .iter()
            .copied()
            .find(|f| !f.is_srgb())
            .or_else(|| surface_capabilities.formats.first().copied())
            .ok_or_else(|| anyhow!("surface reports no texture formats"))?;
        let alpha_mode = surface_capabilities
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: width.max(1),
            height: height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let depth_texture =
            TextureResource::create_depth_texture(&device, &config, "depth_texture");

        let global_ubo = GlobalUBO::new_with_data(
            &device,
            &GlobalUBOContent {
                view_position: [0.0; 4],
                view_proj: cgmath::Matrix4::<f32>::from_scale(1.0).into(),
                light_direction: [0.0, 1.0, 0.0, 0.0],
                light_color: [0.0; 4],
                ambient_color: [0.0; 4],
            },
        );
        let global_bindings = GlobalBindings::new(&device, &global_ubo);

        let mut pipeline_manager = PipelineManager::new(device.clone());
        pipeline_manager.load_shader(SHADER, include_str!("shader.wgsl"));

        let base = PipelineConfig::default_with_shader(SHADER)
            .with_bind_group_layouts(global_bindings.layouts())
            .with_depth_format(TextureResource::DEPTH_FORMAT)
            .with_color_targets(vec![Some(wgpu::ColorTargetState {
                format,
                blend: Some(wgpu::BlendState::REPLACE),
                write_mask: wgpu::ColorWrites::ALL,
            })]);
        pipeline_manager.register_pipeline(
            PIPELINE_FRONT,
            base.clone().with_label("Front-Faced Mesh Pipeline"),
        );
        pipeline_manager.register_pipeline(
            PIPELINE_FRONT_MIRRORED,
            base.clone()
                .with_label("Mirrored Mesh Pipeline")
                .with_front_face(wgpu::FrontFace::Cw),
        );
        pipeline_manager.register_pipeline(
            PIPELINE_DOUBLE,
            base.with_label("Double-Sided Mesh Pipeline")
                .with_cull_mode(None),
        );
        pipeline_manager
            .create_all_pipelines()
            .map_err(|errors| anyhow!(errors.join("; ")))?;

        Ok(RenderEngine {
            surface,
            device,
            queue,
            config,
            depth_texture,
            format,
            pipeline_manager,
            global_ubo,
            global_bindings,
            mesh_cache: MeshCache::new(),
        })
    }

    /// Uploads camera, lights and any geometry or colors that changed
    pub fn update(&mut self, camera: &OrbitCamera, scene: &Scene) {
        self.global_ubo
            .update_content(&self.queue, GlobalUBOContent::new(camera, scene));
        self.mesh_cache
            .sync(&self.device, &self.queue, &self.global_bindings, scene);
    }

    /// Renders the scene into `viewport`, then runs `ui_callback` over the whole frame
    pub fn render_frame<F>(&mut self, scene: &Scene, viewport: Viewport, ui_callback: F)
    where
        F: FnOnce(&wgpu::Device, &wgpu::Queue, &mut wgpu::CommandEncoder, &wgpu::TextureView),
    {
        let surface_texture = match self.surface.get_current_texture() {
            Ok(texture) => texture,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                warn!("surface lost, reconfiguring");
                self.surface.configure(&self.device, &self.config);
                return;
            }
            Err(err) => {
                warn!("skipping frame: {}", err);
                return;
            }
        };

        let surface_texture_view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        {
            let [r, g, b] = scene.background;
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Main Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &surface_texture_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: r as f64,
                            g: g as f64,
                            b: b as f64,
                            a: 1.0,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_texture.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            if let Some((x, y, width, height)) = clamp_viewport(viewport, &self.config) {
                render_pass.set_viewport(x, y, width, height, 0.0, 1.0);
                render_pass.set_scissor_rect(x as u32, y as u32, width as u32, height as u32);
                render_pass.set_bind_group(0, self.global_bindings.bind_group(), &[]);

                for item in self.mesh_cache.draw_items() {
                    let Some(pipeline) = self.pipeline_manager.pipeline(item.pipeline) else {
                        continue;
                    };
                    render_pass.set_pipeline(pipeline);
                    render_pass.set_bind_group(1, item.bind_group, &[]);
                    render_pass.set_vertex_buffer(0, item.mesh.vertex_buffer.slice(..));
                    render_pass
                        .set_index_buffer(item.mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                    render_pass.draw_indexed(0..item.mesh.index_count, 0, 0..1);
                }
            }
        }

        ui_callback(&self.device, &self.queue, &mut encoder, &surface_texture_view);

        self.queue.submit(std::iter::once(encoder.finish()));
        surface_texture.present();
    }

    /// Resizes the surface and depth buffer
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.device, &self.config);
        self.depth_texture =
            TextureResource::create_depth_texture(&self.device, &self.config, "depth_texture");
    }

    pub fn get_surface_size(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.format
    }

    /// Number of meshes currently held on the GPU
    pub fn gpu_mesh_count(&self) -> usize {
        self.mesh_cache.len()
    }
}

/// Whole-pixel viewport rectangle inside the surface, or `None` if empty
fn clamp_viewport(
    viewport: Viewport,
    config: &wgpu::SurfaceConfiguration,
) -> Option<(f32, f32, f32, f32)> {
    let surface_w = config.width as f32;
    let surface_h = config.height as f32;
    let x = viewport.x.max(0.0).min(surface_w).floor();
    let y = viewport.y.max(0.0).min(surface_h).floor();
    let width = (viewport.x + viewport.width).min(surface_w).floor() - x;
    let height = (viewport.y + viewport.height).min(surface_h).floor() - y;

    (width >= 1.0 && height >= 1.0).then_some((x, y, width, height))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn surface(width: u32, height: u32) -> wgpu::SurfaceConfiguration {
        wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: TextureFormat::Bgra8Unorm,
            width,
            height,
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: wgpu::CompositeAlphaMode::Auto,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        }
    }

    #[test]
    fn test_viewport_right_of_panel() {
        let rect = clamp_viewport(Viewport::new(300.0, 0.0, 900.0, 800.0), &surface(1200, 800));
        assert_eq!(rect, Some((300.0, 0.0, 900.0, 800.0)));
    }

    #[test]
    fn test_viewport_clamped_to_surface() {
        let rect = clamp_viewport(Viewport::new(300.0, 0.0, 900.0, 800.0), &surface(1000, 600));
        assert_eq!(rect, Some((300.0, 0.0, 700.0, 600.0)));
    }

    #[test]
    fn test_viewport_hidden_by_panel() {
        assert_eq!(
            clamp_viewport(Viewport::new(300.0, 0.0, 0.0, 800.0), &surface(300, 800)),
            None
        );
    }
}
