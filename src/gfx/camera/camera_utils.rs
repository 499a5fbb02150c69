use cgmath::Matrix4;

pub trait Camera: Sized {
    /// Clip-space transform in wgpu's 0..1 depth convention
    fn build_view_projection_matrix(&self) -> Matrix4<f32>;
}
