/// A surface texture acquired for one frame.
///
/// Short-lived: holding it prevents acquisition of the next frame. The frame
/// pipeline records into its own encoder and targets `view` in the final
/// composite pass.
pub struct GpuFrame {
    pub surface_texture: wgpu::SurfaceTexture,
    pub view: wgpu::TextureView,
}

impl GpuFrame {
    /// Presents the surface texture. Must follow the submission that wrote it.
    pub fn present(self) {
        drop(self.view);
        self.surface_texture.present();
    }
}
