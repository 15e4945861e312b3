use crate::coords::Extent;

/// Renderer-facing context (device/queue + surface format + drawable extent).
///
/// Built once per frame from the window's [`Gpu`](crate::device::Gpu) and handed
/// to the frame pipeline and its collaborators.
#[derive(Clone, Copy)]
pub struct RenderCtx<'a> {
    pub device: &'a wgpu::Device,
    pub queue: &'a wgpu::Queue,
    pub surface_format: wgpu::TextureFormat,
    pub extent: Extent, // physical px
}

impl<'a> RenderCtx<'a> {
    #[inline]
    pub fn new(
        device: &'a wgpu::Device,
        queue: &'a wgpu::Queue,
        surface_format: wgpu::TextureFormat,
        extent: Extent,
    ) -> Self {
        Self {
            device,
            queue,
            surface_format,
            extent,
        }
    }
}
