use super::RenderCtx;
use crate::oit::DrawRouter;

/// Owner of the shader programs and render pipelines used by a mesh library.
///
/// Pipelines must be built against the layouts the frame pipeline provides:
/// `frame_layout` at [`FRAME_BIND_GROUP`](super::FRAME_BIND_GROUP), opaque
/// pipelines with [`oit::blend::opaque_color_target`](crate::oit::blend::opaque_color_target)
/// and translucent ones with
/// [`oit::blend::translucent_color_targets`](crate::oit::blend::translucent_color_targets).
pub trait ShaderState {
    /// Called once before the first frame.
    fn initialize(
        &mut self,
        ctx: &RenderCtx<'_>,
        frame_layout: &wgpu::BindGroupLayout,
    ) -> anyhow::Result<()>;

    /// Called once per frame before any draw is recorded.
    fn prepare_for_render(&mut self, ctx: &RenderCtx<'_>) -> anyhow::Result<()> {
        let _ = ctx;
        Ok(())
    }
}

/// Source of the frame's geometry.
pub trait MeshLibrary {
    type Shaders: ShaderState;

    /// Called once before the first frame.
    fn initialize(&mut self, ctx: &RenderCtx<'_>) -> anyhow::Result<()>;

    /// Records every draw of the frame.
    ///
    /// Each item is routed by its [`SurfaceClass`](crate::oit::SurfaceClass):
    /// opaque geometry through [`DrawRouter::opaque`], then translucent geometry
    /// through [`DrawRouter::translucent`].
    fn render(
        &mut self,
        ctx: &RenderCtx<'_>,
        shaders: &Self::Shaders,
        router: &mut DrawRouter<'_>,
    ) -> anyhow::Result<()>;
}
