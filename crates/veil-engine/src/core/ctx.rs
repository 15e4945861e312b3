use anyhow::Context;
use winit::window::Window;

use crate::device::{Gpu, SurfaceErrorAction};
use crate::render::RenderCtx;
use crate::time::FrameTime;
use crate::window::RuntimeCtx;

use super::app::AppControl;

/// Context handed to [`App::on_start`](super::App::on_start).
pub struct StartCtx<'a, 'w> {
    pub window: &'a Window,
    pub gpu: &'a Gpu<'w>,
}

impl StartCtx<'_, '_> {
    /// Render context for one-time GPU setup.
    pub fn render_ctx(&self) -> anyhow::Result<RenderCtx<'_>> {
        let extent = self
            .gpu
            .extent()
            .context("window has no drawable area at startup")?;
        Ok(RenderCtx::new(
            self.gpu.device(),
            self.gpu.queue(),
            self.gpu.surface_format(),
            extent,
        ))
    }
}

/// Per-frame context passed to `core::App::on_frame`.
///
/// Lifetimes:
/// - `'a` is the duration of the callback invocation
/// - `'w` is the window-borrow lifetime carried by `Gpu<'w>`
pub struct FrameCtx<'a, 'w> {
    pub window: &'a Window,
    pub gpu: &'a mut Gpu<'w>,
    pub time: FrameTime,
    pub runtime: &'a mut RuntimeCtx,
}

impl FrameCtx<'_, '_> {
    /// Acquires the surface texture, calls `draw` with a ready [`RenderCtx`] and
    /// the surface view, then presents the frame.
    ///
    /// Skips the frame (returning `Continue`) while the window is minimized or the
    /// surface had to be reconfigured; a fatal surface error yields `Exit`.
    pub fn render<F>(&mut self, draw: F) -> anyhow::Result<AppControl>
    where
        F: FnOnce(&RenderCtx<'_>, &wgpu::TextureView) -> anyhow::Result<()>,
    {
        let Some(extent) = self.gpu.extent() else {
            return Ok(AppControl::Continue);
        };

        let frame = match self.gpu.begin_frame() {
            Ok(f) => f,
            Err(err) => {
                let action = self.gpu.handle_surface_error(err);
                if action == SurfaceErrorAction::Fatal {
                    return Ok(AppControl::Exit);
                }
                return Ok(AppControl::Continue);
            }
        };

        let rctx = RenderCtx::new(
            self.gpu.device(),
            self.gpu.queue(),
            self.gpu.surface_format(),
            extent,
        );
        draw(&rctx, &frame.view)?;

        self.window.pre_present_notify();
        frame.present();

        Ok(AppControl::Continue)
    }
}
