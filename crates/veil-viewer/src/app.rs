use anyhow::Context;
use winit::dpi::PhysicalSize;
use winit::event::WindowEvent;

use veil_engine::core::{App, AppControl, FrameCtx, StartCtx};
use veil_engine::render::{FramePipeline, PipelineConfig};
use veil_engine::time::FpsMeter;

use crate::input::CameraInput;
use crate::meshes::CubeLibrary;
use crate::shaders::CubeShaders;

/// The viewer: routes input to the active camera and renders the cube scene.
pub struct ViewerApp {
    title: String,
    config: PipelineConfig,
    pipeline: Option<FramePipeline>,
    shaders: CubeShaders,
    meshes: CubeLibrary,
    input: CameraInput,
    fps: FpsMeter,
}

impl ViewerApp {
    pub fn new(title: impl Into<String>, config: PipelineConfig) -> Self {
        Self {
            title: title.into(),
            config,
            pipeline: None,
            shaders: CubeShaders::new(),
            meshes: CubeLibrary::new(),
            input: CameraInput::default(),
            fps: FpsMeter::new(),
        }
    }
}

impl App for ViewerApp {
    fn on_start(&mut self, ctx: &mut StartCtx<'_, '_>) -> anyhow::Result<()> {
        let rctx = ctx.render_ctx()?;
        let pipeline =
            FramePipeline::new(&rctx, &self.config).context("failed to build frame pipeline")?;
        pipeline.initialize(&rctx, &mut self.shaders, &mut self.meshes)?;
        self.pipeline = Some(pipeline);
        Ok(())
    }

    fn on_window_event(&mut self, event: &WindowEvent) -> AppControl {
        if let Some(cmd) = self.input.handle(event) {
            if let Some(pipeline) = self.pipeline.as_mut() {
                cmd.apply(pipeline.camera_mut());
            }
        }
        AppControl::Continue
    }

    fn on_resize(&mut self, size: PhysicalSize<u32>) -> anyhow::Result<()> {
        if let Some(pipeline) = self.pipeline.as_mut() {
            pipeline.resize(size.width.into(), size.height.into())?;
        }
        Ok(())
    }

    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> anyhow::Result<AppControl> {
        let Some(pipeline) = self.pipeline.as_mut() else {
            return Ok(AppControl::Continue);
        };

        if let Some(cmd) = self.input.held_command() {
            cmd.apply(pipeline.camera_mut());
        }

        if let Some(frames) = self.fps.record(ctx.time.now) {
            let ring = pipeline.uniforms().stats();
            log::info!(
                "fps: {frames} (uniform slots {}/{} in flight, {} orphaned; target sets {})",
                ring.in_flight,
                ring.slots,
                ring.orphaned,
                pipeline.compositor().allocations()
            );
            ctx.runtime.set_title(format!("{} - {frames} fps", self.title));
        }

        let (shaders, meshes) = (&mut self.shaders, &mut self.meshes);
        ctx.render(|rctx, view| {
            let stats = pipeline.render_frame(rctx, view, shaders, meshes)?;
            log::trace!("{stats:?}");
            Ok(())
        })
    }
}
