use glam::Vec3;

use super::{FrameUniformChannel, MeshLibrary, RenderCtx, ShaderState};
use crate::camera::{CameraLimits, CameraRig, OrbitCamera, Projection};
use crate::coords::Extent;
use crate::error::RenderError;
use crate::oit::{Compositor, RouteSummary};
use crate::paint::Color;

/// Frame pipeline configuration.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,

    /// Initial orbit distance of the default camera.
    pub camera_distance: f32,
    pub camera_focus: Vec3,
    pub camera_limits: CameraLimits,

    /// Clear color of the opaque target.
    pub clear_color: Color,

    /// Upper bound on frame uniform buffers alive at once.
    pub max_uniform_slots: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            fov_degrees: 45.0,
            near: 0.1,
            far: 1000.0,
            camera_distance: 10.0,
            camera_focus: Vec3::ZERO,
            camera_limits: CameraLimits::default(),
            clear_color: Color::BLACK,
            max_uniform_slots: 8,
        }
    }
}

/// Outcome of one rendered frame.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct FrameStats {
    pub frame_index: u64,
    pub extent: Extent,
    /// Uniform slot the frame's transform was written to.
    pub uniform_slot: usize,
    /// Uniform buffers allocated so far.
    pub uniform_slots: usize,
    pub routes: RouteSummary,
}

/// Explicit render context: owns every piece of per-frame state and drives the
/// collaborators through one frame.
pub struct FramePipeline {
    projection: Projection,
    cameras: CameraRig,
    uniforms: FrameUniformChannel,
    compositor: Compositor,
    frame_index: u64,
}

impl FramePipeline {
    /// Builds the pipeline and sizes it for `ctx.extent`.
    pub fn new(ctx: &RenderCtx<'_>, config: &PipelineConfig) -> Result<Self, RenderError> {
        let mut projection = Projection::configure(config.fov_degrees, config.near, config.far)?;
        projection.apply_extent(ctx.extent);

        let camera = OrbitCamera::new(
            config.camera_focus,
            config.camera_distance,
            config.camera_limits,
        );

        let mut compositor = Compositor::new(ctx.device, config.clear_color);
        compositor.reshape(ctx.extent.width().into(), ctx.extent.height().into())?;

        log::info!(
            "frame pipeline ready: {} fov={} near={} far={}",
            ctx.extent,
            config.fov_degrees,
            config.near,
            config.far
        );

        Ok(Self {
            projection,
            cameras: CameraRig::new(camera),
            uniforms: FrameUniformChannel::new(ctx.device, config.max_uniform_slots),
            compositor,
            frame_index: 0,
        })
    }

    /// One-time collaborator setup; call before the first frame.
    pub fn initialize<S, M>(
        &self,
        ctx: &RenderCtx<'_>,
        shaders: &mut S,
        meshes: &mut M,
    ) -> Result<(), RenderError>
    where
        S: ShaderState,
        M: MeshLibrary<Shaders = S>,
    {
        shaders
            .initialize(ctx, self.uniforms.layout())
            .map_err(|e| RenderError::collaborator("shader initialization", e))?;
        meshes
            .initialize(ctx)
            .map_err(|e| RenderError::collaborator("mesh initialization", e))?;
        Ok(())
    }

    /// Applies a new viewport size to the projection and the compositor.
    ///
    /// Both are validated up front; on error neither changes.
    pub fn resize(&mut self, width: i64, height: i64) -> Result<(), RenderError> {
        let extent = Extent::from_signed(width, height)?;
        self.compositor.reshape(width, height)?;
        self.projection.apply_extent(extent);
        log::info!("viewport resized to {extent}");
        Ok(())
    }

    /// Records, submits and schedules the cleanup of one frame.
    pub fn render_frame<S, M>(
        &mut self,
        ctx: &RenderCtx<'_>,
        surface_view: &wgpu::TextureView,
        shaders: &mut S,
        meshes: &mut M,
    ) -> Result<FrameStats, RenderError>
    where
        S: ShaderState,
        M: MeshLibrary<Shaders = S>,
    {
        let view_proj = self.projection.matrix() * self.cameras.view_matrix();
        let binding = self.uniforms.upload(ctx.device, ctx.queue, view_proj)?;
        let uniform_slot = binding.slot_index();

        shaders
            .prepare_for_render(ctx)
            .map_err(|e| RenderError::collaborator("shader prepare", e))?;

        let mut encoder = ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("veil frame encoder"),
            });

        let extent = ctx.extent;
        self.compositor
            .prepare(&mut encoder, extent.width().into(), extent.height().into())?;

        let drawn = match self.compositor.router(&mut encoder, binding.bind_group()) {
            Ok(mut router) => meshes
                .render(ctx, shaders, &mut router)
                .map(|()| router.summary())
                .map_err(|e| RenderError::collaborator("mesh render", e)),
            Err(e) => Err(e),
        };
        let routes = match drawn {
            Ok(routes) => routes,
            Err(e) => {
                self.compositor.abort();
                return Err(e);
            }
        };

        self.compositor.finalize(ctx, &mut encoder, surface_view)?;

        ctx.queue.submit(Some(encoder.finish()));
        binding.release_after_submit(ctx.queue);

        // Non-blocking: fires completed submitted-work-done callbacks.
        if let Err(e) = ctx.device.poll(wgpu::PollType::Poll) {
            log::warn!("device poll failed: {e}");
        }

        let stats = FrameStats {
            frame_index: self.frame_index,
            extent,
            uniform_slot,
            uniform_slots: self.uniforms.slot_count(),
            routes,
        };
        self.frame_index = self.frame_index.wrapping_add(1);
        Ok(stats)
    }

    pub fn camera_rig(&self) -> &CameraRig {
        &self.cameras
    }

    pub fn camera_rig_mut(&mut self) -> &mut CameraRig {
        &mut self.cameras
    }

    /// Shorthand for the active camera.
    pub fn camera_mut(&mut self) -> &mut OrbitCamera {
        self.cameras.active_mut()
    }

    pub fn projection(&self) -> &Projection {
        &self.projection
    }

    pub fn compositor(&self) -> &Compositor {
        &self.compositor
    }

    pub fn uniforms(&self) -> &FrameUniformChannel {
        &self.uniforms
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Mat4;

    // Combined transform of the default setup at 800x800 after the given zooms.
    fn view_proj_after(zooms: &[f32]) -> Mat4 {
        let config = PipelineConfig::default();
        let mut projection =
            Projection::configure(config.fov_degrees, config.near, config.far).unwrap();
        projection.on_resize(800, 800).unwrap();

        let mut rig = CameraRig::new(OrbitCamera::new(
            config.camera_focus,
            config.camera_distance,
            config.camera_limits,
        ));
        for &z in zooms {
            rig.active_mut().zoom(z);
        }
        projection.matrix() * rig.view_matrix()
    }

    #[test]
    fn default_config() {
        let c = PipelineConfig::default();
        assert_eq!(c.fov_degrees, 45.0);
        assert_eq!(c.near, 0.1);
        assert_eq!(c.far, 1000.0);
        assert_eq!(c.max_uniform_slots, 8);
        assert_eq!(c.clear_color, Color::BLACK);
    }

    #[test]
    fn zoom_steps_compose_in_combined_transform() {
        let stepped = view_proj_after(&[2.0, -1.0]);
        let direct = view_proj_after(&[1.0]);
        assert!(stepped.abs_diff_eq(direct, 1e-5));
        assert!(!direct.abs_diff_eq(view_proj_after(&[]), 1e-5));
    }

    // ── gpu ───────────────────────────────────────────────────────────────

    use crate::error::ConfigError;
    use crate::oit::{DrawRouter, Phase};
    use crate::testing::{create_target, create_test_device};

    #[derive(Default)]
    struct CountingShaders {
        initialized: bool,
        prepared: u32,
    }

    impl ShaderState for CountingShaders {
        fn initialize(
            &mut self,
            _ctx: &RenderCtx<'_>,
            _frame_layout: &wgpu::BindGroupLayout,
        ) -> anyhow::Result<()> {
            self.initialized = true;
            Ok(())
        }

        fn prepare_for_render(&mut self, _ctx: &RenderCtx<'_>) -> anyhow::Result<()> {
            self.prepared += 1;
            Ok(())
        }
    }

    // Opens empty passes; `translucent_first` breaks the draw order.
    #[derive(Default)]
    struct EmptyPasses {
        translucent_first: bool,
    }

    impl MeshLibrary for EmptyPasses {
        type Shaders = CountingShaders;

        fn initialize(&mut self, _ctx: &RenderCtx<'_>) -> anyhow::Result<()> {
            Ok(())
        }

        fn render(
            &mut self,
            _ctx: &RenderCtx<'_>,
            _shaders: &CountingShaders,
            router: &mut DrawRouter<'_>,
        ) -> anyhow::Result<()> {
            if self.translucent_first {
                drop(router.translucent()?);
                drop(router.opaque()?);
            } else {
                drop(router.opaque()?);
                drop(router.translucent()?);
            }
            Ok(())
        }
    }

    fn extent(w: u32, h: u32) -> Extent {
        Extent::new(w, h).unwrap()
    }

    #[test]
    fn gpu_resize_rejects_invalid_size_without_mutation() {
        let Some((device, queue)) = create_test_device() else {
            return;
        };
        let ctx = RenderCtx::new(&device, &queue, wgpu::TextureFormat::Rgba8Unorm, extent(64, 64));
        let mut pipeline = FramePipeline::new(&ctx, &PipelineConfig::default()).unwrap();
        let before = pipeline.projection().matrix();

        let err = pipeline.resize(0, 32).unwrap_err();
        assert!(matches!(
            err,
            RenderError::Config(ConfigError::InvalidViewport { width: 0, height: 32 })
        ));
        assert_eq!(pipeline.projection().matrix(), before);
        assert_eq!(pipeline.projection().extent(), Some(extent(64, 64)));
        assert_eq!(pipeline.compositor().extent(), Some(extent(64, 64)));

        pipeline.resize(128, 64).unwrap();
        assert_eq!(pipeline.projection().extent(), Some(extent(128, 64)));
        assert_eq!(pipeline.compositor().extent(), Some(extent(128, 64)));
        assert_ne!(pipeline.projection().matrix(), before);
    }

    #[test]
    fn gpu_render_frame_drives_collaborators() {
        let Some((device, queue)) = create_test_device() else {
            return;
        };
        let size = extent(32, 32);
        let ctx = RenderCtx::new(&device, &queue, wgpu::TextureFormat::Rgba8Unorm, size);
        let target = create_target(&device, size);
        let view = target.create_view(&wgpu::TextureViewDescriptor::default());

        let mut pipeline = FramePipeline::new(&ctx, &PipelineConfig::default()).unwrap();
        let mut shaders = CountingShaders::default();
        let mut meshes = EmptyPasses::default();
        pipeline.initialize(&ctx, &mut shaders, &mut meshes).unwrap();
        assert!(shaders.initialized);

        for expected in 0..3 {
            let stats = pipeline
                .render_frame(&ctx, &view, &mut shaders, &mut meshes)
                .unwrap();
            assert_eq!(stats.frame_index, expected);
            assert_eq!(stats.extent, size);
            assert_eq!(stats.routes.opaque_passes, 1);
            assert_eq!(stats.routes.translucent_passes, 1);
            assert!(stats.uniform_slots <= PipelineConfig::default().max_uniform_slots);
        }
        assert_eq!(shaders.prepared, 3);
        assert_eq!(pipeline.compositor().phase(), Phase::Idle);
    }

    #[test]
    fn gpu_misordered_draws_abort_the_frame() {
        let Some((device, queue)) = create_test_device() else {
            return;
        };
        let size = extent(32, 32);
        let ctx = RenderCtx::new(&device, &queue, wgpu::TextureFormat::Rgba8Unorm, size);
        let target = create_target(&device, size);
        let view = target.create_view(&wgpu::TextureViewDescriptor::default());

        let mut pipeline = FramePipeline::new(&ctx, &PipelineConfig::default()).unwrap();
        let mut shaders = CountingShaders::default();
        let mut meshes = EmptyPasses {
            translucent_first: true,
        };

        let err = pipeline
            .render_frame(&ctx, &view, &mut shaders, &mut meshes)
            .unwrap_err();
        match err {
            RenderError::Collaborator { source, .. } => assert!(matches!(
                source.downcast_ref::<RenderError>(),
                Some(RenderError::DrawOrder)
            )),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(pipeline.compositor().phase(), Phase::Idle);
        assert_eq!(pipeline.uniforms().stats().in_flight, 0);

        meshes.translucent_first = false;
        let stats = pipeline
            .render_frame(&ctx, &view, &mut shaders, &mut meshes)
            .unwrap();
        assert_eq!(stats.frame_index, 0);
    }
}
