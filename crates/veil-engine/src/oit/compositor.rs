use super::composite::CompositePass;
use super::phase::Phase;
use super::router::DrawRouter;
use super::targets::{GpuTargetAllocator, OitTargets, TargetAllocator, TargetPool};
use crate::coords::Extent;
use crate::error::RenderError;
use crate::paint::Color;
use crate::render::RenderCtx;

/// Weighted blended order-independent transparency compositor.
///
/// One frame runs `prepare` → draws through [`router`](Compositor::router) →
/// `finalize`. Calls out of that order fail with [`RenderError::Phase`] and leave
/// the compositor untouched.
pub struct Compositor<A: TargetAllocator = GpuTargetAllocator> {
    pool: TargetPool<A>,
    phase: Phase,
    clear: Color,
    composite: CompositePass,
}

impl<A: TargetAllocator> Compositor<A> {
    pub fn with_allocator(allocator: A, clear: Color) -> Self {
        Self {
            pool: TargetPool::new(allocator),
            phase: Phase::Idle,
            clear: clear.clamped(),
            composite: CompositePass::default(),
        }
    }

    /// Resizes the render targets. Only legal between frames.
    ///
    /// Reshaping to the current extent is a no-op. Zero or negative dimensions
    /// are rejected and an allocation failure keeps the previous targets.
    pub fn reshape(&mut self, width: i64, height: i64) -> Result<(), RenderError> {
        self.phase.expect(Phase::Idle)?;
        let extent = Extent::from_signed(width, height)?;
        self.pool.reshape(extent)?;
        Ok(())
    }

    #[inline]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Extent of the current targets, `None` before the first reshape.
    #[inline]
    pub fn extent(&self) -> Option<Extent> {
        self.pool.extent()
    }

    #[inline]
    pub fn clear_color(&self) -> Color {
        self.clear
    }

    /// Number of target sets allocated so far.
    pub fn allocations(&self) -> u64 {
        self.pool.allocations()
    }

    /// Returns to `Idle` after a frame was abandoned midway.
    ///
    /// Recorded commands are not undone; the caller drops its encoder.
    pub fn abort(&mut self) {
        if self.phase != Phase::Idle {
            log::warn!("oit frame abandoned while {:?}", self.phase);
            self.phase = Phase::Idle;
        }
    }

    /// `Idle -> Preparing`, with targets matching `width`x`height` on success.
    fn enter_preparing(&mut self, width: i64, height: i64) -> Result<(), RenderError> {
        self.phase.expect(Phase::Idle)?;
        let extent = Extent::from_signed(width, height)?;
        self.pool.reshape(extent)?;
        self.phase.advance(Phase::Idle)
    }

    fn current_targets(&self) -> Result<&A::Targets, RenderError> {
        self.pool.current().ok_or_else(|| RenderError::Allocation {
            resource: "oit targets",
            reason: "no targets allocated".into(),
        })
    }
}

impl Compositor<GpuTargetAllocator> {
    pub fn new(device: &wgpu::Device, clear: Color) -> Self {
        Self::with_allocator(GpuTargetAllocator::new(device), clear)
    }

    /// Starts a frame: reshapes if needed and clears every target.
    ///
    /// Opaque color is cleared to the clear color, depth to 1.0, accumulation to
    /// zero and revealage to 1.0.
    pub fn prepare(
        &mut self,
        encoder: &mut wgpu::CommandEncoder,
        width: i64,
        height: i64,
    ) -> Result<(), RenderError> {
        self.enter_preparing(width, height)?;

        match self.pool.current() {
            Some(targets) => record_clears(encoder, targets, self.clear),
            None => {
                self.phase = Phase::Idle;
                return Err(RenderError::Allocation {
                    resource: "oit targets",
                    reason: "no targets allocated".into(),
                });
            }
        }

        self.phase.advance(Phase::Preparing)
    }

    /// Router for the frame's draws. Only available while accepting draws.
    pub fn router<'a>(
        &'a self,
        encoder: &'a mut wgpu::CommandEncoder,
        frame_bind_group: &'a wgpu::BindGroup,
    ) -> Result<DrawRouter<'a>, RenderError> {
        self.phase.expect(Phase::AcceptingDraws)?;
        let targets = self.current_targets()?;
        Ok(DrawRouter::new(encoder, targets, frame_bind_group))
    }

    /// Resolves the frame into `surface_view` and returns to `Idle`.
    pub fn finalize(
        &mut self,
        ctx: &RenderCtx<'_>,
        encoder: &mut wgpu::CommandEncoder,
        surface_view: &wgpu::TextureView,
    ) -> Result<(), RenderError> {
        self.phase.advance(Phase::AcceptingDraws)?;

        self.composite.ensure_pipeline(
            ctx.device,
            self.pool.allocator().composite_layout(),
            ctx.surface_format,
        );
        if let Some(targets) = self.pool.current() {
            self.composite.record(encoder, targets, surface_view);
        }

        self.phase.advance(Phase::Finalizing)
    }
}

fn record_clears(encoder: &mut wgpu::CommandEncoder, targets: &OitTargets, clear: Color) {
    // The pass only exists to run its load ops.
    let _rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some("veil oit clear"),
        color_attachments: &[
            clear_attachment(&targets.opaque, clear.to_wgpu()),
            clear_attachment(&targets.accum, wgpu::Color::TRANSPARENT),
            clear_attachment(
                &targets.reveal,
                wgpu::Color {
                    r: 1.0,
                    g: 0.0,
                    b: 0.0,
                    a: 0.0,
                },
            ),
        ],
        depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
            view: &targets.depth,
            depth_ops: Some(wgpu::Operations {
                load: wgpu::LoadOp::Clear(1.0),
                store: wgpu::StoreOp::Store,
            }),
            stencil_ops: None,
        }),
        timestamp_writes: None,
        occlusion_query_set: None,
        multiview_mask: None,
    });
}

fn clear_attachment(
    view: &wgpu::TextureView,
    color: wgpu::Color,
) -> Option<wgpu::RenderPassColorAttachment<'_>> {
    Some(wgpu::RenderPassColorAttachment {
        view,
        resolve_target: None,
        ops: wgpu::Operations {
            load: wgpu::LoadOp::Clear(color),
            store: wgpu::StoreOp::Store,
        },
        depth_slice: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConfigError;
    use crate::oit::targets::testing::CountingAllocator;

    fn compositor() -> Compositor<CountingAllocator> {
        Compositor::with_allocator(CountingAllocator::default(), Color::BLACK)
    }

    // Walks the phase machine the way the GPU entry points do.
    fn run_frame(c: &mut Compositor<CountingAllocator>, w: i64, h: i64) -> Result<(), RenderError> {
        c.enter_preparing(w, h)?;
        c.phase.advance(Phase::Preparing)?;
        c.phase.advance(Phase::AcceptingDraws)?;
        c.phase.advance(Phase::Finalizing)
    }

    // ── reshape ───────────────────────────────────────────────────────────

    #[test]
    fn reshape_then_zero_keeps_previous_targets() {
        let mut c = compositor();
        c.reshape(800, 800).unwrap();

        let err = c.reshape(0, 0).unwrap_err();
        assert!(matches!(
            err,
            RenderError::Config(ConfigError::InvalidViewport { width: 0, height: 0 })
        ));
        assert_eq!(c.extent(), Some(Extent::new(800, 800).unwrap()));
        assert_eq!(c.current_targets().unwrap().extent, Extent::new(800, 800).unwrap());
    }

    #[test]
    fn repeated_reshape_allocates_once() {
        let mut c = compositor();
        let live = c.pool.allocator().live.clone();
        for _ in 0..5 {
            c.reshape(1024, 512).unwrap();
        }
        assert_eq!(c.allocations(), 1);
        assert_eq!(live.get(), 1);
    }

    #[test]
    fn reshape_is_refused_mid_frame() {
        let mut c = compositor();
        c.enter_preparing(640, 480).unwrap();
        let err = c.reshape(320, 240).unwrap_err();
        assert!(matches!(
            err,
            RenderError::Phase {
                expected: Phase::Idle,
                found: Phase::Preparing
            }
        ));
        assert_eq!(c.extent(), Some(Extent::new(640, 480).unwrap()));
    }

    #[test]
    fn oversized_reshape_keeps_old_targets() {
        let mut c = Compositor::with_allocator(
            CountingAllocator {
                max_dimension: Some(2048),
                ..Default::default()
            },
            Color::BLACK,
        );
        c.reshape(800, 600).unwrap();
        assert!(matches!(
            c.reshape(4096, 600),
            Err(RenderError::Allocation { .. })
        ));
        assert_eq!(c.extent(), Some(Extent::new(800, 600).unwrap()));
    }

    // ── frame phases ──────────────────────────────────────────────────────

    #[test]
    fn frame_cycle_returns_to_idle() {
        let mut c = compositor();
        run_frame(&mut c, 800, 800).unwrap();
        assert_eq!(c.phase(), Phase::Idle);
        run_frame(&mut c, 800, 800).unwrap();
        assert_eq!(c.allocations(), 1);
    }

    #[test]
    fn prepare_reshapes_on_new_extent() {
        let mut c = compositor();
        c.reshape(800, 800).unwrap();
        run_frame(&mut c, 1280, 720).unwrap();
        assert_eq!(c.extent(), Some(Extent::new(1280, 720).unwrap()));
        assert_eq!(c.allocations(), 2);
    }

    #[test]
    fn prepare_with_invalid_extent_stays_idle() {
        let mut c = compositor();
        assert!(c.enter_preparing(0, 100).is_err());
        assert_eq!(c.phase(), Phase::Idle);
        assert!(c.extent().is_none());
    }

    #[test]
    fn prepare_twice_is_rejected() {
        let mut c = compositor();
        c.enter_preparing(100, 100).unwrap();
        assert!(matches!(
            c.enter_preparing(100, 100),
            Err(RenderError::Phase { .. })
        ));
        assert_eq!(c.phase(), Phase::Preparing);
    }

    #[test]
    fn abort_returns_to_idle() {
        let mut c = compositor();
        c.enter_preparing(100, 100).unwrap();
        c.phase.advance(Phase::Preparing).unwrap();
        c.abort();
        assert_eq!(c.phase(), Phase::Idle);
        run_frame(&mut c, 100, 100).unwrap();
    }

    #[test]
    fn clear_color_is_kept_premultiplied() {
        let c = Compositor::with_allocator(
            CountingAllocator::default(),
            Color::from_premul(0.9, 0.0, 0.3, 0.5),
        );
        assert_eq!(c.clear_color(), Color::from_premul(0.5, 0.0, 0.3, 0.5));
    }

    // ── gpu ───────────────────────────────────────────────────────────────

    use crate::oit::OIT_WGSL;
    use crate::oit::blend::{self, Accumulator, Fragment};
    use crate::render::FrameUniformChannel;
    use crate::testing::{create_target, create_test_device, read_rgba8};
    use glam::Mat4;

    // Full-screen layers: instance 0 is RED at depth 5, instance 1 is BLUE at depth 8.
    const LAYER_WGSL: &str = r#"
struct LayerOut {
  @builtin(position) pos: vec4<f32>,
  @location(0) @interpolate(flat) layer: u32,
};

@vertex
fn vs_layer(@builtin(vertex_index) vi: u32, @builtin(instance_index) ii: u32) -> LayerOut {
  let uv = vec2<f32>(f32((vi << 1u) & 2u), f32(vi & 2u));
  var out: LayerOut;
  out.pos = vec4<f32>(uv * 2.0 - 1.0, 0.5, 1.0);
  out.layer = ii;
  return out;
}

@fragment
fn fs_layer(in: LayerOut) -> OitOutput {
  if (in.layer == 0u) {
    return oit_output(vec4<f32>(0.5, 0.0, 0.0, 0.5), 5.0);
  }
  return oit_output(vec4<f32>(0.0, 0.0, 0.3, 0.3), 8.0);
}
"#;

    const RED: Color = Color::from_premul(0.5, 0.0, 0.0, 0.5);
    const BLUE: Color = Color::from_premul(0.0, 0.0, 0.3, 0.3);
    const CLEAR: Color = Color::from_premul(0.2, 0.2, 0.2, 1.0);

    fn layer_pipeline(
        device: &wgpu::Device,
        frame_layout: &wgpu::BindGroupLayout,
    ) -> wgpu::RenderPipeline {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("veil test layer shader"),
            source: wgpu::ShaderSource::Wgsl(format!("{OIT_WGSL}\n{LAYER_WGSL}").into()),
        });
        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("veil test layer pipeline layout"),
            bind_group_layouts: &[frame_layout],
            immediate_size: 0,
        });
        let targets = blend::translucent_color_targets();
        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("veil test layer pipeline"),
            layout: Some(&layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_layer"),
                compilation_options: Default::default(),
                buffers: &[],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_layer"),
                compilation_options: Default::default(),
                targets: &targets,
            }),
            primitive: wgpu::PrimitiveState::default(),
            depth_stencil: Some(blend::translucent_depth_state()),
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        })
    }

    // One full frame with the given layers drawn in order; returns the resolved pixels.
    fn render_layers(device: &wgpu::Device, queue: &wgpu::Queue, layers: &[u32]) -> Vec<[u8; 4]> {
        let extent = Extent::new(64, 8).unwrap();
        let ctx = RenderCtx::new(device, queue, wgpu::TextureFormat::Rgba8Unorm, extent);

        let mut uniforms = FrameUniformChannel::new(device, 2);
        let pipeline = layer_pipeline(device, uniforms.layout());
        let mut compositor = Compositor::new(device, CLEAR);
        compositor.reshape(64, 8).unwrap();

        let target = create_target(device, extent);
        let view = target.create_view(&wgpu::TextureViewDescriptor::default());

        let binding = uniforms.upload(device, queue, Mat4::IDENTITY).unwrap();
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("veil test frame encoder"),
        });
        compositor.prepare(&mut encoder, 64, 8).unwrap();
        assert_eq!(compositor.phase(), Phase::AcceptingDraws);
        {
            let mut router = compositor.router(&mut encoder, binding.bind_group()).unwrap();
            let mut pass = router.translucent().unwrap();
            pass.set_pipeline(&pipeline);
            for &layer in layers {
                pass.draw(0..3, layer..layer + 1);
            }
        }
        compositor.finalize(&ctx, &mut encoder, &view).unwrap();
        assert_eq!(compositor.phase(), Phase::Idle);

        queue.submit(Some(encoder.finish()));
        binding.release_after_submit(queue);
        read_rgba8(device, queue, &target, extent)
    }

    fn to_rgba8(c: Color) -> [u8; 4] {
        c.to_array().map(|v| (v.clamp(0.0, 1.0) * 255.0).round() as u8)
    }

    fn assert_px_close(a: [u8; 4], b: [u8; 4], tolerance: u8) {
        for i in 0..4 {
            assert!(a[i].abs_diff(b[i]) <= tolerance, "{a:?} vs {b:?}");
        }
    }

    #[test]
    fn gpu_translucent_layers_resolve_independent_of_order() {
        let Some((device, queue)) = create_test_device() else {
            return;
        };

        let ab = render_layers(&device, &queue, &[0, 1]);
        let ba = render_layers(&device, &queue, &[1, 0]);
        assert_eq!(ab.len(), 64 * 8);
        for (a, b) in ab.iter().zip(&ba) {
            assert_px_close(*a, *b, 1);
        }

        let mut reference = Accumulator::default();
        reference.extend([Fragment::new(RED, 5.0), Fragment::new(BLUE, 8.0)]);
        let expected = to_rgba8(reference.resolve(CLEAR));
        for px in &ab {
            assert_px_close(*px, expected, 3);
        }
    }

    #[test]
    fn gpu_frame_without_draws_shows_clear_color() {
        let Some((device, queue)) = create_test_device() else {
            return;
        };

        let expected = to_rgba8(CLEAR);
        for px in render_layers(&device, &queue, &[]) {
            assert_px_close(px, expected, 1);
        }
    }
}
