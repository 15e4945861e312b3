use super::targets::OitTargets;
use crate::error::RenderError;
use crate::render::FRAME_BIND_GROUP;

/// How a piece of geometry is composited.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum SurfaceClass {
    /// Depth tested and written, drawn into the opaque color target.
    Opaque,
    /// Depth tested only, accumulated into the transparency targets.
    Translucent,
}

/// Pass counts recorded during one frame.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct RouteSummary {
    pub opaque_passes: u32,
    pub translucent_passes: u32,
}

/// Ordering rule of a frame's passes, independent of the GPU.
///
/// Opaque passes may follow each other freely. Once a translucent pass was
/// opened, opaque ones are refused: their depth would not occlude fragments
/// that were already accumulated.
#[derive(Debug, Default, Clone)]
pub struct RouteState {
    translucent_started: bool,
    summary: RouteSummary,
}

impl RouteState {
    pub fn admit(&mut self, class: SurfaceClass) -> Result<(), RenderError> {
        match class {
            SurfaceClass::Opaque => {
                if self.translucent_started {
                    return Err(RenderError::DrawOrder);
                }
                self.summary.opaque_passes += 1;
            }
            SurfaceClass::Translucent => {
                self.translucent_started = true;
                self.summary.translucent_passes += 1;
            }
        }
        Ok(())
    }

    pub fn summary(&self) -> RouteSummary {
        self.summary
    }
}

/// Hands out render passes on the compositor's targets while it accepts draws.
///
/// Every pass comes with the frame uniforms already bound at
/// [`FRAME_BIND_GROUP`]; callers only set pipelines and buffers.
pub struct DrawRouter<'a> {
    encoder: &'a mut wgpu::CommandEncoder,
    targets: &'a OitTargets,
    frame_bind_group: &'a wgpu::BindGroup,
    state: RouteState,
}

impl<'a> DrawRouter<'a> {
    pub(crate) fn new(
        encoder: &'a mut wgpu::CommandEncoder,
        targets: &'a OitTargets,
        frame_bind_group: &'a wgpu::BindGroup,
    ) -> Self {
        Self {
            encoder,
            targets,
            frame_bind_group,
            state: RouteState::default(),
        }
    }

    /// Opens a pass on the opaque color and depth targets.
    pub fn opaque(&mut self) -> Result<wgpu::RenderPass<'_>, RenderError> {
        self.pass_for(SurfaceClass::Opaque)
    }

    /// Opens a pass on the accumulation and revealage targets, with the opaque
    /// depth attached read-only.
    pub fn translucent(&mut self) -> Result<wgpu::RenderPass<'_>, RenderError> {
        self.pass_for(SurfaceClass::Translucent)
    }

    pub fn pass_for(&mut self, class: SurfaceClass) -> Result<wgpu::RenderPass<'_>, RenderError> {
        self.state.admit(class)?;

        let t = self.targets;
        let mut rpass = match class {
            SurfaceClass::Opaque => self.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("veil opaque pass"),
                color_attachments: &[attachment(&t.opaque)],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &t.depth,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            }),
            SurfaceClass::Translucent => {
                self.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("veil translucent pass"),
                    color_attachments: &[attachment(&t.accum), attachment(&t.reveal)],
                    // Read-only depth: no depth_ops.
                    depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                        view: &t.depth,
                        depth_ops: None,
                        stencil_ops: None,
                    }),
                    timestamp_writes: None,
                    occlusion_query_set: None,
                    multiview_mask: None,
                })
            }
        };

        rpass.set_bind_group(FRAME_BIND_GROUP, self.frame_bind_group, &[]);
        Ok(rpass)
    }

    pub fn summary(&self) -> RouteSummary {
        self.state.summary()
    }
}

fn attachment(view: &wgpu::TextureView) -> Option<wgpu::RenderPassColorAttachment<'_>> {
    Some(wgpu::RenderPassColorAttachment {
        view,
        resolve_target: None,
        ops: wgpu::Operations {
            load: wgpu::LoadOp::Load,
            store: wgpu::StoreOp::Store,
        },
        depth_slice: None,
    })
}
