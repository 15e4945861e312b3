//! Shader state of the viewer: one opaque and one translucent cube pipeline.

use anyhow::Context;

use veil_engine::oit::{self, SurfaceClass};
use veil_engine::render::{RenderCtx, ShaderState};

use crate::meshes::{CubeInstance, CubeVertex};

struct CubePipelines {
    opaque: wgpu::RenderPipeline,
    translucent: wgpu::RenderPipeline,
}

#[derive(Default)]
pub struct CubeShaders {
    pipelines: Option<CubePipelines>,
}

impl CubeShaders {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pipeline(&self, class: SurfaceClass) -> anyhow::Result<&wgpu::RenderPipeline> {
        let p = self
            .pipelines
            .as_ref()
            .context("cube shaders used before initialize")?;
        Ok(match class {
            SurfaceClass::Opaque => &p.opaque,
            SurfaceClass::Translucent => &p.translucent,
        })
    }
}

/// Back faces culled, counter-clockwise front faces.
fn primitive() -> wgpu::PrimitiveState {
    wgpu::PrimitiveState {
        topology: wgpu::PrimitiveTopology::TriangleList,
        strip_index_format: None,
        front_face: wgpu::FrontFace::Ccw,
        cull_mode: Some(wgpu::Face::Back),
        polygon_mode: wgpu::PolygonMode::Fill,
        unclipped_depth: false,
        conservative: false,
    }
}

impl ShaderState for CubeShaders {
    fn initialize(
        &mut self,
        ctx: &RenderCtx<'_>,
        frame_layout: &wgpu::BindGroupLayout,
    ) -> anyhow::Result<()> {
        let source = format!("{}\n{}", oit::OIT_WGSL, include_str!("shaders/cube.wgsl"));
        let shader = ctx.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("veil cube shader"),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        });

        let layout = ctx
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("veil cube pipeline layout"),
                bind_group_layouts: &[frame_layout],
                immediate_size: 0,
            });

        let buffers = [CubeVertex::layout(), CubeInstance::layout()];
        let vertex = wgpu::VertexState {
            module: &shader,
            entry_point: Some("vs_main"),
            compilation_options: Default::default(),
            buffers: &buffers,
        };

        let opaque_targets = oit::blend::opaque_color_target();
        let opaque = ctx.device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("veil cube opaque pipeline"),
            layout: Some(&layout),
            vertex: vertex.clone(),
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_opaque"),
                compilation_options: Default::default(),
                targets: &opaque_targets,
            }),
            primitive: primitive(),
            depth_stencil: Some(oit::blend::opaque_depth_state()),
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });

        let translucent_targets = oit::blend::translucent_color_targets();
        let translucent = ctx.device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("veil cube translucent pipeline"),
            layout: Some(&layout),
            vertex,
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_translucent"),
                compilation_options: Default::default(),
                targets: &translucent_targets,
            }),
            primitive: primitive(),
            depth_stencil: Some(oit::blend::translucent_depth_state()),
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });

        log::debug!("cube pipelines built");
        self.pipelines = Some(CubePipelines {
            opaque,
            translucent,
        });
        Ok(())
    }

    fn prepare_for_render(&mut self, _ctx: &RenderCtx<'_>) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.pipelines.is_some(),
            "cube shaders prepared before initialize"
        );
        Ok(())
    }
}
