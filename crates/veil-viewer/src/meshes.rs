//! Demo geometry: a field of instanced cubes, some of them translucent.

use anyhow::Context;
use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use wgpu::util::DeviceExt;

use veil_engine::oit::{DrawRouter, SurfaceClass};
use veil_engine::paint::Color;
use veil_engine::render::{MeshLibrary, RenderCtx};

use crate::shaders::CubeShaders;

// ── cube vertex ───────────────────────────────────────────────────────────

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
pub struct CubeVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

impl CubeVertex {
    const ATTRS: [wgpu::VertexAttribute; 2] = wgpu::vertex_attr_array![
        0 => Float32x3, // position
        1 => Float32x3  // normal
    ];

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<CubeVertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRS,
        }
    }
}

// ── cube instance ─────────────────────────────────────────────────────────

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
pub struct CubeInstance {
    /// xyz: center, w: edge length.
    pub offset_scale: [f32; 4],
    /// Premultiplied color.
    pub color: [f32; 4],
}

impl CubeInstance {
    const ATTRS: [wgpu::VertexAttribute; 2] = wgpu::vertex_attr_array![
        2 => Float32x4, // offset_scale
        3 => Float32x4  // color
    ];

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<CubeInstance>() as u64,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &Self::ATTRS,
        }
    }

    fn new(center: Vec3, size: f32, color: Color) -> Self {
        Self {
            offset_scale: center.extend(size).to_array(),
            color: color.to_array(),
        }
    }
}

/// Unit cube centered at the origin, 4 vertices per face, outward CCW winding.
pub fn cube_geometry() -> (Vec<CubeVertex>, Vec<u16>) {
    // (normal, u, v) with u x v = normal.
    const FACES: [([f32; 3], [f32; 3], [f32; 3]); 6] = [
        ([1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]),
        ([-1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0]),
        ([0.0, 1.0, 0.0], [0.0, 0.0, 1.0], [1.0, 0.0, 0.0]),
        ([0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
        ([0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
        ([0.0, 0.0, -1.0], [0.0, 1.0, 0.0], [1.0, 0.0, 0.0]),
    ];
    const CORNERS: [(f32, f32); 4] = [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)];

    let mut vertices = Vec::with_capacity(24);
    let mut indices = Vec::with_capacity(36);

    for (n, u, v) in FACES {
        let (n, u, v) = (Vec3::from(n), Vec3::from(u), Vec3::from(v));
        let base = vertices.len() as u16;
        for (su, sv) in CORNERS {
            let p = (n + u * su + v * sv) * 0.5;
            vertices.push(CubeVertex {
                position: p.to_array(),
                normal: n.to_array(),
            });
        }
        indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }

    (vertices, indices)
}

/// A run of instances sharing one surface class.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshItem {
    pub class: SurfaceClass,
    pub instances: std::ops::Range<u32>,
}

/// The demo scene: opaque cubes on a grid, translucent cubes floating above.
pub fn demo_scene() -> (Vec<CubeInstance>, Vec<MeshItem>) {
    let mut instances = Vec::new();

    const GRID: i32 = 5;
    const SPACING: f32 = 2.5;
    for z in -GRID..=GRID {
        for x in -GRID..=GRID {
            let t = (x + GRID) as f32 / (2 * GRID) as f32;
            let s = (z + GRID) as f32 / (2 * GRID) as f32;
            instances.push(CubeInstance::new(
                Vec3::new(x as f32 * SPACING, 0.0, z as f32 * SPACING),
                1.0,
                Color::from_straight(0.3 + 0.6 * t, 0.4, 0.3 + 0.6 * s, 1.0),
            ));
        }
    }
    let opaque_end = instances.len() as u32;

    let glass = [
        (Vec3::new(-2.0, 2.0, 0.0), Color::from_straight(1.0, 0.2, 0.2, 0.45)),
        (Vec3::new(0.0, 2.5, 1.0), Color::from_straight(0.2, 1.0, 0.3, 0.35)),
        (Vec3::new(2.0, 2.0, -1.0), Color::from_straight(0.2, 0.4, 1.0, 0.5)),
        (Vec3::new(0.0, 1.5, -2.5), Color::from_straight(1.0, 1.0, 0.3, 0.3)),
    ];
    for (center, color) in glass {
        instances.push(CubeInstance::new(center, 3.0, color));
    }
    let translucent_end = instances.len() as u32;

    let items = vec![
        MeshItem {
            class: SurfaceClass::Opaque,
            instances: 0..opaque_end,
        },
        MeshItem {
            class: SurfaceClass::Translucent,
            instances: opaque_end..translucent_end,
        },
    ];
    (instances, items)
}

struct GpuMeshes {
    vertices: wgpu::Buffer,
    indices: wgpu::Buffer,
    index_count: u32,
    instances: wgpu::Buffer,
}

/// Mesh library of the viewer.
#[derive(Default)]
pub struct CubeLibrary {
    items: Vec<MeshItem>,
    gpu: Option<GpuMeshes>,
}

impl CubeLibrary {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MeshLibrary for CubeLibrary {
    type Shaders = CubeShaders;

    fn initialize(&mut self, ctx: &RenderCtx<'_>) -> anyhow::Result<()> {
        let (vertices, indices) = cube_geometry();
        let (instances, items) = demo_scene();

        let vertices_buf = ctx.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("veil cube vbo"),
            contents: bytemuck::cast_slice(&vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let indices_buf = ctx.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("veil cube ibo"),
            contents: bytemuck::cast_slice(&indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        let instances_buf = ctx.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("veil cube instance vbo"),
            contents: bytemuck::cast_slice(&instances),
            usage: wgpu::BufferUsages::VERTEX,
        });

        log::info!(
            "mesh library: {} instances in {} items",
            instances.len(),
            items.len()
        );

        self.items = items;
        self.gpu = Some(GpuMeshes {
            vertices: vertices_buf,
            indices: indices_buf,
            index_count: indices.len() as u32,
            instances: instances_buf,
        });
        Ok(())
    }

    fn render(
        &mut self,
        _ctx: &RenderCtx<'_>,
        shaders: &CubeShaders,
        router: &mut DrawRouter<'_>,
    ) -> anyhow::Result<()> {
        let gpu = self
            .gpu
            .as_ref()
            .context("mesh library rendered before initialize")?;

        // Opaque first: the router refuses opaque passes after translucent ones.
        for class in [SurfaceClass::Opaque, SurfaceClass::Translucent] {
            let mut items = self.items.iter().filter(|i| i.class == class).peekable();
            if items.peek().is_none() {
                continue;
            }

            let pipeline = shaders.pipeline(class)?;
            let mut rpass = router.pass_for(class)?;
            rpass.set_pipeline(pipeline);
            rpass.set_vertex_buffer(0, gpu.vertices.slice(..));
            rpass.set_vertex_buffer(1, gpu.instances.slice(..));
            rpass.set_index_buffer(gpu.indices.slice(..), wgpu::IndexFormat::Uint16);

            for item in items {
                rpass.draw_indexed(0..gpu.index_count, 0, item.instances.clone());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cube_has_six_quads() {
        let (v, i) = cube_geometry();
        assert_eq!(v.len(), 24);
        assert_eq!(i.len(), 36);
        assert!(i.iter().all(|&ix| (ix as usize) < v.len()));
    }

    #[test]
    fn cube_triangles_wind_ccw_outward() {
        let (v, i) = cube_geometry();
        for tri in i.chunks(3) {
            let [a, b, c] = [tri[0], tri[1], tri[2]].map(|ix| Vec3::from(v[ix as usize].position));
            let face_normal = (b - a).cross(c - a).normalize();
            let n = Vec3::from(v[tri[0] as usize].normal);
            assert!(face_normal.abs_diff_eq(n, 1e-6), "{face_normal} vs {n}");
        }
    }

    #[test]
    fn cube_fits_unit_box() {
        let (v, _) = cube_geometry();
        for p in v {
            assert!(p.position.iter().all(|c| c.abs() == 0.5));
        }
    }

    #[test]
    fn scene_lists_opaque_before_translucent() {
        let (instances, items) = demo_scene();
        assert_eq!(items[0].class, SurfaceClass::Opaque);
        assert_eq!(items[1].class, SurfaceClass::Translucent);
        assert_eq!(items[1].instances.end as usize, instances.len());
        assert_eq!(items[0].instances.end, items[1].instances.start);
    }

    #[test]
    fn translucent_instances_are_premultiplied() {
        let (instances, items) = demo_scene();
        for inst in &instances[items[1].instances.start as usize..] {
            let [r, g, b, a] = inst.color;
            assert!(a < 1.0);
            assert!(r <= a && g <= a && b <= a);
        }
    }
}
