use bytemuck::{Pod, Zeroable};
use glam::Mat4;

use super::ring::{OrphanRing, RingStats, SlotLease};
use crate::error::RenderError;

/// Bind group index of the per-frame uniforms. Fixed for the lifetime of the
/// pipeline; every shader reads the combined transform from here.
pub const FRAME_BIND_GROUP: u32 = 0;

/// Binding index of [`FrameUniforms`] inside [`FRAME_BIND_GROUP`].
pub const FRAME_UNIFORM_BINDING: u32 = 0;

/// GPU layout of the per-frame uniform block (`mat4x4<f32>`).
#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
pub struct FrameUniforms {
    pub view_proj: [[f32; 4]; 4],
}

impl FrameUniforms {
    pub const SIZE: u64 = std::mem::size_of::<Self>() as u64;

    pub fn new(view_proj: Mat4) -> Self {
        Self {
            view_proj: view_proj.to_cols_array_2d(),
        }
    }
}

/// Backing storage of one ring slot.
pub struct UniformSlot {
    buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

/// Write-only channel carrying the combined transform to the GPU once per frame.
///
/// Every upload goes to a slot the GPU has finished reading. The CPU never waits:
/// when all slots are busy the ring allocates another buffer.
pub struct FrameUniformChannel {
    layout: wgpu::BindGroupLayout,
    ring: OrphanRing<UniformSlot>,
}

impl FrameUniformChannel {
    pub fn new(device: &wgpu::Device, max_slots: usize) -> Self {
        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("veil frame uniforms bgl"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: FRAME_UNIFORM_BINDING,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: wgpu::BufferSize::new(FrameUniforms::SIZE),
                },
                count: None,
            }],
        });

        Self {
            layout,
            ring: OrphanRing::new(max_slots),
        }
    }

    /// Layout of [`FRAME_BIND_GROUP`]; shader state builds its pipeline layouts
    /// with this at index 0.
    pub fn layout(&self) -> &wgpu::BindGroupLayout {
        &self.layout
    }

    /// Writes `view_proj` into a free slot and returns that slot's binding.
    pub fn upload(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        view_proj: Mat4,
    ) -> Result<FrameBinding<'_>, RenderError> {
        let layout = &self.layout;
        let lease = self.ring.acquire(|index| Ok(create_slot(device, layout, index)))?;

        let u = FrameUniforms::new(view_proj);
        queue.write_buffer(&lease.storage().buffer, 0, bytemuck::bytes_of(&u));

        Ok(FrameBinding { lease })
    }

    pub fn slot_count(&self) -> usize {
        self.ring.slot_count()
    }

    pub fn stats(&self) -> RingStats {
        self.ring.stats()
    }
}

fn create_slot(device: &wgpu::Device, layout: &wgpu::BindGroupLayout, index: usize) -> UniformSlot {
    let buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some(&format!("veil frame uniforms ubo {index}")),
        size: FrameUniforms::SIZE,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });

    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some(&format!("veil frame uniforms bind group {index}")),
        layout,
        entries: &[wgpu::BindGroupEntry {
            binding: FRAME_UNIFORM_BINDING,
            resource: buffer.as_entire_binding(),
        }],
    });

    UniformSlot { buffer, bind_group }
}

/// The frame's current uniform slot.
///
/// Dropping it without [`release_after_submit`](Self::release_after_submit)
/// frees the slot immediately (nothing was submitted that reads it).
pub struct FrameBinding<'a> {
    lease: SlotLease<'a, UniformSlot>,
}

impl<'a> FrameBinding<'a> {
    pub fn bind_group(&self) -> &'a wgpu::BindGroup {
        &self.lease.storage().bind_group
    }

    pub fn slot_index(&self) -> usize {
        self.lease.index()
    }

    /// Keeps the slot busy until the GPU finishes the work submitted so far.
    ///
    /// Must be called after the `Queue::submit` that reads this slot.
    pub fn release_after_submit(self, queue: &wgpu::Queue) {
        let handle = self.lease.commit();
        queue.on_submitted_work_done(move || handle.release());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec4;

    #[test]
    fn uniform_block_is_one_mat4() {
        assert_eq!(FrameUniforms::SIZE, 64);
        assert_eq!(std::mem::align_of::<FrameUniforms>(), 4);
    }

    #[test]
    fn matrix_is_stored_column_major() {
        let m = Mat4::from_cols(
            Vec4::new(1.0, 2.0, 3.0, 4.0),
            Vec4::new(5.0, 6.0, 7.0, 8.0),
            Vec4::new(9.0, 10.0, 11.0, 12.0),
            Vec4::new(13.0, 14.0, 15.0, 16.0),
        );
        let u = FrameUniforms::new(m);
        let floats: &[f32] = bytemuck::cast_slice(bytemuck::bytes_of(&u));
        assert_eq!(&floats[..4], &[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(floats[12], 13.0);
    }
}
