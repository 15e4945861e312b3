//! Off-screen render targets of the transparency compositor.

use crate::coords::Extent;
use crate::error::RenderError;

pub const OPAQUE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;
pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;
/// Half float keeps the target blendable without extra device features. Its
/// range caps the summed weight at [`ACCUM_MAX`](super::blend::ACCUM_MAX): about
/// 90 overlapping layers of alpha 0.5 right in front of the camera saturate it.
pub const ACCUM_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;
pub const REVEAL_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::R16Float;

/// Creates a full target set for a given extent.
///
/// Allocation must not touch any previously returned set.
pub trait TargetAllocator {
    type Targets;

    fn allocate(&mut self, extent: Extent) -> Result<Self::Targets, RenderError>;
}

/// Holds the current target set and replaces it on reshape.
pub struct TargetPool<A: TargetAllocator> {
    allocator: A,
    current: Option<(Extent, A::Targets)>,
    allocations: u64,
}

impl<A: TargetAllocator> TargetPool<A> {
    pub fn new(allocator: A) -> Self {
        Self {
            allocator,
            current: None,
            allocations: 0,
        }
    }

    /// Ensures the targets match `extent`.
    ///
    /// Returns `true` when a new set was allocated. The new set is complete
    /// before the old one is dropped; on failure the old set stays current.
    pub fn reshape(&mut self, extent: Extent) -> Result<bool, RenderError> {
        if self.extent() == Some(extent) {
            return Ok(false);
        }

        let targets = self.allocator.allocate(extent)?;
        self.allocations += 1;

        if let Some((old, _)) = self.current.replace((extent, targets)) {
            log::debug!("oit targets reallocated {old} -> {extent}");
        } else {
            log::debug!("oit targets allocated at {extent}");
        }
        Ok(true)
    }

    pub fn extent(&self) -> Option<Extent> {
        self.current.as_ref().map(|(e, _)| *e)
    }

    pub fn current(&self) -> Option<&A::Targets> {
        self.current.as_ref().map(|(_, t)| t)
    }

    pub fn allocator(&self) -> &A {
        &self.allocator
    }

    /// Number of successful allocations since creation.
    pub fn allocations(&self) -> u64 {
        self.allocations
    }
}

/// Target set backed by wgpu textures.
pub struct OitTargets {
    pub opaque: wgpu::TextureView,
    pub depth: wgpu::TextureView,
    pub accum: wgpu::TextureView,
    pub reveal: wgpu::TextureView,

    /// Binds opaque, accumulation and revealage for the composite pass.
    pub composite_bind_group: wgpu::BindGroup,

    _textures: [wgpu::Texture; 4],
}

/// [`TargetAllocator`] creating [`OitTargets`] on a wgpu device.
pub struct GpuTargetAllocator {
    device: wgpu::Device,
    composite_layout: wgpu::BindGroupLayout,
}

impl GpuTargetAllocator {
    pub fn new(device: &wgpu::Device) -> Self {
        let texture_entry = |binding: u32| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: false },
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
            count: None,
        };

        let composite_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("veil oit composite bgl"),
            entries: &[texture_entry(0), texture_entry(1), texture_entry(2)],
        });

        Self {
            device: device.clone(),
            composite_layout,
        }
    }

    pub fn composite_layout(&self) -> &wgpu::BindGroupLayout {
        &self.composite_layout
    }

    fn texture(
        &self,
        label: &str,
        extent: Extent,
        format: wgpu::TextureFormat,
        usage: wgpu::TextureUsages,
    ) -> (wgpu::Texture, wgpu::TextureView) {
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: extent.to_wgpu(),
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        (texture, view)
    }
}

impl TargetAllocator for GpuTargetAllocator {
    type Targets = OitTargets;

    fn allocate(&mut self, extent: Extent) -> Result<OitTargets, RenderError> {
        let max = self.device.limits().max_texture_dimension_2d;
        if extent.width() > max || extent.height() > max {
            return Err(RenderError::Allocation {
                resource: "oit targets",
                reason: format!("{extent} exceeds the device limit of {max} px"),
            });
        }

        let sampled =
            wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING;

        let (opaque_tex, opaque) = self.texture("veil oit opaque", extent, OPAQUE_FORMAT, sampled);
        let (depth_tex, depth) = self.texture(
            "veil oit depth",
            extent,
            DEPTH_FORMAT,
            wgpu::TextureUsages::RENDER_ATTACHMENT,
        );
        let (accum_tex, accum) = self.texture("veil oit accum", extent, ACCUM_FORMAT, sampled);
        let (reveal_tex, reveal) = self.texture("veil oit reveal", extent, REVEAL_FORMAT, sampled);

        let composite_bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("veil oit composite bind group"),
            layout: &self.composite_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&opaque),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&accum),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(&reveal),
                },
            ],
        });

        Ok(OitTargets {
            opaque,
            depth,
            accum,
            reveal,
            composite_bind_group,
            _textures: [opaque_tex, depth_tex, accum_tex, reveal_tex],
        })
    }
}
