//! Per-frame render orchestration.
//!
//! [`FramePipeline`] owns the camera rig, projection, frame uniform channel and
//! transparency compositor, and drives one frame through the external
//! collaborators ([`ShaderState`], [`MeshLibrary`]).
//!
//! Conventions:
//! - right-handed view space, camera looks down -Z
//! - forward depth in `[0, 1]`, cleared to 1.0, compared with `LessEqual`
//! - the combined view-projection matrix lives at `@group(0) @binding(0)`

mod collaborators;
mod ctx;
mod pipeline;
mod ring;
mod uniforms;

pub use collaborators::{MeshLibrary, ShaderState};
pub use ctx::RenderCtx;
pub use pipeline::{FramePipeline, FrameStats, PipelineConfig};
pub use ring::{OrphanRing, ReleaseHandle, RingStats, SlotLease};
pub use uniforms::{FRAME_BIND_GROUP, FRAME_UNIFORM_BINDING, FrameBinding, FrameUniformChannel, FrameUniforms};
