//! Camera controller and projection model.
//!
//! Conventions:
//! - right-handed world space, +Y up
//! - view space looks down −Z
//! - clip-space depth is forward `[0, 1]` (near → 0, far → 1), the wgpu convention

mod orbit;
mod projection;
mod rig;

pub use orbit::{CameraLimits, OrbitCamera};
pub use projection::Projection;
pub use rig::{CameraId, CameraRig};
