//! Order-independent transparency.
//!
//! Weighted blended compositing: opaque geometry renders into its own color and
//! depth targets, translucent geometry accumulates into two more targets without
//! sorting, and a full-screen pass resolves everything into the surface.

pub mod blend;
mod composite;
mod compositor;
mod phase;
mod router;
mod targets;

pub use composite::OIT_WGSL;
pub use compositor::Compositor;
pub use phase::Phase;
pub use router::{DrawRouter, RouteState, RouteSummary, SurfaceClass};
pub use targets::{
    ACCUM_FORMAT, DEPTH_FORMAT, GpuTargetAllocator, OPAQUE_FORMAT, OitTargets, REVEAL_FORMAT,
    TargetAllocator, TargetPool,
};
