//! Size types shared by the projection model, the compositor and the runtime.
//!
//! Canonical GPU space:
//! - Physical pixels
//! - Extents are always non-zero once validated

mod extent;

pub use extent::Extent;
