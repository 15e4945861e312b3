//! Veil engine crate.
//!
//! This crate owns the platform + GPU runtime pieces and the per-frame render
//! pipeline: camera/projection math, the orphaned frame uniform channel and the
//! weighted blended order-independent transparency compositor.

pub mod device;
pub mod window;
pub mod time;
pub mod core;

pub mod logging;
pub mod error;
pub mod coords;
pub mod paint;
pub mod camera;
pub mod render;
pub mod oit;

#[cfg(test)]
mod testing;

pub use error::{ConfigError, RenderError};
