//! Color model shared between the compositor and collaborators.
//!
//! Colors are linear and premultiplied; the translucent accumulation relies on it.

pub mod color;

pub use color::Color;
