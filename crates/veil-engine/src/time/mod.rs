//! Time subsystem.
//!
//! - one `FrameClock` per render loop; `tick()` once per presented frame
//! - one `FpsMeter` per render loop; reports a frame count once per window

mod fps;
mod frame_clock;

pub use fps::FpsMeter;
pub use frame_clock::{FrameClock, FrameTime};
