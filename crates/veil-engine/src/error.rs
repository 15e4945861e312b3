//! Engine error types.
//!
//! Two layers:
//! - [`ConfigError`]: precondition violations, rejected before any state is touched
//! - [`RenderError`]: anything that makes the current frame unusable
//!
//! Application-facing code (runtime, collaborators) works with `anyhow` and wraps
//! these with context; the engine core keeps them typed so callers can match.

use thiserror::Error;

use crate::oit::Phase;

/// Invalid configuration or call arguments.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Viewport dimensions must both be strictly positive.
    #[error("invalid viewport {width}x{height}: dimensions must be positive")]
    InvalidViewport { width: i64, height: i64 },

    /// Clip planes must satisfy `0 < near < far`.
    #[error("invalid clip planes near={near} far={far}: require 0 < near < far")]
    InvalidClipPlanes { near: f32, far: f32 },

    /// Field of view must lie strictly between 0 and 180 degrees.
    #[error("invalid field of view {degrees} degrees")]
    InvalidFieldOfView { degrees: f32 },

    /// Camera id does not belong to the rig.
    #[error("unknown camera id {0}")]
    UnknownCamera(usize),
}

/// Failure that aborts the current frame.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A GPU resource could not be allocated. Previous resources are kept.
    #[error("failed to allocate {resource}: {reason}")]
    Allocation {
        resource: &'static str,
        reason: String,
    },

    /// A compositor operation was called in the wrong phase.
    #[error("compositor is {found:?}, expected {expected:?}")]
    Phase { expected: Phase, found: Phase },

    /// Opaque geometry was routed after translucent geometry in the same frame.
    #[error("opaque draws requested after translucent draws in the same frame")]
    DrawOrder,

    /// An external collaborator (shader state, mesh library) failed.
    #[error("{stage} failed")]
    Collaborator {
        stage: &'static str,
        #[source]
        source: anyhow::Error,
    },
}

impl RenderError {
    pub(crate) fn collaborator(stage: &'static str, source: anyhow::Error) -> Self {
        Self::Collaborator { stage, source }
    }
}
