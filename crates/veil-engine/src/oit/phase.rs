use crate::error::RenderError;

/// Frame phase of the transparency compositor.
///
/// `Idle -> Preparing -> AcceptingDraws -> Finalizing -> Idle`
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Preparing,
    AcceptingDraws,
    Finalizing,
}

impl Phase {
    /// The phase that legally follows `self`.
    pub const fn next(self) -> Self {
        match self {
            Phase::Idle => Phase::Preparing,
            Phase::Preparing => Phase::AcceptingDraws,
            Phase::AcceptingDraws => Phase::Finalizing,
            Phase::Finalizing => Phase::Idle,
        }
    }

    /// Fails unless the current phase is `expected`.
    pub fn expect(self, expected: Phase) -> Result<(), RenderError> {
        if self == expected {
            Ok(())
        } else {
            Err(RenderError::Phase {
                expected,
                found: self,
            })
        }
    }

    /// Moves from `from` to its successor, or reports the mismatch and stays put.
    pub fn advance(&mut self, from: Phase) -> Result<(), RenderError> {
        self.expect(from)?;
        *self = from.next();
        Ok(())
    }
}
