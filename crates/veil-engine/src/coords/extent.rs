use crate::error::ConfigError;

/// Viewport size in physical pixels.
///
/// Invariant: both dimensions are strictly positive. The only way to build an
/// `Extent` is through the validating constructors.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Extent {
    width: u32,
    height: u32,
}

impl Extent {
    /// Validates an unsigned size.
    pub fn new(width: u32, height: u32) -> Result<Self, ConfigError> {
        if width == 0 || height == 0 {
            return Err(ConfigError::InvalidViewport {
                width: width.into(),
                height: height.into(),
            });
        }
        Ok(Self { width, height })
    }

    /// Validates a signed size, as delivered by some windowing layers.
    pub fn from_signed(width: i64, height: i64) -> Result<Self, ConfigError> {
        let invalid = || ConfigError::InvalidViewport { width, height };
        let w = u32::try_from(width).map_err(|_| invalid())?;
        let h = u32::try_from(height).map_err(|_| invalid())?;
        Self::new(w, h).map_err(|_| invalid())
    }

    #[inline]
    pub const fn width(self) -> u32 {
        self.width
    }

    #[inline]
    pub const fn height(self) -> u32 {
        self.height
    }

    /// `height / width`, the factor applied to the horizontal frustum scale.
    #[inline]
    pub fn inverse_aspect(self) -> f32 {
        self.height as f32 / self.width as f32
    }

    #[inline]
    pub fn to_wgpu(self) -> wgpu::Extent3d {
        wgpu::Extent3d {
            width: self.width,
            height: self.height,
            depth_or_array_layers: 1,
        }
    }
}

impl std::fmt::Display for Extent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── new ───────────────────────────────────────────────────────────────

    #[test]
    fn new_accepts_positive() {
        let e = Extent::new(800, 600).unwrap();
        assert_eq!((e.width(), e.height()), (800, 600));
    }

    #[test]
    fn new_rejects_zero_width_or_height() {
        assert_eq!(
            Extent::new(0, 600),
            Err(ConfigError::InvalidViewport { width: 0, height: 600 })
        );
        assert!(Extent::new(800, 0).is_err());
        assert!(Extent::new(0, 0).is_err());
    }

    // ── from_signed ───────────────────────────────────────────────────────

    #[test]
    fn from_signed_rejects_negative() {
        assert_eq!(
            Extent::from_signed(-1, 10),
            Err(ConfigError::InvalidViewport { width: -1, height: 10 })
        );
        assert!(Extent::from_signed(10, -5).is_err());
    }

    #[test]
    fn from_signed_rejects_overflow() {
        assert!(Extent::from_signed(i64::from(u32::MAX) + 1, 10).is_err());
    }

    #[test]
    fn from_signed_accepts_positive() {
        assert_eq!(Extent::from_signed(3, 4).unwrap(), Extent::new(3, 4).unwrap());
    }

    // ── aspect ────────────────────────────────────────────────────────────

    #[test]
    fn inverse_aspect_is_height_over_width() {
        let e = Extent::new(1600, 800).unwrap();
        assert_eq!(e.inverse_aspect(), 0.5);
    }
}
