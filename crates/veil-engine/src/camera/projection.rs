use glam::{Mat4, Vec4};

use crate::coords::Extent;
use crate::error::ConfigError;

/// Perspective projection derived from field of view and clip planes.
///
/// Only the aspect-dependent horizontal scale changes after configuration; camera
/// movement never touches this type.
#[derive(Debug, Clone, PartialEq)]
pub struct Projection {
    fov_degrees: f32,
    near: f32,
    far: f32,
    /// `1 / tan(fov / 2)`.
    frustum_scale: f32,
    extent: Option<Extent>,
    matrix: Mat4,
}

impl Projection {
    /// Validates the parameters and builds a square-aspect projection.
    ///
    /// Call [`on_resize`](Self::on_resize) before the first frame to apply the
    /// viewport aspect.
    pub fn configure(fov_degrees: f32, near: f32, far: f32) -> Result<Self, ConfigError> {
        if !(fov_degrees.is_finite() && fov_degrees > 0.0 && fov_degrees < 180.0) {
            return Err(ConfigError::InvalidFieldOfView { degrees: fov_degrees });
        }
        if !(near.is_finite() && far.is_finite() && near > 0.0 && near < far) {
            return Err(ConfigError::InvalidClipPlanes { near, far });
        }

        let frustum_scale = 1.0 / (fov_degrees.to_radians() / 2.0).tan();
        let mut projection = Self {
            fov_degrees,
            near,
            far,
            frustum_scale,
            extent: None,
            matrix: Mat4::IDENTITY,
        };
        projection.rebuild(1.0);
        Ok(projection)
    }

    /// Recomputes the aspect scaling for a new viewport.
    ///
    /// Non-positive dimensions are rejected and leave the projection unchanged.
    pub fn on_resize(&mut self, width: i64, height: i64) -> Result<(), ConfigError> {
        let extent = Extent::from_signed(width, height)?;
        self.apply_extent(extent);
        Ok(())
    }

    /// Same as [`on_resize`](Self::on_resize) for an already validated extent.
    pub fn apply_extent(&mut self, extent: Extent) {
        self.extent = Some(extent);
        self.rebuild(extent.inverse_aspect());
    }

    #[inline]
    pub fn matrix(&self) -> Mat4 {
        self.matrix
    }

    #[inline]
    pub fn frustum_scale(&self) -> f32 {
        self.frustum_scale
    }

    #[inline]
    pub fn near(&self) -> f32 {
        self.near
    }

    #[inline]
    pub fn far(&self) -> f32 {
        self.far
    }

    #[inline]
    pub fn fov_degrees(&self) -> f32 {
        self.fov_degrees
    }

    /// Extent of the last successful resize.
    #[inline]
    pub fn extent(&self) -> Option<Extent> {
        self.extent
    }

    fn rebuild(&mut self, inverse_aspect: f32) {
        let (n, f) = (self.near, self.far);
        self.matrix = Mat4::from_cols(
            Vec4::new(self.frustum_scale * inverse_aspect, 0.0, 0.0, 0.0),
            Vec4::new(0.0, self.frustum_scale, 0.0, 0.0),
            Vec4::new(0.0, 0.0, f / (n - f), -1.0),
            Vec4::new(0.0, 0.0, n * f / (n - f), 0.0),
        );
    }
}
