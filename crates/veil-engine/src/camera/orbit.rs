use glam::{Mat4, Vec3};

/// Hard ceiling for the pitch clamp; the view basis degenerates at ±90°.
const PITCH_CEILING: f32 = 89.9_f32 * (std::f32::consts::PI / 180.0);

/// Smallest minimum distance accepted from configuration.
const MIN_DISTANCE_FLOOR: f32 = 1e-3;

/// Clamp ranges and speeds for an [`OrbitCamera`].
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct CameraLimits {
    /// Distance-from-focus floor. Always strictly positive.
    pub min_distance: f32,
    /// Distance-from-focus ceiling. Finite and at least `min_distance`.
    pub max_distance: f32,
    /// Pitch is clamped to `[-max_pitch, max_pitch]` radians.
    pub max_pitch: f32,
    /// Focus translation per pan unit, per unit of distance.
    pub pan_speed: f32,
}

impl Default for CameraLimits {
    fn default() -> Self {
        Self {
            min_distance: 0.5,
            max_distance: 1.0e4,
            max_pitch: 89.0_f32.to_radians(),
            pan_speed: 0.01,
        }
    }
}

impl CameraLimits {
    /// Replaces out-of-range values so the camera can never reach a degenerate
    /// view (zero-length view vector or a pole flip).
    pub fn sanitized(self) -> Self {
        let defaults = Self::default();
        let min_distance = if self.min_distance.is_finite() {
            self.min_distance.max(MIN_DISTANCE_FLOOR)
        } else {
            defaults.min_distance
        };
        let max_distance = if self.max_distance.is_finite() {
            self.max_distance.max(min_distance)
        } else {
            defaults.max_distance.max(min_distance)
        };
        let max_pitch = if self.max_pitch.is_finite() {
            self.max_pitch.clamp(0.0, PITCH_CEILING)
        } else {
            defaults.max_pitch
        };
        let pan_speed = if self.pan_speed.is_finite() {
            self.pan_speed
        } else {
            defaults.pan_speed
        };
        Self {
            min_distance,
            max_distance,
            max_pitch,
            pan_speed,
        }
    }
}

/// Camera orbiting a focus point, described by a spherical offset.
///
/// The view matrix is recomputed eagerly after each command, so reads are free
/// and always consistent with `(focus, distance, yaw, pitch)`.
#[derive(Debug, Clone, PartialEq)]
pub struct OrbitCamera {
    focus: Vec3,
    distance: f32,
    yaw: f32,
    pitch: f32,
    limits: CameraLimits,
    view: Mat4,
}

impl Default for OrbitCamera {
    fn default() -> Self {
        Self::new(Vec3::ZERO, 10.0, CameraLimits::default())
    }
}

impl OrbitCamera {
    /// Creates a camera looking at `focus` from `distance` along +Z.
    pub fn new(focus: Vec3, distance: f32, limits: CameraLimits) -> Self {
        let limits = limits.sanitized();
        let distance = if distance.is_finite() {
            distance.clamp(limits.min_distance, limits.max_distance)
        } else {
            limits.min_distance
        };
        let mut camera = Self {
            focus,
            distance,
            yaw: 0.0,
            pitch: 0.0,
            limits,
            view: Mat4::IDENTITY,
        };
        camera.refresh();
        camera
    }

    /// Translates the focus in the camera's right/up plane.
    ///
    /// The step scales with distance so on-screen pan speed stays constant while zoomed.
    /// A step that would leave the view non-finite is ignored.
    pub fn pan(&mut self, dx: f32, dy: f32) {
        let (right, up) = self.right_up();
        let scale = self.distance * self.limits.pan_speed;
        let focus = self.focus + (right * dx + up * dy) * scale;
        let view = Self::look_at(focus, self.offset_direction() * self.distance);
        if !(focus.is_finite() && view.is_finite()) {
            return;
        }
        self.focus = focus;
        self.view = view;
    }

    /// Moves along the view direction. Positive moves away from the focus.
    ///
    /// Non-finite deltas are ignored.
    pub fn zoom(&mut self, delta: f32) {
        if !delta.is_finite() {
            return;
        }
        self.distance =
            (self.distance + delta).clamp(self.limits.min_distance, self.limits.max_distance);
        self.refresh();
    }

    /// Orbits around the focus. Angles are in radians; non-finite input is ignored.
    pub fn rotate(&mut self, d_yaw: f32, d_pitch: f32) {
        if !(d_yaw.is_finite() && d_pitch.is_finite()) {
            return;
        }
        self.yaw = (self.yaw + d_yaw).rem_euclid(std::f32::consts::TAU);
        self.pitch = (self.pitch + d_pitch).clamp(-self.limits.max_pitch, self.limits.max_pitch);
        self.refresh();
    }

    #[inline]
    pub fn view_matrix(&self) -> Mat4 {
        self.view
    }

    #[inline]
    pub fn focus(&self) -> Vec3 {
        self.focus
    }

    #[inline]
    pub fn distance(&self) -> f32 {
        self.distance
    }

    #[inline]
    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    #[inline]
    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    #[inline]
    pub fn limits(&self) -> CameraLimits {
        self.limits
    }

    /// World-space eye position.
    pub fn eye(&self) -> Vec3 {
        self.focus + self.offset_direction() * self.distance
    }

    /// Unit vector from the focus toward the eye.
    fn offset_direction(&self) -> Vec3 {
        let (sy, cy) = self.yaw.sin_cos();
        let (sp, cp) = self.pitch.sin_cos();
        Vec3::new(cp * sy, sp, cp * cy)
    }

    fn right_up(&self) -> (Vec3, Vec3) {
        let forward = -self.offset_direction();
        let right = forward.cross(Vec3::Y).normalize();
        let up = right.cross(forward);
        (right, up)
    }

    fn look_at(focus: Vec3, offset: Vec3) -> Mat4 {
        Mat4::look_at_rh(focus + offset, focus, Vec3::Y)
    }

    fn refresh(&mut self) {
        self.view = Self::look_at(self.focus, self.offset_direction() * self.distance);
    }
}
