use glam::Mat4;

use super::OrbitCamera;
use crate::error::ConfigError;

/// Index of a camera inside a [`CameraRig`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct CameraId(usize);

impl CameraId {
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

/// Set of cameras with exactly one transform source.
///
/// The frame pipeline reads the view matrix from whichever camera was activated
/// last. The first camera added becomes active.
#[derive(Debug, Clone)]
pub struct CameraRig {
    cameras: Vec<OrbitCamera>,
    active: usize,
}

impl CameraRig {
    /// Creates a rig whose initial (and active) camera is `camera`.
    pub fn new(camera: OrbitCamera) -> Self {
        Self {
            cameras: vec![camera],
            active: 0,
        }
    }

    /// Adds a camera without activating it.
    pub fn add(&mut self, camera: OrbitCamera) -> CameraId {
        self.cameras.push(camera);
        CameraId(self.cameras.len() - 1)
    }

    /// Marks `id` as the transform source for subsequent frames.
    pub fn activate(&mut self, id: CameraId) -> Result<(), ConfigError> {
        if id.0 >= self.cameras.len() {
            return Err(ConfigError::UnknownCamera(id.0));
        }
        if self.active != id.0 {
            log::debug!("camera {} activated", id.0);
        }
        self.active = id.0;
        Ok(())
    }

    #[inline]
    pub fn active_id(&self) -> CameraId {
        CameraId(self.active)
    }

    pub fn active(&self) -> &OrbitCamera {
        &self.cameras[self.active]
    }

    pub fn active_mut(&mut self) -> &mut OrbitCamera {
        &mut self.cameras[self.active]
    }

    pub fn get(&self, id: CameraId) -> Option<&OrbitCamera> {
        self.cameras.get(id.0)
    }

    pub fn get_mut(&mut self, id: CameraId) -> Option<&mut OrbitCamera> {
        self.cameras.get_mut(id.0)
    }

    /// View matrix of the active camera.
    #[inline]
    pub fn view_matrix(&self) -> Mat4 {
        self.active().view_matrix()
    }

    pub fn len(&self) -> usize {
        self.cameras.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cameras.is_empty()
    }
}
