//! Viewer camera driven by the `/cam/*` parameters.

use glam::{Mat4, Vec3};

use crate::params::{ParamHost, RenderConfig, CAM_POS, CAM_ROT, CAM_ZOOM};

/// Camera position, rotation (degrees about X and Y) and zoom
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewCamera {
    pub position: Vec3,
    pub rotation: Vec3,
    pub zoom: f32,
}

impl Default for ViewCamera {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, 700.0),
            rotation: Vec3::ZERO,
            zoom: 1.0,
        }
    }
}

impl ViewCamera {
    /// Read the current camera parameters, falling back to defaults
    pub fn from_params(params: &ParamHost) -> Self {
        let defaults = Self::default();
        Self {
            position: params.vec3(CAM_POS).unwrap_or(defaults.position),
            rotation: params.vec3(CAM_ROT).unwrap_or(defaults.rotation),
            zoom: params.float(CAM_ZOOM).unwrap_or(defaults.zoom),
        }
    }

    /// Translate away from the camera, then pitch, then yaw the scene
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::from_translation(-self.position)
            * Mat4::from_rotation_x(self.rotation.x.to_radians())
            * Mat4::from_rotation_y(self.rotation.y.to_radians())
    }

    /// Frustum spanning ±1 vertically at the near plane; zooming pushes the
    /// near plane out and narrows the field of view
    pub fn projection_matrix(&self, config: &RenderConfig) -> Mat4 {
        let near = config.near_plane * self.zoom.max(f32::EPSILON);
        let fov_y = 2.0 * (1.0 / near).atan();
        Mat4::perspective_rh(fov_y, config.aspect_ratio(), near, config.far_plane)
    }

    pub fn view_proj(&self, config: &RenderConfig) -> Mat4 {
        self.projection_matrix(config) * self.view_matrix()
    }
}

/// Rotation after a mouse drag of `(dx, dy)` pixels.
///
/// A drag across the whole window turns the camera by the configured
/// amounts. Pitch stays within ±90°.
pub fn drag_rotation(rotation: Vec3, delta: (f64, f64), config: &RenderConfig) -> Vec3 {
    let width = config.window_width.max(1) as f32;
    let height = config.window_height.max(1) as f32;
    let pitch = rotation.x + delta.1 as f32 / height * config.drag_pitch_degrees;
    let yaw = rotation.y + delta.0 as f32 / width * config.drag_yaw_degrees;
    Vec3::new(pitch.clamp(-90.0, 90.0), yaw, rotation.z)
}

/// Zoom after `notches` of mouse wheel movement (positive zooms in)
pub fn wheel_zoom(zoom: f32, notches: f32, config: &RenderConfig) -> f32 {
    (zoom * config.zoom_step.powf(notches)).clamp(config.zoom_min, config.zoom_max)
}
