//! Rendering, history and export configuration.

use std::time::Duration;

/// Rendering configuration
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Window width (pixels)
    pub window_width: u32,

    /// Window height (pixels)
    pub window_height: u32,

    /// Near clipping plane at zoom 1.0 (world units)
    pub near_plane: f32,

    /// Far clipping plane (world units)
    pub far_plane: f32,

    /// Directional light, pointing from the surface towards the light
    pub light_dir: [f32; 3],

    /// Ambient light level in solid mode (0-1)
    pub ambient: f32,

    /// Pitch change for a drag across the full window height (degrees)
    pub drag_pitch_degrees: f32,

    /// Yaw change for a drag across the full window width (degrees)
    pub drag_yaw_degrees: f32,

    /// Zoom factor per mouse wheel notch
    pub zoom_step: f32,

    /// Allowed zoom range
    pub zoom_min: f32,
    pub zoom_max: f32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            window_width: 1280,
            window_height: 720,
            near_plane: 1.5,
            far_plane: 5000.0,
            light_dir: [0.0, 1.0, 1.0],
            ambient: 0.1,
            drag_pitch_degrees: 180.0,
            drag_yaw_degrees: 360.0,
            zoom_step: 1.05,
            zoom_min: 0.25,
            zoom_max: 5.0,
        }
    }
}

impl RenderConfig {
    pub fn aspect_ratio(&self) -> f32 {
        self.window_width as f32 / self.window_height as f32
    }
}

/// Spectrum history sizing
#[derive(Debug, Clone)]
pub struct HistoryConfig {
    /// Time-slices kept for live input (T)
    pub slices: usize,

    /// Rows a loaded spectrum log is compressed down to
    pub max_log_rows: usize,

    /// Quiet period after a slider change before the full rebuild
    pub rebuild_delay: Duration,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            slices: 240,
            max_log_rows: 720,
            rebuild_delay: Duration::from_millis(1000),
        }
    }
}

/// Mesh export scaling
#[derive(Debug, Clone)]
pub struct ExportConfig {
    /// STL coordinates are written in metres for 3D printing (1 unit = 1 mm)
    pub stl_scale: f32,

    pub obj_scale: f32,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            stl_scale: 0.001,
            obj_scale: 1.0,
        }
    }
}
