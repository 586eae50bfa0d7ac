//! Model Settings
//!
//! Process-wide knobs shared by every model instance: transition smoothing,
//! 2D emulation frame rate, camera angle and projection, default frame sizes
//! and the bone budget of a combined mesh.
//!
//! ```rust,ignore
//! use fo3d::settings::ModelSettings;
//!
//! // Stepped 10 FPS playback, like the classic sprites
//! let settings = ModelSettings {
//!     animation_3d_fps: 10,
//!     ..Default::default()
//! };
//! assert_eq!(settings.anim_delay(), 100);
//! ```

use serde::{Deserialize, Serialize};

/// Upscale factor between the draw size and the offscreen frame.
pub const FRAME_SCALE: i32 = 2;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSettings {
    /// Cross-fade duration between two animations, milliseconds.
    pub animation_3d_smooth_time: u32,
    /// Target frame rate of stepped playback. `0` plays smoothly.
    pub animation_3d_fps: u32,
    /// Tilt of the map camera around the X axis, degrees.
    pub map_camera_angle: f32,
    /// Pixels per world unit of the orthographic frame projection.
    pub model_proj_factor: f32,
    pub default_draw_width: i32,
    pub default_draw_height: i32,
    /// `0` derives the view width from the draw width.
    pub default_view_width: i32,
    /// `0` derives the view height from the draw height.
    pub default_view_height: i32,
    /// Six directions per turn instead of eight.
    pub hexagonal_geometry: bool,
    /// Maximum number of bone matrices in one combined mesh.
    pub max_bones: usize,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            animation_3d_smooth_time: 150,
            animation_3d_fps: 0,
            map_camera_angle: 25.7,
            model_proj_factor: 40.0,
            default_draw_width: 128,
            default_draw_height: 128,
            default_view_width: 0,
            default_view_height: 0,
            hexagonal_geometry: true,
            max_bones: 60,
        }
    }
}

impl ModelSettings {
    /// Cross-fade duration in seconds, never below one millisecond.
    #[must_use]
    pub fn move_transition_time(&self) -> f32 {
        (self.animation_3d_smooth_time as f32 / 1000.0).max(0.001)
    }

    /// Step of stepped playback in milliseconds, `0` when smooth.
    #[must_use]
    pub fn anim_delay(&self) -> u32 {
        if self.animation_3d_fps == 0 {
            0
        } else {
            1000 / self.animation_3d_fps
        }
    }

    /// Converts a map direction into a screen angle in degrees.
    #[must_use]
    pub fn dir_to_angle(&self, dir: u8) -> i32 {
        if self.hexagonal_geometry {
            i32::from(dir) * 60 + 30
        } else {
            i32::from(dir) * 45 + 45
        }
    }

    /// Model facing before any `set_dir` call.
    #[must_use]
    pub fn default_dir_angle(&self) -> f32 {
        if self.hexagonal_geometry { 150.0 } else { 135.0 }
    }

    #[must_use]
    pub fn view_size(&self, draw_width: i32, draw_height: i32) -> (i32, i32) {
        let width = if self.default_view_width != 0 {
            self.default_view_width
        } else {
            draw_width / 4
        };
        let height = if self.default_view_height != 0 {
            self.default_view_height
        } else {
            draw_height / 2
        };
        (width, height)
    }
}
