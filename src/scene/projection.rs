//! Frame Projection
//!
//! Models are rendered into an offscreen frame `FRAME_SCALE` times larger
//! than their draw size through an orthographic projection. This module
//! converts between frame pixels (top-down, in draw-size units) and model
//! world space.

use glam::{IVec2, Mat4, Vec2, Vec3};

use crate::settings::{FRAME_SCALE, ModelSettings};

#[derive(Debug, Clone, PartialEq)]
pub struct FrameProjection {
    /// Frame width in frame pixels.
    pub frame_width: i32,
    /// Frame height in frame pixels.
    pub frame_height: i32,
    pub projection: Mat4,
    inv_projection: Mat4,
}

impl FrameProjection {
    /// Builds the projection for a model drawn at `draw_width`x`draw_height`,
    /// enlarged by `draw_scale`.
    #[must_use]
    pub fn new(draw_width: i32, draw_height: i32, draw_scale: f32, settings: &ModelSettings) -> Self {
        let draw_width = (draw_width as f32 * draw_scale).round() as i32;
        let draw_height = (draw_height as f32 * draw_scale).round() as i32;
        let frame_width = (draw_width * FRAME_SCALE).max(1);
        let frame_height = (draw_height * FRAME_SCALE).max(1);

        let frame_ratio = frame_width as f32 / frame_height as f32;
        let proj_height = frame_height as f32 / settings.model_proj_factor;
        let proj_width = proj_height * frame_ratio;
        let projection = Mat4::orthographic_rh_gl(0.0, proj_width, 0.0, proj_height, -10.0, 10.0);

        Self {
            frame_width,
            frame_height,
            projection,
            inv_projection: projection.inverse(),
        }
    }

    /// Draw size in draw-size pixels.
    #[must_use]
    pub fn draw_size(&self) -> (i32, i32) {
        (self.frame_width / FRAME_SCALE, self.frame_height / FRAME_SCALE)
    }

    /// Point the model stands on: horizontally centered, a quarter above the bottom.
    #[must_use]
    pub fn anchor(&self) -> IVec2 {
        let (w, h) = self.draw_size();
        IVec2::new(w / 2, h - h / 4)
    }

    /// World position to frame pixels with sub-pixel precision.
    #[must_use]
    pub fn project_f(&self, pos: Vec3) -> Vec2 {
        let ndc = self.projection.project_point3(pos);
        let x = (ndc.x + 1.0) * 0.5 * self.frame_width as f32;
        let y_up = (ndc.y + 1.0) * 0.5 * self.frame_height as f32;
        Vec2::new(x, self.frame_height as f32 - y_up) / FRAME_SCALE as f32
    }

    /// World position to frame pixels.
    #[must_use]
    pub fn project(&self, pos: Vec3) -> IVec2 {
        let p = self.project_f(pos);
        IVec2::new(p.x.round() as i32, p.y.round() as i32)
    }

    /// Frame pixels to a world position on the `z = 0` plane.
    #[must_use]
    pub fn unproject(&self, x: i32, y: i32) -> Vec3 {
        let xf = (x * FRAME_SCALE) as f32;
        let y_up = self.frame_height as f32 - (y * FRAME_SCALE) as f32;
        let ndc = Vec3::new(
            xf / self.frame_width as f32 * 2.0 - 1.0,
            y_up / self.frame_height as f32 * 2.0 - 1.0,
            -1.0,
        );
        let mut out = self.inv_projection.project_point3(ndc);
        out.z = 0.0;
        out
    }
}
