use glam::{Quat, Vec3};

pub trait Interpolatable: Copy + Clone + Sized {
    fn interpolate_linear(start: Self, end: Self, t: f32) -> Self;

    /// Blend used when interpolation is disabled: snap at the midpoint.
    #[inline]
    fn interpolate_step(start: Self, end: Self, t: f32) -> Self {
        if t >= 0.5 { end } else { start }
    }

    #[inline]
    fn blend(start: Self, end: Self, t: f32, interpolate: bool) -> Self {
        if interpolate {
            Self::interpolate_linear(start, end, t)
        } else {
            Self::interpolate_step(start, end, t)
        }
    }
}

impl Interpolatable for f32 {
    fn interpolate_linear(start: Self, end: Self, t: f32) -> Self {
        start + (end - start) * t
    }
}

impl Interpolatable for Vec3 {
    fn interpolate_linear(start: Self, end: Self, t: f32) -> Self {
        start.lerp(end, t)
    }
}

impl Interpolatable for Quat {
    fn interpolate_linear(start: Self, end: Self, t: f32) -> Self {
        start.slerp(end, t)
    }
}
