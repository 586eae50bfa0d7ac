use glam::{Quat, Vec3};

use crate::animation::tracks::{InterpolationMode, KeyframeTrack};
use crate::utils::interner::{self, NameHash};

/// Scale, rotation and translation keys driving one bone.
#[derive(Debug, Clone)]
pub struct BoneTrack {
    pub bone_name: NameHash,
    pub scale: KeyframeTrack<Vec3>,
    pub rotation: KeyframeTrack<Quat>,
    pub translation: KeyframeTrack<Vec3>,
}

impl BoneTrack {
    #[must_use]
    pub fn new(bone_name: &str) -> Self {
        Self {
            bone_name: interner::intern(bone_name),
            scale: KeyframeTrack::new(Vec::new(), Vec::new(), InterpolationMode::Linear),
            rotation: KeyframeTrack::new(Vec::new(), Vec::new(), InterpolationMode::Linear),
            translation: KeyframeTrack::new(Vec::new(), Vec::new(), InterpolationMode::Linear),
        }
    }

    #[must_use]
    pub fn with_scale(mut self, times: Vec<f32>, values: Vec<Vec3>) -> Self {
        self.scale = KeyframeTrack::new(times, values, InterpolationMode::Linear);
        self
    }

    #[must_use]
    pub fn with_rotation(mut self, times: Vec<f32>, values: Vec<Quat>) -> Self {
        self.rotation = KeyframeTrack::new(times, values, InterpolationMode::Linear);
        self
    }

    #[must_use]
    pub fn with_translation(mut self, times: Vec<f32>, values: Vec<Vec3>) -> Self {
        self.translation = KeyframeTrack::new(times, values, InterpolationMode::Linear);
        self
    }
}

/// One animation set of a model file.
///
/// Key times are expressed in ticks; `ticks_per_second` converts playback
/// seconds into ticks.
#[derive(Debug, Clone)]
pub struct AnimationClip {
    pub name: String,
    pub file_name: String,
    pub duration_ticks: f32,
    pub ticks_per_second: f32,
    pub outputs: Vec<BoneTrack>,
}

impl AnimationClip {
    #[must_use]
    pub fn new(file_name: &str, name: &str, duration_ticks: f32, ticks_per_second: f32) -> Self {
        Self {
            name: name.to_string(),
            file_name: file_name.to_string(),
            duration_ticks,
            ticks_per_second,
            outputs: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_output(mut self, output: BoneTrack) -> Self {
        self.outputs.push(output);
        self
    }

    /// Duration in seconds.
    #[must_use]
    pub fn duration(&self) -> f32 {
        if self.ticks_per_second > 0.0 {
            self.duration_ticks / self.ticks_per_second
        } else {
            0.0
        }
    }

    /// Wraps a track position (seconds) into clip ticks.
    #[must_use]
    pub fn tick_at(&self, position: f32) -> f32 {
        if self.duration_ticks > 0.0 {
            (position * self.ticks_per_second).rem_euclid(self.duration_ticks)
        } else {
            0.0
        }
    }
}
