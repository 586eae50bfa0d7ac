//! Two-track animation controller.
//!
//! Each model instance owns one controller. Clips and their bone bindings are
//! shared through [`AnimationSet`]s; the controller only holds playback state.
//! A new animation is started on the idle track while the active one fades
//! out, driven by timed enable/speed/weight events.

use std::sync::Arc;

use glam::{Mat4, Quat, Vec3};
use smallvec::SmallVec;

use crate::animation::binder::Binder;
use crate::animation::clip::AnimationClip;
use crate::animation::tracks::KeyframeCursor;
use crate::animation::values::Interpolatable;
use crate::scene::hierarchy::{BoneIndex, ModelHierarchy};
use crate::scene::pose::BonePose;

pub const TRACK_COUNT: usize = 2;

/// A clip bound to the bones of one hierarchy.
#[derive(Debug, Clone)]
pub struct AnimationSet {
    pub clip: Arc<AnimationClip>,
    /// Parallel to `clip.outputs`.
    pub bindings: Vec<Option<BoneIndex>>,
}

impl AnimationSet {
    #[must_use]
    pub fn bind(hierarchy: &ModelHierarchy, clip: Arc<AnimationClip>) -> Self {
        let bindings = Binder::bind(hierarchy, &clip);
        Self { clip, bindings }
    }

    #[inline]
    #[must_use]
    pub fn duration(&self) -> f32 {
        self.clip.duration()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EventKind {
    Enable,
    Speed,
    Weight,
}

#[derive(Debug, Clone, Copy)]
struct TrackEvent {
    kind: EventKind,
    value_to: f32,
    value_from: Option<f32>,
    start_time: f32,
    smooth_time: f32,
}

#[derive(Debug, Clone, Default)]
struct Track {
    set: Option<usize>,
    enabled: bool,
    speed: f32,
    weight: f32,
    position: f32,
    events: Vec<TrackEvent>,
    cursors: Vec<[KeyframeCursor; 3]>,
    /// Bones this track no longer drives until a new set is assigned.
    released: SmallVec<[BoneIndex; 4]>,
}

#[derive(Debug, Clone, Copy)]
struct BoneSample {
    valid: [bool; TRACK_COUNT],
    factor: [f32; TRACK_COUNT],
    scale: [Vec3; TRACK_COUNT],
    rotation: [Quat; TRACK_COUNT],
    translation: [Vec3; TRACK_COUNT],
}

impl Default for BoneSample {
    fn default() -> Self {
        Self {
            valid: [false; TRACK_COUNT],
            factor: [0.0; TRACK_COUNT],
            scale: [Vec3::ONE; TRACK_COUNT],
            rotation: [Quat::IDENTITY; TRACK_COUNT],
            translation: [Vec3::ZERO; TRACK_COUNT],
        }
    }
}

#[derive(Debug, Clone)]
pub struct AnimationController {
    sets: Arc<Vec<AnimationSet>>,
    tracks: [Track; TRACK_COUNT],
    bind_pose: Vec<(Vec3, Quat, Vec3)>,
    samples: Vec<BoneSample>,
    cur_time: f32,
    interpolation: bool,
}

impl AnimationController {
    #[must_use]
    pub fn new(sets: Arc<Vec<AnimationSet>>, hierarchy: &ModelHierarchy) -> Self {
        let bind_pose = hierarchy
            .bones()
            .iter()
            .map(|b| b.transformation.to_scale_rotation_translation())
            .collect();

        Self {
            sets,
            tracks: Default::default(),
            bind_pose,
            samples: vec![BoneSample::default(); hierarchy.bone_count()],
            cur_time: 0.0,
            interpolation: true,
        }
    }

    #[must_use]
    pub fn num_sets(&self) -> usize {
        self.sets.len()
    }

    #[must_use]
    pub fn set(&self, index: usize) -> Option<&AnimationSet> {
        self.sets.get(index)
    }

    #[must_use]
    pub fn time(&self) -> f32 {
        self.cur_time
    }

    pub fn set_interpolation(&mut self, enabled: bool) {
        self.interpolation = enabled;
    }

    pub fn set_track_set(&mut self, track: usize, index: usize) {
        let Some(set) = self.sets.get(index) else {
            return;
        };
        let outputs = set.clip.outputs.len();
        let t = &mut self.tracks[track];
        t.set = Some(index);
        t.cursors = vec![Default::default(); outputs];
        t.released.clear();
    }

    /// Stops every track except `skip_track` from driving `bones`.
    pub fn reset_bones_transition(&mut self, skip_track: usize, bones: &[BoneIndex]) {
        for (i, track) in self.tracks.iter_mut().enumerate() {
            if i == skip_track {
                continue;
            }
            for &bone in bones {
                if !track.released.contains(&bone) {
                    track.released.push(bone);
                }
                if let Some(sample) = self.samples.get_mut(bone.index()) {
                    sample.valid[i] = false;
                }
            }
        }
    }

    /// Rewinds the controller clock and drops pending events.
    pub fn reset(&mut self) {
        self.cur_time = 0.0;
        for track in &mut self.tracks {
            track.events.clear();
        }
    }

    pub fn add_event_enable(&mut self, track: usize, enable: bool, start_time: f32) {
        self.push_event(track, EventKind::Enable, if enable { 1.0 } else { -1.0 }, start_time, 0.0);
    }

    pub fn add_event_speed(&mut self, track: usize, speed: f32, start_time: f32, smooth_time: f32) {
        self.push_event(track, EventKind::Speed, speed, start_time, smooth_time);
    }

    pub fn add_event_weight(&mut self, track: usize, weight: f32, start_time: f32, smooth_time: f32) {
        self.push_event(track, EventKind::Weight, weight, start_time, smooth_time);
    }

    fn push_event(&mut self, track: usize, kind: EventKind, value_to: f32, start_time: f32, smooth_time: f32) {
        self.tracks[track].events.push(TrackEvent {
            kind,
            value_to,
            value_from: None,
            start_time,
            smooth_time,
        });
    }

    pub fn set_track_enable(&mut self, track: usize, enable: bool) {
        self.tracks[track].enabled = enable;
    }

    pub fn set_track_position(&mut self, track: usize, position: f32) {
        self.tracks[track].position = position;
    }

    #[must_use]
    pub fn track_position(&self, track: usize) -> f32 {
        self.tracks[track].position
    }

    #[must_use]
    pub fn track_enabled(&self, track: usize) -> bool {
        self.tracks[track].enabled
    }

    #[must_use]
    pub fn track_speed(&self, track: usize) -> f32 {
        self.tracks[track].speed
    }

    #[must_use]
    pub fn track_weight(&self, track: usize) -> f32 {
        self.tracks[track].weight
    }

    /// Advances the clock by `time` seconds and writes animated local
    /// matrices into `pose`.
    pub fn advance_time(&mut self, time: f32, pose: &mut BonePose) {
        self.cur_time += time;
        let cur_time = self.cur_time;

        for track in &mut self.tracks {
            process_events(track, cur_time);
            if track.enabled {
                track.position += time * track.speed;
            }
        }

        for sample in &mut self.samples {
            sample.valid = [false; TRACK_COUNT];
        }

        for (i, track) in self.tracks.iter_mut().enumerate() {
            if !track.enabled || track.weight <= 0.0 {
                continue;
            }
            let Some(set) = track.set.and_then(|s| self.sets.get(s)) else {
                continue;
            };

            let tick = set.clip.tick_at(track.position);
            for (k, output) in set.clip.outputs.iter().enumerate() {
                let Some(bone) = set.bindings[k] else {
                    continue;
                };
                if track.released.contains(&bone) {
                    continue;
                }
                let Some(sample) = self.samples.get_mut(bone.index()) else {
                    continue;
                };

                let (bind_scale, bind_rotation, bind_translation) = self.bind_pose[bone.index()];
                let cursors = &mut track.cursors[k];
                sample.scale[i] = output.scale.sample_with_cursor(tick, &mut cursors[0]).unwrap_or(bind_scale);
                sample.rotation[i] = output
                    .rotation
                    .sample_with_cursor(tick, &mut cursors[1])
                    .unwrap_or(bind_rotation);
                sample.translation[i] = output
                    .translation
                    .sample_with_cursor(tick, &mut cursors[2])
                    .unwrap_or(bind_translation);
                sample.valid[i] = true;
                sample.factor[i] = track.weight;
            }
        }

        for (bone, sample) in self.samples.iter().enumerate() {
            let local = if sample.valid[0] && sample.valid[1] {
                let factor = sample.factor[1];
                let scale = Vec3::blend(sample.scale[0], sample.scale[1], factor, self.interpolation);
                let rotation = Quat::blend(sample.rotation[0], sample.rotation[1], factor, self.interpolation);
                let translation = Vec3::blend(sample.translation[0], sample.translation[1], factor, self.interpolation);
                Mat4::from_scale_rotation_translation(scale, rotation, translation)
            } else if let Some(k) = sample.valid.iter().position(|&v| v) {
                Mat4::from_scale_rotation_translation(sample.scale[k], sample.rotation[k], sample.translation[k])
            } else {
                continue;
            };

            if let Some(slot) = pose.local.get_mut(bone) {
                *slot = local;
            }
        }
    }
}

fn process_events(track: &mut Track, cur_time: f32) {
    let (speed, weight) = (track.speed, track.weight);
    let mut enabled = track.enabled;
    let mut new_speed = speed;
    let mut new_weight = weight;

    track.events.retain_mut(|e| {
        if cur_time < e.start_time {
            return true;
        }

        if e.smooth_time > 0.0 && e.value_from.is_none() {
            e.value_from = match e.kind {
                EventKind::Speed => Some(speed),
                EventKind::Weight => Some(weight),
                EventKind::Enable => None,
            };
        }

        let mut keep = false;
        let mut value = e.value_to;
        if cur_time < e.start_time + e.smooth_time {
            let from = e.value_from.unwrap_or(e.value_to);
            value = f32::interpolate_linear(from, e.value_to, (cur_time - e.start_time) / e.smooth_time);
            keep = true;
        }

        match e.kind {
            EventKind::Enable => enabled = value > 0.0,
            EventKind::Speed => new_speed = value,
            EventKind::Weight => new_weight = value,
        }
        keep
    });

    track.enabled = enabled;
    track.speed = new_speed;
    track.weight = new_weight;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::hierarchy::BoneDesc;
    use crate::animation::clip::BoneTrack;

    fn setup() -> (ModelHierarchy, AnimationController) {
        let hierarchy = ModelHierarchy::from_desc(
            "test.x",
            &BoneDesc::new("Root", Mat4::IDENTITY).with_child(BoneDesc::new("Arm", Mat4::IDENTITY)),
        );
        let walk = AnimationClip::new("test.x", "walk", 10.0, 10.0).with_output(
            BoneTrack::new("Arm").with_translation(vec![0.0, 10.0], vec![Vec3::ZERO, Vec3::new(10.0, 0.0, 0.0)]),
        );
        let idle = AnimationClip::new("test.x", "idle", 10.0, 10.0).with_output(
            BoneTrack::new("Arm").with_translation(vec![0.0], vec![Vec3::new(0.0, 4.0, 0.0)]),
        );
        let sets = vec![
            AnimationSet::bind(&hierarchy, Arc::new(walk)),
            AnimationSet::bind(&hierarchy, Arc::new(idle)),
        ];
        let controller = AnimationController::new(Arc::new(sets), &hierarchy);
        (hierarchy, controller)
    }

    fn start(controller: &mut AnimationController, track: usize, set: usize) {
        controller.set_track_set(track, set);
        controller.reset();
        controller.set_track_enable(track, true);
        controller.set_track_position(track, 0.0);
        controller.add_event_speed(track, 1.0, 0.0, 0.0001);
        controller.add_event_weight(track, 1.0, 0.0, 0.0001);
    }

    #[test]
    fn single_track_samples_clip() {
        let (hierarchy, mut controller) = setup();
        let mut pose = BonePose::from_hierarchy(&hierarchy);
        start(&mut controller, 0, 0);

        controller.advance_time(0.0001, &mut pose);
        controller.advance_time(0.5, &mut pose);

        let x = pose.local[1].w_axis.x;
        assert!((x - 5.0).abs() < 0.01, "got {x}");
    }

    #[test]
    fn position_wraps_around_clip_duration() {
        let (hierarchy, mut controller) = setup();
        let mut pose = BonePose::from_hierarchy(&hierarchy);
        start(&mut controller, 0, 0);
        controller.advance_time(0.0001, &mut pose);
        controller.advance_time(1.25, &mut pose);

        let x = pose.local[1].w_axis.x;
        assert!((x - 2.5).abs() < 0.01, "got {x}");
    }

    #[test]
    fn cross_fade_ramps_weights() {
        let (hierarchy, mut controller) = setup();
        let mut pose = BonePose::from_hierarchy(&hierarchy);
        start(&mut controller, 0, 0);
        controller.advance_time(0.0001, &mut pose);

        controller.set_track_set(1, 1);
        controller.reset();
        controller.add_event_enable(0, false, 1.0);
        controller.add_event_speed(0, 0.0, 0.0, 1.0);
        controller.add_event_weight(0, 0.0, 0.0, 1.0);
        controller.set_track_enable(1, true);
        controller.set_track_position(1, 0.0);
        controller.add_event_speed(1, 1.0, 0.0, 1.0);
        controller.add_event_weight(1, 1.0, 0.0, 1.0);

        controller.advance_time(0.5, &mut pose);
        assert!((controller.track_weight(0) - 0.5).abs() < 1e-3);
        assert!((controller.track_weight(1) - 0.5).abs() < 1e-3);

        controller.advance_time(0.6, &mut pose);
        assert!(!controller.track_enabled(0));
        assert_eq!(controller.track_weight(1), 1.0);
        let y = pose.local[1].w_axis.y;
        assert!((y - 4.0).abs() < 1e-4);
    }

    #[test]
    fn released_bones_ignore_track() {
        let (hierarchy, mut controller) = setup();
        let mut pose = BonePose::from_hierarchy(&hierarchy);
        start(&mut controller, 0, 1);
        controller.reset_bones_transition(1, &[BoneIndex(1)]);
        controller.advance_time(0.1, &mut pose);
        assert_eq!(pose.local[1], Mat4::IDENTITY);
    }
}
