use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::animation::clip::AnimationClip;
use crate::animation::controller::AnimationSet;
use crate::model::description::{AnimEqualKind, ModelDescription};
use crate::model::params::{AnimParams, LAYERS3D_COUNT, pack_anim};
use crate::scene::hierarchy::ModelHierarchy;
use crate::settings::ModelSettings;
use crate::utils::interner::{self, NameHash};

/// Marks the combat variant of an `anim2` code.
pub const COMBAT_ANIM_BIT: u32 = 0x8000;
/// Weapon group substituted when a model lacks an action.
pub const ANIM1_UNARMED: u32 = 1;
/// Action substituted when a model lacks an action.
pub const ANIM2_IDLE: u32 = 1;

/// Table slot a resolved clip is registered under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimSlot {
    /// Packed `(anim1 << 16) | anim2` action key.
    Action(u32),
    /// Sprite pre-render clip.
    Render,
}

#[derive(Debug, Clone)]
pub struct ResolvedAnim {
    pub slot: AnimSlot,
    pub clip: Arc<AnimationClip>,
}

/// Result of an action lookup after substitution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnimationIndex {
    pub index: usize,
    pub speed: f32,
    /// Action pair that was actually found.
    pub anim1: u32,
    pub anim2: u32,
}

/// Clip and frame window used for sprite pre-rendering.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderFrames {
    /// Clip duration in seconds, `0` without a clip.
    pub period: f32,
    pub proc_from: i32,
    pub proc_to: i32,
    pub dir: i32,
}

/// Shared, immutable data of one model description.
///
/// Built once per description name by the manager and shared by every
/// instance created from it.
#[derive(Debug)]
pub struct ModelEntity {
    pub file_name: String,
    pub hierarchy: Arc<ModelHierarchy>,
    pub anim_data_default: AnimParams,
    pub anim_data: Vec<AnimParams>,
    pub animation_sets: Arc<Vec<AnimationSet>>,
    anim_indexes: FxHashMap<u32, usize>,
    anim_speed: FxHashMap<u32, f32>,
    anim1_equals: FxHashMap<u32, u32>,
    anim2_equals: FxHashMap<u32, u32>,
    anim_layer_values: FxHashMap<u32, Vec<(usize, i32)>>,
    pub fast_transition_bones: FxHashSet<NameHash>,
    pub render_anim: usize,
    render_frames: RenderFrames,
    pub shadow_disabled: bool,
    pub draw_width: i32,
    pub draw_height: i32,
    pub view_width: i32,
    pub view_height: i32,
    pub interpolation: bool,
}

impl ModelEntity {
    #[must_use]
    pub fn new(
        file_name: &str,
        desc: &ModelDescription,
        hierarchy: Arc<ModelHierarchy>,
        anims: Vec<ResolvedAnim>,
        settings: &ModelSettings,
    ) -> Self {
        let table = desc.link_table(file_name);

        let mut sets = Vec::with_capacity(anims.len());
        let mut anim_indexes = FxHashMap::default();
        let mut render_anim = 0;
        for anim in anims {
            let index = sets.len();
            sets.push(AnimationSet::bind(&hierarchy, anim.clip));
            match anim.slot {
                AnimSlot::Action(key) => {
                    anim_indexes.insert(key, index);
                }
                AnimSlot::Render => render_anim = index,
            }
        }

        let combat_key = |anim1: u32, anim2: u32, combat: bool| {
            pack_anim(anim1, if combat { anim2 | COMBAT_ANIM_BIT } else { anim2 })
        };
        let anim_speed = desc
            .anim_speeds
            .iter()
            .map(|s| (combat_key(s.anim1, s.anim2, s.combat), s.speed))
            .collect();

        let mut anim1_equals = FxHashMap::default();
        let mut anim2_equals = FxHashMap::default();
        for eq in &desc.anim_equals {
            match eq.kind {
                AnimEqualKind::Anim1 => anim1_equals.insert(eq.from, eq.to),
                AnimEqualKind::Anim2 => anim2_equals.insert(eq.from, eq.to),
            };
        }

        let mut anim_layer_values: FxHashMap<u32, Vec<(usize, i32)>> = FxHashMap::default();
        for lv in &desc.anim_layer_values {
            if !(0..LAYERS3D_COUNT as i32).contains(&lv.layer) {
                log::warn!("Model '{file_name}': forced layer {} is out of range, skipped", lv.layer);
                continue;
            }
            anim_layer_values
                .entry(pack_anim(lv.anim1, lv.anim2))
                .or_default()
                .push((lv.layer as usize, lv.value));
        }

        let (proc_from, proc_to, dir) = desc
            .render_frames
            .as_ref()
            .map_or((0, 100, 0), |r| (r.proc_from.clamp(0, 100), r.proc_to.clamp(0, 100), r.dir));
        let period = if desc.render_frames.is_some() {
            sets.get(render_anim).map_or(0.0, AnimationSet::duration)
        } else {
            0.0
        };

        let [draw_width, draw_height] = desc
            .draw_size
            .unwrap_or([settings.default_draw_width, settings.default_draw_height]);
        let [view_width, view_height] = desc.view_size.unwrap_or_else(|| {
            let (w, h) = settings.view_size(draw_width, draw_height);
            [w, h]
        });

        log::debug!("Model '{file_name}': {} clips, {} layer records", sets.len(), table.links.len());

        Self {
            file_name: file_name.to_string(),
            hierarchy,
            anim_data_default: table.default,
            anim_data: table.links,
            animation_sets: Arc::new(sets),
            anim_indexes,
            anim_speed,
            anim1_equals,
            anim2_equals,
            anim_layer_values,
            fast_transition_bones: desc.fast_transition_bones.iter().map(|b| interner::intern(b)).collect(),
            render_anim,
            render_frames: RenderFrames {
                period,
                proc_from,
                proc_to,
                dir,
            },
            shadow_disabled: desc.shadow_disabled,
            draw_width,
            draw_height,
            view_width,
            view_height,
            interpolation: !desc.disable_animation_interpolation,
        }
    }

    /// Looks up an action, trying the combat variant second unless
    /// `combat_first`, then substituting unarmed and idle.
    #[must_use]
    pub fn get_animation_index(&self, anim1: u32, anim2: u32, combat_first: bool) -> Option<AnimationIndex> {
        let lookup = |a1: u32, a2: u32| {
            let (first, second) = if combat_first {
                (a2 | COMBAT_ANIM_BIT, a2)
            } else {
                (a2, a2 | COMBAT_ANIM_BIT)
            };
            self.get_animation_index_ex(a1, first)
                .or_else(|| self.get_animation_index_ex(a1, second))
                .map(|(index, speed)| AnimationIndex {
                    index,
                    speed,
                    anim1: a1,
                    anim2: a2,
                })
        };

        lookup(anim1, anim2)
            .or_else(|| (anim1 != ANIM1_UNARMED).then(|| lookup(ANIM1_UNARMED, anim2)).flatten())
            .or_else(|| (anim2 != ANIM2_IDLE).then(|| lookup(ANIM1_UNARMED, ANIM2_IDLE)).flatten())
    }

    /// Exact lookup after the equality tables. Returns the clip index and
    /// its speed multiplier.
    #[must_use]
    pub fn get_animation_index_ex(&self, anim1: u32, anim2: u32) -> Option<(usize, f32)> {
        let anim1 = self.anim1_equals.get(&anim1).copied().unwrap_or(anim1);
        let combat = anim2 & COMBAT_ANIM_BIT;
        let base = anim2 & !COMBAT_ANIM_BIT;
        let anim2 = self.anim2_equals.get(&base).copied().unwrap_or(base) | combat;

        let key = pack_anim(anim1, anim2);
        let speed = self.anim_speed.get(&key).copied().unwrap_or(1.0);
        self.anim_indexes.get(&key).map(|&index| (index, speed))
    }

    #[must_use]
    pub fn is_animation(&self, anim1: u32, anim2: u32) -> bool {
        self.get_animation_index_ex(anim1, anim2).is_some()
    }

    /// Layer values forced while the packed action plays.
    #[must_use]
    pub fn anim_layer_values(&self, anim_pair: u32) -> &[(usize, i32)] {
        self.anim_layer_values.get(&anim_pair).map_or(&[], Vec::as_slice)
    }

    #[must_use]
    pub fn render_frames(&self) -> RenderFrames {
        self.render_frames
    }

    /// Duration of a clip in seconds.
    #[must_use]
    pub fn clip_duration(&self, index: usize) -> Option<f32> {
        self.animation_sets.get(index).map(AnimationSet::duration)
    }
}

#[cfg(test)]
mod tests {
    use glam::Mat4;

    use super::*;
    use crate::model::description::{AnimEqualDesc, AnimSpeedDesc};
    use crate::scene::hierarchy::BoneDesc;

    fn entity(desc: &ModelDescription, actions: &[(u32, u32)]) -> ModelEntity {
        let hierarchy = Arc::new(ModelHierarchy::from_desc("m.x", &BoneDesc::new("Root", Mat4::IDENTITY)));
        let anims = actions
            .iter()
            .map(|&(a1, a2)| ResolvedAnim {
                slot: AnimSlot::Action(pack_anim(a1, a2)),
                clip: Arc::new(AnimationClip::new("m.x", &format!("{a1}_{a2}"), 10.0, 10.0)),
            })
            .collect();
        ModelEntity::new("m.fo3d", desc, hierarchy, anims, &ModelSettings::default())
    }

    #[test]
    fn lookup_applies_equals_and_speed() {
        let desc = ModelDescription {
            anim_equals: vec![
                AnimEqualDesc { kind: AnimEqualKind::Anim1, from: 5, to: 2 },
                AnimEqualDesc { kind: AnimEqualKind::Anim2, from: 7, to: 3 },
            ],
            anim_speeds: vec![AnimSpeedDesc { anim1: 2, anim2: 3, combat: false, speed: 1.5 }],
            ..Default::default()
        };
        let e = entity(&desc, &[(1, 1), (2, 3)]);

        assert_eq!(e.get_animation_index_ex(5, 7), Some((1, 1.5)));
        assert!(e.is_animation(2, 3));
        assert!(!e.is_animation(2, 4));
    }

    #[test]
    fn combat_variant_order() {
        let desc = ModelDescription::default();
        let e = entity(&desc, &[(1, 1), (2, 3), (2, 3 | COMBAT_ANIM_BIT)]);

        assert_eq!(e.get_animation_index(2, 3, false).map(|r| r.index), Some(1));
        assert_eq!(e.get_animation_index(2, 3, true).map(|r| r.index), Some(2));
    }

    #[test]
    fn missing_actions_fall_back_to_idle() {
        let desc = ModelDescription::default();
        let e = entity(&desc, &[(1, 1), (1, 4)]);

        let r = e.get_animation_index(3, 4, false).unwrap();
        assert_eq!((r.index, r.anim1, r.anim2), (1, 1, 4));
        let r = e.get_animation_index(3, 9, false).unwrap();
        assert_eq!((r.index, r.anim1, r.anim2), (0, 1, 1));

        let empty = entity(&desc, &[]);
        assert!(empty.get_animation_index(3, 9, false).is_none());
    }
}
