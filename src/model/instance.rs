use std::sync::Arc;

use glam::{Mat4, Vec3};
use smallvec::SmallVec;

use crate::animation::controller::{AnimationController, AnimationSet, TRACK_COUNT};
use crate::model::combine::CombinedMesh;
use crate::model::entity::{ModelEntity, RenderFrames};
use crate::model::flags::AnimationFlags;
use crate::model::manager::ModelManager;
use crate::model::params::{AnimParams, LAYERS3D_COUNT, LayerValues, pack_anim};
use crate::resources::texture::{EffectHandle, TextureSet, empty_texture_set};
use crate::scene::hierarchy::BoneIndex;
use crate::scene::pose::BonePose;
use crate::scene::projection::FrameProjection;
use crate::settings::ModelSettings;
use crate::utils::interner::NameHash;

/// Per-instance state of one mesh of the hierarchy.
#[derive(Debug, Clone)]
pub struct MeshInstance {
    pub bone: BoneIndex,
    /// Index into the hierarchy's meshes.
    pub mesh: usize,
    pub owner_name: NameHash,
    pub disabled: bool,
    pub cur_textures: TextureSet,
    pub last_textures: TextureSet,
    pub default_textures: TextureSet,
    pub cur_effect: Option<EffectHandle>,
    pub last_effect: Option<EffectHandle>,
    pub default_effect: Option<EffectHandle>,
}

/// Callback fired when playback crosses a point of the current clip.
pub struct AnimationCallback {
    /// `0` matches any weapon group.
    pub anim1: u32,
    /// `0` matches any action.
    pub anim2: u32,
    /// Point inside the clip, `0..1`.
    pub normalized_time: f32,
    pub callback: Box<dyn FnMut()>,
}

impl std::fmt::Debug for AnimationCallback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnimationCallback")
            .field("anim1", &self.anim1)
            .field("anim2", &self.anim2)
            .field("normalized_time", &self.normalized_time)
            .finish_non_exhaustive()
    }
}

/// A live, animated model.
///
/// Owns its bone pose, playback state, attached children and the combined
/// meshes built from the enabled meshes of itself and every descendant.
/// Shared data (hierarchy, clips, link tables) lives in [`ModelEntity`].
#[derive(Debug)]
pub struct ModelInstance {
    pub(crate) entity: Arc<ModelEntity>,
    pub(crate) settings: Arc<ModelSettings>,
    pub(crate) pose: BonePose,
    pub(crate) controller: Option<AnimationController>,
    pub(crate) current_layers: [i32; LAYERS3D_COUNT + 1],
    pub(crate) all_meshes: Vec<MeshInstance>,
    pub(crate) children: Vec<ModelInstance>,

    // Attachment
    pub(crate) anim_link: AnimParams,
    pub(crate) parent_bone: Option<BoneIndex>,
    /// `(parent bone, own bone)` pairs copied every frame.
    pub(crate) link_bones: Vec<(BoneIndex, BoneIndex)>,
    pub(crate) child_checker: bool,

    // Playback
    pub(crate) current_track: usize,
    end_tick: u32,
    pub(crate) last_draw_tick: Option<u32>,
    pub(crate) pending_elapsed: u32,
    speed_adjust_base: f32,
    speed_adjust_cur: f32,
    pub(crate) speed_adjust_link: f32,
    pub(crate) anim_pos_proc: f32,
    pub(crate) anim_pos_time: f32,
    pub(crate) anim_pos_period: f32,
    cur_anim1: u32,
    cur_anim2: u32,
    use_game_timer: bool,
    pub(crate) callbacks: Vec<AnimationCallback>,

    // Transform
    pub(crate) mat_scale_base: Mat4,
    pub(crate) mat_rot_base: Mat4,
    pub(crate) mat_trans_base: Mat4,
    pub(crate) mat_scale: Mat4,
    pub(crate) mat_rot: Mat4,
    pub(crate) dir_angle: f32,
    /// Facing requested while `NO_ROTATE` holds the current one.
    deferred_dir_angle: f32,
    no_rotate: bool,
    pub(crate) parent_matrix: Mat4,
    pub(crate) ground_pos: Vec3,
    pub(crate) projection: FrameProjection,

    // Drawing
    pub(crate) combined_meshes: Vec<CombinedMesh>,
    pub(crate) combined_meshes_size: usize,
    pub(crate) allow_mesh_generation: bool,
    pub(crate) force_redraw: bool,
    pub(crate) drawn_scene: Option<u64>,
}

impl ModelInstance {
    /// Creates an instance in bind pose with default textures and effects.
    ///
    /// The caller is expected to run an `INIT` [`set_animation`](Self::set_animation)
    /// before drawing; [`ModelManager::create_model`] does.
    pub(crate) fn new(entity: Arc<ModelEntity>, mgr: &mut ModelManager) -> Self {
        let hierarchy = Arc::clone(&entity.hierarchy);
        let settings = mgr.settings_arc();

        let mut all_meshes = Vec::with_capacity(hierarchy.draw_bones().len());
        for &bone in hierarchy.draw_bones() {
            let Some(mesh_index) = hierarchy.bone(bone).mesh else {
                continue;
            };
            let data = &hierarchy.meshes()[mesh_index];
            let mut default_textures = empty_texture_set();
            default_textures[0] = mgr.load_texture(&data.diffuse_texture, &hierarchy.file_name);
            let default_effect = mgr.load_effect(&data.effect_name, &hierarchy.file_name);

            all_meshes.push(MeshInstance {
                bone,
                mesh: mesh_index,
                owner_name: data.owner_name,
                disabled: false,
                cur_textures: default_textures.clone(),
                last_textures: default_textures.clone(),
                default_textures,
                cur_effect: default_effect,
                last_effect: default_effect,
                default_effect,
            });
        }

        let controller = (!entity.animation_sets.is_empty()).then(|| {
            let mut controller = AnimationController::new(Arc::clone(&entity.animation_sets), &hierarchy);
            controller.set_interpolation(entity.interpolation);
            controller
        });

        let projection = FrameProjection::new(entity.draw_width, entity.draw_height, 1.0, &settings);

        Self {
            pose: BonePose::from_hierarchy(&hierarchy),
            controller,
            current_layers: [0; LAYERS3D_COUNT + 1],
            all_meshes,
            children: Vec::new(),
            anim_link: AnimParams::default(),
            parent_bone: None,
            link_bones: Vec::new(),
            child_checker: true,
            current_track: 0,
            end_tick: 0,
            last_draw_tick: None,
            pending_elapsed: 0,
            speed_adjust_base: 1.0,
            speed_adjust_cur: 1.0,
            speed_adjust_link: 1.0,
            anim_pos_proc: 0.0,
            anim_pos_time: 0.0,
            anim_pos_period: 0.0,
            cur_anim1: 0,
            cur_anim2: 0,
            use_game_timer: true,
            callbacks: Vec::new(),
            mat_scale_base: Mat4::IDENTITY,
            mat_rot_base: Mat4::IDENTITY,
            mat_trans_base: Mat4::IDENTITY,
            mat_scale: Mat4::IDENTITY,
            mat_rot: Mat4::IDENTITY,
            dir_angle: settings.default_dir_angle(),
            deferred_dir_angle: settings.default_dir_angle(),
            no_rotate: false,
            parent_matrix: Mat4::IDENTITY,
            ground_pos: Vec3::ZERO,
            projection,
            combined_meshes: Vec::new(),
            combined_meshes_size: 0,
            allow_mesh_generation: false,
            force_redraw: true,
            drawn_scene: None,
            entity,
            settings,
        }
    }

    /// Switches the action and the layer state.
    ///
    /// `layers` replaces the whole layer vector; `None` keeps the current
    /// one. Returns `true` when the mesh topology of this instance or any
    /// descendant changed, in which case a root instance has already rebuilt
    /// its combined meshes.
    pub fn set_animation(
        &mut self,
        mgr: &mut ModelManager,
        anim1: u32,
        anim2: u32,
        layers: Option<&LayerValues>,
        flags: AnimationFlags,
    ) -> bool {
        self.set_animation_inner(mgr, anim1, anim2, layers, flags, None)
    }

    pub(crate) fn set_animation_inner(
        &mut self,
        mgr: &mut ModelManager,
        anim1: u32,
        anim2: u32,
        layers: Option<&LayerValues>,
        flags: AnimationFlags,
        parent_meshes: Option<&[MeshInstance]>,
    ) -> bool {
        self.cur_anim1 = anim1;
        self.cur_anim2 = anim2;

        let no_rotate = flags.contains(AnimationFlags::NO_ROTATE);
        if no_rotate != self.no_rotate {
            self.no_rotate = no_rotate;
            if no_rotate {
                self.deferred_dir_angle = self.dir_angle;
            } else {
                self.dir_angle = self.deferred_dir_angle;
            }
        }

        let entity = Arc::clone(&self.entity);
        let anim_pair = pack_anim(anim1, anim2);

        let mut speed = 1.0;
        let mut period_proc = 0.0;
        let index = if flags.contains(AnimationFlags::INIT) {
            Some(0)
        } else if anim1 == 0 {
            period_proc = anim2 as f32 / 10.0;
            Some(entity.render_anim)
        } else {
            entity.get_animation_index(anim1, anim2, false).map(|found| {
                speed = found.speed;
                found.index
            })
        };
        if let Some(percent) = flags.period_percent() {
            period_proc = percent;
        }
        let period_proc = period_proc.clamp(0.0, 99.9);

        let mut new_layers: LayerValues = match layers {
            Some(layers) => *layers,
            None => {
                let mut current = [0; LAYERS3D_COUNT];
                current.copy_from_slice(&self.current_layers[..LAYERS3D_COUNT]);
                current
            }
        };
        for &(layer, value) in entity.anim_layer_values(anim_pair) {
            new_layers[layer] = value;
        }

        let layer_changed =
            flags.contains(AnimationFlags::INIT) || new_layers[..] != self.current_layers[..LAYERS3D_COUNT];
        if !flags.intersects(AnimationFlags::INIT | AnimationFlags::ONE_TIME)
            && self.current_layers[LAYERS3D_COUNT] == anim_pair as i32
            && !layer_changed
        {
            return false;
        }

        self.current_layers[..LAYERS3D_COUNT].copy_from_slice(&new_layers);
        self.current_layers[LAYERS3D_COUNT] = anim_pair as i32;

        let mut mesh_changed = false;
        let mut fast_bones: SmallVec<[BoneIndex; 4]> = SmallVec::new();
        if layer_changed {
            mesh_changed = self.apply_layers(mgr, &new_layers, parent_meshes, &mut fast_bones);
        }

        if let Some(index) = index {
            self.start_playback(mgr, index, speed, period_proc, flags, &fast_bones);
        }

        let meshes = &self.all_meshes;
        for child in &mut self.children {
            if child.set_animation_inner(mgr, anim1, anim2, layers, flags, Some(meshes)) {
                mesh_changed = true;
            }
        }

        if self.parent_bone.is_none() && mesh_changed {
            self.generate_combined_meshes();
        }
        mesh_changed
    }

    fn start_playback(
        &mut self,
        mgr: &ModelManager,
        index: usize,
        speed: f32,
        period_proc: f32,
        flags: AnimationFlags,
        fast_bones: &[BoneIndex],
    ) {
        let smooth_time = if flags.intersects(AnimationFlags::NO_SMOOTH | AnimationFlags::STAY | AnimationFlags::INIT) {
            0.0001
        } else {
            self.settings.move_transition_time()
        };

        let Some(controller) = self.controller.as_mut() else {
            return;
        };
        let Some(duration) = controller.set(index).map(AnimationSet::duration) else {
            log::warn!("Model '{}': clip {index} does not exist", self.entity.file_name);
            return;
        };

        let cur_track = self.current_track;
        let new_track = (cur_track + 1) % TRACK_COUNT;

        let mut period = duration;
        self.anim_pos_period = period;
        if flags.contains(AnimationFlags::INIT) {
            period = 0.0002;
        }

        controller.set_track_set(new_track, index);
        if !fast_bones.is_empty() {
            controller.reset_bones_transition(new_track, fast_bones);
        }
        controller.reset();

        let start_time = period * period_proc / 100.0;
        if flags.contains(AnimationFlags::STAY) {
            period = start_time + 0.0002;
        }

        controller.add_event_enable(cur_track, false, smooth_time);
        controller.add_event_speed(cur_track, 0.0, 0.0, smooth_time);
        controller.add_event_weight(cur_track, 0.0, 0.0, smooth_time);

        controller.set_track_enable(new_track, true);
        controller.set_track_position(new_track, 0.0);
        controller.add_event_speed(new_track, 1.0, 0.0, smooth_time);
        if flags.intersects(AnimationFlags::ONE_TIME | AnimationFlags::STAY | AnimationFlags::INIT) {
            controller.add_event_speed(new_track, 0.0, period - 0.0001, 0.0);
        }
        controller.add_event_weight(new_track, 1.0, 0.0, smooth_time);

        controller.advance_time(if start_time != 0.0 { start_time } else { 0.0001 }, &mut self.pose);

        self.current_track = new_track;
        self.speed_adjust_cur = speed;

        self.end_tick = if flags.contains(AnimationFlags::ONE_TIME) {
            let duration_ms = period / self.speed(mgr.global_speed_adjust()) * 1000.0;
            // A stopped model never finishes
            let duration_ms = if duration_ms.is_finite() { duration_ms as u32 } else { u32::MAX };
            self.tick(mgr).saturating_add(duration_ms)
        } else {
            0
        };

        self.last_draw_tick = None;
        self.pending_elapsed = 0;
        self.force_redraw = true;
        log::trace!(
            "Model '{}': clip {index} on track {new_track}, period {period:.3}s",
            self.entity.file_name
        );
    }

    /// `true` until a `ONE_TIME` animation has run to its end.
    #[must_use]
    pub fn is_animation_playing(&self, mgr: &ModelManager) -> bool {
        self.tick(mgr) < self.end_tick
    }

    /// Effective playback speed multiplier.
    #[must_use]
    pub fn speed(&self, global_speed_adjust: f32) -> f32 {
        self.speed_adjust_cur * self.speed_adjust_base * self.speed_adjust_link * global_speed_adjust
    }

    pub(crate) fn tick(&self, mgr: &ModelManager) -> u32 {
        mgr.tick(self.use_game_timer)
    }

    /// Faces a map direction.
    pub fn set_dir(&mut self, dir: u8) {
        self.set_dir_angle(self.settings.dir_to_angle(dir));
    }

    /// Faces a screen angle in degrees.
    ///
    /// While the current animation runs with `NO_ROTATE` the facing is kept
    /// and applied once an animation without the flag starts.
    pub fn set_dir_angle(&mut self, angle: i32) {
        let angle = (180 - angle) as f32;
        if self.no_rotate {
            self.deferred_dir_angle = angle;
        } else {
            self.dir_angle = angle;
        }
    }

    /// Model-space facing in degrees, `180 - screen angle`.
    #[must_use]
    pub fn dir_angle(&self) -> f32 {
        self.dir_angle
    }

    /// User rotation in radians, applied outside the base rotation.
    pub fn set_rotation(&mut self, rx: f32, ry: f32, rz: f32) {
        self.mat_rot = Mat4::from_rotation_x(rx) * Mat4::from_rotation_y(ry) * Mat4::from_rotation_z(rz);
    }

    pub fn set_scale(&mut self, sx: f32, sy: f32, sz: f32) {
        self.mat_scale = Mat4::from_scale(Vec3::new(sx, sy, sz));
    }

    pub fn set_speed(&mut self, speed: f32) {
        self.speed_adjust_base = speed;
    }

    /// Chooses the game timeline (stops on pause) or the frame timeline.
    pub fn set_timer(&mut self, use_game_timer: bool) {
        self.use_game_timer = use_game_timer;
    }

    /// Registers a callback fired whenever playback of `anim1`/`anim2`
    /// crosses `normalized_time` of the clip.
    pub fn add_animation_callback(
        &mut self,
        anim1: u32,
        anim2: u32,
        normalized_time: f32,
        callback: impl FnMut() + 'static,
    ) {
        self.callbacks.push(AnimationCallback {
            anim1,
            anim2,
            normalized_time: normalized_time.clamp(0.0, 1.0),
            callback: Box::new(callback),
        });
    }

    #[inline]
    #[must_use]
    pub fn entity(&self) -> &Arc<ModelEntity> {
        &self.entity
    }

    #[inline]
    #[must_use]
    pub fn anim1(&self) -> u32 {
        self.cur_anim1
    }

    #[inline]
    #[must_use]
    pub fn anim2(&self) -> u32 {
        self.cur_anim2
    }

    /// Layer values followed by the packed last action.
    #[must_use]
    pub fn current_layers(&self) -> &[i32; LAYERS3D_COUNT + 1] {
        &self.current_layers
    }

    #[must_use]
    pub fn children(&self) -> &[ModelInstance] {
        &self.children
    }

    #[must_use]
    pub fn meshes(&self) -> &[MeshInstance] {
        &self.all_meshes
    }

    #[must_use]
    pub fn pose(&self) -> &BonePose {
        &self.pose
    }

    #[must_use]
    pub fn projection(&self) -> &FrameProjection {
        &self.projection
    }

    /// Attachment record of a child, `None` for a root instance.
    #[must_use]
    pub fn anim_link(&self) -> Option<&AnimParams> {
        self.parent_bone.map(|_| &self.anim_link)
    }

    #[must_use]
    pub fn parent_bone(&self) -> Option<BoneIndex> {
        self.parent_bone
    }

    /// Position inside the current clip, `0..1`.
    #[must_use]
    pub fn anim_pos_proc(&self) -> f32 {
        self.anim_pos_proc
    }

    /// Position inside the current clip, seconds.
    #[must_use]
    pub fn anim_pos_time(&self) -> f32 {
        self.anim_pos_time
    }

    /// Duration of the current clip in milliseconds.
    #[must_use]
    pub fn anim_duration(&self) -> u32 {
        (self.anim_pos_period * 1000.0) as u32
    }

    /// Playback clock of the animation controller, seconds.
    #[must_use]
    pub fn playback_time(&self) -> f32 {
        self.controller.as_ref().map_or(0.0, AnimationController::time)
    }

    #[must_use]
    pub fn render_frames_data(&self) -> RenderFrames {
        self.entity.render_frames()
    }
}
