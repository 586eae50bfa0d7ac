//! Per-frame pass: playback advance, bone matrices, draw submission and
//! frame-space queries.
//!
//! Frame-space coordinates are draw-size pixels, top-down, with the origin
//! at the top-left corner of the model's frame. The model stands on
//! [`FrameProjection::anchor`](crate::scene::FrameProjection::anchor).

use glam::{IVec2, Mat4, Vec2, Vec3};
use smallvec::SmallVec;

use crate::model::combine::collect_poses;
use crate::model::instance::ModelInstance;
use crate::model::manager::ModelManager;
use crate::renderer::{DrawBatch, Renderer};
use crate::scene::hierarchy::BoneIndex;
use crate::scene::pose::BonePose;
use crate::settings::FRAME_SCALE;
use crate::utils::interner;

/// Frame-space rectangle around every bone of an instance tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BonesBorder {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl ModelInstance {
    /// Advances playback by `elapsed` seconds and recomputes bone matrices
    /// of this instance and its children.
    ///
    /// A root places itself at frame position `x`, `y` scaled by `scale`;
    /// children inherit their placement from the parent bone.
    pub(crate) fn process_animation(
        &mut self,
        elapsed: f32,
        x: i32,
        y: i32,
        scale: f32,
        global_speed: f32,
        parent_pose: Option<&BonePose>,
    ) {
        if self.parent_bone.is_none() {
            let position = self.projection.unproject(x, y);
            self.parent_matrix = Mat4::from_translation(position)
                * self.mat_trans_base
                * self.mat_rot
                * Mat4::from_rotation_y(self.dir_angle.to_radians())
                * self.mat_rot_base
                * Mat4::from_scale(Vec3::splat(scale))
                * self.mat_scale
                * self.mat_scale_base;
            self.ground_pos = self.parent_matrix.w_axis.truncate();
        }

        let speed = self.speed(global_speed);
        let track = self.current_track;
        let mut crossed = None;
        if let Some(controller) = self.controller.as_mut() {
            let prev = controller.track_position(track);
            controller.advance_time(elapsed * speed, &mut self.pose);
            let position = controller.track_position(track);

            if self.anim_pos_period > 0.0 {
                self.anim_pos_proc = (position / self.anim_pos_period).rem_euclid(1.0);
                self.anim_pos_time = position.rem_euclid(self.anim_pos_period);
                crossed = Some((prev, position));
            }
        }

        let hierarchy = &self.entity.hierarchy;
        hierarchy.update_frame_matrices(hierarchy.root(), &self.parent_matrix, &mut self.pose);

        if let Some(parent_pose) = parent_pose {
            for &(parent_bone, own_bone) in &self.link_bones {
                if let Some(slot) = self.pose.combined.get_mut(own_bone.index()) {
                    *slot = parent_pose.combined(parent_bone);
                }
            }
        }

        let ground_pos = self.ground_pos;
        for child in &mut self.children {
            let bone = child.parent_bone.unwrap_or(BoneIndex::ROOT);
            child.ground_pos = ground_pos;
            child.parent_matrix =
                self.pose.combined(bone) * child.mat_trans_base * child.mat_rot_base * child.mat_scale_base;
            child.process_animation(elapsed, x, y, 1.0, global_speed, Some(&self.pose));
        }

        if let Some((prev, position)) = crossed {
            self.fire_callbacks(prev, position);
        }
    }

    fn fire_callbacks(&mut self, prev: f32, position: f32) {
        if position <= prev {
            return;
        }
        let period = self.anim_pos_period;
        let (anim1, anim2) = (self.anim1(), self.anim2());
        let cycle_start = (prev / period).floor() * period;

        for entry in &mut self.callbacks {
            if (entry.anim1 != 0 && entry.anim1 != anim1) || (entry.anim2 != 0 && entry.anim2 != anim2) {
                continue;
            }
            let fire_time = cycle_start + entry.normalized_time * period;
            if (prev < fire_time && position >= fire_time)
                || (prev < fire_time + period && position >= fire_time + period)
            {
                (entry.callback)();
            }
        }
    }

    /// Advances playback from the manager clock and submits every batch.
    ///
    /// With a stepped frame rate the clock moves in whole frame steps and
    /// the remainder is carried to the next draw.
    pub fn draw(&mut self, mgr: &ModelManager, renderer: &mut dyn Renderer) {
        let tick = self.tick(mgr);
        let elapsed_ms = self.last_draw_tick.map_or(0, |last| tick.saturating_sub(last));
        self.last_draw_tick = Some(tick);

        let delay = self.settings.anim_delay();
        let elapsed_ms = if delay > 0 {
            self.pending_elapsed += elapsed_ms;
            let step = self.pending_elapsed / delay * delay;
            self.pending_elapsed -= step;
            step
        } else {
            elapsed_ms
        };

        let anchor = self.projection.anchor();
        self.process_animation(
            elapsed_ms as f32 / 1000.0,
            anchor.x,
            anchor.y,
            FRAME_SCALE as f32,
            mgr.global_speed_adjust(),
            None,
        );
        self.force_redraw = false;
        self.drawn_scene = Some(mgr.scene());

        let size = self.combined_meshes_size;
        let mut poses: SmallVec<[&BonePose; 8]> = SmallVec::new();
        collect_poses(&self.pose, &self.children, &mut poses);
        for mesh in &mut self.combined_meshes[..size] {
            mesh.update_bone_matrices(&poses);
        }

        let shadow_disabled = self.entity.shadow_disabled;
        for mesh in &self.combined_meshes[..size] {
            renderer.draw_batch(&DrawBatch {
                vertices: &mesh.vertices,
                indices: &mesh.indices,
                textures: &mesh.textures,
                effect: mesh.effect,
                bone_matrices: &mesh.bone_matrices,
                projection: &self.projection.projection,
                ground_pos: self.ground_pos,
                light_color: mgr.light_color(),
                anim_normalized_time: self.anim_pos_proc,
                anim_absolute_time: self.anim_pos_time,
                shadow_disabled,
            });
        }
    }

    /// Whether the next [`draw`](Self::draw) would show a new frame.
    #[must_use]
    pub fn need_draw(&self, mgr: &ModelManager) -> bool {
        if self.force_redraw {
            return true;
        }
        if self.combined_meshes_size == 0 {
            return false;
        }
        match self.last_draw_tick {
            None => true,
            Some(last) => {
                let delay = self.settings.anim_delay();
                delay == 0 || self.pending_elapsed + self.tick(mgr).saturating_sub(last) >= delay
            }
        }
    }

    /// Whether the instance was drawn since the last `begin_scene`.
    #[must_use]
    pub fn was_drawn(&self, mgr: &ModelManager) -> bool {
        self.drawn_scene == Some(mgr.scene())
    }

    /// Hit test against the skinned triangles of the last draw.
    ///
    /// Always `false` before the first draw.
    #[must_use]
    pub fn is_intersect(&self, x: i32, y: i32) -> bool {
        if self.drawn_scene.is_none() {
            return false;
        }
        let point = Vec2::new(x as f32, y as f32);
        self.combined_meshes().iter().any(|mesh| {
            let projected: Vec<Vec2> = mesh
                .vertices
                .iter()
                .map(|v| self.projection.project_f(mesh.skinned_position(v)))
                .collect();
            mesh.indices.chunks_exact(3).any(|tri| {
                let corner = |i: u16| projected.get(usize::from(i)).copied();
                match (corner(tri[0]), corner(tri[1]), corner(tri[2])) {
                    (Some(a), Some(b), Some(c)) => point_in_triangle(point, a, b, c),
                    _ => false,
                }
            })
        })
    }

    /// Frame-space rectangle around all bones, children included.
    #[must_use]
    pub fn bones_border(&self) -> Option<BonesBorder> {
        let mut poses: SmallVec<[&BonePose; 8]> = SmallVec::new();
        collect_poses(&self.pose, &self.children, &mut poses);

        let mut points = poses
            .iter()
            .flat_map(|pose| pose.combined.iter())
            .map(|m| self.projection.project(m.w_axis.truncate()));
        let first = points.next()?;
        let (min, max) = points.fold((first, first), |(min, max), p| (min.min(p), max.max(p)));

        Some(BonesBorder {
            left: min.x - 1,
            top: min.y - 1,
            right: max.x + 2,
            bottom: max.y + 2,
        })
    }

    /// World position of the point under the model.
    #[must_use]
    pub fn ground_pos(&self) -> Vec3 {
        self.ground_pos
    }

    /// Frame-space position of the point under the model.
    #[must_use]
    pub fn ground_screen_pos(&self) -> IVec2 {
        self.projection.project(self.ground_pos)
    }

    /// Combined matrix of the first bone named `name`, searching this
    /// instance and then its children.
    #[must_use]
    pub fn find_bone(&self, name: &str) -> Option<Mat4> {
        let name = interner::get(name)?;
        self.find_bone_hash(name)
    }

    fn find_bone_hash(&self, name: interner::NameHash) -> Option<Mat4> {
        if let Some(bone) = self.entity.hierarchy.find(name) {
            return Some(self.pose.combined(bone));
        }
        self.children.iter().find_map(|child| child.find_bone_hash(name))
    }

    /// Bone position in frame space, relative to the anchor.
    #[must_use]
    pub fn bone_pos(&self, name: &str) -> Option<IVec2> {
        let matrix = self.find_bone(name)?;
        Some(self.projection.project(matrix.w_axis.truncate()) - self.projection.anchor())
    }
}

fn point_in_triangle(p: Vec2, a: Vec2, b: Vec2, c: Vec2) -> bool {
    let edge = |from: Vec2, to: Vec2| (to - from).perp_dot(p - from);
    let (d1, d2, d3) = (edge(a, b), edge(b, c), edge(c, a));
    let has_neg = d1 < 0.0 || d2 < 0.0 || d3 < 0.0;
    let has_pos = d1 > 0.0 || d2 > 0.0 || d3 > 0.0;
    !(has_neg && has_pos)
}
