//! Layer link resolution.
//!
//! Applies the records of the layer link table that match the current layer
//! values: transform and speed deltas, disabled layers and meshes, texture
//! and effect overrides, and child model attachments.

use std::sync::Arc;

use glam::{Mat4, Vec3};
use smallvec::SmallVec;

use crate::model::instance::{MeshInstance, ModelInstance};
use crate::model::manager::ModelManager;
use crate::model::params::{AnimParams, LAYERS3D_COUNT, LayerValues, OverrideSource};
use crate::scene::hierarchy::BoneIndex;
use crate::utils::interner;

impl ModelInstance {
    /// Rebuilds the appearance for `layers`. Returns `true` when the mesh
    /// topology changed: a child was attached or dropped, or a mesh changed
    /// its enabled state, textures or effect.
    pub(crate) fn apply_layers(
        &mut self,
        mgr: &mut ModelManager,
        layers: &LayerValues,
        parent_meshes: Option<&[MeshInstance]>,
        fast_bones: &mut SmallVec<[BoneIndex; 4]>,
    ) -> bool {
        let entity = Arc::clone(&self.entity);
        let mut mesh_changed = false;

        let disabled_before: SmallVec<[bool; 16]> = self.all_meshes.iter().map(|m| m.disabled).collect();

        self.set_anim_data(mgr, &entity.anim_data_default, true, parent_meshes);
        let own_link = self.parent_bone.map(|_| self.anim_link.clone());
        if let Some(link) = &own_link {
            self.set_anim_data(mgr, link, false, parent_meshes);
        }

        for child in &mut self.children {
            child.child_checker = false;
        }

        // Disabled layers and meshes
        let mut unused_layers = [false; LAYERS3D_COUNT];
        let disablers = entity
            .anim_data
            .iter()
            .filter(|link| !link.is_attachment() && applies(link, layers))
            .chain(own_link.iter());
        for link in disablers {
            for &layer in &link.disabled_layers {
                unused_layers[layer] = true;
            }
            for mesh in &mut self.all_meshes {
                if link.disables_mesh(mesh.owner_name) {
                    mesh.disabled = true;
                }
            }
        }

        for (layer, &value) in layers.iter().enumerate() {
            if value == 0 || unused_layers[layer] {
                continue;
            }
            for link in entity.anim_data.iter().filter(|link| link.matches(layer, value)) {
                match &link.child_name {
                    None => self.set_anim_data(mgr, link, false, parent_meshes),
                    Some(child_name) => {
                        if self.attach_child(mgr, link, child_name, fast_bones) {
                            mesh_changed = true;
                        }
                    }
                }
            }
        }

        let children_before = self.children.len();
        self.children.retain(|child| child.child_checker);
        if self.children.len() != children_before {
            mesh_changed = true;
        }

        mesh_changed
            || self.all_meshes.iter().any(|m| m.cur_effect != m.last_effect)
            || self.all_meshes.iter().any(|m| m.cur_textures != m.last_textures)
            || self
                .all_meshes
                .iter()
                .zip(&disabled_before)
                .any(|(m, &before)| m.disabled != before)
    }

    /// Keeps an already attached child for `link` or creates a new one.
    /// Returns `true` when a child was created.
    fn attach_child(
        &mut self,
        mgr: &mut ModelManager,
        link: &AnimParams,
        child_name: &str,
        fast_bones: &mut SmallVec<[BoneIndex; 4]>,
    ) -> bool {
        if let Some(existing) = self.children.iter_mut().find(|c| c.anim_link.id == link.id) {
            existing.child_checker = true;
            return false;
        }

        let entity = Arc::clone(&self.entity);
        let hierarchy = &entity.hierarchy;
        let parent_bone = match link.link_bone {
            Some(bone_name) => match hierarchy.find(bone_name) {
                Some(bone) => bone,
                None => {
                    log::warn!(
                        "Model '{}': link bone '{}' not found, '{child_name}' not attached",
                        entity.file_name,
                        interner::resolve(bone_name)
                    );
                    return false;
                }
            },
            None => hierarchy.root(),
        };

        let Some(mut child) = mgr.create_model(child_name) else {
            log::warn!("Model '{}': unable to attach '{child_name}'", entity.file_name);
            return false;
        };

        if link.link_bone.is_none() {
            let child_hierarchy = Arc::clone(&child.entity.hierarchy);
            let mut skinned: SmallVec<[BoneIndex; 16]> = child_hierarchy
                .meshes()
                .iter()
                .flat_map(|mesh| mesh.skin_bones.iter().copied())
                .collect();
            skinned.sort_unstable_by_key(|bone| bone.index());
            skinned.dedup();
            child.link_bones = skinned
                .into_iter()
                .filter_map(|child_bone| {
                    hierarchy
                        .find(child_hierarchy.bone(child_bone).name)
                        .map(|own| (own, child_bone))
                })
                .collect();
        }

        child.parent_bone = Some(parent_bone);
        child.anim_link = link.clone();
        child.set_anim_data(mgr, link, false, Some(&self.all_meshes));

        if let Some(bone_name) = link.link_bone
            && entity.fast_transition_bones.contains(&bone_name)
        {
            fast_bones.push(parent_bone);
        }

        log::debug!("Model '{}': attached '{child_name}'", entity.file_name);
        self.children.push(child);
        true
    }

    /// Applies one link record to this instance.
    ///
    /// With `clear` the base transform, link speed, enabled flags, textures
    /// and effects are first reset to their defaults; the previous textures
    /// and effects are kept for change detection.
    pub(crate) fn set_anim_data(
        &mut self,
        mgr: &mut ModelManager,
        data: &AnimParams,
        clear: bool,
        parent_meshes: Option<&[MeshInstance]>,
    ) {
        if clear {
            self.mat_scale_base = Mat4::IDENTITY;
            self.mat_rot_base = Mat4::IDENTITY;
            self.mat_trans_base = Mat4::IDENTITY;
            self.speed_adjust_link = 1.0;
        }

        for (axis, &value) in data.scale.to_array().iter().enumerate() {
            if value != 0.0 {
                let mut scale = Vec3::ONE;
                scale[axis] = value;
                self.mat_scale_base *= Mat4::from_scale(scale);
            }
        }
        if data.rotate.x != 0.0 {
            self.mat_rot_base *= Mat4::from_rotation_x(-data.rotate.x.to_radians());
        }
        if data.rotate.y != 0.0 {
            self.mat_rot_base *= Mat4::from_rotation_y(data.rotate.y.to_radians());
        }
        if data.rotate.z != 0.0 {
            self.mat_rot_base *= Mat4::from_rotation_z(data.rotate.z.to_radians());
        }
        let translate = data.translate * Vec3::new(1.0, 1.0, -1.0);
        if translate != Vec3::ZERO {
            self.mat_trans_base *= Mat4::from_translation(translate);
        }

        if data.speed_adjust != 0.0 {
            self.speed_adjust_link *= data.speed_adjust;
        }

        if clear {
            for mesh in &mut self.all_meshes {
                mesh.disabled = false;
                mesh.last_textures = std::mem::replace(&mut mesh.cur_textures, mesh.default_textures.clone());
                mesh.last_effect = std::mem::replace(&mut mesh.cur_effect, mesh.default_effect);
            }
        }

        let model_path = self.entity.hierarchy.file_name.clone();
        for texture in &data.textures {
            let resolved = match &texture.source {
                OverrideSource::Parent(selector) => parent_meshes
                    .and_then(|meshes| meshes.iter().find(|m| interner::selects(*selector, m.owner_name)))
                    .and_then(|m| m.cur_textures[texture.slot].clone()),
                OverrideSource::Named(name) => mgr.load_texture(name, &model_path),
            };
            for mesh in &mut self.all_meshes {
                if interner::selects(texture.mesh, mesh.owner_name) {
                    mesh.cur_textures[texture.slot].clone_from(&resolved);
                }
            }
        }

        for effect in &data.effects {
            let resolved = match &effect.source {
                OverrideSource::Parent(selector) => parent_meshes
                    .and_then(|meshes| meshes.iter().find(|m| interner::selects(*selector, m.owner_name)))
                    .and_then(|m| m.cur_effect),
                OverrideSource::Named(name) => mgr.load_effect(name, &model_path),
            };
            for mesh in &mut self.all_meshes {
                if interner::selects(effect.mesh, mesh.owner_name) {
                    mesh.cur_effect = resolved;
                }
            }
        }
    }
}

fn applies(link: &AnimParams, layers: &LayerValues) -> bool {
    layers.get(link.layer).is_some_and(|&value| link.matches(link.layer, value))
}
