//! Mesh combination.
//!
//! Enabled meshes of a root instance and all of its descendants are merged
//! into as few draw batches as possible. Meshes can share a batch when they
//! use the same effect, their textures do not clash and the batch stays
//! within the bone budget.

use glam::{Mat4, Vec3};
use smallvec::SmallVec;

use crate::model::instance::{MeshInstance, ModelInstance};
use crate::resources::mesh::{MeshData, Vertex3D};
use crate::resources::texture::{EffectHandle, TextureSet};
use crate::scene::hierarchy::BoneIndex;
use crate::scene::pose::BonePose;

/// Bone of a combined mesh: which instance (pre-order slot) and which bone
/// of that instance's hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SkinRef {
    pub instance: usize,
    pub bone: BoneIndex,
}

#[derive(Debug, Clone, Default)]
pub struct CombinedMesh {
    pub encapsulated_mesh_count: usize,
    pub vertices: Vec<Vertex3D>,
    pub indices: Vec<u16>,
    pub effect: Option<EffectHandle>,
    pub textures: TextureSet,
    pub skin_bones: Vec<SkinRef>,
    pub skin_bone_offsets: Vec<Mat4>,
    pub mesh_vertices: Vec<usize>,
    pub mesh_indices: Vec<usize>,
    pub mesh_anim_layers: Vec<usize>,
    /// Skinning matrices of the last draw.
    pub bone_matrices: Vec<Mat4>,
}

impl CombinedMesh {
    /// Empties the batch, keeping its allocations.
    pub fn clear(&mut self) {
        self.encapsulated_mesh_count = 0;
        self.vertices.clear();
        self.indices.clear();
        self.effect = None;
        for texture in &mut self.textures {
            *texture = None;
        }
        self.skin_bones.clear();
        self.skin_bone_offsets.clear();
        self.mesh_vertices.clear();
        self.mesh_indices.clear();
        self.mesh_anim_layers.clear();
        self.bone_matrices.clear();
    }

    #[must_use]
    pub fn can_batch(&self, mesh: &MeshInstance, data: &MeshData, max_bones: usize) -> bool {
        if self.encapsulated_mesh_count == 0 {
            return true;
        }
        if self.effect != mesh.cur_effect {
            return false;
        }
        let clash = self
            .textures
            .iter()
            .zip(&mesh.cur_textures)
            .any(|(ours, theirs)| matches!((ours, theirs), (Some(a), Some(b)) if !a.same_backing(b)));
        if clash {
            return false;
        }
        self.skin_bones.len() + data.bone_count() <= max_bones
            && self.vertices.len() + data.vertices.len() <= usize::from(u16::MAX) + 1
    }

    /// Appends a mesh owned by the instance in pre-order `slot`.
    pub fn batch(&mut self, slot: usize, mesh: &MeshInstance, data: &MeshData, anim_layer: usize) {
        let vertex_offset = self.vertices.len();
        let bone_offset = self.skin_bones.len() as f32;
        let atlas = mesh.cur_textures[0].as_deref();

        self.vertices.extend(data.vertices.iter().map(|vertex| {
            let mut vertex = *vertex;
            for index in &mut vertex.blend_indices {
                *index += bone_offset;
            }
            if let Some(texture) = atlas {
                vertex.tex_coord = texture.remap_uv(vertex.tex_coord);
            }
            vertex
        }));
        self.indices
            .extend(data.indices.iter().map(|&i| (usize::from(i) + vertex_offset) as u16));

        self.skin_bones
            .extend(data.skin_bones.iter().map(|&bone| SkinRef { instance: slot, bone }));
        self.skin_bone_offsets.extend_from_slice(&data.skin_bone_offsets);

        if self.encapsulated_mesh_count == 0 {
            self.effect = mesh.cur_effect;
        }
        for (ours, theirs) in self.textures.iter_mut().zip(&mesh.cur_textures) {
            if ours.is_none() {
                ours.clone_from(theirs);
            }
        }

        self.mesh_vertices.push(data.vertices.len());
        self.mesh_indices.push(data.indices.len());
        self.mesh_anim_layers.push(anim_layer);
        self.encapsulated_mesh_count += 1;
    }

    /// `combined * offset` for every skin bone, against pre-order poses.
    pub fn update_bone_matrices(&mut self, poses: &[&BonePose]) {
        self.bone_matrices.clear();
        self.bone_matrices.extend(
            self.skin_bones
                .iter()
                .zip(&self.skin_bone_offsets)
                .map(|(skin, offset)| {
                    poses
                        .get(skin.instance)
                        .map_or(Mat4::IDENTITY, |pose| pose.combined(skin.bone))
                        * *offset
                }),
        );
    }

    /// World position of a vertex under the last computed bone matrices.
    #[must_use]
    pub fn skinned_position(&self, vertex: &Vertex3D) -> Vec3 {
        let mut position = Vec3::ZERO;
        let mut total = 0.0;
        for (&index, &weight) in vertex.blend_indices.iter().zip(&vertex.blend_weights) {
            if weight <= 0.0 {
                continue;
            }
            if let Some(matrix) = self.bone_matrices.get(index as usize) {
                position += matrix.transform_point3(vertex.position) * weight;
                total += weight;
            }
        }
        if total > 0.0 { position } else { vertex.position }
    }
}

impl ModelInstance {
    /// Rebuilds the combined meshes of this instance tree.
    ///
    /// Does nothing until [`start_mesh_generation`](Self::start_mesh_generation).
    pub fn generate_combined_meshes(&mut self) {
        if !self.allow_mesh_generation {
            return;
        }

        let mut combined = std::mem::take(&mut self.combined_meshes);
        for mesh in &mut combined {
            mesh.clear();
        }

        let mut size = 0;
        let mut slot = 0;
        let max_bones = self.settings.max_bones;
        self.fill_combined_meshes(&mut combined, &mut size, &mut slot, max_bones);

        self.combined_meshes = combined;
        self.combined_meshes_size = size;
        self.force_redraw = true;
        log::debug!(
            "Model '{}': {} meshes in {size} batches",
            self.entity.file_name,
            self.combined_meshes[..size]
                .iter()
                .map(|m| m.encapsulated_mesh_count)
                .sum::<usize>()
        );
    }

    /// Allows mesh combination and builds the batches once.
    pub fn start_mesh_generation(&mut self) {
        if !self.allow_mesh_generation {
            self.allow_mesh_generation = true;
            self.generate_combined_meshes();
        }
    }

    /// Batches that are currently valid.
    #[must_use]
    pub fn combined_meshes(&self) -> &[CombinedMesh] {
        &self.combined_meshes[..self.combined_meshes_size]
    }

    fn fill_combined_meshes(&self, combined: &mut Vec<CombinedMesh>, size: &mut usize, slot: &mut usize, max_bones: usize) {
        let own_slot = *slot;
        *slot += 1;

        let anim_layer = if self.parent_bone.is_some() { self.anim_link.layer } else { 0 };
        let meshes = self.entity.hierarchy.meshes();
        for mesh in self.all_meshes.iter().filter(|m| !m.disabled) {
            let Some(data) = meshes.get(mesh.mesh) else {
                continue;
            };
            combine_mesh(combined, size, own_slot, mesh, data, anim_layer, max_bones);
        }

        for child in &self.children {
            child.fill_combined_meshes(combined, size, slot, max_bones);
        }
    }
}

fn combine_mesh(
    combined: &mut Vec<CombinedMesh>,
    size: &mut usize,
    slot: usize,
    mesh: &MeshInstance,
    data: &MeshData,
    anim_layer: usize,
    max_bones: usize,
) {
    if let Some(target) = combined[..*size]
        .iter_mut()
        .find(|c| c.can_batch(mesh, data, max_bones))
    {
        target.batch(slot, mesh, data, anim_layer);
        return;
    }

    if *size == combined.len() {
        combined.push(CombinedMesh::default());
    }
    combined[*size].batch(slot, mesh, data, anim_layer);
    *size += 1;
}

/// Poses of an instance tree in the pre-order used for batch slots.
pub(crate) fn collect_poses<'a>(
    pose: &'a BonePose,
    children: &'a [ModelInstance],
    out: &mut SmallVec<[&'a BonePose; 8]>,
) {
    out.push(pose);
    for child in children {
        collect_poses(&child.pose, &child.children, out);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use glam::Vec2;

    use super::*;
    use crate::resources::texture::{MeshTexture, TextureHandle, empty_texture_set};
    use crate::utils::interner::intern;

    fn mesh_data(bones: usize) -> MeshData {
        MeshData {
            owner: BoneIndex::ROOT,
            owner_name: intern("Body"),
            vertices: vec![Vertex3D::rigid(Vec3::ZERO, Vec3::Y, Vec2::new(0.5, 0.5)); 3],
            indices: vec![0, 1, 2],
            diffuse_texture: String::new(),
            effect_name: String::new(),
            skin_bones: vec![BoneIndex::ROOT; bones],
            skin_bone_offsets: vec![Mat4::IDENTITY; bones],
        }
    }

    fn mesh_instance(texture: Option<u64>) -> MeshInstance {
        let mut textures = empty_texture_set();
        textures[0] = texture.map(|h| {
            Arc::new(MeshTexture::new(intern("t"), TextureHandle(h)).with_atlas_offset([0.5, 0.0, 0.5, 0.5]))
        });
        MeshInstance {
            bone: BoneIndex::ROOT,
            mesh: 0,
            owner_name: intern("Body"),
            disabled: false,
            cur_textures: textures.clone(),
            last_textures: textures.clone(),
            default_textures: textures,
            cur_effect: None,
            last_effect: None,
            default_effect: None,
        }
    }

    #[test]
    fn batch_offsets_indices_and_bones() {
        let mut combined = CombinedMesh::default();
        let mesh = mesh_instance(Some(1));
        combined.batch(0, &mesh, &mesh_data(2), 0);
        assert!(combined.can_batch(&mesh, &mesh_data(2), 60));
        combined.batch(1, &mesh, &mesh_data(2), 3);

        assert_eq!(combined.indices, vec![0, 1, 2, 3, 4, 5]);
        assert_eq!(combined.vertices[3].blend_indices[0], 2.0);
        assert_eq!(combined.skin_bones[2], SkinRef { instance: 1, bone: BoneIndex::ROOT });
        assert_eq!(combined.mesh_anim_layers, vec![0, 3]);
        assert_eq!(combined.vertices[0].tex_coord, Vec2::new(0.75, 0.25));
    }

    #[test]
    fn texture_clash_and_bone_budget_split_batches() {
        let mut combined = CombinedMesh::default();
        combined.batch(0, &mesh_instance(Some(1)), &mesh_data(30), 0);

        assert!(!combined.can_batch(&mesh_instance(Some(2)), &mesh_data(1), 60));
        assert!(combined.can_batch(&mesh_instance(None), &mesh_data(30), 60));
        assert!(!combined.can_batch(&mesh_instance(None), &mesh_data(31), 60));
    }

    #[test]
    fn skinning_follows_bone_matrices() {
        let mut combined = CombinedMesh::default();
        combined.batch(0, &mesh_instance(None), &mesh_data(1), 0);

        let mut pose = BonePose {
            local: vec![Mat4::IDENTITY],
            combined: vec![Mat4::from_translation(Vec3::X * 2.0)],
        };
        combined.update_bone_matrices(&[&pose]);
        assert_eq!(combined.skinned_position(&combined.vertices[0]), Vec3::X * 2.0);

        pose.combined[0] = Mat4::IDENTITY;
        combined.update_bone_matrices(&[&pose]);
        assert_eq!(combined.skinned_position(&combined.vertices[0]), Vec3::ZERO);
    }
}
