use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec2, Vec3};
use serde::{Deserialize, Serialize};

use crate::scene::hierarchy::BoneIndex;
use crate::utils::interner::NameHash;

/// Maximum number of bone influences per vertex.
pub const BONES_PER_VERTEX: usize = 4;

/// Skinned vertex as uploaded to the renderer.
///
/// Blend indices are stored as floats so that batch offsets can be added
/// without repacking.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct Vertex3D {
    pub position: Vec3,
    pub normal: Vec3,
    pub tex_coord: Vec2,
    pub blend_indices: [f32; BONES_PER_VERTEX],
    pub blend_weights: [f32; BONES_PER_VERTEX],
}

impl Vertex3D {
    /// A vertex fully bound to the first skin bone of its mesh.
    #[must_use]
    pub fn rigid(position: Vec3, normal: Vec3, tex_coord: Vec2) -> Self {
        Self {
            position,
            normal,
            tex_coord,
            blend_indices: [0.0; BONES_PER_VERTEX],
            blend_weights: [1.0, 0.0, 0.0, 0.0],
        }
    }
}

/// Loader-side description of a mesh attached to a bone.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MeshDesc {
    pub vertices: Vec<Vertex3D>,
    pub indices: Vec<u16>,
    pub diffuse_texture: String,
    pub effect: String,
    pub skin_bones: Vec<SkinBoneDesc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkinBoneDesc {
    /// `None` binds the influence to the bone owning the mesh.
    pub name: Option<String>,
    pub offset: Mat4,
}

/// Immutable mesh data shared by every instance of a model.
#[derive(Debug, Clone)]
pub struct MeshData {
    /// Bone the mesh is attached to.
    pub owner: BoneIndex,
    pub owner_name: NameHash,
    pub vertices: Vec<Vertex3D>,
    pub indices: Vec<u16>,
    pub diffuse_texture: String,
    pub effect_name: String,
    /// Resolved skin bones, parallel to `skin_bone_offsets`.
    pub skin_bones: Vec<BoneIndex>,
    pub skin_bone_offsets: Vec<Mat4>,
}

impl MeshData {
    #[inline]
    #[must_use]
    pub fn bone_count(&self) -> usize {
        self.skin_bones.len()
    }
}
