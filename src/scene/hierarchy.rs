//! Bone Hierarchy
//!
//! The immutable skeleton of one model file, stored as an arena of bones in
//! depth-first pre-order. Index `0` is always the root.
//!
//! Nothing here changes after load. Animated and combined transforms live in
//! the per-instance [`BonePose`] buffers, indexed by [`BoneIndex`].

use glam::Mat4;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::animation::clip::AnimationClip;
use crate::resources::mesh::{MeshData, MeshDesc};
use crate::scene::pose::BonePose;
use crate::utils::interner::{self, NameHash};

/// Index of a bone inside a [`ModelHierarchy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct BoneIndex(pub u32);

impl BoneIndex {
    pub const ROOT: Self = Self(0);

    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Loader-side description of a bone subtree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoneDesc {
    pub name: String,
    #[serde(default = "identity")]
    pub transformation: Mat4,
    #[serde(default)]
    pub mesh: Option<MeshDesc>,
    #[serde(default)]
    pub children: Vec<BoneDesc>,
}

fn identity() -> Mat4 {
    Mat4::IDENTITY
}

impl BoneDesc {
    #[must_use]
    pub fn new(name: &str, transformation: Mat4) -> Self {
        Self {
            name: name.to_string(),
            transformation,
            mesh: None,
            children: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_mesh(mut self, mesh: MeshDesc) -> Self {
        self.mesh = Some(mesh);
        self
    }

    #[must_use]
    pub fn with_child(mut self, child: BoneDesc) -> Self {
        self.children.push(child);
        self
    }
}

/// Everything a loader returns for one model file.
#[derive(Debug, Clone)]
pub struct HierarchyFile {
    pub root: BoneDesc,
    pub clips: Vec<AnimationClip>,
}

#[derive(Debug, Clone)]
pub struct Bone {
    pub name: NameHash,
    /// Bind-pose transform relative to the parent.
    pub transformation: Mat4,
    /// Bind-pose transform relative to the model root.
    pub global_transformation: Mat4,
    pub parent: Option<BoneIndex>,
    pub children: SmallVec<[BoneIndex; 4]>,
    pub depth: u32,
    /// Index into [`ModelHierarchy::meshes`].
    pub mesh: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct ModelHierarchy {
    pub file_name: String,
    bones: Vec<Bone>,
    meshes: Vec<MeshData>,
    all_bones: Vec<BoneIndex>,
    draw_bones: Vec<BoneIndex>,
}

impl ModelHierarchy {
    /// Flattens a loaded bone tree and resolves mesh skin bones.
    #[must_use]
    pub fn from_desc(file_name: &str, root: &BoneDesc) -> Self {
        let mut hierarchy = Self {
            file_name: file_name.to_string(),
            bones: Vec::new(),
            meshes: Vec::new(),
            all_bones: Vec::new(),
            draw_bones: Vec::new(),
        };

        let mut pending_meshes = Vec::new();
        let mut stack: Vec<(&BoneDesc, Option<BoneIndex>)> = vec![(root, None)];
        while let Some((desc, parent)) = stack.pop() {
            let index = BoneIndex(hierarchy.bones.len() as u32);
            let (global_parent, depth) = match parent {
                Some(p) => {
                    let parent_bone = &hierarchy.bones[p.index()];
                    (parent_bone.global_transformation, parent_bone.depth + 1)
                }
                None => (Mat4::IDENTITY, 0),
            };

            hierarchy.bones.push(Bone {
                name: interner::intern(&desc.name),
                transformation: desc.transformation,
                global_transformation: global_parent * desc.transformation,
                parent,
                children: SmallVec::new(),
                depth,
                mesh: None,
            });
            if let Some(p) = parent {
                hierarchy.bones[p.index()].children.push(index);
            }
            if let Some(mesh) = &desc.mesh {
                pending_meshes.push((index, mesh));
            }

            // Reverse push keeps siblings in declaration order
            for child in desc.children.iter().rev() {
                stack.push((child, Some(index)));
            }
        }

        for (owner, desc) in pending_meshes {
            let mesh = hierarchy.build_mesh(owner, desc);
            hierarchy.bones[owner.index()].mesh = Some(hierarchy.meshes.len());
            hierarchy.meshes.push(mesh);
        }

        // Breadth order by depth, pre-order inside one depth
        let mut all_bones: Vec<BoneIndex> = (0..hierarchy.bones.len() as u32).map(BoneIndex).collect();
        all_bones.sort_by_key(|b| hierarchy.bones[b.index()].depth);
        hierarchy.draw_bones = all_bones
            .iter()
            .copied()
            .filter(|b| hierarchy.bones[b.index()].mesh.is_some())
            .collect();
        hierarchy.all_bones = all_bones;

        hierarchy
    }

    fn build_mesh(&self, owner: BoneIndex, desc: &MeshDesc) -> MeshData {
        let mut skin_bones = Vec::with_capacity(desc.skin_bones.len());
        let mut skin_bone_offsets = Vec::with_capacity(desc.skin_bones.len());

        for skin in &desc.skin_bones {
            match &skin.name {
                Some(name) => match self.find(interner::intern(name)) {
                    Some(bone) => {
                        skin_bones.push(bone);
                        skin_bone_offsets.push(skin.offset);
                    }
                    None => {
                        log::warn!("Skin bone '{}' not found in '{}'", name, self.file_name);
                        skin_bones.push(owner);
                        skin_bone_offsets.push(Mat4::IDENTITY);
                    }
                },
                None => {
                    skin_bones.push(owner);
                    skin_bone_offsets.push(skin.offset);
                }
            }
        }

        MeshData {
            owner,
            owner_name: self.bones[owner.index()].name,
            vertices: desc.vertices.clone(),
            indices: desc.indices.clone(),
            diffuse_texture: desc.diffuse_texture.clone(),
            effect_name: desc.effect.clone(),
            skin_bones,
            skin_bone_offsets,
        }
    }

    /// Depth-first search by name.
    ///
    /// The arena is in pre-order, so the first match of a linear scan is the
    /// first match of a depth-first walk.
    #[must_use]
    pub fn find(&self, name: NameHash) -> Option<BoneIndex> {
        self.bones
            .iter()
            .position(|bone| bone.name == name)
            .map(|i| BoneIndex(i as u32))
    }

    #[inline]
    #[must_use]
    pub fn root(&self) -> BoneIndex {
        BoneIndex::ROOT
    }

    #[inline]
    #[must_use]
    pub fn bone(&self, index: BoneIndex) -> &Bone {
        &self.bones[index.index()]
    }

    #[inline]
    #[must_use]
    pub fn bones(&self) -> &[Bone] {
        &self.bones
    }

    #[inline]
    #[must_use]
    pub fn bone_count(&self) -> usize {
        self.bones.len()
    }

    #[inline]
    #[must_use]
    pub fn meshes(&self) -> &[MeshData] {
        &self.meshes
    }

    /// All bones ordered by depth.
    #[inline]
    #[must_use]
    pub fn all_bones(&self) -> &[BoneIndex] {
        &self.all_bones
    }

    /// Bones carrying a mesh, in [`all_bones`](Self::all_bones) order.
    #[inline]
    #[must_use]
    pub fn draw_bones(&self) -> &[BoneIndex] {
        &self.draw_bones
    }

    /// Mesh attached to a draw bone.
    #[must_use]
    pub fn mesh_of(&self, bone: BoneIndex) -> Option<&MeshData> {
        self.bones[bone.index()].mesh.map(|m| &self.meshes[m])
    }

    /// Writes `combined = parent * local` for `root` and its whole subtree.
    pub fn update_frame_matrices(&self, root: BoneIndex, parent_matrix: &Mat4, pose: &mut BonePose) {
        let mut stack: SmallVec<[(BoneIndex, Mat4); 32]> = SmallVec::new();
        stack.push((root, *parent_matrix));

        while let Some((index, parent)) = stack.pop() {
            let i = index.index();
            let combined = parent * pose.local[i];
            pose.combined[i] = combined;
            for &child in &self.bones[i].children {
                stack.push((child, combined));
            }
        }
    }
}
