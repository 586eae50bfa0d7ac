use glam::{Mat4, Vec3};

use crate::scene::hierarchy::{BoneIndex, ModelHierarchy};

/// Per-instance transform state, index-parallel to a hierarchy's bones.
///
/// `local` is written by the animation controller, `combined` by
/// [`ModelHierarchy::update_frame_matrices`].
#[derive(Debug, Clone, Default)]
pub struct BonePose {
    pub local: Vec<Mat4>,
    pub combined: Vec<Mat4>,
}

impl BonePose {
    /// Pose initialised to the bind pose of `hierarchy`.
    #[must_use]
    pub fn from_hierarchy(hierarchy: &ModelHierarchy) -> Self {
        Self {
            local: hierarchy.bones().iter().map(|b| b.transformation).collect(),
            combined: hierarchy.bones().iter().map(|b| b.global_transformation).collect(),
        }
    }

    #[inline]
    #[must_use]
    pub fn combined(&self, bone: BoneIndex) -> Mat4 {
        self.combined.get(bone.index()).copied().unwrap_or(Mat4::IDENTITY)
    }

    /// World position of a bone, ignoring its scale.
    #[inline]
    #[must_use]
    pub fn position(&self, bone: BoneIndex) -> Vec3 {
        self.combined(bone).w_axis.truncate()
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.combined.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.combined.is_empty()
    }
}
