use crate::animation::clip::AnimationClip;
use crate::scene::hierarchy::{BoneIndex, ModelHierarchy};

pub struct Binder;

impl Binder {
    /// Resolves every bone track of a clip to a bone of `hierarchy`.
    ///
    /// The result is parallel to `clip.outputs`; tracks for bones the model
    /// does not have stay `None` and are skipped during playback.
    #[must_use]
    pub fn bind(hierarchy: &ModelHierarchy, clip: &AnimationClip) -> Vec<Option<BoneIndex>> {
        clip.outputs
            .iter()
            .map(|output| hierarchy.find(output.bone_name))
            .collect()
    }
}
