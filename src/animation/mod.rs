pub mod values;
pub mod tracks;
pub mod clip;
pub mod binder;
pub mod controller;

pub use clip::{AnimationClip, BoneTrack};
pub use binder::Binder;
pub use controller::{AnimationController, AnimationSet, TRACK_COUNT};
pub use tracks::{InterpolationMode, KeyframeCursor, KeyframeTrack};
pub use values::Interpolatable;
