//! Skeleton and frame-space module
//!
//! - [`ModelHierarchy`]: immutable bone arena of one model file
//! - [`BonePose`]: per-instance local and combined bone matrices
//! - [`FrameProjection`]: frame pixel <-> world conversion

pub mod hierarchy;
pub mod pose;
pub mod projection;

pub use hierarchy::{Bone, BoneDesc, BoneIndex, HierarchyFile, ModelHierarchy};
pub use pose::BonePose;
pub use projection::FrameProjection;
