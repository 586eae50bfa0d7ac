//! Model layer
//!
//! - [`ModelManager`]: loads and caches model files, descriptions and
//!   graphics resources, and creates instances
//! - [`ModelEntity`]: shared data of one description
//! - [`ModelInstance`]: a live model with layers, playback, attached
//!   children and combined meshes
//!
//! # Layers
//!
//! A model's appearance is driven by 30 integer layers. Every record of the
//! description's link table is keyed by a `(layer, value)` pair and applies
//! while that layer holds that value: it may attach a child model, disable
//! meshes or other layers, swap textures and effects, or adjust the
//! transform and playback speed.
//!
//! ```rust,ignore
//! let mut human = mgr.create_model("critters/human.fo3d").unwrap();
//! human.start_mesh_generation();
//!
//! let mut layers = [0; LAYERS3D_COUNT];
//! layers[2] = 1; // helmet
//! if human.set_animation(&mut mgr, 1, 1, Some(&layers), AnimationFlags::empty()) {
//!     // batches were rebuilt
//! }
//! human.draw(&mgr, &mut renderer);
//! ```

pub mod combine;
pub mod description;
pub mod entity;
pub mod flags;
pub mod frame;
pub mod instance;
pub mod layers;
pub mod manager;
pub mod params;

pub use combine::{CombinedMesh, SkinRef};
pub use description::ModelDescription;
pub use entity::{AnimationIndex, ModelEntity, RenderFrames};
pub use flags::AnimationFlags;
pub use frame::BonesBorder;
pub use instance::{AnimationCallback, MeshInstance, ModelInstance};
pub use manager::ModelManager;
pub use params::{AnimParams, LAYERS3D_COUNT, LayerValues};
