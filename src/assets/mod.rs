//! Resource loading seams.
//!
//! The engine never touches files or GPU objects directly. Hierarchies,
//! clips, textures and effects come from a [`ResourceLoader`]; parsed model
//! descriptions come from a [`LayerDataSource`]. Both are owned by the
//! [`ModelManager`](crate::model::ModelManager), which caches every result.

pub mod io;

pub use io::JsonDescriptions;

use crate::errors::Result;
use crate::model::description::ModelDescription;
use crate::resources::texture::{EffectHandle, MeshTexture};
use crate::scene::hierarchy::HierarchyFile;

/// Loads model files and their graphics resources.
pub trait ResourceLoader {
    /// Loads the bone tree, meshes and animation clips of a model file.
    fn load_hierarchy(&mut self, path: &str) -> Result<HierarchyFile>;

    /// Loads a texture referenced by the model file at `model_path`.
    fn load_texture(&mut self, name: &str, model_path: &str) -> Result<MeshTexture>;

    /// Loads an effect referenced by the model file at `model_path`.
    fn load_effect(&mut self, name: &str, model_path: &str) -> Result<EffectHandle>;
}

/// Supplies parsed model descriptions by name.
pub trait LayerDataSource {
    fn load_description(&mut self, name: &str) -> Result<ModelDescription>;
}
