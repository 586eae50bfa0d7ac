#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::too_many_arguments)]

pub mod animation;
pub mod assets;
pub mod errors;
pub mod model;
pub mod renderer;
pub mod resources;
pub mod scene;
pub mod settings;
pub mod utils;

pub use animation::{AnimationClip, AnimationController, BoneTrack};
pub use assets::{JsonDescriptions, LayerDataSource, ResourceLoader};
pub use errors::{Fo3dError, Result};
pub use model::{AnimationFlags, LAYERS3D_COUNT, LayerValues, ModelInstance, ModelManager};
pub use renderer::{DrawBatch, Renderer};
pub use resources::{MeshTexture, Vertex3D};
pub use scene::{BoneDesc, HierarchyFile, ModelHierarchy};
pub use settings::ModelSettings;
pub use utils::interner;
