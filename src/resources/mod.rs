//! Shared mesh and texture resources.
//!
//! Mesh data is loaded once per hierarchy file and shared read-only by
//! every instance. Textures and effects are opaque handles owned by the
//! host renderer.

pub mod mesh;
pub mod texture;

pub use mesh::{MeshData, MeshDesc, SkinBoneDesc, Vertex3D, BONES_PER_VERTEX};
pub use texture::{EffectHandle, MeshTexture, TextureHandle, TextureSet, EFFECT_TEXTURES};
