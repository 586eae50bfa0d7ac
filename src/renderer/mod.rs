//! Draw submission seam.
//!
//! The engine prepares combined meshes and bone matrices; the host's
//! [`Renderer`] turns each [`DrawBatch`] into a draw call.

use glam::{Mat4, Vec3, Vec4};

use crate::resources::mesh::Vertex3D;
use crate::resources::texture::{EffectHandle, TextureSet};

/// One skinned draw call.
#[derive(Debug, Clone, Copy)]
pub struct DrawBatch<'a> {
    pub vertices: &'a [Vertex3D],
    pub indices: &'a [u16],
    pub textures: &'a TextureSet,
    pub effect: Option<EffectHandle>,
    /// `combined[bone] * offset` per skin bone, indexed by vertex blend indices.
    pub bone_matrices: &'a [Mat4],
    pub projection: &'a Mat4,
    /// Point under the model, used to place its shadow.
    pub ground_pos: Vec3,
    pub light_color: Vec4,
    /// Position inside the current clip, `0..1`.
    pub anim_normalized_time: f32,
    /// Position inside the current clip, seconds.
    pub anim_absolute_time: f32,
    pub shadow_disabled: bool,
}

pub trait Renderer {
    fn draw_batch(&mut self, batch: &DrawBatch<'_>);
}
