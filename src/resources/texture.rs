use std::sync::Arc;

use glam::Vec2;

use crate::utils::interner::NameHash;

/// Number of texture slots an effect can bind.
pub const EFFECT_TEXTURES: usize = 10;

/// Opaque texture handle issued by the resource loader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureHandle(pub u64);

/// Opaque effect (shader program) handle issued by the resource loader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EffectHandle(pub u64);

/// A texture bound to a mesh slot.
///
/// Textures usually live inside an atlas; `atlas_offset` holds
/// `[u_offset, v_offset, u_scale, v_scale]` of the sub-rectangle.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshTexture {
    pub name: NameHash,
    pub handle: TextureHandle,
    pub atlas_offset: [f32; 4],
    /// `[width, height, 1/width, 1/height]` of the backing texture.
    pub size: [f32; 4],
}

impl MeshTexture {
    /// A texture occupying the whole backing image.
    #[must_use]
    pub fn new(name: NameHash, handle: TextureHandle) -> Self {
        Self {
            name,
            handle,
            atlas_offset: [0.0, 0.0, 1.0, 1.0],
            size: [1.0; 4],
        }
    }

    #[must_use]
    pub fn with_atlas_offset(mut self, atlas_offset: [f32; 4]) -> Self {
        self.atlas_offset = atlas_offset;
        self
    }

    /// Maps a mesh texture coordinate into the atlas sub-rectangle.
    #[inline]
    #[must_use]
    pub fn remap_uv(&self, uv: Vec2) -> Vec2 {
        Vec2::new(
            uv.x * self.atlas_offset[2] + self.atlas_offset[0],
            uv.y * self.atlas_offset[3] + self.atlas_offset[1],
        )
    }

    /// Two textures conflict when they are backed by different images.
    #[inline]
    #[must_use]
    pub fn same_backing(&self, other: &Self) -> bool {
        self.handle == other.handle
    }
}

/// Texture slots of one mesh or one combined batch.
pub type TextureSet = [Option<Arc<MeshTexture>>; EFFECT_TEXTURES];

#[must_use]
pub fn empty_texture_set() -> TextureSet {
    std::array::from_fn(|_| None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::interner::intern;

    #[test]
    fn remap_uv_into_atlas_cell() {
        let tex = MeshTexture::new(intern("skin.png"), TextureHandle(7))
            .with_atlas_offset([0.5, 0.25, 0.5, 0.25]);
        let uv = tex.remap_uv(Vec2::new(1.0, 1.0));
        assert!((uv.x - 1.0).abs() < 1e-6);
        assert!((uv.y - 0.5).abs() < 1e-6);
    }

    #[test]
    fn backing_comparison_ignores_atlas_cell() {
        let a = MeshTexture::new(intern("a.png"), TextureHandle(1));
        let b = MeshTexture::new(intern("b.png"), TextureHandle(1)).with_atlas_offset([0.5, 0.0, 0.5, 1.0]);
        let c = MeshTexture::new(intern("c.png"), TextureHandle(2));
        assert!(a.same_backing(&b));
        assert!(!a.same_backing(&c));
    }
}
