use glam::Vec3;
use smallvec::SmallVec;

use crate::utils::interner::{self, NameHash};

/// Number of appearance layers. Slot `LAYERS3D_COUNT` of an instance's
/// layer array holds the packed action that was played last.
pub const LAYERS3D_COUNT: usize = 30;

pub type LayerValues = [i32; LAYERS3D_COUNT];

/// Packs an action pair into the key used by the animation tables.
#[inline]
#[must_use]
pub fn pack_anim(anim1: u32, anim2: u32) -> u32 {
    (anim1 << 16) | (anim2 & 0xFFFF)
}

/// Where an override takes its texture or effect from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverrideSource {
    /// Load by name, relative to the model file.
    Named(String),
    /// Borrow from the parent instance's first mesh matching the selector.
    Parent(Option<NameHash>),
}

impl OverrideSource {
    /// Parses `Parent`, `Parent_<Mesh>` and plain names.
    #[must_use]
    pub fn parse(name: &str) -> Self {
        match name.strip_prefix("Parent") {
            Some(rest) => {
                let mesh = rest.strip_prefix('_').unwrap_or(rest);
                Self::Parent(interner::mesh_selector(mesh))
            }
            None => Self::Named(name.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureOverride {
    pub source: OverrideSource,
    /// `None` selects every mesh.
    pub mesh: Option<NameHash>,
    pub slot: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectOverride {
    pub source: OverrideSource,
    pub mesh: Option<NameHash>,
}

/// One record of the layer link table.
///
/// A record applies when `current_layers[layer] == layer_value`. With a
/// `child_name` it attaches another model, otherwise it adjusts the owning
/// model: transform deltas, disabled layers and meshes, texture and effect
/// overrides.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimParams {
    pub id: u32,
    pub layer: usize,
    pub layer_value: i32,
    pub child_name: Option<String>,
    pub link_bone: Option<NameHash>,
    /// Degrees per axis.
    pub rotate: Vec3,
    pub translate: Vec3,
    pub scale: Vec3,
    pub speed_adjust: f32,
    pub disabled_layers: SmallVec<[usize; 4]>,
    /// `None` entries disable every mesh.
    pub disabled_meshes: Vec<Option<NameHash>>,
    pub textures: Vec<TextureOverride>,
    pub effects: Vec<EffectOverride>,
}

impl Default for AnimParams {
    fn default() -> Self {
        Self {
            id: 0,
            layer: 0,
            layer_value: 0,
            child_name: None,
            link_bone: None,
            rotate: Vec3::ZERO,
            translate: Vec3::ZERO,
            scale: Vec3::ZERO,
            speed_adjust: 0.0,
            disabled_layers: SmallVec::new(),
            disabled_meshes: Vec::new(),
            textures: Vec::new(),
            effects: Vec::new(),
        }
    }
}

impl AnimParams {
    /// A record that never applies.
    #[must_use]
    pub fn noop(id: u32) -> Self {
        Self { id, ..Default::default() }
    }

    #[must_use]
    pub fn matches(&self, layer: usize, value: i32) -> bool {
        value != 0 && self.layer == layer && self.layer_value == value
    }

    #[must_use]
    pub fn is_attachment(&self) -> bool {
        self.child_name.is_some()
    }

    /// Whether the record disables `mesh`.
    #[must_use]
    pub fn disables_mesh(&self, mesh: NameHash) -> bool {
        self.disabled_meshes.iter().any(|&sel| interner::selects(sel, mesh))
    }
}
