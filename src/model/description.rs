//! Model Description
//!
//! The parsed form of a `.fo3d` model description: which hierarchy file to
//! load, the layer link table, the animation tables and frame settings.
//!
//! Descriptions come from a [`LayerDataSource`](crate::assets::LayerDataSource).
//! A JSON rendition is supported through serde; every field is optional.
//!
//! ```json
//! {
//!   "model": "human.x",
//!   "root": { "rotate": [0, 180, 0] },
//!   "layers": [
//!     { "layer": 2, "value": 1, "attach": "helmet.fo3d", "link": "Bip01 Head" },
//!     { "layer": 3, "value": 5, "textures": [{ "name": "skin_dark.png", "mesh": "Body", "slot": 0 }] }
//!   ],
//!   "animations": [
//!     { "anim1": 1, "anim2": 1, "file": "ModelFile", "name": "Idle" }
//!   ]
//! }
//! ```
//!
//! Structural errors never fail a load. [`ModelDescription::link_table`] logs
//! them and turns the offending record into a no-op.

use glam::Vec3;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::errors::Result;
use crate::model::params::{AnimParams, EffectOverride, LAYERS3D_COUNT, OverrideSource, TextureOverride};
use crate::resources::texture::EFFECT_TEXTURES;
use crate::utils::combine_path;
use crate::utils::interner;

/// Value of `AnimDesc::file` selecting the description's own model file.
pub const MODEL_FILE: &str = "ModelFile";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextureDesc {
    pub name: String,
    /// Mesh (owning bone) name; absent or `"All"` selects every mesh.
    pub mesh: Option<String>,
    pub slot: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EffectDesc {
    pub name: String,
    pub mesh: Option<String>,
}

/// One layer link record, or the default record when used as `root`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkDesc {
    pub layer: i32,
    pub value: i32,
    /// Child model attached while the record applies.
    pub attach: Option<String>,
    /// Bone of this model the child hangs on. Without it the child's skinned
    /// bones follow the same-named bones of this model.
    pub link: Option<String>,
    pub rotate: [f32; 3],
    pub translate: [f32; 3],
    pub scale: [f32; 3],
    pub speed: f32,
    pub disable_layers: Vec<i32>,
    pub disable_meshes: Vec<String>,
    pub textures: Vec<TextureDesc>,
    pub effects: Vec<EffectDesc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimDesc {
    pub anim1: u32,
    pub anim2: u32,
    /// Registers the clip under the combat variant `anim2 | 0x8000`.
    pub combat: bool,
    /// Hierarchy file holding the clip, or [`MODEL_FILE`].
    pub file: String,
    /// Clip name; `"Base"` takes the first clip of the file.
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimSpeedDesc {
    pub anim1: u32,
    pub anim2: u32,
    pub combat: bool,
    pub speed: f32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnimEqualKind {
    #[default]
    Anim1,
    Anim2,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimEqualDesc {
    pub kind: AnimEqualKind,
    pub from: u32,
    pub to: u32,
}

/// Layer values forced while an action plays.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimLayerValueDesc {
    pub anim1: u32,
    pub anim2: u32,
    pub layer: i32,
    pub value: i32,
}

/// Clip used to pre-render the model into sprite frames.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderFramesDesc {
    pub file: String,
    pub name: String,
    pub proc_from: i32,
    pub proc_to: i32,
    pub dir: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelDescription {
    /// Hierarchy file, relative to the description.
    pub model: String,
    pub root: LinkDesc,
    pub layers: Vec<LinkDesc>,
    pub animations: Vec<AnimDesc>,
    pub anim_speeds: Vec<AnimSpeedDesc>,
    pub anim_equals: Vec<AnimEqualDesc>,
    pub anim_layer_values: Vec<AnimLayerValueDesc>,
    pub fast_transition_bones: Vec<String>,
    pub render_frames: Option<RenderFramesDesc>,
    pub shadow_disabled: bool,
    pub draw_size: Option<[i32; 2]>,
    pub view_size: Option<[i32; 2]>,
    pub disable_animation_interpolation: bool,
}

/// Validated layer link table of one description.
#[derive(Debug, Clone, Default)]
pub struct LinkTable {
    pub default: AnimParams,
    pub links: Vec<AnimParams>,
}

impl ModelDescription {
    /// Description of a plain hierarchy file: no layers, no animations.
    #[must_use]
    pub fn bare(model: &str) -> Self {
        Self {
            model: model.to_string(),
            ..Default::default()
        }
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Builds the runtime link records of the description `name`.
    ///
    /// Record ids are unique within the table; the default record has id 0.
    #[must_use]
    pub fn link_table(&self, name: &str) -> LinkTable {
        let mut default = self.link_params(name, 0, &self.root);
        default.layer = 0;
        default.layer_value = 0;
        if default.child_name.take().is_some() {
            log::warn!("Model '{name}': the root record cannot attach a child, ignored");
        }
        default.link_bone = None;

        let links = self
            .layers
            .iter()
            .enumerate()
            .map(|(i, desc)| {
                let id = i as u32 + 1;
                if !(0..LAYERS3D_COUNT as i32).contains(&desc.layer) {
                    log::warn!("Model '{name}': layer {} is out of range, record ignored", desc.layer);
                    return AnimParams::noop(id);
                }
                if desc.value == 0 {
                    log::warn!("Model '{name}': layer {} record has zero value, ignored", desc.layer);
                    return AnimParams::noop(id);
                }
                let mut params = self.link_params(name, id, desc);
                params.layer = desc.layer as usize;
                params.layer_value = desc.value;
                params
            })
            .collect();

        LinkTable { default, links }
    }

    fn link_params(&self, name: &str, id: u32, desc: &LinkDesc) -> AnimParams {
        let mut disabled_layers = SmallVec::new();
        for &layer in &desc.disable_layers {
            if (0..LAYERS3D_COUNT as i32).contains(&layer) {
                disabled_layers.push(layer as usize);
            } else {
                log::warn!("Model '{name}': disabled layer {layer} is out of range, skipped");
            }
        }

        let mut textures = Vec::with_capacity(desc.textures.len());
        for texture in &desc.textures {
            if !(0..EFFECT_TEXTURES as i32).contains(&texture.slot) {
                log::warn!("Model '{name}': texture slot {} is out of range, skipped", texture.slot);
                continue;
            }
            textures.push(TextureOverride {
                source: OverrideSource::parse(&texture.name),
                mesh: texture.mesh.as_deref().and_then(interner::mesh_selector),
                slot: texture.slot as usize,
            });
        }

        let effects = desc
            .effects
            .iter()
            .map(|effect| EffectOverride {
                source: OverrideSource::parse(&effect.name),
                mesh: effect.mesh.as_deref().and_then(interner::mesh_selector),
            })
            .collect();

        AnimParams {
            id,
            layer: 0,
            layer_value: 0,
            child_name: desc.attach.as_deref().map(|child| combine_path(name, child)),
            link_bone: desc.link.as_deref().map(interner::intern),
            rotate: Vec3::from_array(desc.rotate),
            translate: Vec3::from_array(desc.translate),
            scale: Vec3::from_array(desc.scale),
            speed_adjust: desc.speed,
            disabled_layers,
            disabled_meshes: desc.disable_meshes.iter().map(|m| interner::mesh_selector(m)).collect(),
            textures,
            effects,
        }
    }
}
