//! In-memory loader, description source and renderer shared by the
//! integration tests.

#![allow(dead_code)]

use std::cell::Cell;
use std::collections::HashMap;
use std::rc::Rc;

use glam::{Mat4, Vec2, Vec3, Vec4};

use fo3d::animation::{AnimationClip, BoneTrack};
use fo3d::assets::{JsonDescriptions, ResourceLoader};
use fo3d::errors::{Fo3dError, Result};
use fo3d::interner;
use fo3d::renderer::{DrawBatch, Renderer};
use fo3d::resources::mesh::{MeshDesc, SkinBoneDesc, Vertex3D};
use fo3d::resources::texture::{EffectHandle, MeshTexture, TextureHandle};
use fo3d::scene::hierarchy::{BoneDesc, HierarchyFile};
use fo3d::settings::ModelSettings;
use fo3d::model::ModelManager;

pub const IDLE: (u32, u32) = (1, 1);
pub const WALK: (u32, u32) = (1, 3);
pub const DEATH: (u32, u32) = (1, 20);

pub const HUMAN_FO3D: &str = r#"{
    "model": "human.x",
    "layers": [
        { "layer": 2, "value": 1, "attach": "helmet.x", "link": "Head" },
        { "layer": 3, "value": 1, "attach": "cape.x", "translate": [0, 1, 0] },
        { "layer": 4, "value": 1, "disable_meshes": ["Head"] },
        { "layer": 5, "value": 2, "textures": [{ "name": "dark.png", "mesh": "Spine", "slot": 0 }] },
        { "layer": 6, "value": 1, "disable_layers": [2] },
        { "layer": 7, "value": 1, "effects": [{ "name": "Glow" }] },
        { "layer": 8, "value": 1, "attach": "helmet.x", "link": "NoSuchBone" },
        { "layer": 9, "value": 1, "speed": 2.0 },
        { "layer": 10, "value": 1, "attach": "helmet.x", "link": "Head",
          "textures": [{ "name": "Parent_Spine", "slot": 0 }] },
        { "layer": 11, "value": 1, "rotate": [90, 90, 0], "translate": [1, 2, 3], "scale": [2, 0, 0] },
        { "layer": 12, "value": 40 }
    ],
    "animations": [
        { "anim1": 1, "anim2": 1, "file": "ModelFile", "name": "Idle" },
        { "anim1": 1, "anim2": 3, "file": "ModelFile", "name": "Walk" },
        { "anim1": 1, "anim2": 20, "file": "ModelFile", "name": "Death" }
    ],
    "anim_layer_values": [
        { "anim1": 1, "anim2": 20, "layer": 2, "value": 1 }
    ]
}"#;

/// Loader serving a small human skeleton and two attachments.
pub struct FakeLoader {
    files: HashMap<String, HierarchyFile>,
    pub hierarchy_loads: Rc<Cell<usize>>,
    pub texture_loads: Rc<Cell<usize>>,
}

impl ResourceLoader for FakeLoader {
    fn load_hierarchy(&mut self, path: &str) -> Result<HierarchyFile> {
        self.hierarchy_loads.set(self.hierarchy_loads.get() + 1);
        self.files.get(path).cloned().ok_or_else(|| Fo3dError::HierarchyLoad {
            path: path.to_string(),
            reason: "no such file".into(),
        })
    }

    fn load_texture(&mut self, name: &str, _model_path: &str) -> Result<MeshTexture> {
        self.texture_loads.set(self.texture_loads.get() + 1);
        let handle = match name {
            "body.png" => 1,
            "helmet.png" => 2,
            "dark.png" => 3,
            _ => return Err(Fo3dError::TextureLoad(name.to_string())),
        };
        Ok(MeshTexture::new(interner::intern(name), TextureHandle(handle)))
    }

    fn load_effect(&mut self, name: &str, _model_path: &str) -> Result<EffectHandle> {
        match name {
            "Skinned" => Ok(EffectHandle(1)),
            "Glow" => Ok(EffectHandle(2)),
            _ => Err(Fo3dError::EffectLoad(name.to_string())),
        }
    }
}

/// One triangle standing on the bone origin, two units tall.
pub fn triangle_mesh(texture: &str, skin_bone: Option<&str>) -> MeshDesc {
    MeshDesc {
        vertices: vec![
            Vertex3D::rigid(Vec3::new(-1.0, 0.0, 0.0), Vec3::Z, Vec2::ZERO),
            Vertex3D::rigid(Vec3::new(1.0, 0.0, 0.0), Vec3::Z, Vec2::X),
            Vertex3D::rigid(Vec3::new(0.0, 2.0, 0.0), Vec3::Z, Vec2::Y),
        ],
        indices: vec![0, 1, 2],
        diffuse_texture: texture.to_string(),
        effect: "Skinned".to_string(),
        skin_bones: vec![SkinBoneDesc {
            name: skin_bone.map(str::to_string),
            offset: Mat4::IDENTITY,
        }],
    }
}

fn human() -> HierarchyFile {
    let head = BoneDesc::new("Head", Mat4::from_translation(Vec3::Y * 2.0))
        .with_mesh(triangle_mesh("body.png", Some("Head")));
    let spine = BoneDesc::new("Spine", Mat4::IDENTITY)
        .with_mesh(triangle_mesh("body.png", Some("Spine")))
        .with_child(head);
    let root = BoneDesc::new("Root", Mat4::IDENTITY).with_child(spine);

    let idle = AnimationClip::new("human.x", "Idle", 10.0, 10.0)
        .with_output(BoneTrack::new("Spine").with_translation(vec![0.0, 10.0], vec![Vec3::ZERO, Vec3::ZERO]));
    let walk = AnimationClip::new("human.x", "Walk", 20.0, 10.0)
        .with_output(BoneTrack::new("Spine").with_translation(vec![0.0, 20.0], vec![Vec3::ZERO, Vec3::X]));
    let death = AnimationClip::new("human.x", "Death", 5.0, 10.0)
        .with_output(BoneTrack::new("Spine").with_translation(vec![0.0, 5.0], vec![Vec3::ZERO, -Vec3::Y]));

    HierarchyFile {
        root,
        clips: vec![idle, walk, death],
    }
}

fn helmet() -> HierarchyFile {
    let root = BoneDesc::new("HelmetRoot", Mat4::IDENTITY)
        .with_child(BoneDesc::new("Helmet", Mat4::IDENTITY).with_mesh(triangle_mesh("helmet.png", None)));
    HierarchyFile { root, clips: Vec::new() }
}

fn cape() -> HierarchyFile {
    let root = BoneDesc::new("Root", Mat4::IDENTITY).with_child(
        BoneDesc::new("Spine", Mat4::IDENTITY).with_mesh(triangle_mesh("body.png", Some("Spine"))),
    );
    HierarchyFile { root, clips: Vec::new() }
}

pub fn loader() -> FakeLoader {
    let mut files = HashMap::new();
    files.insert("human.x".to_string(), human());
    files.insert("helmet.x".to_string(), helmet());
    files.insert("cape.x".to_string(), cape());
    FakeLoader {
        files,
        hierarchy_loads: Rc::new(Cell::new(0)),
        texture_loads: Rc::new(Cell::new(0)),
    }
}

pub fn descriptions() -> JsonDescriptions {
    let mut source = JsonDescriptions::new();
    source.insert("human.fo3d", HUMAN_FO3D);
    source
}

pub fn manager_with(settings: ModelSettings) -> ModelManager {
    ModelManager::new(settings, Box::new(loader()), Box::new(descriptions()))
        .with_timer(fo3d::utils::GameTimer::manual())
}

pub fn manager() -> ModelManager {
    manager_with(ModelSettings::default())
}

pub fn layers_with(pairs: &[(usize, i32)]) -> fo3d::LayerValues {
    let mut layers = [0; fo3d::LAYERS3D_COUNT];
    for &(layer, value) in pairs {
        layers[layer] = value;
    }
    layers
}

/// Owned copy of a submitted batch.
#[derive(Debug, Clone)]
pub struct RecordedBatch {
    pub vertex_count: usize,
    pub index_count: usize,
    pub bone_matrices: Vec<Mat4>,
    pub texture0: Option<String>,
    pub effect: Option<EffectHandle>,
    pub light_color: Vec4,
}

#[derive(Debug, Default)]
pub struct RecordingRenderer {
    pub batches: Vec<RecordedBatch>,
}

impl Renderer for RecordingRenderer {
    fn draw_batch(&mut self, batch: &DrawBatch<'_>) {
        self.batches.push(RecordedBatch {
            vertex_count: batch.vertices.len(),
            index_count: batch.indices.len(),
            bone_matrices: batch.bone_matrices.to_vec(),
            texture0: batch.textures[0]
                .as_ref()
                .map(|t| interner::resolve(t.name).to_string()),
            effect: batch.effect,
            light_color: batch.light_color,
        });
    }
}

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}
