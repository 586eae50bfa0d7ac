use std::sync::Arc;

use glam::Vec4;
use rustc_hash::{FxHashMap, FxHashSet};
use slotmap::{SlotMap, new_key_type};

use crate::animation::clip::AnimationClip;
use crate::assets::{LayerDataSource, ResourceLoader};
use crate::errors::{Fo3dError, Result};
use crate::model::description::{MODEL_FILE, ModelDescription};
use crate::model::entity::{AnimSlot, COMBAT_ANIM_BIT, ModelEntity, ResolvedAnim};
use crate::model::flags::AnimationFlags;
use crate::model::instance::ModelInstance;
use crate::model::params::pack_anim;
use crate::resources::texture::{EffectHandle, MeshTexture};
use crate::scene::hierarchy::ModelHierarchy;
use crate::settings::ModelSettings;
use crate::utils::{GameTimer, combine_path, file_extension};

new_key_type! {
    pub struct HierarchyKey;
    pub struct EntityKey;
}

const MIN_GLOBAL_SPEED: f32 = 0.1;
const MAX_GLOBAL_SPEED: f32 = 10.0;
const GLOBAL_SPEED_STEP: f32 = 1.1;

/// A loaded model file: its bone tree and its clips.
#[derive(Debug)]
struct LoadedFile {
    hierarchy: Arc<ModelHierarchy>,
    clips: Vec<Arc<AnimationClip>>,
}

/// Entry point of the engine.
///
/// Owns the resource seams, the playback clock and every cache: model
/// files, entities, textures and effects are loaded once and shared by all
/// instances for the manager's lifetime.
pub struct ModelManager {
    settings: Arc<ModelSettings>,
    loader: Box<dyn ResourceLoader>,
    descriptions: Box<dyn LayerDataSource>,
    timer: GameTimer,
    global_speed_adjust: f32,
    light_color: Vec4,
    scene: u64,

    files: SlotMap<HierarchyKey, LoadedFile>,
    file_names: FxHashMap<String, HierarchyKey>,
    failed_files: FxHashSet<String>,
    entities: SlotMap<EntityKey, Arc<ModelEntity>>,
    entity_names: FxHashMap<String, EntityKey>,
    textures: FxHashMap<String, Option<Arc<MeshTexture>>>,
    effects: FxHashMap<String, Option<EffectHandle>>,
}

impl ModelManager {
    #[must_use]
    pub fn new(
        settings: ModelSettings,
        loader: Box<dyn ResourceLoader>,
        descriptions: Box<dyn LayerDataSource>,
    ) -> Self {
        Self {
            settings: Arc::new(settings),
            loader,
            descriptions,
            timer: GameTimer::new(),
            global_speed_adjust: 1.0,
            light_color: Vec4::ONE,
            scene: 0,
            files: SlotMap::with_key(),
            file_names: FxHashMap::default(),
            failed_files: FxHashSet::default(),
            entities: SlotMap::with_key(),
            entity_names: FxHashMap::default(),
            textures: FxHashMap::default(),
            effects: FxHashMap::default(),
        }
    }

    /// Replaces the playback clock, e.g. with [`GameTimer::manual`].
    #[must_use]
    pub fn with_timer(mut self, timer: GameTimer) -> Self {
        self.timer = timer;
        self
    }

    /// Creates a model instance and initialises it with an `INIT` animation.
    ///
    /// Returns `None` when the description or its model file cannot be
    /// loaded; the reason is logged.
    pub fn create_model(&mut self, name: &str) -> Option<ModelInstance> {
        let entity = self.entity(name)?;
        let mut instance = ModelInstance::new(entity, self);
        instance.set_animation(self, 0, 0, None, AnimationFlags::INIT);
        Some(instance)
    }

    /// Loads and caches a description and its files without creating an
    /// instance.
    pub fn preload_model(&mut self, name: &str) -> bool {
        self.entity(name).is_some()
    }

    /// Shared data of a model, loading it on first use.
    pub fn entity(&mut self, name: &str) -> Option<Arc<ModelEntity>> {
        if let Some(&key) = self.entity_names.get(name) {
            return self.entities.get(key).cloned();
        }

        match self.load_entity(name) {
            Ok(entity) => {
                let entity = Arc::new(entity);
                let key = self.entities.insert(Arc::clone(&entity));
                self.entity_names.insert(name.to_string(), key);
                Some(entity)
            }
            Err(err) => {
                log::warn!("Unable to load model '{name}': {err}");
                None
            }
        }
    }

    fn load_entity(&mut self, name: &str) -> Result<ModelEntity> {
        let (desc, model_path) = match file_extension(name).as_deref() {
            Some("fo3d") => {
                let desc = self.descriptions.load_description(name)?;
                if desc.model.is_empty() {
                    return Err(Fo3dError::Description {
                        name: name.to_string(),
                        reason: "no model file".into(),
                    });
                }
                let model_path = combine_path(name, &desc.model);
                (desc, model_path)
            }
            Some(_) => (ModelDescription::bare(name), name.to_string()),
            None => return Err(Fo3dError::ModelNotFound(name.to_string())),
        };

        let hierarchy = self.load_file(&model_path)?;

        let mut anims = Vec::with_capacity(desc.animations.len() + 1);
        for anim in &desc.animations {
            let file = if anim.file == MODEL_FILE {
                model_path.clone()
            } else {
                combine_path(name, &anim.file)
            };
            match self.load_clip(&file, &anim.name) {
                Ok(clip) => {
                    let anim2 = if anim.combat { anim.anim2 | COMBAT_ANIM_BIT } else { anim.anim2 };
                    anims.push(ResolvedAnim {
                        slot: AnimSlot::Action(pack_anim(anim.anim1, anim2)),
                        clip,
                    });
                }
                Err(err) => log::warn!("Model '{name}': {err}"),
            }
        }
        if let Some(render) = &desc.render_frames {
            let file = if render.file == MODEL_FILE || render.file.is_empty() {
                model_path.clone()
            } else {
                combine_path(name, &render.file)
            };
            match self.load_clip(&file, &render.name) {
                Ok(clip) => anims.push(ResolvedAnim {
                    slot: AnimSlot::Render,
                    clip,
                }),
                Err(err) => log::warn!("Model '{name}': {err}"),
            }
        }

        Ok(ModelEntity::new(name, &desc, hierarchy, anims, &self.settings))
    }

    fn load_file(&mut self, path: &str) -> Result<Arc<ModelHierarchy>> {
        self.file(path).map(|file| Arc::clone(&file.hierarchy))
    }

    fn file(&mut self, path: &str) -> Result<&LoadedFile> {
        if let Some(&key) = self.file_names.get(path) {
            return self
                .files
                .get(key)
                .ok_or_else(|| Fo3dError::ModelNotFound(path.to_string()));
        }
        if self.failed_files.contains(path) {
            return Err(Fo3dError::HierarchyLoad {
                path: path.to_string(),
                reason: "previous load failed".into(),
            });
        }

        let loaded = match self.loader.load_hierarchy(path) {
            Ok(loaded) => loaded,
            Err(err) => {
                self.failed_files.insert(path.to_string());
                return Err(err);
            }
        };

        let hierarchy = Arc::new(ModelHierarchy::from_desc(path, &loaded.root));
        let clips = loaded
            .clips
            .into_iter()
            .map(|mut clip| {
                clip.file_name = path.to_string();
                Arc::new(clip)
            })
            .collect::<Vec<_>>();
        log::debug!(
            "Loaded '{path}': {} bones, {} meshes, {} clips",
            hierarchy.bone_count(),
            hierarchy.meshes().len(),
            clips.len()
        );

        let key = self.files.insert(LoadedFile { hierarchy, clips });
        self.file_names.insert(path.to_string(), key);
        self.files
            .get(key)
            .ok_or_else(|| Fo3dError::ModelNotFound(path.to_string()))
    }

    /// Finds a clip by name; `"Base"` selects the first clip of the file.
    fn load_clip(&mut self, path: &str, clip_name: &str) -> Result<Arc<AnimationClip>> {
        let file = self.file(path)?;
        let clip = if clip_name == "Base" {
            file.clips.first()
        } else {
            file.clips.iter().find(|c| c.name == clip_name)
        };
        clip.cloned().ok_or_else(|| Fo3dError::ClipNotFound {
            file: path.to_string(),
            clip: clip_name.to_string(),
        })
    }

    /// Texture by name, relative to `model_path`. Failures are cached as
    /// `None`.
    pub(crate) fn load_texture(&mut self, name: &str, model_path: &str) -> Option<Arc<MeshTexture>> {
        if name.is_empty() {
            return None;
        }
        let key = combine_path(model_path, name);
        if let Some(cached) = self.textures.get(&key) {
            return cached.clone();
        }

        let texture = match self.loader.load_texture(name, model_path) {
            Ok(texture) => Some(Arc::new(texture)),
            Err(err) => {
                log::warn!("Texture '{name}' of '{model_path}': {err}");
                None
            }
        };
        self.textures.insert(key, texture.clone());
        texture
    }

    pub(crate) fn load_effect(&mut self, name: &str, model_path: &str) -> Option<EffectHandle> {
        if name.is_empty() {
            return None;
        }
        if let Some(&cached) = self.effects.get(name) {
            return cached;
        }

        let effect = match self.loader.load_effect(name, model_path) {
            Ok(effect) => Some(effect),
            Err(err) => {
                log::warn!("Effect '{name}' of '{model_path}': {err}");
                None
            }
        };
        self.effects.insert(name.to_string(), effect);
        effect
    }

    /// Advances the clock and starts a new scene.
    pub fn begin_scene(&mut self) {
        self.timer.tick();
        self.scene += 1;
    }

    #[must_use]
    pub fn scene(&self) -> u64 {
        self.scene
    }

    pub fn animate_faster(&mut self) {
        self.global_speed_adjust = (self.global_speed_adjust * GLOBAL_SPEED_STEP).min(MAX_GLOBAL_SPEED);
    }

    pub fn animate_slower(&mut self) {
        self.global_speed_adjust = (self.global_speed_adjust / GLOBAL_SPEED_STEP).max(MIN_GLOBAL_SPEED);
    }

    #[must_use]
    pub fn global_speed_adjust(&self) -> f32 {
        self.global_speed_adjust
    }

    pub fn set_light_color(&mut self, color: Vec4) {
        self.light_color = color;
    }

    #[must_use]
    pub fn light_color(&self) -> Vec4 {
        self.light_color
    }

    #[must_use]
    pub fn settings(&self) -> &ModelSettings {
        &self.settings
    }

    pub(crate) fn settings_arc(&self) -> Arc<ModelSettings> {
        Arc::clone(&self.settings)
    }

    #[must_use]
    pub fn timer(&self) -> &GameTimer {
        &self.timer
    }

    pub fn timer_mut(&mut self) -> &mut GameTimer {
        &mut self.timer
    }

    /// Current time in milliseconds on the game or the frame timeline.
    #[must_use]
    pub fn tick(&self, use_game_timer: bool) -> u32 {
        if use_game_timer {
            self.timer.game_tick()
        } else {
            self.timer.frame_tick()
        }
    }
}

impl std::fmt::Debug for ModelManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelManager")
            .field("settings", &self.settings)
            .field("files", &self.files.len())
            .field("entities", &self.entities.len())
            .field("textures", &self.textures.len())
            .field("global_speed_adjust", &self.global_speed_adjust)
            .finish_non_exhaustive()
    }
}
