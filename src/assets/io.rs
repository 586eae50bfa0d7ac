use std::path::{Path, PathBuf};

use rustc_hash::FxHashMap;

use crate::assets::LayerDataSource;
use crate::errors::{Fo3dError, Result};
use crate::model::description::ModelDescription;

/// JSON model descriptions, from memory or from a directory.
///
/// In-memory entries win over files. Files are read from `root_path`
/// joined with the description name.
#[derive(Debug, Default)]
pub struct JsonDescriptions {
    root_path: Option<PathBuf>,
    sources: FxHashMap<String, String>,
}

impl JsonDescriptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads descriptions from `path`, or from its directory when `path` is a file.
    pub fn from_dir(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let root_path = if path.is_file() {
            path.parent().unwrap_or(Path::new(".")).to_path_buf()
        } else {
            path.to_path_buf()
        };
        Self {
            root_path: Some(root_path),
            sources: FxHashMap::default(),
        }
    }

    #[inline]
    #[must_use]
    pub fn root_path(&self) -> Option<&Path> {
        self.root_path.as_deref()
    }

    /// Registers the JSON text of a description.
    pub fn insert(&mut self, name: &str, json: impl Into<String>) {
        self.sources.insert(name.to_string(), json.into());
    }
}

impl LayerDataSource for JsonDescriptions {
    fn load_description(&mut self, name: &str) -> Result<ModelDescription> {
        if let Some(text) = self.sources.get(name) {
            return ModelDescription::from_json(text);
        }
        let Some(root) = &self.root_path else {
            return Err(Fo3dError::ModelNotFound(name.to_string()));
        };
        let text = std::fs::read_to_string(root.join(name))?;
        ModelDescription::from_json(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_sources() {
        let mut source = JsonDescriptions::new();
        source.insert("a.fo3d", r#"{ "model": "a.x", "shadow_disabled": true }"#);

        let desc = source.load_description("a.fo3d").unwrap();
        assert_eq!(desc.model, "a.x");
        assert!(desc.shadow_disabled);
        assert!(matches!(source.load_description("b.fo3d"), Err(Fo3dError::ModelNotFound(_))));
    }

    #[test]
    fn malformed_json_is_an_error() {
        let mut source = JsonDescriptions::new();
        source.insert("a.fo3d", "{ model: ");
        assert!(matches!(source.load_description("a.fo3d"), Err(Fo3dError::Json(_))));
    }
}
