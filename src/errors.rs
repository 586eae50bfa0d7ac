//! Error Types
//!
//! This module defines the error types used throughout the engine.
//!
//! # Overview
//!
//! The main error type [`Fo3dError`] covers the failure modes of model loading:
//! - Hierarchy, clip, texture and effect loading failures
//! - Model description failures
//! - I/O and JSON decoding errors
//!
//! Errors never cross the per-frame update/draw boundary. The model manager
//! logs them and turns them into `None` results or empty slots.
//!
//! # Usage
//!
//! ```rust,ignore
//! use fo3d::errors::{Fo3dError, Result};
//!
//! fn load() -> Result<()> {
//!     Err(Fo3dError::ModelNotFound("critter.fo3d".into()))
//! }
//! ```

use thiserror::Error;

/// The main error type for the fo3d engine.
#[derive(Error, Debug)]
pub enum Fo3dError {
    // ========================================================================
    // Model Loading Errors
    // ========================================================================
    /// The requested model (description or hierarchy) was not found.
    #[error("Model not found: {0}")]
    ModelNotFound(String),

    /// The bone hierarchy file could not be loaded or is malformed.
    #[error("Failed to load hierarchy '{path}': {reason}")]
    HierarchyLoad {
        /// Path of the hierarchy file
        path: String,
        /// Loader-provided reason
        reason: String,
    },

    /// An animation clip referenced by a description does not exist.
    #[error("Animation clip '{clip}' not found in '{file}'")]
    ClipNotFound {
        /// File the clip was looked up in
        file: String,
        /// Clip name
        clip: String,
    },

    // ========================================================================
    // Texture & Effect Errors
    // ========================================================================
    /// Texture loading failed.
    #[error("Texture load error: {0}")]
    TextureLoad(String),

    /// Effect loading failed.
    #[error("Effect load error: {0}")]
    EffectLoad(String),

    // ========================================================================
    // Description Errors
    // ========================================================================
    /// The model description is structurally invalid.
    #[error("Invalid model description '{name}': {reason}")]
    Description {
        /// Model name
        name: String,
        /// What is wrong with it
        reason: String,
    },

    /// JSON decoding error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // ========================================================================
    // I/O Errors
    // ========================================================================
    /// File I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Alias for `Result<T, Fo3dError>`.
pub type Result<T> = std::result::Result<T, Fo3dError>;
