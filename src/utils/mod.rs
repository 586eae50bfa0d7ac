//! Utility Module
//!
//! - [`interner`]: Name interning for bones, meshes and textures
//! - [`time`]: Millisecond playback clock
//!
//! # Name Interning
//!
//! Bone and mesh names are interned into [`NameHash`] symbols once at load
//! time. Interned names compare in O(1).
//!
//! ```rust,ignore
//! use fo3d::utils::interner;
//!
//! let a = interner::intern("Bip01 Head");
//! let b = interner::intern("Bip01 Head");
//! assert_eq!(a, b);
//! ```

pub mod interner;
pub mod time;

pub use interner::NameHash;
pub use time::GameTimer;

/// Resolves `relative` against the directory of `base`.
///
/// `combine_path("critters/human.fo3d", "hat.fo3d")` yields `critters/hat.fo3d`.
#[must_use]
pub fn combine_path(base: &str, relative: &str) -> String {
    match base.rfind(['/', '\\']) {
        Some(pos) => format!("{}/{}", &base[..pos], relative),
        None => relative.to_string(),
    }
}

/// Returns the lowercase file extension of `name`, if any.
#[must_use]
pub fn file_extension(name: &str) -> Option<String> {
    let file = name.rsplit(['/', '\\']).next().unwrap_or(name);
    file.rfind('.')
        .map(|pos| file[pos + 1..].to_ascii_lowercase())
        .filter(|ext| !ext.is_empty())
}
