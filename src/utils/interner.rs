//! Global Name Interner
//!
//! Bone, mesh, texture and model names are compared on every layer
//! resolution pass. They are interned once into compact [`NameHash`]
//! symbols so that lookups become integer comparisons.

use lasso::{Spur, ThreadedRodeo};
use once_cell::sync::Lazy;

/// Global interner instance
static INTERNER: Lazy<ThreadedRodeo> = Lazy::new(ThreadedRodeo::new);

/// Interned name.
///
/// A compact integer identifier that is cheap to compare and hash.
pub type NameHash = Spur;

/// Interns a name and returns its hash.
///
/// Returns the existing hash if the name was already interned.
#[inline]
pub fn intern(s: &str) -> NameHash {
    INTERNER.get_or_intern(s)
}

/// Looks up the hash of an already interned name without allocating.
#[inline]
pub fn get(s: &str) -> Option<NameHash> {
    INTERNER.get(s)
}

/// Resolves a hash back to its name.
#[inline]
pub fn resolve(hash: NameHash) -> &'static str {
    INTERNER.resolve(&hash)
}

/// Interns a mesh selector.
///
/// `"All"` and the empty string select every mesh and map to `None`.
#[must_use]
pub fn mesh_selector(name: &str) -> Option<NameHash> {
    if name.is_empty() || name == "All" {
        None
    } else {
        Some(intern(name))
    }
}

/// Returns `true` when `selector` addresses the mesh owned by `owner`.
#[inline]
#[must_use]
pub fn selects(selector: Option<NameHash>, owner: NameHash) -> bool {
    selector.is_none_or(|name| name == owner)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intern_and_resolve() {
        let s1 = intern("Bip01");
        let s2 = intern("Bip01");
        let s3 = intern("Bip01 Head");

        assert_eq!(s1, s2);
        assert_ne!(s1, s3);

        assert_eq!(resolve(s1), "Bip01");
        assert_eq!(resolve(s3), "Bip01 Head");
    }

    #[test]
    fn test_get() {
        let _ = intern("existing_bone");

        assert!(get("existing_bone").is_some());
        assert!(get("never_interned_bone").is_none());
    }

    #[test]
    fn test_mesh_selector() {
        assert_eq!(mesh_selector("All"), None);
        assert_eq!(mesh_selector(""), None);

        let body = intern("Body");
        assert_eq!(mesh_selector("Body"), Some(body));
        assert!(selects(None, body));
        assert!(selects(Some(body), body));
        assert!(!selects(Some(intern("Head")), body));
    }
}
