//! Process-wide interning of `CacheRoot` handles by path.
//!
//! A plain registry keyed by normalized path: a factory function returns
//! the existing handle for a path it has already seen, or constructs one.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::CacheConfig;
use crate::root::CacheRoot;

static REGISTRY: Mutex<Option<HashMap<PathBuf, Arc<CacheRoot>>>> = Mutex::new(None);

/// Returns the `CacheRoot` handle for `path`, constructing it (with
/// `config`) the first time this path is seen. Later calls with the same
/// path ignore `config` and return the existing handle: construction is
/// idempotent.
pub fn get_or_create(path: &Path, config: CacheConfig) -> Arc<CacheRoot> {
    let normalized = normalize(path);
    let mut registry = REGISTRY.lock();
    let map = registry.get_or_insert_with(HashMap::new);
    map.entry(normalized)
        .or_insert_with(|| Arc::new(CacheRoot::new(path.to_path_buf(), config)))
        .clone()
}

/// Resets the registry. Test support only: production code never needs to
/// forget a root within a process lifetime.
pub fn clear() {
    let mut registry = REGISTRY.lock();
    *registry = None;
}

fn normalize(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn same_path_returns_the_same_handle() {
        clear();
        let dir = tempfile::tempdir().unwrap();

        let a = get_or_create(dir.path(), CacheConfig::default());
        let b = get_or_create(dir.path(), CacheConfig::default());

        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn clear_forgets_previously_registered_roots() {
        clear();
        let dir = tempfile::tempdir().unwrap();

        let a = get_or_create(dir.path(), CacheConfig::default());
        clear();
        let b = get_or_create(dir.path(), CacheConfig::default());

        assert!(!Arc::ptr_eq(&a, &b));
    }
}
