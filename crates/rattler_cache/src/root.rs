//! `CacheRoot`: one configured cache directory, owning its index and URL
//! log.

use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::config::CacheConfig;
use crate::entry::CacheEntry;
use crate::error::CacheError;
use crate::index::{CacheIndex, QueryPattern};
use crate::package_ref::PackageRef;
use crate::scanner;
use crate::urls_index::UrlsIndex;

/// A single cache directory: its entry index, its URL log, and whether
/// this process can write to it.
///
/// Exclusively owns its `entries` map and `urls_index`:
/// callers reach a root only through [`crate::registry`] or
/// [`crate::multi_cache::MultiCache`], never by constructing one directly
/// outside this crate.
pub struct CacheRoot {
    path: PathBuf,
    config: CacheConfig,
    index: CacheIndex,
    urls_index: Mutex<Option<UrlsIndex>>,
}

impl CacheRoot {
    pub(crate) fn new(path: PathBuf, config: CacheConfig) -> Self {
        CacheRoot {
            path,
            config,
            index: CacheIndex::new(),
            urls_index: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Resolves writability by probing `<root>/<magic_file>`, creating the
    /// directory (and the magic file) if neither exists yet.
    pub fn is_writable(&self) -> bool {
        self.index.is_writable(&self.path, &self.config.magic_file)
    }

    /// Ensures `<channel>/metadata.json` and `<channel>/<subdir>/<magic_file>`
    /// exist, so a fresh new-layout directory this process just created is
    /// recognized by a later scan instead of looking like a stray directory.
    pub fn ensure_channel_markers(&self, channel: &str, subdir: &str) -> Result<(), CacheError> {
        let channel_dir = self.path.join(channel);
        fs::create_dir_all(&channel_dir).map_err(|e| CacheError::io(&channel_dir, e))?;
        let channel_marker = channel_dir.join("metadata.json");
        if !channel_marker.is_file() {
            fs::write(&channel_marker, b"{}\n").map_err(|e| CacheError::io(&channel_marker, e))?;
        }

        let subdir_dir = channel_dir.join(subdir);
        fs::create_dir_all(&subdir_dir).map_err(|e| CacheError::io(&subdir_dir, e))?;
        let magic_path = subdir_dir.join(&self.config.magic_file);
        if !magic_path.is_file() {
            fs::write(&magic_path, b"").map_err(|e| CacheError::io(&magic_path, e))?;
        }
        Ok(())
    }

    fn ensure_urls_index(&self) {
        let mut guard = self.urls_index.lock();
        if guard.is_none() {
            *guard = Some(UrlsIndex::load(&self.path).unwrap_or_default());
        }
    }

    fn ensure_scanned(&self) {
        self.ensure_urls_index();
        let writable = self.is_writable();
        let config = self.config.clone();
        let path = self.path.clone();
        let guard = self.urls_index.lock();
        let urls_index = guard.as_ref().expect("ensured above");
        self.index
            .ensure_scanned(|| scanner::scan(&path, urls_index, &config, writable));
    }

    pub fn insert(&self, entry: CacheEntry) -> Result<(), CacheError> {
        self.ensure_scanned();
        self.index.insert(entry)
    }

    pub fn get(&self, reference: &PackageRef) -> Option<CacheEntry> {
        self.ensure_scanned();
        self.index.get(reference)
    }

    /// Like [`get`](Self::get), but raises [`CacheError::EntryNotFound`]
    /// instead of returning `None`, for callers with no fallback.
    pub fn get_or_err(&self, reference: &PackageRef) -> Result<CacheEntry, CacheError> {
        self.get(reference)
            .ok_or_else(|| CacheError::EntryNotFound(reference.clone()))
    }

    pub fn remove(&self, reference: &PackageRef) -> Option<CacheEntry> {
        self.ensure_scanned();
        self.index.remove(reference)
    }

    pub fn values(&self) -> Vec<CacheEntry> {
        self.ensure_scanned();
        self.index.values()
    }

    pub fn query(&self, pattern: QueryPattern<'_>) -> Vec<CacheEntry> {
        self.ensure_scanned();
        self.index.query(pattern)
    }

    /// Records a URL's origin in this root's `UrlsIndex`.
    pub fn add_url(&self, url: &url::Url) -> Result<(), CacheError> {
        self.ensure_urls_index();
        let mut guard = self.urls_index.lock();
        guard.as_mut().expect("ensured above").add_url(url)
    }

    pub fn get_url(&self, name: &str) -> Option<String> {
        self.ensure_urls_index();
        let guard = self.urls_index.lock();
        guard
            .as_ref()
            .expect("ensured above")
            .get_url(name, &self.config.tarball_ext)
            .map(str::to_owned)
    }
}
