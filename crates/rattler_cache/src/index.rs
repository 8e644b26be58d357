//! In-memory index of one root's entries.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use parking_lot::Mutex;
use rattler_conda_types::MatchSpec;

use crate::entry::CacheEntry;
use crate::error::CacheError;
use crate::package_ref::PackageRef;

/// A pattern `query` accepts: either an exact reference, or a predicate
/// over references, as an explicit tagged variant.
#[derive(Clone, Copy)]
pub enum QueryPattern<'a> {
    Ref(&'a PackageRef),
    Spec(&'a MatchSpec),
}

/// `insert`/`get`/`remove`/`query`/`values` over a root's entries, with
/// lazy full-scan initialization and writability resolution.
pub struct CacheIndex {
    entries: Mutex<HashMap<PackageRef, CacheEntry>>,
    scanned: Mutex<bool>,
    writable: Mutex<Option<bool>>,
}

impl CacheIndex {
    pub fn new() -> Self {
        CacheIndex {
            entries: Mutex::new(HashMap::new()),
            scanned: Mutex::new(false),
            writable: Mutex::new(None),
        }
    }

    /// Runs `scan` once, the first time any operation needs the index
    /// populated. Subsequent calls are no-ops.
    pub fn ensure_scanned(&self, scan: impl FnOnce() -> Vec<CacheEntry>) {
        let mut scanned = self.scanned.lock();
        if *scanned {
            return;
        }
        let mut entries = self.entries.lock();
        for entry in scan() {
            entries.insert(entry.reference.clone(), entry);
        }
        *scanned = true;
    }

    /// Inserts `entry`, keyed on its reference, and writes
    /// `repodata_record.json` into its extracted directory if one exists.
    pub fn insert(&self, entry: CacheEntry) -> Result<(), CacheError> {
        if let Some(dir) = &entry.extracted_dir {
            write_repodata_record(dir, &entry)?;
        }
        self.entries.lock().insert(entry.reference.clone(), entry);
        Ok(())
    }

    pub fn get(&self, reference: &PackageRef) -> Option<CacheEntry> {
        self.entries.lock().get(reference).cloned()
    }

    pub fn remove(&self, reference: &PackageRef) -> Option<CacheEntry> {
        self.entries.lock().remove(reference)
    }

    pub fn values(&self) -> Vec<CacheEntry> {
        self.entries.lock().values().cloned().collect()
    }

    /// Entries matching `pattern`: the single equal entry for a `Ref`, or
    /// every entry a `MatchSpec` matches.
    pub fn query(&self, pattern: QueryPattern<'_>) -> Vec<CacheEntry> {
        match pattern {
            QueryPattern::Ref(reference) => self.get(reference).into_iter().collect(),
            QueryPattern::Spec(spec) => self
                .values()
                .into_iter()
                .filter(|e| {
                    spec.matches(
                        &e.reference.name,
                        &e.reference.version.to_string(),
                        &e.reference.build_string,
                    )
                })
                .collect(),
        }
    }

    /// Resolves and caches writability by probing `<root>/<magic_file>`.
    /// If `root` doesn't exist yet, creates it (and the magic file),
    /// treating that as writable. Once resolved, the result is cached for
    /// the lifetime of this index, even if permissions change later.
    pub fn is_writable(&self, root: &Path, magic_file: &str) -> bool {
        let mut writable = self.writable.lock();
        if let Some(value) = *writable {
            return value;
        }
        let value = probe_writable(root, magic_file);
        *writable = Some(value);
        value
    }
}

impl Default for CacheIndex {
    fn default() -> Self {
        Self::new()
    }
}

fn probe_writable(root: &Path, magic_file: &str) -> bool {
    if fs::create_dir_all(root).is_err() {
        return false;
    }
    let magic_path = root.join(magic_file);
    if magic_path.is_file() {
        return fs::OpenOptions::new().append(true).open(&magic_path).is_ok();
    }
    fs::OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(false)
        .open(&magic_path)
        .is_ok()
}

pub(crate) fn write_repodata_record(dir: &Path, entry: &CacheEntry) -> Result<(), CacheError> {
    let info_dir = dir.join("info");
    fs::create_dir_all(&info_dir).map_err(|e| CacheError::io(&info_dir, e))?;

    let record = serde_json::json!({
        "channel": entry.reference.channel,
        "name": entry.reference.name,
        "version": entry.reference.version.to_string(),
        "build": entry.reference.build_string,
        "build_number": entry.reference.build_number,
        "md5": entry.md5,
        "size": entry.size,
        "url": entry.origin_url.as_ref().map(ToString::to_string),
    });

    let path = info_dir.join("repodata_record.json");
    let bytes = serde_json::to_vec_pretty(&record)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
        .map_err(|e| CacheError::io(&path, e))?;
    fs::write(&path, bytes).map_err(|e| CacheError::io(&path, e))
}
