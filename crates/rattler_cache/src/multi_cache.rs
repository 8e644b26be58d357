//! An ordered collection of cache roots.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::CacheConfig;
use crate::entry::CacheEntry;
use crate::error::CacheError;
use crate::index::QueryPattern;
use crate::package_ref::PackageRef;
use crate::planner::{self, Plan};
use crate::registry;
use crate::root::CacheRoot;

/// The ordered list of configured cache roots a client plans and queries
/// against.
pub struct MultiCache {
    roots: Vec<Arc<CacheRoot>>,
}

impl MultiCache {
    /// Resolves each path to its (process-interned) `CacheRoot` handle, in
    /// the order given.
    pub fn new(paths: &[PathBuf], config: CacheConfig) -> Self {
        let roots = paths
            .iter()
            .map(|p| registry::get_or_create(p, config.clone()))
            .collect();
        MultiCache { roots }
    }

    /// Writable roots, in declared order.
    pub fn writable_caches(&self) -> Vec<Arc<CacheRoot>> {
        self.roots.iter().filter(|r| r.is_writable()).cloned().collect()
    }

    /// Read-only roots, in declared order.
    pub fn read_only_caches(&self) -> Vec<Arc<CacheRoot>> {
        self.roots.iter().filter(|r| !r.is_writable()).cloned().collect()
    }

    /// Entries matching `pattern` across every root, writable roots first.
    pub fn query_all(&self, pattern: QueryPattern<'_>) -> Vec<CacheEntry> {
        self.writable_caches()
            .into_iter()
            .chain(self.read_only_caches())
            .flat_map(|root| root.query(pattern))
            .collect()
    }

    /// The first extracted entry matching `reference`, writable caches
    /// first. Falls back to a [`PackageRef::dist_str_no_channel`] scan if
    /// no exact match is extracted, to tolerate refs whose channel
    /// provenance is unknown.
    pub fn entry_to_link(&self, reference: &PackageRef) -> Option<CacheEntry> {
        let ordered = self.writable_caches().into_iter().chain(self.read_only_caches());
        for root in ordered {
            if let Some(entry) = root.query(QueryPattern::Ref(reference)).into_iter().next() {
                if entry.is_extracted() {
                    return Some(entry);
                }
            }
        }

        let target = reference.dist_str_no_channel();
        for root in self.writable_caches().into_iter().chain(self.read_only_caches()) {
            if let Some(entry) = root
                .values()
                .into_iter()
                .find(|e| e.is_extracted() && e.reference.dist_str_no_channel() == target)
            {
                return Some(entry);
            }
        }
        None
    }

    /// Plans work for every ref, applying the R0–R3 ladder per ref against
    /// this cache's current writable/read-only roots.
    pub fn plan(&self, refs: &[PackageRef]) -> Result<Vec<(PackageRef, Plan)>, CacheError> {
        let writable = self.writable_caches();
        let read_only = self.read_only_caches();
        refs.iter()
            .map(|r| planner::plan_one(r, &writable, &read_only).map(|plan| (r.clone(), plan)))
            .collect()
    }

    /// Finds the cache entry (in any configured root, excluding
    /// `exclude`) that already holds the exact bytes at `tarball_path`,
    /// identified by content hash rather than name.
    pub fn tarball_file_in_cache(&self, tarball_path: &Path, md5: Option<&str>, exclude: &[PathBuf]) -> Option<CacheEntry> {
        let md5 = md5
            .map(str::to_owned)
            .or_else(|| {
                rattler_digest::compute_file_digest::<rattler_digest::Md5>(tarball_path)
                    .ok()
                    .map(|d| rattler_digest::digest_to_hex::<rattler_digest::Md5>(&d))
            })?;
        self.roots
            .iter()
            .filter(|r| !exclude.contains(&r.path().to_path_buf()))
            .find_map(|r| tarball_file_in_this_cache(r, &md5))
    }

    /// Every fetched entry across all configured roots.
    pub fn pcrecs_with_tarballs(&self) -> Vec<CacheEntry> {
        self.roots.iter().flat_map(|r| r.values()).filter(CacheEntry::is_fetched).collect()
    }

    /// Every extracted entry across all configured roots.
    pub fn pcrecs_extracted(&self) -> Vec<CacheEntry> {
        self.roots.iter().flat_map(|r| r.values()).filter(CacheEntry::is_extracted).collect()
    }

    /// Every extracted entry across all configured roots (alias kept for
    /// garbage-collection-adjacent tooling that wants the full set rather
    /// than filtering by in-use status).
    pub fn get_all_extracted_entries(&self) -> Vec<CacheEntry> {
        self.pcrecs_extracted()
    }

    /// Extracted entries whose hard-link count suggests no environment
    /// currently links to them. Approximate: a consumer that
    /// reached the file through a symlink rather than a hard link is
    /// undetectable by this heuristic. Detection only, no deletion.
    pub fn pcrecs_not_linked(&self) -> Vec<CacheEntry> {
        self.pcrecs_extracted()
            .into_iter()
            .filter(|e| crate::linked::is_not_linked(e))
            .collect()
    }
}

/// Searches a single root for an entry whose tarball's md5 equals `md5`.
fn tarball_file_in_this_cache(root: &Arc<CacheRoot>, md5: &str) -> Option<CacheEntry> {
    root.values().into_iter().find(|e| e.md5.as_deref() == Some(md5) && e.is_fetched())
}
