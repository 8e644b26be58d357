//! `CacheEntry`, a `PackageRef` plus where it lives on disk.

use std::path::PathBuf;

use url::Url;

use crate::package_ref::PackageRef;

/// One package artifact, known to a single cache root.
///
/// Invariant: at least one of `tarball_path`, `extracted_dir` is `Some`.
/// When both are present, `extracted_dir` is `tarball_path` with the
/// tarball extension stripped.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub reference: PackageRef,
    pub tarball_path: Option<PathBuf>,
    pub extracted_dir: Option<PathBuf>,
    pub md5: Option<String>,
    pub size: Option<u64>,
    pub origin_url: Option<Url>,
}

impl CacheEntry {
    /// `true` if the tarball is present on disk.
    pub fn is_fetched(&self) -> bool {
        self.tarball_path.as_deref().is_some_and(|p| p.is_file())
    }

    /// `true` if the extracted directory has a readable `info/index.json`.
    pub fn is_extracted(&self) -> bool {
        self.extracted_dir
            .as_deref()
            .is_some_and(|dir| dir.join("info").join("index.json").is_file())
    }
}
