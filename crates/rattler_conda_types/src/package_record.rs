//! `info/index.json` — the canonical per-package metadata record.

use serde::{Deserialize, Serialize};

/// The subset of `info/index.json` (and, by extension,
/// `info/repodata_record.json`) fields the cache cares about.
///
/// `repodata_record.json` is the same shape plus channel/url/md5 fields
/// that get filled in once a package has been indexed into a cache; we model both with this single struct and simply leave the
/// cache-specific fields `None` until they're known.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageRecord {
    pub name: String,
    pub version: String,
    pub build: String,
    pub build_number: u64,
    #[serde(default)]
    pub subdir: Option<String>,
    #[serde(default)]
    pub depends: Vec<String>,
    #[serde(default)]
    pub constrains: Vec<String>,
    #[serde(default)]
    pub md5: Option<String>,
    #[serde(default)]
    pub sha256: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub timestamp: Option<i64>,
    #[serde(default)]
    pub license: Option<String>,
    #[serde(default)]
    pub noarch: Option<String>,
}

impl PackageRecord {
    /// A stable string identity, matching `PackageRef::dist_str()` without
    /// the channel prefix: `"<name>-<version>-<build>"`.
    pub fn dist_str_no_channel(&self) -> String {
        format!("{}-{}-{}", self.name, self.version, self.build)
    }
}
