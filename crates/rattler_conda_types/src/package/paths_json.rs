//! `info/paths.json` — the file manifest written alongside every extracted
//! package, used by the "not linked" hard-link heuristic.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// The kind of filesystem entry a [`PathsEntry`] describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathType {
    HardLink,
    SoftLink,
    Directory,
}

/// A single entry in `info/paths.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathsEntry {
    #[serde(rename = "_path")]
    pub path: String,
    pub path_type: PathType,
    #[serde(default)]
    pub size_in_bytes: Option<u64>,
    #[serde(default)]
    pub sha256: Option<String>,
    /// Other paths in the package sharing the same inode as this one (a
    /// package may install the same content at multiple paths via a hard
    /// link internally). Used to tell "this file has extra hardlinks
    /// because the package itself links to itself" apart from "this file
    /// has extra hardlinks because an environment links to it".
    #[serde(default)]
    pub inode_paths: Vec<String>,
}

/// The full file manifest for an extracted package.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PathsJson {
    #[serde(default)]
    pub paths: Vec<PathsEntry>,
}

impl PathsJson {
    /// Reads and parses `<extracted_dir>/info/paths.json`.
    pub fn from_extracted_dir(extracted_dir: &Path) -> std::io::Result<Self> {
        let path = extracted_dir.join("info").join("paths.json");
        let contents = std::fs::read(path)?;
        serde_json::from_slice(&contents)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }
}
