//! Identifies a package from its tarball filename or path.

use std::path::Path;

/// The one archive format this spec supports end to end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveType {
    TarBz2,
}

impl ArchiveType {
    /// The literal filename suffix for this archive type.
    pub const fn extension(self) -> &'static str {
        match self {
            ArchiveType::TarBz2 => ".tar.bz2",
        }
    }
}

/// The `name-version-build` triple parsed out of a tarball filename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveIdentifier {
    pub name: String,
    pub version: String,
    pub build_string: String,
    pub archive_type: ArchiveType,
}

impl ArchiveIdentifier {
    /// Parses an identifier from a full filesystem path.
    pub fn try_from_path(path: &Path) -> Option<Self> {
        Self::try_from_filename(path.file_name()?.to_str()?)
    }

    /// Parses an identifier from a bare filename, e.g.
    /// `"numpy-1.24.0-py311h0.tar.bz2"`.
    pub fn try_from_filename(filename: &str) -> Option<Self> {
        let stem = filename.strip_suffix(ArchiveType::TarBz2.extension())?;
        let mut parts = stem.rsplitn(3, '-');
        let build_string = parts.next()?.to_string();
        let version = parts.next()?.to_string();
        let name = parts.next()?.to_string();
        if name.is_empty() {
            return None;
        }
        Some(Self {
            name,
            version,
            build_string,
            archive_type: ArchiveType::TarBz2,
        })
    }

    /// Reconstructs the canonical tarball basename, e.g.
    /// `"numpy-1.24.0-py311h0.tar.bz2"`.
    pub fn filename(&self) -> String {
        format!(
            "{}-{}-{}{}",
            self.name,
            self.version,
            self.build_string,
            self.archive_type.extension()
        )
    }
}
