//! The error kinds

use std::path::PathBuf;

use crate::package_ref::PackageRef;

/// Errors produced by the cache core.
///
/// One enum covers planning, scanning and action execution, the way
/// `rattler_package_streaming::ExtractError` covers its own crate: callers
/// match on the variant they care about and propagate the rest with `?`.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// No configured cache root is writable.
    #[error("no writable cache configured")]
    NoWritableCache,

    /// An archive could not be extracted (truncated download, corrupt
    /// bzip2 stream, malformed tar headers).
    #[error("archive at {path} is corrupt: {source}")]
    CorruptArchive {
        path: PathBuf,
        #[source]
        source: rattler_package_streaming::ExtractError,
    },

    /// A checksum did not match after a fetch.
    #[error("checksum mismatch: expected {expected}, got {actual}")]
    IntegrityMismatch {
        expected: String,
        actual: String,
    },

    /// Neither a tarball nor `info/index.json` could be found for an
    /// extracted-looking directory. Scanner-internal; surfaced only as a
    /// trace log, never returned to a caller, but kept as a variant so
    /// tests can assert on it.
    #[error("no metadata available at {0}")]
    MissingMetadata(PathBuf),

    /// `CacheIndex::get` found no entry and no default was supplied.
    #[error("no cache entry for {0}")]
    EntryNotFound(PackageRef),

    /// Rule R3 was selected but the reference carried no URL.
    #[error("cannot fetch {0}: reference has no url")]
    PlanUnsatisfiable(PackageRef),

    /// One or more refs in a batch failed; this aggregates their errors.
    #[error("{} of {} references failed: {}", .failures.len(), .total, summarize(.failures))]
    PartialFailureBatch {
        total: usize,
        failures: Vec<(PackageRef, String)>,
    },

    /// Propagated from filesystem operations that don't have a more
    /// specific variant above.
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn summarize(failures: &[(PackageRef, String)]) -> String {
    failures
        .iter()
        .map(|(r, e)| format!("{r}: {e}"))
        .collect::<Vec<_>>()
        .join("; ")
}

impl CacheError {
    pub(crate) fn io(path: impl AsRef<std::path::Path>, source: std::io::Error) -> Self {
        CacheError::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}
