//! Data types shared across the caching crates: the package identity model
//! (`PackageRecord`, `Version`, `Channel`), plus the
//! `MatchSpec` predicate used by `CacheIndex::query` operations.

mod channel;
mod match_spec;
pub mod package;
mod package_record;
mod version;

pub use channel::Channel;
pub use match_spec::{GlobPattern, MatchSpec};
pub use package::{ArchiveIdentifier, ArchiveType, IndexJson, PathType, PathsEntry, PathsJson};
pub use package_record::PackageRecord;
pub use version::Version;
