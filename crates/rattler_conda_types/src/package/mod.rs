//! Archive identification and the on-disk `info/` files the scanner reads.

mod archive_identifier;
mod index_json;
mod paths_json;

pub use archive_identifier::{ArchiveIdentifier, ArchiveType};
pub use index_json::{read_index_json, read_index_json_from_tar_bz2, read_repodata_record, IndexJson};
pub use paths_json::{PathType, PathsEntry, PathsJson};
