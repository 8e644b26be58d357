//! Reading `info/index.json`, from either an extracted directory or
//! straight out of a tarball stream.

use std::io::Read;
use std::path::Path;

use crate::PackageRecord;

/// The parsed contents of an `info/index.json` file.
///
/// This is currently just an alias for [`PackageRecord`]'s shape: the
/// cache-specific fields (`md5`, `url`, `channel`) are simply absent until
/// the scanner fills them in from the tarball and the urls index.
pub type IndexJson = PackageRecord;

/// Reads and parses `<extracted_dir>/info/index.json`.
pub fn read_index_json(extracted_dir: &Path) -> std::io::Result<IndexJson> {
    let path = extracted_dir.join("info").join("index.json");
    let contents = std::fs::read(path)?;
    serde_json::from_slice(&contents)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
}

/// Reads and parses `<extracted_dir>/info/repodata_record.json`.
pub fn read_repodata_record(extracted_dir: &Path) -> std::io::Result<IndexJson> {
    let path = extracted_dir.join("info").join("repodata_record.json");
    let contents = std::fs::read(path)?;
    serde_json::from_slice(&contents)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
}

/// Reads `info/index.json` directly out of a (decompressed) tar stream,
/// without extracting the whole archive — used when the target cache root
/// is read-only.
pub fn read_index_json_from_tar_bz2<R: Read>(reader: R) -> std::io::Result<IndexJson> {
    let decompressed = bzip2::read::BzDecoder::new(reader);
    let mut archive = tar::Archive::new(decompressed);
    for entry in archive.entries()? {
        let mut entry = entry?;
        if entry.path()?.as_ref() == Path::new("info/index.json") {
            let mut contents = Vec::new();
            entry.read_to_end(&mut contents)?;
            return serde_json::from_slice(&contents)
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e));
        }
    }
    Err(std::io::Error::new(
        std::io::ErrorKind::NotFound,
        "info/index.json not found in archive",
    ))
}
