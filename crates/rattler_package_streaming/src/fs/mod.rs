//! Blocking, filesystem-based extraction. Used directly by the scanner
//! when repairing a partial extraction, and wrapped by [`crate::tokio::fs`]
//! for callers on an async runtime.

use std::fs::File;
use std::path::Path;

use crate::error::ExtractError;
use crate::read::{extract_archive, stream_tar_bz2};

/// Extracts the `.tar.bz2` archive at `archive_path` into `destination`.
///
/// Blocks the calling thread for the duration of the extraction. Extraction
/// happens into `destination` directly, no staging directory: a partially
/// written destination left behind by a crash is what the scanner's partial-
/// extraction repair is for.
pub fn extract(archive_path: &Path, destination: &Path) -> Result<(), ExtractError> {
    let file = File::open(archive_path)
        .map_err(|e| ExtractError::IoError(e, Some(archive_path.to_path_buf())))?;
    let mut archive = stream_tar_bz2(file);
    extract_archive(&mut archive, destination)
}

#[cfg(test)]
mod test {
    use super::*;
    use std::io::Write;

    fn write_sample_tarball(path: &Path) {
        let mut builder = tar::Builder::new(Vec::new());
        let data = b"{\"name\":\"demo\"}";
        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, "info/index.json", &data[..])
            .unwrap();
        let tar_bytes = builder.into_inner().unwrap();

        let mut encoder = bzip2::write::BzEncoder::new(Vec::new(), bzip2::Compression::fast());
        encoder.write_all(&tar_bytes).unwrap();
        let compressed = encoder.finish().unwrap();

        std::fs::write(path, compressed).unwrap();
    }

    #[test]
    fn extracts_tarball_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let archive_path = dir.path().join("demo-1.0-0.tar.bz2");
        write_sample_tarball(&archive_path);

        let destination = dir.path().join("extracted");
        extract(&archive_path, &destination).unwrap();

        assert!(destination.join("info/index.json").is_file());
    }
}
