//! Async entry point for extracting a tarball already resident on disk.

use std::path::{Path, PathBuf};

use crate::error::ExtractError;

/// Extracts `archive_path` into `destination` on a blocking thread.
pub async fn extract(archive_path: &Path, destination: &Path) -> Result<(), ExtractError> {
    let archive_path: PathBuf = archive_path.to_path_buf();
    let destination: PathBuf = destination.to_path_buf();
    simple_spawn_blocking::spawn_blocking(move || crate::fs::extract(&archive_path, &destination))
        .await
        .map_err(|_cancelled| ExtractError::Cancelled)?
}

#[cfg(test)]
mod test {
    use super::*;
    use std::io::Write;

    fn write_sample_tarball(path: &Path) {
        let mut builder = tar::Builder::new(Vec::new());
        let data = b"{}";
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
        std::fs::write(path, encoder.finish().unwrap()).unwrap();
    }

    #[tokio::test]
    async fn extracts_on_a_blocking_thread() {
        let dir = tempfile::tempdir().unwrap();
        let archive_path = dir.path().join("demo-1.0-0.tar.bz2");
        write_sample_tarball(&archive_path);

        let destination = dir.path().join("extracted");
        extract(&archive_path, &destination).await.unwrap();

        assert!(destination.join("info/index.json").is_file());
    }
}
