//! Streams an HTTP response onto disk, hashing as it goes.

use std::path::Path;

use futures::StreamExt;
use rattler_digest::{digest_to_hex, Digest, Sha256};
use tokio::io::AsyncWriteExt;
use url::Url;

use crate::download_reporter::DownloadReporter;
use crate::error::ExtractError;

/// Downloads `url` straight to `destination`, reporting progress via
/// `reporter` as each chunk arrives. Returns the sha256 hex digest of what
/// was written, so a caller can verify it without a second pass over the
/// file.
pub async fn download(
    client: &reqwest_middleware::ClientWithMiddleware,
    url: &Url,
    destination: &Path,
    reporter: &dyn DownloadReporter,
) -> Result<String, ExtractError> {
    let response = client.get(url.clone()).send().await?.error_for_status()?;
    let total_bytes = response.content_length();
    reporter.on_download_start();

    if let Some(parent) = destination.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(ExtractError::CouldNotCreateDestination)?;
    }
    let mut file = tokio::fs::File::create(destination)
        .await
        .map_err(ExtractError::CouldNotCreateDestination)?;

    let mut hasher = Sha256::new();
    let mut downloaded = 0u64;
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        hasher.update(&chunk);
        downloaded += chunk.len() as u64;
        file.write_all(&chunk)
            .await
            .map_err(|e| ExtractError::IoError(e, Some(destination.to_path_buf())))?;
        reporter.on_download_progress(downloaded, total_bytes);
    }
    file.flush()
        .await
        .map_err(|e| ExtractError::IoError(e, Some(destination.to_path_buf())))?;

    reporter.on_download_complete();
    Ok(digest_to_hex::<Sha256>(&hasher.finalize()))
}

/// Downloads `url`, verifies its sha256 against `expected_sha256` (when
/// given), and extracts it into `destination`. A convenience wrapper
/// around [`download`] for callers that don't need the tarball kept around
/// once extracted.
pub async fn extract(
    client: &reqwest_middleware::ClientWithMiddleware,
    url: &Url,
    destination: &Path,
    expected_sha256: Option<&str>,
    reporter: &dyn DownloadReporter,
) -> Result<(), ExtractError> {
    let temp_file =
        tempfile::NamedTempFile::new().map_err(ExtractError::CouldNotCreateDestination)?;

    let actual = download(client, url, temp_file.path(), reporter).await?;
    if let Some(expected) = expected_sha256 {
        if !expected.eq_ignore_ascii_case(&actual) {
            return Err(ExtractError::IntegrityMismatch {
                expected: expected.to_string(),
                actual,
            });
        }
    }

    crate::tokio::fs::extract(temp_file.path(), destination).await
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::download_reporter::NoopReporter;
    use axum::{routing::get, Router};
    use std::io::Write;

    fn sample_tarball_bytes() -> Vec<u8> {
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
        encoder.finish().unwrap()
    }

    fn spawn_server(body: Vec<u8>) -> std::net::SocketAddr {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.set_nonblocking(true).unwrap();
        let addr = listener.local_addr().unwrap();
        let listener = ::tokio::net::TcpListener::from_std(listener).unwrap();
        let app = Router::new().route(
            "/demo-1.0-0.tar.bz2",
            get(move || {
                let body = body.clone();
                async move { body }
            }),
        );
        ::tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr
    }

    #[tokio::test]
    async fn downloads_bytes_verbatim() {
        let body = sample_tarball_bytes();
        let addr = spawn_server(body.clone());

        let client = reqwest_middleware::ClientBuilder::new(reqwest::Client::new()).build();
        let url = Url::parse(&format!("http://{addr}/demo-1.0-0.tar.bz2")).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let destination = dir.path().join("demo-1.0-0.tar.bz2");

        let digest = download(&client, &url, &destination, &NoopReporter).await.unwrap();

        assert_eq!(std::fs::read(&destination).unwrap(), body);
        let mut hasher = Sha256::new();
        hasher.update(&body);
        assert_eq!(digest, digest_to_hex::<Sha256>(&hasher.finalize()));
    }

    #[tokio::test]
    async fn downloads_verifies_and_extracts() {
        let body = sample_tarball_bytes();
        let expected_sha256 = {
            let mut hasher = Sha256::new();
            hasher.update(&body);
            digest_to_hex::<Sha256>(&hasher.finalize())
        };
        let addr = spawn_server(body);

        let client = reqwest_middleware::ClientBuilder::new(reqwest::Client::new()).build();
        let url = Url::parse(&format!("http://{addr}/demo-1.0-0.tar.bz2")).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let destination = dir.path().join("extracted");

        extract(
            &client,
            &url,
            &destination,
            Some(&expected_sha256),
            &NoopReporter,
        )
        .await
        .unwrap();

        assert!(destination.join("info/index.json").is_file());
    }

    #[tokio::test]
    async fn rejects_mismatched_checksum() {
        let body = sample_tarball_bytes();
        let addr = spawn_server(body);

        let client = reqwest_middleware::ClientBuilder::new(reqwest::Client::new()).build();
        let url = Url::parse(&format!("http://{addr}/demo-1.0-0.tar.bz2")).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let destination = dir.path().join("extracted");

        let err = extract(
            &client,
            &url,
            &destination,
            Some("0000000000000000000000000000000000000000000000000000000000000000"),
            &NoopReporter,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, ExtractError::IntegrityMismatch { .. }));
    }
}
