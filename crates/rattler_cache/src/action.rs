//! Reversible unit operations: `FetchAction` and `ExtractAction`.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use url::Url;

use crate::config::CacheConfig;
use crate::download_progress::ScaledProgress;
use crate::entry::CacheEntry;
use crate::error::CacheError;
use crate::package_ref::PackageRef;
use crate::registry;
use crate::root::CacheRoot;

/// The four-phase contract every action implements.
///
/// `execute` reports fractional progress through `progress_cb`; it is
/// called at least once, at completion. `reverse` must be safe to call
/// even if `execute` never ran.
pub trait Action: Send + Sync {
    async fn verify(&self) -> Result<(), CacheError>;
    async fn execute(&self, progress_cb: &dyn Fn(f32)) -> Result<(), CacheError>;
    async fn reverse(&self) -> Result<(), CacheError>;
    async fn cleanup(&self) -> Result<(), CacheError>;
}

/// Downloads `url` to `<target_root>/[<channel>/<subdir>/]<basename>`.
///
/// Carries the target root by path, not by owning handle: an action is a
/// plain, cheaply-clonable description of work, resolved against the
/// process-wide registry only when it actually runs.
pub struct FetchAction {
    pub url: Url,
    pub target_root_path: PathBuf,
    pub target_root_config: CacheConfig,
    pub channel: Option<String>,
    pub subdir: Option<String>,
    pub basename: String,
    pub md5: Option<String>,
    pub expected_size: Option<u64>,
}

impl FetchAction {
    fn target_root(&self) -> Arc<CacheRoot> {
        registry::get_or_create(&self.target_root_path, self.target_root_config.clone())
    }

    fn destination(&self) -> PathBuf {
        let root: &Path = &self.target_root_path;
        match (&self.channel, &self.subdir) {
            (Some(c), Some(s)) => root.join(c).join(s).join(&self.basename),
            _ => root.join(&self.basename),
        }
    }
}

impl Action for FetchAction {
    async fn verify(&self) -> Result<(), CacheError> {
        if let (Some(c), Some(s)) = (&self.channel, &self.subdir) {
            self.target_root().ensure_channel_markers(c, s)?;
        } else if let Some(parent) = self.destination().parent() {
            fs::create_dir_all(parent).map_err(|e| CacheError::io(parent, e))?;
        }
        Ok(())
    }

    async fn execute(&self, progress_cb: &dyn Fn(f32)) -> Result<(), CacheError> {
        let destination = self.destination();

        if self.url.scheme() == "file" {
            let source = self
                .url
                .to_file_path()
                .map_err(|()| CacheError::io(&destination, std::io::Error::other("bad file:// url")))?;
            fs::copy(&source, &destination).map_err(|e| CacheError::io(&destination, e))?;
            progress_cb(1.0);
        } else {
            let retry_policy = rattler_networking::retry_policies::ExponentialBackoffBuilder::default()
                .min_retry_interval(std::time::Duration::from_millis(250))
                .max_retry_interval(std::time::Duration::from_secs(10))
                .build_with_max_retries(3);
            let client = reqwest_middleware::ClientBuilder::new(reqwest::Client::new())
                .with(reqwest_retry::RetryTransientMiddleware::new_with_policy(retry_policy))
                .build();
            let reporter = ScaledProgress::new(progress_cb);
            rattler_package_streaming::reqwest::tokio::download(&client, &self.url, &destination, &reporter)
                .await
                .map_err(|source| CacheError::CorruptArchive {
                    path: destination.clone(),
                    source,
                })?;

            if let Some(expected) = &self.md5 {
                let actual = rattler_digest::compute_file_digest::<rattler_digest::Md5>(&destination)
                    .map(|d| rattler_digest::digest_to_hex::<rattler_digest::Md5>(&d))
                    .map_err(|e| CacheError::io(&destination, e))?;
                if !expected.eq_ignore_ascii_case(&actual) {
                    let _ = fs::remove_file(&destination);
                    return Err(CacheError::IntegrityMismatch {
                        expected: expected.clone(),
                        actual,
                    });
                }
            }
        }

        self.target_root().add_url(&self.url)?;
        Ok(())
    }

    async fn reverse(&self) -> Result<(), CacheError> {
        let _ = fs::remove_file(self.destination());
        Ok(())
    }

    async fn cleanup(&self) -> Result<(), CacheError> {
        Ok(())
    }
}


/// Extracts `source_tarball` into
/// `<target_root>/[<channel>/<subdir>/]<extracted_dirname>`.
///
/// Carries the target root by path, not by owning handle, for the same
/// reason as [`FetchAction`].
pub struct ExtractAction {
    pub source_tarball: PathBuf,
    pub target_root_path: PathBuf,
    pub target_root_config: CacheConfig,
    pub channel: Option<String>,
    pub subdir: Option<String>,
    pub extracted_dirname: String,
    pub md5: Option<String>,
    pub size: Option<u64>,
    pub origin_url: Option<Url>,
}

impl ExtractAction {
    fn target_root(&self) -> Arc<CacheRoot> {
        registry::get_or_create(&self.target_root_path, self.target_root_config.clone())
    }

    fn destination(&self) -> PathBuf {
        let root: &Path = &self.target_root_path;
        match (&self.channel, &self.subdir) {
            (Some(c), Some(s)) => root.join(c).join(s).join(&self.extracted_dirname),
            _ => root.join(&self.extracted_dirname),
        }
    }
}

impl Action for ExtractAction {
    async fn verify(&self) -> Result<(), CacheError> {
        if !self.source_tarball.is_file() {
            return Err(CacheError::io(
                &self.source_tarball,
                std::io::Error::new(std::io::ErrorKind::NotFound, "source tarball missing"),
            ));
        }
        if let (Some(c), Some(s)) = (&self.channel, &self.subdir) {
            self.target_root().ensure_channel_markers(c, s)?;
        }
        Ok(())
    }

    async fn execute(&self, progress_cb: &dyn Fn(f32)) -> Result<(), CacheError> {
        let destination = self.destination();
        rattler_package_streaming::tokio::fs::extract(&self.source_tarball, &destination)
            .await
            .map_err(|source| CacheError::CorruptArchive {
                path: self.source_tarball.clone(),
                source,
            })?;
        progress_cb(1.0);

        let record = rattler_conda_types::package::read_index_json(&destination)
            .map_err(|e| CacheError::io(&destination, e))?;

        let reference = PackageRef {
            channel: self.channel.clone().unwrap_or_else(|| record.channel.clone().unwrap_or_default()),
            name: record.name.clone(),
            version: record.version.parse().expect("version parsing is infallible"),
            build_string: record.build.clone(),
            build_number: record.build_number,
            subdir: self.subdir.clone(),
            filename: self
                .source_tarball
                .file_name()
                .map(|n| n.to_string_lossy().into_owned()),
            md5: self.md5.clone(),
            size: self.size,
            url: self.origin_url.clone(),
        };

        self.target_root().insert(CacheEntry {
            reference,
            tarball_path: Some(self.source_tarball.clone()),
            extracted_dir: Some(destination),
            md5: self.md5.clone(),
            size: self.size,
            origin_url: self.origin_url.clone(),
        })
    }

    async fn reverse(&self) -> Result<(), CacheError> {
        let _ = fs::remove_dir_all(self.destination());
        Ok(())
    }

    async fn cleanup(&self) -> Result<(), CacheError> {
        Ok(())
    }
}
