//! Extraction and streaming download of conda package archives.
//!
//! This crate knows nothing about the cache: it turns a `.tar.bz2` on disk,
//! or a URL, into an extracted directory on disk. `rattler_cache`'s
//! [`FetchAction`/`ExtractAction`](../rattler_cache/index.html) drive it.

pub mod download_reporter;
pub mod error;
pub mod fs;
pub mod read;
#[cfg(feature = "reqwest")]
pub mod reqwest;
pub mod tokio;

pub use download_reporter::{DownloadReporter, NoopReporter};
pub use error::ExtractError;
