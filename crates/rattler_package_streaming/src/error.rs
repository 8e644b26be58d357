//! The error kinds

use std::path::PathBuf;

/// An error that occurred while extracting or downloading a package archive.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    /// The archive could not be read (truncated download, corrupt bzip2
    /// stream, malformed tar headers).
    #[error("could not read archive{}: {1}", format_path(.0))]
    IoError(std::io::Error, Option<PathBuf>),

    /// The destination directory could not be created.
    #[error("could not create destination directory: {0}")]
    CouldNotCreateDestination(std::io::Error),

    /// The archive contained a path that would escape the extraction
    /// directory (a `..`-based traversal, or an absolute symlink target).
    #[error("archive entry '{0}' would extract outside of the destination directory")]
    UnsafeEntryPath(String),

    /// An HTTP request failed while streaming a download.
    #[cfg(feature = "reqwest")]
    #[error(transparent)]
    ReqwestError(#[from] reqwest::Error),

    /// The computed checksum of a downloaded/extracted archive did not
    /// match what was expected.
    #[error("checksum mismatch: expected {expected}, got {actual}")]
    IntegrityMismatch { expected: String, actual: String },

    /// The blocking extraction task was cancelled.
    #[error("the operation was cancelled")]
    Cancelled,
}

fn format_path(path: &Option<PathBuf>) -> String {
    match path {
        Some(path) => format!(" ({})", path.display()),
        None => String::new(),
    }
}

#[cfg(feature = "reqwest")]
impl From<reqwest_middleware::Error> for ExtractError {
    fn from(err: reqwest_middleware::Error) -> Self {
        match err {
            reqwest_middleware::Error::Reqwest(err) => ExtractError::ReqwestError(err),
            reqwest_middleware::Error::Middleware(err) => ExtractError::IoError(
                std::io::Error::new(std::io::ErrorKind::Other, err.to_string()),
                None,
            ),
        }
    }
}
