//! A progress callback passed down from [`PipelineExecutor`](../index.html) to
//! the streamed download, so a single progress bar can span the fetch and
//! extract halves of an action.

/// Receives progress notifications while a package is downloaded.
///
/// Implementors typically drive an `indicatif` progress bar. The default
/// methods do nothing, so a caller that only cares about one callback can
/// implement just that one.
pub trait DownloadReporter: Send + Sync {
    /// Called once, right before the first byte of the response body is read.
    fn on_download_start(&self) {}

    /// Called after each chunk of the response body is read.
    ///
    /// `bytes_downloaded` is the cumulative number of bytes read so far;
    /// `total_bytes` is `Some(n)` when the server reported a `Content-Length`.
    fn on_download_progress(&self, bytes_downloaded: u64, total_bytes: Option<u64>) {
        let _ = (bytes_downloaded, total_bytes);
    }

    /// Called once the response body has been fully read and verified.
    fn on_download_complete(&self) {}
}

/// A [`DownloadReporter`] that reports to nobody, for callers that don't
/// need progress feedback.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopReporter;

impl DownloadReporter for NoopReporter {}
