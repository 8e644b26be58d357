//! Adapts the executor's `fraction ∈ [0,1]` progress callback to
//! `rattler_package_streaming`'s byte-counting [`DownloadReporter`].

use rattler_package_streaming::DownloadReporter;

/// Turns downloaded-bytes/total-bytes into a `[0,1]` fraction and forwards
/// it to the action's own progress callback.
pub struct ScaledProgress<'a> {
    progress_cb: &'a dyn Fn(f32),
}

impl<'a> ScaledProgress<'a> {
    pub fn new(progress_cb: &'a dyn Fn(f32)) -> Self {
        ScaledProgress { progress_cb }
    }
}

impl DownloadReporter for ScaledProgress<'_> {
    fn on_download_progress(&self, bytes_downloaded: u64, total_bytes: Option<u64>) {
        let fraction = match total_bytes {
            Some(total) if total > 0 => (bytes_downloaded as f32 / total as f32).min(1.0),
            _ => 0.0,
        };
        (self.progress_cb)(fraction);
    }

    fn on_download_complete(&self) {
        (self.progress_cb)(1.0);
    }
}
