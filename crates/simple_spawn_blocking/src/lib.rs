//! A tiny helper for moving blocking work off an async executor.
//!
//! This purposefully does not try to be a generic thread pool abstraction.
//! It exists so that callers can write `spawn_blocking(|| ...).await?` and get
//! back a [`Cancelled`] error instead of a panic when the blocking task is
//! dropped before it completes, regardless of which async runtime is driving
//! the call.

use std::fmt;

/// The blocking operation was cancelled before it could complete.
///
/// This happens when the underlying executor drops the join handle for the
/// blocking task, for example because the future awaiting it was itself
/// dropped.
#[derive(Debug)]
pub struct Cancelled;

impl fmt::Display for Cancelled {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "the operation was cancelled")
    }
}

impl std::error::Error for Cancelled {}

#[cfg(feature = "tokio")]
mod tokio_impl {
    use super::Cancelled;

    /// Runs `f` on a blocking thread managed by the tokio runtime, returning
    /// [`Cancelled`] if the task panics in a way that indicates the
    /// executor tore it down rather than letting it run to completion.
    pub async fn spawn_blocking<F, T>(f: F) -> Result<T, Cancelled>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        match tokio::task::spawn_blocking(f).await {
            Ok(value) => Ok(value),
            Err(join_error) => match join_error.try_into_panic() {
                Ok(panic) => std::panic::resume_unwind(panic),
                Err(_) => Err(Cancelled),
            },
        }
    }
}

#[cfg(feature = "tokio")]
pub use tokio_impl::spawn_blocking;

#[cfg(all(test, feature = "tokio"))]
mod test {
    use super::*;

    #[tokio::test]
    async fn runs_to_completion() {
        let result = spawn_blocking(|| 1 + 1).await.unwrap();
        assert_eq!(result, 2);
    }
}
