//! Async download + extract, streaming the HTTP response straight through a
//! hasher and onto disk before handing the archive to [`crate::tokio::fs`].

pub mod tokio;
