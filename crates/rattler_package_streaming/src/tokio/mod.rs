//! Async wrappers around the blocking extraction routines, built on
//! `simple_spawn_blocking` so callers never block the tokio runtime's
//! worker threads.

pub mod fs;
