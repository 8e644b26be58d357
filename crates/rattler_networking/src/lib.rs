//! Networking primitives shared across the rattler crates.
//!
//! This crate is intentionally narrow: the cache core only needs a retry
//! policy it can hand to a fetch action, not a full authenticated-request
//! stack. See [`retry_policies`].

pub mod retry_policies;
