//! Client side of progression sync.
//!
//! Sync is last-write-wins: the client overwrites the server's row with its
//! own state (`push`) or replaces its own state with the server's (`pull`).
//! There is no versioning, so a dropped push leaves the two copies diverged
//! until the next successful one.

mod client;

pub use client::{SyncClient, USER_HEADER};
