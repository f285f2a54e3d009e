//! Questlog REST backend.
//!
//! Holds the authoritative copy of every user's progression and tasks.
//! Reward endpoints run the same tracker as the client, against the
//! user's stats row, inside one transaction per request.

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;
pub mod server;

pub use config::ServerArgs;
pub use error::ApiError;
pub use server::{router, run, AppState, SharedState};
