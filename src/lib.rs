//! The `actionhub` library crate.
//!
//! Core business logic for the ActionHub task backend: domain models with
//! their persistence operations, JWT authentication (token service,
//! middleware, extractor), outbound email, routing configuration, and the
//! shared error type. The binary in `main.rs` wires these into a running
//! actix-web server.

pub mod auth;
pub mod config;
pub mod email;
pub mod error;
pub mod models;
pub mod routes;

pub use crate::error::AppError;
