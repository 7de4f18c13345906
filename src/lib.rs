//! booktrack-rs: a REST backend for personal book tracking.
//!
//! Users register and authenticate, search an external book catalog, and
//! keep a per-user library of wishlist/owned books with reading progress.
//! Catalog records are mirrored into a local SQLite cache on first
//! reference so library state never points at an unknown book.
//!
//! # Features
//!
//! - User accounts with signed stateless session tokens
//! - Login lockout after repeated failures
//! - Catalog search with write-through mirroring
//! - Local cached search over the mirror
//! - Per-user library with status and page progress

#![forbid(unsafe_code)]
#![warn(missing_docs)]

/// Authentication and account management.
pub mod auth;
/// External catalog client.
pub mod catalog;
/// Configuration and CLI.
pub mod config;
/// Database operations.
pub mod db;
/// Error types.
pub mod error;
/// Per-user library ledger.
pub mod library;
/// Local catalog mirror.
pub mod mirror;
/// HTTP server.
pub mod server;
/// Session token issuing and verification.
pub mod token;

#[cfg(test)]
mod tests;

pub use config::{Cli, Command, Config};
pub use db::Database;
pub use error::{AppError, Result};
pub use server::AppState;
