//! # Whenis App
//!
//! Application layer - command functions and the `whenis` CLI.
//!
//! This crate contains:
//! - Commands (caller-facing operations with execution logging)
//! - Application context (dependency injection)
//! - Tracing setup for the binary
//!
//! ## Architecture
//! - Depends on `domain`, `common`, `core`, and `infra`
//! - Wires the Google adapter into the core engine

pub mod commands;
pub mod context;
pub mod utils;

// Re-export for convenience
pub use commands::*;
pub use context::*;
