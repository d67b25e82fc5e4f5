//! # Whenis Domain
//!
//! Business domain types and models for the calendar aggregation engine.
//!
//! This crate contains:
//! - Calendar directory and event record types
//! - Domain error taxonomy and Result definitions
//! - Configuration structures
//! - Domain constants
//!
//! ## Architecture
//! - No dependencies on other Whenis crates
//! - Only external dependencies allowed
//! - Pure domain models and data structures

pub mod config;
pub mod constants;
pub mod errors;
pub mod macros;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
