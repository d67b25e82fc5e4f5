//! # Whenis Infrastructure
//!
//! Infrastructure implementations of core ports.
//!
//! This crate contains:
//! - The Google Calendar v3 adapter (`CalendarSource` + `CalendarWriter`)
//! - A retrying HTTP client
//! - Configuration loading from environment and files
//! - The background directory refresher
//!
//! ## Architecture
//! - Implements traits defined in `whenis-core`
//! - Contains all "impure" code (network, filesystem, environment)

pub mod config;
pub mod errors;
pub mod http;
pub mod integrations;
pub mod scheduling;

// Re-export commonly used items
pub use errors::InfraError;
pub use http::{HttpClient, HttpClientBuilder};
pub use integrations::calendar::{AccessTokenProvider, GoogleCalendarSource, StaticTokenProvider};
pub use scheduling::DirectoryRefresher;
