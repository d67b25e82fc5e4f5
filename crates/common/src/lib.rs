//! Common utilities shared across Whenis crates.
//!
//! # Feature Tiers
//!
//! - default: the [`time::Clock`] abstraction and the production
//!   [`time::SystemClock`]
//! - `test-utils`: [`testing::MockClock`] for deterministic tests

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

pub mod time;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use time::{Clock, SystemClock};
