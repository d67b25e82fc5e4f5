//! # Whenis Core
//!
//! Pure business logic layer - no infrastructure dependencies.
//!
//! This crate contains:
//! - Port interfaces for calendar sources and writers
//! - The event time model, directory cache and scatter-gather engine
//! - View selectors built on top of the engine
//!
//! ## Architecture Principles
//! - Only depends on `whenis-common` and `whenis-domain`
//! - No HTTP or platform code
//! - All external dependencies via traits
//! - Every caller-facing operation takes an explicit [`RequestContext`]

pub mod calendar;
pub mod calendar_ports;
pub mod context;

// Re-export specific items to avoid ambiguity
pub use calendar::directory::{DirectoryCache, DirectorySettings, DirectorySnapshot, RefreshOutcome};
pub use calendar::engine::QueryEngine;
pub use calendar::service::{CalendarService, ViewSettings};
pub use calendar::time::EventTimeModel;
pub use calendar_ports::{CalendarSource, CalendarWriter};
pub use context::RequestContext;
