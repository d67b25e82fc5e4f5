//! Google Calendar integration
//!
//! Implements the core `CalendarSource` and `CalendarWriter` ports over the
//! Calendar v3 REST API. Token acquisition is delegated to an
//! [`AccessTokenProvider`].

pub mod auth;
pub mod source;
pub mod types;

pub use auth::{AccessTokenProvider, StaticTokenProvider};
pub use source::GoogleCalendarSource;
