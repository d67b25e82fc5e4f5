//! Caller-facing commands
//!
//! Each command builds a fresh request context from the configured deadline,
//! runs one service operation and logs the outcome.

pub mod calendar;

pub use calendar::{
    add_event, list_calendars, lookup_event, next_event, ongoing_events, search_events,
    AddEventRequest, EventView, QueryOutcome,
};
