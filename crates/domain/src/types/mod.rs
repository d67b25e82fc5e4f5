//! Domain types and models
//!
//! Calendar directory entries, event records and per-query aggregates.

pub mod calendar;
pub mod event;
pub mod query;

pub use calendar::{CalendarRef, DirectoryFetch, DirectoryPage};
pub use event::{EventRecord, NewEvent, PartialInstant};
pub use query::{EventFilter, QueryResult};
