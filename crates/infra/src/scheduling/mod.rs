//! Background tasks
//!
//! Every task tracks its join handle, stops through a cancellation token
//! and bounds each unit of work with a timeout.

pub mod directory_refresher;
pub mod error;

pub use directory_refresher::{DirectoryRefresher, RefresherConfig};
pub use error::{SchedulerError, SchedulerResult};
