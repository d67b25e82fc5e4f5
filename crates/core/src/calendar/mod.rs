//! Calendar aggregation: time model, directory cache, scatter-gather engine
//! and the view selectors built on them.

pub mod directory;
pub mod engine;
pub mod service;
pub mod time;
