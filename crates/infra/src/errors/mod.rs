//! Infrastructure error conversions

pub mod conversions;

pub use conversions::{source_error_from_domain, source_error_from_status, InfraError};
