//! Common types shared across the crate.

/// Unified error handling
pub mod error;

pub use error::{Error, ErrorKind, Result};
