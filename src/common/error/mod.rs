//! Unified error type for hwpfill.
//!
//! Container, codec, data-source and substitution failures all surface as
//! one [`Error`], classified by [`ErrorKind`].

pub mod conversions;
pub mod types;

pub use types::{Error, ErrorKind, Result};
