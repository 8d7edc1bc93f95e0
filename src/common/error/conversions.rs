//! Error conversion implementations.
//!
//! From trait implementations turning lower-level errors into [`Error`].

use super::types::Error;
use crate::ole::OleError;

impl From<OleError> for Error {
    fn from(err: OleError) -> Self {
        match err {
            OleError::Io(e) => Error::Io(e),
            OleError::InvalidFormat(s) => Error::InvalidFormat(s),
            OleError::InvalidData(s) => Error::InvalidFormat(s),
            OleError::NotOleFile => Error::NotCompoundFile,
            OleError::CorruptedFile(s) => Error::CorruptedFile(s),
            OleError::StreamNotFound(s) => Error::StreamNotFound(s),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        if err.is_io() {
            Error::Io(err.into())
        } else {
            Error::Data(err.to_string())
        }
    }
}
