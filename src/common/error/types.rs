use thiserror::Error;

/// Main error type for hwpfill operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Template, data or output could not be read or written
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Input lacks the compound file signature
    #[error("Not a compound file document")]
    NotCompoundFile,

    /// Container structure is invalid
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    /// Container traversal failed (bad sector ids, cyclic chains, ...)
    #[error("Corrupted file: {0}")]
    CorruptedFile(String),

    /// A required stream is missing
    #[error("Stream not found: {0}")]
    StreamNotFound(String),

    /// Data source is not a flat mapping, or a value cannot be used
    #[error("Data error: {0}")]
    Data(String),

    /// A replacement would change the byte length of the document
    #[error(
        "Value for '{field}' is {value_len} bytes but its placeholder is {pattern_len} bytes \
         ({occurrences} occurrence(s))"
    )]
    SubstitutionLengthMismatch {
        field: String,
        pattern_len: usize,
        value_len: usize,
        occurrences: usize,
    },
}

/// Coarse classification of [`Error`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Io,
    Format,
    Data,
    SubstitutionLengthMismatch,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Io(_) => ErrorKind::Io,
            Error::NotCompoundFile
            | Error::InvalidFormat(_)
            | Error::CorruptedFile(_)
            | Error::StreamNotFound(_) => ErrorKind::Format,
            Error::Data(_) => ErrorKind::Data,
            Error::SubstitutionLengthMismatch { .. } => ErrorKind::SubstitutionLengthMismatch,
        }
    }
}

/// Result type for hwpfill operations.
pub type Result<T> = std::result::Result<T, Error>;
