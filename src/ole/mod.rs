/// Constants for the compound file format
pub mod consts;

/// Compound file parsing
mod file;

/// Compound file writer
///
/// Produces containers that [`OleFile`] and other compound file readers
/// accept; used to rebuild documents after stream-level edits.
pub mod writer;

pub use file::{is_ole_file, DirectoryEntry, OleError, OleFile, Streams};
pub use writer::OleWriter;
