//! Compound file writing
//!
//! Rebuilds a complete container from a set of streams and storages. The
//! allocation layout follows the Microsoft Compound File Binary Format:
//! large streams first, then the mini stream, the directory, the MiniFAT,
//! and finally the DIFAT and FAT sectors that describe everything before them.

/// FAT (File Allocation Table) generation
mod fat;

/// MiniFAT (Mini File Allocation Table) generation
mod minifat;

/// DIFAT (Double Indirect FAT) generation
mod difat;

/// Directory tree generation
mod directory;

/// Header generation
mod header;

/// Core writer implementation
mod core;

#[cfg(test)]
mod tests;

pub use core::OleWriter;
