//! hwpfill - placeholder substitution for HWP document templates
//!
//! HWP 5 documents are compound files (OLE/CFB) holding compressed UTF-16LE
//! text streams. This crate finds `{{field}}` placeholders in those streams
//! and produces filled copies while keeping the container readable by the
//! original word processor.
//!
//! # Features
//!
//! - **Compound file reader/writer**: sector-based OLE containers, FAT,
//!   MiniFAT and DIFAT, directory trees
//! - **Stream codec**: raw DEFLATE with explicit pass-through of
//!   uncompressed data
//! - **Field inventory**: placeholders per section with counts, samples and
//!   previews
//! - **Substitution**: raw byte replacement over the whole file, or
//!   replacement inside decoded streams with a rebuilt container
//!
//! # Example - Listing placeholders
//!
//! ```no_run
//! # fn main() -> hwpfill::Result<()> {
//! let inventory = hwpfill::analyze("template.hwp")?;
//! for section in &inventory.sections {
//!     println!("{}: {} field(s)", section.path, section.fields.len());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Example - Filling in memory
//!
//! ```no_run
//! use hwpfill::{fill_bytes, FillOptions, LengthPolicy, SubstitutionMap};
//!
//! # fn main() -> hwpfill::Result<()> {
//! let template = std::fs::read("template.hwp")?;
//! let map: SubstitutionMap = [("code", "00000001")].into_iter().collect();
//! let options = FillOptions { length_policy: LengthPolicy::Reject, ..FillOptions::default() };
//!
//! let report = fill_bytes(&template, &map, &options)?;
//! std::fs::write("filled.hwp", &report.bytes)?;
//! # Ok(())
//! # }
//! ```
//!
//! # Example - Low-level compound file access
//!
//! ```no_run
//! use std::fs::File;
//! use hwpfill::ole::OleFile;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let file = File::open("template.hwp")?;
//! let mut ole = OleFile::open(file)?;
//!
//! for stream in ole.list_streams() {
//!     println!("Stream: {}", stream.join("/"));
//! }
//!
//! let header = ole.open_stream(&["FileHeader"])?;
//! println!("FileHeader: {} bytes", header.len());
//! # Ok(())
//! # }
//! ```

/// Shared error types
pub mod common;

/// HWP template analysis and filling
pub mod hwp;

/// Compound file (OLE/CFB) reading and writing
pub mod ole;

pub use common::{Error, ErrorKind, Result};
pub use hwp::{
    analyze, analyze_bytes, fill, fill_bytes, FieldInventory, FillMode, FillOptions, FillReport,
    LengthPolicy, SubstitutionMap,
};
