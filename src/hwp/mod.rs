//! HWP 5 template handling
//!
//! An HWP 5 document is a compound file whose `DocInfo` and
//! `BodyText/SectionN` streams hold raw-DEFLATE compressed UTF-16LE records.
//! Templates mark fillable spots with `{{name}}` placeholders in the text.
//!
//! ```no_run
//! use hwpfill::hwp::{analyze, fill, FillOptions};
//!
//! # fn main() -> hwpfill::Result<()> {
//! let inventory = analyze("template.hwp")?;
//! for field in &inventory.fields {
//!     println!("{} ({}x)", field.name, field.count);
//! }
//!
//! let report = fill("template.hwp", "out.hwp", "data.json", &FillOptions::default())?;
//! println!("{} replacements", report.total_occurrences());
//! # Ok(())
//! # }
//! ```

/// Raw DEFLATE stream codec
pub mod codec;

/// Data files for fills
pub mod data;

/// Placeholder scanning and inventory types
pub mod field;

/// `FileHeader` stream parsing
pub mod header;

/// Substitution engine
pub mod substitute;

mod filler;


pub use codec::{compress, decode_body, decompress, is_compressed_stream, Decoded};
pub use data::load_map;
pub use field::{
    decode_section, extract_fields, preview, FieldInventory, FieldToken, SectionEncoding,
    SectionReport,
};
pub use filler::{analyze, analyze_bytes, fill, fill_bytes, FillMode, FillOptions, FillReport};
pub use header::{FileHeader, HwpVersion};
pub use substitute::{
    pattern_bytes, plan_structured, substitute_raw, substitute_structured, value_bytes,
    FieldReplacement, LengthPolicy, RawOutcome, StructuredOutcome, StructuredPlan,
    SubstitutionMap,
};
