//! Template analysis and filling
//!
//! Each call loads the template fresh; nothing is cached between calls.

use crate::common::error::{Error, Result};
use crate::hwp::codec::decode_body;
use crate::hwp::data::load_map;
use crate::hwp::field::{
    decode_section, extract_fields, preview, section_paths, FieldInventory, SectionEncoding,
    SectionReport,
};
use crate::hwp::header::FileHeader;
use crate::hwp::substitute::{
    substitute_raw, substitute_structured, FieldReplacement, LengthPolicy, SubstitutionMap,
};
use crate::ole::OleFile;
use serde::Serialize;
use std::fs::{File, Permissions};
use std::io::{BufReader, Cursor, Read, Seek, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

/// How placeholders are replaced
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FillMode {
    /// Byte replacement over the whole file, container untouched
    #[default]
    Raw,
    /// Replacement inside decoded streams, container rebuilt
    Structured,
}

/// Options for [`fill`] and [`fill_bytes`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FillOptions {
    pub mode: FillMode,
    pub length_policy: LengthPolicy,
}

/// What a fill produced
#[derive(Debug, Clone, Serialize)]
pub struct FillReport {
    #[serde(skip)]
    pub bytes: Vec<u8>,
    pub mode: FillMode,
    /// One entry per data field, in application order
    pub replacements: Vec<FieldReplacement>,
    /// Output length minus template length
    pub size_delta: i64,
    /// Streams rewritten by a structured fill
    pub changed_streams: Vec<String>,
    /// Whether the output still opens as a compound file
    pub output_valid: bool,
}

impl FillReport {
    pub fn total_occurrences(&self) -> usize {
        self.replacements.iter().map(|r| r.occurrences).sum()
    }
}

/// Inspect a template without modifying it
pub fn analyze(path: impl AsRef<Path>) -> Result<FieldInventory> {
    let path = path.as_ref();
    debug!(path = %path.display(), "analyzing template");
    let file = File::open(path)?;
    let mut ole = OleFile::open(BufReader::new(file))?;
    inventory(&mut ole)
}

/// [`analyze`] over an in-memory template
pub fn analyze_bytes(template: &[u8]) -> Result<FieldInventory> {
    let mut ole = OleFile::open(Cursor::new(template))?;
    inventory(&mut ole)
}

fn inventory<R: Read + Seek>(ole: &mut OleFile<R>) -> Result<FieldInventory> {
    let listing = ole.list_streams();
    let streams = listing.iter().map(|path| path.join("/")).collect();

    let header = if ole.exists(&["FileHeader"]) {
        match FileHeader::parse(&ole.open_stream(&["FileHeader"])?) {
            Ok(header) => Some(header),
            Err(e) => {
                warn!(error = %e, "FileHeader could not be parsed");
                None
            },
        }
    } else {
        None
    };

    // Without a usable header, sections are tried as compressed
    let compressed = header.as_ref().is_none_or(|h| h.compressed);
    let mut sections = Vec::new();
    for path in section_paths(listing) {
        let components: Vec<&str> = path.iter().map(String::as_str).collect();
        let raw = ole.open_stream(&components)?;

        let decoded = decode_body(&raw, compressed);
        let encoding = if decoded.is_decompressed() {
            SectionEncoding::Decompressed
        } else {
            SectionEncoding::PassedThroughRaw
        };
        let bytes = decoded.into_bytes();
        let fields = extract_fields(&decode_section(&bytes));

        debug!(
            path = %path.join("/"),
            raw_len = raw.len(),
            decoded_len = bytes.len(),
            fields = fields.len(),
            "scanned section"
        );
        sections.push(SectionReport {
            path: path.join("/"),
            raw_len: raw.len(),
            decoded_len: bytes.len(),
            encoding,
            fields,
            preview: preview(&bytes),
        });
    }

    Ok(FieldInventory::new(streams, header, sections))
}

/// Fill `template` with the data file at `data_path` and write `output`
///
/// The output is written once, through a temporary file in the destination
/// directory renamed into place, and gets the template's permissions. On any
/// error nothing is written.
pub fn fill(
    template: impl AsRef<Path>,
    output: impl AsRef<Path>,
    data_path: impl AsRef<Path>,
    options: &FillOptions,
) -> Result<FillReport> {
    let (template, output) = (template.as_ref(), output.as_ref());

    let template_bytes = std::fs::read(template)?;
    let map = load_map(data_path)?;
    info!(
        template = %template.display(),
        output = %output.display(),
        fields = map.len(),
        mode = ?options.mode,
        "filling template"
    );

    let report = fill_bytes(&template_bytes, &map, options)?;
    let permissions = std::fs::metadata(template)?.permissions();
    write_atomic(output, &report.bytes, permissions)?;
    Ok(report)
}

/// Fill an in-memory template
pub fn fill_bytes(template: &[u8], map: &SubstitutionMap, options: &FillOptions) -> Result<FillReport> {
    // Refuse input that is not a readable container before touching it
    OleFile::open(Cursor::new(template))?;

    let (bytes, replacements, size_delta, changed_streams) = match options.mode {
        FillMode::Raw => {
            let outcome = substitute_raw(template, map, options.length_policy)?;
            (outcome.bytes, outcome.replacements, outcome.size_delta, Vec::new())
        },
        FillMode::Structured => {
            let outcome = substitute_structured(template, map, options.length_policy)?;
            (outcome.bytes, outcome.replacements, outcome.size_delta, outcome.changed_streams)
        },
    };

    let output_valid = match OleFile::open(Cursor::new(bytes.as_slice())) {
        Ok(_) => true,
        Err(e) => {
            warn!(error = %e, "filled document no longer parses as a compound file");
            false
        },
    };

    Ok(FillReport {
        bytes,
        mode: options.mode,
        replacements,
        size_delta,
        changed_streams,
        output_valid,
    })
}

fn write_atomic(output: &Path, bytes: &[u8], permissions: Permissions) -> Result<()> {
    let dir = match output.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut temp = NamedTempFile::new_in(dir)?;
    temp.write_all(bytes)?;
    // Temporary files are created owner-only
    temp.as_file().set_permissions(permissions)?;
    temp.as_file().sync_all()?;
    temp.persist(output).map_err(|e| Error::Io(e.error))?;

    debug!(path = %output.display(), len = bytes.len(), "wrote output");
    Ok(())
}
