//! Placeholder substitution
//!
//! Two modes share one replacement core:
//!
//! - **Raw**: `{{field}}` is encoded as UTF-16LE and replaced wherever those
//!   bytes occur in the undecoded file. Compressed streams are left alone,
//!   so only placeholders stored uncompressed (`PrvText`, uncompressed
//!   documents) are reached. The container is never re-serialized.
//! - **Structured**: every stream is decoded by convention, replaced in its
//!   decoded form, re-encoded and written into a rebuilt container. Matches
//!   must start on a UTF-16 code unit boundary.
//!
//! HWP records carry their own lengths, so a replacement of a different
//! byte length corrupts the record holding it. [`LengthPolicy`] decides what
//! happens then.

use crate::common::error::{Error, Result};
use crate::hwp::codec::{compress, decode_body, is_compressed_stream, Decoded};
use crate::hwp::field::{decode_section, section_paths};
use crate::hwp::header::body_is_compressed;
use crate::ole::{OleFile, OleWriter};
use memchr::memmem;
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::{Cursor, Read, Seek};
use tracing::{debug, info, warn};

/// Field name to replacement text
///
/// Fields are applied longest name first, ties broken by name, so a name
/// that contains another is replaced before it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubstitutionMap {
    entries: BTreeMap<String, String>,
}

impl SubstitutionMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.entries.insert(field.into(), value.into())
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.entries.get(field).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries sorted by field name
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Entries in the order they are applied
    pub fn application_order(&self) -> Vec<(&str, &str)> {
        let mut order: Vec<(&str, &str)> = self.iter().collect();
        order.sort_by(|a, b| {
            let a_len = a.0.encode_utf16().count();
            let b_len = b.0.encode_utf16().count();
            b_len.cmp(&a_len).then_with(|| a.0.cmp(b.0))
        });
        order
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for SubstitutionMap {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut map = SubstitutionMap::new();
        for (field, value) in iter {
            map.insert(field, value);
        }
        map
    }
}

/// What to do when a value's encoded length differs from its placeholder's
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LengthPolicy {
    /// Write the value anyway and log a warning
    #[default]
    Allow,
    /// Fail with [`Error::SubstitutionLengthMismatch`]
    Reject,
    /// Right-pad shorter values with spaces; longer values fail as with `Reject`
    Pad,
}

/// UTF-16LE bytes of `{{field}}`
pub fn pattern_bytes(field: &str) -> Vec<u8> {
    value_bytes(&format!("{{{{{}}}}}", field))
}

/// UTF-16LE bytes of `value`
pub fn value_bytes(value: &str) -> Vec<u8> {
    value.encode_utf16().flat_map(|unit| unit.to_le_bytes()).collect()
}

/// Outcome for one field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldReplacement {
    pub field: String,
    pub occurrences: usize,
    pub pattern_len: usize,
    /// Length of the bytes written in place of each occurrence
    pub value_len: usize,
}

impl FieldReplacement {
    pub fn size_delta(&self) -> i64 {
        (self.value_len as i64 - self.pattern_len as i64) * self.occurrences as i64
    }
}

/// Result of [`substitute_raw`]
#[derive(Debug, Clone)]
pub struct RawOutcome {
    pub bytes: Vec<u8>,
    /// One entry per map field, in application order
    pub replacements: Vec<FieldReplacement>,
    pub size_delta: i64,
}

/// Replace placeholders directly in the undecoded file bytes
///
/// Every non-overlapping occurrence is replaced, left to right, one field at
/// a time in [`SubstitutionMap::application_order`]. Fields that do not occur
/// are reported with zero occurrences. An empty map returns the input
/// unchanged.
pub fn substitute_raw(buffer: &[u8], map: &SubstitutionMap, policy: LengthPolicy) -> Result<RawOutcome> {
    let order = map.application_order();
    let (bytes, replacements) = replace_fields(buffer, &order, policy, Alignment::Byte)?;

    for replacement in replacements.iter().filter(|r| r.occurrences > 0) {
        info!(field = %replacement.field, occurrences = replacement.occurrences, "replaced field");
    }

    let size_delta = bytes.len() as i64 - buffer.len() as i64;
    Ok(RawOutcome { bytes, replacements, size_delta })
}

/// Where a placeholder may start within a buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Alignment {
    /// Any byte offset, as in the undecoded file
    Byte,
    /// Only UTF-16 code unit boundaries, as in decoded text
    CodeUnit,
}

/// Apply `order` to `buffer`, returning the rewritten bytes and per-field counts
fn replace_fields(
    buffer: &[u8],
    order: &[(&str, &str)],
    policy: LengthPolicy,
    alignment: Alignment,
) -> Result<(Vec<u8>, Vec<FieldReplacement>)> {
    let mut current = buffer.to_vec();
    let mut replacements = Vec::with_capacity(order.len());

    for &(field, value) in order {
        let pattern = pattern_bytes(field);
        let finder = memmem::Finder::new(&pattern);
        let positions = match_positions(&current, &finder, alignment);
        let occurrences = positions.len();

        let mut written = value_bytes(value);
        if occurrences > 0 {
            written = fit_length(field, &pattern, written, occurrences, policy)?;
            current = replace_at(&current, &positions, pattern.len(), &written);
        }

        replacements.push(FieldReplacement {
            field: field.to_string(),
            occurrences,
            pattern_len: pattern.len(),
            value_len: written.len(),
        });
    }

    Ok((current, replacements))
}

/// Start offsets of non-overlapping matches, left to right
fn match_positions(haystack: &[u8], finder: &memmem::Finder<'_>, alignment: Alignment) -> Vec<usize> {
    let needle_len = finder.needle().len();
    let mut positions = Vec::new();
    let mut start = 0;

    while let Some(found) = finder.find(&haystack[start..]) {
        let position = start + found;
        if alignment == Alignment::CodeUnit && position % 2 != 0 {
            start = position + 1;
            continue;
        }
        positions.push(position);
        start = position + needle_len;
    }
    positions
}

fn fit_length(
    field: &str,
    pattern: &[u8],
    value: Vec<u8>,
    occurrences: usize,
    policy: LengthPolicy,
) -> Result<Vec<u8>> {
    if value.len() == pattern.len() {
        return Ok(value);
    }

    match policy {
        LengthPolicy::Allow => {
            warn!(
                field,
                pattern_len = pattern.len(),
                value_len = value.len(),
                occurrences,
                delta = (value.len() as i64 - pattern.len() as i64) * occurrences as i64,
                "replacement changes the byte length of the document"
            );
            Ok(value)
        },
        LengthPolicy::Pad if value.len() < pattern.len() => {
            let mut padded = value;
            while padded.len() < pattern.len() {
                padded.extend_from_slice(&[0x20, 0x00]);
            }
            Ok(padded)
        },
        LengthPolicy::Reject | LengthPolicy::Pad => Err(Error::SubstitutionLengthMismatch {
            field: field.to_string(),
            pattern_len: pattern.len(),
            value_len: value.len(),
            occurrences,
        }),
    }
}

fn replace_at(haystack: &[u8], positions: &[usize], needle_len: usize, replacement: &[u8]) -> Vec<u8> {
    let mut output = Vec::with_capacity(haystack.len());
    let mut last = 0;

    for &position in positions {
        output.extend_from_slice(&haystack[last..position]);
        output.extend_from_slice(replacement);
        last = position + needle_len;
    }
    output.extend_from_slice(&haystack[last..]);
    output
}

/// Reject values that cannot be placed into decoded section text
///
/// Characters below U+0020 are inline control codes in HWP paragraph text.
fn validate_values(map: &SubstitutionMap) -> Result<()> {
    for (field, value) in map.iter() {
        if let Some(c) = value.chars().find(|&c| c < ' ') {
            return Err(Error::Data(format!(
                "Value for '{}' contains control character U+{:04X}",
                field, c as u32
            )));
        }
    }
    Ok(())
}

/// Occurrences of one field in one section
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldCount {
    pub field: String,
    pub occurrences: usize,
}

/// Dry run of a structured fill over one section
#[derive(Debug, Clone, Serialize)]
pub struct SectionPlan {
    pub path: String,
    pub matches: Vec<FieldCount>,
    /// Decoded section text after every replacement
    pub text: String,
}

/// Result of [`plan_structured`]
#[derive(Debug, Clone, Serialize)]
pub struct StructuredPlan {
    pub sections: Vec<SectionPlan>,
}

impl StructuredPlan {
    /// Occurrences of `field` across all sections
    pub fn occurrences(&self, field: &str) -> usize {
        self.sections
            .iter()
            .flat_map(|s| &s.matches)
            .filter(|m| m.field == field)
            .map(|m| m.occurrences)
            .sum()
    }

    pub fn total_occurrences(&self) -> usize {
        self.sections
            .iter()
            .flat_map(|s| &s.matches)
            .map(|m| m.occurrences)
            .sum()
    }
}

/// Count and apply replacements on the decoded text of every body section
///
/// Nothing is written; the container is only read.
pub fn plan_structured<R: Read + Seek>(container: &mut OleFile<R>, map: &SubstitutionMap) -> Result<StructuredPlan> {
    validate_values(map)?;
    let order = map.application_order();
    let compressed = body_is_compressed(container)?;
    let mut sections = Vec::new();

    for path in section_paths(container.list_streams()) {
        let components: Vec<&str> = path.iter().map(String::as_str).collect();
        let raw = container.open_stream(&components)?;
        let mut text = decode_section(decode_body(&raw, compressed).as_bytes());

        let mut matches = Vec::with_capacity(order.len());
        for &(field, value) in &order {
            let placeholder = format!("{{{{{}}}}}", field);
            let occurrences = text.matches(placeholder.as_str()).count();
            if occurrences > 0 {
                text = text.replace(placeholder.as_str(), value);
            }
            matches.push(FieldCount { field: field.to_string(), occurrences });
        }

        sections.push(SectionPlan { path: path.join("/"), matches, text });
    }

    Ok(StructuredPlan { sections })
}

/// Result of [`substitute_structured`]
#[derive(Debug, Clone)]
pub struct StructuredOutcome {
    /// The rebuilt container
    pub bytes: Vec<u8>,
    /// One entry per map field, summed over streams, in application order
    pub replacements: Vec<FieldReplacement>,
    /// `/`-joined paths of the streams that were rewritten
    pub changed_streams: Vec<String>,
    pub size_delta: i64,
}

/// Replace placeholders inside decoded streams and rebuild the container
///
/// Streams without matches are copied as stored. Rewritten streams that were
/// compressed are recompressed. The sector size, root CLSID, storages and
/// stream order of the input are kept.
pub fn substitute_structured(
    buffer: &[u8],
    map: &SubstitutionMap,
    policy: LengthPolicy,
) -> Result<StructuredOutcome> {
    validate_values(map)?;
    let order = map.application_order();

    let mut ole = OleFile::open(Cursor::new(buffer))?;
    let compressed_document = body_is_compressed(&mut ole)?;

    let mut writer = OleWriter::with_sector_size(ole.sector_size());
    writer.set_root_clsid(ole.root_clsid());
    for storage in ole.list_storages() {
        let components: Vec<&str> = storage.iter().map(String::as_str).collect();
        writer.create_storage(&components)?;
    }

    let mut totals: Vec<FieldReplacement> = order
        .iter()
        .map(|&(field, value)| FieldReplacement {
            field: field.to_string(),
            occurrences: 0,
            pattern_len: pattern_bytes(field).len(),
            value_len: value_bytes(value).len(),
        })
        .collect();
    let mut changed_streams = Vec::new();

    for item in ole.streams() {
        let (path, stored) = item?;
        let (data, replacements) = if compressed_document && is_compressed_stream(&path) {
            match decode_body(&stored, true) {
                Decoded::Decompressed(plain) => {
                    let (rewritten, replacements) =
                        replace_fields(&plain, &order, policy, Alignment::CodeUnit)?;
                    if replacements.iter().any(|r| r.occurrences > 0) {
                        (compress(&rewritten)?, replacements)
                    } else {
                        (stored, replacements)
                    }
                },
                Decoded::PassedThroughRaw(raw) => {
                    debug!(path = %path.join("/"), "compressed stream did not inflate");
                    replace_fields(&raw, &order, policy, Alignment::CodeUnit)?
                },
            }
        } else {
            replace_fields(&stored, &order, policy, Alignment::CodeUnit)?
        };

        if replacements.iter().any(|r| r.occurrences > 0) {
            changed_streams.push(path.join("/"));
        }
        for (total, replacement) in totals.iter_mut().zip(&replacements) {
            if replacement.occurrences > 0 {
                total.occurrences += replacement.occurrences;
                total.value_len = replacement.value_len;
            }
        }

        let components: Vec<&str> = path.iter().map(String::as_str).collect();
        writer.create_stream(&components, &data)?;
    }

    for total in totals.iter().filter(|r| r.occurrences > 0) {
        info!(field = %total.field, occurrences = total.occurrences, "replaced field");
    }

    let bytes = writer.to_bytes()?;
    let size_delta = bytes.len() as i64 - buffer.len() as i64;
    Ok(StructuredOutcome { bytes, replacements: totals, changed_streams, size_delta })
}
