//! Placeholder scanning over decoded section text
//!
//! A placeholder is `{{` followed by one or more characters other than `}`
//! and closed by `}}`. Markers do not nest and there is no escaping.

use crate::hwp::codec::is_section_name;
use crate::hwp::header::FileHeader;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

static FIELD_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{([^}]+)\}\}").expect("Failed to build field pattern"));

/// Characters of context kept on each side of a sample
const CONTEXT_CHARS: usize = 16;

/// Bytes of a section decoded for its preview
const PREVIEW_BYTES: usize = 500;

/// Characters kept in a preview
const PREVIEW_CHARS: usize = 200;

/// One distinct placeholder name found in a text
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldToken {
    pub name: String,
    pub count: usize,
    /// Text around the first occurrence, control characters removed
    pub sample_context: String,
}

/// Find every placeholder in `text`
///
/// Tokens are returned in order of first appearance; repeated names are
/// collapsed into one token.
///
/// ```
/// use hwpfill::hwp::extract_fields;
///
/// let fields = extract_fields("A{{x}}B{{y}}C{{x}}");
/// assert_eq!(fields[0].name, "x");
/// assert_eq!(fields[0].count, 2);
/// assert_eq!(fields[1].name, "y");
/// ```
pub fn extract_fields(text: &str) -> Vec<FieldToken> {
    let mut tokens: Vec<FieldToken> = Vec::new();

    for captures in FIELD_PATTERN.captures_iter(text) {
        let (Some(whole), Some(name)) = (captures.get(0), captures.get(1)) else {
            continue;
        };

        if let Some(token) = tokens.iter_mut().find(|t| t.name == name.as_str()) {
            token.count += 1;
            continue;
        }

        tokens.push(FieldToken {
            name: name.as_str().to_string(),
            count: 1,
            sample_context: sample_context(text, whole.start(), whole.end()),
        });
    }

    tokens
}

fn sample_context(text: &str, start: usize, end: usize) -> String {
    let before: Vec<char> = text[..start].chars().rev().take(CONTEXT_CHARS).collect();
    let after = text[end..].chars().take(CONTEXT_CHARS);

    before
        .into_iter()
        .rev()
        .chain(text[start..end].chars())
        .chain(after)
        .filter(|c| !c.is_control())
        .collect()
}

/// Decode UTF-16LE section bytes
///
/// Unpaired surrogates and a dangling odd byte are dropped. NUL code units
/// are kept, so decoding never stops early.
pub fn decode_section(bytes: &[u8]) -> String {
    let units = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]));

    char::decode_utf16(units).filter_map(|c| c.ok()).collect()
}

/// Short human-readable excerpt of a decompressed section
pub fn preview(bytes: &[u8]) -> String {
    let head = &bytes[..bytes.len().min(PREVIEW_BYTES)];
    decode_section(head)
        .chars()
        .filter(|&c| !c.is_control() || c == '\n' || c == '\t')
        .take(PREVIEW_CHARS)
        .collect()
}

/// Merge tokens from several texts, summing counts and keeping the first sample
pub fn merge_fields<'a, I>(groups: I) -> Vec<FieldToken>
where
    I: IntoIterator<Item = &'a [FieldToken]>,
{
    let mut merged: Vec<FieldToken> = Vec::new();
    for token in groups.into_iter().flatten() {
        match merged.iter_mut().find(|t| t.name == token.name) {
            Some(existing) => existing.count += token.count,
            None => merged.push(token.clone()),
        }
    }
    merged
}

/// Number in a `SectionN` name, if any
pub(crate) fn section_index(name: &str) -> Option<u32> {
    name.get(7..).and_then(|n| n.parse().ok())
}

/// `BodyText/SectionN` paths out of a stream listing, ordered by N
pub(crate) fn section_paths(streams: Vec<Vec<String>>) -> Vec<Vec<String>> {
    let mut sections: Vec<Vec<String>> = streams
        .into_iter()
        .filter(|path| {
            matches!(path.as_slice(), [storage, name]
                if storage.eq_ignore_ascii_case("BodyText") && is_section_name(name))
        })
        .collect();

    sections.sort_by_key(|path| (section_index(&path[1]).unwrap_or(u32::MAX), path[1].clone()));
    sections
}

/// How a section's bytes were obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionEncoding {
    Decompressed,
    PassedThroughRaw,
}

/// Findings for one `BodyText/SectionN` stream
#[derive(Debug, Clone, Serialize)]
pub struct SectionReport {
    pub path: String,
    /// Stream size as stored in the container
    pub raw_len: usize,
    /// Size after decompression
    pub decoded_len: usize,
    pub encoding: SectionEncoding,
    pub fields: Vec<FieldToken>,
    pub preview: String,
}

/// Everything `analyze` learns about a template
#[derive(Debug, Clone, Serialize)]
pub struct FieldInventory {
    /// Every stream path, `/`-joined, in directory order
    pub streams: Vec<String>,
    pub header: Option<FileHeader>,
    pub sections: Vec<SectionReport>,
    /// Document-wide tokens, merged across sections
    pub fields: Vec<FieldToken>,
}

impl FieldInventory {
    pub fn new(streams: Vec<String>, header: Option<FileHeader>, sections: Vec<SectionReport>) -> Self {
        let fields = merge_fields(sections.iter().map(|s| s.fields.as_slice()));
        FieldInventory { streams, header, sections, fields }
    }

    /// Distinct field names in first-appearance order
    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|t| t.name.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utf16(text: &str) -> Vec<u8> {
        text.encode_utf16().flat_map(|u| u.to_le_bytes()).collect()
    }

    #[test]
    fn test_extract_in_first_appearance_order() {
        let fields = extract_fields("A{{x}}B{{y}}C{{x}}");
        let summary: Vec<(&str, usize)> = fields.iter().map(|t| (t.name.as_str(), t.count)).collect();
        assert_eq!(summary, vec![("x", 2), ("y", 1)]);
    }

    #[test]
    fn test_extract_ignores_malformed_markers() {
        assert!(extract_fields("{{}} {x}} {{x} plain").is_empty());
        let fields = extract_fields("{{{a}}}");
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].name, "{a");
    }

    #[test]
    fn test_extract_unicode_names() {
        let fields = extract_fields("성명: {{이름}}, 날짜: {{date}}");
        assert_eq!(fields[0].name, "이름");
        assert_eq!(fields[1].name, "date");
    }

    #[test]
    fn test_sample_context_is_bounded() {
        let text = format!("{}{{{{code}}}}{}", "a".repeat(40), "b".repeat(40));
        let fields = extract_fields(&text);
        assert_eq!(
            fields[0].sample_context,
            format!("{}{{{{code}}}}{}", "a".repeat(16), "b".repeat(16))
        );
    }

    #[test]
    fn test_sample_context_drops_controls() {
        let fields = extract_fields("\u{2}\u{0}x{{f}}\r\ny");
        assert_eq!(fields[0].sample_context, "x{{f}}y");
    }

    #[test]
    fn test_decode_section_is_permissive() {
        let mut bytes = utf16("ab");
        bytes.extend_from_slice(&[0x00, 0xD8]); // lone high surrogate
        bytes.extend_from_slice(&utf16("\0c"));
        bytes.push(0x41); // dangling byte
        assert_eq!(decode_section(&bytes), "ab\0c");
    }

    #[test]
    fn test_preview_is_bounded() {
        let bytes = utf16(&"가".repeat(400));
        let text = preview(&bytes);
        // 500 bytes hold 250 characters, of which 200 are kept
        assert_eq!(text.chars().count(), 200);
    }

    #[test]
    fn test_preview_keeps_newlines_and_tabs() {
        assert_eq!(preview(&utf16("a\u{1}b\nc\td\r")), "ab\nc\td");
    }

    #[test]
    fn test_merge_fields() {
        let first = extract_fields("{{a}}{{b}}");
        let second = extract_fields("{{b}}{{c}}{{b}}");
        let merged = merge_fields([first.as_slice(), second.as_slice()]);
        let summary: Vec<(&str, usize)> = merged.iter().map(|t| (t.name.as_str(), t.count)).collect();
        assert_eq!(summary, vec![("a", 1), ("b", 3), ("c", 1)]);
    }

    #[test]
    fn test_section_paths_sorted_numerically() {
        let path = |parts: &[&str]| parts.iter().map(|p| p.to_string()).collect::<Vec<_>>();
        let streams = vec![
            path(&["BodyText", "Section10"]),
            path(&["DocInfo"]),
            path(&["BodyText", "Section2"]),
            path(&["ViewText", "Section0"]),
            path(&["BodyText", "Section0"]),
        ];
        assert_eq!(
            section_paths(streams),
            vec![
                path(&["BodyText", "Section0"]),
                path(&["BodyText", "Section2"]),
                path(&["BodyText", "Section10"]),
            ]
        );
    }

    #[test]
    fn test_section_index() {
        assert_eq!(section_index("Section0"), Some(0));
        assert_eq!(section_index("Section12"), Some(12));
        assert_eq!(section_index("SectionX"), None);
    }
}
