//! Raw DEFLATE codec for HWP streams
//!
//! `DocInfo` and every `BodyText/SectionN` stream of a compressed document
//! hold a bare DEFLATE bitstream (no zlib or gzip framing). Everything else
//! is stored as-is.

use crate::common::error::Result;
use flate2::write::DeflateEncoder;
use flate2::{Compression, Decompress, FlushDecompress, Status};
use std::io::Write;
use tracing::debug;

/// Result of [`decompress`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    /// The input was a complete raw DEFLATE stream
    Decompressed(Vec<u8>),
    /// The input did not inflate; these are the input bytes unchanged
    PassedThroughRaw(Vec<u8>),
}

impl Decoded {
    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            Decoded::Decompressed(bytes) | Decoded::PassedThroughRaw(bytes) => bytes,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Decoded::Decompressed(bytes) | Decoded::PassedThroughRaw(bytes) => bytes,
        }
    }

    pub fn is_decompressed(&self) -> bool {
        matches!(self, Decoded::Decompressed(_))
    }
}

/// Inflate a raw DEFLATE stream
///
/// Never fails: input that is not a complete DEFLATE stream comes back as
/// [`Decoded::PassedThroughRaw`]. Bytes after the end of the stream are
/// ignored.
pub fn decompress(bytes: &[u8]) -> Decoded {
    match inflate_raw(bytes) {
        Ok(inflated) => Decoded::Decompressed(inflated),
        Err(reason) => {
            debug!(len = bytes.len(), %reason, "stream passed through undecoded");
            Decoded::PassedThroughRaw(bytes.to_vec())
        },
    }
}

/// Decode a body stream of a document whose compression flag is `compressed`
pub fn decode_body(bytes: &[u8], compressed: bool) -> Decoded {
    if compressed {
        decompress(bytes)
    } else {
        Decoded::PassedThroughRaw(bytes.to_vec())
    }
}

fn inflate_raw(bytes: &[u8]) -> std::result::Result<Vec<u8>, String> {
    let mut inflater = Decompress::new(false);
    let mut output = Vec::with_capacity(bytes.len().saturating_mul(4).max(64));

    loop {
        if output.len() == output.capacity() {
            output.reserve(output.capacity());
        }
        let consumed = inflater.total_in() as usize;
        let produced = inflater.total_out();

        let status = inflater
            .decompress_vec(&bytes[consumed..], &mut output, FlushDecompress::Finish)
            .map_err(|e| e.to_string())?;

        match status {
            Status::StreamEnd => return Ok(output),
            Status::Ok | Status::BufError => {
                // Output space was available and nothing moved: input ran out
                let stalled = inflater.total_in() as usize == consumed
                    && inflater.total_out() == produced;
                if stalled {
                    return Err("truncated deflate stream".to_string());
                }
            },
        }
    }
}

/// Deflate `bytes` at the best compression level, without framing
pub fn compress(bytes: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = DeflateEncoder::new(Vec::with_capacity(bytes.len() / 2), Compression::best());
    encoder.write_all(bytes)?;
    Ok(encoder.finish()?)
}

/// Whether a stream at `path` is compressed by HWP convention
pub fn is_compressed_stream<S: AsRef<str>>(path: &[S]) -> bool {
    match path {
        [name] => name.as_ref().eq_ignore_ascii_case("DocInfo"),
        [storage, name] => {
            storage.as_ref().eq_ignore_ascii_case("BodyText") && is_section_name(name.as_ref())
        },
        _ => false,
    }
}

/// `SectionN` stream names inside `BodyText`
pub(crate) fn is_section_name(name: &str) -> bool {
    name.get(..7)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("Section"))
}
