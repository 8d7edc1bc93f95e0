//! The `FileHeader` stream
//!
//! 256 bytes: a NUL-padded 32-byte signature, the document version and a
//! property bit field. Only the leading 40 bytes carry information.

use crate::common::error::{Error, Result};
use crate::ole::OleFile;
use serde::Serialize;
use std::fmt;
use std::io::{Read, Seek};
use zerocopy::{FromBytes, LE, U32};
use zerocopy_derive::FromBytes as DeriveFromBytes;

/// Signature at the start of every HWP 5 `FileHeader` stream
pub const SIGNATURE: &[u8] = b"HWP Document File";

const PROP_COMPRESSED: u32 = 1 << 0;
const PROP_PASSWORD: u32 = 1 << 1;
const PROP_DISTRIBUTABLE: u32 = 1 << 2;

#[derive(Debug, Clone, DeriveFromBytes)]
#[repr(C)]
struct RawFileHeader {
    signature: [u8; 32],
    version: U32<LE>,
    properties: U32<LE>,
}

/// Document version, `major.minor.build.revision`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct HwpVersion {
    pub major: u8,
    pub minor: u8,
    pub build: u8,
    pub revision: u8,
}

impl HwpVersion {
    /// Unpack the `0xMMnnPPrr` on-disk form
    pub fn from_u32(value: u32) -> Self {
        let [revision, build, minor, major] = value.to_le_bytes();
        HwpVersion { major, minor, build, revision }
    }
}

impl fmt::Display for HwpVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}.{}", self.major, self.minor, self.build, self.revision)
    }
}

/// Parsed `FileHeader` stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileHeader {
    pub version: HwpVersion,
    /// Body streams are raw-DEFLATE compressed
    pub compressed: bool,
    pub password: bool,
    pub distributable: bool,
}

impl FileHeader {
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let (raw, _) = RawFileHeader::read_from_prefix(bytes).map_err(|_| {
            Error::InvalidFormat(format!("FileHeader is too short ({} bytes)", bytes.len()))
        })?;

        if !raw.signature.starts_with(SIGNATURE) {
            return Err(Error::InvalidFormat(
                "FileHeader does not carry the HWP signature".to_string(),
            ));
        }

        let properties = raw.properties.get();
        Ok(FileHeader {
            version: HwpVersion::from_u32(raw.version.get()),
            compressed: properties & PROP_COMPRESSED != 0,
            password: properties & PROP_PASSWORD != 0,
            distributable: properties & PROP_DISTRIBUTABLE != 0,
        })
    }
}

/// Whether the body streams of `ole` are compressed
///
/// Documents without a parsable `FileHeader` are treated as compressed.
pub(crate) fn body_is_compressed<R: Read + Seek>(ole: &mut OleFile<R>) -> Result<bool> {
    if !ole.exists(&["FileHeader"]) {
        return Ok(true);
    }
    let bytes = ole.open_stream(&["FileHeader"])?;
    Ok(FileHeader::parse(&bytes).map(|h| h.compressed).unwrap_or(true))
}

#[cfg(test)]
pub(crate) fn header_bytes(version: u32, properties: u32) -> Vec<u8> {
    let mut bytes = vec![0u8; 256];
    bytes[..SIGNATURE.len()].copy_from_slice(SIGNATURE);
    bytes[32..36].copy_from_slice(&version.to_le_bytes());
    bytes[36..40].copy_from_slice(&properties.to_le_bytes());
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_compressed_header() {
        let header = FileHeader::parse(&header_bytes(0x0500_0300, 0b001)).unwrap();
        assert_eq!(header.version.to_string(), "5.0.3.0");
        assert!(header.compressed);
        assert!(!header.password);
        assert!(!header.distributable);
    }

    #[test]
    fn test_parse_flags() {
        let header = FileHeader::parse(&header_bytes(0x0501_0007, 0b110)).unwrap();
        assert_eq!(
            header.version,
            HwpVersion { major: 5, minor: 1, build: 0, revision: 7 }
        );
        assert!(!header.compressed);
        assert!(header.password);
        assert!(header.distributable);
    }

    #[test]
    fn test_rejects_bad_signature() {
        let mut bytes = header_bytes(0x0500_0000, 1);
        bytes[0] = b'X';
        assert!(matches!(FileHeader::parse(&bytes), Err(Error::InvalidFormat(_))));
    }

    #[test]
    fn test_rejects_short_stream() {
        assert!(FileHeader::parse(SIGNATURE).is_err());
    }
}
