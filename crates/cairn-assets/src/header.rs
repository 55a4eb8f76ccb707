//! Asset type tags and the container header every stored asset begins with.
//!
//! Layout (little endian):
//!
//! | bytes | field |
//! |-------|-------|
//! | 0..4  | magic `CRN1` |
//! | 4..8  | format version |
//! | 8..12 | [`AssetType`] tag |
//! | 12    | flags (bit 0: embedded) |

use std::fmt;

use crate::Asset;
use crate::error::{AssetError, AssetResult};

/// Leading bytes of every asset container.
pub const ASSET_MAGIC: [u8; 4] = *b"CRN1";

/// Current container format version.
pub const FORMAT_VERSION: u32 = 1;

/// Size of [`AssetHeader`] on disk.
pub const HEADER_SIZE: usize = 13;

const FLAG_EMBEDDED: u8 = 1;

/// Stable 32-bit tag identifying a payload kind.
///
/// Derived from [`Asset::type_name`] with FNV-1a so it survives across builds,
/// unlike `TypeId`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AssetType(u32);

impl AssetType {
    /// Tag for the given payload kind.
    pub fn of<T: Asset>() -> Self {
        Self::from_name(T::type_name())
    }

    /// Tag for a type name, as written in manifests.
    pub fn from_name(name: &str) -> Self {
        let mut hash: u32 = 0x811c_9dc5;
        for byte in name.bytes() {
            hash ^= byte as u32;
            hash = hash.wrapping_mul(0x0100_0193);
        }
        Self(hash)
    }

    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for AssetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:08x}", self.0)
    }
}

/// Decoded container header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssetHeader {
    pub version: u32,
    pub asset_type: AssetType,
    pub embedded: bool,
}

impl AssetHeader {
    pub fn new(asset_type: AssetType, embedded: bool) -> Self {
        Self {
            version: FORMAT_VERSION,
            asset_type,
            embedded,
        }
    }

    /// Split `bytes` into a validated header and the body that follows it.
    ///
    /// `name` is only used for error messages.
    pub fn parse<'a>(name: &str, bytes: &'a [u8]) -> AssetResult<(AssetHeader, &'a [u8])> {
        let invalid = |message: String| AssetError::InvalidHeader {
            name: name.to_string(),
            message,
        };

        if bytes.len() < HEADER_SIZE {
            return Err(invalid(format!(
                "expected at least {} bytes, found {}",
                HEADER_SIZE,
                bytes.len()
            )));
        }
        if bytes[0..4] != ASSET_MAGIC {
            return Err(invalid(format!("bad magic {:?}", &bytes[0..4])));
        }

        let read_u32 = |at: usize| u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]]);
        let version = read_u32(4);
        if version != FORMAT_VERSION {
            return Err(invalid(format!("unsupported format version {}", version)));
        }

        let header = AssetHeader {
            version,
            asset_type: AssetType::from_raw(read_u32(8)),
            embedded: bytes[12] & FLAG_EMBEDDED != 0,
        };
        Ok((header, &bytes[HEADER_SIZE..]))
    }

    pub fn write(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&ASSET_MAGIC);
        out.extend_from_slice(&self.version.to_le_bytes());
        out.extend_from_slice(&self.asset_type.raw().to_le_bytes());
        out.push(if self.embedded { FLAG_EMBEDDED } else { 0 });
    }

    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut out = Vec::with_capacity(HEADER_SIZE);
        self.write(&mut out);
        let mut bytes = [0; HEADER_SIZE];
        bytes.copy_from_slice(&out);
        bytes
    }
}

/// Build a complete container: header followed by `body`.
pub fn encode(asset_type: AssetType, embedded: bool, body: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(HEADER_SIZE + body.len());
    AssetHeader::new(asset_type, embedded).write(&mut out);
    out.extend_from_slice(body);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Shader;

    impl Asset for Shader {
        fn type_name() -> &'static str {
            "Shader"
        }
    }

    #[test]
    fn test_asset_type_is_stable() {
        assert_eq!(AssetType::of::<Shader>(), AssetType::from_name("Shader"));
        assert_ne!(AssetType::from_name("Shader"), AssetType::from_name("shader"));
        // FNV-1a of the empty string is the offset basis.
        assert_eq!(AssetType::from_name("").raw(), 0x811c_9dc5);
    }

    #[test]
    fn test_parse_splits_body() {
        let bytes = encode(AssetType::of::<Shader>(), true, b"void main() {}");
        let (header, body) = AssetHeader::parse("lit", &bytes).unwrap();
        assert_eq!(header.asset_type, AssetType::of::<Shader>());
        assert!(header.embedded);
        assert_eq!(body, b"void main() {}");
    }

    #[test]
    fn test_parse_rejects_bad_magic() {
        let mut bytes = encode(AssetType::of::<Shader>(), false, b"");
        bytes[0] = b'X';
        let err = AssetHeader::parse("lit", &bytes).unwrap_err();
        assert!(matches!(err, AssetError::InvalidHeader { .. }));
    }

    #[test]
    fn test_parse_rejects_short_input() {
        assert!(AssetHeader::parse("tiny", b"CRN1").is_err());
    }

    #[test]
    fn test_parse_rejects_future_version() {
        let mut bytes = encode(AssetType::of::<Shader>(), false, b"");
        bytes[4..8].copy_from_slice(&(FORMAT_VERSION + 1).to_le_bytes());
        assert!(AssetHeader::parse("lit", &bytes).is_err());
    }

    #[test]
    fn test_to_bytes_matches_write() {
        let header = AssetHeader::new(AssetType::from_raw(7), false);
        let mut out = Vec::new();
        header.write(&mut out);
        assert_eq!(header.to_bytes().as_slice(), out.as_slice());
    }
}
