//! Where an asset's bytes come from, and who owns the content.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// The single source of an entry's bytes.
#[derive(Clone, PartialEq, Eq, Hash)]
pub enum AssetLocator {
    /// A path resolved through the registry's [`BytesReader`](crate::io::BytesReader).
    Path(PathBuf),
    /// Bytes compiled into (or handed to) the program.
    Embedded(Arc<[u8]>),
}

impl AssetLocator {
    pub fn path(path: impl AsRef<Path>) -> Self {
        AssetLocator::Path(path.as_ref().to_path_buf())
    }

    pub fn embedded(bytes: impl Into<Arc<[u8]>>) -> Self {
        AssetLocator::Embedded(bytes.into())
    }

    pub fn as_path(&self) -> Option<&Path> {
        match self {
            AssetLocator::Path(path) => Some(path),
            AssetLocator::Embedded(_) => None,
        }
    }

    pub fn is_embedded(&self) -> bool {
        matches!(self, AssetLocator::Embedded(_))
    }

    /// Human-readable form for logs and errors.
    pub fn display_path(&self) -> String {
        match self {
            AssetLocator::Path(path) => path.display().to_string(),
            AssetLocator::Embedded(bytes) => {
                format!("<embedded {} bytes, {:016x}>", bytes.len(), content_hash(bytes))
            }
        }
    }
}

impl fmt::Debug for AssetLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetLocator::Path(path) => f.debug_tuple("Path").field(path).finish(),
            AssetLocator::Embedded(bytes) => f.debug_tuple("Embedded").field(&bytes.len()).finish(),
        }
    }
}

/// FNV-1a over the content, used to tell embedded blobs apart in logs.
fn content_hash(data: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf29ce484222325;
    for byte in data {
        hash ^= *byte as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}

/// Who owns a piece of content.
///
/// Engine content ships with the program and survives a project purge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Origin {
    Engine,
    #[default]
    Project,
}

/// A row of a static embedded-asset table.
#[derive(Debug, Clone, Copy)]
pub struct EmbeddedAsset {
    pub name: &'static str,
    pub data: &'static [u8],
    pub origin: Origin,
}

impl EmbeddedAsset {
    pub const fn new(name: &'static str, data: &'static [u8], origin: Origin) -> Self {
        Self { name, data, origin }
    }
}
