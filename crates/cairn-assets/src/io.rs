//! Byte sources that path locators are resolved through.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;

use cairn_core::alloc::HashMap;
use parking_lot::RwLock;

use crate::error::{AssetError, AssetResult};

/// Future type for async byte loading.
pub type BytesFuture = Pin<Box<dyn Future<Output = AssetResult<Vec<u8>>> + Send + 'static>>;

/// Future type for async writes.
pub type WriteFuture = Pin<Box<dyn Future<Output = AssetResult<()>> + Send + 'static>>;

/// Pluggable strategy for turning a path locator into bytes.
///
/// Shared between the owning thread and the loader thread.
pub trait BytesReader: Send + Sync {
    /// Read all bytes from a path.
    fn read_bytes(&self, path: &Path) -> BytesFuture;

    /// Check if a path exists.
    fn exists(&self, path: &Path) -> Pin<Box<dyn Future<Output = bool> + Send + 'static>>;

    /// Replace the bytes stored at a path. Read-only sources keep the default.
    fn write_bytes(&self, path: &Path, _bytes: Vec<u8>) -> WriteFuture {
        let path = path.to_path_buf();
        Box::pin(async move {
            Err(AssetError::Io {
                path,
                source: std::io::Error::new(std::io::ErrorKind::Unsupported, "read-only byte source"),
            })
        })
    }
}

/// Blocking file reader wrapped in ready futures.
pub struct FileReader {
    base_path: PathBuf,
}

impl FileReader {
    /// Create a new file reader with a base path for relative paths.
    pub fn new(base_path: impl AsRef<Path>) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_path.join(path)
        }
    }

    pub fn read_bytes_sync(&self, path: &Path) -> AssetResult<Vec<u8>> {
        let full_path = self.resolve_path(path);
        std::fs::read(&full_path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                AssetError::NotFound {
                    name: full_path.display().to_string(),
                }
            } else {
                AssetError::Io {
                    path: full_path.clone(),
                    source: e,
                }
            }
        })
    }

    pub fn write_bytes_sync(&self, path: &Path, bytes: &[u8]) -> AssetResult<()> {
        let full_path = self.resolve_path(path);
        if let Some(parent) = full_path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|source| AssetError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        std::fs::write(&full_path, bytes).map_err(|source| AssetError::Io {
            path: full_path,
            source,
        })
    }
}

impl BytesReader for FileReader {
    fn read_bytes(&self, path: &Path) -> BytesFuture {
        let result = self.read_bytes_sync(path);
        Box::pin(async move { result })
    }

    fn exists(&self, path: &Path) -> Pin<Box<dyn Future<Output = bool> + Send + 'static>> {
        let exists = self.resolve_path(path).exists();
        Box::pin(async move { exists })
    }

    fn write_bytes(&self, path: &Path, bytes: Vec<u8>) -> WriteFuture {
        let result = self.write_bytes_sync(path, &bytes);
        Box::pin(async move { result })
    }
}

/// In-memory byte source keyed by path string, for tests and packaged content.
#[derive(Default)]
pub struct MemoryReader {
    files: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryReader {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(path: &Path) -> String {
        path.to_string_lossy().replace('\\', "/")
    }

    pub fn insert(&self, path: impl AsRef<Path>, bytes: Vec<u8>) {
        self.files.write().insert(Self::key(path.as_ref()), bytes);
    }

    pub fn remove(&self, path: impl AsRef<Path>) -> Option<Vec<u8>> {
        self.files.write().remove(&Self::key(path.as_ref()))
    }

    pub fn contains(&self, path: impl AsRef<Path>) -> bool {
        self.files.read().contains_key(&Self::key(path.as_ref()))
    }

    pub fn get(&self, path: impl AsRef<Path>) -> Option<Vec<u8>> {
        self.files.read().get(&Self::key(path.as_ref())).cloned()
    }
}

impl BytesReader for MemoryReader {
    fn read_bytes(&self, path: &Path) -> BytesFuture {
        let key = Self::key(path);
        let result = self
            .files
            .read()
            .get(&key)
            .cloned()
            .ok_or(AssetError::NotFound { name: key });
        Box::pin(async move { result })
    }

    fn exists(&self, path: &Path) -> Pin<Box<dyn Future<Output = bool> + Send + 'static>> {
        let exists = self.contains(path);
        Box::pin(async move { exists })
    }

    fn write_bytes(&self, path: &Path, bytes: Vec<u8>) -> WriteFuture {
        self.insert(path, bytes);
        Box::pin(async move { Ok(()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_lite::future::block_on;

    #[test]
    fn test_memory_reader_round_trip() {
        let reader = MemoryReader::new();
        reader.insert("Project/Level.asset", vec![1, 2, 3]);

        assert!(block_on(reader.exists(Path::new("Project/Level.asset"))));
        assert_eq!(
            block_on(reader.read_bytes(Path::new("Project/Level.asset"))).unwrap(),
            vec![1, 2, 3]
        );
        assert!(block_on(reader.read_bytes(Path::new("Project/Other.asset"))).is_err());
    }

    #[test]
    fn test_memory_reader_write() {
        let reader = MemoryReader::new();
        block_on(reader.write_bytes(Path::new("a/b.asset"), vec![7])).unwrap();
        assert_eq!(reader.get("a/b.asset"), Some(vec![7]));
        assert_eq!(reader.remove("a/b.asset"), Some(vec![7]));
        assert!(!reader.contains("a/b.asset"));
    }

    #[test]
    fn test_file_reader_relative_to_base() {
        let temp_dir = tempfile::tempdir().unwrap();
        std::fs::write(temp_dir.path().join("hello.asset"), b"hi").unwrap();

        let reader = FileReader::new(temp_dir.path());
        assert_eq!(reader.read_bytes_sync(Path::new("hello.asset")).unwrap(), b"hi");
        assert!(block_on(reader.exists(Path::new("hello.asset"))));
        assert!(!block_on(reader.exists(Path::new("nope.asset"))));
    }

    #[test]
    fn test_file_reader_missing_is_not_found() {
        let temp_dir = tempfile::tempdir().unwrap();
        let reader = FileReader::new(temp_dir.path());
        let err = reader.read_bytes_sync(Path::new("missing.asset")).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_file_reader_write_creates_directories() {
        let temp_dir = tempfile::tempdir().unwrap();
        let reader = FileReader::new(temp_dir.path());
        block_on(reader.write_bytes(Path::new("nested/dir/out.asset"), b"data".to_vec())).unwrap();
        assert_eq!(
            std::fs::read(temp_dir.path().join("nested/dir/out.asset")).unwrap(),
            b"data"
        );
    }
}
