//! Populating the registry from directories, embedded tables and manifests.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use cairn_core::alloc::HashMap;
use cairn_core::profiling::profile_function;
use futures_lite::future::block_on;
use walkdir::WalkDir;

use crate::directory::DirId;
use crate::error::{AssetError, AssetResult};
use crate::header::{AssetHeader, HEADER_SIZE};
use crate::registry::Registry;
use crate::source::{AssetLocator, EmbeddedAsset, Origin};

/// Read just enough of a file to learn its asset type.
fn read_header(path: &Path) -> AssetResult<AssetHeader> {
    let io_err = |source: std::io::Error| AssetError::Io {
        path: path.to_path_buf(),
        source,
    };
    let mut buf = [0u8; HEADER_SIZE];
    File::open(path)
        .and_then(|mut file| file.read_exact(&mut buf))
        .map_err(io_err)?;
    let name = path.file_stem().map(|s| s.to_string_lossy()).unwrap_or_default();
    AssetHeader::parse(&name, &buf).map(|(header, _)| header)
}

/// `path` with the base path removed, so the reader can join it back on.
/// Paths outside the base are kept as they are.
fn relative_to(base: &Path, path: &Path) -> PathBuf {
    path.strip_prefix(base).map(Path::to_path_buf).unwrap_or_else(|_| path.to_path_buf())
}

impl Registry {
    /// Scan `root` (relative to the base path) and register every asset file in it.
    ///
    /// The root becomes a top-level directory called `name`; subdirectories
    /// mirror the filesystem. Each file with the configured extension is
    /// registered under its file stem with the type from its header. Scanning
    /// the same root again returns the existing directory without rescanning.
    pub fn discover(&mut self, name: &str, root: impl AsRef<Path>, origin: Origin) -> AssetResult<DirId> {
        profile_function!();
        let root_path = self.config.base_path.join(root.as_ref());
        if let Some(&existing) = self.roots.get(&root_path)
            && self.tree.contains(existing)
        {
            tracing::debug!("{} already discovered", root_path.display());
            return Ok(existing);
        }
        if !root_path.is_dir() {
            return Err(AssetError::NotFound {
                name: root_path.display().to_string(),
            });
        }

        let top = self
            .tree
            .create_subdirectory(self.tree.root(), name, origin)
            .ok_or_else(|| AssetError::invariant("directory tree lost its root"))?;
        self.tree.set_source_path(top, relative_to(&self.config.base_path, &root_path));

        let mut dirs: HashMap<PathBuf, DirId> = HashMap::new();
        dirs.insert(root_path.clone(), top);
        let mut registered = 0;

        for entry in WalkDir::new(&root_path).min_depth(1).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    tracing::warn!("Skipping unreadable path during discovery: {}", err);
                    continue;
                }
            };
            let path = entry.path();
            let Some(parent) = path.parent().and_then(|parent| dirs.get(parent)).copied() else {
                continue;
            };

            if entry.file_type().is_dir() {
                let dir_name = entry.file_name().to_string_lossy();
                if let Some(dir) = self.tree.create_subdirectory(parent, &dir_name, origin) {
                    self.tree.set_source_path(dir, relative_to(&self.config.base_path, path));
                    dirs.insert(path.to_path_buf(), dir);
                }
                continue;
            }

            if path.extension().and_then(|ext| ext.to_str()) != Some(self.config.extension.as_str()) {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) else {
                tracing::warn!("Skipping asset with a non UTF-8 name: {}", path.display());
                continue;
            };

            match read_header(path) {
                Ok(header) => {
                    let locator = AssetLocator::path(relative_to(&self.config.base_path, path));
                    if let Ok(true) = self.register(stem, header.asset_type, locator, Some(parent), origin) {
                        registered += 1;
                    }
                }
                Err(err) => tracing::warn!("Skipping {}: {}", path.display(), err),
            }
        }

        self.roots.insert(root_path, top);
        tracing::info!("Discovered {} assets under {}", registered, name);
        Ok(top)
    }

    /// Register assets compiled into the program. Returns how many were new.
    ///
    /// Each blob must start with an asset header. Embedded entries belong to no directory.
    pub fn discover_embedded(&mut self, table: &[EmbeddedAsset]) -> usize {
        profile_function!();
        let mut registered = 0;
        for asset in table {
            let header = match AssetHeader::parse(asset.name, asset.data) {
                Ok((header, _)) => header,
                Err(err) => {
                    tracing::warn!("Skipping embedded asset: {}", err);
                    continue;
                }
            };
            let locator = AssetLocator::Embedded(Arc::from(asset.data));
            if let Ok(true) = self.register(asset.name, header.asset_type, locator, None, asset.origin) {
                registered += 1;
            }
        }
        tracing::debug!("Registered {} embedded assets", registered);
        registered
    }

    /// Register the assets listed in a manifest read through the byte source.
    ///
    /// Each non-empty line is `TypeName,relative/path.asset`, relative to the
    /// manifest's own directory; lines starting with `#` are comments. Type
    /// names are resolved through the registered loaders. Entries go into the
    /// root directory. Returns how many were new.
    pub fn discover_manifest(&mut self, manifest: impl AsRef<Path>, origin: Origin) -> AssetResult<usize> {
        profile_function!();
        let manifest = manifest.as_ref();
        let bytes = block_on(self.reader.read_bytes(manifest))?;
        let text = String::from_utf8(bytes)
            .map_err(|_| AssetError::loader(manifest.display().to_string(), "manifest is not valid UTF-8"))?;
        let base_dir = manifest.parent().unwrap_or(Path::new(""));
        let root = self.tree.root();

        let mut registered = 0;
        for (line_number, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((type_name, file)) = line.split_once(',') else {
                tracing::warn!("{}:{}: expected `Type,path`", manifest.display(), line_number + 1);
                continue;
            };
            let Some(asset_type) = self.loaders.type_for_name(type_name.trim()) else {
                tracing::warn!(
                    "{}:{}: unknown asset type {}",
                    manifest.display(),
                    line_number + 1,
                    type_name.trim()
                );
                continue;
            };

            let path = base_dir.join(file.trim());
            let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()).map(str::to_string) else {
                continue;
            };
            if let Ok(true) = self.register(stem, asset_type, AssetLocator::Path(path), Some(root), origin) {
                registered += 1;
            }
        }

        tracing::info!("Registered {} assets from {}", registered, manifest.display());
        Ok(registered)
    }
}
