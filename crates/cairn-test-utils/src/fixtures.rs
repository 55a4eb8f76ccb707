//! Helpers for building asset containers and writing them to disk.

use std::fs;
use std::path::{Path, PathBuf};

use cairn_assets::{Asset, AssetType, encode};

use crate::kinds::{MaterialDesc, Mesh, Texture, TextureLoader};

/// A complete texture container filled with a single RGBA color.
pub fn texture_bytes(width: u32, height: u32, rgba: [u8; 4]) -> Vec<u8> {
    let pixels: Vec<u8> = rgba.iter().copied().cycle().take(width as usize * height as usize * 4).collect();
    encode(AssetType::of::<Texture>(), false, &TextureLoader::encode_body(width, height, &pixels))
}

pub fn mesh_bytes(vertices: &[[f32; 3]]) -> Vec<u8> {
    let mesh = Mesh {
        vertices: vertices.to_vec(),
    };
    encode(AssetType::of::<Mesh>(), false, &mesh.to_body())
}

/// A complete material container referencing `texture`.
pub fn material_bytes(texture: &str, tint: [f32; 4]) -> Vec<u8> {
    let desc = MaterialDesc {
        texture: texture.to_string(),
        tint,
    };
    let body = serde_json::to_vec(&desc).unwrap_or_default();
    encode(AssetType::of::<crate::kinds::Material>(), false, &body)
}

/// A container of any kind around a raw body.
pub fn container<T: Asset>(body: &[u8]) -> Vec<u8> {
    encode(AssetType::of::<T>(), false, body)
}

/// Write `bytes` to `dir/relative`, creating parent directories.
pub fn write_asset(dir: &Path, relative: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.join(relative);
    if let Some(parent) = path.parent()
        && let Err(err) = fs::create_dir_all(parent)
    {
        tracing::error!("Failed to create {}: {}", parent.display(), err);
    }
    if let Err(err) = fs::write(&path, bytes) {
        tracing::error!("Failed to write {}: {}", path.display(), err);
    }
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use cairn_assets::AssetHeader;

    #[test]
    fn test_fixture_headers_carry_kind() {
        let bytes = texture_bytes(2, 1, [9, 8, 7, 6]);
        let (header, body) = AssetHeader::parse("Wood", &bytes).unwrap();
        assert_eq!(header.asset_type, AssetType::of::<Texture>());
        assert_eq!(body.len(), 8 + 8);
        assert_eq!(&body[8..12], &[9, 8, 7, 6]);

        let (header, _) = AssetHeader::parse("Quad", &mesh_bytes(&[[0.0; 3]])).unwrap();
        assert_eq!(header.asset_type, AssetType::of::<Mesh>());
    }

    #[test]
    fn test_write_asset_creates_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_asset(dir.path(), "a/b/Wood.asset", &texture_bytes(1, 1, [0; 4]));
        assert!(path.exists());
        assert_eq!(path, dir.path().join("a/b/Wood.asset"));
    }
}
