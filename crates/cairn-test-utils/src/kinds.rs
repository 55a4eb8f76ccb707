//! Sample asset kinds.
//!
//! [`Texture`] owns a device resource, [`Mesh`] is plain data and [`Material`]
//! references a texture by name, which makes it the usual dependency case.

use std::sync::Arc;
use std::thread;

use cairn_assets::{Asset, AssetError, AssetLoader, AssetRef, AssetResult, FinalizeContext, LoadContext};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::device::{MockDevice, ResourceId};

/// Records the names of threads a loader ran on.
#[derive(Debug, Default)]
pub struct ThreadProbe {
    deserialize: Mutex<Vec<String>>,
}

impl ThreadProbe {
    fn record(&self) {
        let name = thread::current().name().unwrap_or("<unnamed>").to_string();
        self.deserialize.lock().push(name);
    }

    /// Thread names seen by `deserialize`, in call order.
    pub fn deserialize_threads(&self) -> Vec<String> {
        self.deserialize.lock().clone()
    }
}

fn read_u32(bytes: &[u8], offset: usize) -> Option<u32> {
    let raw = bytes.get(offset..offset + 4)?;
    Some(u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]))
}

// ==========================================================================
// Texture
// ==========================================================================

/// RGBA8 texture uploaded to the mock device.
#[derive(Debug)]
pub struct Texture {
    pub label: String,
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
    pub resource: ResourceId,
}

impl Asset for Texture {
    fn type_name() -> &'static str {
        "Texture"
    }
}

/// Decoded texture body waiting for upload.
pub struct TextureData {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

/// Body layout: width (u32 LE), height (u32 LE), then `width * height * 4` bytes.
pub struct TextureLoader {
    device: Arc<MockDevice>,
    probe: Arc<ThreadProbe>,
}

impl TextureLoader {
    pub fn new(device: Arc<MockDevice>, probe: Arc<ThreadProbe>) -> Self {
        Self { device, probe }
    }

    pub fn encode_body(width: u32, height: u32, pixels: &[u8]) -> Vec<u8> {
        let mut body = Vec::with_capacity(8 + pixels.len());
        body.extend_from_slice(&width.to_le_bytes());
        body.extend_from_slice(&height.to_le_bytes());
        body.extend_from_slice(pixels);
        body
    }
}

impl AssetLoader for TextureLoader {
    type Asset = Texture;
    type Staged = TextureData;

    fn deserialize(&self, ctx: &mut LoadContext<'_>) -> AssetResult<TextureData> {
        self.probe.record();
        let bytes = ctx.bytes();
        let (Some(width), Some(height)) = (read_u32(bytes, 0), read_u32(bytes, 4)) else {
            return Err(ctx.error("texture body is truncated"));
        };
        let pixels = &bytes[8..];
        let expected = width as usize * height as usize * 4;
        if pixels.len() != expected {
            return Err(ctx.error(format!(
                "expected {} pixel bytes for {}x{}, found {}",
                expected,
                width,
                height,
                pixels.len()
            )));
        }
        Ok(TextureData {
            width,
            height,
            pixels: pixels.to_vec(),
        })
    }

    fn finalize(&self, data: TextureData, ctx: &FinalizeContext<'_>) -> AssetResult<Texture> {
        let resource = self.device.upload(ctx.name(), &data.pixels);
        Ok(Texture {
            label: ctx.name().to_string(),
            width: data.width,
            height: data.height,
            pixels: data.pixels,
            resource,
        })
    }

    fn destroy(&self, texture: &Texture) {
        self.device.release(&texture.label, texture.resource);
    }

    fn serialize(&self, texture: &Texture) -> AssetResult<Vec<u8>> {
        Ok(Self::encode_body(texture.width, texture.height, &texture.pixels))
    }
}

// ==========================================================================
// Mesh
// ==========================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    pub vertices: Vec<[f32; 3]>,
}

impl Asset for Mesh {
    fn type_name() -> &'static str {
        "Mesh"
    }
}

impl Mesh {
    /// Vertex count (u32 LE) followed by xyz triples of f32 LE.
    pub fn to_body(&self) -> Vec<u8> {
        let mut body = Vec::with_capacity(4 + self.vertices.len() * 12);
        body.extend_from_slice(&(self.vertices.len() as u32).to_le_bytes());
        for vertex in &self.vertices {
            for component in vertex {
                body.extend_from_slice(&component.to_le_bytes());
            }
        }
        body
    }
}

pub struct MeshLoader;

impl AssetLoader for MeshLoader {
    type Asset = Mesh;
    type Staged = Mesh;

    fn deserialize(&self, ctx: &mut LoadContext<'_>) -> AssetResult<Mesh> {
        let bytes = ctx.bytes();
        let count = read_u32(bytes, 0).ok_or_else(|| ctx.error("mesh body is truncated"))? as usize;
        let data = &bytes[4..];
        if data.len() != count * 12 {
            return Err(ctx.error(format!("expected {} vertices", count)));
        }
        let vertices = data
            .chunks_exact(12)
            .map(|chunk| {
                let f = |i: usize| f32::from_le_bytes([chunk[i], chunk[i + 1], chunk[i + 2], chunk[i + 3]]);
                [f(0), f(4), f(8)]
            })
            .collect();
        Ok(Mesh { vertices })
    }

    fn finalize(&self, mesh: Mesh, _ctx: &FinalizeContext<'_>) -> AssetResult<Mesh> {
        Ok(mesh)
    }

    fn serialize(&self, mesh: &Mesh) -> AssetResult<Vec<u8>> {
        Ok(mesh.to_body())
    }
}

// ==========================================================================
// Material
// ==========================================================================

/// On-disk form of a material, stored as JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialDesc {
    pub texture: String,
    pub tint: [f32; 4],
}

/// A material holding a counted reference to its texture.
#[derive(Debug)]
pub struct Material {
    pub texture: AssetRef,
    pub desc: MaterialDesc,
}

impl Asset for Material {
    fn type_name() -> &'static str {
        "Material"
    }
}

pub struct MaterialLoader;

impl AssetLoader for MaterialLoader {
    type Asset = Material;
    type Staged = MaterialDesc;

    fn deserialize(&self, ctx: &mut LoadContext<'_>) -> AssetResult<MaterialDesc> {
        let desc: MaterialDesc =
            serde_json::from_slice(ctx.bytes()).map_err(|e| ctx.error(format!("Invalid material: {}", e)))?;
        ctx.depends_on(desc.texture.clone());
        Ok(desc)
    }

    fn finalize(&self, desc: MaterialDesc, ctx: &FinalizeContext<'_>) -> AssetResult<Material> {
        let texture = ctx.resolve(&desc.texture);
        if texture.is_null() {
            return Err(ctx.error(format!("texture {} is not loaded", desc.texture)));
        }
        Ok(Material { texture, desc })
    }

    fn serialize(&self, material: &Material) -> AssetResult<Vec<u8>> {
        serde_json::to_vec(&material.desc).map_err(|e| AssetError::LoaderError {
            name: Material::type_name().to_string(),
            message: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cairn_assets::AssetLocator;

    #[test]
    fn test_texture_body_validation() {
        let loader = TextureLoader::new(Arc::new(MockDevice::new()), Arc::new(ThreadProbe::default()));
        let locator = AssetLocator::path("Wood.asset");

        let good = TextureLoader::encode_body(1, 1, &[1, 2, 3, 4]);
        let mut ctx = LoadContext::new("Wood", &locator, &good);
        assert!(loader.deserialize(&mut ctx).is_ok());

        let short = TextureLoader::encode_body(2, 2, &[0; 4]);
        let mut ctx = LoadContext::new("Wood", &locator, &short);
        assert!(loader.deserialize(&mut ctx).is_err());

        let mut ctx = LoadContext::new("Wood", &locator, &[1, 0]);
        assert!(loader.deserialize(&mut ctx).is_err());
    }

    #[test]
    fn test_mesh_body_decodes() {
        let mesh = Mesh {
            vertices: vec![[0.0, 1.0, 2.0], [-1.5, 0.25, 8.0]],
        };
        let body = mesh.to_body();
        let locator = AssetLocator::path("Quad.asset");
        let mut ctx = LoadContext::new("Quad", &locator, &body);
        assert_eq!(MeshLoader.deserialize(&mut ctx).unwrap(), mesh);
    }

    #[test]
    fn test_material_declares_texture_dependency() {
        let desc = MaterialDesc {
            texture: "Wood".to_string(),
            tint: [1.0, 0.5, 0.5, 1.0],
        };
        let body = serde_json::to_vec(&desc).unwrap();
        let locator = AssetLocator::path("Floor.asset");
        let mut ctx = LoadContext::new("Floor", &locator, &body);
        assert_eq!(MaterialLoader.deserialize(&mut ctx).unwrap(), desc);
        assert_eq!(ctx.dependencies(), ["Wood".to_string()]);
    }
}
