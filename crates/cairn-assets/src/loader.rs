//! Asset loader traits and infrastructure.
//!
//! Loading is split in two. [`AssetLoader::deserialize`] runs on the loader
//! thread and turns container bytes into plain staged data. [`AssetLoader::finalize`]
//! runs on the thread that owns the [`Registry`] and may touch thread-bound
//! resources such as a rendering device.

use std::any::Any;
use std::sync::Arc;

use cairn_core::alloc::HashMap;

use crate::Asset;
use crate::error::{AssetError, AssetResult};
use crate::handle::{AssetRef, ErasedPayload, LoadedAsset};
use crate::header::AssetType;
use crate::registry::Registry;
use crate::source::AssetLocator;

/// Context provided to [`AssetLoader::deserialize`].
pub struct LoadContext<'a> {
    name: &'a str,
    locator: &'a AssetLocator,
    bytes: &'a [u8],
    dependencies: Vec<String>,
}

impl<'a> LoadContext<'a> {
    /// Create a new load context over an asset body (header already stripped).
    pub fn new(name: &'a str, locator: &'a AssetLocator, bytes: &'a [u8]) -> Self {
        Self {
            name,
            locator,
            bytes,
            dependencies: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        self.name
    }

    pub fn locator(&self) -> &AssetLocator {
        self.locator
    }

    /// The asset body.
    pub fn bytes(&self) -> &'a [u8] {
        self.bytes
    }

    /// Declare that finalizing this asset needs `name` loaded first.
    pub fn depends_on(&mut self, name: impl Into<String>) {
        let name = name.into();
        if !self.dependencies.contains(&name) {
            self.dependencies.push(name);
        }
    }

    pub fn dependencies(&self) -> &[String] {
        &self.dependencies
    }

    pub(crate) fn into_dependencies(self) -> Vec<String> {
        self.dependencies
    }

    /// Convenience for building a [`AssetError::LoaderError`] about this asset.
    pub fn error(&self, message: impl Into<String>) -> AssetError {
        AssetError::loader(self.name, message)
    }
}

/// Context provided to [`AssetLoader::finalize`] on the owning thread.
pub struct FinalizeContext<'a> {
    registry: &'a Registry,
    name: &'a str,
}

impl<'a> FinalizeContext<'a> {
    pub(crate) fn new(registry: &'a Registry, name: &'a str) -> Self {
        Self { registry, name }
    }

    /// Name of the asset being finalized.
    pub fn name(&self) -> &str {
        self.name
    }

    /// A counted handle to a loaded dependency, null if it is not loaded.
    ///
    /// Declared dependencies are always loaded by the time `finalize` runs.
    pub fn resolve(&self, name: &str) -> AssetRef {
        match self.registry.fetch(name) {
            Some(asset) => AssetRef::from_asset(&asset),
            None => AssetRef::new(),
        }
    }

    pub fn fetch(&self, name: &str) -> Option<LoadedAsset> {
        self.registry.fetch(name)
    }

    pub fn error(&self, message: impl Into<String>) -> AssetError {
        AssetError::loader(self.name, message)
    }
}

/// Payload contract implemented once per asset kind.
///
/// # Example
///
/// ```ignore
/// struct TextureLoader { device: Arc<Device> }
///
/// impl AssetLoader for TextureLoader {
///     type Asset = Texture;
///     type Staged = Image;
///
///     fn deserialize(&self, ctx: &mut LoadContext<'_>) -> AssetResult<Image> {
///         Image::decode(ctx.bytes()).map_err(|e| ctx.error(e.to_string()))
///     }
///
///     fn finalize(&self, image: Image, _ctx: &FinalizeContext<'_>) -> AssetResult<Texture> {
///         Ok(self.device.upload(image))
///     }
/// }
/// ```
pub trait AssetLoader: Send + Sync + 'static {
    /// The finalized payload.
    type Asset: Asset;

    /// Data produced off-thread and handed to `finalize`.
    type Staged: Send + 'static;

    /// Decode the body. Runs on the loader thread and must not touch thread-bound resources.
    fn deserialize(&self, ctx: &mut LoadContext<'_>) -> AssetResult<Self::Staged>;

    /// Build the payload. Runs on the owning thread.
    fn finalize(&self, staged: Self::Staged, ctx: &FinalizeContext<'_>) -> AssetResult<Self::Asset>;

    /// Release resources held outside the payload. Runs on the owning thread.
    fn destroy(&self, _asset: &Self::Asset) {}

    /// Encode the payload back into a body.
    fn serialize(&self, _asset: &Self::Asset) -> AssetResult<Vec<u8>> {
        Err(AssetError::loader(
            <Self::Asset as Asset>::type_name(),
            "serialization is not supported for this asset type",
        ))
    }
}

/// Type-erased asset loader for dynamic dispatch.
pub trait ErasedAssetLoader: Send + Sync {
    fn asset_type(&self) -> AssetType;

    fn type_name(&self) -> &'static str;

    fn deserialize_erased(&self, ctx: &mut LoadContext<'_>) -> AssetResult<Box<dyn Any + Send>>;

    fn finalize_erased(&self, staged: Box<dyn Any + Send>, ctx: &FinalizeContext<'_>) -> AssetResult<ErasedPayload>;

    fn destroy_erased(&self, payload: &ErasedPayload);

    fn serialize_erased(&self, payload: &ErasedPayload) -> AssetResult<Vec<u8>>;
}

impl<L: AssetLoader> ErasedAssetLoader for L {
    fn asset_type(&self) -> AssetType {
        AssetType::of::<L::Asset>()
    }

    fn type_name(&self) -> &'static str {
        <L::Asset as Asset>::type_name()
    }

    fn deserialize_erased(&self, ctx: &mut LoadContext<'_>) -> AssetResult<Box<dyn Any + Send>> {
        let staged = self.deserialize(ctx)?;
        Ok(Box::new(staged))
    }

    fn finalize_erased(&self, staged: Box<dyn Any + Send>, ctx: &FinalizeContext<'_>) -> AssetResult<ErasedPayload> {
        let staged = staged.downcast::<L::Staged>().map_err(|_| {
            AssetError::invariant(format!(
                "staged data for '{}' was not produced by the {} loader",
                ctx.name(),
                self.type_name()
            ))
        })?;
        let asset = self.finalize(*staged, ctx)?;
        let payload: ErasedPayload = Arc::new(asset);
        Ok(payload)
    }

    fn destroy_erased(&self, payload: &ErasedPayload) {
        if let Some(asset) = (**payload).downcast_ref::<L::Asset>() {
            self.destroy(asset);
        }
    }

    fn serialize_erased(&self, payload: &ErasedPayload) -> AssetResult<Vec<u8>> {
        let asset = (**payload).downcast_ref::<L::Asset>().ok_or_else(|| {
            AssetError::invariant(format!("payload is not a {}", self.type_name()))
        })?;
        self.serialize(asset)
    }
}

/// Registry of asset loaders, one per [`AssetType`].
#[derive(Default)]
pub struct LoaderRegistry {
    by_type: HashMap<AssetType, Arc<dyn ErasedAssetLoader>>,
    by_name: HashMap<&'static str, AssetType>,
}

impl LoaderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `loader` for its asset type, replacing any previous one.
    pub fn register<L: AssetLoader>(&mut self, loader: L) {
        let loader: Arc<dyn ErasedAssetLoader> = Arc::new(loader);
        let asset_type = loader.asset_type();
        let type_name = loader.type_name();

        if let Some(&existing) = self.by_name.get(type_name)
            && existing != asset_type
        {
            tracing::warn!("Type name {} is claimed by two different tags", type_name);
        }
        if self.by_type.insert(asset_type, loader).is_some() {
            tracing::debug!("Replaced loader for {}", type_name);
        }
        self.by_name.insert(type_name, asset_type);
    }

    pub fn get(&self, asset_type: AssetType) -> Option<&Arc<dyn ErasedAssetLoader>> {
        self.by_type.get(&asset_type)
    }

    pub fn get_or_err(&self, asset_type: AssetType) -> AssetResult<Arc<dyn ErasedAssetLoader>> {
        self.get(asset_type).cloned().ok_or(AssetError::NoLoader {
            asset_type,
            type_name: None,
        })
    }

    /// Look up a type tag by the type name used in manifests.
    pub fn type_for_name(&self, type_name: &str) -> Option<AssetType> {
        self.by_name.get(type_name).copied()
    }

    pub fn type_name(&self, asset_type: AssetType) -> Option<&'static str> {
        self.by_type.get(&asset_type).map(|loader| loader.type_name())
    }

    pub fn contains(&self, asset_type: AssetType) -> bool {
        self.by_type.contains_key(&asset_type)
    }

    pub fn len(&self) -> usize {
        self.by_type.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_type.is_empty()
    }
}

impl Asset for String {
    fn type_name() -> &'static str {
        "Text"
    }
}

impl Asset for Vec<u8> {
    fn type_name() -> &'static str {
        "Bytes"
    }
}

/// Loads UTF-8 text bodies as `String`.
pub struct TextLoader;

impl AssetLoader for TextLoader {
    type Asset = String;
    type Staged = String;

    fn deserialize(&self, ctx: &mut LoadContext<'_>) -> AssetResult<String> {
        String::from_utf8(ctx.bytes().to_vec()).map_err(|e| ctx.error(format!("Invalid UTF-8: {}", e)))
    }

    fn finalize(&self, staged: String, _ctx: &FinalizeContext<'_>) -> AssetResult<String> {
        Ok(staged)
    }

    fn serialize(&self, asset: &String) -> AssetResult<Vec<u8>> {
        Ok(asset.as_bytes().to_vec())
    }
}

/// Loads bodies verbatim as `Vec<u8>`.
pub struct BytesLoader;

impl AssetLoader for BytesLoader {
    type Asset = Vec<u8>;
    type Staged = Vec<u8>;

    fn deserialize(&self, ctx: &mut LoadContext<'_>) -> AssetResult<Vec<u8>> {
        Ok(ctx.bytes().to_vec())
    }

    fn finalize(&self, staged: Vec<u8>, _ctx: &FinalizeContext<'_>) -> AssetResult<Vec<u8>> {
        Ok(staged)
    }

    fn serialize(&self, asset: &Vec<u8>) -> AssetResult<Vec<u8>> {
        Ok(asset.clone())
    }
}
