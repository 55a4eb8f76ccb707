//! Cairn Assets
//!
//! A named asset registry with a background streaming loader.
//!
//! Assets are discovered once (from directories, embedded tables or
//! manifests) and become [`AssetEntry`] records. Entries are loaded on demand,
//! either synchronously with [`Registry::load`] or in the background with
//! [`Registry::async_load`]. Background loads are read and deserialized on a
//! dedicated loader thread and finalized on the thread that owns the registry
//! during [`Registry::update`], so payloads that talk to thread-bound
//! backends are only ever created and destroyed on that thread.
//!
//! Callers hold [`AssetRef`] handles. Handles count references, which
//! [`Registry::ref_sweep`] uses to reclaim unused payloads;
//! [`Registry::purge`] reclaims by origin regardless of references.

pub mod config;
pub mod directory;
mod discover;
pub mod entry;
pub mod error;
pub mod event;
pub mod handle;
pub mod header;
pub mod io;
pub mod job;
pub mod loader;
mod pipeline;
mod reclaim;
pub mod registry;
pub mod source;

pub use config::RegistryConfig;
pub use directory::{AssetDir, DirId, DirectoryTree};
pub use entry::AssetEntry;
pub use error::{AssetError, AssetResult};
pub use event::{AssetEvent, AssetEventBuffer};
pub use handle::{AssetRef, LoadedAsset};
pub use header::{ASSET_MAGIC, AssetHeader, AssetType, FORMAT_VERSION, HEADER_SIZE, encode};
pub use io::{BytesReader, FileReader, MemoryReader};
pub use job::JobState;
pub use loader::{AssetLoader, BytesLoader, ErasedAssetLoader, FinalizeContext, LoadContext, LoaderRegistry, TextLoader};
pub use registry::Registry;
pub use source::{AssetLocator, EmbeddedAsset, Origin};

/// A payload kind the registry can hold.
///
/// `type_name` must be unique among registered kinds; it is hashed into the
/// [`AssetType`] tag stored in asset headers and used by manifests.
pub trait Asset: Send + Sync + 'static {
    fn type_name() -> &'static str;
}
