//! Test utilities for cairn.
//!
//! This crate provides a mock rendering device and a few sample asset kinds
//! that exercise the registry the way real content does.
//!
//! # Overview
//!
//! - [`MockDevice`] - records uploads and releases together with the calling
//!   thread, so tests can check that finalization stays on the owning thread
//! - [`Texture`] - device-backed kind, uploaded during finalize
//! - [`Mesh`] - pure-data kind
//! - [`Material`] - composite kind that depends on a texture by name
//! - [`fixtures`] - helpers that write asset containers to disk
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use cairn_assets::{Registry, RegistryConfig};
//! use cairn_test_utils::{MockDevice, register_sample_loaders};
//!
//! let device = Arc::new(MockDevice::new());
//! let mut registry = Registry::new(RegistryConfig::default()).unwrap();
//! register_sample_loaders(&mut registry, &device);
//! assert_eq!(device.count_uploads(), 0);
//! ```

pub mod device;
pub mod fixtures;
pub mod kinds;

pub use device::{DeviceCall, MockDevice, ResourceId};
pub use kinds::{Material, MaterialDesc, MaterialLoader, Mesh, MeshLoader, Texture, TextureLoader, ThreadProbe};

use std::sync::Arc;

use cairn_assets::Registry;

/// Register the texture, mesh and material loaders against `device`.
///
/// The returned probe records which threads texture bodies were decoded on.
pub fn register_sample_loaders(registry: &mut Registry, device: &Arc<MockDevice>) -> Arc<ThreadProbe> {
    let probe = Arc::new(ThreadProbe::default());
    registry.register_loader(TextureLoader::new(device.clone(), probe.clone()));
    registry.register_loader(MeshLoader);
    registry.register_loader(MaterialLoader);
    probe
}

/// Install a test-friendly tracing subscriber once per process.
pub fn init_logging() {
    let _ = cairn_core::logging::try_init();
}
