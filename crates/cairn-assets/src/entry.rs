//! Registry entries: what exists, independent of what is loaded.

use crate::directory::DirId;
use crate::handle::LoadedAsset;
use crate::header::AssetType;
use crate::source::{AssetLocator, Origin};

/// One discoverable asset.
///
/// Identity fields never change after registration. Only the loaded instance
/// comes and goes.
#[derive(Debug)]
pub struct AssetEntry {
    name: String,
    locator: AssetLocator,
    asset_type: AssetType,
    origin: Origin,
    directory: Option<DirId>,
    instance: Option<LoadedAsset>,
}

impl AssetEntry {
    pub(crate) fn new(
        name: String,
        locator: AssetLocator,
        asset_type: AssetType,
        origin: Origin,
        directory: Option<DirId>,
    ) -> Self {
        Self {
            name,
            locator,
            asset_type,
            origin,
            directory,
            instance: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn locator(&self) -> &AssetLocator {
        &self.locator
    }

    pub fn asset_type(&self) -> AssetType {
        self.asset_type
    }

    pub fn origin(&self) -> Origin {
        self.origin
    }

    pub fn directory(&self) -> Option<DirId> {
        self.directory
    }

    pub fn instance(&self) -> Option<&LoadedAsset> {
        self.instance.as_ref()
    }

    pub fn is_loaded(&self) -> bool {
        self.instance.is_some()
    }

    pub(crate) fn set_instance(&mut self, instance: LoadedAsset) {
        debug_assert_eq!(instance.asset_type(), self.asset_type);
        self.instance = Some(instance);
    }

    pub(crate) fn take_instance(&mut self) -> Option<LoadedAsset> {
        self.instance.take()
    }
}
