//! Unloading, reference sweeps and purges.

use cairn_core::profiling::profile_function;

use crate::directory::DirId;
use crate::event::AssetEvent;
use crate::handle::LoadedAsset;
use crate::registry::Registry;
use crate::source::Origin;

impl Registry {
    /// Destroy the loaded instance of `name`, keeping the entry.
    ///
    /// Returns false if nothing was loaded or if handles still reference the payload.
    pub fn unload(&mut self, name: &str) -> bool {
        let Some(instance) = self.entries.get(name).and_then(|entry| entry.instance()) else {
            return false;
        };
        let refs = instance.ref_count();
        if refs > 0 {
            tracing::warn!("Cannot unload asset {}, {} references are still held", name, refs);
            return false;
        }
        self.force_unload(name)
    }

    /// Unload regardless of outstanding references.
    fn force_unload(&mut self, name: &str) -> bool {
        let Some(instance) = self.entries.get_mut(name).and_then(|entry| entry.take_instance()) else {
            return false;
        };
        self.destroy(&instance);
        tracing::debug!("Unloaded asset {}", name);
        self.events.push(AssetEvent::Unloaded {
            name: name.to_string(),
            asset_type: instance.asset_type(),
        });
        true
    }

    /// Empty the payload cell and let the loader release external resources.
    ///
    /// Handles still bound to the cell read as null afterwards.
    fn destroy(&self, asset: &LoadedAsset) {
        let Some(payload) = asset.take_value() else {
            return;
        };
        match self.loaders.get(asset.asset_type()) {
            Some(loader) => loader.destroy_erased(&payload),
            None => tracing::warn!("No loader to destroy {} payload", asset.type_name()),
        }
    }

    /// Unload every named payload with no outstanding references.
    ///
    /// Runs repeated passes, since destroying one payload can release the last
    /// reference to another. Returns the number of payloads unloaded.
    pub fn ref_sweep(&mut self) -> usize {
        profile_function!();
        let mut swept = 0;
        for _ in 0..self.config.sweep_passes {
            let idle: Vec<String> = self
                .entries
                .values()
                .filter(|entry| entry.instance().is_some_and(|instance| instance.ref_count() == 0))
                .map(|entry| entry.name().to_string())
                .collect();
            if idle.is_empty() {
                break;
            }
            swept += idle.iter().filter(|name| self.unload(name)).count();
        }

        if swept > 0 {
            tracing::info!("Reference sweep unloaded {} assets", swept);
        }
        swept
    }

    /// Destroy every transient payload nobody references any more.
    pub fn reclaim_transients(&mut self) -> usize {
        let (idle, live): (Vec<_>, Vec<_>) = std::mem::take(&mut self.transients)
            .into_iter()
            .partition(|asset| asset.ref_count() == 0 || !asset.is_alive());
        self.transients = live;
        for asset in &idle {
            self.destroy(asset);
        }
        idle.len()
    }

    /// Forcibly unload every payload of the given origin.
    ///
    /// With `purge_engine` set, engine content goes too; otherwise only project
    /// content is purged. Reference counts are ignored: handles to purged
    /// payloads read as null afterwards. Entries are kept.
    pub fn purge(&mut self, purge_engine: bool) -> usize {
        profile_function!();
        let selected = |origin: Origin| purge_engine || origin == Origin::Project;

        let mut names: Vec<String> = self
            .entries
            .values()
            .filter(|entry| entry.is_loaded() && selected(entry.origin()))
            .map(|entry| entry.name().to_string())
            .collect();
        names.sort();
        let mut purged = names.iter().filter(|name| self.force_unload(name)).count();

        let (doomed, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.transients)
            .into_iter()
            .partition(|asset| selected(asset.origin()));
        self.transients = kept;
        for asset in &doomed {
            self.destroy(asset);
        }
        purged += doomed.len();

        if purged > 0 {
            tracing::info!(
                "Purged {} assets ({})",
                purged,
                if purge_engine { "engine and project" } else { "project" }
            );
        }
        purged
    }

    /// Forcibly unload and forget a single entry.
    pub fn remove(&mut self, name: &str) -> bool {
        self.force_unload(name);
        let Some(entry) = self.entries.remove(name) else {
            return false;
        };
        if let Some(dir) = entry.directory() {
            self.tree.remove_entry(dir, name);
        }
        true
    }

    /// Forcibly unload and forget every entry under `dir`, then remove the
    /// directory nodes. Returns how many entries were removed.
    pub fn unregister_directory(&mut self, dir: DirId) -> usize {
        profile_function!();
        let Some(names) = self.tree.remove_subtree(dir) else {
            tracing::warn!("Cannot unregister the root or an unknown directory");
            return 0;
        };
        for name in &names {
            self.force_unload(name);
            self.entries.remove(name);
        }
        let tree = &self.tree;
        self.roots.retain(|_, root| tree.contains(*root));
        tracing::info!("Unregistered directory with {} assets", names.len());
        names.len()
    }
}
