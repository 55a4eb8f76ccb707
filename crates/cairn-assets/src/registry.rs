//! The asset registry: what exists, what is loaded, and the async load protocol.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use cairn_core::alloc::{HashMap, HashSet};
use cairn_core::profiling::profile_function;
use futures_lite::future::block_on;

use crate::Asset;
use crate::config::RegistryConfig;
use crate::directory::{DirId, DirectoryTree};
use crate::entry::AssetEntry;
use crate::error::{AssetError, AssetResult};
use crate::event::{AssetEvent, AssetEventBuffer};
use crate::handle::{AssetRef, JobId, LoadedAsset, resolve_waiter};
use crate::header::{self, AssetType};
use crate::io::{BytesReader, FileReader};
use crate::job::{JobState, JobStatus, LoadJob, LoadOutcome, LoadRequest, Staged, stage};
use crate::loader::{AssetLoader, ErasedAssetLoader, FinalizeContext, LoaderRegistry};
use crate::pipeline::LoaderPipeline;
use crate::source::{AssetLocator, Origin};

enum Finish {
    Finalized,
    Deferred(LoadOutcome),
    Dropped,
}

/// Owns every asset entry, the directory tree and the loader thread.
///
/// All payload creation and destruction happens on the thread that calls into
/// the registry; the loader thread only reads and deserializes. Call
/// [`update`](Self::update) once per tick to finalize finished async loads.
///
/// # Example
///
/// ```ignore
/// let mut registry = Registry::new(RegistryConfig::default())?;
/// registry.register_loader(TextLoader);
/// registry.discover("Engine", "engine/assets", Origin::Engine)?;
///
/// let readme = registry.load_typed::<String>("Readme");
///
/// let handle = AssetRef::new();
/// registry.async_load("Credits", &handle);
/// loop {
///     registry.update(dt);
///     if let Some(text) = handle.get::<String>() { /* ... */ }
/// }
/// ```
pub struct Registry {
    pub(crate) config: RegistryConfig,
    pub(crate) entries: HashMap<String, AssetEntry>,
    pub(crate) tree: DirectoryTree,
    pub(crate) roots: HashMap<PathBuf, DirId>,
    pub(crate) loaders: LoaderRegistry,
    pub(crate) reader: Arc<dyn BytesReader>,
    pub(crate) transients: Vec<LoadedAsset>,
    pub(crate) events: AssetEventBuffer,
    pipeline: LoaderPipeline,
    jobs: HashMap<String, LoadJob>,
    completed: VecDeque<LoadOutcome>,
    deferred: HashMap<String, LoadOutcome>,
    loading: HashSet<String>,
    next_job: JobId,
}

impl Registry {
    /// Create a registry reading files relative to `config.base_path`.
    pub fn new(config: RegistryConfig) -> AssetResult<Self> {
        let reader = Arc::new(FileReader::new(&config.base_path));
        Self::with_reader(config, reader)
    }

    /// Create a registry that resolves path locators through `reader`.
    pub fn with_reader(config: RegistryConfig, reader: Arc<dyn BytesReader>) -> AssetResult<Self> {
        let pipeline = LoaderPipeline::spawn(&config.worker_name, reader.clone())?;
        Ok(Self {
            config,
            entries: HashMap::new(),
            tree: DirectoryTree::new(),
            roots: HashMap::new(),
            loaders: LoaderRegistry::new(),
            reader,
            transients: Vec::new(),
            events: AssetEventBuffer::new(),
            pipeline,
            jobs: HashMap::new(),
            completed: VecDeque::new(),
            deferred: HashMap::new(),
            loading: HashSet::new(),
            next_job: 1,
        })
    }

    /// Register the loader for `L::Asset`, replacing any earlier one for that type.
    pub fn register_loader<L: AssetLoader>(&mut self, loader: L) {
        self.loaders.register(loader);
    }

    /// Loaders registered so far, keyed by asset type.
    pub fn loaders(&self) -> &LoaderRegistry {
        &self.loaders
    }

    /// The configuration this registry was created with.
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// The directory tree built by discovery and [`create_directory`](Self::create_directory).
    pub fn directories(&self) -> &DirectoryTree {
        &self.tree
    }

    /// Look up a directory by its `/`-separated path, e.g. `"Project/textures"`.
    pub fn find_directory(&self, path: &str) -> Option<DirId> {
        self.tree.find(path)
    }

    /// Create `name` under `parent`, or return the existing child of that name.
    pub fn create_directory(&mut self, parent: DirId, name: &str, origin: Origin) -> Option<DirId> {
        self.tree.create_subdirectory(parent, name, origin)
    }

    /// The registered entry for `name`, loaded or not.
    pub fn entry(&self, name: &str) -> Option<&AssetEntry> {
        self.entries.get(name)
    }

    /// Whether `name` is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Every registered entry, in no particular order.
    pub fn entries(&self) -> impl Iterator<Item = &AssetEntry> {
        self.entries.values()
    }

    /// Number of registered entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of registered entries with a loaded payload.
    pub fn loaded_count(&self) -> usize {
        self.entries.values().filter(|entry| entry.is_loaded()).count()
    }

    pub(crate) fn type_label(&self, asset_type: AssetType) -> String {
        self.loaders
            .type_name(asset_type)
            .map(str::to_string)
            .unwrap_or_else(|| asset_type.to_string())
    }

    /// Add an entry. Returns `Ok(false)` if the same name is already registered
    /// from the same source.
    ///
    /// Names are case-sensitive. A second registration under an existing name
    /// with a different source is rejected and the first one is kept.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        asset_type: AssetType,
        locator: AssetLocator,
        directory: Option<DirId>,
        origin: Origin,
    ) -> AssetResult<bool> {
        let name = name.into();
        if let Some(existing) = self.entries.get(&name) {
            if existing.locator() == &locator {
                tracing::trace!("Asset {} rediscovered", name);
                return Ok(false);
            }
            let err = AssetError::DuplicateName {
                existing: existing.locator().display_path(),
                name,
            };
            tracing::warn!("{} (ignoring {})", err, locator.display_path());
            return Err(err);
        }

        if let Some(dir) = directory
            && !self.tree.add_entry(dir, &name)
        {
            return Err(AssetError::invariant(format!(
                "asset {} registered into a directory that no longer exists",
                name
            )));
        }

        tracing::trace!("Registered asset {} ({})", name, locator.display_path());
        self.entries
            .insert(name.clone(), AssetEntry::new(name, locator, asset_type, origin, directory));
        Ok(true)
    }

    /// Register a new named entry that starts out loaded with `asset`.
    ///
    /// The entry's locator is `<dir>/<name>.<extension>`, so it can be written
    /// out later with [`save`](Self::save).
    pub fn insert<T: Asset>(
        &mut self,
        directory: DirId,
        name: &str,
        asset: T,
        origin: Origin,
    ) -> AssetResult<LoadedAsset> {
        if let Some(existing) = self.entries.get(name) {
            return Err(AssetError::DuplicateName {
                name: name.to_string(),
                existing: existing.locator().display_path(),
            });
        }
        let dir = self.tree.get(directory).ok_or_else(|| {
            AssetError::invariant(format!("cannot insert {} into a removed directory", name))
        })?;
        let file_name = format!("{}.{}", name, self.config.extension);
        let path = match dir.source_path() {
            Some(source) => source.join(file_name),
            None => PathBuf::from(dir.path()).join(file_name),
        };

        let asset_type = AssetType::of::<T>();
        self.register(name, asset_type, AssetLocator::Path(path), Some(directory), origin)?;

        let loaded = LoadedAsset::new(Arc::new(asset), asset_type, T::type_name(), Some(name.to_string()), origin);
        if let Some(entry) = self.entries.get_mut(name) {
            entry.set_instance(loaded.clone());
        }
        self.events.push(AssetEvent::Loaded {
            name: name.to_string(),
            asset_type,
        });
        Ok(loaded)
    }

    /// Track a programmatically created payload so it is destroyed on purge.
    ///
    /// Transient payloads have no name and are never returned by
    /// [`fetch`](Self::fetch). The returned handle holds the creator's reference.
    pub fn register_transient<T: Asset>(&mut self, asset: T, origin: Origin) -> AssetRef {
        let loaded = LoadedAsset::new(Arc::new(asset), AssetType::of::<T>(), T::type_name(), None, origin);
        self.transients.push(loaded.clone());
        AssetRef::from_asset(&loaded)
    }

    /// Number of live transient payloads.
    pub fn transient_count(&self) -> usize {
        self.transients.len()
    }

    /// The loaded instance of `name`, if any. Never loads.
    pub fn fetch(&self, name: &str) -> Option<LoadedAsset> {
        self.entries.get(name)?.instance().cloned()
    }

    /// As [`fetch`](Self::fetch), checking the entry's declared type against `T`.
    pub fn fetch_typed<T: Asset>(&self, name: &str) -> Option<Arc<T>> {
        let entry = self.entries.get(name)?;
        if !self.check_type::<T>(entry) {
            return None;
        }
        entry.instance()?.downcast::<T>()
    }

    fn check_type<T: Asset>(&self, entry: &AssetEntry) -> bool {
        if entry.asset_type() == AssetType::of::<T>() {
            return true;
        }
        let err = AssetError::TypeMismatch {
            name: entry.name().to_string(),
            expected: T::type_name(),
            found: entry.asset_type(),
        };
        tracing::error!("{} ({})", err, self.type_label(entry.asset_type()));
        false
    }

    /// Load `name` on the calling thread if it is not loaded already.
    ///
    /// Finalization runs here too, so only call this from the owning thread
    /// when the payload kind touches thread-bound resources.
    pub fn load(&mut self, name: &str) -> Option<LoadedAsset> {
        profile_function!();
        let entry = self.entries.get(name)?;
        if let Some(instance) = entry.instance() {
            return Some(instance.clone());
        }

        match self.load_entry(name) {
            Ok(asset) => Some(asset),
            Err(err) => {
                tracing::error!("Failed to load asset {}: {}", name, err);
                self.events.push(AssetEvent::LoadFailed {
                    name: name.to_string(),
                    error: err.to_string(),
                });
                None
            }
        }
    }

    /// As [`load`](Self::load), checking the entry's declared type against `T` first.
    pub fn load_typed<T: Asset>(&mut self, name: &str) -> Option<Arc<T>> {
        let entry = self.entries.get(name)?;
        if !self.check_type::<T>(entry) {
            return None;
        }
        self.load(name)?.downcast::<T>()
    }

    /// Synchronously bind a handle created with [`AssetRef::named`].
    pub fn resolve(&mut self, handle: &AssetRef) -> bool {
        let Some(name) = handle.requested_name() else {
            return false;
        };
        match self.load(&name) {
            Some(asset) => {
                handle.set(Some(&asset));
                true
            }
            None => false,
        }
    }

    /// Synchronously load every registered entry. Returns how many are loaded afterwards.
    pub fn load_all(&mut self) -> usize {
        let mut names: Vec<String> = self.entries.keys().cloned().collect();
        names.sort();
        names.into_iter().filter(|name| self.load(name).is_some()).count()
    }

    fn load_entry(&mut self, name: &str) -> AssetResult<LoadedAsset> {
        if !self.loading.insert(name.to_string()) {
            return Err(AssetError::loader(name, "dependency cycle during synchronous load"));
        }
        let result = self.load_entry_inner(name);
        self.loading.remove(name);
        result
    }

    fn load_entry_inner(&mut self, name: &str) -> AssetResult<LoadedAsset> {
        let entry = self.entries.get(name).ok_or_else(|| AssetError::NotFound {
            name: name.to_string(),
        })?;
        let locator = entry.locator().clone();
        let asset_type = entry.asset_type();
        let loader = self.loaders.get_or_err(asset_type)?;

        let staged = stage(self.reader.as_ref(), loader.as_ref(), name, &locator, asset_type)?;
        for dependency in &staged.dependencies {
            if dependency == name || self.fetch(dependency).is_some() {
                continue;
            }
            if !self.entries.contains_key(dependency) {
                tracing::warn!("Asset {} depends on unregistered asset {}", name, dependency);
                continue;
            }
            if let Err(err) = self.load_entry(dependency) {
                tracing::error!("Failed to load dependency {} of {}: {}", dependency, name, err);
                return Err(AssetError::DependencyFailed {
                    name: name.to_string(),
                    dependency: dependency.clone(),
                });
            }
        }

        self.install(name, loader.as_ref(), staged)
    }

    /// Finalize staged data and make it the entry's instance.
    fn install(&mut self, name: &str, loader: &dyn ErasedAssetLoader, staged: Staged) -> AssetResult<LoadedAsset> {
        profile_function!();
        let payload = loader.finalize_erased(staged.data, &FinalizeContext::new(self, name))?;

        let Some(entry) = self.entries.get_mut(name) else {
            loader.destroy_erased(&payload);
            return Err(AssetError::NotFound {
                name: name.to_string(),
            });
        };
        if entry.is_loaded() || entry.asset_type() != loader.asset_type() {
            debug_assert!(false, "asset {} finalized twice or with the wrong loader", name);
            loader.destroy_erased(&payload);
            return Err(AssetError::invariant(format!(
                "refusing to finalize {} twice or with the wrong loader",
                name
            )));
        }

        let asset = LoadedAsset::new(payload, entry.asset_type(), loader.type_name(), Some(name.to_string()), entry.origin());
        entry.set_instance(asset.clone());
        tracing::debug!("Loaded asset {}", name);
        self.events.push(AssetEvent::Loaded {
            name: name.to_string(),
            asset_type: asset.asset_type(),
        });
        Ok(asset)
    }

    /// Load `name` in the background and bind `target` once it is finalized.
    ///
    /// If the asset is already loaded `target` is bound immediately. Requests
    /// for a name that is already in flight join the existing job. Any earlier
    /// pending request of `target` is abandoned. Returns false if the name is
    /// unknown or the request could not be queued.
    pub fn async_load(&mut self, name: &str, target: &AssetRef) -> bool {
        profile_function!();
        let Some(entry) = self.entries.get(name) else {
            tracing::trace!("Async load of unknown asset {}", name);
            return false;
        };
        if let Some(instance) = entry.instance() {
            let instance = instance.clone();
            target.set(Some(&instance));
            return true;
        }

        let id = match self.request(name) {
            Ok(id) => id,
            Err(err) => {
                tracing::error!("Failed to queue asset {}: {}", name, err);
                return false;
            }
        };
        if target.pending_job() == Some(id) {
            return true;
        }
        let waiter = target.attach(id, name);
        if let Some(job) = self.jobs.get_mut(name) {
            job.waiters.push(waiter);
        }
        true
    }

    /// [`async_load`](Self::async_load) for a handle created with [`AssetRef::named`].
    pub fn async_resolve(&mut self, handle: &AssetRef) -> bool {
        match handle.requested_name() {
            Some(name) => self.async_load(&name, handle),
            None => false,
        }
    }

    /// Start loading `name` in the background without a handle to patch.
    pub fn prefetch(&mut self, name: &str) -> bool {
        match self.entries.get(name) {
            Some(entry) if entry.is_loaded() => true,
            Some(_) => self.request(name).is_ok(),
            None => false,
        }
    }

    /// Find or create the in-flight job for `name`.
    fn request(&mut self, name: &str) -> AssetResult<JobId> {
        if let Some(job) = self.jobs.get(name) {
            return Ok(job.id);
        }

        let entry = self.entries.get(name).ok_or_else(|| AssetError::NotFound {
            name: name.to_string(),
        })?;
        let loader = self.loaders.get(entry.asset_type()).cloned().ok_or_else(|| AssetError::NoLoader {
            asset_type: entry.asset_type(),
            type_name: None,
        })?;

        let id = self.next_job;
        self.next_job += 1;
        let status = JobStatus::new();
        self.pipeline.submit(LoadRequest {
            id,
            name: name.to_string(),
            locator: entry.locator().clone(),
            asset_type: entry.asset_type(),
            loader: loader.clone(),
            status: status.clone(),
        })?;

        tracing::debug!("Queued async load of {} (job {})", name, id);
        self.jobs.insert(name.to_string(), LoadJob::new(id, name, loader, status));
        Ok(id)
    }

    /// Number of async loads not yet finalized or failed.
    pub fn in_flight(&self) -> usize {
        self.jobs.len()
    }

    /// State of the in-flight async load of `name`, if there is one.
    pub fn job_state(&self, name: &str) -> Option<JobState> {
        self.jobs.get(name).map(|job| job.status.get())
    }

    /// Block until the loader thread has finished every submitted request.
    ///
    /// Nothing is finalized; results are held for the next [`update`](Self::update).
    /// Returns false on timeout.
    pub fn wait_for_worker(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while self.pipeline.outstanding() > 0 {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return false;
            }
            match self.pipeline.recv_timeout(remaining) {
                Some(outcome) => self.completed.push_back(outcome),
                None => return self.pipeline.outstanding() == 0,
            }
        }
        true
    }

    /// Alternate [`wait_for_worker`](Self::wait_for_worker) and [`update`](Self::update)
    /// until no job is left in flight. Returns false on timeout.
    pub fn flush(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while !self.jobs.is_empty() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() || !self.wait_for_worker(remaining) {
                return false;
            }
            self.update(0.0);
        }
        true
    }

    /// Finalize every async load the loader thread has finished.
    ///
    /// Must be called from the owning thread, typically once per frame. Jobs
    /// are finalized in completion order. A job deferred on dependencies is
    /// retried as soon as one of them finalizes or fails, within the same
    /// call. Deferred jobs with nothing left on the loader thread are retried
    /// once per call so cycles run into the requeue limit. Returns how many
    /// jobs were finalized.
    pub fn update(&mut self, _delta_time: f32) -> usize {
        profile_function!();
        while let Some(outcome) = self.pipeline.try_recv() {
            self.completed.push_back(outcome);
        }
        if self.completed.is_empty() && self.deferred.is_empty() {
            return 0;
        }

        // Jobs first deferred during this call wait for the next one.
        let waiting: HashSet<String> = self.deferred.keys().cloned().collect();
        let mut finalized = self.drain_completed();

        let stalled: Vec<String> = self
            .deferred
            .keys()
            .filter(|name| waiting.contains(name.as_str()) && !self.is_progressing(name, &mut HashSet::new()))
            .cloned()
            .collect();
        for name in stalled {
            if let Some(outcome) = self.deferred.remove(&name) {
                self.completed.push_back(outcome);
            }
        }
        finalized += self.drain_completed();
        finalized
    }

    /// Finish everything queued in `completed`, including dependents woken along the way.
    fn drain_completed(&mut self) -> usize {
        let mut finalized = 0;
        while let Some(outcome) = self.completed.pop_front() {
            match self.finish(outcome) {
                Finish::Finalized => finalized += 1,
                Finish::Deferred(outcome) => {
                    self.deferred.insert(outcome.name.clone(), outcome);
                }
                Finish::Dropped => {}
            }
        }
        finalized
    }

    /// Queue the deferred jobs waiting on `job` for another attempt.
    fn wake_dependents(&mut self, job: &LoadJob) {
        for dependent in &job.dependents {
            if let Some(outcome) = self.deferred.remove(dependent) {
                tracing::trace!("{} settled, retrying {}", job.name, dependent);
                self.completed.push_back(outcome);
            }
        }
    }

    fn finish(&mut self, outcome: LoadOutcome) -> Finish {
        let LoadOutcome { id, name, result } = outcome;
        let Some(mut job) = self.jobs.remove(&name) else {
            tracing::warn!("Discarding load result for {} with no job", name);
            return Finish::Dropped;
        };
        if job.id != id {
            tracing::warn!("Discarding stale load result for {} (job {})", name, id);
            self.jobs.insert(name, job);
            return Finish::Dropped;
        }

        let staged = match result {
            Ok(staged) => staged,
            Err(err) => {
                self.fail(job, err);
                return Finish::Dropped;
            }
        };

        let Some(entry) = self.entries.get(&name) else {
            tracing::debug!("Asset {} was removed while loading", name);
            self.release_waiters(&job, None);
            self.wake_dependents(&job);
            return Finish::Dropped;
        };
        if let Some(existing) = entry.instance().cloned() {
            // Loaded synchronously while the job was in flight.
            job.status.set(JobState::Finalized);
            self.release_waiters(&job, Some(&existing));
            self.wake_dependents(&job);
            return Finish::Finalized;
        }

        let mut blockers = Vec::new();
        for dependency in &staged.dependencies {
            if *dependency == name || self.fetch(dependency).is_some() {
                continue;
            }
            if !self.entries.contains_key(dependency) {
                tracing::warn!("Asset {} depends on unregistered asset {}", name, dependency);
                continue;
            }
            let known = !job.requested.insert(dependency.clone());
            if self.jobs.contains_key(dependency) {
                blockers.push(dependency.clone());
            } else if known {
                let err = AssetError::DependencyFailed {
                    name: name.clone(),
                    dependency: dependency.clone(),
                };
                self.fail(job, err);
                return Finish::Dropped;
            } else if let Err(err) = self.request(dependency) {
                tracing::error!("Failed to queue dependency {} of {}: {}", dependency, name, err);
                let err = AssetError::DependencyFailed {
                    name: name.clone(),
                    dependency: dependency.clone(),
                };
                self.fail(job, err);
                return Finish::Dropped;
            } else {
                blockers.push(dependency.clone());
            }
        }

        if !blockers.is_empty() {
            for blocker in &blockers {
                if let Some(dependency_job) = self.jobs.get_mut(blocker)
                    && !dependency_job.dependents.contains(&name)
                {
                    dependency_job.dependents.push(name.clone());
                }
            }
            // Waiting on the loader thread is progress; only spinning counts.
            let mut visited = HashSet::new();
            visited.insert(name.clone());
            if !blockers.iter().any(|b| self.is_progressing(b, &mut visited)) {
                job.requeue_count += 1;
            }
            if job.requeue_count > self.config.requeue_limit {
                let err = AssetError::RequeueLimit {
                    name: name.clone(),
                    attempts: job.requeue_count,
                };
                self.fail(job, err);
                return Finish::Dropped;
            }
            tracing::trace!("Deferring {} on {:?}", name, blockers);
            self.jobs.insert(name.clone(), job);
            return Finish::Deferred(LoadOutcome {
                id,
                name,
                result: Ok(staged),
            });
        }

        let loader = job.loader.clone();
        match self.install(&name, loader.as_ref(), staged) {
            Ok(asset) => {
                job.status.set(JobState::Finalized);
                self.release_waiters(&job, Some(&asset));
                self.wake_dependents(&job);
                Finish::Finalized
            }
            Err(err) => {
                self.fail(job, err);
                Finish::Dropped
            }
        }
    }

    /// Whether `name`'s job, or anything it waits on, is still on the loader thread.
    fn is_progressing(&self, name: &str, visited: &mut HashSet<String>) -> bool {
        if !visited.insert(name.to_string()) {
            return false;
        }
        let Some(job) = self.jobs.get(name) else {
            return false;
        };
        job.status.get().is_on_worker() || job.requested.iter().any(|dependency| self.is_progressing(dependency, visited))
    }

    fn fail(&mut self, job: LoadJob, err: AssetError) {
        tracing::error!("Failed to load asset {}: {}", job.name, err);
        job.status.set(JobState::Failed);
        self.release_waiters(&job, None);
        self.wake_dependents(&job);
        self.events.push(AssetEvent::LoadFailed {
            name: job.name,
            error: err.to_string(),
        });
    }

    /// Patch (or, with `None`, detach) every handle still waiting on `job`.
    fn release_waiters(&self, job: &LoadJob, asset: Option<&LoadedAsset>) {
        let patched = job
            .waiters
            .iter()
            .filter(|waiter| resolve_waiter(waiter, job.id, asset))
            .count();
        if patched > 0 {
            tracing::trace!("Patched {} handles waiting on {}", patched, job.name);
        }
    }

    fn abandon_jobs(&mut self) {
        for (_, job) in self.jobs.drain() {
            job.status.set(JobState::Failed);
            for waiter in &job.waiters {
                resolve_waiter(waiter, job.id, None);
            }
        }
        self.completed.clear();
        self.deferred.clear();
    }

    /// Encode a loaded asset as a complete container (header and body).
    pub fn serialize(&self, name: &str) -> AssetResult<Vec<u8>> {
        let entry = self.entries.get(name).ok_or_else(|| AssetError::NotFound {
            name: name.to_string(),
        })?;
        let payload = entry
            .instance()
            .and_then(LoadedAsset::value)
            .ok_or_else(|| AssetError::loader(name, "asset is not loaded"))?;
        let loader = self.loaders.get_or_err(entry.asset_type())?;
        let body = loader.serialize_erased(&payload)?;
        Ok(header::encode(entry.asset_type(), entry.locator().is_embedded(), &body))
    }

    /// Write a loaded asset back to its path locator.
    pub fn save(&self, name: &str) -> AssetResult<()> {
        let bytes = self.serialize(name)?;
        let path = self
            .entries
            .get(name)
            .and_then(|entry| entry.locator().as_path())
            .ok_or_else(|| AssetError::loader(name, "embedded assets cannot be saved"))?;
        block_on(self.reader.write_bytes(path, bytes))?;
        tracing::debug!("Saved asset {} to {}", name, path.display());
        Ok(())
    }

    /// Events buffered since the last [`drain_events`](Self::drain_events).
    pub fn events(&self) -> &AssetEventBuffer {
        &self.events
    }

    /// Take every buffered event, oldest first.
    pub fn drain_events(&mut self) -> Vec<AssetEvent> {
        self.events.drain().collect()
    }
}

impl Drop for Registry {
    fn drop(&mut self) {
        self.abandon_jobs();
        let destroyed = self.purge(true);
        tracing::debug!("Registry shut down, {} payloads destroyed", destroyed);
    }
}
