//! Loaded payloads and the counted handles that reference them.
//!
//! A [`LoadedAsset`] is the registry's view of a payload: a shared cell holding
//! the value, its type tag and a reference count. An [`AssetRef`] is what
//! callers hold; binding one to a payload bumps that count and dropping or
//! rebinding it releases the count again. The registry only ever empties a cell
//! on the owning thread, after which every handle still pointing at it
//! resolves to `None`.

use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};

use crate::Asset;
use crate::header::AssetType;
use crate::source::Origin;

/// Identifier of an in-flight load job.
pub(crate) type JobId = u64;

pub(crate) type ErasedPayload = Arc<dyn Any + Send + Sync>;

struct PayloadCell {
    value: RwLock<Option<ErasedPayload>>,
    refs: AtomicU32,
    asset_type: AssetType,
    type_name: &'static str,
    name: Option<String>,
    origin: Origin,
}

/// A payload owned by the registry.
///
/// Cloning a `LoadedAsset` does not count as a reference; hold an [`AssetRef`]
/// to keep the payload alive through [`Registry::ref_sweep`](crate::Registry::ref_sweep).
#[derive(Clone)]
pub struct LoadedAsset {
    cell: Arc<PayloadCell>,
}

impl LoadedAsset {
    pub(crate) fn new(
        value: ErasedPayload,
        asset_type: AssetType,
        type_name: &'static str,
        name: Option<String>,
        origin: Origin,
    ) -> Self {
        Self {
            cell: Arc::new(PayloadCell {
                value: RwLock::new(Some(value)),
                refs: AtomicU32::new(0),
                asset_type,
                type_name,
                name,
                origin,
            }),
        }
    }

    /// Registry name, `None` for transient payloads.
    pub fn name(&self) -> Option<&str> {
        self.cell.name.as_deref()
    }

    pub fn is_transient(&self) -> bool {
        self.cell.name.is_none()
    }

    pub fn asset_type(&self) -> AssetType {
        self.cell.asset_type
    }

    pub fn type_name(&self) -> &'static str {
        self.cell.type_name
    }

    pub fn origin(&self) -> Origin {
        self.cell.origin
    }

    /// Number of [`AssetRef`]s currently bound to this payload.
    pub fn ref_count(&self) -> u32 {
        self.cell.refs.load(Ordering::Acquire)
    }

    /// False once the registry has destroyed the payload.
    pub fn is_alive(&self) -> bool {
        self.cell.value.read().is_some()
    }

    pub fn is<T: Asset>(&self) -> bool {
        self.cell.asset_type == AssetType::of::<T>()
    }

    /// The payload as `T`, or `None` if destroyed or of another type.
    pub fn downcast<T: Asset>(&self) -> Option<Arc<T>> {
        let value = self.cell.value.read().clone()?;
        value.downcast::<T>().ok()
    }

    pub fn ptr_eq(&self, other: &LoadedAsset) -> bool {
        Arc::ptr_eq(&self.cell, &other.cell)
    }

    pub(crate) fn value(&self) -> Option<ErasedPayload> {
        self.cell.value.read().clone()
    }

    pub(crate) fn take_value(&self) -> Option<ErasedPayload> {
        self.cell.value.write().take()
    }

    fn acquire(&self) {
        self.cell.refs.fetch_add(1, Ordering::AcqRel);
    }

    fn release(&self) {
        let previous = self.cell.refs.fetch_sub(1, Ordering::AcqRel);
        debug_assert!(previous > 0, "asset reference count underflow");
    }
}

impl PartialEq for LoadedAsset {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for LoadedAsset {}

impl fmt::Debug for LoadedAsset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadedAsset")
            .field("name", &self.cell.name)
            .field("type", &self.cell.type_name)
            .field("refs", &self.ref_count())
            .field("alive", &self.is_alive())
            .finish()
    }
}

#[derive(Default)]
pub(crate) struct RefState {
    target: Option<LoadedAsset>,
    requested: Option<String>,
    pending: Option<JobId>,
}

impl RefState {
    fn bind(&mut self, asset: Option<&LoadedAsset>) {
        if let Some(asset) = asset {
            asset.acquire();
        }
        if let Some(previous) = std::mem::replace(&mut self.target, asset.cloned()) {
            previous.release();
        }
    }
}

impl Drop for RefState {
    fn drop(&mut self) {
        if let Some(target) = self.target.take() {
            target.release();
        }
    }
}

/// Back-pointer a load job keeps to a waiting handle.
pub(crate) type Waiter = Weak<Mutex<RefState>>;

/// Patch a waiting handle with the result of `job`.
///
/// Does nothing if the handle was dropped or has since been retargeted.
pub(crate) fn resolve_waiter(waiter: &Waiter, job: JobId, asset: Option<&LoadedAsset>) -> bool {
    let Some(state) = waiter.upgrade() else {
        return false;
    };
    let mut state = state.lock();
    if state.pending != Some(job) {
        return false;
    }
    state.pending = None;
    if asset.is_some() {
        state.bind(asset);
    }
    true
}

/// A counted, rebindable reference to a payload that may not be loaded yet.
///
/// A handle is null, bound to a payload, or waiting on exactly one in-flight
/// load. Clones share the bound payload but never the pending load.
///
/// # Example
///
/// ```ignore
/// let handle = AssetRef::new();
/// registry.async_load("Crate", &handle);
/// registry.update(dt);
/// if let Some(mesh) = handle.get::<Mesh>() {
///     draw(&mesh);
/// }
/// ```
pub struct AssetRef {
    state: Arc<Mutex<RefState>>,
}

impl AssetRef {
    /// A null handle.
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(RefState::default())),
        }
    }

    /// An unresolved handle remembering the name it wants.
    ///
    /// Bind it with [`Registry::resolve`](crate::Registry::resolve) or
    /// [`Registry::async_resolve`](crate::Registry::async_resolve).
    pub fn named(name: impl Into<String>) -> Self {
        let handle = Self::new();
        handle.state.lock().requested = Some(name.into());
        handle
    }

    /// A handle bound to `asset`, taking a reference.
    pub fn from_asset(asset: &LoadedAsset) -> Self {
        let handle = Self::new();
        handle.state.lock().bind(Some(asset));
        handle
    }

    /// The payload as `T`, if bound, alive and of that type.
    pub fn get<T: Asset>(&self) -> Option<Arc<T>> {
        self.state.lock().target.as_ref()?.downcast::<T>()
    }

    /// The bound payload, if alive.
    pub fn asset(&self) -> Option<LoadedAsset> {
        self.state
            .lock()
            .target
            .as_ref()
            .filter(|asset| asset.is_alive())
            .cloned()
    }

    /// Name of the bound payload, or the name this handle was created with.
    pub fn name(&self) -> Option<String> {
        let state = self.state.lock();
        match &state.target {
            Some(target) if target.name().is_some() => target.name().map(str::to_string),
            _ => state.requested.clone(),
        }
    }

    pub fn is_null(&self) -> bool {
        self.asset().is_none()
    }

    /// Whether an in-flight load will patch this handle.
    pub fn is_pending(&self) -> bool {
        self.state.lock().pending.is_some()
    }

    /// Rebind to `asset` (or to nothing). Detaches from any pending load.
    pub fn set(&self, asset: Option<&LoadedAsset>) {
        let mut state = self.state.lock();
        state.pending = None;
        state.bind(asset);
    }

    pub fn clear(&self) {
        self.set(None);
    }

    pub(crate) fn requested_name(&self) -> Option<String> {
        self.state.lock().requested.clone()
    }

    pub(crate) fn pending_job(&self) -> Option<JobId> {
        self.state.lock().pending
    }

    /// Park this handle on `job`, dropping whatever it was bound to.
    pub(crate) fn attach(&self, job: JobId, name: &str) -> Waiter {
        let mut state = self.state.lock();
        state.bind(None);
        state.pending = Some(job);
        state.requested = Some(name.to_string());
        Arc::downgrade(&self.state)
    }
}

impl Default for AssetRef {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for AssetRef {
    fn clone(&self) -> Self {
        let state = self.state.lock();
        let copy = AssetRef::new();
        {
            let mut copy_state = copy.state.lock();
            copy_state.requested = state.requested.clone();
            copy_state.bind(state.target.as_ref());
        }
        copy
    }
}

impl From<&LoadedAsset> for AssetRef {
    fn from(asset: &LoadedAsset) -> Self {
        AssetRef::from_asset(asset)
    }
}

impl PartialEq for AssetRef {
    fn eq(&self, other: &Self) -> bool {
        match (self.asset(), other.asset()) {
            (Some(a), Some(b)) => a.ptr_eq(&b),
            (None, None) => true,
            _ => false,
        }
    }
}

impl fmt::Debug for AssetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("AssetRef")
            .field("target", &state.target)
            .field("requested", &state.requested)
            .field("pending", &state.pending)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Sound(u32);

    impl Asset for Sound {
        fn type_name() -> &'static str {
            "Sound"
        }
    }

    #[derive(Debug)]
    struct Font;

    impl Asset for Font {
        fn type_name() -> &'static str {
            "Font"
        }
    }

    fn sound(name: &str, value: u32) -> LoadedAsset {
        LoadedAsset::new(
            Arc::new(Sound(value)),
            AssetType::of::<Sound>(),
            Sound::type_name(),
            Some(name.to_string()),
            Origin::Project,
        )
    }

    #[test]
    fn test_binding_counts_references() {
        let asset = sound("Click", 1);
        assert_eq!(asset.ref_count(), 0);

        let a = AssetRef::from_asset(&asset);
        let b = a.clone();
        assert_eq!(asset.ref_count(), 2);
        assert_eq!(a, b);

        drop(a);
        assert_eq!(asset.ref_count(), 1);
        b.clear();
        assert_eq!(asset.ref_count(), 0);
        assert!(b.is_null());
    }

    #[test]
    fn test_rebind_moves_reference() {
        let first = sound("A", 1);
        let second = sound("B", 2);
        let handle = AssetRef::from_asset(&first);

        handle.set(Some(&second));
        assert_eq!(first.ref_count(), 0);
        assert_eq!(second.ref_count(), 1);
        assert_eq!(handle.get::<Sound>().as_deref(), Some(&Sound(2)));

        // Rebinding to the same payload keeps the count stable.
        handle.set(Some(&second));
        assert_eq!(second.ref_count(), 1);
    }

    #[test]
    fn test_get_checks_runtime_type() {
        let asset = sound("Beep", 3);
        let handle = AssetRef::from_asset(&asset);
        assert!(handle.get::<Font>().is_none());
        assert_eq!(handle.get::<Sound>().unwrap().0, 3);
        assert!(asset.is::<Sound>());
        assert!(!asset.is::<Font>());
    }

    #[test]
    fn test_destroyed_payload_reads_as_null() {
        let asset = sound("Gone", 4);
        let handle = AssetRef::from_asset(&asset);
        assert!(asset.take_value().is_some());
        assert!(handle.get::<Sound>().is_none());
        assert!(handle.is_null());
        assert!(!asset.is_alive());
    }

    #[test]
    fn test_waiter_patch_respects_ticket() {
        let asset = sound("Music", 5);
        let handle = AssetRef::new();
        let waiter = handle.attach(7, "Music");
        assert!(handle.is_pending());

        assert!(!resolve_waiter(&waiter, 8, Some(&asset)));
        assert!(handle.is_pending());

        assert!(resolve_waiter(&waiter, 7, Some(&asset)));
        assert!(!handle.is_pending());
        assert_eq!(handle.asset(), Some(asset.clone()));
        assert_eq!(asset.ref_count(), 1);
    }

    #[test]
    fn test_clone_does_not_inherit_pending() {
        let handle = AssetRef::new();
        let _waiter = handle.attach(1, "Music");
        let copy = handle.clone();
        assert!(!copy.is_pending());
        assert_eq!(copy.name().as_deref(), Some("Music"));
    }

    #[test]
    fn test_dropped_waiter_is_skipped() {
        let asset = sound("Ambience", 6);
        let handle = AssetRef::new();
        let waiter = handle.attach(2, "Ambience");
        drop(handle);
        assert!(!resolve_waiter(&waiter, 2, Some(&asset)));
        assert_eq!(asset.ref_count(), 0);
    }

    #[test]
    fn test_named_handle_is_null() {
        let handle = AssetRef::named("Theme");
        assert!(handle.is_null());
        assert!(!handle.is_pending());
        assert_eq!(handle.requested_name().as_deref(), Some("Theme"));
        assert_eq!(AssetRef::new(), AssetRef::default());
    }
}
