//! Load jobs and the messages that cross the loader thread boundary.
//!
//! Only [`LoadRequest`] and [`LoadOutcome`] travel between threads. The
//! [`LoadJob`] record, with its waiting handles, stays on the owning thread.

use std::any::Any;
use std::borrow::Cow;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use cairn_core::alloc::HashSet;
use futures_lite::future::block_on;

use crate::error::{AssetError, AssetResult};
use crate::handle::{JobId, Waiter};
use crate::header::{AssetHeader, AssetType};
use crate::io::BytesReader;
use crate::loader::{ErasedAssetLoader, LoadContext};
use crate::source::AssetLocator;

/// Where a load job is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobState {
    /// Queued for the loader thread.
    Submitted,
    /// Being read and deserialized on the loader thread.
    InProgress,
    /// Deserialized, waiting for the owning thread to finalize it.
    Completed,
    /// Finalized and handed to every waiting handle.
    Finalized,
    /// Gave up; waiting handles were left unresolved.
    Failed,
}

impl JobState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => JobState::Submitted,
            1 => JobState::InProgress,
            2 => JobState::Completed,
            3 => JobState::Finalized,
            _ => JobState::Failed,
        }
    }

    /// Still owned by the loader thread.
    pub fn is_on_worker(self) -> bool {
        matches!(self, JobState::Submitted | JobState::InProgress)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Finalized | JobState::Failed)
    }
}

/// Job state shared between the owning-thread record and the request.
#[derive(Debug, Clone)]
pub(crate) struct JobStatus(Arc<AtomicU8>);

impl JobStatus {
    pub fn new() -> Self {
        Self(Arc::new(AtomicU8::new(JobState::Submitted as u8)))
    }

    pub fn get(&self) -> JobState {
        JobState::from_u8(self.0.load(Ordering::Acquire))
    }

    pub fn set(&self, state: JobState) {
        self.0.store(state as u8, Ordering::Release);
    }
}

/// Work item sent to the loader thread.
pub(crate) struct LoadRequest {
    pub id: JobId,
    pub name: String,
    pub locator: AssetLocator,
    pub asset_type: AssetType,
    pub loader: Arc<dyn ErasedAssetLoader>,
    pub status: JobStatus,
}

/// Deserialized data plus the dependencies it declared.
pub(crate) struct Staged {
    pub data: Box<dyn Any + Send>,
    pub dependencies: Vec<String>,
}

/// Result sent back from the loader thread.
pub(crate) struct LoadOutcome {
    pub id: JobId,
    pub name: String,
    pub result: AssetResult<Staged>,
}

/// Owning-thread record of an in-flight load.
pub(crate) struct LoadJob {
    pub id: JobId,
    pub name: String,
    pub loader: Arc<dyn ErasedAssetLoader>,
    pub status: JobStatus,
    /// Handles to patch once the payload is finalized.
    pub waiters: Vec<Waiter>,
    /// Deferred jobs to retry once this one finalizes or fails.
    pub dependents: Vec<String>,
    /// Dependencies this job has asked for.
    pub requested: HashSet<String>,
    pub requeue_count: u32,
}

impl LoadJob {
    pub fn new(id: JobId, name: &str, loader: Arc<dyn ErasedAssetLoader>, status: JobStatus) -> Self {
        Self {
            id,
            name: name.to_string(),
            loader,
            status,
            waiters: Vec::new(),
            dependents: Vec::new(),
            requested: HashSet::new(),
            requeue_count: 0,
        }
    }
}

/// Read, validate and deserialize one asset. Safe to run on any thread.
pub(crate) fn stage(
    reader: &dyn BytesReader,
    loader: &dyn ErasedAssetLoader,
    name: &str,
    locator: &AssetLocator,
    asset_type: AssetType,
) -> AssetResult<Staged> {
    let bytes: Cow<'_, [u8]> = match locator {
        AssetLocator::Path(path) => Cow::Owned(block_on(reader.read_bytes(path))?),
        AssetLocator::Embedded(bytes) => Cow::Borrowed(&bytes[..]),
    };

    let (header, body) = AssetHeader::parse(name, &bytes)?;
    if header.asset_type != asset_type {
        return Err(AssetError::InvalidHeader {
            name: name.to_string(),
            message: format!("stored type {} does not match registered type {}", header.asset_type, asset_type),
        });
    }

    let mut ctx = LoadContext::new(name, locator, body);
    let data = loader.deserialize_erased(&mut ctx)?;
    Ok(Staged {
        data,
        dependencies: ctx.into_dependencies(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::encode;
    use crate::io::MemoryReader;
    use crate::loader::TextLoader;

    #[test]
    fn test_status_transitions() {
        let status = JobStatus::new();
        assert_eq!(status.get(), JobState::Submitted);
        assert!(status.get().is_on_worker());

        let shared = status.clone();
        shared.set(JobState::Completed);
        assert_eq!(status.get(), JobState::Completed);
        assert!(!status.get().is_on_worker());
        assert!(!status.get().is_terminal());

        status.set(JobState::Failed);
        assert!(shared.get().is_terminal());
    }

    #[test]
    fn test_stage_from_path_and_embedded() {
        let text = AssetType::of::<String>();
        let reader = MemoryReader::new();
        reader.insert("Greeting.asset", encode(text, false, b"hello"));

        let staged = stage(&reader, &TextLoader, "Greeting", &AssetLocator::path("Greeting.asset"), text).unwrap();
        assert_eq!(*staged.data.downcast::<String>().unwrap(), "hello");

        let embedded = AssetLocator::embedded(encode(text, true, b"inline"));
        let staged = stage(&reader, &TextLoader, "Inline", &embedded, text).unwrap();
        assert_eq!(*staged.data.downcast::<String>().unwrap(), "inline");
        assert!(staged.dependencies.is_empty());
    }

    #[test]
    fn test_stage_rejects_wrong_stored_type() {
        let reader = MemoryReader::new();
        reader.insert("Blob.asset", encode(AssetType::of::<Vec<u8>>(), false, b"\x00\x01"));

        let result = stage(
            &reader,
            &TextLoader,
            "Blob",
            &AssetLocator::path("Blob.asset"),
            AssetType::of::<String>(),
        );
        assert!(matches!(result, Err(AssetError::InvalidHeader { .. })));
    }

    #[test]
    fn test_stage_missing_file() {
        let reader = MemoryReader::new();
        let result = stage(
            &reader,
            &TextLoader,
            "Missing",
            &AssetLocator::path("Missing.asset"),
            AssetType::of::<String>(),
        );
        assert!(matches!(result, Err(AssetError::NotFound { .. })));
    }
}
