//! Mock rendering device.
//!
//! Stands in for a backend that must only be driven from one thread. It never
//! rejects calls itself; tests inspect [`MockDevice::calls`] afterwards.

use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::{self, ThreadId};

use cairn_core::alloc::HashSet;
use parking_lot::Mutex;

/// Identifier of a resource created on the device.
pub type ResourceId = u64;

/// Records a device operation for verification in tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceCall {
    Upload {
        label: String,
        id: ResourceId,
        bytes: usize,
        thread: ThreadId,
    },
    Release {
        label: String,
        id: ResourceId,
        thread: ThreadId,
    },
}

impl DeviceCall {
    pub fn thread(&self) -> ThreadId {
        match self {
            DeviceCall::Upload { thread, .. } | DeviceCall::Release { thread, .. } => *thread,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            DeviceCall::Upload { label, .. } | DeviceCall::Release { label, .. } => label,
        }
    }
}

#[derive(Default)]
pub struct MockDevice {
    calls: Mutex<Vec<DeviceCall>>,
    live: Mutex<HashSet<ResourceId>>,
    next_id: AtomicU64,
}

impl MockDevice {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upload(&self, label: &str, data: &[u8]) -> ResourceId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        self.live.lock().insert(id);
        self.calls.lock().push(DeviceCall::Upload {
            label: label.to_string(),
            id,
            bytes: data.len(),
            thread: thread::current().id(),
        });
        id
    }

    pub fn release(&self, label: &str, id: ResourceId) {
        if !self.live.lock().remove(&id) {
            tracing::error!("Mock device: double release of {} ({})", label, id);
        }
        self.calls.lock().push(DeviceCall::Release {
            label: label.to_string(),
            id,
            thread: thread::current().id(),
        });
    }

    /// Get all recorded calls.
    pub fn calls(&self) -> Vec<DeviceCall> {
        self.calls.lock().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    pub fn count_uploads(&self) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|call| matches!(call, DeviceCall::Upload { .. }))
            .count()
    }

    pub fn count_releases(&self) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|call| matches!(call, DeviceCall::Release { .. }))
            .count()
    }

    /// Resources uploaded and not yet released.
    pub fn live_resources(&self) -> usize {
        self.live.lock().len()
    }

    /// Whether every recorded call was made from `thread`.
    pub fn all_calls_on(&self, thread: ThreadId) -> bool {
        self.calls.lock().iter().all(|call| call.thread() == thread)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_and_release_are_tracked() {
        let device = MockDevice::new();
        let a = device.upload("Wood", &[0; 16]);
        let b = device.upload("Stone", &[0; 4]);
        assert_ne!(a, b);
        assert_eq!(device.live_resources(), 2);

        device.release("Wood", a);
        assert_eq!(device.count_uploads(), 2);
        assert_eq!(device.count_releases(), 1);
        assert_eq!(device.live_resources(), 1);
        assert_eq!(device.calls()[0].label(), "Wood");
    }

    #[test]
    fn test_calls_record_thread() {
        let device = std::sync::Arc::new(MockDevice::new());
        device.upload("Main", &[]);
        assert!(device.all_calls_on(thread::current().id()));

        let remote = device.clone();
        std::thread::spawn(move || {
            remote.upload("Other", &[]);
        })
        .join()
        .unwrap();
        assert!(!device.all_calls_on(thread::current().id()));

        device.clear_calls();
        assert!(device.calls().is_empty());
    }
}
