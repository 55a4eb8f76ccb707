//! Asset events for change detection.

use crate::header::AssetType;

/// Events emitted by the registry on the owning thread.
#[derive(Debug, Clone, PartialEq)]
pub enum AssetEvent {
    /// A named asset finished loading.
    Loaded {
        name: String,
        asset_type: AssetType,
    },

    /// A named asset's payload was destroyed.
    Unloaded {
        name: String,
        asset_type: AssetType,
    },

    /// A load failed; waiting handles stay unresolved.
    LoadFailed {
        name: String,
        error: String,
    },
}

impl AssetEvent {
    pub fn name(&self) -> &str {
        match self {
            AssetEvent::Loaded { name, .. }
            | AssetEvent::Unloaded { name, .. }
            | AssetEvent::LoadFailed { name, .. } => name,
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, AssetEvent::Loaded { .. })
    }

    pub fn is_unloaded(&self) -> bool {
        matches!(self, AssetEvent::Unloaded { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, AssetEvent::LoadFailed { .. })
    }
}

/// A buffer of asset events that can be drained each frame.
#[derive(Debug, Default)]
pub struct AssetEventBuffer {
    events: Vec<AssetEvent>,
}

impl AssetEventBuffer {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn push(&mut self, event: AssetEvent) {
        self.events.push(event);
    }

    pub fn drain(&mut self) -> impl Iterator<Item = AssetEvent> + '_ {
        self.events.drain(..)
    }

    pub fn iter(&self) -> impl Iterator<Item = &AssetEvent> {
        self.events.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_buffer_drain() {
        let mut buffer = AssetEventBuffer::new();
        buffer.push(AssetEvent::Loaded {
            name: "Rock".to_string(),
            asset_type: AssetType::from_name("Mesh"),
        });
        buffer.push(AssetEvent::LoadFailed {
            name: "Tree".to_string(),
            error: "bad header".to_string(),
        });
        assert_eq!(buffer.len(), 2);

        let drained: Vec<_> = buffer.drain().collect();
        assert!(drained[0].is_loaded());
        assert!(drained[1].is_failed());
        assert_eq!(drained[1].name(), "Tree");
        assert!(buffer.is_empty());
    }
}
