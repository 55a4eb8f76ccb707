//! Registry configuration.

use std::path::PathBuf;

/// Tunables for a [`Registry`](crate::Registry).
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Root for relative locators and discovery roots.
    pub base_path: PathBuf,
    /// File extension recognised by directory discovery (without the dot).
    pub extension: String,
    /// How many times a job may be deferred on unready dependencies before it fails.
    pub requeue_limit: u32,
    /// Upper bound on passes made by a reference sweep.
    pub sweep_passes: u32,
    /// Name given to the loader thread.
    pub worker_name: String,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            base_path: PathBuf::from("."),
            extension: "asset".to_string(),
            requeue_limit: 30,
            sweep_passes: 10,
            worker_name: "asset-loader".to_string(),
        }
    }
}

impl RegistryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base_path(mut self, base_path: impl Into<PathBuf>) -> Self {
        self.base_path = base_path.into();
        self
    }

    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into().trim_start_matches('.').to_string();
        self
    }

    pub fn with_requeue_limit(mut self, limit: u32) -> Self {
        self.requeue_limit = limit;
        self
    }

    pub fn with_sweep_passes(mut self, passes: u32) -> Self {
        self.sweep_passes = passes.max(1);
        self
    }

    pub fn with_worker_name(mut self, name: impl Into<String>) -> Self {
        self.worker_name = name.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RegistryConfig::default();
        assert_eq!(config.requeue_limit, 30);
        assert_eq!(config.sweep_passes, 10);
        assert_eq!(config.extension, "asset");
        assert_eq!(config.worker_name, "asset-loader");
    }

    #[test]
    fn test_builder() {
        let config = RegistryConfig::new()
            .with_base_path("/data")
            .with_extension(".pak")
            .with_requeue_limit(3)
            .with_sweep_passes(0);
        assert_eq!(config.base_path, PathBuf::from("/data"));
        assert_eq!(config.extension, "pak");
        assert_eq!(config.requeue_limit, 3);
        assert_eq!(config.sweep_passes, 1);
    }
}
