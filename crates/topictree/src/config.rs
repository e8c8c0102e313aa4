//! Walk configuration.

use crate::path;

/// Default root path: the whole namespace.
pub const DEFAULT_ROOT_PATH: &str = "";

/// Walk configuration.
#[derive(Debug, Clone)]
pub struct WalkConfig {
    /// Path below which topics are materialized (e.g. "sensors/floor1").
    pub root_path: String,

    /// Walk identifier used in log output.
    pub walk_id: String,
}

impl WalkConfig {
    /// Create a walk configuration rooted at the given path.
    pub fn new(root_path: impl AsRef<str>) -> Self {
        Self {
            root_path: path::normalize(root_path.as_ref()),
            walk_id: generate_walk_id(),
        }
    }

    /// Create a configuration walking the whole namespace.
    pub fn whole_namespace() -> Self {
        Self::new(DEFAULT_ROOT_PATH)
    }

    /// Set the root path.
    pub fn with_root_path(mut self, root_path: impl AsRef<str>) -> Self {
        self.root_path = path::normalize(root_path.as_ref());
        self
    }

    /// Set the walk identifier.
    pub fn with_walk_id(mut self, walk_id: impl Into<String>) -> Self {
        self.walk_id = walk_id.into();
        self
    }
}

impl Default for WalkConfig {
    fn default() -> Self {
        Self::whole_namespace()
    }
}

/// Generate a unique walk identifier.
fn generate_walk_id() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};

    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();

    format!("walk-{:x}", timestamp)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = WalkConfig::default();
        assert_eq!(config.root_path, DEFAULT_ROOT_PATH);
        assert!(config.walk_id.starts_with("walk-"));
    }

    #[test]
    fn test_config_builder() {
        let config = WalkConfig::new("/sensors/floor1/")
            .with_walk_id("ui-tree");

        assert_eq!(config.root_path, "sensors/floor1");
        assert_eq!(config.walk_id, "ui-tree");
    }

    #[test]
    fn test_with_root_path_normalizes() {
        let config = WalkConfig::whole_namespace().with_root_path("a/b/");
        assert_eq!(config.root_path, "a/b");
    }
}
