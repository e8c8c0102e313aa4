//! Namespace file loading.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use topictree::memory::MemoryNamespace;
use topictree::TopicSpecification;

use crate::error::{Error, Result};

/// Topics of a namespace as stored on disk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespaceFile {
    #[serde(default)]
    pub topics: BTreeMap<String, TopicSpecification>,
}

impl NamespaceFile {
    /// Read and parse a namespace file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Build an in-memory namespace holding these topics.
    pub fn into_namespace(self) -> MemoryNamespace {
        MemoryNamespace::with_topics(self.topics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use topictree::TopicType;

    #[test]
    fn test_load_namespace_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("namespace.json");
        std::fs::write(
            &path,
            r#"{
                "topics": {
                    "sensors": {},
                    "sensors/temp": {"type": "double", "properties": {"unit": "C"}},
                    "/alarms/": {"type": "string"}
                }
            }"#,
        )
        .unwrap();

        let file = NamespaceFile::load(&path).unwrap();
        assert_eq!(file.topics.len(), 3);
        assert_eq!(file.topics["sensors"].topic_type, TopicType::Json);
        assert_eq!(file.topics["sensors/temp"].properties["unit"], "C");

        let namespace = file.into_namespace();
        assert_eq!(
            namespace.topic_paths(),
            vec!["alarms".to_string(), "sensors".to_string(), "sensors/temp".to_string()]
        );
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = NamespaceFile::load(&dir.path().join("missing.json"));
        assert!(matches!(result, Err(Error::Io { .. })));
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(NamespaceFile::from_json("{not json"), Err(Error::Json(_))));
        assert!(matches!(
            NamespaceFile::from_json(r#"{"topics": {"a": {"type": "bogus"}}}"#),
            Err(Error::Json(_))
        ));
    }

    #[test]
    fn test_empty_document() {
        assert_eq!(NamespaceFile::from_json("{}").unwrap(), NamespaceFile::default());
    }
}
