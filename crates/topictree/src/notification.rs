//! Notification types delivered by a notification source.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// What happened to a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// A topic was created at the path.
    Added,
    /// The topic at the path was removed.
    Removed,
    /// The path became selected.
    Selected,
    /// The path is no longer selected.
    Deselected,
}

impl NotificationKind {
    /// Whether this kind brings a path into view (Added or Selected).
    pub fn is_materializing(self) -> bool {
        matches!(self, NotificationKind::Added | NotificationKind::Selected)
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotificationKind::Added => write!(f, "added"),
            NotificationKind::Removed => write!(f, "removed"),
            NotificationKind::Selected => write!(f, "selected"),
            NotificationKind::Deselected => write!(f, "deselected"),
        }
    }
}

/// Topic value type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TopicType {
    #[default]
    Json,
    String,
    Int64,
    Double,
    Binary,
    TimeSeries,
    RecordV2,
}

impl fmt::Display for TopicType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TopicType::Json => "json",
            TopicType::String => "string",
            TopicType::Int64 => "int64",
            TopicType::Double => "double",
            TopicType::Binary => "binary",
            TopicType::TimeSeries => "time_series",
            TopicType::RecordV2 => "record_v2",
        };
        f.write_str(name)
    }
}

/// Metadata describing a topic, carried by topic notifications.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicSpecification {
    /// Value type of the topic.
    #[serde(rename = "type", default)]
    pub topic_type: TopicType,
    /// Free-form topic properties.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, String>,
}

impl TopicSpecification {
    /// Create a specification with no properties.
    pub fn new(topic_type: TopicType) -> Self {
        Self {
            topic_type,
            properties: BTreeMap::new(),
        }
    }

    /// Add a property.
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }
}

/// Notification about an individually selected path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicNotification {
    pub path: String,
    pub specification: TopicSpecification,
    pub kind: NotificationKind,
}

impl TopicNotification {
    pub fn new(
        path: impl Into<String>,
        specification: TopicSpecification,
        kind: NotificationKind,
    ) -> Self {
        Self {
            path: path.into(),
            specification,
            kind,
        }
    }
}

/// Notification about a path below a selected path that is not itself
/// selected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescendantNotification {
    pub path: String,
    pub kind: NotificationKind,
}

impl DescendantNotification {
    pub fn new(path: impl Into<String>, kind: NotificationKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_materializing_kinds() {
        assert!(NotificationKind::Added.is_materializing());
        assert!(NotificationKind::Selected.is_materializing());
        assert!(!NotificationKind::Removed.is_materializing());
        assert!(!NotificationKind::Deselected.is_materializing());
    }

    #[test]
    fn test_specification_serde() {
        let spec: TopicSpecification =
            serde_json::from_str(r#"{"type": "int64", "properties": {"retain": "true"}}"#)
                .unwrap();
        assert_eq!(spec.topic_type, TopicType::Int64);
        assert_eq!(spec.properties.get("retain").map(String::as_str), Some("true"));

        let bare: TopicSpecification = serde_json::from_str("{}").unwrap();
        assert_eq!(bare, TopicSpecification::default());
        assert_eq!(serde_json::to_string(&bare).unwrap(), r#"{"type":"json"}"#);
    }
}
