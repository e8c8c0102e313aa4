//! Output formatters for walk events.

use clap::ValueEnum;
use serde_json::json;
use topictree::{path, CloseReason, TopicSpecification, WalkError, WalkEvent};

/// Output format for walk events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Indented tree lines
    Text,
    /// One JSON object per line
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

/// Trait for formatting output.
pub trait Formatter: Send + Sync {
    /// Format a materialized node.
    fn format_added(&self, id: u64, node_path: &str, specification: &TopicSpecification) -> String;

    /// Format a dematerialized node.
    fn format_removed(&self, id: u64, node_path: &str) -> String;

    /// Format a walk error.
    fn format_error(&self, error: &WalkError) -> String;

    /// Format the end of the walk.
    fn format_closed(&self, reason: CloseReason) -> String;

    /// Format any walk event.
    fn format_event(&self, event: &WalkEvent) -> String {
        match event {
            WalkEvent::NodeAdded {
                node,
                specification,
            } => self.format_added(node.id().get(), node.path(), specification),
            WalkEvent::NodeRemoved { node } => self.format_removed(node.id().get(), node.path()),
            WalkEvent::Error(error) => self.format_error(error),
            WalkEvent::Closed(reason) => self.format_closed(*reason),
        }
    }
}

/// Create a formatter for the given output format.
pub fn create_formatter(format: OutputFormat) -> Box<dyn Formatter> {
    match format {
        OutputFormat::Text => Box::new(TextFormatter),
        OutputFormat::Json => Box::new(JsonFormatter),
    }
}

fn reason_name(reason: CloseReason) -> &'static str {
    match reason {
        CloseReason::Closed => "closed",
        CloseReason::SourceClosed => "source_closed",
        CloseReason::Failed => "failed",
    }
}

/// Plain text formatter, indented by path depth.
pub struct TextFormatter;

impl TextFormatter {
    fn indent(node_path: &str) -> String {
        "  ".repeat(path::depth(node_path).saturating_sub(1))
    }
}

impl Formatter for TextFormatter {
    fn format_added(&self, _id: u64, node_path: &str, specification: &TopicSpecification) -> String {
        let mut line = format!(
            "{}+ {} [{}]",
            Self::indent(node_path),
            node_path,
            specification.topic_type
        );
        if !specification.properties.is_empty() {
            let properties: Vec<String> = specification
                .properties
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect();
            line.push_str(&format!(" {{{}}}", properties.join(", ")));
        }
        line
    }

    fn format_removed(&self, _id: u64, node_path: &str) -> String {
        format!("{}- {}", Self::indent(node_path), node_path)
    }

    fn format_error(&self, error: &WalkError) -> String {
        format!("error: {}", error)
    }

    fn format_closed(&self, reason: CloseReason) -> String {
        format!("walk {}", reason_name(reason))
    }
}

/// JSON lines formatter.
pub struct JsonFormatter;

impl Formatter for JsonFormatter {
    fn format_added(&self, id: u64, node_path: &str, specification: &TopicSpecification) -> String {
        json!({
            "event": "added",
            "id": id,
            "path": node_path,
            "specification": specification,
        })
        .to_string()
    }

    fn format_removed(&self, id: u64, node_path: &str) -> String {
        json!({
            "event": "removed",
            "id": id,
            "path": node_path,
        })
        .to_string()
    }

    fn format_error(&self, error: &WalkError) -> String {
        json!({
            "event": "error",
            "message": error.to_string(),
        })
        .to_string()
    }

    fn format_closed(&self, reason: CloseReason) -> String {
        json!({
            "event": "closed",
            "reason": reason_name(reason),
        })
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use topictree::{SourceError, TopicType};

    #[test]
    fn test_text_formatter_indents_by_depth() {
        let formatter = TextFormatter;
        let spec = TopicSpecification::new(TopicType::Double).with_property("unit", "C");

        assert_eq!(
            formatter.format_added(1, "sensors", &TopicSpecification::default()),
            "+ sensors [json]"
        );
        assert_eq!(
            formatter.format_added(2, "sensors/temp", &spec),
            "  + sensors/temp [double] {unit=C}"
        );
        assert_eq!(formatter.format_removed(2, "sensors/temp"), "  - sensors/temp");
        assert_eq!(formatter.format_closed(CloseReason::SourceClosed), "walk source_closed");
    }

    #[test]
    fn test_json_formatter() {
        let formatter = JsonFormatter;
        let spec = TopicSpecification::new(TopicType::String);

        let added: serde_json::Value =
            serde_json::from_str(&formatter.format_added(7, "a/b", &spec)).unwrap();
        assert_eq!(added["event"], "added");
        assert_eq!(added["id"], 7);
        assert_eq!(added["path"], "a/b");
        assert_eq!(added["specification"]["type"], "string");

        let error = WalkError::Registration(SourceError::Registration("denied".to_string()));
        let line: serde_json::Value = serde_json::from_str(&formatter.format_error(&error)).unwrap();
        assert_eq!(line["event"], "error");
        assert_eq!(line["message"], "registration error: registration failed: denied");

        let closed: serde_json::Value =
            serde_json::from_str(&formatter.format_closed(CloseReason::Failed)).unwrap();
        assert_eq!(closed["reason"], "failed");
    }

    #[test]
    fn test_output_format_display() {
        assert_eq!(OutputFormat::Text.to_string(), "text");
        assert_eq!(OutputFormat::Json.to_string(), "json");
    }
}
