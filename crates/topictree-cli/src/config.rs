//! Command-line arguments and demo configuration.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use topictree::{path, WalkConfig};

use crate::formatter::OutputFormat;

/// Default number of levels materialized below the root.
pub const DEFAULT_DEPTH: usize = 2;

/// Default quiet period before the walk is closed, in milliseconds.
pub const DEFAULT_LINGER_MS: u64 = 200;

/// Walk a topic namespace described by a JSON file.
#[derive(Parser, Debug)]
#[command(name = "topictree")]
#[command(version, about = "Walk an in-memory topic namespace and print its tree")]
pub struct Args {
    /// Namespace file: {"topics": {"path": {"type": "string", "properties": {}}}}
    #[arg(short, long)]
    pub namespace: PathBuf,

    /// Root path of the walk (empty for the whole namespace).
    #[arg(short, long, default_value = "")]
    pub root: String,

    /// Expand nodes fewer than this many levels below the root.
    #[arg(short, long, default_value_t = DEFAULT_DEPTH)]
    pub depth: usize,

    /// Output format
    #[arg(long, default_value = "text", value_enum)]
    pub format: OutputFormat,

    /// Close the walk after this many milliseconds without events.
    #[arg(long, default_value_t = DEFAULT_LINGER_MS)]
    pub linger_ms: u64,
}

impl Args {
    /// Convert command-line arguments to the demo configuration.
    pub fn into_config(self) -> DemoConfig {
        DemoConfig {
            namespace_file: self.namespace,
            walk: WalkConfig::new(&self.root),
            depth: self.depth,
            format: self.format,
            linger: Duration::from_millis(self.linger_ms),
        }
    }
}

/// Demo configuration.
#[derive(Debug, Clone)]
pub struct DemoConfig {
    /// JSON file holding the namespace topics.
    pub namespace_file: PathBuf,

    /// Walk configuration.
    pub walk: WalkConfig,

    /// Levels below the root to expand.
    pub depth: usize,

    /// Output format.
    pub format: OutputFormat,

    /// Quiet period after which the walk is closed.
    pub linger: Duration,
}

impl DemoConfig {
    /// Whether a node at `node_path` should have its descendants selected.
    pub fn expands(&self, node_path: &str) -> bool {
        let relative = path::depth(node_path).saturating_sub(path::depth(&self.walk.root_path));
        relative < self.depth
    }
}
