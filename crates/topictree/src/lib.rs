//! topictree - incremental walker over a hierarchical topic namespace.
//!
//! A walk registers with a [`NotificationSource`], materializes paths as
//! notifications arrive and reports them to a [`TopicTreeWalker`]. The
//! consumer expands or collapses branches lazily through
//! [`NodeHandle::select_descendants`], and closing the walk removes every
//! node deepest-first.
//!
//! # Quick Start
//!
//! ```ignore
//! use topictree::memory::MemoryNamespace;
//! use topictree::{walk, ChannelWalker, TopicSpecification, WalkConfig, WalkEvent};
//!
//! #[tokio::main]
//! async fn main() {
//!     let namespace = MemoryNamespace::new();
//!     namespace.add_topic("sensors/temp", TopicSpecification::default());
//!
//!     let (walker, mut events) = ChannelWalker::new();
//!     let handle = walk(namespace, WalkConfig::whole_namespace(), walker);
//!
//!     if let Some(WalkEvent::NodeAdded { node, .. }) = events.recv().await {
//!         println!("added {}", node.path());
//!         node.select_descendants(true).unwrap();
//!     }
//!
//!     handle.close();
//!     handle.closed().await;
//! }
//! ```

pub mod config;
pub mod error;
pub mod memory;
pub mod notification;
pub mod path;
pub mod source;
pub mod tree;
pub mod walk;
pub mod walker;

pub use config::WalkConfig;
pub use error::{SourceError, WalkError};
pub use notification::{
    DescendantNotification, NotificationKind, TopicNotification, TopicSpecification, TopicType,
};
pub use source::{NotificationListener, NotificationSource, Registration, SourceEvent};
pub use tree::{Effect, NodeId, TopicTree, TreeNode};
pub use walk::{walk, NodeSnapshot, TreeSnapshot, WalkHandle};
pub use walker::{ChannelWalker, CloseReason, NodeHandle, NoopWalker, TopicTreeWalker, WalkEvent};
