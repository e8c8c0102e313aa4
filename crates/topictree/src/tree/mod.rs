//! Materialized view of a walked namespace.
//!
//! [`TopicTree`] is a synchronous state machine. It never talks to the
//! source or the consumer directly: every operation returns the ordered
//! [`Effect`]s the caller has to carry out.

mod node;
mod topic_tree;

pub use node::{NodeId, TreeNode};
pub use topic_tree::TopicTree;

use crate::notification::TopicSpecification;

/// Side effect requested by a tree operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Ask the source to select a path individually.
    Select(String),
    /// Ask the source to stop selecting a path individually.
    Deselect(String),
    /// A path was materialized.
    NodeAdded {
        id: NodeId,
        path: String,
        specification: TopicSpecification,
    },
    /// A path was dematerialized.
    NodeRemoved { id: NodeId, path: String },
}
