//! Consumer-facing side of a walk.

use std::fmt;
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::error::WalkError;
use crate::notification::TopicSpecification;
use crate::path;
use crate::tree::NodeId;
use crate::walk::Command;

/// Why a walk finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// The consumer closed the walk.
    Closed,
    /// The source closed the registration.
    SourceClosed,
    /// Registration or a selection request failed.
    Failed,
}

/// Receives the materialized view of a walked namespace.
///
/// All callbacks run on the walk's own task, one at a time and in order.
/// They must not block.
pub trait TopicTreeWalker: Send + 'static {
    /// A path was materialized.
    fn on_node_added(&mut self, node: &NodeHandle, specification: &TopicSpecification);

    /// A path was dematerialized. Children are always removed before their
    /// ancestors during teardown.
    fn on_node_removed(&mut self, node: &NodeHandle);

    /// Registration or selection failed. Followed by `on_close`.
    fn on_error(&mut self, error: &WalkError);

    /// The walk has finished. No callbacks follow.
    fn on_close(&mut self, reason: CloseReason);
}

/// Walker that ignores every callback.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopWalker;

impl TopicTreeWalker for NoopWalker {
    fn on_node_added(&mut self, _node: &NodeHandle, _specification: &TopicSpecification) {}

    fn on_node_removed(&mut self, _node: &NodeHandle) {}

    fn on_error(&mut self, _error: &WalkError) {}

    fn on_close(&mut self, _reason: CloseReason) {}
}

/// A walker callback captured as a value.
#[derive(Debug, Clone)]
pub enum WalkEvent {
    NodeAdded {
        node: NodeHandle,
        specification: TopicSpecification,
    },
    NodeRemoved {
        node: NodeHandle,
    },
    Error(WalkError),
    Closed(CloseReason),
}

/// Walker that forwards every callback into a channel.
#[derive(Debug, Clone)]
pub struct ChannelWalker {
    tx: mpsc::UnboundedSender<WalkEvent>,
}

impl ChannelWalker {
    /// Create a walker and the receiving end of its events.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<WalkEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn forward(&self, event: WalkEvent) {
        if self.tx.send(event).is_err() {
            tracing::trace!("walk event receiver dropped");
        }
    }
}

impl TopicTreeWalker for ChannelWalker {
    fn on_node_added(&mut self, node: &NodeHandle, specification: &TopicSpecification) {
        self.forward(WalkEvent::NodeAdded {
            node: node.clone(),
            specification: specification.clone(),
        });
    }

    fn on_node_removed(&mut self, node: &NodeHandle) {
        self.forward(WalkEvent::NodeRemoved { node: node.clone() });
    }

    fn on_error(&mut self, error: &WalkError) {
        self.forward(WalkEvent::Error(error.clone()));
    }

    fn on_close(&mut self, reason: CloseReason) {
        self.forward(WalkEvent::Closed(reason));
    }
}

/// Opaque handle to a materialized node.
///
/// Handles carry no engine state; requests made through them are queued to
/// the walk and ignored once the node they name has been removed.
#[derive(Clone)]
pub struct NodeHandle {
    id: NodeId,
    path: Arc<str>,
    commands: mpsc::UnboundedSender<Command>,
}

impl NodeHandle {
    pub(crate) fn new(id: NodeId, path: &str, commands: mpsc::UnboundedSender<Command>) -> Self {
        Self {
            id,
            path: Arc::from(path),
            commands,
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Depth of the node's path in the namespace.
    pub fn depth(&self) -> usize {
        path::depth(&self.path)
    }

    /// Expand (`true`) or collapse (`false`) this node's descendants.
    ///
    /// Safe to call from any thread; returns once the request is queued.
    pub fn select_descendants(&self, enable: bool) -> Result<(), WalkError> {
        self.commands
            .send(Command::SelectDescendants {
                id: self.id,
                path: self.path.to_string(),
                enable,
            })
            .map_err(|_| WalkError::Closed)
    }
}

impl PartialEq for NodeHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.path == other.path
    }
}

impl Eq for NodeHandle {}

impl fmt::Debug for NodeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeHandle")
            .field("id", &self.id)
            .field("path", &self.path)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_handle_queues_commands() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let node = NodeHandle::new(NodeId(3), "a/b", tx);

        node.select_descendants(true).unwrap();

        match rx.try_recv() {
            Ok(Command::SelectDescendants { id, path, enable }) => {
                assert_eq!(id, NodeId(3));
                assert_eq!(path, "a/b");
                assert!(enable);
            }
            other => panic!("unexpected command: {:?}", other),
        }
        assert_eq!(node.depth(), 2);
    }

    #[test]
    fn test_node_handle_after_walk_gone() {
        let (tx, rx) = mpsc::unbounded_channel();
        let node = NodeHandle::new(NodeId(1), "a", tx);
        drop(rx);

        assert!(matches!(node.select_descendants(true), Err(WalkError::Closed)));
    }

    #[test]
    fn test_channel_walker_forwards() {
        let (mut walker, mut rx) = ChannelWalker::new();
        let (tx, _commands) = mpsc::unbounded_channel();
        let node = NodeHandle::new(NodeId(1), "a", tx);

        walker.on_node_added(&node, &TopicSpecification::default());
        walker.on_node_removed(&node);
        walker.on_close(CloseReason::Closed);

        assert!(matches!(rx.try_recv(), Ok(WalkEvent::NodeAdded { node: n, .. }) if n.path() == "a"));
        assert!(matches!(rx.try_recv(), Ok(WalkEvent::NodeRemoved { .. })));
        assert!(matches!(rx.try_recv(), Ok(WalkEvent::Closed(CloseReason::Closed))));
    }
}
