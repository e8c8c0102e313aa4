//! Path to node map and the notification handling that drives it.

use std::collections::HashMap;

use super::{Effect, NodeId, TreeNode};
use crate::notification::{DescendantNotification, TopicNotification};
use crate::path;

/// The materialized part of a walked namespace.
///
/// Holds exactly one [`TreeNode`] per materialized path. Protocol anomalies
/// (a second Added for a materialized path, a Removed for an unknown path)
/// are logged, counted and otherwise ignored.
#[derive(Debug, Default)]
pub struct TopicTree {
    nodes: HashMap<String, TreeNode>,
    next_id: u64,
    anomalies: u64,
    closed: bool,
}

impl TopicTree {
    /// Create an empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a notification about an individually selected path.
    pub fn on_topic_notification(&mut self, notification: TopicNotification) -> Vec<Effect> {
        if self.closed {
            tracing::trace!(path = %notification.path, "tree closed, ignoring notification");
            return Vec::new();
        }

        let TopicNotification {
            path,
            specification,
            kind,
        } = notification;

        if kind.is_materializing() {
            if self.nodes.contains_key(&path) {
                self.anomalies += 1;
                tracing::warn!(path = %path, %kind, "path already materialized, ignoring");
                return Vec::new();
            }

            self.next_id += 1;
            let id = NodeId(self.next_id);
            let mut node = TreeNode::new(id, path.clone());
            let mut effects = vec![Effect::NodeAdded {
                id,
                path: path.clone(),
                specification,
            }];
            self.adopt_descendants(&mut node, &mut effects);
            self.nodes.insert(path.clone(), node);
            tracing::debug!(path = %path, %id, %kind, "node added");

            effects
        } else {
            match self.nodes.remove(&path) {
                Some(node) => {
                    tracing::debug!(path = %path, id = %node.id(), %kind, "node removed");
                    vec![Effect::NodeRemoved {
                        id: node.id(),
                        path,
                    }]
                }
                None => {
                    self.anomalies += 1;
                    tracing::warn!(path = %path, %kind, "path not materialized, ignoring");
                    Vec::new()
                }
            }
        }
    }

    /// Apply a notification about an unselected descendant of a selected path.
    ///
    /// The descendant is attached to its nearest materialized ancestor. A
    /// path with no materialized ancestor is selected individually instead.
    pub fn on_descendant_notification(&mut self, notification: &DescendantNotification) -> Vec<Effect> {
        if self.closed {
            tracing::trace!(path = %notification.path, "tree closed, ignoring notification");
            return Vec::new();
        }

        let path = notification.path.as_str();
        let mut effects = Vec::new();

        let ancestor = self
            .nearest_materialized_ancestor(path)
            .map(str::to_string);

        match ancestor {
            None => {
                tracing::debug!(path, kind = %notification.kind, "no materialized ancestor, selecting");
                effects.push(Effect::Select(path.to_string()));
            }
            Some(ancestor) => {
                if let Some(node) = self.nodes.get_mut(&ancestor) {
                    if notification.kind.is_materializing() {
                        node.add_descendant(path, &mut effects);
                    } else {
                        node.remove_descendant(path, &mut effects);
                    }
                    tracing::trace!(path, ancestor = %ancestor, kind = %notification.kind, "descendant applied");
                }
            }
        }

        effects
    }

    /// Switch descendant forwarding for the node at `path`.
    ///
    /// Returns no effects if the path is not materialized.
    pub fn select_descendants(&mut self, path: &str, enable: bool) -> Vec<Effect> {
        let mut effects = Vec::new();
        if self.closed {
            return effects;
        }

        match self.nodes.get_mut(path) {
            Some(node) => node.select_descendants(enable, &mut effects),
            None => tracing::debug!(path, enable, "select_descendants on unknown node"),
        }
        effects
    }

    /// Tear the tree down, deepest paths first.
    ///
    /// Paths of equal depth are removed in lexicographic order. A second call
    /// returns no effects.
    pub fn close(&mut self) -> Vec<Effect> {
        if self.closed {
            return Vec::new();
        }
        self.closed = true;

        let mut paths: Vec<String> = self.nodes.keys().cloned().collect();
        paths.sort_by(|a, b| {
            path::depth(b)
                .cmp(&path::depth(a))
                .then_with(|| a.cmp(b))
        });

        let effects: Vec<Effect> = paths
            .into_iter()
            .filter_map(|path| {
                self.nodes.remove(&path).map(|node| Effect::NodeRemoved {
                    id: node.id(),
                    path,
                })
            })
            .collect();

        tracing::debug!(removed = effects.len(), "tree closed");
        effects
    }

    /// Drop every node without producing removal effects.
    ///
    /// Returns the number of nodes discarded.
    pub fn abandon(&mut self) -> usize {
        self.closed = true;
        let count = self.nodes.len();
        self.nodes.clear();
        count
    }

    /// Move pending paths lying below a newly materialized node from its
    /// nearest materialized ancestor onto the node.
    ///
    /// Paths the ancestor was forwarding are deselected, since the new node
    /// starts out not forwarding.
    fn adopt_descendants(&mut self, node: &mut TreeNode, effects: &mut Vec<Effect>) {
        let ancestor = match self.nearest_materialized_ancestor(node.path()) {
            Some(ancestor) => ancestor.to_string(),
            None => return,
        };
        let Some(owner) = self.nodes.get_mut(&ancestor) else {
            return;
        };

        let forwarding = owner.selects_descendants();
        let moved = owner.take_descendants_below(node.path());
        if moved.is_empty() {
            return;
        }
        tracing::trace!(path = node.path(), ancestor = %ancestor, moved = moved.len(), "descendants adopted");

        for descendant in moved {
            if forwarding {
                effects.push(Effect::Deselect(descendant.clone()));
            }
            node.add_descendant(&descendant, effects);
        }
    }

    /// Longest proper prefix of `path` that is materialized.
    pub fn nearest_materialized_ancestor<'a>(&self, path: &'a str) -> Option<&'a str> {
        path::ancestors(path).find(|ancestor| self.nodes.contains_key(*ancestor))
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.nodes.contains_key(path)
    }

    pub fn node(&self, path: &str) -> Option<&TreeNode> {
        self.nodes.get(path)
    }

    pub fn node_id(&self, path: &str) -> Option<NodeId> {
        self.nodes.get(path).map(TreeNode::id)
    }

    /// Pending descendants of the node at `path`, in arrival order.
    pub fn pending_descendants(&self, path: &str) -> Option<Vec<String>> {
        self.nodes
            .get(path)
            .map(|node| node.pending_descendants().map(str::to_string).collect())
    }

    pub fn selects_descendants(&self, path: &str) -> Option<bool> {
        self.nodes.get(path).map(TreeNode::selects_descendants)
    }

    /// Materialized paths in lexicographic order.
    pub fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.nodes.keys().cloned().collect();
        paths.sort();
        paths
    }

    /// Number of protocol anomalies tolerated so far.
    pub fn anomalies(&self) -> u64 {
        self.anomalies
    }

    pub fn nodes(&self) -> impl Iterator<Item = &TreeNode> {
        self.nodes.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notification::{NotificationKind, TopicSpecification};

    fn topic(path: &str, kind: NotificationKind) -> TopicNotification {
        TopicNotification::new(path, TopicSpecification::default(), kind)
    }

    fn descendant(path: &str, kind: NotificationKind) -> DescendantNotification {
        DescendantNotification::new(path, kind)
    }

    fn added(tree: &mut TopicTree, path: &str) -> Vec<Effect> {
        tree.on_topic_notification(topic(path, NotificationKind::Added))
    }

    fn removed_paths(effects: &[Effect]) -> Vec<&str> {
        effects
            .iter()
            .filter_map(|e| match e {
                Effect::NodeRemoved { path, .. } => Some(path.as_str()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_added_creates_node() {
        let mut tree = TopicTree::new();
        let effects = added(&mut tree, "a");

        assert_eq!(effects.len(), 1);
        assert!(matches!(&effects[0], Effect::NodeAdded { path, .. } if path == "a"));
        assert!(tree.contains("a"));
        assert_eq!(tree.selects_descendants("a"), Some(false));
    }

    #[test]
    fn test_duplicate_added_is_tolerated() {
        let mut tree = TopicTree::new();
        added(&mut tree, "a");
        let id = tree.node_id("a");

        let effects = tree.on_topic_notification(topic("a", NotificationKind::Selected));

        assert!(effects.is_empty());
        assert_eq!(tree.len(), 1);
        assert_eq!(tree.node_id("a"), id);
        assert_eq!(tree.anomalies(), 1);
    }

    #[test]
    fn test_removed_unknown_is_tolerated() {
        let mut tree = TopicTree::new();
        let effects = tree.on_topic_notification(topic("a", NotificationKind::Deselected));

        assert!(effects.is_empty());
        assert!(tree.is_empty());
        assert_eq!(tree.anomalies(), 1);
    }

    #[test]
    fn test_node_count_tracks_event_balance() {
        use NotificationKind::*;

        let events = [
            ("a", Added),
            ("a/b", Selected),
            ("c", Added),
            ("a/b", Deselected),
            ("a/b/c/d", Added),
            ("c", Removed),
            ("a/b", Added),
        ];

        let mut tree = TopicTree::new();
        let mut balance: i64 = 0;
        for (path, kind) in events {
            tree.on_topic_notification(topic(path, kind));
            balance += if kind.is_materializing() { 1 } else { -1 };
            assert_eq!(tree.len() as i64, balance);
        }
        assert_eq!(tree.paths(), vec!["a", "a/b", "a/b/c/d"]);
        assert_eq!(tree.anomalies(), 0);
    }

    #[test]
    fn test_rematerialized_path_gets_new_id() {
        let mut tree = TopicTree::new();
        added(&mut tree, "a");
        let first = tree.node_id("a").unwrap();
        tree.on_topic_notification(topic("a", NotificationKind::Removed));
        added(&mut tree, "a");

        assert_ne!(tree.node_id("a").unwrap(), first);
    }

    #[test]
    fn test_descendant_without_ancestor_is_selected() {
        let mut tree = TopicTree::new();
        let effects = tree.on_descendant_notification(&descendant("x/y", NotificationKind::Added));

        assert_eq!(effects, vec![Effect::Select("x/y".into())]);
        assert!(tree.is_empty());
    }

    #[test]
    fn test_descendant_pending_then_expanded() {
        let mut tree = TopicTree::new();
        added(&mut tree, "a");
        added(&mut tree, "a/b");
        added(&mut tree, "a/b/c/d");

        let effects = tree.on_descendant_notification(&descendant("a/e", NotificationKind::Added));
        assert!(effects.is_empty());
        assert_eq!(tree.pending_descendants("a"), Some(vec!["a/e".to_string()]));
        assert_eq!(tree.selects_descendants("a"), Some(false));

        let effects = tree.select_descendants("a", true);
        assert_eq!(effects, vec![Effect::Select("a/e".into())]);
    }

    #[test]
    fn test_descendant_skips_unmaterialized_parent() {
        let mut tree = TopicTree::new();
        added(&mut tree, "g");

        let effects = tree.on_descendant_notification(&descendant("g/p/c", NotificationKind::Added));

        assert!(effects.is_empty());
        assert_eq!(tree.nearest_materialized_ancestor("g/p/c"), Some("g"));
        assert_eq!(tree.pending_descendants("g"), Some(vec!["g/p/c".to_string()]));
    }

    #[test]
    fn test_descendant_attaches_to_nearest_ancestor() {
        let mut tree = TopicTree::new();
        added(&mut tree, "a");
        added(&mut tree, "a/b");

        tree.on_descendant_notification(&descendant("a/b/c/d", NotificationKind::Added));

        assert_eq!(tree.pending_descendants("a"), Some(vec![]));
        assert_eq!(tree.pending_descendants("a/b"), Some(vec!["a/b/c/d".to_string()]));
    }

    #[test]
    fn test_materialized_node_adopts_pending_descendants() {
        let mut tree = TopicTree::new();
        added(&mut tree, "a");
        tree.on_descendant_notification(&descendant("a/b/c", NotificationKind::Added));
        tree.on_descendant_notification(&descendant("a/x", NotificationKind::Added));

        let effects = added(&mut tree, "a/b");

        assert_eq!(effects.len(), 1);
        assert_eq!(tree.pending_descendants("a"), Some(vec!["a/x".to_string()]));
        assert_eq!(tree.pending_descendants("a/b"), Some(vec!["a/b/c".to_string()]));

        // Expanding `a` no longer selects anything below `a/b`.
        let effects = tree.select_descendants("a", true);
        assert_eq!(effects, vec![Effect::Select("a/x".into())]);
    }

    #[test]
    fn test_adopted_descendants_are_deselected_when_forwarding() {
        let mut tree = TopicTree::new();
        added(&mut tree, "a");
        tree.on_descendant_notification(&descendant("a/b/c", NotificationKind::Added));
        tree.select_descendants("a", true);

        let effects = added(&mut tree, "a/b");

        assert!(matches!(&effects[0], Effect::NodeAdded { path, .. } if path == "a/b"));
        assert_eq!(&effects[1..], &[Effect::Deselect("a/b/c".into())]);
        assert_eq!(tree.selects_descendants("a/b"), Some(false));
        assert_eq!(tree.pending_descendants("a/b"), Some(vec!["a/b/c".to_string()]));

        let effects = tree.select_descendants("a/b", true);
        assert_eq!(effects, vec![Effect::Select("a/b/c".into())]);
    }

    #[test]
    fn test_descendant_removed_while_forwarding() {
        let mut tree = TopicTree::new();
        added(&mut tree, "a");
        tree.on_descendant_notification(&descendant("a/e", NotificationKind::Added));
        tree.select_descendants("a", true);

        let effects = tree.on_descendant_notification(&descendant("a/e", NotificationKind::Removed));

        assert_eq!(effects, vec![Effect::Deselect("a/e".into())]);
        assert_eq!(tree.pending_descendants("a"), Some(vec![]));
    }

    #[test]
    fn test_select_then_deselect_descendants() {
        let mut tree = TopicTree::new();
        added(&mut tree, "a");
        for p in ["a/b", "a/c", "a/d/e"] {
            tree.on_descendant_notification(&descendant(p, NotificationKind::Added));
        }
        let before = tree.pending_descendants("a");

        let on = tree.select_descendants("a", true);
        let off = tree.select_descendants("a", false);

        assert_eq!(
            on,
            vec![
                Effect::Select("a/b".into()),
                Effect::Select("a/c".into()),
                Effect::Select("a/d/e".into()),
            ]
        );
        assert_eq!(
            off,
            vec![
                Effect::Deselect("a/b".into()),
                Effect::Deselect("a/c".into()),
                Effect::Deselect("a/d/e".into()),
            ]
        );
        assert_eq!(tree.pending_descendants("a"), before);
    }

    #[test]
    fn test_select_descendants_unknown_node() {
        let mut tree = TopicTree::new();
        assert!(tree.select_descendants("missing", true).is_empty());
    }

    #[test]
    fn test_close_orders_deepest_first() {
        let mut tree = TopicTree::new();
        added(&mut tree, "e/f");
        added(&mut tree, "e/f/g/h/i");

        let effects = tree.close();

        assert_eq!(removed_paths(&effects), vec!["e/f/g/h/i", "e/f"]);
        assert!(tree.is_empty());
    }

    #[test]
    fn test_close_ties_are_lexicographic() {
        let mut tree = TopicTree::new();
        for p in ["b", "a/z", "a", "c/d", "a/b"] {
            added(&mut tree, p);
        }

        let effects = tree.close();

        assert_eq!(removed_paths(&effects), vec!["a/b", "a/z", "c/d", "a", "b"]);
    }

    #[test]
    fn test_close_is_idempotent() {
        let mut tree = TopicTree::new();
        added(&mut tree, "a");

        assert_eq!(tree.close().len(), 1);
        assert!(tree.close().is_empty());
        assert!(tree.is_closed());
    }

    #[test]
    fn test_closed_tree_ignores_notifications() {
        let mut tree = TopicTree::new();
        tree.close();

        assert!(added(&mut tree, "a").is_empty());
        assert!(tree
            .on_descendant_notification(&descendant("a/b", NotificationKind::Added))
            .is_empty());
        assert!(tree.is_empty());
    }

    #[test]
    fn test_abandon_discards_silently() {
        let mut tree = TopicTree::new();
        added(&mut tree, "a");
        added(&mut tree, "a/b");

        assert_eq!(tree.abandon(), 2);
        assert!(tree.is_empty());
        assert!(tree.close().is_empty());
    }
}
