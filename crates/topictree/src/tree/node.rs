//! A single materialized path.

use std::fmt;

use hashlink::LinkedHashSet;

use super::Effect;
use crate::path::is_descendant_of;

/// Identity of one materialization of a path.
///
/// A path that is removed and materialized again gets a fresh id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u64);

impl NodeId {
    /// Raw numeric value.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Whether pending descendants are forwarded to the source for selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Forwarding {
    NotForwarding,
    Forwarding,
}

/// In-memory representative of one materialized path.
#[derive(Debug, Clone)]
pub struct TreeNode {
    id: NodeId,
    path: String,
    pending_descendants: LinkedHashSet<String>,
    forwarding: Forwarding,
}

impl TreeNode {
    pub(crate) fn new(id: NodeId, path: impl Into<String>) -> Self {
        Self {
            id,
            path: path.into(),
            pending_descendants: LinkedHashSet::new(),
            forwarding: Forwarding::NotForwarding,
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Descendant paths known to this node, in arrival order.
    pub fn pending_descendants(&self) -> impl Iterator<Item = &str> {
        self.pending_descendants.iter().map(String::as_str)
    }

    pub fn selects_descendants(&self) -> bool {
        self.forwarding == Forwarding::Forwarding
    }

    /// Record a descendant path, selecting it right away when forwarding.
    pub(crate) fn add_descendant(&mut self, path: &str, effects: &mut Vec<Effect>) {
        debug_assert!(is_descendant_of(path, &self.path));

        if !self.pending_descendants.insert(path.to_string()) {
            tracing::trace!(node = %self.path, path, "descendant already pending");
            return;
        }

        if self.selects_descendants() {
            effects.push(Effect::Select(path.to_string()));
        }
    }

    /// Forget a descendant path, deselecting it when forwarding.
    pub(crate) fn remove_descendant(&mut self, path: &str, effects: &mut Vec<Effect>) {
        if !self.pending_descendants.remove(path) {
            tracing::trace!(node = %self.path, path, "descendant was not pending");
            return;
        }

        if self.selects_descendants() {
            effects.push(Effect::Deselect(path.to_string()));
        }
    }

    /// Hand over the pending paths lying below `path`, in arrival order.
    pub(crate) fn take_descendants_below(&mut self, path: &str) -> Vec<String> {
        let moved: Vec<String> = self
            .pending_descendants
            .iter()
            .filter(|p| is_descendant_of(p, path))
            .cloned()
            .collect();
        for p in &moved {
            self.pending_descendants.remove(p);
        }
        moved
    }

    /// Switch descendant forwarding on or off.
    ///
    /// Pending paths survive a switch-off so switching back on selects them
    /// again. Calls that do not change state produce no effects.
    pub(crate) fn select_descendants(&mut self, enable: bool, effects: &mut Vec<Effect>) {
        let target = if enable {
            Forwarding::Forwarding
        } else {
            Forwarding::NotForwarding
        };
        if self.forwarding == target {
            return;
        }
        self.forwarding = target;

        effects.extend(self.pending_descendants.iter().map(|p| {
            if enable {
                Effect::Select(p.clone())
            } else {
                Effect::Deselect(p.clone())
            }
        }));
    }
}
