//! Registration tracking for the in-memory namespace.

use std::collections::{BTreeMap, BTreeSet};
use std::iter;
use std::time::Instant;

use crate::notification::{NotificationKind, TopicSpecification};
use crate::path;
use crate::source::NotificationListener;

/// What triggered a reconciliation; decides the notification kinds used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Cause {
    /// A select or deselect request.
    Selection,
    /// A topic was added or removed.
    Topology,
}

impl Cause {
    fn kinds(self) -> (NotificationKind, NotificationKind) {
        match self {
            Cause::Selection => (NotificationKind::Selected, NotificationKind::Deselected),
            Cause::Topology => (NotificationKind::Added, NotificationKind::Removed),
        }
    }
}

/// Selected path a descendant hangs under, and whether a topic exists there.
type Anchor = (String, bool);

/// One registered listener and what it has been told so far.
#[derive(Debug, Clone)]
pub struct RegistrationEntry {
    /// Unique registration ID.
    pub id: u64,
    /// Paths selected individually through the registration.
    pub selected: BTreeSet<String>,
    /// When the registration was created.
    pub created_at: Instant,
    /// Number of notifications delivered.
    pub events_sent: u64,
    pub(crate) listener: NotificationListener,
    /// Selected topics notified, with the specification they were sent with.
    notified_topics: BTreeMap<String, TopicSpecification>,
    /// Descendants notified, keyed to the anchor they hang under.
    notified_descendants: BTreeMap<String, Anchor>,
}

impl RegistrationEntry {
    pub(crate) fn new(id: u64, listener: NotificationListener) -> Self {
        Self {
            id,
            selected: BTreeSet::new(),
            created_at: Instant::now(),
            events_sent: 0,
            listener,
            notified_topics: BTreeMap::new(),
            notified_descendants: BTreeMap::new(),
        }
    }

    /// Bring the listener's view in line with the current topics and
    /// selections.
    ///
    /// Descendant removals go out before topic removals and topic additions
    /// before descendant additions, so a descendant never arrives without
    /// the selected path above it being known.
    pub(crate) fn reconcile(
        &mut self,
        topics: &BTreeMap<String, TopicSpecification>,
        cause: Cause,
    ) {
        let (on, off) = cause.kinds();

        let topics_now: BTreeMap<String, TopicSpecification> = self
            .selected
            .iter()
            .filter_map(|p| topics.get(p).map(|spec| (p.clone(), spec.clone())))
            .collect();

        let descendants_now: BTreeMap<String, Anchor> = topics
            .keys()
            .filter_map(|t| self.selected_anchor(t, topics).map(|anchor| (t.clone(), anchor)))
            .filter(|(t, _)| self.notified_descendants.contains_key(t) || !self.selected.contains(t))
            .collect();

        let old_descendants = std::mem::take(&mut self.notified_descendants);
        let old_topics = std::mem::take(&mut self.notified_topics);

        for (t, anchor) in &old_descendants {
            if descendants_now.get(t) != Some(anchor) {
                self.send_descendant(t, off);
            }
        }
        for (t, spec) in &old_topics {
            if !topics_now.contains_key(t) {
                self.send_topic(t, spec.clone(), off);
            }
        }
        for (t, spec) in &topics_now {
            if !old_topics.contains_key(t) {
                self.send_topic(t, spec.clone(), on);
            }
        }
        for (t, anchor) in &descendants_now {
            if old_descendants.get(t) != Some(anchor) {
                self.send_descendant(t, on);
            }
        }

        self.notified_topics = topics_now;
        self.notified_descendants = descendants_now;
    }

    /// The selected path `topic` is an immediate descendant of, if any.
    ///
    /// Walks up from the topic; an existing topic in between ends the search.
    /// A descendant whose anchor changes, including the anchor's topic
    /// appearing or disappearing, is notified again.
    fn selected_anchor(
        &self,
        topic: &str,
        topics: &BTreeMap<String, TopicSpecification>,
    ) -> Option<Anchor> {
        for ancestor in path::ancestors(topic).chain(iter::once("")) {
            if self.selected.contains(ancestor) {
                return Some((ancestor.to_string(), topics.contains_key(ancestor)));
            }
            if topics.contains_key(ancestor) {
                return None;
            }
        }
        None
    }

    fn send_topic(&mut self, path: &str, spec: TopicSpecification, kind: NotificationKind) {
        self.events_sent += 1;
        if !self.listener.on_topic_notification(path, spec, kind) {
            tracing::trace!(registration_id = self.id, path, "listener gone");
        }
    }

    fn send_descendant(&mut self, path: &str, kind: NotificationKind) {
        self.events_sent += 1;
        if !self.listener.on_descendant_notification(path, kind) {
            tracing::trace!(registration_id = self.id, path, "listener gone");
        }
    }
}
