//! In-memory namespace implementing [`NotificationSource`].

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use futures::future::{self, BoxFuture, FutureExt};
use parking_lot::Mutex;

use super::registration::{Cause, RegistrationEntry};
use crate::error::SourceError;
use crate::notification::TopicSpecification;
use crate::path;
use crate::source::{NotificationListener, NotificationSource, Registration};

/// A select or deselect request received by the namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionRequest {
    pub registration_id: u64,
    pub path: String,
    pub select: bool,
}

#[derive(Debug, Default)]
struct NamespaceState {
    /// Topics keyed by path.
    topics: BTreeMap<String, TopicSpecification>,
    /// Active registrations keyed by registration ID.
    registrations: HashMap<u64, RegistrationEntry>,
    /// Next registration ID.
    next_registration_id: u64,
    /// Every select/deselect received, in order.
    requests: Vec<SelectionRequest>,
    /// Injected registration failure.
    registration_failure: Option<String>,
    /// Injected selection failure.
    selection_failure: Option<String>,
}

impl NamespaceState {
    fn reconcile_all(&mut self, cause: Cause) {
        let NamespaceState {
            topics,
            registrations,
            ..
        } = self;
        for entry in registrations.values_mut() {
            entry.reconcile(topics, cause);
        }
    }
}

/// A hierarchical topic namespace held in memory.
///
/// Cloning is cheap; clones share the same topics and registrations.
/// Notifications are delivered synchronously inside the call that causes
/// them, so their order per registration is deterministic.
#[derive(Debug, Clone, Default)]
pub struct MemoryNamespace {
    state: Arc<Mutex<NamespaceState>>,
}

impl MemoryNamespace {
    /// Create an empty namespace.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a namespace holding the given topics.
    pub fn with_topics<I, P>(topics: I) -> Self
    where
        I: IntoIterator<Item = (P, TopicSpecification)>,
        P: AsRef<str>,
    {
        let namespace = Self::new();
        {
            let mut state = namespace.state.lock();
            for (p, spec) in topics {
                state.topics.insert(path::normalize(p.as_ref()), spec);
            }
        }
        namespace
    }

    /// Add a topic. Returns `false` if a topic already exists at the path.
    pub fn add_topic(&self, topic_path: &str, specification: TopicSpecification) -> bool {
        let topic_path = path::normalize(topic_path);
        if topic_path.is_empty() {
            return false;
        }

        let mut state = self.state.lock();
        if state.topics.contains_key(&topic_path) {
            return false;
        }
        state.topics.insert(topic_path.clone(), specification);
        state.reconcile_all(Cause::Topology);

        tracing::debug!(path = %topic_path, "topic added");
        true
    }

    /// Remove a single topic; topics below it stay.
    pub fn remove_topic(&self, topic_path: &str) -> bool {
        let topic_path = path::normalize(topic_path);
        let mut state = self.state.lock();
        if state.topics.remove(&topic_path).is_none() {
            return false;
        }
        state.reconcile_all(Cause::Topology);

        tracing::debug!(path = %topic_path, "topic removed");
        true
    }

    /// Remove a topic and every topic below it. Returns the number removed.
    pub fn remove_branch(&self, branch: &str) -> usize {
        let branch = path::normalize(branch);
        let mut state = self.state.lock();
        let before = state.topics.len();
        state
            .topics
            .retain(|p, _| *p != branch && !path::is_descendant_of(p, &branch));
        let removed = before - state.topics.len();

        if removed > 0 {
            state.reconcile_all(Cause::Topology);
            tracing::debug!(path = %branch, removed, "branch removed");
        }
        removed
    }

    /// Check if a topic exists at the path.
    pub fn contains_topic(&self, topic_path: &str) -> bool {
        self.state
            .lock()
            .topics
            .contains_key(&path::normalize(topic_path))
    }

    /// All topic paths in lexicographic order.
    pub fn topic_paths(&self) -> Vec<String> {
        self.state.lock().topics.keys().cloned().collect()
    }

    /// Get the number of active registrations.
    pub fn registration_count(&self) -> usize {
        self.state.lock().registrations.len()
    }

    /// Get a registration by ID.
    pub fn registration(&self, registration_id: u64) -> Option<RegistrationEntry> {
        self.state.lock().registrations.get(&registration_id).cloned()
    }

    /// Every select/deselect request received so far, in order.
    pub fn selection_requests(&self) -> Vec<SelectionRequest> {
        self.state.lock().requests.clone()
    }

    /// Make future registrations fail with `message`, or succeed with `None`.
    pub fn fail_registrations(&self, message: Option<&str>) {
        self.state.lock().registration_failure = message.map(str::to_string);
    }

    /// Make future select/deselect requests fail with `message`, or succeed
    /// with `None`.
    pub fn fail_selections(&self, message: Option<&str>) {
        self.state.lock().selection_failure = message.map(str::to_string);
    }

    /// Close every registration from the namespace side.
    pub fn close_all(&self) -> usize {
        let mut state = self.state.lock();
        let count = state.registrations.len();
        for (_, entry) in state.registrations.drain() {
            entry.listener.on_close();
        }

        tracing::debug!(count, "registrations closed by namespace");
        count
    }

    fn change_selection(&self, registration_id: u64, selected_path: &str, select: bool) -> Result<(), SourceError> {
        let selected_path = path::normalize(selected_path);
        let mut state = self.state.lock();
        state.requests.push(SelectionRequest {
            registration_id,
            path: selected_path.clone(),
            select,
        });

        if let Some(message) = &state.selection_failure {
            return Err(SourceError::Selection {
                path: selected_path,
                message: message.clone(),
            });
        }

        let NamespaceState {
            topics,
            registrations,
            ..
        } = &mut *state;
        let entry = registrations
            .get_mut(&registration_id)
            .ok_or(SourceError::Closed)?;

        let changed = if select {
            entry.selected.insert(selected_path.clone())
        } else {
            entry.selected.remove(&selected_path)
        };
        if changed {
            entry.reconcile(topics, Cause::Selection);
        }

        tracing::trace!(registration_id, path = %selected_path, select, changed, "selection changed");
        Ok(())
    }
}

impl NotificationSource for MemoryNamespace {
    type Registration = MemoryRegistration;

    fn register(
        &self,
        listener: NotificationListener,
    ) -> BoxFuture<'static, Result<MemoryRegistration, SourceError>> {
        let mut state = self.state.lock();

        let result = match &state.registration_failure {
            Some(message) => Err(SourceError::Registration(message.clone())),
            None => {
                state.next_registration_id += 1;
                let id = state.next_registration_id;
                state.registrations.insert(id, RegistrationEntry::new(id, listener));
                tracing::debug!(registration_id = id, "registration created");

                Ok(MemoryRegistration {
                    id,
                    namespace: self.clone(),
                })
            }
        };

        future::ready(result).boxed()
    }
}

/// Registration handle for a [`MemoryNamespace`].
#[derive(Debug, Clone)]
pub struct MemoryRegistration {
    id: u64,
    namespace: MemoryNamespace,
}

impl MemoryRegistration {
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl Registration for MemoryRegistration {
    fn select(&self, selected_path: &str) -> BoxFuture<'static, Result<(), SourceError>> {
        future::ready(self.namespace.change_selection(self.id, selected_path, true)).boxed()
    }

    fn deselect(&self, selected_path: &str) -> BoxFuture<'static, Result<(), SourceError>> {
        future::ready(self.namespace.change_selection(self.id, selected_path, false)).boxed()
    }

    fn close(&self) -> BoxFuture<'static, Result<(), SourceError>> {
        let removed = self.namespace.state.lock().registrations.remove(&self.id);
        let result = match removed {
            Some(entry) => {
                tracing::debug!(
                    registration_id = self.id,
                    events_sent = entry.events_sent,
                    "registration closed"
                );
                Ok(())
            }
            None => Err(SourceError::Closed),
        };
        future::ready(result).boxed()
    }
}
