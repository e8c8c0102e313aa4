//! Notification source interface.
//!
//! A notification source is the remote hierarchical namespace. A walk
//! registers a [`NotificationListener`] with it and gets back a
//! [`Registration`] used to select and deselect paths. The source delivers
//! events for one registration strictly in order through the listener.

use futures::future::BoxFuture;
use tokio::sync::mpsc;

use crate::error::SourceError;
use crate::notification::{
    DescendantNotification, NotificationKind, TopicNotification, TopicSpecification,
};

/// An event delivered by a source to a registered listener.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceEvent {
    /// Notification about an individually selected path.
    Topic(TopicNotification),
    /// Notification about an unselected descendant of a selected path.
    Descendant(DescendantNotification),
    /// The source closed the registration.
    Closed,
}

/// Listener handed to a source on registration.
///
/// Cloning is cheap. Every method is non-blocking and returns `false` once
/// the walk that owns the listener has gone away.
#[derive(Debug, Clone)]
pub struct NotificationListener {
    tx: mpsc::UnboundedSender<SourceEvent>,
}

impl NotificationListener {
    /// Create a listener and the receiver a walk loop consumes.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<SourceEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Deliver a notification about a selected path.
    pub fn on_topic_notification(
        &self,
        path: impl Into<String>,
        specification: TopicSpecification,
        kind: NotificationKind,
    ) -> bool {
        self.deliver(SourceEvent::Topic(TopicNotification::new(
            path,
            specification,
            kind,
        )))
    }

    /// Deliver a notification about an unselected descendant path.
    pub fn on_descendant_notification(&self, path: impl Into<String>, kind: NotificationKind) -> bool {
        self.deliver(SourceEvent::Descendant(DescendantNotification::new(path, kind)))
    }

    /// Signal that the source has closed this registration.
    pub fn on_close(&self) -> bool {
        self.deliver(SourceEvent::Closed)
    }

    /// Check if the owning walk has stopped listening.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    fn deliver(&self, event: SourceEvent) -> bool {
        self.tx.send(event).is_ok()
    }
}

/// Handle returned by a successful registration.
///
/// Futures are `'static` so the walk can dispatch them without waiting on
/// the result inline. A walk issues `select` and `deselect` one at a time:
/// each returned future is awaited to completion before the next request is
/// created, so the source sees them in the order the walk produced them.
/// `close` may be issued while the last queued requests are still draining.
pub trait Registration: Send + Sync + 'static {
    /// Select a path individually.
    fn select(&self, path: &str) -> BoxFuture<'static, Result<(), SourceError>>;

    /// Stop selecting a path individually.
    fn deselect(&self, path: &str) -> BoxFuture<'static, Result<(), SourceError>>;

    /// Close the registration. No further events are delivered afterwards.
    fn close(&self) -> BoxFuture<'static, Result<(), SourceError>>;
}

/// A hierarchical namespace that can be walked.
pub trait NotificationSource: Send + Sync + 'static {
    /// Registration handle type.
    type Registration: Registration;

    /// Register a listener for topic and descendant notifications.
    fn register(
        &self,
        listener: NotificationListener,
    ) -> BoxFuture<'static, Result<Self::Registration, SourceError>>;
}
