//! The walk event loop.
//!
//! One task owns the [`TopicTree`] for a walk. It merges three inputs in a
//! fixed priority order: selection failures, consumer commands, then source
//! events. `select`/`deselect` requests are queued to a selection worker and
//! never awaited inline; the worker issues them to the source one at a time,
//! in the order the loop produced them. Their outcome comes back later as
//! further source events or as a failure.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info, warn, Instrument};

use crate::config::WalkConfig;
use crate::error::WalkError;
use crate::source::{NotificationListener, NotificationSource, Registration, SourceEvent};
use crate::tree::{Effect, NodeId, TopicTree};
use crate::walker::{CloseReason, NodeHandle, TopicTreeWalker};

/// Request sent from a [`WalkHandle`] or [`NodeHandle`] to the walk loop.
#[derive(Debug)]
pub(crate) enum Command {
    SelectDescendants {
        id: NodeId,
        path: String,
        enable: bool,
    },
    Snapshot(oneshot::Sender<TreeSnapshot>),
    Close,
}

/// A select or deselect waiting to be issued to the source.
#[derive(Debug)]
struct SelectionRequest {
    path: String,
    select: bool,
}

/// Point-in-time copy of one materialized node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeSnapshot {
    pub id: NodeId,
    pub path: String,
    pub pending_descendants: Vec<String>,
    pub selects_descendants: bool,
}

/// Point-in-time copy of a walk's materialized tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TreeSnapshot {
    /// Materialized nodes ordered by path.
    pub nodes: Vec<NodeSnapshot>,
    /// Protocol anomalies tolerated so far.
    pub anomalies: u64,
}

impl TreeSnapshot {
    fn of(tree: &TopicTree) -> Self {
        let mut nodes: Vec<NodeSnapshot> = tree
            .nodes()
            .map(|node| NodeSnapshot {
                id: node.id(),
                path: node.path().to_string(),
                pending_descendants: node.pending_descendants().map(str::to_string).collect(),
                selects_descendants: node.selects_descendants(),
            })
            .collect();
        nodes.sort_by(|a, b| a.path.cmp(&b.path));

        Self {
            nodes,
            anomalies: tree.anomalies(),
        }
    }

    pub fn paths(&self) -> Vec<&str> {
        self.nodes.iter().map(|n| n.path.as_str()).collect()
    }

    pub fn node(&self, path: &str) -> Option<&NodeSnapshot> {
        self.nodes.iter().find(|n| n.path == path)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Start walking `config.root_path` of `source`, reporting to `walker`.
///
/// Registration happens on the spawned walk task, so this returns
/// immediately. Must be called from within a tokio runtime.
pub fn walk<S, W>(source: S, config: WalkConfig, walker: W) -> WalkHandle
where
    S: NotificationSource,
    W: TopicTreeWalker,
{
    let (commands_tx, commands) = mpsc::unbounded_channel();
    let (failures_tx, failures) = mpsc::unbounded_channel();
    let (finished_tx, finished) = watch::channel(false);
    let closing = Arc::new(AtomicBool::new(false));

    let span = tracing::info_span!("walk", walk_id = %config.walk_id, root = %config.root_path);
    let walk_loop = WalkLoop {
        config: config.clone(),
        walker,
        tree: TopicTree::new(),
        commands_tx: commands_tx.clone(),
        commands,
        failures_tx,
        failures,
        selections: None,
        closing: closing.clone(),
    };

    tokio::spawn(
        async move {
            walk_loop.run(source).await;
            let _ = finished_tx.send(true);
        }
        .instrument(span),
    );

    WalkHandle {
        walk_id: config.walk_id,
        commands: commands_tx,
        closing,
        finished,
    }
}

/// Handle to a running walk.
///
/// Dropping the handle closes the walk.
pub struct WalkHandle {
    walk_id: String,
    commands: mpsc::UnboundedSender<Command>,
    closing: Arc<AtomicBool>,
    finished: watch::Receiver<bool>,
}

impl WalkHandle {
    /// Request teardown. Idempotent and non-blocking.
    ///
    /// The walker receives removals for every materialized node, deepest
    /// first, followed by `on_close`.
    pub fn close(&self) {
        if self.closing.swap(true, Ordering::SeqCst) {
            return;
        }
        if self.commands.send(Command::Close).is_err() {
            debug!(walk_id = %self.walk_id, "walk already finished");
        }
    }

    /// Check if the walk is closing or has finished.
    pub fn is_closed(&self) -> bool {
        self.closing.load(Ordering::SeqCst) || *self.finished.borrow()
    }

    /// Wait until the walk loop has finished and `on_close` has been called.
    pub async fn closed(&self) {
        let mut finished = self.finished.clone();
        // An error means the loop task is gone, which is also finished.
        let _ = finished.wait_for(|done| *done).await;
    }

    /// Copy the current materialized tree.
    pub async fn snapshot(&self) -> Result<TreeSnapshot, WalkError> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(Command::Snapshot(tx))
            .map_err(|_| WalkError::Closed)?;
        rx.await.map_err(|_| WalkError::Closed)
    }

    pub fn walk_id(&self) -> &str {
        &self.walk_id
    }
}

impl Drop for WalkHandle {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for WalkHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalkHandle")
            .field("walk_id", &self.walk_id)
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// State owned by the walk task.
struct WalkLoop<W> {
    config: WalkConfig,
    walker: W,
    tree: TopicTree,
    commands_tx: mpsc::UnboundedSender<Command>,
    commands: mpsc::UnboundedReceiver<Command>,
    failures_tx: mpsc::UnboundedSender<WalkError>,
    failures: mpsc::UnboundedReceiver<WalkError>,
    /// Queue of the selection worker, present once registered.
    selections: Option<mpsc::UnboundedSender<SelectionRequest>>,
    closing: Arc<AtomicBool>,
}

impl<W: TopicTreeWalker> WalkLoop<W> {
    async fn run<S: NotificationSource>(mut self, source: S) {
        let (listener, mut events) = NotificationListener::channel();

        let registered = tokio::select! {
            result = source.register(listener) => Some(result),
            _ = wait_for_close(&mut self.commands) => None,
        };

        let registration = match registered {
            Some(Ok(registration)) => Arc::new(registration),
            Some(Err(e)) => {
                warn!(error = %e, "registration failed");
                self.fail(WalkError::Registration(e));
                return;
            }
            None => {
                info!("walk closed before registration completed");
                self.finish(CloseReason::Closed);
                return;
            }
        };

        info!("walk registered");
        self.selections = Some(spawn_selection_worker(
            registration.clone(),
            self.failures_tx.clone(),
        ));
        self.dispatch_selection(self.config.root_path.clone(), true);

        let reason = loop {
            tokio::select! {
                biased;

                Some(error) = self.failures.recv() => {
                    self.fail(error);
                    break CloseReason::Failed;
                }
                command = self.commands.recv() => match command {
                    Some(Command::SelectDescendants { id, path, enable }) => {
                        self.select_descendants(id, &path, enable);
                    }
                    Some(Command::Snapshot(reply)) => {
                        let _ = reply.send(TreeSnapshot::of(&self.tree));
                    }
                    Some(Command::Close) | None => {
                        let reason = CloseReason::Closed;
                        self.finish(reason);
                        break reason;
                    }
                },
                event = events.recv() => match event {
                    Some(SourceEvent::Topic(notification)) => {
                        let effects = self.tree.on_topic_notification(notification);
                        self.apply(effects);
                    }
                    Some(SourceEvent::Descendant(notification)) => {
                        let effects = self.tree.on_descendant_notification(&notification);
                        self.apply(effects);
                    }
                    Some(SourceEvent::Closed) | None => {
                        info!("source closed the registration");
                        let reason = CloseReason::SourceClosed;
                        self.finish(reason);
                        break reason;
                    }
                },
            }
        };

        // The worker drains what is already queued, then stops.
        self.selections = None;
        if reason != CloseReason::SourceClosed {
            if let Err(e) = registration.close().await {
                debug!(error = %e, "closing registration failed");
            }
        }
    }

    fn select_descendants(&mut self, id: NodeId, path: &str, enable: bool) {
        if self.tree.node_id(path) != Some(id) {
            debug!(path, %id, "ignoring request from stale node handle");
            return;
        }
        let effects = self.tree.select_descendants(path, enable);
        debug!(path, enable, requests = effects.len(), "select_descendants");
        self.apply(effects);
    }

    fn apply(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Select(path) => self.dispatch_selection(path, true),
                Effect::Deselect(path) => self.dispatch_selection(path, false),
                Effect::NodeAdded {
                    id,
                    path,
                    specification,
                } => {
                    let node = self.handle(id, &path);
                    self.walker.on_node_added(&node, &specification);
                }
                Effect::NodeRemoved { id, path } => {
                    let node = self.handle(id, &path);
                    self.walker.on_node_removed(&node);
                }
            }
        }
    }

    /// Queue a select or deselect without waiting for the outcome.
    fn dispatch_selection(&self, path: String, select: bool) {
        tracing::trace!(path = %path, select, "selection queued");
        let queued = self
            .selections
            .as_ref()
            .map_or(false, |queue| queue.send(SelectionRequest { path, select }).is_ok());
        if !queued {
            debug!(select, "selection worker gone, request dropped");
        }
    }

    fn handle(&self, id: NodeId, path: &str) -> NodeHandle {
        NodeHandle::new(id, path, self.commands_tx.clone())
    }

    /// Tear down with removal notifications, then report the close.
    fn finish(&mut self, reason: CloseReason) {
        self.closing.store(true, Ordering::SeqCst);
        let effects = self.tree.close();
        let removed = effects.len();
        for effect in effects {
            if let Effect::NodeRemoved { id, path } = effect {
                let node = self.handle(id, &path);
                self.walker.on_node_removed(&node);
            }
        }
        info!(removed, ?reason, "walk closed");
        self.walker.on_close(reason);
    }

    /// Report a failure and close without further node events.
    fn fail(&mut self, error: WalkError) {
        self.closing.store(true, Ordering::SeqCst);
        let discarded = self.tree.abandon();
        warn!(error = %error, discarded, "walk failed");
        self.walker.on_error(&error);
        self.walker.on_close(CloseReason::Failed);
    }
}

/// Spawn the task that issues selection requests to the source in order.
///
/// Each request is awaited before the next one starts. The task ends once
/// the queue's sender is dropped and the queue is drained.
fn spawn_selection_worker<R: Registration>(
    registration: Arc<R>,
    failures: mpsc::UnboundedSender<WalkError>,
) -> mpsc::UnboundedSender<SelectionRequest> {
    let (tx, mut rx) = mpsc::unbounded_channel::<SelectionRequest>();

    tokio::spawn(
        async move {
            while let Some(SelectionRequest { path, select }) = rx.recv().await {
                let request = if select {
                    registration.select(&path)
                } else {
                    registration.deselect(&path)
                };
                if let Err(source) = request.await {
                    tracing::error!(path = %path, select, error = %source, "selection request failed");
                    if failures.send(WalkError::Selection { path, source }).is_err() {
                        break;
                    }
                }
            }
        }
        .in_current_span(),
    );

    tx
}

/// Drain commands until a close is requested, answering snapshots with an
/// empty tree.
async fn wait_for_close(commands: &mut mpsc::UnboundedReceiver<Command>) {
    while let Some(command) = commands.recv().await {
        match command {
            Command::Close => return,
            Command::Snapshot(reply) => {
                let _ = reply.send(TreeSnapshot::default());
            }
            Command::SelectDescendants { path, .. } => {
                debug!(path = %path, "no nodes before registration, ignoring");
            }
        }
    }
}
