//! Remote sync adapter for the dashboard document slot.
//!
//! # Responsibility
//! - Turn raw watch events into decoded [`RemoteSnapshot`]s.
//! - Track the per-subscription connection state machine.
//! - Publish full-document snapshots back to the slot.
//!
//! # Invariants
//! - `Error` and `Closed` are terminal; no callback fires after either.
//! - `on_error` fires at most once per subscription.
//! - Self-originated writes are delivered like any other change.

use crate::model::document::DashboardDocument;
use crate::sync::remote_store::{
    RemoteDocumentStore, RemoteError, RemoteErrorKind, SlotRef, WatchEvent, WatchId, WatchSink,
};
use log::{debug, error, info, warn};
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Lifecycle of one subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionState {
    /// No subscription is open. Handles start in `Connecting`; owners
    /// report this while they hold no handle.
    Disconnected,
    Connecting,
    Connected,
    Error,
    Closed,
}

impl SubscriptionState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Error => "error",
            Self::Closed => "closed",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Error | Self::Closed)
    }
}

/// Decoded slot content delivered to subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteSnapshot {
    /// The slot holds no document yet.
    Empty,
    Document(DashboardDocument),
}

/// Failure of one [`RemoteSyncAdapter::publish`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishError {
    /// The document could not be serialized.
    Encode(String),
    /// The store refused or lost the write.
    Remote(RemoteError),
}

impl Display for PublishError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Encode(message) => write!(f, "failed to encode dashboard document: {message}"),
            Self::Remote(err) => write!(f, "publish failed: {err}"),
        }
    }
}

impl Error for PublishError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Encode(_) => None,
            Self::Remote(err) => Some(err),
        }
    }
}

type SnapshotCallback = Box<dyn FnMut(RemoteSnapshot) + Send>;
type ErrorCallback = Box<dyn FnOnce(RemoteError) + Send>;

struct Subscription {
    slot: SlotRef,
    state: SubscriptionState,
    deliveries: u64,
    on_snapshot: Option<SnapshotCallback>,
    on_error: Option<ErrorCallback>,
}

impl Subscription {
    fn handle_event(&mut self, event: WatchEvent) {
        if self.state.is_terminal() {
            debug!(
                "event=remote_event module=sync status=dropped state={} slot={}",
                self.state.as_str(),
                self.slot
            );
            return;
        }

        match event {
            WatchEvent::Changed(content) => match decode_snapshot(content) {
                Ok(snapshot) => self.deliver(snapshot),
                Err(err) => self.fail(err),
            },
            WatchEvent::Failed(err) => self.fail(err),
        }
    }

    fn deliver(&mut self, snapshot: RemoteSnapshot) {
        if self.state == SubscriptionState::Connecting {
            info!(
                "event=remote_connect module=sync status=ok slot={}",
                self.slot
            );
        }
        self.state = SubscriptionState::Connected;
        self.deliveries += 1;
        debug!(
            "event=remote_snapshot module=sync status=ok slot={} empty={} delivery={}",
            self.slot,
            snapshot == RemoteSnapshot::Empty,
            self.deliveries
        );
        if let Some(on_snapshot) = self.on_snapshot.as_mut() {
            on_snapshot(snapshot);
        }
    }

    fn fail(&mut self, err: RemoteError) {
        error!(
            "event=remote_connect module=sync status=error slot={} error_code={} error={}",
            self.slot,
            err.kind.as_str(),
            err.message
        );
        self.state = SubscriptionState::Error;
        self.on_snapshot = None;
        if let Some(on_error) = self.on_error.take() {
            on_error(err);
        }
    }

    fn close(&mut self) -> bool {
        if self.state == SubscriptionState::Closed {
            return false;
        }
        self.state = SubscriptionState::Closed;
        self.on_snapshot = None;
        self.on_error = None;
        true
    }
}

fn decode_snapshot(content: Option<Value>) -> Result<RemoteSnapshot, RemoteError> {
    let value = match content {
        None | Some(Value::Null) => return Ok(RemoteSnapshot::Empty),
        Some(value) => value,
    };
    let document: DashboardDocument = serde_json::from_value(value).map_err(|err| {
        RemoteError::new(
            RemoteErrorKind::InvalidData,
            format!("remote document is unreadable: {err}"),
        )
    })?;
    document.validate().map_err(|err| {
        RemoteError::new(
            RemoteErrorKind::InvalidData,
            format!("remote document is invalid: {err}"),
        )
    })?;
    Ok(RemoteSnapshot::Document(document))
}

fn lock_subscription(subscription: &Mutex<Subscription>) -> MutexGuard<'_, Subscription> {
    subscription.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Adapter bound to one remote slot.
#[derive(Clone)]
pub struct RemoteSyncAdapter {
    store: Arc<dyn RemoteDocumentStore>,
    slot: SlotRef,
}

impl RemoteSyncAdapter {
    pub fn new(store: Arc<dyn RemoteDocumentStore>, slot: SlotRef) -> Self {
        Self { store, slot }
    }

    pub fn slot(&self) -> &SlotRef {
        &self.slot
    }

    /// Opens a standing subscription on the slot.
    ///
    /// Callbacks run while the subscription is locked and must not call back
    /// into the returned handle; they are meant to enqueue work. When the
    /// store refuses the watch, `on_error` runs before this returns.
    pub fn connect<S, E>(&self, on_snapshot: S, on_error: E) -> SubscriptionHandle
    where
        S: FnMut(RemoteSnapshot) + Send + 'static,
        E: FnOnce(RemoteError) + Send + 'static,
    {
        info!(
            "event=remote_connect module=sync status=start slot={}",
            self.slot
        );
        let subscription = Arc::new(Mutex::new(Subscription {
            slot: self.slot.clone(),
            state: SubscriptionState::Connecting,
            deliveries: 0,
            on_snapshot: Some(Box::new(on_snapshot)),
            on_error: Some(Box::new(on_error)),
        }));

        let target = Arc::clone(&subscription);
        let sink: WatchSink = Arc::new(move |event| lock_subscription(&target).handle_event(event));

        let watch_id = match self.store.watch(&self.slot, sink) {
            Ok(watch_id) => Some(watch_id),
            Err(err) => {
                lock_subscription(&subscription).fail(err);
                None
            }
        };

        SubscriptionHandle {
            store: Arc::clone(&self.store),
            subscription,
            watch_id,
        }
    }

    /// Replaces the whole slot with `document`.
    ///
    /// Fire-and-forget: the outcome is reported to `on_outcome` whenever the
    /// store completes the write, possibly before this returns.
    pub fn publish<F>(&self, document: &DashboardDocument, on_outcome: F)
    where
        F: FnOnce(Result<(), PublishError>) + Send + 'static,
    {
        let content = match serde_json::to_value(document) {
            Ok(content) => content,
            Err(err) => {
                warn!(
                    "event=remote_publish module=sync status=error slot={} error_code=encode_failed error={}",
                    self.slot, err
                );
                on_outcome(Err(PublishError::Encode(err.to_string())));
                return;
            }
        };

        debug!(
            "event=remote_publish module=sync status=start slot={}",
            self.slot
        );
        let slot = self.slot.clone();
        self.store.replace(
            &self.slot,
            content,
            Box::new(move |result| {
                match &result {
                    Ok(()) => debug!(
                        "event=remote_publish module=sync status=ok slot={}",
                        slot
                    ),
                    Err(err) => warn!(
                        "event=remote_publish module=sync status=error slot={} error_code={} error={}",
                        slot,
                        err.kind.as_str(),
                        err.message
                    ),
                }
                on_outcome(result.map_err(PublishError::Remote));
            }),
        );
    }
}

/// Owner of one live subscription. Dropping it disconnects.
pub struct SubscriptionHandle {
    store: Arc<dyn RemoteDocumentStore>,
    subscription: Arc<Mutex<Subscription>>,
    watch_id: Option<WatchId>,
}

impl SubscriptionHandle {
    pub fn state(&self) -> SubscriptionState {
        lock_subscription(&self.subscription).state
    }

    /// Number of snapshots delivered so far.
    pub fn deliveries(&self) -> u64 {
        lock_subscription(&self.subscription).deliveries
    }

    /// Stops callbacks and releases the underlying watch. Idempotent.
    pub fn disconnect(&mut self) {
        let closed = lock_subscription(&self.subscription).close();
        if let Some(watch_id) = self.watch_id.take() {
            self.store.unwatch(watch_id);
        }
        if closed {
            info!(
                "event=remote_disconnect module=sync status=ok slot={}",
                lock_subscription(&self.subscription).slot
            );
        }
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        self.disconnect();
    }
}
