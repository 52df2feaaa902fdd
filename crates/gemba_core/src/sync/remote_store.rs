//! Remote document store capability contract.
//!
//! # Responsibility
//! - Name one addressable remote document and the operations the adapter uses.
//! - Carry transport-level failures as [`RemoteError`].
//!
//! # Invariants
//! - `watch` delivers the current content once right after registration.
//! - `replace` overwrites the whole slot and reports completion exactly once.

use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// Default collection holding the dashboard document.
pub const DEFAULT_COLLECTION: &str = "content";
/// Default document id of the dashboard document.
pub const DEFAULT_DOCUMENT: &str = "dashboard";

/// Address of one remote document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotRef {
    pub collection: String,
    pub document: String,
}

impl SlotRef {
    pub fn new(collection: impl Into<String>, document: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            document: document.into(),
        }
    }

    /// `content/dashboard`.
    pub fn dashboard() -> Self {
        Self::new(DEFAULT_COLLECTION, DEFAULT_DOCUMENT)
    }
}

impl Display for SlotRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.collection, self.document)
    }
}

/// Broad failure class reported by a remote store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteErrorKind {
    /// Network or service unavailable.
    Unavailable,
    /// Credentials or rules refused the operation.
    PermissionDenied,
    /// Remote content could not be decoded as a dashboard document.
    InvalidData,
    Other,
}

impl RemoteErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unavailable => "unavailable",
            Self::PermissionDenied => "permission_denied",
            Self::InvalidData => "invalid_data",
            Self::Other => "other",
        }
    }
}

/// Transport-level error from a remote store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteError {
    pub kind: RemoteErrorKind,
    pub message: String,
}

impl RemoteError {
    pub fn new(kind: RemoteErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::Unavailable, message)
    }

    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::PermissionDenied, message)
    }
}

impl Display for RemoteError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "remote {}: {}", self.kind.as_str(), self.message)
    }
}

impl Error for RemoteError {}

/// Change notification pushed by a store to one watcher.
#[derive(Debug, Clone, PartialEq)]
pub enum WatchEvent {
    /// Current slot content; `None` when the document does not exist.
    Changed(Option<Value>),
    /// The watch died. No further events follow for this watcher.
    Failed(RemoteError),
}

/// Registration token returned by [`RemoteDocumentStore::watch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WatchId(pub u64);

/// Receiver of watch events. May be called from any thread.
pub type WatchSink = Arc<dyn Fn(WatchEvent) + Send + Sync>;

/// Completion callback of one [`RemoteDocumentStore::replace`] call.
pub type WriteCallback = Box<dyn FnOnce(Result<(), RemoteError>) + Send>;

/// Abstract remote document database.
pub trait RemoteDocumentStore: Send + Sync {
    /// Registers a standing subscription on `slot`.
    fn watch(&self, slot: &SlotRef, sink: WatchSink) -> Result<WatchId, RemoteError>;

    /// Releases a subscription. Unknown ids are ignored.
    fn unwatch(&self, watch_id: WatchId);

    /// Replaces the whole content of `slot` and reports the outcome to `done`.
    fn replace(&self, slot: &SlotRef, content: Value, done: WriteCallback);
}
