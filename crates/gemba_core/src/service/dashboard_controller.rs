//! Dashboard controller.
//!
//! # Responsibility
//! - Own the authoritative in-memory document and the selection state.
//! - Validate intents, apply them optimistically, and hand the result to the
//!   active persistence backend.
//! - Drain inbound sync messages in arrival order.
//!
//! # Invariants
//! - Adapter failures become status fields; no entry point returns them.
//! - Every committed document passes `DashboardDocument::validate()`.
//! - Remote intents are rejected until the current connection delivered its
//!   first snapshot, so the placeholder seed is never published over real data.
//! - Inbound snapshots replace the whole document, without merging.
//! - Switching category always clears the selected topic.
//! - The seed is published at most once per `connect()`.

use crate::config::{BackendKind, ConfigError, DashboardConfig};
use crate::model::document::{
    CategoryId, DashboardDocument, DocumentValidationError, Topic, TopicId, Update, UpdateId,
};
use crate::model::mutations;
use crate::model::seed::seed_document;
use crate::store::local_store::{LocalStore, LocalStoreError, SqliteLocalStore};
use crate::sync::remote_adapter::{
    PublishError, RemoteSnapshot, RemoteSyncAdapter, SubscriptionHandle, SubscriptionState,
};
use crate::sync::remote_store::{RemoteDocumentStore, RemoteError};
use log::{debug, error, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;

/// Connection indicator shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Connected,
    Disconnected,
}

/// Error surfaced through `last_error`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusError {
    /// Subscription could not be established or died. Persists until reconnect.
    RemoteConnection(RemoteError),
    /// One publish failed. Dismissible.
    Publish(PublishError),
    /// One local save failed. Dismissible.
    LocalSave(String),
}

impl StatusError {
    pub fn is_dismissible(&self) -> bool {
        !matches!(self, Self::RemoteConnection(_))
    }
}

impl Display for StatusError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RemoteConnection(err) => write!(f, "offline: {err}"),
            Self::Publish(err) => write!(f, "{err}"),
            Self::LocalSave(message) => write!(f, "local save failed: {message}"),
        }
    }
}

impl Error for StatusError {}

/// Intent rejected before reaching the document model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationRejection {
    /// Topic title is blank after trim.
    EmptyTopicTitle,
    /// Both update title and text are blank after trim.
    EmptyUpdate,
    /// The target topic is not in the category.
    TopicNotFound(TopicId),
    /// The resulting document would break a structural invariant.
    InvalidDocument(DocumentValidationError),
    /// Remote backend has not received a snapshot on this connection yet.
    AwaitingSnapshot,
}

impl Display for ValidationRejection {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyTopicTitle => write!(f, "topic title must not be blank"),
            Self::EmptyUpdate => write!(f, "update needs a title or text"),
            Self::TopicNotFound(id) => write!(f, "topic not found: {id}"),
            Self::InvalidDocument(err) => write!(f, "change rejected: {err}"),
            Self::AwaitingSnapshot => write!(f, "waiting for the shared dashboard to load"),
        }
    }
}

impl Error for ValidationRejection {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidDocument(err) => Some(err),
            _ => None,
        }
    }
}

/// Failure to build a controller from configuration.
#[derive(Debug)]
pub enum ControllerInitError {
    Config(ConfigError),
    LocalStore(LocalStoreError),
    /// `backend = remote` without a remote store to talk to.
    MissingRemoteStore,
}

impl Display for ControllerInitError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(err) => write!(f, "{err}"),
            Self::LocalStore(err) => write!(f, "{err}"),
            Self::MissingRemoteStore => {
                write!(f, "remote backend selected but no remote store given")
            }
        }
    }
}

impl Error for ControllerInitError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(err) => Some(err),
            Self::LocalStore(err) => Some(err),
            Self::MissingRemoteStore => None,
        }
    }
}

impl From<ConfigError> for ControllerInitError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<LocalStoreError> for ControllerInitError {
    fn from(value: LocalStoreError) -> Self {
        Self::LocalStore(value)
    }
}

#[derive(Debug)]
enum Inbound {
    Snapshot {
        generation: u64,
        snapshot: RemoteSnapshot,
    },
    ConnectionFailed {
        generation: u64,
        error: RemoteError,
    },
    PublishFinished(Result<(), PublishError>),
}

struct RemoteBackend {
    adapter: RemoteSyncAdapter,
    subscription: Option<SubscriptionHandle>,
    generation: u64,
    first_snapshot_seen: bool,
    seed_published: bool,
    inbox_tx: Sender<Inbound>,
    inbox_rx: Receiver<Inbound>,
}

impl RemoteBackend {
    fn publish(&self, document: &DashboardDocument) {
        let outcome_tx = self.inbox_tx.clone();
        self.adapter.publish(document, move |result| {
            let _ = outcome_tx.send(Inbound::PublishFinished(result));
        });
    }
}

enum Backend {
    Local(Box<dyn LocalStore>),
    Remote(RemoteBackend),
}

/// Single owner of dashboard state for one client.
pub struct DashboardController {
    document: DashboardDocument,
    active_category: CategoryId,
    active_topic: Option<TopicId>,
    edit_mode: bool,
    connection_status: ConnectionStatus,
    last_error: Option<StatusError>,
    backend: Backend,
}

impl DashboardController {
    /// Local-only controller. Loads the stored document or falls back to the seed.
    pub fn with_local_store(store: Box<dyn LocalStore>) -> Self {
        let document = match store.load() {
            Some(document) => {
                info!("event=controller_init module=service status=ok backend=local source=stored");
                document
            }
            None => {
                info!("event=controller_init module=service status=ok backend=local source=seed");
                seed_document()
            }
        };
        Self::from_parts(document, Backend::Local(store))
    }

    /// Remote-synced controller. Starts from the seed until the first
    /// snapshot arrives; call [`connect`](Self::connect) to subscribe.
    pub fn with_remote_sync(adapter: RemoteSyncAdapter) -> Self {
        info!(
            "event=controller_init module=service status=ok backend=remote slot={}",
            adapter.slot()
        );
        let (inbox_tx, inbox_rx) = channel();
        Self::from_parts(
            seed_document(),
            Backend::Remote(RemoteBackend {
                adapter,
                subscription: None,
                generation: 0,
                first_snapshot_seen: false,
                seed_published: false,
                inbox_tx,
                inbox_rx,
            }),
        )
    }

    /// Builds a controller for `config`; remote backends connect immediately.
    pub fn from_config(
        config: &DashboardConfig,
        remote_store: Option<Arc<dyn RemoteDocumentStore>>,
    ) -> Result<Self, ControllerInitError> {
        config.validate()?;
        match config.backend {
            BackendKind::Local => {
                let store = match &config.database_path {
                    Some(path) => SqliteLocalStore::open(path, config.storage_key.as_str())?,
                    None => SqliteLocalStore::open_in_memory(config.storage_key.as_str())?,
                };
                Ok(Self::with_local_store(Box::new(store)))
            }
            BackendKind::Remote => {
                let store = remote_store.ok_or(ControllerInitError::MissingRemoteStore)?;
                let adapter = RemoteSyncAdapter::new(store, config.remote.slot());
                let mut controller = Self::with_remote_sync(adapter);
                controller.connect();
                Ok(controller)
            }
        }
    }

    fn from_parts(document: DashboardDocument, backend: Backend) -> Self {
        Self {
            document,
            active_category: CategoryId::Rtb,
            active_topic: None,
            edit_mode: false,
            connection_status: ConnectionStatus::Disconnected,
            last_error: None,
            backend,
        }
    }

    pub fn document(&self) -> &DashboardDocument {
        &self.document
    }

    pub fn active_category(&self) -> CategoryId {
        self.active_category
    }

    pub fn active_topic_id(&self) -> Option<&str> {
        self.active_topic.as_deref()
    }

    /// Selected topic, if it still exists in the active category.
    pub fn active_topic(&self) -> Option<&Topic> {
        let topic_id = self.active_topic.as_deref()?;
        self.document.find_topic(self.active_category, topic_id)
    }

    /// Topics of the active category in display order.
    pub fn current_topics(&self) -> &[Topic] {
        &self.document.category(self.active_category).topics
    }

    /// Always `Disconnected` for the local backend.
    pub fn connection_status(&self) -> ConnectionStatus {
        self.connection_status
    }

    pub fn last_error(&self) -> Option<&StatusError> {
        self.last_error.as_ref()
    }

    /// Clears a dismissible error. Connection errors stay until reconnect.
    pub fn dismiss_error(&mut self) {
        if self.last_error.as_ref().is_some_and(StatusError::is_dismissible) {
            self.last_error = None;
        }
    }

    pub fn backend_kind(&self) -> BackendKind {
        match self.backend {
            Backend::Local(_) => BackendKind::Local,
            Backend::Remote(_) => BackendKind::Remote,
        }
    }

    /// Adapter-level subscription state; `None` for the local backend.
    pub fn subscription_state(&self) -> Option<SubscriptionState> {
        match &self.backend {
            Backend::Local(_) => None,
            Backend::Remote(remote) => Some(
                remote
                    .subscription
                    .as_ref()
                    .map_or(SubscriptionState::Disconnected, SubscriptionHandle::state),
            ),
        }
    }

    pub fn edit_mode(&self) -> bool {
        self.edit_mode
    }

    pub fn toggle_edit_mode(&mut self) {
        self.edit_mode = !self.edit_mode;
    }

    /// Switches category and clears the topic selection.
    pub fn select_category(&mut self, category: CategoryId) {
        self.active_category = category;
        self.active_topic = None;
    }

    /// Selects a topic of the active category. Not validated.
    pub fn select_topic(&mut self, topic_id: Option<TopicId>) {
        self.active_topic = topic_id;
    }

    pub fn add_topic(
        &mut self,
        category: CategoryId,
        title: &str,
    ) -> Result<TopicId, ValidationRejection> {
        let title = title.trim();
        if title.is_empty() {
            return Err(reject("add_topic", ValidationRejection::EmptyTopicTitle));
        }
        let (next, topic_id) = mutations::add_topic(&self.document, category, title);
        self.commit(next, "add_topic")?;
        Ok(topic_id)
    }

    /// Removes a topic; clears the selection when it was selected.
    pub fn delete_topic(
        &mut self,
        category: CategoryId,
        topic_id: &str,
    ) -> Result<(), ValidationRejection> {
        let next = mutations::delete_topic(&self.document, category, topic_id);
        self.commit(next, "delete_topic")?;
        if self.active_topic.as_deref() == Some(topic_id) {
            self.active_topic = None;
        }
        Ok(())
    }

    pub fn add_update(
        &mut self,
        category: CategoryId,
        topic_id: &str,
        title: &str,
        text: &str,
    ) -> Result<UpdateId, ValidationRejection> {
        let (title, text) = normalize_update("add_update", title, text)?;
        let (next, update_id) =
            mutations::add_update(&self.document, category, topic_id, title, text);
        let update_id = update_id.ok_or_else(|| {
            reject(
                "add_update",
                ValidationRejection::TopicNotFound(topic_id.to_string()),
            )
        })?;
        self.commit(next, "add_update")?;
        Ok(update_id)
    }

    pub fn edit_update(
        &mut self,
        category: CategoryId,
        topic_id: &str,
        update_id: &str,
        title: &str,
        text: &str,
    ) -> Result<(), ValidationRejection> {
        let (title, text) = normalize_update("edit_update", title, text)?;
        let next =
            mutations::edit_update(&self.document, category, topic_id, update_id, title, text);
        self.commit(next, "edit_update")
    }

    pub fn delete_update(
        &mut self,
        category: CategoryId,
        topic_id: &str,
        update_id: &str,
    ) -> Result<(), ValidationRejection> {
        let next = mutations::delete_update(&self.document, category, topic_id, update_id);
        self.commit(next, "delete_update")
    }

    /// Stores `new_order` as the topic's update sequence.
    ///
    /// Sequences with duplicate or blank update ids are rejected.
    pub fn reorder_updates(
        &mut self,
        category: CategoryId,
        topic_id: &str,
        new_order: Vec<Update>,
    ) -> Result<(), ValidationRejection> {
        let next = mutations::reorder_updates(&self.document, category, topic_id, new_order);
        self.commit(next, "reorder_updates")
    }

    /// Applies a drag gesture from index `from` to index `to`.
    ///
    /// Returns `Ok(false)` when the topic is missing or the move is a no-op.
    pub fn move_update(
        &mut self,
        category: CategoryId,
        topic_id: &str,
        from: usize,
        to: usize,
    ) -> Result<bool, ValidationRejection> {
        let new_order = self
            .document
            .find_topic(category, topic_id)
            .and_then(|topic| mutations::moved_order(&topic.updates, from, to));
        match new_order {
            Some(new_order) => {
                self.reorder_updates(category, topic_id, new_order)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Opens (or reopens) the remote subscription. No-op for local backends.
    pub fn connect(&mut self) {
        let Backend::Remote(remote) = &mut self.backend else {
            debug!("event=controller_connect module=service status=skipped backend=local");
            return;
        };

        if let Some(mut previous) = remote.subscription.take() {
            previous.disconnect();
        }
        remote.generation += 1;
        remote.first_snapshot_seen = false;
        remote.seed_published = false;

        let generation = remote.generation;
        let snapshot_tx = remote.inbox_tx.clone();
        let error_tx = remote.inbox_tx.clone();
        let handle = remote.adapter.connect(
            move |snapshot| {
                let _ = snapshot_tx.send(Inbound::Snapshot {
                    generation,
                    snapshot,
                });
            },
            move |error| {
                let _ = error_tx.send(Inbound::ConnectionFailed { generation, error });
            },
        );
        remote.subscription = Some(handle);

        self.connection_status = ConnectionStatus::Disconnected;
        if matches!(self.last_error, Some(StatusError::RemoteConnection(_))) {
            self.last_error = None;
        }
    }

    /// Disconnects the remote subscription. Idempotent.
    pub fn shutdown(&mut self) {
        if let Backend::Remote(remote) = &mut self.backend {
            if let Some(subscription) = remote.subscription.as_mut() {
                if subscription.state() != SubscriptionState::Closed {
                    subscription.disconnect();
                    info!("event=controller_shutdown module=service status=ok");
                }
            }
        }
        self.connection_status = ConnectionStatus::Disconnected;
    }

    /// Handles every queued inbound message in arrival order.
    ///
    /// Returns how many messages were handled.
    pub fn process_inbound(&mut self) -> usize {
        let mut handled = 0;
        loop {
            let message = match &self.backend {
                Backend::Remote(remote) => remote.inbox_rx.try_recv(),
                Backend::Local(_) => break,
            };
            let Ok(message) = message else {
                break;
            };
            self.handle_inbound(message);
            handled += 1;
        }
        handled
    }

    fn handle_inbound(&mut self, message: Inbound) {
        let Backend::Remote(remote) = &mut self.backend else {
            return;
        };

        match message {
            Inbound::Snapshot {
                generation,
                snapshot,
            } => {
                if generation != remote.generation {
                    debug!("event=remote_snapshot module=service status=stale generation={generation}");
                    return;
                }
                let first = !remote.first_snapshot_seen;
                remote.first_snapshot_seen = true;
                self.connection_status = ConnectionStatus::Connected;

                match snapshot {
                    RemoteSnapshot::Document(document) => {
                        self.document = document;
                    }
                    RemoteSnapshot::Empty if first && !remote.seed_published => {
                        remote.seed_published = true;
                        info!("event=remote_seed module=service status=start");
                        remote.publish(&seed_document());
                    }
                    RemoteSnapshot::Empty => {
                        warn!("event=remote_snapshot module=service status=ignored reason=empty_after_bootstrap");
                    }
                }
            }
            Inbound::ConnectionFailed { generation, error } => {
                if generation != remote.generation {
                    return;
                }
                error!(
                    "event=controller_connect module=service status=error error_code={}",
                    error.kind.as_str()
                );
                self.connection_status = ConnectionStatus::Disconnected;
                self.last_error = Some(StatusError::RemoteConnection(error));
            }
            Inbound::PublishFinished(Ok(())) => {}
            Inbound::PublishFinished(Err(error)) => {
                warn!("event=controller_publish module=service status=error error={error}");
                if !matches!(self.last_error, Some(StatusError::RemoteConnection(_))) {
                    self.last_error = Some(StatusError::Publish(error));
                }
            }
        }
    }

    fn commit(
        &mut self,
        next: DashboardDocument,
        intent: &'static str,
    ) -> Result<(), ValidationRejection> {
        if let Backend::Remote(remote) = &self.backend {
            if !remote.first_snapshot_seen {
                return Err(reject(intent, ValidationRejection::AwaitingSnapshot));
            }
        }
        if next == self.document {
            debug!("event=controller_mutation module=service status=noop intent={intent}");
            return Ok(());
        }
        if let Err(err) = next.validate() {
            return Err(reject(intent, ValidationRejection::InvalidDocument(err)));
        }
        self.document = next;
        debug!("event=controller_mutation module=service status=applied intent={intent}");

        match &self.backend {
            Backend::Local(store) => {
                if let Err(err) = store.save(&self.document) {
                    warn!(
                        "event=local_save module=service status=error intent={intent} error={err}"
                    );
                    self.last_error = Some(StatusError::LocalSave(err.to_string()));
                }
            }
            Backend::Remote(remote) => remote.publish(&self.document),
        }
        Ok(())
    }
}

fn reject(intent: &'static str, rejection: ValidationRejection) -> ValidationRejection {
    debug!("event=controller_mutation module=service status=rejected intent={intent} reason={rejection}");
    rejection
}

fn normalize_update<'a>(
    intent: &'static str,
    title: &'a str,
    text: &'a str,
) -> Result<(&'a str, &'a str), ValidationRejection> {
    let (title, text) = (title.trim(), text.trim());
    if title.is_empty() && text.is_empty() {
        return Err(reject(intent, ValidationRejection::EmptyUpdate));
    }
    Ok((title, text))
}
