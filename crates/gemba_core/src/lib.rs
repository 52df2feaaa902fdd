//! Core state and synchronization for the gemba dashboard.
//! This crate is the single source of truth for document invariants.

pub mod config;
pub mod logging;
pub mod model;
pub mod service;
pub mod store;
pub mod sync;

pub use config::{BackendKind, ConfigError, DashboardConfig, RemoteSlotConfig};
pub use logging::{default_log_level, init_logging, init_logging_from_config, logging_status};
pub use model::document::{
    Category, CategoryId, DashboardDocument, DocumentValidationError, Topic, TopicId, Update,
    UpdateId,
};
pub use model::seed::seed_document;
pub use service::dashboard_controller::{
    ConnectionStatus, ControllerInitError, DashboardController, StatusError, ValidationRejection,
};
pub use store::local_store::{
    LocalStore, LocalStoreError, LocalStoreResult, SqliteLocalStore, DEFAULT_STORAGE_KEY,
};
pub use sync::memory_remote::InMemoryRemoteStore;
pub use sync::remote_adapter::{
    PublishError, RemoteSnapshot, RemoteSyncAdapter, SubscriptionHandle, SubscriptionState,
};
pub use sync::remote_store::{
    RemoteDocumentStore, RemoteError, RemoteErrorKind, SlotRef, WatchEvent, WatchId, WatchSink,
    WriteCallback,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
