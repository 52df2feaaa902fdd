//! Remote document synchronization.
//!
//! # Responsibility
//! - Describe the capabilities required from a remote document database.
//! - Wrap one remote slot in a subscription state machine and a publish path.
//!
//! # Invariants
//! - Every remote write is a full-document replace (last writer wins).
//! - Inbound snapshots are delivered in store order, self-originated echoes included.

pub mod memory_remote;
pub mod remote_adapter;
pub mod remote_store;
