//! Local persistence of the whole dashboard document.
//!
//! # Responsibility
//! - Read the persisted document at startup and overwrite it after mutations.
//! - Keep SQL details inside the store boundary.
//!
//! # Invariants
//! - Writes always replace the complete document; there are no partial writes.
//! - Unreadable persisted data degrades to "absent", never to a hard failure.

pub mod local_store;
pub mod slot_db;
