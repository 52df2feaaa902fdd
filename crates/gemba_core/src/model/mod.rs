//! Dashboard document model.
//!
//! # Responsibility
//! - Define the nested category/topic/update schema.
//! - Provide pure mutation operations and the built-in seed document.
//!
//! # Invariants
//! - Model code performs no I/O.
//! - Every mutation returns a new document value.

pub mod document;
pub mod mutations;
pub mod seed;
