//! Use-case orchestration.
//!
//! # Responsibility
//! - Expose the mutation and selection API consumed by presentation code.
//! - Keep presentation decoupled from persistence and sync details.

pub mod dashboard_controller;
