//! Durable task storage.
//!
//! # Responsibility
//! - Define the `TaskStore` contract the repository is built on.
//! - Isolate SQLite query details from projection bookkeeping.
//!
//! # Invariants
//! - Store APIs return semantic errors (`NotFound`) in addition to DB
//!   transport errors.

pub mod task_store;
