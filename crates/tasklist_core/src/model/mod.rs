//! Domain model for the task list.
//!
//! # Invariants
//! - Every task is identified by a stable `TaskId`.
//! - Deletion is a hard delete; removed tasks are never resurrected.

pub mod task;
