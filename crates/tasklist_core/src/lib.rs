//! Core domain logic for the task list.
//! This crate is the single source of truth for task persistence and the
//! projection rendered by presentation code.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use logging::{default_log_level, init_logging, logging_status};
pub use model::task::{Task, TaskId, TaskValidationError};
pub use repo::task_store::{SqliteTaskStore, StoreError, StoreResult, TaskOrder, TaskStore};
pub use service::task_repository::{TaskRepoError, TaskRepoResult, TaskRepository};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
