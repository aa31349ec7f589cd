//! Task domain model.
//!
//! # Responsibility
//! - Define the single persisted record rendered by the task list.
//! - Enforce the title invariant before any storage write.
//!
//! # Invariants
//! - `id` is stable and never reused for another task.
//! - `title` is non-empty after trimming and never changes after creation.
//! - `is_done` starts as `false`.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier assigned to a task at creation.
///
/// All lookups, updates and deletes go through this value, never the title.
pub type TaskId = Uuid;

/// Validation errors for task construction and persisted rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskValidationError {
    /// Title is empty or whitespace-only.
    EmptyTitle,
}

impl Display for TaskValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyTitle => write!(f, "task title must not be empty"),
        }
    }
}

impl Error for TaskValidationError {}

/// One titled, completable task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    pub is_done: bool,
}

impl Task {
    /// Creates a pending task with a freshly generated id.
    ///
    /// # Errors
    /// - Returns [`TaskValidationError::EmptyTitle`] for blank titles.
    pub fn new(title: impl Into<String>) -> Result<Self, TaskValidationError> {
        Self::with_id(Uuid::new_v4(), title, false)
    }

    /// Rebuilds a task whose identity already exists (storage reads).
    pub fn with_id(
        id: TaskId,
        title: impl Into<String>,
        is_done: bool,
    ) -> Result<Self, TaskValidationError> {
        let task = Self {
            id,
            title: title.into(),
            is_done,
        };
        task.validate()?;
        Ok(task)
    }

    /// Checks the title invariant.
    pub fn validate(&self) -> Result<(), TaskValidationError> {
        if self.title.trim().is_empty() {
            return Err(TaskValidationError::EmptyTitle);
        }
        Ok(())
    }

    /// Returns a copy with `is_done` flipped. Identity and title are kept.
    pub fn toggled(&self) -> Self {
        Self {
            is_done: !self.is_done,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Task, TaskValidationError};

    #[test]
    fn new_task_starts_pending_with_unique_id() {
        let first = Task::new("write report").unwrap();
        let second = Task::new("write report").unwrap();
        assert!(!first.is_done);
        assert_ne!(first.id, second.id);
    }

    #[test]
    fn blank_title_is_rejected() {
        assert_eq!(Task::new("").unwrap_err(), TaskValidationError::EmptyTitle);
        assert_eq!(
            Task::new(" \t\n").unwrap_err(),
            TaskValidationError::EmptyTitle
        );
    }

    #[test]
    fn toggled_keeps_identity() {
        let task = Task::new("buy milk").unwrap();
        let done = task.toggled();
        assert_eq!(done.id, task.id);
        assert_eq!(done.title, task.title);
        assert!(done.is_done);
        assert_eq!(done.toggled(), task);
    }
}
