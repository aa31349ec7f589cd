//! Task repository: the single authority over persisted tasks and the
//! in-memory projection rendered by the list view.
//!
//! # Responsibility
//! - Own the injected durable store and the ordered projection.
//! - Route every mutation through the store before mirroring it in memory.
//!
//! # Invariants
//! - The projection changes only after the store confirms the write.
//! - After every successful operation the projection matches what a fresh
//!   `load_all` would return, up to the position of newly added tasks.
//! - A failed operation leaves the projection exactly as it was.
//! - Every store failure is returned to the caller; none is only logged.

use crate::model::task::{Task, TaskId, TaskValidationError};
use crate::repo::task_store::{SqliteTaskStore, StoreError, TaskOrder, TaskStore};
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;
use std::time::Instant;

pub type TaskRepoResult<T> = Result<T, TaskRepoError>;

/// Errors surfaced by [`TaskRepository`] operations.
#[derive(Debug)]
pub enum TaskRepoError {
    /// Input rejected before touching the store.
    Validation(TaskValidationError),
    /// Target id is absent from the projection or the store.
    NotFound(TaskId),
    /// A durable write, delete or commit failed.
    Persistence(StoreError),
    /// The store could not be opened or read.
    StoreUnavailable(StoreError),
}

impl TaskRepoError {
    /// Stable short code for logs and FFI envelopes.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::NotFound(_) => "not_found",
            Self::Persistence(_) => "persistence_error",
            Self::StoreUnavailable(_) => "store_unavailable",
        }
    }
}

impl Display for TaskRepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "task not found: {id}"),
            Self::Persistence(err) => write!(f, "failed to persist task change: {err}"),
            Self::StoreUnavailable(err) => write!(f, "task store unavailable: {err}"),
        }
    }
}

impl Error for TaskRepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::NotFound(_) => None,
            Self::Persistence(err) | Self::StoreUnavailable(err) => Some(err),
        }
    }
}

impl From<TaskValidationError> for TaskRepoError {
    fn from(value: TaskValidationError) -> Self {
        Self::Validation(value)
    }
}

/// Maps a failed store write, keeping semantic not-found distinct.
fn write_error(err: StoreError) -> TaskRepoError {
    match err {
        StoreError::NotFound(id) => TaskRepoError::NotFound(id),
        other => TaskRepoError::Persistence(other),
    }
}

/// Projection owner mediating every task mutation through a [`TaskStore`].
pub struct TaskRepository<S: TaskStore> {
    store: S,
    tasks: Vec<Task>,
}

impl TaskRepository<SqliteTaskStore> {
    /// Opens a SQLite-backed repository at `path`. The projection starts empty
    /// until [`TaskRepository::load_all`] is called.
    pub fn open(path: impl AsRef<Path>) -> TaskRepoResult<Self> {
        let store = SqliteTaskStore::open(path).map_err(TaskRepoError::StoreUnavailable)?;
        Ok(Self::new(store))
    }

    /// Opens a repository over an ephemeral in-memory database.
    pub fn open_in_memory() -> TaskRepoResult<Self> {
        let store = SqliteTaskStore::open_in_memory().map_err(TaskRepoError::StoreUnavailable)?;
        Ok(Self::new(store))
    }
}

impl<S: TaskStore> TaskRepository<S> {
    /// Creates a repository over an already opened store.
    pub fn new(store: S) -> Self {
        Self {
            store,
            tasks: Vec::new(),
        }
    }

    /// Current projection, in display order.
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Looks up a task in the projection by id.
    pub fn get(&self, id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == id)
    }

    /// Resolves a row index of the current projection to its task id.
    pub fn id_at(&self, index: usize) -> Option<TaskId> {
        self.tasks.get(index).map(|task| task.id)
    }

    /// Gives back the owned store.
    pub fn into_store(self) -> S {
        self.store
    }

    /// Replaces the projection with every persisted task, title descending.
    ///
    /// # Errors
    /// - `StoreUnavailable` when the store cannot be read; the projection is
    ///   left untouched.
    pub fn load_all(&mut self) -> TaskRepoResult<&[Task]> {
        let started_at = Instant::now();
        let loaded = match self.store.fetch_all(TaskOrder::TitleDescending) {
            Ok(loaded) => loaded,
            Err(err) => {
                warn!(
                    "event=task_load module=service status=error duration_ms={} error={}",
                    started_at.elapsed().as_millis(),
                    err
                );
                return Err(TaskRepoError::StoreUnavailable(err));
            }
        };

        self.tasks = loaded;
        info!(
            "event=task_load module=service status=ok count={} duration_ms={}",
            self.tasks.len(),
            started_at.elapsed().as_millis()
        );
        Ok(self.tasks.as_slice())
    }

    /// Creates, persists and appends a new pending task.
    ///
    /// # Errors
    /// - `Validation` for a blank title.
    /// - `Persistence` when the insert fails; nothing is appended.
    pub fn add_task(&mut self, title: &str) -> TaskRepoResult<Task> {
        let task = Task::new(title)?;

        if let Err(err) = self.store.insert(&task) {
            warn!("event=task_add module=service status=error error={err}");
            return Err(TaskRepoError::Persistence(err));
        }

        self.tasks.push(task.clone());
        info!(
            "event=task_add module=service status=ok task_id={} count={}",
            task.id,
            self.tasks.len()
        );
        Ok(task)
    }

    /// Flips `is_done` of one task, keeping its position in the projection.
    ///
    /// # Errors
    /// - `NotFound` when `id` is not in the projection or no longer stored.
    /// - `Persistence` when the update fails; the in-memory value is kept.
    pub fn toggle_done(&mut self, id: TaskId) -> TaskRepoResult<Task> {
        let index = self.position_of(id)?;
        let toggled = self.tasks[index].toggled();

        if let Err(err) = self.store.set_done(id, toggled.is_done) {
            warn!("event=task_toggle module=service status=error task_id={id} error={err}");
            return Err(write_error(err));
        }

        self.tasks[index] = toggled.clone();
        info!(
            "event=task_toggle module=service status=ok task_id={id} is_done={}",
            toggled.is_done
        );
        Ok(toggled)
    }

    /// Deletes one task, preserving the relative order of the rest.
    ///
    /// # Errors
    /// - `NotFound` when `id` is not in the projection or no longer stored.
    /// - `Persistence` when the delete fails; the projection is unchanged.
    pub fn remove_task(&mut self, id: TaskId) -> TaskRepoResult<()> {
        let index = self.position_of(id)?;

        if let Err(err) = self.store.delete(id) {
            warn!("event=task_remove module=service status=error task_id={id} error={err}");
            return Err(write_error(err));
        }

        self.tasks.remove(index);
        info!(
            "event=task_remove module=service status=ok task_id={id} count={}",
            self.tasks.len()
        );
        Ok(())
    }

    /// Deletes every task and returns how many rows were removed.
    ///
    /// An empty store is a no-op returning `0`.
    ///
    /// # Errors
    /// - `Persistence` when the batch delete cannot be committed; the
    ///   projection keeps its pre-call contents.
    pub fn clear_all(&mut self) -> TaskRepoResult<usize> {
        let removed = match self.store.delete_all() {
            Ok(removed) => removed,
            Err(err) => {
                warn!("event=task_clear module=service status=error error={err}");
                return Err(TaskRepoError::Persistence(err));
            }
        };

        self.tasks.clear();
        info!("event=task_clear module=service status=ok removed={removed}");
        Ok(removed)
    }

    fn position_of(&self, id: TaskId) -> TaskRepoResult<usize> {
        self.tasks
            .iter()
            .position(|task| task.id == id)
            .ok_or(TaskRepoError::NotFound(id))
    }
}

#[cfg(test)]
mod tests {
    use super::{TaskRepoError, TaskRepository};

    #[test]
    fn error_codes_are_stable() {
        let missing = TaskRepoError::NotFound(uuid::Uuid::nil());
        assert_eq!(missing.code(), "not_found");
        assert!(missing.to_string().contains("task not found"));
    }

    #[test]
    fn id_at_follows_projection_order() {
        let mut repo = TaskRepository::open_in_memory().unwrap();
        let first = repo.add_task("first").unwrap();
        let second = repo.add_task("second").unwrap();

        assert_eq!(repo.id_at(0), Some(first.id));
        assert_eq!(repo.id_at(1), Some(second.id));
        assert_eq!(repo.id_at(2), None);
        assert_eq!(repo.get(second.id).map(|task| task.title.as_str()), Some("second"));
    }
}
