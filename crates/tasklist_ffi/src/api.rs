//! FFI use-case API for the Flutter task list screen.
//!
//! # Responsibility
//! - Expose the task repository operations to Dart via FRB.
//! - Hand back the current projection after every call for re-rendering.
//!
//! # Invariants
//! - Exported functions must not panic across FFI boundary.
//! - One repository session per process; every call runs to completion
//!   under the session lock before the next one starts.
//! - If opening the store fails, mutations are refused until a later
//!   `tasks_open` succeeds.

use log::warn;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tasklist_core::{
    core_version as core_version_inner, init_logging as init_logging_inner, ping as ping_inner,
    SqliteTaskStore, Task, TaskId, TaskRepoError, TaskRepository,
};
use uuid::Uuid;

const DB_PATH_ENV: &str = "TASKLIST_DB_PATH";
const DB_FILE_NAME: &str = "tasklist.sqlite3";

type Session = TaskRepository<SqliteTaskStore>;

static SESSION: Mutex<Option<Session>> = Mutex::new(None);

/// Minimal health-check API for FRB smoke integration.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Expose core crate version through FFI.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// Returns an empty string on success and the error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err,
    }
}

/// One rendered list row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskRow {
    /// Stable task ID in string form.
    pub task_id: String,
    pub title: String,
    /// Rows with `is_done` get the "completed" visual treatment.
    pub is_done: bool,
}

/// Response envelope returned by every task list call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskListResponse {
    /// Whether the operation succeeded.
    pub ok: bool,
    /// Current projection after the call, in display order.
    pub items: Vec<TaskRow>,
    /// Human-readable message for diagnostics/UI.
    pub message: String,
    /// `validation_error|not_found|persistence_error|store_unavailable|invalid_argument`
    /// on failure.
    pub error_code: Option<String>,
}

/// Opens the task store and loads the list.
///
/// Path resolution: `db_path`, then `TASKLIST_DB_PATH`, then the temp dir.
#[flutter_rust_bridge::frb(sync)]
pub fn tasks_open(db_path: Option<String>) -> TaskListResponse {
    let path = resolve_db_path(db_path);
    let mut session = lock_session();

    let opened = TaskRepository::open(&path).and_then(|mut repo| {
        repo.load_all()?;
        Ok(repo)
    });
    match opened {
        Ok(repo) => {
            let message = format!("Loaded {} task(s).", repo.len());
            *session = Some(repo);
            respond_ok(&session, message)
        }
        Err(err) => {
            warn!(
                "event=tasks_open module=ffi status=error error_code={}",
                err.code()
            );
            *session = None;
            respond_err(&session, "tasks_open", &err)
        }
    }
}

/// Reloads the list from the store.
#[flutter_rust_bridge::frb(sync)]
pub fn tasks_load() -> TaskListResponse {
    with_session("tasks_load", |repo| {
        let count = repo.load_all()?.len();
        Ok(format!("Loaded {count} task(s)."))
    })
}

/// Adds a task from the "new task" dialog.
#[flutter_rust_bridge::frb(sync)]
pub fn tasks_add(title: String) -> TaskListResponse {
    with_session("tasks_add", |repo| {
        repo.add_task(title.trim())?;
        Ok("Task added.".to_string())
    })
}

/// Toggles completion of one task by id.
#[flutter_rust_bridge::frb(sync)]
pub fn tasks_toggle_done(task_id: String) -> TaskListResponse {
    with_task_id("tasks_toggle_done", &task_id, toggle)
}

/// Deletes one task by id.
#[flutter_rust_bridge::frb(sync)]
pub fn tasks_remove(task_id: String) -> TaskListResponse {
    with_task_id("tasks_remove", &task_id, remove)
}

/// Leading-swipe handler: toggles the task shown at row `index`.
#[flutter_rust_bridge::frb(sync)]
pub fn tasks_toggle_done_at(index: u32) -> TaskListResponse {
    with_session("tasks_toggle_done_at", |repo| {
        let id = row_id(repo, index)?;
        toggle(repo, id)
    })
}

/// Trailing-swipe handler: deletes the task shown at row `index`.
#[flutter_rust_bridge::frb(sync)]
pub fn tasks_remove_at(index: u32) -> TaskListResponse {
    with_session("tasks_remove_at", |repo| {
        let id = row_id(repo, index)?;
        remove(repo, id)
    })
}

/// Deletes every task. Confirmation is the caller's responsibility.
#[flutter_rust_bridge::frb(sync)]
pub fn tasks_clear_all() -> TaskListResponse {
    with_session("tasks_clear_all", |repo| {
        let removed = repo.clear_all()?;
        Ok(format!("Removed {removed} task(s)."))
    })
}

/// Closes the session and releases the store.
#[flutter_rust_bridge::frb(sync)]
pub fn tasks_close() -> TaskListResponse {
    let mut session = lock_session();
    *session = None;
    respond_ok(&session, "Task store closed.".to_string())
}

/// Failure raised inside a session call.
enum CallError {
    Repo(TaskRepoError),
    InvalidArgument(String),
}

impl From<TaskRepoError> for CallError {
    fn from(value: TaskRepoError) -> Self {
        Self::Repo(value)
    }
}

fn toggle(repo: &mut Session, id: TaskId) -> Result<String, CallError> {
    let task = repo.toggle_done(id)?;
    Ok(if task.is_done {
        "Task marked done.".to_string()
    } else {
        "Task marked pending.".to_string()
    })
}

fn remove(repo: &mut Session, id: TaskId) -> Result<String, CallError> {
    repo.remove_task(id)?;
    Ok("Task removed.".to_string())
}

fn row_id(repo: &Session, index: u32) -> Result<TaskId, CallError> {
    usize::try_from(index)
        .ok()
        .and_then(|index| repo.id_at(index))
        .ok_or_else(|| CallError::InvalidArgument(format!("no task at row {index}")))
}

fn with_task_id(
    op: &'static str,
    task_id: &str,
    f: impl FnOnce(&mut Session, TaskId) -> Result<String, CallError>,
) -> TaskListResponse {
    with_session(op, |repo| {
        let id = Uuid::parse_str(task_id.trim())
            .map_err(|_| CallError::InvalidArgument(format!("invalid task id `{task_id}`")))?;
        f(repo, id)
    })
}

fn with_session(
    op: &'static str,
    f: impl FnOnce(&mut Session) -> Result<String, CallError>,
) -> TaskListResponse {
    let mut session = lock_session();
    let Some(repo) = session.as_mut() else {
        return TaskListResponse {
            ok: false,
            items: Vec::new(),
            message: format!("{op} failed: task store unavailable; call tasks_open first"),
            error_code: Some("store_unavailable".to_string()),
        };
    };

    match f(repo) {
        Ok(message) => respond_ok(&session, message),
        Err(CallError::Repo(err)) => respond_err(&session, op, &err),
        Err(CallError::InvalidArgument(message)) => TaskListResponse {
            ok: false,
            items: snapshot(&session),
            message: format!("{op} failed: {message}"),
            error_code: Some("invalid_argument".to_string()),
        },
    }
}

fn respond_ok(session: &Option<Session>, message: String) -> TaskListResponse {
    TaskListResponse {
        ok: true,
        items: snapshot(session),
        message,
        error_code: None,
    }
}

fn respond_err(session: &Option<Session>, op: &str, err: &TaskRepoError) -> TaskListResponse {
    TaskListResponse {
        ok: false,
        items: snapshot(session),
        message: format!("{op} failed: {err}"),
        error_code: Some(err.code().to_string()),
    }
}

fn snapshot(session: &Option<Session>) -> Vec<TaskRow> {
    session
        .as_ref()
        .map(|repo| repo.tasks().iter().map(to_task_row).collect())
        .unwrap_or_default()
}

fn to_task_row(task: &Task) -> TaskRow {
    TaskRow {
        task_id: task.id.to_string(),
        title: task.title.clone(),
        is_done: task.is_done,
    }
}

fn lock_session() -> MutexGuard<'static, Option<Session>> {
    // A panic inside a previous call must not wedge the UI.
    SESSION.lock().unwrap_or_else(PoisonError::into_inner)
}

fn resolve_db_path(db_path: Option<String>) -> PathBuf {
    let explicit = db_path
        .map(|raw| raw.trim().to_string())
        .filter(|trimmed| !trimmed.is_empty());
    if let Some(path) = explicit {
        return PathBuf::from(path);
    }
    if let Ok(raw) = std::env::var(DB_PATH_ENV) {
        let trimmed = raw.trim();
        if !trimmed.is_empty() {
            return PathBuf::from(trimmed);
        }
    }
    std::env::temp_dir().join(DB_FILE_NAME)
}

#[cfg(test)]
mod tests {
    use super::{
        core_version, init_logging, ping, resolve_db_path, tasks_add, tasks_clear_all,
        tasks_close, tasks_load, tasks_open, tasks_remove, tasks_remove_at, tasks_toggle_done,
        tasks_toggle_done_at, TaskListResponse,
    };
    use std::path::PathBuf;
    use std::sync::Mutex;

    // Tests share the process-wide session.
    static TEST_LOCK: Mutex<()> = Mutex::new(());

    fn open_fresh(dir: &tempfile::TempDir) -> TaskListResponse {
        let path = dir.path().join("tasks.sqlite3");
        tasks_open(Some(path.to_string_lossy().into_owned()))
    }

    fn titles(response: &TaskListResponse) -> Vec<&str> {
        response
            .items
            .iter()
            .map(|item| item.title.as_str())
            .collect()
    }

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }

    #[test]
    fn init_logging_rejects_bad_input() {
        assert!(!init_logging("info".to_string(), String::new()).is_empty());
        assert!(!init_logging("verbose".to_string(), "tmp/logs".to_string()).is_empty());
    }

    #[test]
    fn explicit_db_path_wins() {
        assert_eq!(
            resolve_db_path(Some(" /data/tasks.db ".to_string())),
            PathBuf::from("/data/tasks.db")
        );
        assert!(resolve_db_path(Some("  ".to_string())).is_absolute());
    }

    #[test]
    fn swipe_flow_renders_projection_after_each_call() {
        let _guard = TEST_LOCK.lock().unwrap_or_else(|err| err.into_inner());
        let dir = tempfile::tempdir().unwrap();

        let opened = open_fresh(&dir);
        assert!(opened.ok, "{}", opened.message);
        assert!(opened.items.is_empty());

        assert!(tasks_add("Buy milk".to_string()).ok);
        let added = tasks_add("  Write report  ".to_string());
        assert_eq!(titles(&added), vec!["Buy milk", "Write report"]);

        let loaded = tasks_load();
        assert_eq!(titles(&loaded), vec!["Write report", "Buy milk"]);

        let toggled = tasks_toggle_done_at(1);
        assert!(toggled.ok, "{}", toggled.message);
        assert!(toggled.items[1].is_done);
        assert!(!toggled.items[0].is_done);

        let report_id = toggled.items[0].task_id.clone();
        let removed = tasks_remove(report_id.clone());
        assert_eq!(titles(&removed), vec!["Buy milk"]);

        let missing = tasks_remove(report_id);
        assert!(!missing.ok);
        assert_eq!(missing.error_code.as_deref(), Some("not_found"));
        assert_eq!(missing.items.len(), 1);

        let reopened = open_fresh(&dir);
        assert_eq!(titles(&reopened), vec!["Buy milk"]);
        assert!(reopened.items[0].is_done);

        let cleared = tasks_clear_all();
        assert!(cleared.ok);
        assert!(cleared.items.is_empty());
        assert!(tasks_clear_all().ok);

        tasks_close();
    }

    #[test]
    fn bad_arguments_are_reported_without_mutation() {
        let _guard = TEST_LOCK.lock().unwrap_or_else(|err| err.into_inner());
        let dir = tempfile::tempdir().unwrap();
        assert!(open_fresh(&dir).ok);
        tasks_add("only".to_string());

        let blank = tasks_add("   ".to_string());
        assert_eq!(blank.error_code.as_deref(), Some("validation_error"));

        let bad_id = tasks_toggle_done("not-a-uuid".to_string());
        assert_eq!(bad_id.error_code.as_deref(), Some("invalid_argument"));

        let out_of_range = tasks_remove_at(7);
        assert_eq!(out_of_range.error_code.as_deref(), Some("invalid_argument"));
        assert_eq!(titles(&out_of_range), vec!["only"]);

        tasks_close();
    }

    #[test]
    fn mutations_are_blocked_while_store_is_unavailable() {
        let _guard = TEST_LOCK.lock().unwrap_or_else(|err| err.into_inner());
        let dir = tempfile::tempdir().unwrap();
        let unreachable = dir.path().join("missing").join("tasks.sqlite3");

        let opened = tasks_open(Some(unreachable.to_string_lossy().into_owned()));
        assert!(!opened.ok);
        assert_eq!(opened.error_code.as_deref(), Some("store_unavailable"));

        let add = tasks_add("blocked".to_string());
        assert!(!add.ok);
        assert_eq!(add.error_code.as_deref(), Some("store_unavailable"));
        assert!(!tasks_clear_all().ok);
    }
}
