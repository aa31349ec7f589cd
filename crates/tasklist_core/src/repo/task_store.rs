//! Task store contract and SQLite implementation.
//!
//! # Responsibility
//! - Define the durable-store seam consumed by `TaskRepository`.
//! - Keep SQL details inside the core persistence boundary.
//!
//! # Invariants
//! - Rows are addressed by `uuid` only; titles are never used as keys.
//! - Write paths call `Task::validate()` before SQL mutations.
//! - Read paths reject invalid persisted rows instead of masking them.
//! - `delete_all` commits only when at least one row was removed.

use crate::db::migrations::{current_user_version, latest_version};
use crate::db::{open_db, open_db_in_memory, DbError};
use crate::model::task::{Task, TaskId, TaskValidationError};
use rusqlite::{params, Connection, Row, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;
use uuid::Uuid;

const TASK_SELECT_SQL: &str = "SELECT
    uuid,
    title,
    is_done
FROM tasks";

const REQUIRED_TASK_COLUMNS: &[&str] = &["uuid", "title", "is_done", "created_at", "updated_at"];

pub type StoreResult<T> = Result<T, StoreError>;

/// Errors raised by durable task storage.
#[derive(Debug)]
pub enum StoreError {
    Db(DbError),
    NotFound(TaskId),
    InvalidData(String),
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "task not found in store: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted task data: {message}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "connection schema version {actual_version} does not match expected {expected_version}; open it through db::open_db"
            ),
            Self::MissingRequiredTable(table) => write!(f, "required table `{table}` is missing"),
            Self::MissingRequiredColumn { table, column } => {
                write!(f, "required column `{table}.{column}` is missing")
            }
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<TaskValidationError> for StoreError {
    fn from(value: TaskValidationError) -> Self {
        Self::InvalidData(value.to_string())
    }
}

/// Sort order for full-table fetches.
///
/// Equal titles keep insertion order in both directions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TaskOrder {
    #[default]
    TitleDescending,
    TitleAscending,
}

impl TaskOrder {
    fn order_by_sql(self) -> &'static str {
        match self {
            Self::TitleDescending => "ORDER BY title DESC, rowid ASC",
            Self::TitleAscending => "ORDER BY title ASC, rowid ASC",
        }
    }
}

/// Durable storage for tasks.
///
/// Mutators take `&mut self`: a store has exactly one owner at a time.
pub trait TaskStore {
    /// Returns every persisted task in the requested order.
    fn fetch_all(&self, order: TaskOrder) -> StoreResult<Vec<Task>>;
    /// Persists a new task row.
    fn insert(&mut self, task: &Task) -> StoreResult<()>;
    /// Sets the completion flag of one task.
    fn set_done(&mut self, id: TaskId, is_done: bool) -> StoreResult<()>;
    /// Deletes one task row.
    fn delete(&mut self, id: TaskId) -> StoreResult<()>;
    /// Deletes every task row and returns how many were removed.
    fn delete_all(&mut self) -> StoreResult<usize>;
}

/// SQLite-backed task store owning its connection.
pub struct SqliteTaskStore {
    conn: Connection,
}

impl SqliteTaskStore {
    /// Wraps a migrated connection.
    ///
    /// # Errors
    /// - `UninitializedConnection` when migrations were not applied.
    /// - `MissingRequiredTable` / `MissingRequiredColumn` when the schema is
    ///   not the one this binary writes.
    pub fn try_new(conn: Connection) -> StoreResult<Self> {
        ensure_task_connection_ready(&conn)?;
        Ok(Self { conn })
    }

    /// Opens (and migrates) a database file.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        Self::try_new(open_db(path)?)
    }

    /// Opens an ephemeral in-memory database.
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::try_new(open_db_in_memory()?)
    }

    /// Borrows the underlying connection for read-only inspection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Releases the connection.
    pub fn into_connection(self) -> Connection {
        self.conn
    }
}

impl TaskStore for SqliteTaskStore {
    fn fetch_all(&self, order: TaskOrder) -> StoreResult<Vec<Task>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{TASK_SELECT_SQL} {};", order.order_by_sql()))?;
        let mut rows = stmt.query([])?;
        let mut tasks = Vec::new();
        while let Some(row) = rows.next()? {
            tasks.push(parse_task_row(row)?);
        }
        Ok(tasks)
    }

    fn insert(&mut self, task: &Task) -> StoreResult<()> {
        task.validate()?;

        self.conn.execute(
            "INSERT INTO tasks (uuid, title, is_done) VALUES (?1, ?2, ?3);",
            params![
                task.id.to_string(),
                task.title.as_str(),
                bool_to_int(task.is_done)
            ],
        )?;
        Ok(())
    }

    fn set_done(&mut self, id: TaskId, is_done: bool) -> StoreResult<()> {
        let changed = self.conn.execute(
            "UPDATE tasks
             SET
                is_done = ?1,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?2;",
            params![bool_to_int(is_done), id.to_string()],
        )?;

        if changed == 0 {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }

    fn delete(&mut self, id: TaskId) -> StoreResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM tasks WHERE uuid = ?1;", [id.to_string()])?;

        if changed == 0 {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }

    fn delete_all(&mut self) -> StoreResult<usize> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let removed = tx.execute("DELETE FROM tasks;", [])?;
        if removed == 0 {
            // Nothing pending; dropping the transaction rolls it back.
            return Ok(0);
        }
        tx.commit()?;
        Ok(removed)
    }
}

fn parse_task_row(row: &Row<'_>) -> StoreResult<Task> {
    let uuid_text: String = row.get("uuid")?;
    let id = Uuid::parse_str(&uuid_text).map_err(|_| {
        StoreError::InvalidData(format!("invalid uuid value `{uuid_text}` in tasks.uuid"))
    })?;

    let is_done = match row.get::<_, i64>("is_done")? {
        0 => false,
        1 => true,
        other => {
            return Err(StoreError::InvalidData(format!(
                "invalid is_done value `{other}` in tasks.is_done"
            )));
        }
    };

    let title: String = row.get("title")?;
    Ok(Task::with_id(id, title, is_done)?)
}

fn ensure_task_connection_ready(conn: &Connection) -> StoreResult<()> {
    let expected_version = latest_version();
    let actual_version = current_user_version(conn)?;
    if actual_version != expected_version {
        return Err(StoreError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    if !table_exists(conn, "tasks")? {
        return Err(StoreError::MissingRequiredTable("tasks"));
    }

    for &column in REQUIRED_TASK_COLUMNS {
        if !table_has_column(conn, "tasks", column)? {
            return Err(StoreError::MissingRequiredColumn {
                table: "tasks",
                column,
            });
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> StoreResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> StoreResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}

fn bool_to_int(value: bool) -> i64 {
    i64::from(value)
}
