use anyhow::{Context as _, Result};
use chrono::Utc;
use sqlx::{sqlite::SqliteConnectOptions, SqlitePool};
use std::{path::Path, str::FromStr};

/// Default timeout for individual SQLite queries.
/// Prevents hung queries from blocking the server indefinitely.
const QUERY_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(30);

/// Execute a future with the standard query timeout.
/// Returns an error if the operation takes longer than `QUERY_TIMEOUT`.
async fn with_timeout<T>(fut: impl std::future::Future<Output = Result<T>>) -> Result<T> {
    match tokio::time::timeout(QUERY_TIMEOUT, fut).await {
        Ok(result) => result,
        Err(_) => Err(anyhow::anyhow!(
            "database query timed out after {}s",
            QUERY_TIMEOUT.as_secs()
        )),
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TodoRow {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub priority: String,
    pub assignee: String,
    pub creator: String,
    /// RFC 3339, or NULL when the task has no due date.
    pub due_date: Option<String>,
    /// Snapshot taken at the last mutation. Recomputed on every read — see
    /// `todos::Todo::from_row`.
    pub is_overdue: bool,
    pub created_at: String,
    pub updated_at: String,
}

/// Write payload for a task — every mutable column. Used for both inserts
/// and full-row updates after a merge.
#[derive(Debug, Clone)]
pub struct TodoDraft {
    pub title: String,
    pub description: String,
    pub priority: String,
    pub assignee: String,
    pub creator: String,
    pub due_date: Option<String>,
    pub is_overdue: bool,
}

#[derive(Clone)]
pub struct Storage {
    pool: SqlitePool,
}

impl Storage {
    pub async fn new(data_dir: &Path) -> Result<Self> {
        Self::new_with_slow_query(data_dir, 0).await
    }

    /// Create storage with slow-query logging enabled.
    ///
    /// `slow_query_ms` is the threshold in milliseconds — queries exceeding it are
    /// logged at WARN level. Set to 0 to disable slow-query logging.
    pub async fn new_with_slow_query(data_dir: &Path, slow_query_ms: u64) -> Result<Self> {
        tokio::fs::create_dir_all(data_dir).await?;
        let db_path = data_dir.join("taskcast.db");
        let mut opts =
            SqliteConnectOptions::from_str(&format!("sqlite://{}?mode=rwc", db_path.display()))?
                .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
                .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
                .create_if_missing(true);

        if slow_query_ms > 0 {
            use sqlx::ConnectOptions as _;
            opts = opts.log_slow_statements(
                log::LevelFilter::Warn,
                std::time::Duration::from_millis(slow_query_ms),
            );
        }

        let pool = SqlitePool::connect_with(opts).await?;
        Self::migrate(&pool).await?;
        Ok(Self { pool })
    }

    /// Return a clone of the connection pool (cheap — Arc-backed).
    pub fn pool(&self) -> SqlitePool {
        self.pool.clone()
    }

    async fn migrate(pool: &SqlitePool) -> Result<()> {
        sqlx::migrate!("src/storage/migrations")
            .run(pool)
            .await
            .context("Failed to run database migrations")?;
        Ok(())
    }

    // ─── Todos ──────────────────────────────────────────────────────────────

    pub async fn create_todo(&self, draft: &TodoDraft) -> Result<TodoRow> {
        let now = Utc::now().to_rfc3339();
        let result = sqlx::query(
            "INSERT INTO todos (title, description, priority, assignee, creator, due_date, is_overdue, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&draft.title)
        .bind(&draft.description)
        .bind(&draft.priority)
        .bind(&draft.assignee)
        .bind(&draft.creator)
        .bind(&draft.due_date)
        .bind(draft.is_overdue)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;
        let id = result.last_insert_rowid();
        self.get_todo(id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("todo not found after insert"))
    }

    pub async fn get_todo(&self, id: i64) -> Result<Option<TodoRow>> {
        Ok(sqlx::query_as("SELECT * FROM todos WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    /// Overwrite every mutable column and bump `updated_at`. `created_at`
    /// is never touched after insert. Returns `None` if `id` is unknown.
    pub async fn update_todo(&self, id: i64, draft: &TodoDraft) -> Result<Option<TodoRow>> {
        let now = Utc::now().to_rfc3339();
        let result = sqlx::query(
            "UPDATE todos SET title = ?, description = ?, priority = ?, assignee = ?, creator = ?,
                              due_date = ?, is_overdue = ?, updated_at = ?
             WHERE id = ?",
        )
        .bind(&draft.title)
        .bind(&draft.description)
        .bind(&draft.priority)
        .bind(&draft.assignee)
        .bind(&draft.creator)
        .bind(&draft.due_date)
        .bind(draft.is_overdue)
        .bind(&now)
        .bind(id)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_todo(id).await
    }

    /// Returns `true` if a row was deleted, `false` if `id` was unknown.
    pub async fn delete_todo(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM todos WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// All tasks ordered by `(priority, due_date)` ascending. Priority is a
    /// plain string column, so the order is alphabetical; `id` breaks ties
    /// deterministically. RFC 3339 strings sort chronologically.
    pub async fn list_todos(&self) -> Result<Vec<TodoRow>> {
        with_timeout(async {
            Ok(sqlx::query_as(
                "SELECT * FROM todos ORDER BY priority ASC, due_date ASC, id ASC",
            )
            .fetch_all(&self.pool)
            .await?)
        })
        .await
    }
}
