use anyhow::{Context as _, Result};
use chrono::Utc;
use sqlx::{sqlite::SqliteConnectOptions, SqlitePool};
use std::{path::Path, str::FromStr};

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserRow {
    pub id: i64,
    pub username: String,
    /// Argon2id PHC string, e.g. `$argon2id$v=19$m=19456,t=2,p=1$...`.
    pub password_hash: String,
    pub email: String,
    pub created_at: String,
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
    /// `slow_query_ms` of 0 disables the logging.
    pub async fn new_with_slow_query(data_dir: &Path, slow_query_ms: u64) -> Result<Self> {
        tokio::fs::create_dir_all(data_dir).await?;
        let db_path = data_dir.join("auth.db");
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

    // ─── Users ──────────────────────────────────────────────────────────────

    pub async fn create_user(
        &self,
        username: &str,
        password_hash: &str,
        email: &str,
    ) -> Result<UserRow> {
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO users (username, password_hash, email, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(username)
        .bind(password_hash)
        .bind(email)
        .bind(&now)
        .execute(&self.pool)
        .await?;
        self.find_user(username)
            .await?
            .ok_or_else(|| anyhow::anyhow!("user not found after insert"))
    }

    pub async fn find_user(&self, username: &str) -> Result<Option<UserRow>> {
        Ok(sqlx::query_as("SELECT * FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_create_and_find_user() {
        let dir = TempDir::new().unwrap();
        let storage = Storage::new(dir.path()).await.unwrap();

        let user = storage
            .create_user("alice", "$argon2id$stub", "alice@example.com")
            .await
            .unwrap();
        assert_eq!(user.username, "alice");
        assert_eq!(user.email, "alice@example.com");

        let found = storage.find_user("alice").await.unwrap().unwrap();
        assert_eq!(found.id, user.id);
        assert!(storage.find_user("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_username_rejected_by_store() {
        let dir = TempDir::new().unwrap();
        let storage = Storage::new(dir.path()).await.unwrap();

        storage.create_user("alice", "h", "").await.unwrap();
        assert!(storage.create_user("alice", "h2", "").await.is_err());
    }
}
