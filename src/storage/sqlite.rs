//! SQLite backend, used for local development and tests.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

use super::{
    Authenticator, Challenge, ChallengePurpose, NewAuthenticator, NewThought, Storage,
    StorageError, StorageResult, Thought,
};
use async_trait::async_trait;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    created_at TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS authenticators (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL REFERENCES users(id),
    credential_id TEXT UNIQUE NOT NULL,
    public_key TEXT NOT NULL,
    counter INTEGER NOT NULL DEFAULT 0,
    transports TEXT,
    created_at TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS thoughts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    content TEXT NOT NULL,
    font TEXT NOT NULL DEFAULT 'sans-serif',
    category TEXT NOT NULL DEFAULT 'thought',
    color TEXT NOT NULL DEFAULT 'default',
    user_id TEXT,
    created_at TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS challenges (
    id TEXT PRIMARY KEY,
    purpose TEXT NOT NULL,
    state TEXT NOT NULL,
    user_id TEXT,
    created_at TEXT NOT NULL
);
"#;

pub struct SqliteStorage {
    pool: SqlitePool,
}

impl SqliteStorage {
    pub async fn connect(url: &str) -> StorageResult<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(sqlx::Error::from)?
            .create_if_missing(true);

        // An in-memory database exists per connection, so the pool must pin a
        // single one open or every checkout sees a fresh empty database.
        let pool_options = if url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };

        let pool = pool_options.connect_with(options).await?;

        sqlx::raw_sql(SCHEMA).execute(&pool).await?;

        Ok(Self { pool })
    }

    /// In-memory database for tests.
    pub async fn in_memory() -> StorageResult<Self> {
        Self::connect("sqlite::memory:").await
    }
}

#[async_trait]
impl Storage for SqliteStorage {
    async fn save_challenge(
        &self,
        session_id: &str,
        purpose: ChallengePurpose,
        state: &str,
        user_id: Option<&str>,
    ) -> StorageResult<()> {
        sqlx::query(
            "INSERT INTO challenges (id, purpose, state, user_id, created_at)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 purpose = excluded.purpose,
                 state = excluded.state,
                 user_id = excluded.user_id,
                 created_at = excluded.created_at",
        )
        .bind(session_id)
        .bind(purpose.as_str())
        .bind(state)
        .bind(user_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_challenge(&self, session_id: &str) -> StorageResult<Option<Challenge>> {
        let challenge = sqlx::query_as::<_, Challenge>(
            "SELECT id, purpose, state, user_id, created_at FROM challenges WHERE id = ?",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(challenge)
    }

    async fn delete_challenge(&self, session_id: &str) -> StorageResult<()> {
        sqlx::query("DELETE FROM challenges WHERE id = ?")
            .bind(session_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn delete_challenges_before(&self, cutoff: DateTime<Utc>) -> StorageResult<u64> {
        let result = sqlx::query("DELETE FROM challenges WHERE created_at < ?")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn create_user(&self, id: &str) -> StorageResult<()> {
        sqlx::query("INSERT INTO users (id, created_at) VALUES (?, ?) ON CONFLICT(id) DO NOTHING")
            .bind(id)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn save_authenticator(&self, auth: NewAuthenticator<'_>) -> StorageResult<()> {
        sqlx::query(
            "INSERT INTO authenticators (id, user_id, credential_id, public_key, counter, transports, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(auth.id)
        .bind(auth.user_id)
        .bind(auth.credential_id)
        .bind(auth.public_key)
        .bind(auth.counter)
        .bind(auth.transports)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                StorageError::UniquenessViolation
            }
            other => StorageError::Database(other),
        })?;

        Ok(())
    }

    async fn authenticators_for_user(&self, user_id: &str) -> StorageResult<Vec<Authenticator>> {
        let rows = sqlx::query_as::<_, Authenticator>(
            "SELECT id, user_id, credential_id, public_key, counter, transports, created_at
             FROM authenticators WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn authenticator_by_credential_id(
        &self,
        credential_id: &str,
    ) -> StorageResult<Option<Authenticator>> {
        let row = sqlx::query_as::<_, Authenticator>(
            "SELECT id, user_id, credential_id, public_key, counter, transports, created_at
             FROM authenticators WHERE credential_id = ?",
        )
        .bind(credential_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn update_counter(
        &self,
        credential_id: &str,
        public_key: &str,
        new_counter: i64,
    ) -> StorageResult<bool> {
        // Strictly-greater guard; the (0, 0) case covers authenticators that
        // never increment their counter.
        let result = sqlx::query(
            "UPDATE authenticators SET public_key = ?, counter = ?
             WHERE credential_id = ? AND (counter < ? OR (? = 0 AND counter = 0))",
        )
        .bind(public_key)
        .bind(new_counter)
        .bind(credential_id)
        .bind(new_counter)
        .bind(new_counter)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn latest_thoughts(&self, limit: i64) -> StorageResult<Vec<Thought>> {
        let rows = sqlx::query_as::<_, Thought>(
            "SELECT id, content, font, category, color, user_id, created_at
             FROM thoughts ORDER BY id DESC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn thoughts_before(&self, before: i64, limit: i64) -> StorageResult<Vec<Thought>> {
        let rows = sqlx::query_as::<_, Thought>(
            "SELECT id, content, font, category, color, user_id, created_at
             FROM thoughts WHERE id < ? ORDER BY id DESC LIMIT ?",
        )
        .bind(before)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn create_thought(&self, thought: NewThought<'_>) -> StorageResult<Thought> {
        let row = sqlx::query_as::<_, Thought>(
            "INSERT INTO thoughts (content, font, category, color, user_id, created_at)
             VALUES (?, ?, ?, ?, ?, ?)
             RETURNING id, content, font, category, color, user_id, created_at",
        )
        .bind(thought.content)
        .bind(thought.font)
        .bind(thought.category)
        .bind(thought.color)
        .bind(thought.user_id)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    async fn update_thought(
        &self,
        id: i64,
        content: &str,
        user_id: &str,
    ) -> StorageResult<Option<Thought>> {
        let row = sqlx::query_as::<_, Thought>(
            "UPDATE thoughts SET content = ? WHERE id = ? AND user_id = ?
             RETURNING id, content, font, category, color, user_id, created_at",
        )
        .bind(content)
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }
}
