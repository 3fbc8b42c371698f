//! Persistence layer: a single `Storage` trait with two interchangeable
//! backends (SQLite for local development, Postgres for deployments).
//!
//! The backend is chosen once at startup from the connection string; no
//! backend-specific branching appears in ceremony or feed logic.

mod postgres;
mod sqlite;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::config::Config;

pub use postgres::PostgresStorage;
pub use sqlite::SqliteStorage;

#[derive(Error, Debug)]
pub enum StorageError {
    /// A credential id can only ever belong to one user.
    #[error("credential id already registered")]
    UniquenessViolation,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Which ceremony a pending challenge belongs to. A registration challenge
/// must not be redeemable as an authentication, or vice versa.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChallengePurpose {
    Register,
    Authenticate,
}

impl ChallengePurpose {
    pub fn as_str(self) -> &'static str {
        match self {
            ChallengePurpose::Register => "register",
            ChallengePurpose::Authenticate => "authenticate",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "register" => Some(ChallengePurpose::Register),
            "authenticate" => Some(ChallengePurpose::Authenticate),
            _ => None,
        }
    }
}

/// Anonymous identity placeholder. Created at registration Begin, never
/// mutated, never deleted.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct User {
    pub id: String,
    pub created_at: DateTime<Utc>,
}

/// One registered passkey. `public_key` holds the serialized credential
/// (key material plus webauthn metadata); `counter` mirrors the last accepted
/// signature counter for the clone-detection guard.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Authenticator {
    pub id: String,
    pub user_id: String,
    pub credential_id: String,
    pub public_key: String,
    pub counter: i64,
    pub transports: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct NewAuthenticator<'a> {
    pub id: &'a str,
    pub user_id: &'a str,
    pub credential_id: &'a str,
    pub public_key: &'a str,
    pub counter: i64,
    pub transports: Option<&'a str>,
}

/// An in-flight ceremony's server-side state, keyed by the opaque session id
/// held in the client's `challenge_session` cookie. At most one row per
/// session; single-use; swept after five minutes.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Challenge {
    pub id: String,
    pub purpose: String,
    pub state: String,
    pub user_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Challenge {
    pub fn purpose(&self) -> Option<ChallengePurpose> {
        ChallengePurpose::from_str(&self.purpose)
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Thought {
    pub id: i64,
    pub content: String,
    pub font: String,
    pub category: String,
    pub color: String,
    pub user_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct NewThought<'a> {
    pub content: &'a str,
    pub font: &'a str,
    pub category: &'a str,
    pub color: &'a str,
    pub user_id: &'a str,
}

#[async_trait]
pub trait Storage: Send + Sync {
    /// Upsert the pending challenge for a session. Overwrites any prior
    /// challenge, so a session can never hold two live challenges.
    async fn save_challenge(
        &self,
        session_id: &str,
        purpose: ChallengePurpose,
        state: &str,
        user_id: Option<&str>,
    ) -> StorageResult<()>;

    async fn get_challenge(&self, session_id: &str) -> StorageResult<Option<Challenge>>;

    async fn delete_challenge(&self, session_id: &str) -> StorageResult<()>;

    /// Sweep challenges created before `cutoff`. Returns the number removed.
    async fn delete_challenges_before(&self, cutoff: DateTime<Utc>) -> StorageResult<u64>;

    /// Idempotent: a duplicate id is silently ignored.
    async fn create_user(&self, id: &str) -> StorageResult<()>;

    /// Fails with `UniquenessViolation` if the credential id already exists.
    async fn save_authenticator(&self, auth: NewAuthenticator<'_>) -> StorageResult<()>;

    async fn authenticators_for_user(&self, user_id: &str) -> StorageResult<Vec<Authenticator>>;

    async fn authenticator_by_credential_id(
        &self,
        credential_id: &str,
    ) -> StorageResult<Option<Authenticator>>;

    /// Guarded counter advance: the write only lands when `new_counter` is
    /// strictly greater than the stored value, or both are zero (counters an
    /// authenticator never increments). Returns false when the guard rejects
    /// the write, which is the replay signal.
    async fn update_counter(
        &self,
        credential_id: &str,
        public_key: &str,
        new_counter: i64,
    ) -> StorageResult<bool>;

    async fn latest_thoughts(&self, limit: i64) -> StorageResult<Vec<Thought>>;

    async fn thoughts_before(&self, before: i64, limit: i64) -> StorageResult<Vec<Thought>>;

    async fn create_thought(&self, thought: NewThought<'_>) -> StorageResult<Thought>;

    /// Owner-scoped edit: updates only when `id` belongs to `user_id`.
    async fn update_thought(
        &self,
        id: i64,
        content: &str,
        user_id: &str,
    ) -> StorageResult<Option<Thought>>;
}

/// Connect to the backend named by the configuration and create the schema.
pub async fn connect(config: &Config) -> StorageResult<Arc<dyn Storage>> {
    if config.uses_postgres() {
        tracing::info!("using postgres backend");
        Ok(Arc::new(PostgresStorage::connect(&config.database_url).await?))
    } else {
        tracing::info!("using sqlite backend");
        Ok(Arc::new(SqliteStorage::connect(&config.database_url).await?))
    }
}
