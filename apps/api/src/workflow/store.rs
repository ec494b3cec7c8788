//! Session checkpoints keyed by thread id.
//!
//! `PgSessionStore` checks a connection out of the pool for the duration of
//! one call and returns it on every exit path. Writers for the same thread
//! are serialized upstream by `ThreadLocks`.

use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;
use sqlx::PgPool;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::debug;

use crate::models::session::CheckpointRow;
use crate::workflow::state::SessionState;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("session store unavailable: {0}")]
    Database(#[from] sqlx::Error),

    #[error("checkpoint serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// `user_id`, or `{user_id}_{session_id}` when a session id is present.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ThreadId(String);

impl ThreadId {
    pub fn new(user_id: &str, session_id: Option<&str>) -> Self {
        match session_id.map(str::trim).filter(|s| !s.is_empty()) {
            Some(session) => Self(format!("{user_id}_{session}")),
            None => Self(user_id.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn load(&self, thread_id: &ThreadId) -> Result<Option<SessionState>, PersistenceError>;

    async fn save(&self, thread_id: &ThreadId, state: &SessionState) -> Result<(), PersistenceError>;

    /// Cheap availability probe for health reporting.
    async fn ping(&self) -> Result<(), PersistenceError> {
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// In-memory
// ────────────────────────────────────────────────────────────────────────────

/// In-memory checkpoints for tests and local development.
#[derive(Default)]
pub struct MemorySessionStore {
    entries: RwLock<HashMap<ThreadId, SessionState>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load(&self, thread_id: &ThreadId) -> Result<Option<SessionState>, PersistenceError> {
        Ok(self.entries.read().await.get(thread_id).cloned())
    }

    async fn save(&self, thread_id: &ThreadId, state: &SessionState) -> Result<(), PersistenceError> {
        self.entries
            .write()
            .await
            .insert(thread_id.clone(), state.clone());
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// PostgreSQL
// ────────────────────────────────────────────────────────────────────────────

pub struct PgSessionStore {
    pool: PgPool,
}

impl PgSessionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn load(&self, thread_id: &ThreadId) -> Result<Option<SessionState>, PersistenceError> {
        let mut conn = self.pool.acquire().await?;
        let row: Option<CheckpointRow> = sqlx::query_as(
            "SELECT thread_id, state, turn_count, updated_at FROM session_checkpoints WHERE thread_id = $1",
        )
        .bind(thread_id.as_str())
        .fetch_optional(&mut *conn)
        .await?;

        match row {
            Some(row) => {
                debug!("Loaded checkpoint for {thread_id} (turn {})", row.turn_count);
                Ok(Some(serde_json::from_value(row.state)?))
            }
            None => Ok(None),
        }
    }

    async fn save(&self, thread_id: &ThreadId, state: &SessionState) -> Result<(), PersistenceError> {
        let snapshot = serde_json::to_value(state)?;
        let mut conn = self.pool.acquire().await?;

        // Single-statement upsert: a failed save leaves the previous checkpoint intact.
        sqlx::query(
            r#"
            INSERT INTO session_checkpoints (thread_id, state, turn_count, updated_at)
            VALUES ($1, $2, $3, now())
            ON CONFLICT (thread_id) DO UPDATE
                SET state = EXCLUDED.state,
                    turn_count = EXCLUDED.turn_count,
                    updated_at = now()
            "#,
        )
        .bind(thread_id.as_str())
        .bind(&snapshot)
        .bind(state.turn_count as i64)
        .execute(&mut *conn)
        .await?;

        debug!("Saved checkpoint for {thread_id} (turn {})", state.turn_count);
        Ok(())
    }

    async fn ping(&self) -> Result<(), PersistenceError> {
        let mut conn = self.pool.acquire().await?;
        sqlx::query("SELECT 1").execute(&mut *conn).await?;
        Ok(())
    }
}
