use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;

/// One row of `session_checkpoints`. `state` is the serialized `SessionState`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CheckpointRow {
    pub thread_id: String,
    pub state: Value,
    pub turn_count: i64,
    pub updated_at: DateTime<Utc>,
}
