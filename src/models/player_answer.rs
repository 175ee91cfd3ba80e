use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use uuid::Uuid;

/// Durable copy of an evaluated answer, batch-written after each question for
/// reporting. Unique on `(game_id, user_id, question_id)`; the in-memory
/// evaluation decision stays authoritative.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PlayerAnswer {
    pub game_id: Uuid,
    pub user_id: Uuid,
    pub question_id: Uuid,
    pub selected: String,
    pub is_correct: bool,
    pub response_time_ms: i64,
    pub question_number: i32,
    pub submitted_at: DateTime<Utc>,
}
