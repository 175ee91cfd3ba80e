use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use uuid::Uuid;

/// Question model mapping to the `questions` table.
///
/// Immutable once the owning game is in progress. `question_order` is the
/// zero-based position within the game; user-facing copy shows `order + 1`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: Uuid,
    pub game_id: Uuid,
    pub question_order: i32,
    pub text: String,
    pub correct_answer: String,
    pub options: Vec<String>,
    pub time_limit_ms: i64,
}
