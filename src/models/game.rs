use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use uuid::Uuid;

/// Lifecycle of a game.
///
/// Transitions are monotonic except `Scheduled -> Expired` (missed start plus
/// grace) and `* -> Cancelled` (emergency end).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "game_status", rename_all = "snake_case")]
#[serde(rename_all = "camelCase")]
pub enum GameStatus {
    Scheduled,
    PreGame,
    InProgress,
    Finished,
    Expired,
    Cancelled,
}

/// Game model mapping to the `games` table.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Game {
    pub id: Uuid,
    pub status: GameStatus,
    pub start_at: DateTime<Utc>,
    pub prize_pool: f64,
    pub total_questions: i32,
    pub current_question_index: i32,
    pub winner_count: i32,
    pub ended_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}
