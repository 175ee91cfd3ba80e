use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use uuid::Uuid;

/// Per-game player status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "player_status", rename_all = "snake_case")]
#[serde(rename_all = "camelCase")]
pub enum PlayerStatus {
    Registered,
    Alive,
    Eliminated,
    Winner,
}

/// GamePlayer model mapping to the `game_players` table.
///
/// Unique per `(game_id, user_id)`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct GamePlayer {
    pub game_id: Uuid,
    pub user_id: Uuid,
    pub status: PlayerStatus,
    pub eliminated_at_question: Option<i32>,
    pub correct_count: i32,
    pub total_count: i32,
    pub joined_at: DateTime<Utc>,
}
