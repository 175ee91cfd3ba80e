use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{GAME_COLUMNS, GameRepository};
use crate::errors::AppError;
use crate::models::Game;

impl GameRepository {
    pub async fn get(&self, game_id: Uuid) -> Result<Game, AppError> {
        sqlx::query_as::<_, Game>(&format!(
            "SELECT {GAME_COLUMNS} FROM games WHERE id = $1"
        ))
        .bind(game_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("game {game_id}")))
    }

    pub async fn list(&self, limit: i64, offset: i64) -> Result<Vec<Game>, AppError> {
        let games = sqlx::query_as::<_, Game>(&format!(
            "SELECT {GAME_COLUMNS} FROM games ORDER BY start_at DESC LIMIT $1 OFFSET $2"
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(games)
    }

    /// Scheduled games whose announced start has passed.
    pub async fn due_scheduled(&self, now: DateTime<Utc>) -> Result<Vec<Game>, AppError> {
        let games = sqlx::query_as::<_, Game>(&format!(
            "SELECT {GAME_COLUMNS} FROM games
             WHERE status = 'scheduled' AND start_at <= $1
             ORDER BY start_at"
        ))
        .bind(now)
        .fetch_all(&self.pool)
        .await?;
        Ok(games)
    }

    /// The soonest upcoming scheduled game, if any.
    pub async fn next_scheduled(&self) -> Result<Option<Game>, AppError> {
        let game = sqlx::query_as::<_, Game>(&format!(
            "SELECT {GAME_COLUMNS} FROM games
             WHERE status = 'scheduled'
             ORDER BY start_at
             LIMIT 1"
        ))
        .fetch_optional(&self.pool)
        .await?;
        Ok(game)
    }
}
