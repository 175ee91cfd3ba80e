use chrono::{DateTime, Utc};

use super::{GAME_COLUMNS, GameRepository};
use crate::errors::AppError;
use crate::models::Game;

impl GameRepository {
    /// Create a game in `scheduled` status.
    pub async fn create(
        &self,
        start_at: DateTime<Utc>,
        prize_pool: f64,
    ) -> Result<Game, AppError> {
        if prize_pool < 0.0 {
            return Err(AppError::Validation(format!(
                "prize pool must be non-negative, got {prize_pool}"
            )));
        }

        let game = sqlx::query_as::<_, Game>(&format!(
            "INSERT INTO games (status, start_at, prize_pool)
             VALUES ('scheduled', $1, $2)
             RETURNING {GAME_COLUMNS}"
        ))
        .bind(start_at)
        .bind(prize_pool)
        .fetch_one(&self.pool)
        .await?;

        tracing::info!(game_id = %game.id, %start_at, "created scheduled game");
        Ok(game)
    }
}
