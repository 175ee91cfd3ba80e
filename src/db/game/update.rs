use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::GameRepository;
use crate::errors::AppError;

impl GameRepository {
    /// Compare-and-set `scheduled -> pre_game`. The WHERE clause on status is
    /// the fence that keeps concurrent sweeps from double-starting a game.
    pub async fn try_begin(&self, game_id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query(
            "UPDATE games SET status = 'pre_game'
             WHERE id = $1 AND status = 'scheduled'",
        )
        .bind(game_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    /// Expire scheduled games that missed their start past the grace window.
    pub async fn expire_overdue(&self, cutoff: DateTime<Utc>) -> Result<u64, AppError> {
        let result = sqlx::query(
            "UPDATE games SET status = 'expired'
             WHERE status = 'scheduled' AND start_at < $1",
        )
        .bind(cutoff)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn mark_in_progress(&self, game_id: Uuid) -> Result<(), AppError> {
        sqlx::query("UPDATE games SET status = 'in_progress' WHERE id = $1")
            .bind(game_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn set_question_index(&self, game_id: Uuid, index: i32) -> Result<(), AppError> {
        sqlx::query("UPDATE games SET current_question_index = $2 WHERE id = $1")
            .bind(game_id)
            .bind(index)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn finish(
        &self,
        game_id: Uuid,
        winner_count: i32,
        ended_at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE games SET status = 'finished', winner_count = $2, ended_at = $3
             WHERE id = $1",
        )
        .bind(game_id)
        .bind(winner_count)
        .bind(ended_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn cancel(&self, game_id: Uuid) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE games SET status = 'cancelled', ended_at = now()
             WHERE id = $1 AND status NOT IN ('finished', 'cancelled')",
        )
        .bind(game_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Pull a scheduled game's start forward to now (admin start-now).
    pub async fn reschedule_now(&self, game_id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query(
            "UPDATE games SET start_at = now()
             WHERE id = $1 AND status = 'scheduled'",
        )
        .bind(game_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }
}
