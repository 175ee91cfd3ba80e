use uuid::Uuid;

use super::GamePlayerRepository;
use crate::errors::AppError;

impl GamePlayerRepository {
    /// Flip every registered player to alive at game start.
    pub async fn activate_all(&self, game_id: Uuid) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE game_players SET status = 'alive'
             WHERE game_id = $1 AND status = 'registered'",
        )
        .bind(game_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Apply one question's verdicts: everyone alive at the question counts
    /// one more answered round, survivors also gain a correct answer, and the
    /// eliminated flip status with the question index recorded.
    pub async fn record_question_outcome(
        &self,
        game_id: Uuid,
        question_index: i32,
        survivors: &[Uuid],
        eliminated: &[Uuid],
    ) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        if !survivors.is_empty() {
            sqlx::query(
                "UPDATE game_players
                 SET correct_count = correct_count + 1,
                     total_count = total_count + 1
                 WHERE game_id = $1 AND user_id = ANY($2)",
            )
            .bind(game_id)
            .bind(survivors)
            .execute(&mut *tx)
            .await?;
        }

        if !eliminated.is_empty() {
            sqlx::query(
                "UPDATE game_players
                 SET status = 'eliminated',
                     eliminated_at_question = $3,
                     total_count = total_count + 1
                 WHERE game_id = $1 AND user_id = ANY($2) AND status = 'alive'",
            )
            .bind(game_id)
            .bind(eliminated)
            .bind(question_index)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    pub async fn mark_winners(&self, game_id: Uuid, winners: &[Uuid]) -> Result<(), AppError> {
        if winners.is_empty() {
            return Ok(());
        }
        sqlx::query(
            "UPDATE game_players SET status = 'winner'
             WHERE game_id = $1 AND user_id = ANY($2)",
        )
        .bind(game_id)
        .bind(winners)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
