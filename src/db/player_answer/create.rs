use super::PlayerAnswerRepository;
use crate::errors::AppError;
use crate::models::PlayerAnswer;

impl PlayerAnswerRepository {
    /// Batch-insert evaluated answers. The unique key on
    /// `(game_id, user_id, question_id)` makes redelivery harmless.
    pub async fn insert_batch(&self, rows: &[PlayerAnswer]) -> Result<(), AppError> {
        if rows.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;
        for row in rows {
            sqlx::query(
                "INSERT INTO player_answers
                   (game_id, user_id, question_id, selected, is_correct,
                    response_time_ms, question_number, submitted_at)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                 ON CONFLICT (game_id, user_id, question_id) DO NOTHING",
            )
            .bind(row.game_id)
            .bind(row.user_id)
            .bind(row.question_id)
            .bind(&row.selected)
            .bind(row.is_correct)
            .bind(row.response_time_ms)
            .bind(row.question_number)
            .bind(row.submitted_at)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }
}
