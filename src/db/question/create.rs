use uuid::Uuid;

use super::{QUESTION_COLUMNS, QuestionRepository};
use crate::errors::AppError;
use crate::models::Question;

/// One question as the admin surface supplies it.
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewQuestion {
    pub text: String,
    pub options: Vec<String>,
    pub correct_answer: String,
    pub time_limit_ms: Option<i64>,
}

impl NewQuestion {
    fn validate(&self) -> Result<(), AppError> {
        if self.options.len() != 4 {
            return Err(AppError::Validation(format!(
                "a question needs exactly 4 options, got {}",
                self.options.len()
            )));
        }
        if !self.options.contains(&self.correct_answer) {
            return Err(AppError::Validation(
                "correct answer must be one of the options".to_string(),
            ));
        }
        Ok(())
    }
}

impl QuestionRepository {
    /// Append a batch of questions to a still-scheduled game, numbering them
    /// after whatever the game already holds. Updates the game's
    /// `total_questions` in the same transaction.
    pub async fn add_batch(
        &self,
        game_id: Uuid,
        default_time_limit_ms: i64,
        batch: &[NewQuestion],
    ) -> Result<Vec<Question>, AppError> {
        for q in batch {
            q.validate()?;
        }

        let mut tx = self.pool.begin().await?;

        let status: String = sqlx::query_scalar("SELECT status::text FROM games WHERE id = $1")
            .bind(game_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("game {game_id}")))?;
        if status != "scheduled" {
            return Err(AppError::Validation(format!(
                "questions are immutable once a game leaves scheduled status (game is {status})"
            )));
        }

        let next_order: i32 = sqlx::query_scalar(
            "SELECT COALESCE(MAX(question_order) + 1, 0) FROM questions WHERE game_id = $1",
        )
        .bind(game_id)
        .fetch_one(&mut *tx)
        .await?;

        let mut created = Vec::with_capacity(batch.len());
        for (offset, q) in batch.iter().enumerate() {
            let question = sqlx::query_as::<_, Question>(&format!(
                "INSERT INTO questions
                   (game_id, question_order, text, correct_answer, options, time_limit_ms)
                 VALUES ($1, $2, $3, $4, $5, $6)
                 RETURNING {QUESTION_COLUMNS}"
            ))
            .bind(game_id)
            .bind(next_order + offset as i32)
            .bind(&q.text)
            .bind(&q.correct_answer)
            .bind(&q.options)
            .bind(q.time_limit_ms.unwrap_or(default_time_limit_ms))
            .fetch_one(&mut *tx)
            .await?;
            created.push(question);
        }

        sqlx::query(
            "UPDATE games
             SET total_questions = (SELECT COUNT(*) FROM questions WHERE game_id = $1)
             WHERE id = $1",
        )
        .bind(game_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(%game_id, added = created.len(), "imported questions");
        Ok(created)
    }
}
