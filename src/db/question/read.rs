use uuid::Uuid;

use super::{QUESTION_COLUMNS, QuestionRepository};
use crate::errors::AppError;
use crate::models::Question;

impl QuestionRepository {
    /// All questions of a game in strict order.
    pub async fn for_game(&self, game_id: Uuid) -> Result<Vec<Question>, AppError> {
        let questions = sqlx::query_as::<_, Question>(&format!(
            "SELECT {QUESTION_COLUMNS} FROM questions
             WHERE game_id = $1
             ORDER BY question_order"
        ))
        .bind(game_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(questions)
    }
}
