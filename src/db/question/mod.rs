// Question repository: per-game question banks.

pub mod create;
mod read;

pub use create::NewQuestion;

use sqlx::PgPool;

/// Question repository (wraps the Postgres pool).
#[derive(Clone)]
pub struct QuestionRepository {
    pub(crate) pool: PgPool,
}

impl QuestionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

pub(crate) const QUESTION_COLUMNS: &str =
    "id, game_id, question_order, text, correct_answer, options, time_limit_ms";
