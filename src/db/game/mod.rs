// Game repository: durable game rows and their status transitions.

mod create;
mod read;
mod update;

use sqlx::PgPool;

/// Game repository (wraps the Postgres pool).
#[derive(Clone)]
pub struct GameRepository {
    pub(crate) pool: PgPool,
}

impl GameRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

pub(crate) const GAME_COLUMNS: &str = "id, status, start_at, prize_pool, total_questions, \
     current_question_index, winner_count, ended_at, created_at";
