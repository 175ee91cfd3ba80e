// PlayerAnswer repository: durable reporting rows for evaluated answers.

mod create;

use sqlx::PgPool;

/// PlayerAnswer repository (wraps the Postgres pool).
#[derive(Clone)]
pub struct PlayerAnswerRepository {
    pub(crate) pool: PgPool,
}

impl PlayerAnswerRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}
