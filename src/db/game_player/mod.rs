// GamePlayer repository: per-game rosters and elimination bookkeeping.

mod create;
mod read;
mod update;

use sqlx::PgPool;

/// GamePlayer repository (wraps the Postgres pool).
#[derive(Clone)]
pub struct GamePlayerRepository {
    pub(crate) pool: PgPool,
}

impl GamePlayerRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}
