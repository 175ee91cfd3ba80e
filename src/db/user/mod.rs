// User repository: transport identities and activity bookkeeping.

mod create;
mod read;
mod update;

use sqlx::PgPool;

/// User repository (wraps the Postgres pool).
#[derive(Clone)]
pub struct UserRepository {
    pub(crate) pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

pub(crate) const USER_COLUMNS: &str =
    "id, handle, display_name, active, last_activity_at, created_at";
