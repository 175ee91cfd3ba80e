use uuid::Uuid;

use super::GamePlayerRepository;
use crate::errors::AppError;

impl GamePlayerRepository {
    /// Register a user into a game. Registering twice is a no-op; a player
    /// cannot register into a game that already left scheduled status.
    pub async fn register(&self, game_id: Uuid, user_id: Uuid) -> Result<(), AppError> {
        let startable: Option<bool> =
            sqlx::query_scalar("SELECT status = 'scheduled' FROM games WHERE id = $1")
                .bind(game_id)
                .fetch_optional(&self.pool)
                .await?;
        match startable {
            None => return Err(AppError::NotFound(format!("game {game_id}"))),
            Some(false) => {
                return Err(AppError::Validation(
                    "registration is closed for this game".to_string(),
                ));
            }
            Some(true) => {}
        }

        sqlx::query(
            "INSERT INTO game_players (game_id, user_id, status)
             VALUES ($1, $2, 'registered')
             ON CONFLICT (game_id, user_id) DO NOTHING",
        )
        .bind(game_id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
