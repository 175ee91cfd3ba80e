use uuid::Uuid;

use super::GamePlayerRepository;
use crate::db::RosterEntry;
use crate::errors::AppError;
use crate::models::GamePlayer;

impl GamePlayerRepository {
    /// The game's roster joined with each player's transport handle.
    pub async fn roster(&self, game_id: Uuid) -> Result<Vec<RosterEntry>, AppError> {
        let entries = sqlx::query_as::<_, RosterEntry>(
            "SELECT gp.user_id, u.handle, gp.status
             FROM game_players gp
             JOIN users u ON u.id = gp.user_id
             WHERE gp.game_id = $1
             ORDER BY gp.joined_at",
        )
        .bind(game_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(entries)
    }

    pub async fn for_game(&self, game_id: Uuid) -> Result<Vec<GamePlayer>, AppError> {
        let players = sqlx::query_as::<_, GamePlayer>(
            "SELECT game_id, user_id, status, eliminated_at_question,
                    correct_count, total_count, joined_at
             FROM game_players
             WHERE game_id = $1
             ORDER BY joined_at",
        )
        .bind(game_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(players)
    }
}
