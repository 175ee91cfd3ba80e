// Relational persistence: repository-per-entity over sqlx/Postgres, plus the
// engine-facing `GamePersistence` seam that the scheduler and game loops
// consume. The seam exists so gameplay logic never touches a pool directly.

pub mod game;
pub mod game_player;
pub mod player_answer;
pub mod question;
pub mod user;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use sqlx::prelude::FromRow;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{Game, PlayerAnswer, PlayerStatus, Question};

pub use game::GameRepository;
pub use game_player::GamePlayerRepository;
pub use player_answer::PlayerAnswerRepository;
pub use question::QuestionRepository;
pub use user::UserRepository;

/// One roster row: a game player joined with the transport identity needed to
/// reach them.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct RosterEntry {
    pub user_id: Uuid,
    pub handle: String,
    pub status: PlayerStatus,
}

/// Everything the game engine and scheduler need from durable storage.
#[async_trait]
pub trait GamePersistence: Send + Sync {
    /// Scheduled games whose start instant has passed.
    async fn due_scheduled(&self, now: DateTime<Utc>) -> Result<Vec<Game>, AppError>;

    /// Expire scheduled games that missed their start by more than the grace
    /// window. Returns how many rows flipped.
    async fn expire_overdue(&self, cutoff: DateTime<Utc>) -> Result<u64, AppError>;

    /// Compare-and-set fence: `scheduled -> pre_game`. Returns false when a
    /// concurrent sweep won the transition.
    async fn try_begin(&self, game_id: Uuid) -> Result<bool, AppError>;

    async fn mark_in_progress(&self, game_id: Uuid) -> Result<(), AppError>;

    async fn game(&self, game_id: Uuid) -> Result<Game, AppError>;

    /// The next scheduled game by start instant, used by the chat join flow.
    async fn next_scheduled(&self) -> Result<Option<Game>, AppError>;

    /// Questions of a game in strict `question_order`.
    async fn questions(&self, game_id: Uuid) -> Result<Vec<Question>, AppError>;

    async fn roster(&self, game_id: Uuid) -> Result<Vec<RosterEntry>, AppError>;

    async fn register_player(&self, game_id: Uuid, user_id: Uuid) -> Result<(), AppError>;

    /// Flip every registered player to alive when the game starts.
    async fn activate_roster(&self, game_id: Uuid) -> Result<(), AppError>;

    async fn set_question_index(&self, game_id: Uuid, index: i32) -> Result<(), AppError>;

    /// Durable bookkeeping after one question's evaluation: survivors gain a
    /// correct answer, the eliminated flip status, everyone alive at the
    /// question counts one more total.
    async fn record_question_outcome(
        &self,
        game_id: Uuid,
        question_index: i32,
        survivors: &[Uuid],
        eliminated: &[Uuid],
    ) -> Result<(), AppError>;

    /// Batch-write evaluated answers for reporting. Best-effort at call
    /// sites; uniqueness on `(game_id, user_id, question_id)` absorbs
    /// redelivery.
    async fn persist_answers(&self, rows: &[PlayerAnswer]) -> Result<(), AppError>;

    async fn finish_game(
        &self,
        game_id: Uuid,
        winners: &[Uuid],
        ended_at: DateTime<Utc>,
    ) -> Result<(), AppError>;

    async fn cancel_game(&self, game_id: Uuid) -> Result<(), AppError>;
}

/// Postgres-backed implementation delegating to the per-entity repositories.
#[derive(Clone)]
pub struct PgGamePersistence {
    games: GameRepository,
    questions: QuestionRepository,
    players: GamePlayerRepository,
    answers: PlayerAnswerRepository,
}

impl PgGamePersistence {
    pub fn new(pool: PgPool) -> Self {
        Self {
            games: GameRepository::new(pool.clone()),
            questions: QuestionRepository::new(pool.clone()),
            players: GamePlayerRepository::new(pool.clone()),
            answers: PlayerAnswerRepository::new(pool),
        }
    }
}

#[async_trait]
impl GamePersistence for PgGamePersistence {
    async fn due_scheduled(&self, now: DateTime<Utc>) -> Result<Vec<Game>, AppError> {
        self.games.due_scheduled(now).await
    }

    async fn expire_overdue(&self, cutoff: DateTime<Utc>) -> Result<u64, AppError> {
        self.games.expire_overdue(cutoff).await
    }

    async fn try_begin(&self, game_id: Uuid) -> Result<bool, AppError> {
        self.games.try_begin(game_id).await
    }

    async fn mark_in_progress(&self, game_id: Uuid) -> Result<(), AppError> {
        self.games.mark_in_progress(game_id).await
    }

    async fn game(&self, game_id: Uuid) -> Result<Game, AppError> {
        self.games.get(game_id).await
    }

    async fn next_scheduled(&self) -> Result<Option<Game>, AppError> {
        self.games.next_scheduled().await
    }

    async fn questions(&self, game_id: Uuid) -> Result<Vec<Question>, AppError> {
        self.questions.for_game(game_id).await
    }

    async fn roster(&self, game_id: Uuid) -> Result<Vec<RosterEntry>, AppError> {
        self.players.roster(game_id).await
    }

    async fn register_player(&self, game_id: Uuid, user_id: Uuid) -> Result<(), AppError> {
        self.players.register(game_id, user_id).await
    }

    async fn activate_roster(&self, game_id: Uuid) -> Result<(), AppError> {
        self.players.activate_all(game_id).await
    }

    async fn set_question_index(&self, game_id: Uuid, index: i32) -> Result<(), AppError> {
        self.games.set_question_index(game_id, index).await
    }

    async fn record_question_outcome(
        &self,
        game_id: Uuid,
        question_index: i32,
        survivors: &[Uuid],
        eliminated: &[Uuid],
    ) -> Result<(), AppError> {
        self.players
            .record_question_outcome(game_id, question_index, survivors, eliminated)
            .await
    }

    async fn persist_answers(&self, rows: &[PlayerAnswer]) -> Result<(), AppError> {
        self.answers.insert_batch(rows).await
    }

    async fn finish_game(
        &self,
        game_id: Uuid,
        winners: &[Uuid],
        ended_at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        self.players.mark_winners(game_id, winners).await?;
        self.games
            .finish(game_id, winners.len() as i32, ended_at)
            .await
    }

    async fn cancel_game(&self, game_id: Uuid) -> Result<(), AppError> {
        self.games.cancel(game_id).await
    }
}
