use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::Notify;
use uuid::Uuid;

use crate::db::RosterEntry;
use crate::models::{Game, PlayerStatus};

/// In-memory per-player state inside an active game.
#[derive(Debug, Clone)]
pub struct PlayerRuntime {
    pub user_id: Uuid,
    pub handle: String,
    pub status: PlayerStatus,
    pub eliminated_at_question: Option<usize>,
    pub correct_count: u32,
    pub total_count: u32,
}

impl PlayerRuntime {
    pub fn is_alive(&self) -> bool {
        self.status == PlayerStatus::Alive
    }
}

/// Authoritative in-memory state of one active game.
///
/// Owned by the game's actor; the webhook ingress path takes short read/write
/// locks that never span I/O. Relationships are id-keyed maps, there are no
/// object graphs to keep consistent.
pub struct GameRuntime {
    pub game_id: Uuid,
    pub prize_pool: f64,
    pub total_questions: usize,
    pub current_index: usize,

    pub players: HashMap<Uuid, PlayerRuntime>,

    /// Whether the current question is accepting answers.
    pub question_open: bool,
    pub question_start_unix_ms: i64,
    pub question_time_limit_ms: i64,

    /// Players whose answer won the store slot this question.
    pub answered: HashSet<Uuid>,
    /// Eliminated players already told their answers are locked this question.
    pub lock_notices: HashSet<Uuid>,

    /// Early-completion signal for the current question. Replaced on every
    /// `open_question` so a stale permit cannot leak across questions.
    pub all_answered: Arc<Notify>,
}

impl GameRuntime {
    /// Build runtime state from the persisted game and roster; every
    /// registered player enters alive.
    pub fn new(game: &Game, roster: &[RosterEntry], total_questions: usize) -> Self {
        let players = roster
            .iter()
            .map(|entry| {
                (
                    entry.user_id,
                    PlayerRuntime {
                        user_id: entry.user_id,
                        handle: entry.handle.clone(),
                        status: PlayerStatus::Alive,
                        eliminated_at_question: None,
                        correct_count: 0,
                        total_count: 0,
                    },
                )
            })
            .collect();

        Self {
            game_id: game.id,
            prize_pool: game.prize_pool,
            total_questions,
            current_index: 0,
            players,
            question_open: false,
            question_start_unix_ms: 0,
            question_time_limit_ms: 0,
            answered: HashSet::new(),
            lock_notices: HashSet::new(),
            all_answered: Arc::new(Notify::new()),
        }
    }

    pub fn alive_ids(&self) -> Vec<Uuid> {
        self.players
            .values()
            .filter(|p| p.is_alive())
            .map(|p| p.user_id)
            .collect()
    }

    pub fn alive_handles(&self) -> Vec<String> {
        self.players
            .values()
            .filter(|p| p.is_alive())
            .map(|p| p.handle.clone())
            .collect()
    }

    pub fn all_handles(&self) -> Vec<String> {
        self.players.values().map(|p| p.handle.clone()).collect()
    }

    pub fn alive_count(&self) -> usize {
        self.players.values().filter(|p| p.is_alive()).count()
    }

    pub fn is_alive(&self, user_id: Uuid) -> bool {
        self.players
            .get(&user_id)
            .is_some_and(PlayerRuntime::is_alive)
    }

    /// Open the accept window for `index`. Resets per-question scratch state
    /// and swaps in a fresh early-completion signal.
    pub fn open_question(&mut self, index: usize, start_unix_ms: i64, time_limit_ms: i64) {
        self.current_index = index;
        self.question_open = true;
        self.question_start_unix_ms = start_unix_ms;
        self.question_time_limit_ms = time_limit_ms;
        self.answered.clear();
        self.lock_notices.clear();
        self.all_answered = Arc::new(Notify::new());
    }

    pub fn close_question(&mut self) {
        self.question_open = false;
    }

    /// Record a stored answer; returns true when every alive player has one.
    pub fn record_answered(&mut self, user_id: Uuid) -> bool {
        self.answered.insert(user_id);
        self.answered.len() >= self.alive_count()
    }

    pub fn eliminate(&mut self, user_id: Uuid, at_question: usize) {
        if let Some(player) = self.players.get_mut(&user_id) {
            if player.is_alive() {
                player.status = PlayerStatus::Eliminated;
                player.eliminated_at_question = Some(at_question);
                player.total_count += 1;
            }
        }
    }

    pub fn record_survival(&mut self, user_id: Uuid) {
        if let Some(player) = self.players.get_mut(&user_id) {
            player.correct_count += 1;
            player.total_count += 1;
        }
    }

    /// Flip the remaining alive players to winners and return them.
    pub fn crown_survivors(&mut self) -> Vec<Uuid> {
        let mut winners = Vec::new();
        for player in self.players.values_mut() {
            if player.is_alive() {
                player.status = PlayerStatus::Winner;
                winners.push(player.user_id);
            }
        }
        winners
    }

    pub fn handle_of(&self, user_id: Uuid) -> Option<&str> {
        self.players.get(&user_id).map(|p| p.handle.as_str())
    }
}
