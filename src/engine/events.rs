use uuid::Uuid;

/// Typed events flowing through the game event bus.
///
/// Delivery is FIFO per game: every event for a game lands in that game's
/// actor mailbox, and the actor is the single writer of its state. The
/// scheduler publishes `GameStart`, the admin surface `EmergencyEnd`; the
/// actor's own timers and early-completion signal publish `NextQuestion`,
/// `QuestionTimeout`, and `GameEnd` back onto the mailbox, so the mailbox
/// handler is the only place state transitions run. Handlers tolerate
/// redelivery: a `GameStart` for a running game is a no-op, and stale
/// `NextQuestion`/`QuestionTimeout` events fail their phase check.
#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    /// Activate a game that the scheduler just fenced into `pre_game`.
    GameStart { game_id: Uuid },
    /// Begin the announce phase of question `index`.
    NextQuestion { game_id: Uuid, index: usize },
    /// The accept window of question `index` elapsed.
    QuestionTimeout { game_id: Uuid, index: usize },
    /// Finalize with the given winners.
    GameEnd { game_id: Uuid, winners: Vec<Uuid> },
    /// Admin emergency end; the game transitions to cancelled at the actor's
    /// next mailbox poll.
    EmergencyEnd { game_id: Uuid },
}

impl GameEvent {
    pub fn game_id(&self) -> Uuid {
        match self {
            GameEvent::GameStart { game_id }
            | GameEvent::NextQuestion { game_id, .. }
            | GameEvent::QuestionTimeout { game_id, .. }
            | GameEvent::GameEnd { game_id, .. }
            | GameEvent::EmergencyEnd { game_id } => *game_id,
        }
    }
}
