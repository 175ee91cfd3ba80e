// Game engine: per-game actors around a shared composition root.
//
// The engine owns a registry of active games. Each game gets one actor task
// (the single writer of its state), a mailbox for typed events, and a shared
// runtime that the webhook ingress path reads under short locks. Everything
// the engine touches is injected: persistence, the answer store, and the
// outbound queue.

mod actor;
pub mod events;
pub mod prize;
pub mod question;
pub mod runtime;
pub mod scheduler;

pub use events::GameEvent;
pub use scheduler::GameScheduler;

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use chrono::Utc;
use tokio::sync::{RwLock, mpsc};
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::db::GamePersistence;
use crate::engine::runtime::GameRuntime;
use crate::models::GameStatus;
use crate::models::answer::AnswerRecord;
use crate::outbound::{CircuitBreaker, OutboundMessage, OutboundQueue, Priority};
use crate::store::{AnswerStore, PutOutcome};

/// Everything a game actor needs, wired once at startup.
#[derive(Clone)]
pub struct EngineDeps {
    pub persistence: Arc<dyn GamePersistence>,
    pub answers: Arc<dyn AnswerStore>,
    pub outbound: OutboundQueue,
    pub store_breaker: Arc<CircuitBreaker>,
    pub config: EngineConfig,
}

struct GameHandle {
    mailbox: mpsc::UnboundedSender<GameEvent>,
    runtime: Arc<RwLock<GameRuntime>>,
}

/// How an inbound answer was absorbed. Returned to the dispatcher for
/// logging; the player-visible response is already on the outbound queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerIngress {
    /// First answer, stored.
    Stored,
    /// A prior answer already holds the slot.
    Duplicate,
    /// Sender is eliminated in this game.
    NotAlive,
    /// No question is accepting right now.
    WindowClosed,
    /// Sender is in no active game.
    NoActiveGame,
    /// The store rejected the write; the player was asked to retry.
    StoreRejected,
}

pub struct GameEngine {
    deps: EngineDeps,
    games: RwLock<HashMap<Uuid, GameHandle>>,
    /// Handed to spawned actors and supervisors so they can reach back.
    self_ref: Weak<GameEngine>,
}

impl GameEngine {
    pub fn new(deps: EngineDeps) -> Arc<Self> {
        Arc::new_cyclic(|weak| Self {
            deps,
            games: RwLock::new(HashMap::new()),
            self_ref: weak.clone(),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.deps.config
    }

    /// Deliver an event onto the bus. `GameStart` activates the game; every
    /// other event is routed FIFO into the owning actor's mailbox.
    pub async fn publish(&self, event: GameEvent) {
        match event {
            GameEvent::GameStart { game_id } => {
                if self.is_active(game_id).await {
                    tracing::debug!(%game_id, "gameStart redelivered for active game, ignoring");
                    return;
                }
                self.spawn_game(game_id).await;
            }
            other => {
                let game_id = other.game_id();
                let games = self.games.read().await;
                match games.get(&game_id) {
                    Some(handle) => {
                        let _ = handle.mailbox.send(other);
                    }
                    None => {
                        tracing::warn!(%game_id, event = ?other, "event for inactive game dropped");
                    }
                }
            }
        }
    }

    pub async fn is_active(&self, game_id: Uuid) -> bool {
        self.games.read().await.contains_key(&game_id)
    }

    /// Answer ingress. Validates against the in-memory roster, stores through
    /// the answer store's conditional write, and signals early completion
    /// when the last alive player gets a record in.
    ///
    /// This path deliberately does not touch the actor mailbox: the store
    /// write is the synchronizer that keeps concurrent deliveries down to one
    /// accepted answer.
    pub async fn submit_answer(&self, user_id: Uuid, text: &str) -> AnswerIngress {
        let Some((game_id, runtime)) = self.locate_player(user_id).await else {
            return AnswerIngress::NoActiveGame;
        };

        let (index, start_ms, limit_ms, handle) = {
            let rt = runtime.read().await;
            let Some(handle) = rt.handle_of(user_id).map(str::to_string) else {
                return AnswerIngress::NoActiveGame;
            };
            if !rt.question_open {
                return AnswerIngress::WindowClosed;
            }
            if !rt.is_alive(user_id) {
                drop(rt);
                let mut rt = runtime.write().await;
                // One lock notice per question per player.
                if rt.lock_notices.insert(user_id) {
                    self.deps
                        .outbound
                        .enqueue(&handle, Priority::Normal, OutboundMessage::AlreadyOut);
                }
                return AnswerIngress::NotAlive;
            }
            (
                rt.current_index,
                rt.question_start_unix_ms,
                rt.question_time_limit_ms,
                handle,
            )
        };

        let record = AnswerRecord::new(
            question::normalize_answer(text),
            Utc::now().timestamp_millis(),
            start_ms,
            limit_ms,
        );

        let outcome = self
            .deps
            .store_breaker
            .execute(self.deps.answers.put(game_id, index, user_id, record))
            .await;

        match outcome {
            Ok(PutOutcome::Stored) => {
                {
                    let mut rt = runtime.write().await;
                    // The question may have closed while the store write was in
                    // flight; the record will simply miss the evaluation scan.
                    if rt.question_open && rt.current_index == index && rt.record_answered(user_id)
                    {
                        rt.all_answered.notify_one();
                    }
                }
                self.deps
                    .outbound
                    .enqueue(&handle, Priority::Normal, OutboundMessage::AnswerReceived);
                AnswerIngress::Stored
            }
            Ok(PutOutcome::Duplicate(_)) => {
                self.deps
                    .outbound
                    .enqueue(&handle, Priority::Normal, OutboundMessage::AnswerLocked);
                AnswerIngress::Duplicate
            }
            Err(e) => {
                tracing::warn!(%game_id, %user_id, error = %e, "answer write rejected");
                self.deps
                    .outbound
                    .enqueue(&handle, Priority::Normal, OutboundMessage::TryAgain);
                AnswerIngress::StoreRejected
            }
        }
    }

    /// Admin emergency end. Routed through the bus when the game is active;
    /// otherwise the persisted row is cancelled directly.
    pub async fn emergency_end(&self, game_id: Uuid) -> Result<(), crate::errors::AppError> {
        if self.is_active(game_id).await {
            self.publish(GameEvent::EmergencyEnd { game_id }).await;
            Ok(())
        } else {
            self.deps.persistence.cancel_game(game_id).await
        }
    }

    async fn locate_player(&self, user_id: Uuid) -> Option<(Uuid, Arc<RwLock<GameRuntime>>)> {
        let games = self.games.read().await;
        for (game_id, handle) in games.iter() {
            if handle.runtime.read().await.players.contains_key(&user_id) {
                return Some((*game_id, Arc::clone(&handle.runtime)));
            }
        }
        None
    }

    /// Load a fenced game from persistence and bring its actor up.
    async fn spawn_game(&self, game_id: Uuid) {
        let Some(engine) = self.self_ref.upgrade() else {
            return;
        };
        let game = match self.deps.persistence.game(game_id).await {
            Ok(game) => game,
            Err(e) => {
                tracing::error!(%game_id, error = %e, "cannot load game to start");
                return;
            }
        };
        if matches!(
            game.status,
            GameStatus::Finished | GameStatus::Cancelled | GameStatus::Expired
        ) {
            tracing::warn!(%game_id, status = ?game.status, "refusing to start terminal game");
            return;
        }

        let questions = match self.deps.persistence.questions(game_id).await {
            Ok(questions) => questions,
            Err(e) => {
                tracing::error!(%game_id, error = %e, "cannot load questions");
                return;
            }
        };
        let roster = match self.deps.persistence.roster(game_id).await {
            Ok(roster) => roster,
            Err(e) => {
                tracing::error!(%game_id, error = %e, "cannot load roster");
                return;
            }
        };
        if questions.is_empty() || roster.is_empty() {
            tracing::warn!(
                %game_id,
                questions = questions.len(),
                players = roster.len(),
                "cancelling unplayable game"
            );
            if let Err(e) = self.deps.persistence.cancel_game(game_id).await {
                tracing::error!(%game_id, error = %e, "failed to cancel unplayable game");
            }
            return;
        }

        if let Err(e) = self.deps.persistence.activate_roster(game_id).await {
            tracing::error!(%game_id, error = %e, "failed to activate roster, continuing in memory");
        }

        let runtime = Arc::new(RwLock::new(GameRuntime::new(&game, &roster, questions.len())));
        let (tx, rx) = mpsc::unbounded_channel();
        {
            let mut games = self.games.write().await;
            games.insert(
                game_id,
                GameHandle {
                    mailbox: tx.clone(),
                    runtime: Arc::clone(&runtime),
                },
            );
        }

        let game_actor = actor::GameActor {
            engine: Arc::clone(&engine),
            deps: self.deps.clone(),
            game_id,
            questions,
            runtime: Arc::clone(&runtime),
            tx,
            rx,
        };
        let task = tokio::spawn(game_actor.run());

        // Supervisor: a panicked actor must not strand the game silently.
        tokio::spawn(async move {
            match task.await {
                Ok(()) => {}
                Err(e) if e.is_panic() => {
                    tracing::error!(%game_id, "game actor panicked, cancelling game");
                    if let Err(err) = engine.deps.persistence.cancel_game(game_id).await {
                        tracing::error!(%game_id, error = %err, "failed to cancel after panic");
                    }
                    let handles = runtime.read().await.all_handles();
                    engine.deps.outbound.enqueue_all(
                        handles.iter().map(String::as_str),
                        Priority::High,
                        &OutboundMessage::Apology,
                    );
                    engine.evict(game_id).await;
                }
                Err(_) => {}
            }
        });
    }

    pub(crate) async fn evict(&self, game_id: Uuid) {
        self.games.write().await.remove(&game_id);
        tracing::debug!(%game_id, "game state released");
    }
}
