use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};

use lru::LruCache;
use uuid::Uuid;

use crate::db::{GamePersistence, UserRepository};
use crate::engine::question::normalize_answer;
use crate::engine::{AnswerIngress, GameEngine};
use crate::outbound::{OutboundMessage, OutboundQueue, Priority};
use crate::webhook::envelope::WebhookEnvelope;

/// Duplicate-webhook window: the transport redelivers generously, so the
/// cache is sized well past any realistic burst.
const IDEMPOTENCY_CAPACITY: usize = 10_000;

/// What an inbound message asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    Register,
    Join,
    Answer(String),
    Help,
    Unknown,
}

/// Keyword commands win over answer text; anything else is treated as an
/// answer attempt and falls through to `Unknown` only when no game wants it.
pub fn classify(body: &str) -> Intent {
    match normalize_answer(body).as_str() {
        "register" => Intent::Register,
        "join" => Intent::Join,
        "help" => Intent::Help,
        "" => Intent::Unknown,
        _ => Intent::Answer(body.to_string()),
    }
}

/// Translates transport events into domain intents and hands them to the
/// engine. The HTTP handler ACKs synchronously; everything here runs on a
/// detached task.
pub struct WebhookDispatcher {
    engine: Arc<GameEngine>,
    persistence: Arc<dyn GamePersistence>,
    users: UserRepository,
    outbound: OutboundQueue,
    seen: Mutex<LruCache<String, ()>>,
}

impl WebhookDispatcher {
    pub fn new(
        engine: Arc<GameEngine>,
        persistence: Arc<dyn GamePersistence>,
        users: UserRepository,
        outbound: OutboundQueue,
    ) -> Self {
        Self {
            engine,
            persistence,
            users,
            outbound,
            seen: Mutex::new(LruCache::new(
                NonZeroUsize::new(IDEMPOTENCY_CAPACITY).unwrap(),
            )),
        }
    }

    /// True when this transport message id was already processed.
    fn seen_before(&self, message_id: &str) -> bool {
        let mut seen = self.seen.lock().expect("idempotency cache poisoned");
        seen.put(message_id.to_string(), ()).is_some()
    }

    pub async fn dispatch(&self, envelope: WebhookEnvelope) {
        for (message, display_name) in envelope.messages() {
            if self.seen_before(&message.id) {
                tracing::debug!(message_id = %message.id, "duplicate webhook short-circuited");
                continue;
            }
            let Some(body) = message.body() else {
                tracing::debug!(message_id = %message.id, kind = ?message.kind, "unsupported message kind");
                continue;
            };

            let user = match self
                .users
                .get_or_create_by_handle(&message.from, display_name)
                .await
            {
                Ok(user) => user,
                Err(e) => {
                    tracing::error!(handle = %message.from, error = %e, "cannot resolve user");
                    continue;
                }
            };

            match classify(body) {
                Intent::Register | Intent::Join => self.join(user.id, &user.handle).await,
                Intent::Help => {
                    self.outbound
                        .enqueue(&user.handle, Priority::Low, OutboundMessage::Help);
                }
                Intent::Answer(text) => {
                    match self.engine.submit_answer(user.id, &text).await {
                        AnswerIngress::NoActiveGame => {
                            // Not playing anywhere: free text outside a game
                            // gets the no-game copy.
                            self.outbound.enqueue(
                                &user.handle,
                                Priority::Low,
                                OutboundMessage::NoGame,
                            );
                        }
                        outcome => {
                            tracing::debug!(user_id = %user.id, ?outcome, "answer absorbed");
                        }
                    }
                }
                Intent::Unknown => {}
            }
        }
    }

    /// Register the sender into the soonest scheduled game.
    async fn join(&self, user_id: Uuid, handle: &str) {
        match self.persistence.next_scheduled().await {
            Ok(Some(game)) => {
                match self.persistence.register_player(game.id, user_id).await {
                    Ok(()) => {
                        tracing::info!(%user_id, game_id = %game.id, "player joined game");
                        self.outbound.enqueue(
                            handle,
                            Priority::Normal,
                            OutboundMessage::JoinConfirmed,
                        );
                    }
                    Err(e) => {
                        tracing::warn!(%user_id, game_id = %game.id, error = %e, "join rejected");
                        self.outbound
                            .enqueue(handle, Priority::Low, OutboundMessage::NoGame);
                    }
                }
            }
            Ok(None) => {
                self.outbound
                    .enqueue(handle, Priority::Low, OutboundMessage::NoGame);
            }
            Err(e) => {
                tracing::error!(%user_id, error = %e, "cannot look up next game");
                self.outbound
                    .enqueue(handle, Priority::Low, OutboundMessage::TryAgain);
            }
        }
    }
}
