use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{RwLock, mpsc};
use tokio::time::{self, Instant};
use uuid::Uuid;

use crate::engine::events::GameEvent;
use crate::engine::prize::split_prize;
use crate::engine::question::{judge_question, select_buttons};
use crate::engine::runtime::GameRuntime;
use crate::engine::{EngineDeps, GameEngine};
use crate::models::Question;
use crate::models::answer::AnswerRecord;
use crate::outbound::{OutboundMessage, Priority};

/// Where the actor currently is between mailbox polls.
#[derive(Clone, Copy)]
enum Phase {
    /// Waiting out the announcement window before `next`.
    PreRoll { next: usize },
    /// Question `index` is accepting answers until the armed deadline.
    Accepting { index: usize },
    /// Waiting out the inter-question gap before `next`.
    Gap { next: usize },
    /// A `gameEnd` is in the mailbox; nothing further may transition.
    Closing,
}

enum AfterQuestion {
    Continue { next: usize },
    End { winners: Vec<Uuid> },
    Abort,
}

/// The single writer of one game's state.
///
/// Every transition is driven by a `GameEvent` drained from the mailbox, so
/// bus delivery stays FIFO per game. Timers and the early-completion signal
/// do not act on state themselves: when one fires, the actor enqueues the
/// matching `NextQuestion`/`QuestionTimeout` event onto its own mailbox and
/// the handler performs the step. The webhook ingress path only takes short
/// locks on the shared runtime and pokes the per-question `Notify`.
pub(crate) struct GameActor {
    pub(crate) engine: Arc<GameEngine>,
    pub(crate) deps: EngineDeps,
    pub(crate) game_id: Uuid,
    pub(crate) questions: Vec<Question>,
    pub(crate) runtime: Arc<RwLock<GameRuntime>>,
    pub(crate) tx: mpsc::UnboundedSender<GameEvent>,
    pub(crate) rx: mpsc::UnboundedReceiver<GameEvent>,
}

impl GameActor {
    pub(crate) async fn run(mut self) {
        let announcement = {
            let rt = self.runtime.read().await;
            (
                rt.alive_handles(),
                OutboundMessage::GameStarting {
                    total_questions: self.questions.len(),
                    prize_pool: rt.prize_pool,
                },
            )
        };
        self.deps.outbound.enqueue_all(
            announcement.0.iter().map(String::as_str),
            Priority::High,
            &announcement.1,
        );
        tracing::info!(game_id = %self.game_id, players = announcement.0.len(), "game starting");

        let mut phase = Phase::PreRoll { next: 0 };
        // The armed timer, when it fires, publishes an event rather than
        // acting on state; `None` means no timer is pending.
        let mut timer: Option<Instant> = Some(Instant::now() + self.deps.config.pre_roll);
        let mut signal = self.runtime.read().await.all_answered.clone();
        let mut started = false;

        loop {
            let accepting = matches!(phase, Phase::Accepting { .. });
            let deadline = timer.unwrap_or_else(Instant::now);
            tokio::select! {
                maybe_event = self.rx.recv() => {
                    let Some(event) = maybe_event else { return };
                    match event {
                        GameEvent::GameStart { .. } => {} // redelivery, already running
                        GameEvent::NextQuestion { index, .. } => {
                            let expected = match phase {
                                Phase::PreRoll { next } | Phase::Gap { next } => Some(next),
                                Phase::Accepting { .. } | Phase::Closing => None,
                            };
                            if expected == Some(index) {
                                let (at, fresh) = self.begin_question(index, &mut started).await;
                                timer = Some(at);
                                signal = fresh;
                                phase = Phase::Accepting { index };
                            }
                        }
                        GameEvent::QuestionTimeout { index, .. } => {
                            if matches!(phase, Phase::Accepting { index: i } if i == index) {
                                match self.finish_question(index).await {
                                    AfterQuestion::Continue { next } => {
                                        phase = Phase::Gap { next };
                                        timer = Some(Instant::now() + self.deps.config.inter_question);
                                    }
                                    AfterQuestion::End { winners } => {
                                        phase = Phase::Closing;
                                        timer = None;
                                        let _ = self.tx.send(GameEvent::GameEnd {
                                            game_id: self.game_id,
                                            winners,
                                        });
                                    }
                                    AfterQuestion::Abort => return self.finalize_cancelled().await,
                                }
                            }
                        }
                        GameEvent::GameEnd { .. } => return self.finalize_win().await,
                        GameEvent::EmergencyEnd { .. } => {
                            tracing::warn!(game_id = %self.game_id, "emergency end honored");
                            return self.finalize_cancelled().await;
                        }
                    }
                }
                _ = time::sleep_until(deadline), if timer.is_some() => {
                    timer = None;
                    let event = match phase {
                        Phase::PreRoll { next } | Phase::Gap { next } => GameEvent::NextQuestion {
                            game_id: self.game_id,
                            index: next,
                        },
                        Phase::Accepting { index } => GameEvent::QuestionTimeout {
                            game_id: self.game_id,
                            index,
                        },
                        Phase::Closing => continue,
                    };
                    let _ = self.tx.send(event);
                }
                _ = signal.notified(), if accepting => {
                    if let Phase::Accepting { index } = phase {
                        tracing::debug!(game_id = %self.game_id, index, "all alive players answered early");
                        // Cancel the timer; the timeout event goes out now.
                        timer = None;
                        let _ = self.tx.send(GameEvent::QuestionTimeout {
                            game_id: self.game_id,
                            index,
                        });
                    }
                }
            }
        }
    }

    /// Announce question `index` to the alive players and arm its timer.
    async fn begin_question(
        &self,
        index: usize,
        started: &mut bool,
    ) -> (Instant, Arc<tokio::sync::Notify>) {
        let question = self.questions[index].clone();
        let start_ms = Utc::now().timestamp_millis();

        let (recipients, signal) = {
            let mut rt = self.runtime.write().await;
            rt.open_question(index, start_ms, question.time_limit_ms);
            (rt.alive_handles(), rt.all_answered.clone())
        };

        if !*started {
            *started = true;
            if let Err(e) = self.deps.persistence.mark_in_progress(self.game_id).await {
                tracing::error!(game_id = %self.game_id, error = %e, "failed to mark game in progress");
            }
        }
        if let Err(e) = self
            .deps
            .persistence
            .set_question_index(self.game_id, index as i32)
            .await
        {
            tracing::error!(game_id = %self.game_id, error = %e, "failed to persist question index");
        }

        let message = OutboundMessage::Question {
            number: index + 1,
            text: question.text.clone(),
            options: select_buttons(&question),
        };
        self.deps.outbound.enqueue_all(
            recipients.iter().map(String::as_str),
            Priority::High,
            &message,
        );
        tracing::info!(game_id = %self.game_id, index, recipients = recipients.len(), "question announced");

        let window = Duration::from_millis(question.time_limit_ms as u64) + self.deps.config.grace;
        (Instant::now() + window, signal)
    }

    /// Deferred evaluation, store write-back, bookkeeping, and result fan-out
    /// for question `index`.
    async fn finish_question(&self, index: usize) -> AfterQuestion {
        self.runtime.write().await.close_question();

        let Some(records) = self.read_answers_with_retry(index).await else {
            tracing::error!(
                game_id = %self.game_id,
                index,
                "answer store unavailable at evaluation, abandoning game"
            );
            return AfterQuestion::Abort;
        };

        let question = &self.questions[index];
        let alive = self.runtime.read().await.alive_ids();
        let verdicts = judge_question(&alive, &records, question, self.deps.config.grace.as_millis() as i64);

        // Write verdicts back so duplicate webhooks after evaluation cannot
        // race a different answer into the store.
        for (user_id, eval) in &verdicts.evaluations {
            if let Err(e) = self
                .deps
                .answers
                .update_evaluated(self.game_id, index, *user_id, *eval)
                .await
            {
                tracing::warn!(game_id = %self.game_id, index, user_id = %user_id, error = %e,
                    "failed to write back evaluation");
            }
        }

        {
            let mut rt = self.runtime.write().await;
            for user_id in &verdicts.survivors {
                rt.record_survival(*user_id);
            }
            for user_id in &verdicts.eliminated {
                rt.eliminate(*user_id, index);
            }
        }

        // Durable copies are best-effort; the in-memory verdict already
        // decided the game.
        if let Err(e) = self
            .deps
            .persistence
            .record_question_outcome(
                self.game_id,
                index as i32,
                &verdicts.survivors,
                &verdicts.eliminated,
            )
            .await
        {
            tracing::error!(game_id = %self.game_id, index, error = %e, "failed to record question outcome");
        }
        if let Err(e) = self.deps.persistence.persist_answers(&verdicts.rows).await {
            tracing::error!(game_id = %self.game_id, index, error = %e, "failed to persist answer rows");
        }

        {
            let rt = self.runtime.read().await;
            let survived = OutboundMessage::Survived {
                correct_answer: question.correct_answer.clone(),
            };
            let eliminated = OutboundMessage::Eliminated {
                correct_answer: question.correct_answer.clone(),
            };
            for user_id in &verdicts.survivors {
                if let Some(handle) = rt.handle_of(*user_id) {
                    self.deps
                        .outbound
                        .enqueue(handle, Priority::High, survived.clone());
                }
            }
            for user_id in &verdicts.eliminated {
                if let Some(handle) = rt.handle_of(*user_id) {
                    self.deps
                        .outbound
                        .enqueue(handle, Priority::High, eliminated.clone());
                }
            }
        }

        let alive_now = self.runtime.read().await.alive_ids();
        tracing::info!(
            game_id = %self.game_id,
            index,
            survivors = verdicts.survivors.len(),
            eliminated = verdicts.eliminated.len(),
            alive_now = alive_now.len(),
            "question evaluated"
        );

        if alive_now.len() <= 1 || index + 1 >= self.questions.len() {
            AfterQuestion::End { winners: alive_now }
        } else {
            AfterQuestion::Continue { next: index + 1 }
        }
    }

    async fn read_answers_with_retry(
        &self,
        index: usize,
    ) -> Option<HashMap<Uuid, AnswerRecord>> {
        for attempt in 0u32..3 {
            match self.deps.answers.get_all(self.game_id, index).await {
                Ok(records) => return Some(records),
                Err(e) => {
                    tracing::warn!(
                        game_id = %self.game_id,
                        index,
                        attempt,
                        error = %e,
                        "answer scan failed"
                    );
                    if attempt < 2 {
                        time::sleep(Duration::from_millis(200 << attempt)).await;
                    }
                }
            }
        }
        None
    }

    /// Crown the survivors, split the pot, tell everyone, and release state.
    async fn finalize_win(self) {
        let (winners, prize_pool, outcomes) = {
            let mut rt = self.runtime.write().await;
            let winners = rt.crown_survivors();
            let outcomes: Vec<(String, bool)> = rt
                .players
                .values()
                .map(|p| (p.handle.clone(), winners.contains(&p.user_id)))
                .collect();
            (winners, rt.prize_pool, outcomes)
        };

        let individual_prize = split_prize(prize_pool, winners.len());
        if let Err(e) = self
            .deps
            .persistence
            .finish_game(self.game_id, &winners, Utc::now())
            .await
        {
            tracing::error!(game_id = %self.game_id, error = %e, "failed to persist finished game");
        }

        let winner_message = if winners.len() == 1 {
            OutboundMessage::WinnerSingle {
                prize: individual_prize,
            }
        } else {
            OutboundMessage::WinnerMany {
                winners: winners.len(),
                prize_pool,
                individual_prize,
            }
        };
        for (handle, won) in &outcomes {
            let message = if *won && !winners.is_empty() {
                winner_message.clone()
            } else {
                OutboundMessage::GameOver
            };
            self.deps.outbound.enqueue(handle, Priority::High, message);
        }

        tracing::info!(
            game_id = %self.game_id,
            winner_count = winners.len(),
            individual_prize,
            "game finished"
        );
        self.release().await;
    }

    /// Abandon the game: persist `cancelled`, apologize to the whole roster,
    /// and release state.
    async fn finalize_cancelled(self) {
        if let Err(e) = self.deps.persistence.cancel_game(self.game_id).await {
            tracing::error!(game_id = %self.game_id, error = %e, "failed to persist cancelled game");
        }
        let handles = self.runtime.read().await.all_handles();
        self.deps.outbound.enqueue_all(
            handles.iter().map(String::as_str),
            Priority::High,
            &OutboundMessage::Apology,
        );
        tracing::warn!(game_id = %self.game_id, "game cancelled");
        self.release().await;
    }

    async fn release(self) {
        if let Err(e) = self.deps.answers.clear(self.game_id).await {
            tracing::warn!(game_id = %self.game_id, error = %e, "failed to clear answer keys");
        }
        self.engine.evict(self.game_id).await;
    }
}
