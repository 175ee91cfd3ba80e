// Shared test doubles: in-memory implementations of the engine's injection
// seams (answer store, persistence, chat transport) plus a wired harness.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use uuid::Uuid;

use qrush_be::config::EngineConfig;
use qrush_be::db::{GamePersistence, RosterEntry};
use qrush_be::engine::{EngineDeps, GameEngine};
use qrush_be::errors::AppError;
use qrush_be::models::answer::{AnswerEvaluation, AnswerRecord};
use qrush_be::models::{Game, GameStatus, PlayerAnswer, PlayerStatus, Question};
use qrush_be::outbound::{CircuitBreaker, OutboundQueue};
use qrush_be::store::{AnswerStore, PutOutcome};
use qrush_be::transport::{Button, ChatTransport};

// ---------------------------------------------------------------------------
// Answer store double
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MemoryAnswerStore {
    records: Mutex<HashMap<(Uuid, usize, Uuid), AnswerRecord>>,
    fail_put: AtomicBool,
    fail_get_all: AtomicBool,
}

impl MemoryAnswerStore {
    pub fn fail_puts(&self, on: bool) {
        self.fail_put.store(on, Ordering::SeqCst);
    }

    pub fn fail_scans(&self, on: bool) {
        self.fail_get_all.store(on, Ordering::SeqCst);
    }

    pub fn record_count(&self, game_id: Uuid, question_index: usize) -> usize {
        self.records
            .lock()
            .unwrap()
            .keys()
            .filter(|(g, i, _)| *g == game_id && *i == question_index)
            .count()
    }

    pub fn record(
        &self,
        game_id: Uuid,
        question_index: usize,
        user_id: Uuid,
    ) -> Option<AnswerRecord> {
        self.records
            .lock()
            .unwrap()
            .get(&(game_id, question_index, user_id))
            .cloned()
    }
}

#[async_trait]
impl AnswerStore for MemoryAnswerStore {
    async fn put(
        &self,
        game_id: Uuid,
        question_index: usize,
        user_id: Uuid,
        record: AnswerRecord,
    ) -> Result<PutOutcome, AppError> {
        if self.fail_put.load(Ordering::SeqCst) {
            return Err(AppError::StoreUnavailable("injected outage".into()));
        }
        let mut records = self.records.lock().unwrap();
        match records.entry((game_id, question_index, user_id)) {
            std::collections::hash_map::Entry::Occupied(existing) => {
                Ok(PutOutcome::Duplicate(existing.get().clone()))
            }
            std::collections::hash_map::Entry::Vacant(slot) => {
                slot.insert(record);
                Ok(PutOutcome::Stored)
            }
        }
    }

    async fn get(
        &self,
        game_id: Uuid,
        question_index: usize,
        user_id: Uuid,
    ) -> Result<Option<AnswerRecord>, AppError> {
        Ok(self.record(game_id, question_index, user_id))
    }

    async fn get_all(
        &self,
        game_id: Uuid,
        question_index: usize,
    ) -> Result<HashMap<Uuid, AnswerRecord>, AppError> {
        if self.fail_get_all.load(Ordering::SeqCst) {
            return Err(AppError::StoreUnavailable("injected outage".into()));
        }
        let records = self.records.lock().unwrap();
        Ok(records
            .iter()
            .filter(|((g, i, _), _)| *g == game_id && *i == question_index)
            .map(|((_, _, u), r)| (*u, r.clone()))
            .collect())
    }

    async fn update_evaluated(
        &self,
        game_id: Uuid,
        question_index: usize,
        user_id: Uuid,
        eval: AnswerEvaluation,
    ) -> Result<(), AppError> {
        let mut records = self.records.lock().unwrap();
        let record = records
            .get_mut(&(game_id, question_index, user_id))
            .ok_or_else(|| AppError::NotFound("answer record".into()))?;
        record.evaluated = true;
        record.is_on_time = Some(eval.is_on_time);
        record.is_correct = Some(eval.is_correct);
        Ok(())
    }

    async fn clear(&self, game_id: Uuid) -> Result<u64, AppError> {
        let mut records = self.records.lock().unwrap();
        let before = records.len();
        records.retain(|(g, _, _), _| *g != game_id);
        Ok((before - records.len()) as u64)
    }
}

// ---------------------------------------------------------------------------
// Persistence double
// ---------------------------------------------------------------------------

#[derive(Default)]
struct PersistenceInner {
    games: HashMap<Uuid, Game>,
    questions: HashMap<Uuid, Vec<Question>>,
    roster: HashMap<Uuid, Vec<RosterEntry>>,
    question_indexes: Vec<i32>,
    answer_rows: Vec<PlayerAnswer>,
    finished: HashMap<Uuid, Vec<Uuid>>,
    cancelled: Vec<Uuid>,
}

#[derive(Default)]
pub struct MemoryGamePersistence {
    inner: Mutex<PersistenceInner>,
}

impl MemoryGamePersistence {
    pub fn add_game(&self, game: Game) {
        self.inner.lock().unwrap().games.insert(game.id, game);
    }

    pub fn add_question(&self, question: Question) {
        let mut guard = self.inner.lock().unwrap();
        let inner = &mut *guard;
        let game_id = question.game_id;
        let list = inner.questions.entry(game_id).or_default();
        list.push(question);
        list.sort_by_key(|q| q.question_order);
        let total = list.len() as i32;
        if let Some(game) = inner.games.get_mut(&game_id) {
            game.total_questions = total;
        }
    }

    pub fn add_player(&self, game_id: Uuid, entry: RosterEntry) {
        self.inner
            .lock()
            .unwrap()
            .roster
            .entry(game_id)
            .or_default()
            .push(entry);
    }

    pub fn status_of(&self, game_id: Uuid) -> Option<GameStatus> {
        self.inner
            .lock()
            .unwrap()
            .games
            .get(&game_id)
            .map(|g| g.status)
    }

    pub fn winners_of(&self, game_id: Uuid) -> Option<Vec<Uuid>> {
        self.inner.lock().unwrap().finished.get(&game_id).cloned()
    }

    pub fn was_cancelled(&self, game_id: Uuid) -> bool {
        self.inner.lock().unwrap().cancelled.contains(&game_id)
    }

    pub fn question_indexes(&self) -> Vec<i32> {
        self.inner.lock().unwrap().question_indexes.clone()
    }

    pub fn answer_rows(&self) -> Vec<PlayerAnswer> {
        self.inner.lock().unwrap().answer_rows.clone()
    }
}

#[async_trait]
impl GamePersistence for MemoryGamePersistence {
    async fn due_scheduled(&self, now: DateTime<Utc>) -> Result<Vec<Game>, AppError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .games
            .values()
            .filter(|g| g.status == GameStatus::Scheduled && g.start_at <= now)
            .cloned()
            .collect())
    }

    async fn expire_overdue(&self, cutoff: DateTime<Utc>) -> Result<u64, AppError> {
        let mut inner = self.inner.lock().unwrap();
        let mut flipped = 0;
        for game in inner.games.values_mut() {
            if game.status == GameStatus::Scheduled && game.start_at < cutoff {
                game.status = GameStatus::Expired;
                flipped += 1;
            }
        }
        Ok(flipped)
    }

    async fn try_begin(&self, game_id: Uuid) -> Result<bool, AppError> {
        let mut inner = self.inner.lock().unwrap();
        let Some(game) = inner.games.get_mut(&game_id) else {
            return Ok(false);
        };
        if game.status == GameStatus::Scheduled {
            game.status = GameStatus::PreGame;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    async fn mark_in_progress(&self, game_id: Uuid) -> Result<(), AppError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(game) = inner.games.get_mut(&game_id) {
            game.status = GameStatus::InProgress;
        }
        Ok(())
    }

    async fn game(&self, game_id: Uuid) -> Result<Game, AppError> {
        self.inner
            .lock()
            .unwrap()
            .games
            .get(&game_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("game {game_id}")))
    }

    async fn next_scheduled(&self) -> Result<Option<Game>, AppError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .games
            .values()
            .filter(|g| g.status == GameStatus::Scheduled)
            .min_by_key(|g| g.start_at)
            .cloned())
    }

    async fn questions(&self, game_id: Uuid) -> Result<Vec<Question>, AppError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .questions
            .get(&game_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn roster(&self, game_id: Uuid) -> Result<Vec<RosterEntry>, AppError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .roster
            .get(&game_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn register_player(&self, game_id: Uuid, user_id: Uuid) -> Result<(), AppError> {
        let mut inner = self.inner.lock().unwrap();
        let roster = inner.roster.entry(game_id).or_default();
        if !roster.iter().any(|r| r.user_id == user_id) {
            roster.push(RosterEntry {
                user_id,
                handle: format!("h-{user_id}"),
                status: PlayerStatus::Registered,
            });
        }
        Ok(())
    }

    async fn activate_roster(&self, game_id: Uuid) -> Result<(), AppError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(roster) = inner.roster.get_mut(&game_id) {
            for entry in roster {
                entry.status = PlayerStatus::Alive;
            }
        }
        Ok(())
    }

    async fn set_question_index(&self, _game_id: Uuid, index: i32) -> Result<(), AppError> {
        self.inner.lock().unwrap().question_indexes.push(index);
        Ok(())
    }

    async fn record_question_outcome(
        &self,
        _game_id: Uuid,
        _question_index: i32,
        _survivors: &[Uuid],
        _eliminated: &[Uuid],
    ) -> Result<(), AppError> {
        Ok(())
    }

    async fn persist_answers(&self, rows: &[PlayerAnswer]) -> Result<(), AppError> {
        self.inner
            .lock()
            .unwrap()
            .answer_rows
            .extend(rows.iter().cloned());
        Ok(())
    }

    async fn finish_game(
        &self,
        game_id: Uuid,
        winners: &[Uuid],
        ended_at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(game) = inner.games.get_mut(&game_id) {
            game.status = GameStatus::Finished;
            game.winner_count = winners.len() as i32;
            game.ended_at = Some(ended_at);
        }
        inner.finished.insert(game_id, winners.to_vec());
        Ok(())
    }

    async fn cancel_game(&self, game_id: Uuid) -> Result<(), AppError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(game) = inner.games.get_mut(&game_id) {
            game.status = GameStatus::Cancelled;
        }
        inner.cancelled.push(game_id);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Transport double
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct SentMessage {
    pub to: String,
    pub body: String,
    pub buttons: Vec<Button>,
}

#[derive(Default)]
pub struct MockTransport {
    sent: Mutex<Vec<SentMessage>>,
}

impl MockTransport {
    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().unwrap().clone()
    }

    /// Message bodies delivered to one recipient, in order.
    pub fn bodies_to(&self, handle: &str) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.to == handle)
            .map(|m| m.body.clone())
            .collect()
    }
}

#[async_trait]
impl ChatTransport for MockTransport {
    async fn send_text(&self, to: &str, body: &str) -> Result<(), AppError> {
        self.sent.lock().unwrap().push(SentMessage {
            to: to.to_string(),
            body: body.to_string(),
            buttons: Vec::new(),
        });
        Ok(())
    }

    async fn send_buttons(
        &self,
        to: &str,
        body: &str,
        buttons: &[Button],
    ) -> Result<(), AppError> {
        self.sent.lock().unwrap().push(SentMessage {
            to: to.to_string(),
            body: body.to_string(),
            buttons: buttons.to_vec(),
        });
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

pub struct TestHarness {
    pub engine: Arc<GameEngine>,
    pub persistence: Arc<MemoryGamePersistence>,
    pub answers: Arc<MemoryAnswerStore>,
    pub transport: Arc<MockTransport>,
    pub outbound: OutboundQueue,
    pub config: EngineConfig,
}

/// Wire an engine against the in-memory doubles. Must run inside a tokio
/// runtime (the outbound queue spawns its workers immediately).
pub fn harness() -> TestHarness {
    let config = EngineConfig::default();
    let persistence = Arc::new(MemoryGamePersistence::default());
    let answers = Arc::new(MemoryAnswerStore::default());
    let transport = Arc::new(MockTransport::default());

    let breaker = Arc::new(CircuitBreaker::new(
        "transport",
        config.cb_failure_threshold,
        config.cb_recovery,
        config.cb_close_threshold,
    ));
    let outbound = OutboundQueue::spawn(transport.clone(), breaker, &config, 2, None);

    let store_breaker = Arc::new(CircuitBreaker::new(
        "answer-store",
        config.cb_failure_threshold,
        config.cb_recovery,
        config.cb_close_threshold,
    ));
    let engine = GameEngine::new(EngineDeps {
        persistence: persistence.clone(),
        answers: answers.clone(),
        outbound: outbound.clone(),
        store_breaker,
        config: config.clone(),
    });

    TestHarness {
        engine,
        persistence,
        answers,
        transport,
        outbound,
        config,
    }
}

// ---------------------------------------------------------------------------
// Fixture builders
// ---------------------------------------------------------------------------

pub fn scheduled_game(prize_pool: f64, start_offset_secs: i64) -> Game {
    Game {
        id: Uuid::new_v4(),
        status: GameStatus::Scheduled,
        start_at: Utc::now() + ChronoDuration::seconds(start_offset_secs),
        prize_pool,
        total_questions: 0,
        current_question_index: 0,
        winner_count: 0,
        ended_at: None,
        created_at: Utc::now(),
    }
}

pub fn player(n: usize) -> RosterEntry {
    RosterEntry {
        user_id: Uuid::new_v4(),
        handle: format!("1555{n:07}"),
        status: PlayerStatus::Registered,
    }
}

pub fn question(game_id: Uuid, order: i32, text: &str, correct: &str, options: [&str; 4]) -> Question {
    Question {
        id: Uuid::new_v4(),
        game_id,
        question_order: order,
        text: text.to_string(),
        correct_answer: correct.to_string(),
        options: options.iter().map(|s| s.to_string()).collect(),
        time_limit_ms: 10_000,
    }
}
