// Answer store: the per-(game, question, user) record of submitted answers.
//
// The store is the only cross-process synchronizer for answer uniqueness:
// concurrent webhook deliveries may race here, but the conditional write
// guarantees exactly one stored record per player per question.

mod redis;

pub use self::redis::RedisAnswerStore;

use std::collections::HashMap;

use async_trait::async_trait;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::answer::{AnswerEvaluation, AnswerRecord};

/// Result of a conditional answer write.
#[derive(Debug, Clone, PartialEq)]
pub enum PutOutcome {
    /// This record won the slot.
    Stored,
    /// A prior record exists; it is returned untouched.
    Duplicate(AnswerRecord),
}

/// Abstract per-question answer store with TTL'd records.
#[async_trait]
pub trait AnswerStore: Send + Sync {
    /// Store `record` iff no record exists for the key yet.
    async fn put(
        &self,
        game_id: Uuid,
        question_index: usize,
        user_id: Uuid,
        record: AnswerRecord,
    ) -> Result<PutOutcome, AppError>;

    /// Single-record lookup.
    async fn get(
        &self,
        game_id: Uuid,
        question_index: usize,
        user_id: Uuid,
    ) -> Result<Option<AnswerRecord>, AppError>;

    /// All records for one question, keyed by user id. Implementations must
    /// iterate with a cursor rather than blocking the store.
    async fn get_all(
        &self,
        game_id: Uuid,
        question_index: usize,
    ) -> Result<HashMap<Uuid, AnswerRecord>, AppError>;

    /// Overwrite the evaluation fields of an existing record, preserving its
    /// remaining TTL.
    async fn update_evaluated(
        &self,
        game_id: Uuid,
        question_index: usize,
        user_id: Uuid,
        eval: AnswerEvaluation,
    ) -> Result<(), AppError>;

    /// Delete every record a finished game left behind. Returns the number of
    /// keys removed.
    async fn clear(&self, game_id: Uuid) -> Result<u64, AppError>;
}
