use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use redis::AsyncCommands;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::RedisKey;
use crate::models::answer::{AnswerEvaluation, AnswerRecord};
use crate::state::RedisClient;
use crate::store::{AnswerStore, PutOutcome};

const SCAN_PAGE: usize = 100;

/// Redis-backed answer store.
///
/// Records are JSON values under `qrush:answers:<game>:<question>:<user>`
/// with a TTL covering the longest admissible game plus a buffer. Uniqueness
/// is enforced by `SET NX`, which makes the store safe against concurrent
/// webhook deliveries across processes.
pub struct RedisAnswerStore {
    redis: RedisClient,
    ttl: Duration,
}

impl RedisAnswerStore {
    pub fn new(redis: RedisClient, ttl: Duration) -> Self {
        Self { redis, ttl }
    }

    async fn conn(&self) -> Result<bb8::PooledConnection<'_, bb8_redis::RedisConnectionManager>, AppError> {
        self.redis
            .get()
            .await
            .map_err(|e| AppError::StoreUnavailable(format!("redis pool: {e}")))
    }

    /// Cursor-based key scan; never issues KEYS.
    async fn scan_keys(&self, pattern: &str) -> Result<Vec<String>, AppError> {
        let mut conn = self.conn().await?;
        let mut keys = Vec::new();
        let mut cursor: u64 = 0;
        loop {
            let (next, page): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(SCAN_PAGE)
                .query_async(&mut *conn)
                .await
                .map_err(AppError::RedisCommandError)?;
            keys.extend(page);
            cursor = next;
            if cursor == 0 {
                break;
            }
        }
        Ok(keys)
    }
}

#[async_trait]
impl AnswerStore for RedisAnswerStore {
    async fn put(
        &self,
        game_id: Uuid,
        question_index: usize,
        user_id: Uuid,
        record: AnswerRecord,
    ) -> Result<PutOutcome, AppError> {
        let key = RedisKey::answer(game_id, question_index, user_id);
        let json =
            serde_json::to_string(&record).map_err(|e| AppError::Serialization(e.to_string()))?;

        let mut conn = self.conn().await?;

        // Two rounds tolerate the rare NX-loss-then-expiry race.
        for _ in 0..2 {
            // SET NX EX: one atomic conditional write with the TTL attached.
            let stored: Option<String> = redis::cmd("SET")
                .arg(&key)
                .arg(&json)
                .arg("NX")
                .arg("EX")
                .arg(self.ttl.as_secs())
                .query_async(&mut *conn)
                .await
                .map_err(AppError::RedisCommandError)?;
            if stored.is_some() {
                return Ok(PutOutcome::Stored);
            }
            let existing: Option<String> =
                conn.get(&key).await.map_err(AppError::RedisCommandError)?;
            if let Some(raw) = existing {
                let prior: AnswerRecord = serde_json::from_str(&raw)
                    .map_err(|e| AppError::Serialization(e.to_string()))?;
                return Ok(PutOutcome::Duplicate(prior));
            }
        }
        Err(AppError::StoreUnavailable(
            "conditional answer write did not settle".to_string(),
        ))
    }

    async fn get(
        &self,
        game_id: Uuid,
        question_index: usize,
        user_id: Uuid,
    ) -> Result<Option<AnswerRecord>, AppError> {
        let key = RedisKey::answer(game_id, question_index, user_id);
        let mut conn = self.conn().await?;
        let raw: Option<String> = conn.get(&key).await.map_err(AppError::RedisCommandError)?;
        raw.map(|s| {
            serde_json::from_str(&s).map_err(|e| AppError::Serialization(e.to_string()))
        })
        .transpose()
    }

    async fn get_all(
        &self,
        game_id: Uuid,
        question_index: usize,
    ) -> Result<HashMap<Uuid, AnswerRecord>, AppError> {
        let pattern = RedisKey::question_answers_pattern(game_id, question_index);
        let keys = self.scan_keys(&pattern).await?;
        let mut out = HashMap::with_capacity(keys.len());
        if keys.is_empty() {
            return Ok(out);
        }

        let mut conn = self.conn().await?;
        for chunk in keys.chunks(SCAN_PAGE) {
            let values: Vec<Option<String>> = redis::cmd("MGET")
                .arg(chunk)
                .query_async(&mut *conn)
                .await
                .map_err(AppError::RedisCommandError)?;
            for (key, raw) in chunk.iter().zip(values) {
                let Some(user_id) = RedisKey::user_of_answer_key(key) else {
                    tracing::warn!("skipping malformed answer key {key}");
                    continue;
                };
                // A key may expire between SCAN and MGET; skip it.
                if let Some(raw) = raw {
                    let record: AnswerRecord = serde_json::from_str(&raw)
                        .map_err(|e| AppError::Serialization(e.to_string()))?;
                    out.insert(user_id, record);
                }
            }
        }
        Ok(out)
    }

    async fn update_evaluated(
        &self,
        game_id: Uuid,
        question_index: usize,
        user_id: Uuid,
        eval: AnswerEvaluation,
    ) -> Result<(), AppError> {
        let key = RedisKey::answer(game_id, question_index, user_id);
        let mut conn = self.conn().await?;
        let raw: Option<String> = conn.get(&key).await.map_err(AppError::RedisCommandError)?;
        let Some(raw) = raw else {
            return Err(AppError::NotFound(format!("answer record {key}")));
        };
        let mut record: AnswerRecord =
            serde_json::from_str(&raw).map_err(|e| AppError::Serialization(e.to_string()))?;
        record.evaluated = true;
        record.is_on_time = Some(eval.is_on_time);
        record.is_correct = Some(eval.is_correct);

        let json =
            serde_json::to_string(&record).map_err(|e| AppError::Serialization(e.to_string()))?;
        // SET XX KEEPTTL: overwrite in place without resetting the expiry.
        let _: Option<String> = redis::cmd("SET")
            .arg(&key)
            .arg(&json)
            .arg("XX")
            .arg("KEEPTTL")
            .query_async(&mut *conn)
            .await
            .map_err(AppError::RedisCommandError)?;
        Ok(())
    }

    async fn clear(&self, game_id: Uuid) -> Result<u64, AppError> {
        let pattern = RedisKey::game_answers_pattern(game_id);
        let keys = self.scan_keys(&pattern).await?;
        if keys.is_empty() {
            return Ok(0);
        }
        let mut conn = self.conn().await?;
        let mut removed: u64 = 0;
        for chunk in keys.chunks(SCAN_PAGE) {
            let n: u64 = redis::cmd("DEL")
                .arg(chunk)
                .query_async(&mut *conn)
                .await
                .map_err(AppError::RedisCommandError)?;
            removed += n;
        }
        Ok(removed)
    }
}
