use std::time::Duration;

use crate::errors::AppError;

/// Process-level configuration read once at startup.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub redis_url: String,
    pub database_url: String,
    /// WhatsApp Cloud API base URL, e.g. `https://graph.facebook.com/v19.0`.
    pub transport_base_url: String,
    /// Phone-number id the outbound messages are sent from.
    pub transport_sender_id: String,
    /// Bearer token for the transport API.
    pub transport_token: String,
    /// Shared secret the webhook endpoint verifies against.
    pub webhook_secret: String,
    /// Static credential for the admin surface (`x-admin-key` header).
    pub admin_key: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        Ok(Self {
            redis_url: require("REDIS_URL")?,
            database_url: require("DATABASE_URL")?,
            transport_base_url: require("WA_API_BASE_URL")?,
            transport_sender_id: require("WA_PHONE_NUMBER_ID")?,
            transport_token: require("WA_ACCESS_TOKEN")?,
            webhook_secret: require("WEBHOOK_SECRET")?,
            admin_key: require("ADMIN_API_KEY")?,
        })
    }
}

fn require(name: &str) -> Result<String, AppError> {
    std::env::var(name).map_err(|_| AppError::EnvError(format!("{name} is not set")))
}

/// Engine timing and resilience tunables.
///
/// Every field has an environment override; defaults match the operator
/// runbook values.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Extra window beyond the question time limit within which a submission
    /// still counts as on-time.
    pub grace: Duration,
    /// Default per-question time limit, used when a question carries none.
    pub question_time_limit: Duration,
    /// Delay between the game-start announcement and question 0.
    pub pre_roll: Duration,
    /// Gap between one question's results and the next announcement.
    pub inter_question: Duration,
    /// Scheduler sweep period.
    pub scheduler_period: Duration,
    /// How long past `start_at` a still-scheduled game may start before it
    /// expires instead.
    pub expiry_grace: Duration,
    /// Maximum delivery attempts per outbound message.
    pub outbound_retry_max: u32,
    /// Hard timeout applied above the transport on every send.
    pub outbound_send_timeout: Duration,
    /// Consecutive failures that open a circuit breaker.
    pub cb_failure_threshold: u32,
    /// How long an open breaker waits before a half-open probe.
    pub cb_recovery: Duration,
    /// Consecutive half-open successes that close a breaker.
    pub cb_close_threshold: u32,
    /// TTL on answer-store keys.
    pub answer_ttl: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            grace: Duration::from_millis(1_000),
            question_time_limit: Duration::from_millis(10_000),
            pre_roll: Duration::from_millis(2_000),
            inter_question: Duration::from_millis(3_000),
            scheduler_period: Duration::from_millis(2_000),
            expiry_grace: Duration::from_millis(60_000),
            outbound_retry_max: 3,
            outbound_send_timeout: Duration::from_secs(10),
            cb_failure_threshold: 10,
            cb_recovery: Duration::from_millis(30_000),
            cb_close_threshold: 5,
            answer_ttl: Duration::from_secs(300),
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            grace: millis_var("GRACE_MS", d.grace),
            question_time_limit: millis_var("QUESTION_TIME_LIMIT_MS", d.question_time_limit),
            pre_roll: millis_var("PRE_ROLL_MS", d.pre_roll),
            inter_question: millis_var("INTER_QUESTION_MS", d.inter_question),
            scheduler_period: millis_var("SCHEDULER_PERIOD_MS", d.scheduler_period),
            expiry_grace: millis_var("EXPIRY_GRACE_MS", d.expiry_grace),
            outbound_retry_max: parse_var("OUTBOUND_RETRY_MAX", d.outbound_retry_max),
            outbound_send_timeout: d.outbound_send_timeout,
            cb_failure_threshold: parse_var("CB_FAILURE_THRESHOLD", d.cb_failure_threshold),
            cb_recovery: millis_var("CB_RECOVERY_MS", d.cb_recovery),
            cb_close_threshold: d.cb_close_threshold,
            answer_ttl: secs_var("ANSWER_TTL_S", d.answer_ttl),
        }
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

fn millis_var(name: &str, default: Duration) -> Duration {
    std::env::var(name)
        .ok()
        .and_then(|s| s.parse().ok())
        .map(Duration::from_millis)
        .unwrap_or(default)
}

fn secs_var(name: &str, default: Duration) -> Duration {
    std::env::var(name)
        .ok()
        .and_then(|s| s.parse().ok())
        .map(Duration::from_secs)
        .unwrap_or(default)
}
