use std::sync::Arc;
use std::time::Duration;

use bb8::Pool;
use bb8_redis::RedisConnectionManager;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tokio::sync::mpsc;

use crate::config::{AppConfig, EngineConfig};
use crate::db::{
    GamePersistence, GamePlayerRepository, GameRepository, PgGamePersistence,
    QuestionRepository, UserRepository,
};
use crate::engine::{EngineDeps, GameEngine, GameScheduler};
use crate::outbound::{CircuitBreaker, DEFAULT_WORKERS, DeliveryFailure, OutboundQueue};
use crate::store::RedisAnswerStore;
use crate::transport::WhatsAppTransport;
use crate::webhook::WebhookDispatcher;

pub type RedisClient = Pool<RedisConnectionManager>;

/// Shared application state and the composition root: every collaborator is
/// constructed once here and injected into its consumers.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub engine_config: EngineConfig,
    pub redis: RedisClient,
    pub postgres: PgPool,
    pub engine: Arc<GameEngine>,
    pub outbound: OutboundQueue,
    pub dispatcher: Arc<WebhookDispatcher>,
    pub persistence: Arc<dyn GamePersistence>,
    pub users: UserRepository,
    pub games: GameRepository,
    pub questions: QuestionRepository,
    pub players: GamePlayerRepository,
}

impl AppState {
    /// Connect to PostgreSQL and Redis, then wire the engine, outbound queue,
    /// scheduler, and webhook dispatcher together.
    pub async fn new() -> Result<Self, Box<dyn std::error::Error>> {
        let config = AppConfig::from_env()?;
        let engine_config = EngineConfig::from_env();

        // Redis connection pool
        let manager = RedisConnectionManager::new(config.redis_url.clone())?;
        let redis_pool = Pool::builder()
            .max_size(100)
            .min_idle(Some(20))
            .connection_timeout(Duration::from_secs(5))
            .max_lifetime(Some(Duration::from_secs(300)))
            .idle_timeout(Some(Duration::from_secs(30)))
            .build(manager)
            .await?;

        // PostgreSQL connection pool
        let postgres_pool = PgPoolOptions::new()
            .max_connections(50)
            .min_connections(10)
            .acquire_timeout(Duration::from_secs(5))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(1800))
            .connect(&config.database_url)
            .await?;

        let users = UserRepository::new(postgres_pool.clone());
        let games = GameRepository::new(postgres_pool.clone());
        let questions = QuestionRepository::new(postgres_pool.clone());
        let players = GamePlayerRepository::new(postgres_pool.clone());
        let persistence: Arc<dyn GamePersistence> =
            Arc::new(PgGamePersistence::new(postgres_pool.clone()));

        // Outbound path: transport behind its circuit breaker, workers
        // reporting permanent failures back for user bookkeeping.
        let transport = Arc::new(WhatsAppTransport::new(&config));
        let transport_breaker = Arc::new(CircuitBreaker::new(
            "transport",
            engine_config.cb_failure_threshold,
            engine_config.cb_recovery,
            engine_config.cb_close_threshold,
        ));
        let (failure_tx, failure_rx) = mpsc::unbounded_channel();
        let outbound = OutboundQueue::spawn(
            transport,
            transport_breaker,
            &engine_config,
            DEFAULT_WORKERS,
            Some(failure_tx),
        );
        spawn_failure_listener(users.clone(), failure_rx);

        let answers = Arc::new(RedisAnswerStore::new(
            redis_pool.clone(),
            engine_config.answer_ttl,
        ));
        let store_breaker = Arc::new(CircuitBreaker::new(
            "answer-store",
            engine_config.cb_failure_threshold,
            engine_config.cb_recovery,
            engine_config.cb_close_threshold,
        ));

        let engine = GameEngine::new(EngineDeps {
            persistence: persistence.clone(),
            answers,
            outbound: outbound.clone(),
            store_breaker,
            config: engine_config.clone(),
        });

        GameScheduler::new(engine.clone(), persistence.clone()).spawn();

        let dispatcher = Arc::new(WebhookDispatcher::new(
            engine.clone(),
            persistence.clone(),
            users.clone(),
            outbound.clone(),
        ));

        Ok(Self {
            config,
            engine_config,
            redis: redis_pool,
            postgres: postgres_pool,
            engine,
            outbound,
            dispatcher,
            persistence,
            users,
            games,
            questions,
            players,
        })
    }
}

/// Consume permanent delivery failures and flag the affected users so the
/// engine stops fanning out to dead recipients in later games.
fn spawn_failure_listener(
    users: UserRepository,
    mut failure_rx: mpsc::UnboundedReceiver<DeliveryFailure>,
) {
    tokio::spawn(async move {
        while let Some(failure) = failure_rx.recv().await {
            if let Err(e) = users.mark_undeliverable(&failure.recipient).await {
                tracing::error!(
                    recipient = %failure.recipient,
                    error = %e,
                    "failed to record undeliverable recipient"
                );
            }
        }
    });
}
