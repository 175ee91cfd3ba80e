use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

use crate::db::GamePersistence;
use crate::engine::{GameEngine, GameEvent};
use crate::errors::AppError;

/// Upper bound on one sweep; a sweep that cannot finish in time yields and
/// lets the next tick retry.
const SWEEP_TIME_LIMIT: Duration = Duration::from_secs(1);

/// Periodic sweep that starts due games and expires missed ones.
///
/// Idempotent across instances: the persistence layer's compare-and-set on
/// status is the fence, so a game whose transition another sweep already won
/// is skipped without a duplicate `GameStart`.
pub struct GameScheduler {
    engine: Arc<GameEngine>,
    persistence: Arc<dyn GamePersistence>,
    period: Duration,
    expiry_grace: Duration,
}

impl GameScheduler {
    pub fn new(engine: Arc<GameEngine>, persistence: Arc<dyn GamePersistence>) -> Self {
        let config = engine.config();
        let period = config.scheduler_period;
        let expiry_grace = config.expiry_grace;
        Self {
            engine,
            persistence,
            period,
            expiry_grace,
        }
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = time::interval(self.period);
            // A slow sweep skips ticks instead of bunching them up.
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                match time::timeout(SWEEP_TIME_LIMIT, self.sweep()).await {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => {
                        tracing::warn!(error = %e, "scheduler sweep failed, retrying next tick");
                    }
                    Err(_) => {
                        tracing::warn!("scheduler sweep overran its bound");
                    }
                }
            }
        })
    }

    async fn sweep(&self) -> Result<(), AppError> {
        let now = Utc::now();

        let expiry_cutoff = now
            - chrono::Duration::from_std(self.expiry_grace)
                .unwrap_or_else(|_| chrono::Duration::seconds(60));
        let expired = self.persistence.expire_overdue(expiry_cutoff).await?;
        if expired > 0 {
            tracing::warn!(expired, "expired games that missed their start window");
        }

        for game in self.persistence.due_scheduled(now).await? {
            // The CAS is the only start authority; losing it means another
            // instance owns this game.
            if self.persistence.try_begin(game.id).await? {
                tracing::info!(game_id = %game.id, start_at = %game.start_at, "starting game");
                self.engine
                    .publish(GameEvent::GameStart { game_id: game.id })
                    .await;
            }
        }
        Ok(())
    }
}
