use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::errors::AppError;

/// Breaker lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug)]
struct BreakerInner {
    state: CircuitState,
    consecutive_failures: u32,
    half_open_successes: u32,
    opened_at: Option<Instant>,
}

/// Per-service failure detector.
///
/// Closed counts consecutive transient failures and opens at the threshold.
/// Open short-circuits callers until the recovery timeout, then lets probes
/// through in half-open; enough consecutive probe successes close it again,
/// any probe failure re-opens it.
pub struct CircuitBreaker {
    service: &'static str,
    failure_threshold: u32,
    recovery: Duration,
    close_threshold: u32,
    inner: Mutex<BreakerInner>,
}

impl CircuitBreaker {
    pub fn new(
        service: &'static str,
        failure_threshold: u32,
        recovery: Duration,
        close_threshold: u32,
    ) -> Self {
        Self {
            service,
            failure_threshold,
            recovery,
            close_threshold,
            inner: Mutex::new(BreakerInner {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                half_open_successes: 0,
                opened_at: None,
            }),
        }
    }

    pub fn state(&self) -> CircuitState {
        self.inner.lock().expect("breaker lock poisoned").state
    }

    /// Run `op` unless the breaker is open. The lock is never held across the
    /// operation itself.
    pub async fn execute<T, F>(&self, op: F) -> Result<T, AppError>
    where
        F: Future<Output = Result<T, AppError>>,
    {
        self.preflight()?;
        match op.await {
            Ok(value) => {
                self.record_success();
                Ok(value)
            }
            Err(e) => {
                // A permanent rejection is an answer, not a service outage.
                if e.is_transient() {
                    self.record_failure();
                }
                Err(e)
            }
        }
    }

    /// Like `execute`, but an open circuit yields `fallback()` instead of an
    /// error.
    pub async fn execute_with_fallback<T, F>(
        &self,
        op: F,
        fallback: impl FnOnce() -> T,
    ) -> Result<T, AppError>
    where
        F: Future<Output = Result<T, AppError>>,
    {
        match self.execute(op).await {
            Err(AppError::CircuitOpen(_)) => Ok(fallback()),
            other => other,
        }
    }

    fn preflight(&self) -> Result<(), AppError> {
        let mut inner = self.inner.lock().expect("breaker lock poisoned");
        match inner.state {
            CircuitState::Closed | CircuitState::HalfOpen => Ok(()),
            CircuitState::Open => {
                let elapsed = inner.opened_at.map(|t| t.elapsed()).unwrap_or_default();
                if elapsed >= self.recovery {
                    inner.state = CircuitState::HalfOpen;
                    inner.half_open_successes = 0;
                    tracing::info!(service = self.service, "circuit half-open, probing");
                    Ok(())
                } else {
                    Err(AppError::CircuitOpen(self.service))
                }
            }
        }
    }

    fn record_success(&self) {
        let mut inner = self.inner.lock().expect("breaker lock poisoned");
        match inner.state {
            CircuitState::Closed => inner.consecutive_failures = 0,
            CircuitState::HalfOpen => {
                inner.half_open_successes += 1;
                if inner.half_open_successes >= self.close_threshold {
                    inner.state = CircuitState::Closed;
                    inner.consecutive_failures = 0;
                    inner.opened_at = None;
                    tracing::info!(service = self.service, "circuit closed");
                }
            }
            CircuitState::Open => {}
        }
    }

    fn record_failure(&self) {
        let mut inner = self.inner.lock().expect("breaker lock poisoned");
        match inner.state {
            CircuitState::HalfOpen => {
                inner.state = CircuitState::Open;
                inner.opened_at = Some(Instant::now());
                tracing::warn!(service = self.service, "probe failed, circuit re-opened");
            }
            CircuitState::Closed => {
                inner.consecutive_failures += 1;
                if inner.consecutive_failures >= self.failure_threshold {
                    inner.state = CircuitState::Open;
                    inner.opened_at = Some(Instant::now());
                    tracing::warn!(
                        service = self.service,
                        failures = inner.consecutive_failures,
                        "circuit opened"
                    );
                }
            }
            CircuitState::Open => {}
        }
    }
}
