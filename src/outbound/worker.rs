use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use governor::clock::DefaultClock;
use governor::state::keyed::DefaultKeyedStateStore;
use governor::{Quota, RateLimiter};
use tokio::sync::mpsc;

use crate::errors::AppError;
use crate::outbound::breaker::CircuitBreaker;
use crate::outbound::{DeliveryFailure, Lane, OutboundRequest, backoff_delay};
use crate::transport::ChatTransport;

type RecipientLimiter = RateLimiter<String, DefaultKeyedStateStore<String>, DefaultClock>;

/// Per-recipient send pacing: WhatsApp tolerates short bursts but throttles
/// sustained per-thread traffic.
fn recipient_quota() -> Quota {
    Quota::per_second(NonZeroU32::new(5).unwrap()).allow_burst(NonZeroU32::new(10).unwrap())
}

/// Drain loop for one lane. Processes requests strictly one at a time, which
/// is what preserves per-recipient delivery order.
pub(crate) async fn run(
    lane: Arc<Lane>,
    transport: Arc<dyn ChatTransport>,
    breaker: Arc<CircuitBreaker>,
    send_timeout: Duration,
    failure_tx: Option<mpsc::UnboundedSender<DeliveryFailure>>,
) {
    let limiter: RecipientLimiter = RateLimiter::keyed(recipient_quota());
    loop {
        let Some(request) = lane.pop() else {
            lane.wait().await;
            continue;
        };
        deliver(
            request,
            transport.as_ref(),
            &breaker,
            &limiter,
            send_timeout,
            failure_tx.as_ref(),
        )
        .await;
    }
}

async fn deliver(
    mut request: OutboundRequest,
    transport: &dyn ChatTransport,
    breaker: &CircuitBreaker,
    limiter: &RecipientLimiter,
    send_timeout: Duration,
    failure_tx: Option<&mpsc::UnboundedSender<DeliveryFailure>>,
) {
    let rendered = request.message.render();
    let mut attempt: u32 = 0;

    loop {
        while limiter.check_key(&request.recipient).is_err() {
            tokio::time::sleep(Duration::from_millis(100)).await;
        }

        let send = breaker.execute(async {
            if rendered.buttons.is_empty() {
                transport
                    .send_text(&request.recipient, &rendered.body)
                    .await
            } else {
                transport
                    .send_buttons(&request.recipient, &rendered.body, &rendered.buttons)
                    .await
            }
        });

        let outcome = match tokio::time::timeout(send_timeout, send).await {
            Ok(result) => result,
            Err(_) => Err(AppError::Timeout(format!(
                "send to {} exceeded {:?}",
                request.recipient, send_timeout
            ))),
        };

        match outcome {
            Ok(()) => {
                tracing::debug!(recipient = %request.recipient, "message delivered");
                return;
            }
            Err(AppError::TransportPermanent(reason)) => {
                tracing::warn!(
                    recipient = %request.recipient,
                    %reason,
                    "permanent transport rejection, dropping message"
                );
                if let Some(tx) = failure_tx {
                    let _ = tx.send(DeliveryFailure {
                        recipient: request.recipient.clone(),
                        reason,
                    });
                }
                return;
            }
            Err(e) => {
                request.attempts_left = request.attempts_left.saturating_sub(1);
                if request.attempts_left == 0 {
                    tracing::error!(
                        recipient = %request.recipient,
                        error = %e,
                        "delivery attempts exhausted, dropping message"
                    );
                    return;
                }
                tracing::debug!(
                    recipient = %request.recipient,
                    error = %e,
                    attempt,
                    "transient send failure, backing off"
                );
                tokio::time::sleep(backoff_delay(attempt)).await;
                attempt += 1;
            }
        }
    }
}
