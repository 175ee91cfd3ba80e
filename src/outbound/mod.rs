// Outbound message queue: typed send requests drained by worker tasks that
// talk to the chat transport behind a circuit breaker.
//
// Requests are sharded to workers by recipient hash, so messages to one
// recipient keep their enqueue order while unrelated recipients proceed in
// parallel. Retries happen in place on the owning worker for the same reason.

pub mod breaker;
pub mod message;
mod worker;

pub use breaker::{CircuitBreaker, CircuitState};
pub use message::{OutboundMessage, Priority, Rendered};

use std::collections::VecDeque;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{Notify, mpsc};

use crate::config::EngineConfig;
use crate::transport::ChatTransport;

/// Default number of drain workers (and recipient shards).
pub const DEFAULT_WORKERS: usize = 4;

/// One queued send.
#[derive(Debug)]
pub struct OutboundRequest {
    pub recipient: String,
    pub priority: Priority,
    pub message: OutboundMessage,
    pub attempts_left: u32,
}

/// Emitted when the transport rejects a recipient permanently; the consumer
/// records the player as undeliverable.
#[derive(Debug, Clone)]
pub struct DeliveryFailure {
    pub recipient: String,
    pub reason: String,
}

/// One worker's shard: three priority rings plus a wakeup.
pub(crate) struct Lane {
    queues: Mutex<[VecDeque<OutboundRequest>; 3]>,
    notify: Notify,
}

impl Lane {
    fn new() -> Self {
        Self {
            queues: Mutex::new([VecDeque::new(), VecDeque::new(), VecDeque::new()]),
            notify: Notify::new(),
        }
    }

    fn push(&self, request: OutboundRequest) {
        {
            let mut queues = self.queues.lock().expect("lane lock poisoned");
            queues[request.priority as usize].push_back(request);
        }
        self.notify.notify_one();
    }

    fn pop(&self) -> Option<OutboundRequest> {
        let mut queues = self.queues.lock().expect("lane lock poisoned");
        queues.iter_mut().find_map(|q| q.pop_front())
    }

    async fn wait(&self) {
        self.notify.notified().await;
    }
}

/// Handle for enqueueing outbound messages. Cheap to clone.
#[derive(Clone)]
pub struct OutboundQueue {
    lanes: Arc<Vec<Arc<Lane>>>,
    retry_max: u32,
}

impl OutboundQueue {
    /// Spawn `workers` drain tasks and return the enqueue handle.
    pub fn spawn(
        transport: Arc<dyn ChatTransport>,
        breaker: Arc<CircuitBreaker>,
        config: &EngineConfig,
        workers: usize,
        failure_tx: Option<mpsc::UnboundedSender<DeliveryFailure>>,
    ) -> Self {
        let workers = workers.max(1);
        let lanes: Vec<Arc<Lane>> = (0..workers).map(|_| Arc::new(Lane::new())).collect();

        for lane in &lanes {
            tokio::spawn(worker::run(
                lane.clone(),
                transport.clone(),
                breaker.clone(),
                config.outbound_send_timeout,
                failure_tx.clone(),
            ));
        }

        Self {
            lanes: Arc::new(lanes),
            retry_max: config.outbound_retry_max,
        }
    }

    pub fn enqueue(&self, recipient: &str, priority: Priority, message: OutboundMessage) {
        let lane = &self.lanes[self.shard(recipient)];
        lane.push(OutboundRequest {
            recipient: recipient.to_string(),
            priority,
            message,
            attempts_left: self.retry_max,
        });
    }

    /// Fan one message out to many recipients.
    pub fn enqueue_all<'a>(
        &self,
        recipients: impl IntoIterator<Item = &'a str>,
        priority: Priority,
        message: &OutboundMessage,
    ) {
        for recipient in recipients {
            self.enqueue(recipient, priority, message.clone());
        }
    }

    fn shard(&self, recipient: &str) -> usize {
        let mut hasher = DefaultHasher::new();
        recipient.hash(&mut hasher);
        (hasher.finish() as usize) % self.lanes.len()
    }
}

pub(crate) fn backoff_delay(attempt: u32) -> Duration {
    Duration::from_millis(500u64.saturating_mul(1 << attempt.min(6)))
}
