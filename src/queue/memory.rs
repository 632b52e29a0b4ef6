use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;
use tokio::time::{sleep_until, Instant};
use uuid::Uuid;

use crate::queue::{Message, Queue, QueueError, ReceiveOptions};

/// An in-process queue with the same delivery semantics as a remote one: received messages are
/// leased for the visibility timeout and go back to the queue unless acknowledged in time.
///
/// Clones share the same queue.
#[derive(Clone, Default)]
pub struct MemoryQueue {
    inner: Arc<Shared>,
}

#[derive(Default)]
struct Shared {
    state: Mutex<State>,
    // Wakes up receivers waiting on an empty queue.
    waker: Notify,
}

#[derive(Default)]
struct State {
    ready: VecDeque<String>,
    in_flight: HashMap<Uuid, Lease>,
}

struct Lease {
    body: String,
    expires_at: Instant,
}

impl MemoryQueue {
    pub fn new() -> MemoryQueue {
        Self::default()
    }

    /// Number of messages waiting to be received.
    pub fn len(&self) -> usize {
        self.inner.state.lock().unwrap().ready.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of messages received but not acknowledged yet.
    pub fn in_flight(&self) -> usize {
        self.inner.state.lock().unwrap().in_flight.len()
    }
}

impl Shared {
    fn take(self: &Arc<Self>, options: &ReceiveOptions) -> Vec<MemoryMessage> {
        let now = Instant::now();
        let mut state = self.state.lock().unwrap();
        state.requeue_expired(now);

        let count = options.max_messages.min(state.ready.len());
        let bodies: Vec<String> = state.ready.drain(..count).collect();

        bodies
            .into_iter()
            .map(|body| {
                let receipt = Uuid::new_v4();
                state.in_flight.insert(
                    receipt,
                    Lease {
                        body: body.clone(),
                        expires_at: now + options.visibility_timeout,
                    },
                );
                MemoryMessage {
                    queue: self.clone(),
                    receipt,
                    body,
                }
            })
            .collect()
    }

    fn next_expiry(&self) -> Option<Instant> {
        let state = self.state.lock().unwrap();
        state.in_flight.values().map(|lease| lease.expires_at).min()
    }
}

impl State {
    /// Puts expired leases back at the front of the queue, earliest expiry first.
    fn requeue_expired(&mut self, now: Instant) {
        let mut expired: Vec<(Instant, Uuid)> = self
            .in_flight
            .iter()
            .filter(|(_, lease)| lease.expires_at <= now)
            .map(|(receipt, lease)| (lease.expires_at, *receipt))
            .collect();
        expired.sort();

        for (_, receipt) in expired.into_iter().rev() {
            if let Some(lease) = self.in_flight.remove(&receipt) {
                self.ready.push_front(lease.body);
            }
        }
    }
}

impl Queue for MemoryQueue {
    type Message = MemoryMessage;

    async fn receive(&self, options: &ReceiveOptions) -> Result<Vec<MemoryMessage>, QueueError> {
        let deadline = Instant::now() + options.wait_time;

        loop {
            let batch = self.inner.take(options);
            if !batch.is_empty() {
                return Ok(batch);
            }

            if Instant::now() >= deadline {
                return Ok(vec![]);
            }

            // An expiring lease makes a message receivable again, so wake up for that too.
            let wake_at = self
                .inner
                .next_expiry()
                .map_or(deadline, |expiry| expiry.min(deadline));

            tokio::select! {
                _ = self.inner.waker.notified() => {}
                _ = sleep_until(wake_at) => {}
            }
        }
    }

    async fn send(&self, body: &str) -> Result<(), QueueError> {
        self.inner
            .state
            .lock()
            .unwrap()
            .ready
            .push_back(body.to_string());
        self.inner.waker.notify_one();
        Ok(())
    }
}

pub struct MemoryMessage {
    queue: Arc<Shared>,
    receipt: Uuid,
    body: String,
}

impl Message for MemoryMessage {
    fn body(&self) -> &str {
        &self.body
    }

    async fn ack(self) -> Result<(), QueueError> {
        let lease = self
            .queue
            .state
            .lock()
            .unwrap()
            .in_flight
            .remove(&self.receipt);

        match lease {
            Some(_) => Ok(()),
            None => Err(QueueError::UnknownReceipt(self.receipt.to_string())),
        }
    }
}
