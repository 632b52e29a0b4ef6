//! The transport commands arrive over.
//!
//! A [`Queue`] hands out [`Message`]s that stay leased to the receiver for a visibility timeout.
//! A message that is not acknowledged before its lease runs out is delivered again, so delivery is
//! at least once and may be out of order.

pub mod memory;
pub mod spool;

use std::future::Future;
use std::io;
use std::time::Duration;
use thiserror::Error as ThisError;

pub use memory::MemoryQueue;
pub use spool::SpoolQueue;

#[derive(Debug, ThisError)]
pub enum QueueError {
    #[error("failed to receive messages: {0}")]
    Receive(#[source] io::Error),
    #[error("failed to send message: {0}")]
    Send(#[source] io::Error),
    #[error("failed to acknowledge message: {0}")]
    Ack(#[source] io::Error),
    /// The receipt was acknowledged already, or its lease expired and the message went back to
    /// the queue.
    #[error("unknown or expired receipt {0}")]
    UnknownReceipt(String),
}

#[derive(Clone, Debug, PartialEq)]
pub struct ReceiveOptions {
    /// Upper bound on the number of messages returned by one receive.
    pub max_messages: usize,
    /// How long a received message stays hidden from other receivers.
    pub visibility_timeout: Duration,
    /// How long a receive waits for a message before returning empty handed.
    pub wait_time: Duration,
}

impl Default for ReceiveOptions {
    fn default() -> Self {
        Self {
            max_messages: 1,
            visibility_timeout: Duration::from_secs(10),
            wait_time: Duration::from_secs(1),
        }
    }
}

pub trait Queue: Send + Sync + 'static {
    type Message: Message;

    /// Waits up to `options.wait_time` for messages. Returns an empty batch when none arrive.
    fn receive(
        &self,
        options: &ReceiveOptions,
    ) -> impl Future<Output = Result<Vec<Self::Message>, QueueError>> + Send;

    fn send(&self, body: &str) -> impl Future<Output = Result<(), QueueError>> + Send;
}

pub trait Message: Send + 'static {
    fn body(&self) -> &str;

    /// Tells the transport the message was processed and must not be delivered again.
    fn ack(self) -> impl Future<Output = Result<(), QueueError>> + Send;
}
