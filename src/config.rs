use std::path::PathBuf;
use std::time::Duration;
use tracing::Level;

use crate::queue::ReceiveOptions;

/// Server configuration. Set once at startup and read-only afterwards.
#[derive(Clone, Debug)]
pub struct Config {
    /// Root directory of the spool queue commands are read from.
    pub queue: PathBuf,
    /// File read results are appended to.
    pub out: PathBuf,
    /// Maximum level of the global tracing subscriber.
    pub log_level: Level,
    pub poll: PollSettings,
    /// Output lines buffered between the dispatcher and the file writer.
    pub output_buffer: usize,
}

impl Config {
    pub fn new(queue: impl Into<PathBuf>, out: impl Into<PathBuf>) -> Config {
        Config {
            queue: queue.into(),
            out: out.into(),
            log_level: Level::INFO,
            poll: PollSettings::default(),
            output_buffer: 64,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct PollSettings {
    pub receive: ReceiveOptions,
    /// Messages buffered between the poll loop and the dispatch loop. Kept small so a slow
    /// dispatcher stalls polling instead of piling up leased messages.
    pub handoff_capacity: usize,
    /// First delay after a failed receive. Doubles on every consecutive failure.
    pub retry_backoff_min: Duration,
    pub retry_backoff_max: Duration,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            receive: ReceiveOptions::default(),
            handoff_capacity: 1,
            retry_backoff_min: Duration::from_millis(100),
            retry_backoff_max: Duration::from_secs(5),
        }
    }
}
