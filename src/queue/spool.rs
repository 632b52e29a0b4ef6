use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::fs;
use tokio::time::{sleep, Instant};
use tracing::debug;
use uuid::Uuid;

use crate::queue::{Message, Queue, QueueError, ReceiveOptions};

const READY: &str = "ready";
const IN_FLIGHT: &str = "inflight";
const TMP: &str = "tmp";

const MESSAGE_EXTENSION: &str = ".msg";
const LEASE_SEPARATOR: char = '~';

// How often an empty spool is rescanned while a receive is waiting.
const SCAN_INTERVAL: Duration = Duration::from_millis(100);

/// A queue kept in a directory, shared by every process that opens the same root.
///
/// ```text
/// <root>/tmp/<nanos>-<uuid>.msg                      being written by a producer
/// <root>/ready/<nanos>-<uuid>.msg                    waiting to be received
/// <root>/inflight/<deadline-millis>~<nanos>-<uuid>.msg  leased until the deadline
/// ```
///
/// Every state change is a rename, so a message is claimed by exactly one receiver. Leases past
/// their deadline are renamed back into `ready`.
#[derive(Clone, Debug)]
pub struct SpoolQueue {
    root: PathBuf,
}

impl SpoolQueue {
    pub async fn open(root: impl Into<PathBuf>) -> io::Result<SpoolQueue> {
        let queue = SpoolQueue { root: root.into() };

        for dir in [READY, IN_FLIGHT, TMP] {
            fs::create_dir_all(queue.root.join(dir)).await?;
        }

        Ok(queue)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    async fn requeue_expired(&self) -> io::Result<()> {
        let now = since_epoch().as_millis();
        let mut entries = fs::read_dir(self.root.join(IN_FLIGHT)).await?;

        while let Some(entry) = entries.next_entry().await? {
            let file_name = entry.file_name();
            let Some((deadline, name)) = file_name.to_str().and_then(parse_lease) else {
                continue;
            };
            if deadline > now {
                continue;
            }

            match fs::rename(entry.path(), self.root.join(READY).join(name)).await {
                Ok(()) => debug!(name, "lease expired, message requeued"),
                // Acknowledged or requeued by someone else in the meantime.
                Err(err) if err.kind() == io::ErrorKind::NotFound => {}
                Err(err) => return Err(err),
            }
        }

        Ok(())
    }

    async fn claim(&self, options: &ReceiveOptions) -> io::Result<Vec<SpoolMessage>> {
        let ready = self.root.join(READY);
        let mut names = vec![];
        let mut entries = fs::read_dir(&ready).await?;

        while let Some(entry) = entries.next_entry().await? {
            if let Ok(name) = entry.file_name().into_string() {
                if name.ends_with(MESSAGE_EXTENSION) {
                    names.push(name);
                }
            }
        }
        // Names start with the send time, so this is oldest first.
        names.sort();

        let deadline = (since_epoch() + options.visibility_timeout).as_millis();
        let mut batch = vec![];

        for name in names {
            if batch.len() >= options.max_messages {
                break;
            }

            let leased = self
                .root
                .join(IN_FLIGHT)
                .join(format!("{deadline}{LEASE_SEPARATOR}{name}"));

            match fs::rename(ready.join(&name), &leased).await {
                Ok(()) => {}
                // Claimed by another receiver.
                Err(err) if err.kind() == io::ErrorKind::NotFound => continue,
                Err(err) => return Err(err),
            }

            let body = fs::read(&leased).await?;
            batch.push(SpoolMessage {
                path: leased,
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }

        Ok(batch)
    }
}

impl Queue for SpoolQueue {
    type Message = SpoolMessage;

    async fn receive(&self, options: &ReceiveOptions) -> Result<Vec<SpoolMessage>, QueueError> {
        let deadline = Instant::now() + options.wait_time;

        loop {
            self.requeue_expired().await.map_err(QueueError::Receive)?;

            let batch = self.claim(options).await.map_err(QueueError::Receive)?;
            if !batch.is_empty() {
                return Ok(batch);
            }

            let now = Instant::now();
            if now >= deadline {
                return Ok(vec![]);
            }
            sleep(SCAN_INTERVAL.min(deadline - now)).await;
        }
    }

    async fn send(&self, body: &str) -> Result<(), QueueError> {
        let name = format!(
            "{:020}-{}{}",
            since_epoch().as_nanos(),
            Uuid::new_v4(),
            MESSAGE_EXTENSION
        );
        let tmp = self.root.join(TMP).join(&name);

        fs::write(&tmp, body).await.map_err(QueueError::Send)?;
        fs::rename(&tmp, self.root.join(READY).join(&name))
            .await
            .map_err(QueueError::Send)?;

        debug!(name, "message sent");
        Ok(())
    }
}

#[derive(Debug)]
pub struct SpoolMessage {
    path: PathBuf,
    body: String,
}

impl Message for SpoolMessage {
    fn body(&self) -> &str {
        &self.body
    }

    async fn ack(self) -> Result<(), QueueError> {
        match fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                Err(QueueError::UnknownReceipt(self.path.display().to_string()))
            }
            Err(err) => Err(QueueError::Ack(err)),
        }
    }
}

fn parse_lease(file_name: &str) -> Option<(u128, &str)> {
    let (deadline, name) = file_name.split_once(LEASE_SEPARATOR)?;
    let deadline = deadline.parse().ok()?;
    Some((deadline, name))
}

fn since_epoch() -> Duration {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
}
