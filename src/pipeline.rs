use bytes::Bytes;
use thiserror::Error as ThisError;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument};

use crate::config::PollSettings;
use crate::dispatcher::Dispatcher;
use crate::queue::{Message, Queue};
use crate::Result;

/// Lower bound on the delay between failed receives.
const MIN_RETRY_BACKOFF: Duration = Duration::from_millis(10);

#[derive(Debug, ThisError, PartialEq)]
pub enum PipelineError {
    #[error("output sink closed")]
    SinkClosed,
}

/// Receives messages from `queue` and applies them to a fresh store until `token` is cancelled.
///
/// Two tasks run concurrently: the poll loop receives messages and hands them over one at a time
/// to the dispatch loop, which applies each one, sends any output lines to `output`, and only then
/// acknowledges it. A message that is being applied when the token is cancelled is finished and
/// acknowledged; messages not handed over yet are left for the queue to redeliver.
///
/// Returns the dispatcher, and with it the final state of the store. Fails if `output` is closed
/// while there are lines to write.
pub async fn listen<Q: Queue>(
    queue: Q,
    settings: PollSettings,
    output: mpsc::Sender<Bytes>,
    token: CancellationToken,
) -> Result<Dispatcher> {
    // A dispatch failure stops polling without cancelling the caller's token.
    let token = token.child_token();
    let (handoff, messages) = mpsc::channel(settings.handoff_capacity.max(1));

    let poller = tokio::spawn(poll(queue, settings, handoff, token.clone()));
    let result = dispatch(Dispatcher::new(), messages, output, token.clone()).await;

    if result.is_err() {
        token.cancel();
    }
    poller.await?;

    result
}

#[instrument(name = "poll", skip_all)]
async fn poll<Q: Queue>(
    queue: Q,
    settings: PollSettings,
    handoff: mpsc::Sender<Q::Message>,
    token: CancellationToken,
) {
    let mut backoff = first_backoff(&settings);

    loop {
        let received = tokio::select! {
            biased;
            _ = token.cancelled() => break,
            received = queue.receive(&settings.receive) => received,
        };

        let batch = match received {
            Ok(batch) => {
                backoff = first_backoff(&settings);
                batch
            }
            Err(err) => {
                error!(retry_in = ?backoff, "{}", err);
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    _ = sleep(backoff) => {}
                }
                backoff = next_backoff(backoff, &settings);
                continue;
            }
        };

        for msg in batch {
            debug!(body = msg.body(), "received message");

            // Waits here while the dispatch loop is busy.
            tokio::select! {
                biased;
                _ = token.cancelled() => {
                    info!("poll loop stopped");
                    return;
                }
                sent = handoff.send(msg) => {
                    if sent.is_err() {
                        // The dispatch loop is gone.
                        return;
                    }
                }
            }
        }
    }

    info!("poll loop stopped");
}

fn first_backoff(settings: &PollSettings) -> Duration {
    settings.retry_backoff_min.max(MIN_RETRY_BACKOFF)
}

fn next_backoff(backoff: Duration, settings: &PollSettings) -> Duration {
    backoff
        .saturating_mul(2)
        .min(settings.retry_backoff_max)
        .max(MIN_RETRY_BACKOFF)
}

#[instrument(name = "dispatch", skip_all)]
async fn dispatch<M: Message>(
    mut dispatcher: Dispatcher,
    mut messages: mpsc::Receiver<M>,
    output: mpsc::Sender<Bytes>,
    token: CancellationToken,
) -> Result<Dispatcher> {
    loop {
        let msg = tokio::select! {
            biased;
            _ = token.cancelled() => break,
            msg = messages.recv() => match msg {
                Some(msg) => msg,
                None => break,
            },
        };

        for line in dispatcher.handle(msg.body()) {
            output
                .send(line)
                .await
                .map_err(|_| PipelineError::SinkClosed)?;
        }

        // Acknowledge only once the operation is applied. If this fails the message comes back
        // later, which every operation tolerates.
        if let Err(err) = msg.ack().await {
            error!("{}", err);
        }
    }

    info!(items = dispatcher.store().len(), "dispatch loop stopped");
    Ok(dispatcher)
}
