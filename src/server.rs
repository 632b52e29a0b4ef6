use std::future::Future;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::pipeline;
use crate::queue::SpoolQueue;
use crate::sink;
use crate::Result;

/// Runs the server until `shutdown` resolves or the output file can no longer be written.
pub async fn run(config: Config, shutdown: impl Future<Output = ()>) -> Result<()> {
    let _ = tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .try_init()
        .map_err(|e| debug!("Failed to initialize global tracing: {}", e));

    let queue = SpoolQueue::open(&config.queue).await?;
    info!(queue = %queue.root().display(), "listening for commands");

    let token = CancellationToken::new();
    let (output, lines) = mpsc::channel(config.output_buffer.max(1));

    let mut writer = tokio::spawn(sink::write_out(config.out.clone(), lines));
    let listener = tokio::spawn(pipeline::listen(
        queue,
        config.poll.clone(),
        output,
        token.clone(),
    ));

    tokio::pin!(shutdown);
    // The writer only finishes on its own when it fails.
    let writer_failure = tokio::select! {
        _ = &mut shutdown => {
            info!("shutting down");
            None
        }
        result = &mut writer => Some(result),
    };

    token.cancel();
    let listened = listener.await?;

    match writer_failure {
        Some(result) => result??,
        // The listener dropped its sender, so the writer drains what is left and returns.
        None => writer.await??,
    }

    let dispatcher = listened?;
    info!(items = dispatcher.store().len(), "server stopped");

    Ok(())
}

/// Resolves on SIGINT, or SIGTERM on unix.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = ?err, "failed to install ctrl-c handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                warn!(error = ?err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
