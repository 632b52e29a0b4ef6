use clap::Parser;
use queuekv::config::{Config, PollSettings};
use queuekv::queue::ReceiveOptions;
use queuekv::{server, Error};
use std::path::PathBuf;
use std::time::Duration;
use tracing::Level;

#[derive(Parser, Debug)]
struct Args {
    /// Spool directory to read commands from
    #[arg(short, long, env = "QUEUEKV_QUEUE")]
    queue: PathBuf,

    /// File to append read results to
    #[arg(short, long, env = "QUEUEKV_OUT")]
    out: PathBuf,

    /// Maximum log level (trace, debug, info, warn, error)
    #[arg(long, env = "QUEUEKV_LOG_LEVEL", default_value_t = Level::INFO)]
    log_level: Level,

    /// Seconds a receive waits for a message
    #[arg(long, env = "QUEUEKV_WAIT_TIME", default_value_t = 1)]
    wait_time: u64,

    /// Seconds a received message stays hidden from other consumers
    #[arg(long, env = "QUEUEKV_VISIBILITY_TIMEOUT", default_value_t = 10)]
    visibility_timeout: u64,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    let args = Args::parse();

    let mut config = Config::new(args.queue, args.out);
    config.log_level = args.log_level;
    config.poll = PollSettings {
        receive: ReceiveOptions {
            wait_time: Duration::from_secs(args.wait_time),
            visibility_timeout: Duration::from_secs(args.visibility_timeout),
            ..ReceiveOptions::default()
        },
        ..PollSettings::default()
    };

    server::run(config, server::shutdown_signal()).await
}
