use clap::Parser;
use queuekv::queue::SpoolQueue;
use queuekv::{client, Error};
use std::path::PathBuf;

/// Puts a command on the queue read by a queuekv server
#[derive(Parser, Debug)]
struct Args {
    /// Spool directory the server reads commands from
    #[arg(short, long, env = "QUEUEKV_QUEUE")]
    queue: PathBuf,

    /// One of AddItem, RemoveItem, GetItem, GetAllItems
    #[arg(long)]
    op: String,

    /// The item's key
    #[arg(short, long, default_value = "")]
    key: String,

    /// The value for the item
    #[arg(long, default_value = "")]
    val: String,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    let _ = tracing_subscriber::fmt().try_init();

    let args = Args::parse();
    let op = client::request(&args.op, &args.key, &args.val)?;

    let queue = SpoolQueue::open(&args.queue).await?;
    client::send(&queue, &op).await?;

    println!("Done.");
    Ok(())
}
