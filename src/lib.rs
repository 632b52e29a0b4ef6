pub mod client;
pub mod codec;
pub mod commands;
pub mod config;
pub mod dispatcher;
pub mod operation;
pub mod pipeline;
pub mod queue;
pub mod server;
pub mod sink;
pub mod store;

pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Result<T> = std::result::Result<T, Error>;
