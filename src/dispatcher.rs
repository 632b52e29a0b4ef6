use bytes::Bytes;
use tracing::{debug, error, warn};

use crate::commands::executable::Executable;
use crate::commands::Command;
use crate::operation::Operation;
use crate::store::OrderedStore;

/// Applies decoded operations to the store it owns.
///
/// Every failure here is local to the message being processed: it is logged and the dispatcher
/// moves on, so the caller can acknowledge the message either way.
#[derive(Default)]
pub struct Dispatcher {
    store: OrderedStore,
}

impl Dispatcher {
    pub fn new() -> Dispatcher {
        Self::default()
    }

    pub fn store(&self) -> &OrderedStore {
        &self.store
    }

    /// Decodes a message body and applies it, returning the lines to write out.
    pub fn handle(&mut self, body: &str) -> Vec<Bytes> {
        match Operation::decode(body) {
            Ok(op) => self.apply(op),
            Err(err) => {
                warn!(body, "dropping message: {}", err);
                vec![]
            }
        }
    }

    pub fn apply(&mut self, op: Operation) -> Vec<Bytes> {
        debug!(name = %op.name, key = ?op.key, "applying operation");

        let cmd = match Command::try_from(op) {
            Ok(cmd) => cmd,
            Err(err) => {
                warn!("{}", err);
                return vec![];
            }
        };

        match cmd.exec(&mut self.store) {
            Ok(output) => output,
            Err(err) => {
                error!("{}", err);
                vec![]
            }
        }
    }
}
