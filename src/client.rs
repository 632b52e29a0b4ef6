use itertools::Itertools;
use thiserror::Error as ThisError;
use tracing::debug;

use crate::operation::{Operation, OperationName};
use crate::queue::{Queue, QueueError};

#[derive(Debug, ThisError, PartialEq)]
pub enum RequestError {
    #[error("unknown operation {0}; --op must be one of {}", OperationName::KNOWN.iter().join(", "))]
    UnknownOperation(String),
    #[error("--key must be provided for {0}")]
    MissingKey(OperationName),
    #[error("--val must be provided for {0}")]
    MissingValue(OperationName),
}

/// Builds the operation a producer asked for.
///
/// Every operation but `GetAllItems` needs a key, and `AddItem` also needs a value. Fields an
/// operation does not use are dropped.
pub fn request(op: &str, key: &str, value: &str) -> Result<Operation, RequestError> {
    let name = OperationName::from_name(op);

    match name {
        OperationName::Unknown(op) => Err(RequestError::UnknownOperation(op)),
        OperationName::GetAllItems => Ok(Operation::new(name, "", "")),
        name if key.is_empty() => Err(RequestError::MissingKey(name)),
        OperationName::AddItem if value.is_empty() => {
            Err(RequestError::MissingValue(OperationName::AddItem))
        }
        OperationName::AddItem => Ok(Operation::new(name, key.to_string(), value.to_string())),
        name => Ok(Operation::new(name, key.to_string(), "")),
    }
}

/// Encodes `op` and puts it on `queue`.
pub async fn send<Q: Queue>(queue: &Q, op: &Operation) -> Result<(), QueueError> {
    let body = op.encode();
    debug!(%body, "sending operation");
    queue.send(&body).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::{MemoryQueue, Message, ReceiveOptions};
    use bytes::Bytes;

    #[test]
    fn add_item_requires_key_and_value() {
        assert_eq!(
            request("AddItem", "", "bar"),
            Err(RequestError::MissingKey(OperationName::AddItem))
        );
        assert_eq!(
            request("AddItem", "foo", ""),
            Err(RequestError::MissingValue(OperationName::AddItem))
        );
        assert_eq!(
            request("AddItem", "foo", "bar"),
            Ok(Operation::new(OperationName::AddItem, "foo", "bar"))
        );
    }

    #[test]
    fn get_all_items_needs_nothing() {
        assert_eq!(
            request("GetAllItems", "ignored", "ignored"),
            Ok(Operation::new(OperationName::GetAllItems, "", ""))
        );
    }

    #[test]
    fn value_is_dropped_when_unused() {
        let op = request("GetItem", "foo", "bar").unwrap();

        assert_eq!(op.key, Bytes::from("foo"));
        assert!(op.value.is_empty());
        assert_eq!(
            request("RemoveItem", "", ""),
            Err(RequestError::MissingKey(OperationName::RemoveItem))
        );
    }

    #[test]
    fn unknown_operation() {
        let err = request("additem", "foo", "bar").err().unwrap();

        assert_eq!(err, RequestError::UnknownOperation("additem".to_string()));
        assert_eq!(
            err.to_string(),
            "unknown operation additem; --op must be one of AddItem, RemoveItem, GetItem, GetAllItems"
        );
    }

    #[tokio::test]
    async fn send_encodes_operation() {
        let queue = MemoryQueue::new();
        let op = request("AddItem", "foo", "bar").unwrap();

        send(&queue, &op).await.unwrap();

        let batch = queue.receive(&ReceiveOptions::default()).await.unwrap();
        assert_eq!(batch[0].body(), "AddItem,Zm9v,YmFy");
    }
}
