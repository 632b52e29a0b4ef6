//! Wire encoding of the commands carried in queue message bodies.
//!
//! An operation travels as `<name>[,<base64(key)>[,<base64(value)>]]`. Only the field contents are
//! base64 encoded, so the `,` separator can never appear inside a field.

use std::fmt;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use bytes::Bytes;
use strum_macros::EnumString;
use thiserror::Error as ThisError;

const SEPARATOR: char = ',';

#[derive(Debug, ThisError, PartialEq)]
pub enum Error {
    #[error("malformed operation; empty payload")]
    MalformedOperation,
}

#[derive(Clone, Debug, PartialEq, Eq, EnumString)]
pub enum OperationName {
    AddItem,
    RemoveItem,
    GetItem,
    GetAllItems,
    /// Any name the dispatcher has no handler for. Kept verbatim so it can be logged.
    #[strum(default)]
    Unknown(String),
}

impl OperationName {
    /// Names the dispatcher knows how to apply.
    pub const KNOWN: [&'static str; 4] = ["AddItem", "RemoveItem", "GetItem", "GetAllItems"];

    pub fn as_str(&self) -> &str {
        match self {
            OperationName::AddItem => "AddItem",
            OperationName::RemoveItem => "RemoveItem",
            OperationName::GetItem => "GetItem",
            OperationName::GetAllItems => "GetAllItems",
            OperationName::Unknown(name) => name,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, OperationName::Unknown(_))
    }

    pub fn from_name(name: &str) -> OperationName {
        // `Unknown` is the parse fallback, so this never fails.
        name.parse()
            .unwrap_or_else(|_| OperationName::Unknown(name.to_string()))
    }
}

impl fmt::Display for OperationName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A command received from a producer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Operation {
    pub name: OperationName,
    pub key: Bytes,
    pub value: Bytes,
}

impl Operation {
    pub fn new(name: OperationName, key: impl Into<Bytes>, value: impl Into<Bytes>) -> Operation {
        Operation {
            name,
            key: key.into(),
            value: value.into(),
        }
    }

    /// Encodes the operation as a message body.
    ///
    /// The name is written as is, so only names without a `,` survive a round trip through
    /// [`Operation::decode`]. An empty `Unknown` name encodes to an empty payload, which does not
    /// decode at all.
    pub fn encode(&self) -> String {
        let mut encoded = self.name.as_str().to_string();

        // Trailing empty fields are omitted, so `GetAllItems` encodes without any separator.
        if self.key.is_empty() && self.value.is_empty() {
            return encoded;
        }

        encoded.push(SEPARATOR);
        encoded.push_str(&BASE64.encode(&self.key));

        if !self.value.is_empty() {
            encoded.push(SEPARATOR);
            encoded.push_str(&BASE64.encode(&self.value));
        }

        encoded
    }

    /// Decodes a message body.
    ///
    /// A key or value segment that is not valid base64 decodes to an empty field instead of
    /// failing. Producers only ever send base64 here, and an operation with an empty field still
    /// flows through the dispatcher (an `AddItem` with an empty key is rejected by the store).
    pub fn decode(src: &str) -> Result<Operation, Error> {
        if src.is_empty() {
            return Err(Error::MalformedOperation);
        }

        let mut parts = src.split(SEPARATOR);
        let name = parts.next().map(OperationName::from_name).ok_or(Error::MalformedOperation)?;
        let key = parts.next().map(decode_field).unwrap_or_default();
        let value = parts.next().map(decode_field).unwrap_or_default();

        Ok(Operation { name, key, value })
    }
}

fn decode_field(field: &str) -> Bytes {
    BASE64
        .decode(field)
        .map(Bytes::from)
        .unwrap_or_default()
}
