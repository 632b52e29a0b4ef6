pub mod add_item;
pub mod executable;
pub mod get_all_items;
pub mod get_item;
pub mod remove_item;

use bytes::Bytes;
use thiserror::Error as ThisError;

use crate::commands::executable::Executable;
use crate::operation::{Operation, OperationName};
use crate::store::OrderedStore;
use crate::Error;

use add_item::AddItem;
use get_all_items::GetAllItems;
use get_item::GetItem;
use remove_item::RemoveItem;

#[derive(Debug, PartialEq)]
pub enum Command {
    AddItem(AddItem),
    RemoveItem(RemoveItem),
    GetItem(GetItem),
    GetAllItems(GetAllItems),
}

impl Executable for Command {
    fn exec(self, store: &mut OrderedStore) -> Result<Vec<Bytes>, Error> {
        match self {
            Command::AddItem(cmd) => cmd.exec(store),
            Command::RemoveItem(cmd) => cmd.exec(store),
            Command::GetItem(cmd) => cmd.exec(store),
            Command::GetAllItems(cmd) => cmd.exec(store),
        }
    }
}

impl TryFrom<Operation> for Command {
    type Error = CommandError;

    // Fields an operation does not use are ignored. Missing fields arrive as empty bytes and are
    // left for the store to judge.
    fn try_from(op: Operation) -> Result<Self, Self::Error> {
        let Operation { name, key, value } = op;

        match name {
            OperationName::AddItem => Ok(Command::AddItem(AddItem { key, value })),
            OperationName::RemoveItem => Ok(Command::RemoveItem(RemoveItem { key })),
            OperationName::GetItem => Ok(Command::GetItem(GetItem { key })),
            OperationName::GetAllItems => Ok(Command::GetAllItems(GetAllItems)),
            OperationName::Unknown(command) => Err(CommandError::UnknownCommand { command }),
        }
    }
}

#[derive(Debug, ThisError, PartialEq)]
pub enum CommandError {
    #[error("no handler for operation {command}")]
    UnknownCommand { command: String },
}
