use bytes::Bytes;

use crate::commands::executable::Executable;
use crate::store::OrderedStore;
use crate::Error;

/// Outputs every stored value, oldest first.
#[derive(Debug, PartialEq)]
pub struct GetAllItems;

impl Executable for GetAllItems {
    fn exec(self, store: &mut OrderedStore) -> Result<Vec<Bytes>, Error> {
        Ok(store.iter().map(|item| item.value.clone()).collect())
    }
}
