use bytes::Bytes;

use crate::commands::executable::Executable;
use crate::store::OrderedStore;
use crate::Error;

/// Stores `value` under `key`, making it the newest item. Adding a key that already exists
/// replaces its value and moves it to the end of the insertion order.
#[derive(Debug, PartialEq)]
pub struct AddItem {
    pub key: Bytes,
    pub value: Bytes,
}

impl Executable for AddItem {
    fn exec(self, store: &mut OrderedStore) -> Result<Vec<Bytes>, Error> {
        store.insert(self.key, self.value)?;
        Ok(vec![])
    }
}
