use bytes::Bytes;

use crate::commands::executable::Executable;
use crate::store::OrderedStore;
use crate::Error;

/// Outputs the value of `key`. Nothing is written if the key does not exist.
#[derive(Debug, PartialEq)]
pub struct GetItem {
    pub key: Bytes,
}

impl Executable for GetItem {
    fn exec(self, store: &mut OrderedStore) -> Result<Vec<Bytes>, Error> {
        let output = store
            .lookup(&self.key)
            .map(|item| item.value.clone())
            .into_iter()
            .collect();

        Ok(output)
    }
}
