use bytes::Bytes;
use tracing::debug;

use crate::commands::executable::Executable;
use crate::store::OrderedStore;
use crate::Error;

#[derive(Debug, PartialEq)]
pub struct RemoveItem {
    pub key: Bytes,
}

impl Executable for RemoveItem {
    fn exec(self, store: &mut OrderedStore) -> Result<Vec<Bytes>, Error> {
        if store.delete(&self.key) {
            debug!(key = ?self.key, "item removed");
        }
        Ok(vec![])
    }
}
