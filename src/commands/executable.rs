use bytes::Bytes;

use crate::store::OrderedStore;
use crate::Error;

/// A command applied to the store. Returns the lines to append to the output sink, if any.
pub trait Executable {
    fn exec(self, store: &mut OrderedStore) -> Result<Vec<Bytes>, Error>;
}
