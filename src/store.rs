use bytes::Bytes;
use std::collections::HashMap;
use thiserror::Error as ThisError;

#[derive(Debug, ThisError, PartialEq)]
pub enum StoreError {
    #[error("key could not be an empty string")]
    EmptyKey,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Item {
    pub key: Bytes,
    pub value: Bytes,
}

/// Handle to an item's place in the insertion order.
///
/// Positions are generational: once the item they point at is deleted (or replaced by a re-insert
/// of its key) the position goes stale and resolves to `None`, even if its slot is reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Position {
    slot: usize,
    generation: u64,
}

struct Node {
    item: Item,
    prev: Option<usize>,
    next: Option<usize>,
}

struct Slot {
    generation: u64,
    node: Option<Node>,
}

/// The OrderedStore maps keys to values and remembers the order keys were inserted in.
///
/// Items live in an arena of slots. The index maps a key to its slot, and the slots form a doubly
/// linked list from the oldest item (head) to the newest (tail), so appending, unlinking and point
/// lookups are all O(1). Slots freed by deletes are reused.
///
/// The store does no locking of its own; it is meant to be owned by a single task.
#[derive(Default)]
pub struct OrderedStore {
    index: HashMap<Bytes, usize>,
    slots: Vec<Slot>,
    free: Vec<usize>,
    head: Option<usize>,
    tail: Option<usize>,
}

impl OrderedStore {
    pub fn new() -> OrderedStore {
        Self::default()
    }

    /// Inserts `value` under `key` as the newest item. Re-inserting an existing key replaces its
    /// value and moves it to the tail of the order.
    pub fn insert(&mut self, key: Bytes, value: Bytes) -> Result<(), StoreError> {
        if key.is_empty() {
            return Err(StoreError::EmptyKey);
        }

        if let Some(slot) = self.index.remove(&key) {
            self.release(slot);
        }

        let node = Node {
            item: Item {
                key: key.clone(),
                value,
            },
            prev: self.tail,
            next: None,
        };
        let slot = self.allocate(node);

        match self.tail {
            Some(tail) => self.node_mut(tail).next = Some(slot),
            None => self.head = Some(slot),
        }
        self.tail = Some(slot);
        self.index.insert(key, slot);

        Ok(())
    }

    pub fn lookup(&self, key: &[u8]) -> Option<&Item> {
        self.index.get(key).map(|&slot| &self.node(slot).item)
    }

    /// Removes `key`, returning whether it was present.
    pub fn delete(&mut self, key: &[u8]) -> bool {
        match self.index.remove(key) {
            Some(slot) => {
                self.release(slot);
                true
            }
            None => false,
        }
    }

    pub fn oldest(&self) -> Option<Position> {
        self.head.map(|slot| self.position(slot))
    }

    /// Returns the item inserted right after the one at `position`. A stale position has no
    /// successor.
    pub fn next(&self, position: Position) -> Option<Position> {
        self.resolve(position)?.next.map(|slot| self.position(slot))
    }

    pub fn get(&self, position: Position) -> Option<&Item> {
        self.resolve(position).map(|node| &node.item)
    }

    /// Iterates over the stored items, oldest first.
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            store: self,
            cursor: self.head,
        }
    }

    /// Returns every item, oldest first.
    pub fn all_ordered(&self) -> Vec<&Item> {
        self.iter().collect()
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    fn allocate(&mut self, node: Node) -> usize {
        match self.free.pop() {
            Some(slot) => {
                self.slots[slot].node = Some(node);
                slot
            }
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    node: Some(node),
                });
                self.slots.len() - 1
            }
        }
    }

    /// Unlinks the node in `slot` from the order and frees the slot. The caller is responsible for
    /// the index entry.
    fn release(&mut self, slot: usize) {
        let entry = &mut self.slots[slot];
        let Some(node) = entry.node.take() else {
            return;
        };
        entry.generation += 1;

        match node.prev {
            Some(prev) => self.node_mut(prev).next = node.next,
            None => self.head = node.next,
        }
        match node.next {
            Some(next) => self.node_mut(next).prev = node.prev,
            None => self.tail = node.prev,
        }

        self.free.push(slot);
    }

    fn position(&self, slot: usize) -> Position {
        Position {
            slot,
            generation: self.slots[slot].generation,
        }
    }

    fn resolve(&self, position: Position) -> Option<&Node> {
        self.slots
            .get(position.slot)
            .filter(|slot| slot.generation == position.generation)
            .and_then(|slot| slot.node.as_ref())
    }

    // Linked slots always hold a node; the links and the index are only ever updated together.
    fn node(&self, slot: usize) -> &Node {
        match &self.slots[slot].node {
            Some(node) => node,
            None => unreachable!("linked slot {slot} is empty"),
        }
    }

    fn node_mut(&mut self, slot: usize) -> &mut Node {
        match &mut self.slots[slot].node {
            Some(node) => node,
            None => unreachable!("linked slot {slot} is empty"),
        }
    }
}

pub struct Iter<'a> {
    store: &'a OrderedStore,
    cursor: Option<usize>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a Item;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.store.node(self.cursor?);
        self.cursor = node.next;
        Some(&node.item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::seq::SliceRandom;
    use rand::Rng;

    fn values(store: &OrderedStore) -> Vec<&str> {
        store
            .iter()
            .map(|item| std::str::from_utf8(&item.value).unwrap())
            .collect()
    }

    fn insert(store: &mut OrderedStore, key: &'static str, value: &'static str) {
        store
            .insert(Bytes::from(key), Bytes::from(value))
            .unwrap();
    }

    #[test]
    fn insert_and_lookup() {
        let mut store = OrderedStore::new();
        insert(&mut store, "foo", "bar");

        let item = store.lookup(b"foo").unwrap();
        assert_eq!(item.key, Bytes::from("foo"));
        assert_eq!(item.value, Bytes::from("bar"));
        assert!(store.lookup(b"spam").is_none());
    }

    #[test]
    fn empty_key() {
        let mut store = OrderedStore::new();
        insert(&mut store, "foo", "bar");

        let err = store.insert(Bytes::new(), Bytes::from("spam"));

        assert_eq!(err, Err(StoreError::EmptyKey));
        assert_eq!(store.len(), 1);
        assert_eq!(values(&store), vec!["bar"]);
    }

    #[test]
    fn empty_value_is_allowed() {
        let mut store = OrderedStore::new();
        insert(&mut store, "foo", "");

        assert_eq!(store.lookup(b"foo").unwrap().value, Bytes::new());
    }

    #[test]
    fn all_ordered() {
        let mut store = OrderedStore::new();
        insert(&mut store, "foo", "bar");
        insert(&mut store, "spam", "egg");

        let items = store.all_ordered();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].value, Bytes::from("bar"));
        assert_eq!(items[1].value, Bytes::from("egg"));
    }

    #[test]
    fn delete() {
        let mut store = OrderedStore::new();
        insert(&mut store, "foo", "bar");

        assert!(store.delete(b"foo"));
        assert!(!store.delete(b"spam"));
        assert!(store.lookup(b"foo").is_none());
        assert!(store.all_ordered().is_empty());
        assert!(store.is_empty());
    }

    #[test]
    fn delete_absent_key_keeps_order() {
        let mut store = OrderedStore::new();
        insert(&mut store, "a", "1");
        insert(&mut store, "b", "2");

        assert!(!store.delete(b"c"));
        assert_eq!(values(&store), vec!["1", "2"]);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn delete_middle_head_and_tail() {
        let mut store = OrderedStore::new();
        insert(&mut store, "a", "1");
        insert(&mut store, "b", "2");
        insert(&mut store, "c", "3");
        insert(&mut store, "d", "4");

        assert!(store.delete(b"b"));
        assert_eq!(values(&store), vec!["1", "3", "4"]);
        assert!(store.delete(b"a"));
        assert_eq!(values(&store), vec!["3", "4"]);
        assert!(store.delete(b"d"));
        assert_eq!(values(&store), vec!["3"]);
        assert!(store.delete(b"c"));
        assert!(store.oldest().is_none());
    }

    #[test]
    fn reinsert_moves_to_tail() {
        let mut store = OrderedStore::new();
        insert(&mut store, "a", "1");
        insert(&mut store, "b", "2");
        insert(&mut store, "a", "3");

        assert_eq!(values(&store), vec!["2", "3"]);
        assert_eq!(store.len(), 2);
        assert_eq!(store.lookup(b"a").unwrap().value, Bytes::from("3"));
    }

    #[test]
    fn delete_then_reinsert_moves_to_tail() {
        let mut store = OrderedStore::new();
        insert(&mut store, "a", "1");
        insert(&mut store, "b", "2");
        store.delete(b"a");
        insert(&mut store, "a", "1");

        assert_eq!(values(&store), vec!["2", "1"]);
    }

    #[test]
    fn walk_with_positions() {
        let mut store = OrderedStore::new();
        insert(&mut store, "a", "1");
        insert(&mut store, "b", "2");
        insert(&mut store, "c", "3");

        let mut walked = vec![];
        let mut position = store.oldest();
        while let Some(current) = position {
            walked.push(store.get(current).unwrap().key.clone());
            position = store.next(current);
        }

        assert_eq!(walked, vec!["a", "b", "c"]);
    }

    #[test]
    fn stale_position() {
        let mut store = OrderedStore::new();
        insert(&mut store, "a", "1");
        insert(&mut store, "b", "2");

        let oldest = store.oldest().unwrap();
        store.delete(b"a");
        // The freed slot gets reused by the next insert.
        insert(&mut store, "c", "3");

        assert!(store.get(oldest).is_none());
        assert!(store.next(oldest).is_none());
        assert_eq!(store.get(store.oldest().unwrap()).unwrap().key, Bytes::from("b"));
    }

    #[test]
    fn slots_are_reused() {
        let mut store = OrderedStore::new();
        for _ in 0..10 {
            insert(&mut store, "a", "1");
            insert(&mut store, "b", "2");
            store.delete(b"a");
        }

        assert_eq!(store.slots.len(), 2);
        assert_eq!(values(&store), vec!["2"]);
    }

    #[test]
    fn matches_vec_model() {
        let keys: Vec<Bytes> = (0..8).map(|i| Bytes::from(format!("key{i}"))).collect();
        let mut rng = rand::thread_rng();
        let mut store = OrderedStore::new();
        let mut model: Vec<(Bytes, Bytes)> = vec![];

        for step in 0..2000 {
            let key = keys.choose(&mut rng).unwrap().clone();

            if rng.gen_bool(0.6) {
                let value = Bytes::from(format!("value{step}"));
                store.insert(key.clone(), value.clone()).unwrap();
                model.retain(|(k, _)| *k != key);
                model.push((key, value));
            } else {
                let existed = model.iter().any(|(k, _)| *k == key);
                model.retain(|(k, _)| *k != key);
                assert_eq!(store.delete(&key), existed);
            }

            let actual: Vec<(Bytes, Bytes)> = store
                .iter()
                .map(|item| (item.key.clone(), item.value.clone()))
                .collect();
            assert_eq!(actual, model);
            assert_eq!(store.len(), model.len());
        }
    }
}
