//! Keyed, typed data attached to a request.
//!
//! Modules park arbitrary values here. Items marked persistable travel with
//! the conversation between rounds. The state store only ever moves whole
//! registries around and never looks inside an item.

use std::any::Any;
use std::fmt;

/// Identifies a data item: the owning facility plus a discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DataKey {
    pub facility: &'static str,
    pub unique: i32,
}

impl DataKey {
    pub const fn new(facility: &'static str, unique: i32) -> Self {
        Self { facility, unique }
    }
}

impl fmt::Display for DataKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.facility, self.unique)
    }
}

struct DataItem {
    key: DataKey,
    value: Box<dyn Any + Send>,
    persist: bool,
}

/// Registry of data items attached to a request or parked entry.
#[derive(Default)]
pub struct RequestData {
    items: Vec<DataItem>,
}

impl RequestData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach `value` under `key`, replacing any existing item with that key.
    pub fn add<T: Any + Send>(&mut self, key: DataKey, value: T, persist: bool) {
        self.items.retain(|item| item.key != key);
        self.items.push(DataItem {
            key,
            value: Box::new(value),
            persist,
        });
    }

    /// Remove the item under `key` and return it, if it holds a `T`.
    ///
    /// An item of a different type is left in place.
    pub fn get<T: Any + Send>(&mut self, key: DataKey) -> Option<T> {
        let pos = self
            .items
            .iter()
            .position(|item| item.key == key && item.value.is::<T>())?;
        let item = self.items.remove(pos);
        item.value.downcast::<T>().ok().map(|boxed| *boxed)
    }

    /// Borrow the item under `key` without removing it.
    pub fn reference<T: Any + Send>(&self, key: DataKey) -> Option<&T> {
        self.items
            .iter()
            .find(|item| item.key == key)
            .and_then(|item| item.value.downcast_ref::<T>())
    }

    /// Whether an item exists under `key`.
    pub fn contains(&self, key: DataKey) -> bool {
        self.items.iter().any(|item| item.key == key)
    }

    /// Split off every persistable item.
    pub fn take_persistable(&mut self) -> RequestData {
        let (persist, keep): (Vec<_>, Vec<_>) =
            self.items.drain(..).partition(|item| item.persist);
        self.items = keep;
        RequestData { items: persist }
    }

    /// Move every item from `other` back in.
    pub fn restore(&mut self, other: RequestData) {
        for item in other.items {
            self.items.retain(|existing| existing.key != item.key);
            self.items.push(item);
        }
    }

    /// Drop every persistable item.
    pub fn free_persistable(&mut self) {
        self.items.retain(|item| !item.persist);
    }

    /// Bundle every persistable item into `parent` under `key`.
    pub fn store_in_parent(&mut self, parent: &mut RequestData, key: DataKey) {
        let bundle = self.take_persistable();
        parent.add(key, bundle, true);
    }

    /// Pull a bundle stored by [`store_in_parent`](Self::store_in_parent)
    /// back out of `parent`.
    pub fn restore_from_parent(&mut self, parent: &mut RequestData, key: DataKey) {
        if let Some(bundle) = parent.get::<RequestData>(key) {
            self.restore(bundle);
        }
    }

    /// Whether every item is persistable.
    pub fn all_persistable(&self) -> bool {
        self.items.iter().all(|item| item.persist)
    }

    pub fn keys(&self) -> impl Iterator<Item = DataKey> + '_ {
        self.items.iter().map(|item| item.key)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl fmt::Debug for RequestData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.items.iter().map(|item| (item.key, item.persist)))
            .finish()
    }
}
