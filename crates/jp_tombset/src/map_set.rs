use std::{
    borrow::Borrow,
    collections::{HashMap, hash_map},
    fmt::{self, Debug},
    hash::{BuildHasher, Hash},
};

use ahash::RandomState;

use crate::{
    Keyed, KeyedSet,
    error::{Error, Result},
};

/// A keyed set backed by nothing but a hash map.
///
/// Deleting removes the entry outright, so space is reclaimed immediately
/// and a deleted key can be appended again. Iteration order is arbitrary.
///
/// This mirrors the membership semantics of [`TombSet`](crate::TombSet) and
/// is mostly useful as a reference to check it against.
pub struct MapSet<T: Keyed, S = RandomState> {
    items: HashMap<T::Key, T, S>,
}

impl<T: Keyed> MapSet<T, RandomState> {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty set with room for at least `capacity` items.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            items: HashMap::with_capacity_and_hasher(capacity, RandomState::default()),
        }
    }
}

impl<T: Keyed, S> MapSet<T, S> {
    /// Returns the number of items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` if the set has no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// An iterator over all items, in arbitrary order.
    pub fn iter(&self) -> hash_map::Values<'_, T::Key, T> {
        self.items.values()
    }

    /// Calls `visit` for every item, in arbitrary order, until `visit` returns
    /// `false`.
    pub fn all<F>(&self, mut visit: F)
    where
        F: FnMut(&T) -> bool,
    {
        for item in self.items.values() {
            if !visit(item) {
                break;
            }
        }
    }

    /// Removes all items, keeping the allocated memory.
    pub fn clear(&mut self) {
        self.items.clear();
    }
}

impl<T, S> MapSet<T, S>
where
    T: Keyed,
    S: BuildHasher,
{
    /// Inserts an item.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateKey`] with slot `0` if an item with the same
    /// key is present. The set is left unchanged.
    pub fn try_append(&mut self, item: T) -> Result<()> {
        match self.items.entry(item.key()) {
            hash_map::Entry::Occupied(_) => Err(Error::DuplicateKey { slot: 0 }),
            hash_map::Entry::Vacant(entry) => {
                entry.insert(item);
                Ok(())
            }
        }
    }

    /// Removes the item stored under `key`, returning it if present.
    pub fn remove<Q>(&mut self, key: &Q) -> Option<T>
    where
        T::Key: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.items.remove(key)
    }

    /// Returns the item stored under `key`.
    pub fn get<Q>(&self, key: &Q) -> Option<&T>
    where
        T::Key: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.items.get(key)
    }

    /// Returns `true` if an item is stored under `key`.
    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        T::Key: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.items.contains_key(key)
    }
}

impl<T, S> KeyedSet<T> for MapSet<T, S>
where
    T: Keyed,
    S: BuildHasher,
{
    fn try_append(&mut self, item: T) -> std::result::Result<(), Error> {
        MapSet::try_append(self, item)
    }

    fn delete(&mut self, item: &T) -> bool {
        self.remove(&item.key()).is_some()
    }

    fn all<F>(&self, visit: F)
    where
        F: FnMut(&T) -> bool,
    {
        MapSet::all(self, visit);
    }

    fn clear(&mut self) {
        MapSet::clear(self);
    }

    fn len(&self) -> usize {
        self.items.len()
    }
}

impl<T, S> Default for MapSet<T, S>
where
    T: Keyed,
    S: Default,
{
    fn default() -> Self {
        Self {
            items: HashMap::with_hasher(S::default()),
        }
    }
}

impl<T, S> Debug for MapSet<T, S>
where
    T: Keyed + Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.items.values()).finish()
    }
}
