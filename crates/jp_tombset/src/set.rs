use std::{
    borrow::Borrow,
    collections::{HashMap, hash_map},
    fmt::{self, Debug},
    hash::{BuildHasher, Hash},
    iter::{FusedIterator, Zip},
    marker::PhantomData,
    slice,
};

use ahash::RandomState;
use serde::{
    Deserialize, Deserializer, Serialize, Serializer,
    de::{self, SeqAccess, Visitor},
    ser::SerializeSeq,
};
use tracing::{debug, trace};

use crate::{
    Keyed, KeyedSet,
    error::{Error, Result},
};

/// An insertion-ordered set that deletes by tombstoning.
///
/// Items live in a dense `Vec` and never move. A parallel `Vec<bool>` marks
/// each slot as live or deleted, and a hash index maps every key ever
/// appended to its slot. Deleting keeps the key in the index, which means a
/// deleted key cannot be appended again until the set is cleared or
/// compacted.
///
/// Iteration walks the dense slots in order and skips tombstones, so it visits
/// live items in the order they were appended.
pub struct TombSet<T: Keyed, S = RandomState> {
    position_of: HashMap<T::Key, usize, S>,
    items: Vec<T>,
    live: Vec<bool>,
    count: usize,
}

impl<T: Keyed> TombSet<T, RandomState> {
    /// Creates an empty set.
    ///
    /// The set does not allocate until the first item is appended.
    ///
    /// # Examples
    ///
    /// ```
    /// use jp_tombset::TombSet;
    ///
    /// let set: TombSet<u32> = TombSet::new();
    /// assert!(set.is_empty());
    /// ```
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty set with room for at least `capacity` items.
    ///
    /// The capacity is a hint, not a limit: the set grows past it as needed.
    #[inline]
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_hasher(capacity, RandomState::default())
    }
}

impl<T: Keyed, S> TombSet<T, S> {
    /// Creates an empty set which uses `hash_builder` to hash keys.
    #[inline]
    pub fn with_hasher(hash_builder: S) -> Self {
        Self {
            position_of: HashMap::with_hasher(hash_builder),
            items: Vec::new(),
            live: Vec::new(),
            count: 0,
        }
    }

    /// Creates an empty set with room for at least `capacity` items, using
    /// `hash_builder` to hash keys.
    #[inline]
    pub fn with_capacity_and_hasher(capacity: usize, hash_builder: S) -> Self {
        Self {
            position_of: HashMap::with_capacity_and_hasher(capacity, hash_builder),
            items: Vec::with_capacity(capacity),
            live: Vec::with_capacity(capacity),
            count: 0,
        }
    }

    /// Returns the number of live items.
    ///
    /// This is tracked on every append and delete, it does not scan.
    ///
    /// # Examples
    ///
    /// ```
    /// use jp_tombset::TombSet;
    ///
    /// let mut set = TombSet::new();
    /// set.append(1_u32);
    /// set.append(2);
    /// set.remove(&1);
    /// assert_eq!(set.len(), 1);
    /// ```
    #[inline]
    pub fn len(&self) -> usize {
        self.count
    }

    /// Returns `true` if the set has no live items.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Returns the number of occupied slots, live or deleted.
    #[inline]
    pub fn slots(&self) -> usize {
        self.items.len()
    }

    /// Returns the number of deleted slots still holding storage.
    #[inline]
    pub fn tombstones(&self) -> usize {
        self.items.len() - self.count
    }

    /// Returns the number of items the set can hold without reallocating.
    ///
    /// Deleted slots count against this capacity until the set is cleared or
    /// compacted.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.items.capacity()
    }

    /// Returns a reference to the set's [`BuildHasher`].
    #[inline]
    pub fn hasher(&self) -> &S {
        self.position_of.hasher()
    }

    /// An iterator over the live items, in the order they were appended.
    ///
    /// The iterator borrows the set, so the set cannot be modified while
    /// iterating.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            slots: self.items.iter().zip(self.live.iter()),
            remaining: self.count,
        }
    }

    /// Calls `visit` for every live item, in the order they were appended,
    /// until `visit` returns `false`.
    ///
    /// The visitor only gets shared access to the set, so it cannot append or
    /// delete items while the traversal is running.
    ///
    /// # Examples
    ///
    /// ```
    /// use jp_tombset::TombSet;
    ///
    /// let mut set = TombSet::new();
    /// for i in 0..10_u32 {
    ///     set.append(i);
    /// }
    ///
    /// let mut seen = vec![];
    /// set.all(|&i| {
    ///     seen.push(i);
    ///     seen.len() < 3
    /// });
    /// assert_eq!(seen, [0, 1, 2]);
    /// ```
    pub fn all<F>(&self, mut visit: F)
    where
        F: FnMut(&T) -> bool,
    {
        for item in self.iter() {
            if !visit(item) {
                break;
            }
        }
    }

    /// Deletes every live item for which `f` returns `false`.
    ///
    /// Deleted items are tombstoned the same way [`TombSet::remove`] does.
    pub fn retain<F>(&mut self, mut f: F)
    where
        F: FnMut(&T) -> bool,
    {
        for (item, live) in self.items.iter().zip(self.live.iter_mut()) {
            if *live && !f(item) {
                *live = false;
                self.count -= 1;
            }
        }
    }

    /// Removes all items and forgets all keys.
    ///
    /// Unlike [`TombSet::remove`], this releases the keys, so any of them can
    /// be appended again. Allocated memory is kept for reuse.
    ///
    /// # Examples
    ///
    /// ```
    /// use jp_tombset::TombSet;
    ///
    /// let mut set = TombSet::new();
    /// set.append(1_u32);
    /// set.remove(&1);
    /// assert!(set.try_append(1).is_err());
    ///
    /// set.clear();
    /// assert!(set.try_append(1).is_ok());
    /// ```
    pub fn clear(&mut self) {
        trace!(slots = self.items.len(), live = self.count, "Clearing set.");

        self.position_of.clear();
        self.items.clear();
        self.live.clear();
        self.count = 0;
    }
}

impl<T, S> TombSet<T, S>
where
    T: Keyed,
    S: BuildHasher,
{
    /// Appends an item, returning the slot it was stored in.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateKey`] if the key was appended before, even if
    /// its item has since been deleted. The set is left unchanged.
    ///
    /// # Examples
    ///
    /// ```
    /// use jp_tombset::{Error, TombSet};
    ///
    /// let mut set = TombSet::new();
    /// assert_eq!(set.try_append("a"), Ok(0));
    /// assert_eq!(set.try_append("b"), Ok(1));
    /// assert_eq!(set.try_append("a"), Err(Error::DuplicateKey { slot: 0 }));
    /// ```
    pub fn try_append(&mut self, item: T) -> Result<usize> {
        let slot = self.items.len();

        match self.position_of.entry(item.key()) {
            hash_map::Entry::Occupied(entry) => {
                let existing = *entry.get();
                trace!(slot = existing, "Rejected duplicate key.");
                return Err(Error::DuplicateKey { slot: existing });
            }
            hash_map::Entry::Vacant(entry) => {
                entry.insert(slot);
            }
        }

        self.items.push(item);
        self.live.push(true);
        self.count += 1;

        Ok(slot)
    }

    /// Appends an item, returning the slot it was stored in.
    ///
    /// # Panics
    ///
    /// Panics if the key was appended before. Use [`TombSet::try_append`] to
    /// handle duplicates.
    #[track_caller]
    pub fn append(&mut self, item: T) -> usize {
        match self.try_append(item) {
            Ok(slot) => slot,
            Err(error) => panic!("{error}"),
        }
    }

    /// Deletes the item stored under `key`, returning it if it was live.
    ///
    /// The item stays in its slot and the key stays reserved. Deleting a key
    /// that was never appended, or that is already deleted, returns `None` and
    /// changes nothing.
    ///
    /// # Examples
    ///
    /// ```
    /// use jp_tombset::TombSet;
    ///
    /// let mut set = TombSet::new();
    /// set.append(String::from("a"));
    ///
    /// assert_eq!(set.remove("a").map(String::as_str), Some("a"));
    /// assert_eq!(set.remove("a"), None);
    /// assert_eq!(set.remove("b"), None);
    /// ```
    pub fn remove<Q>(&mut self, key: &Q) -> Option<&T>
    where
        T::Key: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let slot = *self.position_of.get(key)?;
        let live = self.live.get_mut(slot)?;
        if !*live {
            return None;
        }

        *live = false;
        self.count -= 1;
        self.items.get(slot)
    }

    /// Deletes the item with the same key as `item`.
    ///
    /// See [`TombSet::remove`].
    pub fn delete(&mut self, item: &T) -> Option<&T> {
        self.remove(&item.key())
    }

    /// Returns the live item stored under `key`.
    pub fn get<Q>(&self, key: &Q) -> Option<&T>
    where
        T::Key: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let slot = *self.position_of.get(key)?;
        if self.live.get(slot).copied()? {
            self.items.get(slot)
        } else {
            None
        }
    }

    /// Returns `true` if a live item is stored under `key`.
    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        T::Key: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.get(key).is_some()
    }

    /// Returns the slot `key` was appended to, whether or not it is still
    /// live.
    pub fn slot_of<Q>(&self, key: &Q) -> Option<usize>
    where
        T::Key: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.position_of.get(key).copied()
    }

    /// Returns `true` if `key` was appended and has since been deleted.
    pub fn is_tombstoned<Q>(&self, key: &Q) -> bool
    where
        T::Key: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.position_of
            .get(key)
            .and_then(|&slot| self.live.get(slot))
            .is_some_and(|live| !live)
    }

    /// Reserves room for at least `additional` more appends.
    pub fn reserve(&mut self, additional: usize) {
        self.position_of.reserve(additional);
        self.items.reserve(additional);
        self.live.reserve(additional);
    }

    /// Drops all tombstoned slots, returning how many were reclaimed.
    ///
    /// Live items keep their relative order but move to new slots. Keys of
    /// deleted items are released, so they can be appended again afterwards.
    ///
    /// This walks every slot and rebuilds the key index, so it is meant to be
    /// run periodically on delete-heavy workloads, not after every delete.
    /// Allocated memory is kept for reuse.
    pub fn compact(&mut self) -> usize {
        let reclaimed = self.tombstones();
        if reclaimed == 0 {
            return 0;
        }

        let mut flags = self.live.iter().copied();
        self.items.retain(|_| flags.next().unwrap_or(false));

        self.live.clear();
        self.live.resize(self.items.len(), true);

        self.position_of.clear();
        for (slot, item) in self.items.iter().enumerate() {
            self.position_of.insert(item.key(), slot);
        }

        debug!(reclaimed, live = self.count, "Compacted set.");
        reclaimed
    }
}

impl<T, S> KeyedSet<T> for TombSet<T, S>
where
    T: Keyed,
    S: BuildHasher,
{
    fn try_append(&mut self, item: T) -> std::result::Result<(), Error> {
        TombSet::try_append(self, item).map(|_| ())
    }

    fn delete(&mut self, item: &T) -> bool {
        TombSet::delete(self, item).is_some()
    }

    fn all<F>(&self, visit: F)
    where
        F: FnMut(&T) -> bool,
    {
        TombSet::all(self, visit);
    }

    fn clear(&mut self) {
        TombSet::clear(self);
    }

    fn len(&self) -> usize {
        self.count
    }
}

impl<T, S> Default for TombSet<T, S>
where
    T: Keyed,
    S: Default,
{
    #[inline]
    fn default() -> Self {
        Self::with_hasher(S::default())
    }
}

impl<T, S> Clone for TombSet<T, S>
where
    T: Keyed + Clone,
    T::Key: Clone,
    S: Clone,
{
    fn clone(&self) -> Self {
        Self {
            position_of: self.position_of.clone(),
            items: self.items.clone(),
            live: self.live.clone(),
            count: self.count,
        }
    }
}

impl<T, S> Debug for TombSet<T, S>
where
    T: Keyed + Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

/// Two sets are equal if they hold equal live items in the same order.
/// Tombstones are not compared.
impl<T, S> PartialEq for TombSet<T, S>
where
    T: Keyed + PartialEq,
{
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().eq(other.iter())
    }
}

impl<T, S> Eq for TombSet<T, S> where T: Keyed + Eq {}

impl<'a, T, S> IntoIterator for &'a TombSet<T, S>
where
    T: Keyed,
{
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    #[inline]
    fn into_iter(self) -> Iter<'a, T> {
        self.iter()
    }
}

impl<T, S> Serialize for TombSet<T, S>
where
    T: Keyed + Serialize,
{
    fn serialize<Ser>(&self, ser: Ser) -> std::result::Result<Ser::Ok, Ser::Error>
    where
        Ser: Serializer,
    {
        let mut seq = ser.serialize_seq(Some(self.len()))?;
        for item in self {
            seq.serialize_element(item)?;
        }
        seq.end()
    }
}

impl<'de, T, S> Deserialize<'de> for TombSet<T, S>
where
    T: Keyed + Deserialize<'de>,
    S: BuildHasher + Default,
{
    fn deserialize<D>(de: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        de.deserialize_seq(TombSetVisitor(PhantomData))
    }
}

struct TombSetVisitor<T, S>(PhantomData<fn() -> (T, S)>);

impl<'de, T, S> Visitor<'de> for TombSetVisitor<T, S>
where
    T: Keyed + Deserialize<'de>,
    S: BuildHasher + Default,
{
    type Value = TombSet<T, S>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a sequence of uniquely keyed items")
    }

    fn visit_seq<A>(self, mut seq: A) -> std::result::Result<Self::Value, A::Error>
    where
        A: SeqAccess<'de>,
    {
        // Cap the preallocation taken from the size hint.
        let capacity = seq.size_hint().unwrap_or(0).min(4096);
        let mut set = TombSet::with_capacity_and_hasher(capacity, S::default());

        while let Some(item) = seq.next_element()? {
            set.try_append(item).map_err(de::Error::custom)?;
        }

        Ok(set)
    }
}

/// An iterator over the live items of a [`TombSet`], in append order.
///
/// Created by [`TombSet::iter`].
pub struct Iter<'a, T> {
    slots: Zip<slice::Iter<'a, T>, slice::Iter<'a, bool>>,
    remaining: usize,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<&'a T> {
        // No need to walk trailing tombstones.
        if self.remaining == 0 {
            return None;
        }

        let (item, _) = self.slots.find(|(_, live)| **live)?;
        self.remaining -= 1;
        Some(item)
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<T> DoubleEndedIterator for Iter<'_, T> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }

        let (item, _) = self.slots.rfind(|(_, live)| **live)?;
        self.remaining -= 1;
        Some(item)
    }
}

impl<T> ExactSizeIterator for Iter<'_, T> {}

impl<T> FusedIterator for Iter<'_, T> {}

impl<T> Clone for Iter<'_, T> {
    fn clone(&self) -> Self {
        Self {
            slots: self.slots.clone(),
            remaining: self.remaining,
        }
    }
}

#[cfg(test)]
#[path = "set_tests.rs"]
mod tests;
