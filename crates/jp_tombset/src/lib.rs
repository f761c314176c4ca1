//! An insertion-ordered set of uniquely keyed items, tuned for workloads that
//! iterate far more often than they delete.
//!
//! [`TombSet`] never moves an item once it is appended. Deleting an item only
//! flips a liveness flag (a "tombstone"), so deletion is a single lookup and
//! iteration is a linear walk over a dense [`Vec`]. The price is that storage
//! grows with the number of appends, not the number of live items, until
//! [`TombSet::clear`] or [`TombSet::compact`] is called.
//!
//! [`MapSet`] is a plain hash-backed variant with the same contract, minus the
//! ordering guarantee. Both implement [`KeyedSet`].

pub mod error;
pub mod map_set;
pub mod set;

use std::hash::Hash;

pub use error::Error;
pub use map_set::MapSet;
pub use set::{Iter, TombSet};

/// An item that can be stored in a [`TombSet`] or [`MapSet`].
///
/// The key defines identity: two items with equal keys are duplicates,
/// regardless of any other data they carry.
pub trait Keyed {
    /// The value used for uniqueness and lookup.
    type Key: Eq + Hash;

    /// Returns the key of this item.
    fn key(&self) -> Self::Key;
}

macro_rules! impl_keyed_for_self {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Keyed for $ty {
                type Key = $ty;

                #[inline]
                fn key(&self) -> Self::Key {
                    *self
                }
            }
        )*
    };
}

impl_keyed_for_self!(
    u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize, char, bool,
);

impl Keyed for String {
    type Key = String;

    fn key(&self) -> Self::Key {
        self.clone()
    }
}

impl<'a> Keyed for &'a str {
    type Key = &'a str;

    fn key(&self) -> Self::Key {
        self
    }
}

/// The operations shared by every keyed set in this crate.
///
/// Implementations differ in ordering and space behavior, but agree on
/// membership: after the same sequence of calls, [`KeyedSet::all`] visits the
/// same items (in possibly different order) and [`KeyedSet::len`] returns the
/// same number.
pub trait KeyedSet<T: Keyed> {
    /// Appends an item.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateKey`] if the key of `item` is already known to
    /// the set. The set is left unchanged.
    fn try_append(&mut self, item: T) -> Result<(), Error>;

    /// Deletes the item with the same key as `item`.
    ///
    /// Returns `true` if a live item was deleted. Deleting an unknown or
    /// already deleted key is a no-op that returns `false`.
    fn delete(&mut self, item: &T) -> bool;

    /// Visits live items until `visit` returns `false`.
    fn all<F>(&self, visit: F)
    where
        F: FnMut(&T) -> bool;

    /// Removes all items.
    fn clear(&mut self);

    /// Returns the number of live items.
    fn len(&self) -> usize;

    /// Returns `true` if there are no live items.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
