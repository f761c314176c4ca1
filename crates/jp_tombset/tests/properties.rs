use std::collections::HashSet;

use jp_tombset::{Error, KeyedSet, MapSet, TombSet};
use proptest::prelude::*;

#[derive(Debug, Clone, Copy)]
enum Op {
    Append(u8),
    Delete(u8),
    Clear,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    // A small key space makes duplicates and repeated deletes common.
    prop_oneof![
        50 => (0..32u8).prop_map(Op::Append),
        40 => (0..32u8).prop_map(Op::Delete),
        2 => Just(Op::Clear),
    ]
}

/// The order-sensitive reference: live keys in append order, plus every key
/// appended since the last clear.
#[derive(Default)]
struct Model {
    live: Vec<u8>,
    reserved: HashSet<u8>,
}

impl Model {
    fn apply(&mut self, op: Op) -> Option<bool> {
        match op {
            Op::Append(key) => {
                let accepted = self.reserved.insert(key);
                if accepted {
                    self.live.push(key);
                }
                Some(accepted)
            }
            Op::Delete(key) => {
                let before = self.live.len();
                self.live.retain(|&k| k != key);
                Some(self.live.len() != before)
            }
            Op::Clear => {
                self.live.clear();
                self.reserved.clear();
                None
            }
        }
    }
}

fn visit_all<S: KeyedSet<u8>>(set: &S) -> Vec<u8> {
    let mut all = vec![];
    set.all(|&k| {
        all.push(k);
        true
    });
    all
}

proptest! {
    #[test]
    fn matches_model_in_order(ops in prop::collection::vec(op_strategy(), 0..200)) {
        let mut set = TombSet::<u8>::new();
        let mut model = Model::default();

        for op in ops {
            let expected = model.apply(op);
            match op {
                Op::Append(key) => {
                    let accepted = set.try_append(key).is_ok();
                    prop_assert_eq!(Some(accepted), expected, "append {}", key);
                }
                Op::Delete(key) => {
                    let deleted = set.remove(&key).is_some();
                    prop_assert_eq!(Some(deleted), expected, "delete {}", key);
                }
                Op::Clear => set.clear(),
            }

            prop_assert_eq!(set.len(), model.live.len());
            prop_assert_eq!(visit_all(&set), model.live.clone());
            prop_assert_eq!(set.slots(), set.len() + set.tombstones());
        }
    }

    #[test]
    fn agrees_with_map_set_on_membership(ops in prop::collection::vec(op_strategy(), 0..200)) {
        let mut tomb = TombSet::<u8>::new();
        let mut map = MapSet::<u8>::new();

        for op in ops {
            match op {
                Op::Append(key) => {
                    // `MapSet` frees deleted keys, so only mirror what the
                    // tombstoning set accepted.
                    if KeyedSet::try_append(&mut tomb, key).is_ok() {
                        prop_assert_eq!(KeyedSet::try_append(&mut map, key), Ok(()));
                    }
                }
                Op::Delete(key) => {
                    prop_assert_eq!(
                        KeyedSet::delete(&mut tomb, &key),
                        KeyedSet::delete(&mut map, &key)
                    );
                }
                Op::Clear => {
                    KeyedSet::clear(&mut tomb);
                    KeyedSet::clear(&mut map);
                }
            }

            let tomb_keys: HashSet<u8> = visit_all(&tomb).into_iter().collect();
            let map_keys: HashSet<u8> = visit_all(&map).into_iter().collect();
            prop_assert_eq!(&tomb_keys, &map_keys);
            prop_assert_eq!(KeyedSet::len(&tomb), KeyedSet::len(&map));
            prop_assert_eq!(tomb_keys.len(), tomb.len());
        }
    }

    #[test]
    fn duplicate_append_leaves_state_unchanged(
        keys in prop::collection::hash_set(any::<u8>(), 1..64),
        deleted in prop::collection::vec(any::<prop::sample::Index>(), 0..16),
        dup in any::<prop::sample::Index>(),
    ) {
        let keys: Vec<u8> = keys.into_iter().collect();
        let mut set = TombSet::<u8>::new();
        for &key in &keys {
            set.append(key);
        }
        for index in &deleted {
            set.remove(index.get(&keys));
        }

        let before = set.clone();
        let slots = set.slots();

        let key = *dup.get(&keys);
        let slot = set.slot_of(&key).unwrap();
        let result = set.try_append(key);
        prop_assert_eq!(result, Err(Error::DuplicateKey { slot }));
        prop_assert_eq!(&set, &before);
        prop_assert_eq!(set.slots(), slots);
    }

    #[test]
    fn double_delete_counts_once(
        keys in prop::collection::hash_set(any::<u8>(), 1..64),
        target in any::<prop::sample::Index>(),
    ) {
        let keys: Vec<u8> = keys.into_iter().collect();
        let mut set = TombSet::<u8>::new();
        for &key in &keys {
            set.append(key);
        }

        let key = *target.get(&keys);
        prop_assert!(set.remove(&key).is_some());
        prop_assert_eq!(set.len(), keys.len() - 1);
        prop_assert!(set.remove(&key).is_none());
        prop_assert_eq!(set.len(), keys.len() - 1);
    }

    #[test]
    fn visitor_stop_visits_exactly_j(
        len in 0..100usize,
        deleted in prop::collection::hash_set(0..100usize, 0..50),
        stop_after in 1..120usize,
    ) {
        let mut set = TombSet::<usize>::with_capacity(len);
        for i in 0..len {
            set.append(i);
        }
        for i in &deleted {
            set.remove(i);
        }

        let mut visited = 0;
        set.all(|_| {
            visited += 1;
            visited < stop_after
        });

        prop_assert_eq!(visited, stop_after.min(set.len()));
    }

    #[test]
    fn compact_preserves_live_items(ops in prop::collection::vec(op_strategy(), 0..200)) {
        let mut set = TombSet::<u8>::new();
        for op in ops {
            match op {
                Op::Append(key) => { let _ = set.try_append(key); }
                Op::Delete(key) => { set.remove(&key); }
                Op::Clear => set.clear(),
            }
        }

        let before: Vec<u8> = set.iter().copied().collect();
        let tombstones = set.tombstones();

        prop_assert_eq!(set.compact(), tombstones);
        prop_assert_eq!(set.tombstones(), 0);
        prop_assert_eq!(set.iter().copied().collect::<Vec<_>>(), before.clone());

        for (slot, key) in before.iter().enumerate() {
            prop_assert_eq!(set.slot_of(key), Some(slot));
        }
        for key in 0..32u8 {
            if !before.contains(&key) {
                prop_assert!(set.try_append(key).is_ok());
            }
        }
    }
}
