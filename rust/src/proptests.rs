use super::*;

use proptest::prelude::*;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone)]
enum Op {
    Insert(Key, u32),
    Remove(Key),
    Find(Key),
}

fn key_strategy() -> impl Strategy<Value = Key> + Clone {
    // A narrow range makes duplicate inserts and successful removes common.
    0u64..512
}

fn ops_strategy() -> impl Strategy<Value = Vec<Op>> {
    let key = key_strategy();
    let op = prop_oneof![
        50 => (key.clone(), any::<u32>()).prop_map(|(k, v)| Op::Insert(k, v)),
        30 => key.clone().prop_map(Op::Remove),
        20 => key.clone().prop_map(Op::Find),
    ];
    prop::collection::vec(op, 0..=600)
}

fn keys_of(index: &SplayIndex<u32>) -> Vec<Key> {
    index.iter().map(|(k, _)| k).collect()
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 128,
        max_shrink_iters: 10_000,
        .. ProptestConfig::default()
    })]

    #[test]
    fn prop_index_matches_btreemap(ops in ops_strategy()) {
        let mut index: SplayIndex<u32> = SplayIndex::new();
        let mut model: BTreeMap<Key, u32> = BTreeMap::new();

        for op in ops {
            match op {
                Op::Insert(key, value) => {
                    let inserted = index.insert(key, value);
                    if let std::collections::btree_map::Entry::Vacant(slot) = model.entry(key) {
                        slot.insert(value);
                        prop_assert!(inserted.is_ok());
                    } else {
                        prop_assert_eq!(inserted, Err(ContainerError::DuplicateKey(key)));
                    }
                }
                Op::Remove(key) => {
                    prop_assert_eq!(index.remove_key(key), model.remove(&key));
                }
                Op::Find(key) => {
                    let found = index.find(key).and_then(|id| index.get(id).copied());
                    prop_assert_eq!(found, model.get(&key).copied());
                    if found.is_some() {
                        prop_assert_eq!(index.root().and_then(|id| index.key(id)), Some(key));
                    }
                }
            }
            prop_assert_eq!(index.len(), model.len());
        }

        prop_assert!(index.check_invariants_detailed().is_ok());
        let expected: Vec<Key> = model.keys().copied().collect();
        prop_assert_eq!(keys_of(&index), expected.clone());

        let mut backward: Vec<Key> = index.iter_rev().map(|(k, _)| k).collect();
        backward.reverse();
        prop_assert_eq!(backward, expected);
    }

    #[test]
    fn prop_cursor_survives_removal(keys in prop::collection::btree_set(any::<u64>(), 0..200)) {
        let mut index = SplayIndex::new();
        for &key in &keys {
            index.insert(key, ()).unwrap();
        }

        let mut visited = Vec::new();
        let mut cursor = index.cursor(Direction::Forward);
        while let Some(id) = cursor.next(&index) {
            visited.push(index.key(id).unwrap());
            index.remove(id).unwrap();
            prop_assert!(index.check_invariants());
        }

        prop_assert_eq!(visited, keys.into_iter().collect::<Vec<_>>());
        prop_assert!(index.is_empty());
    }

    #[test]
    fn prop_sparse_round_trip(
        entries in prop::collection::btree_map(0u64..5_000_000, any::<u32>(), 0..100),
        sample in 0u64..5_000_000,
    ) {
        let mut array = SparseArray::new(4).unwrap();
        prop_assert!(!array.status(sample));

        for (&index, &value) in &entries {
            array.put_u32(index, value).unwrap();
        }
        for (&index, &value) in &entries {
            prop_assert!(array.status(index));
            prop_assert_eq!(array.get_u32(index).unwrap(), value);
        }
        prop_assert_eq!(array.status(sample), entries.contains_key(&sample));
        prop_assert_eq!(array.size(), entries.len() as u64);

        let visited: Vec<u64> = array.iter().map(|(i, _)| i).collect();
        let expected: Vec<u64> = entries.keys().copied().collect();
        prop_assert_eq!(visited, expected);
        prop_assert!(array.check_invariants_detailed().is_ok());
    }

    #[test]
    fn prop_array_cursor_clears_each_once(
        indices in prop::collection::btree_set(0u64..100_000, 1..80)
    ) {
        let mut array = SparseArray::with_page_size(1, 256).unwrap();
        for &index in &indices {
            array.put(index, &[1]).unwrap();
        }

        let mut seen = BTreeSet::new();
        let mut cursor = array.cursor(Direction::Backward);
        while let Some(index) = cursor.next(&array) {
            prop_assert!(seen.insert(index));
            prop_assert!(array.set_status(index, false).unwrap());
        }
        prop_assert_eq!(seen, indices);
        prop_assert_eq!(array.size(), 0);
    }

    #[test]
    fn prop_resize_page_count(sizes in prop::collection::vec(0u64..20_000, 1..12)) {
        let mut vector = PagedVector::with_page_size("resize", 4, 512).unwrap();
        let per_page = vector.elem_num() as u64;
        for size in sizes {
            vector.resize(size).unwrap();
            prop_assert_eq!(vector.size(), size);
            prop_assert_eq!(vector.pages() as u64, size.div_ceil(per_page));
            prop_assert_eq!(vector.capacity(), vector.pages() as u64 * per_page);
            prop_assert!(vector.check_invariants_detailed().is_ok());
        }
        vector.resize(0).unwrap();
        prop_assert_eq!(vector.pages(), 0);
    }
}
