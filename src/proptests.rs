use super::*;

use proptest::prelude::*;
use proptest_derive::Arbitrary;
use std::collections::BTreeMap;

fn validate_tree<K: Ord + std::fmt::Debug, V>(t: &AvlTree<K, V>) {
    let root = t.inner.read();
    node::validate(&root.link);

    let mut reachable = 0usize;
    node::walk(&root.link, &mut |_, _| {
        reachable += 1;
        true
    });
    assert_eq!(
        reachable, root.len,
        "reachable node count must match AvlTree::len"
    );
}

// Keys come from a small domain so that overwrites, repeated deletes and
// LoadOrStore hits are common.
#[derive(Clone, Debug, Arbitrary)]
enum Op {
    #[proptest(weight = 40)]
    Store(#[proptest(strategy = "0u16..256")] u16, u32),
    #[proptest(weight = 20)]
    Delete(#[proptest(strategy = "0u16..256")] u16),
    #[proptest(weight = 10)]
    LoadAndDelete(#[proptest(strategy = "0u16..256")] u16),
    #[proptest(weight = 10)]
    LoadOrStore(#[proptest(strategy = "0u16..256")] u16, u32),
    #[proptest(weight = 5)]
    TryInsert(#[proptest(strategy = "0u16..256")] u16, u32),
    #[proptest(weight = 14)]
    Load(#[proptest(strategy = "0u16..256")] u16),
    #[proptest(weight = 1)]
    Clear,
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        max_shrink_iters: 50_000,
        .. ProptestConfig::default()
    })]

    #[test]
    fn prop_equivalence(ops in prop::collection::vec(any::<Op>(), 0..=1000)) {
        let t: AvlTree<u16, u32> = AvlTree::new();
        let mut m: BTreeMap<u16, u32> = BTreeMap::new();

        for op in ops {
            match op {
                Op::Store(key, value) => {
                    prop_assert_eq!(t.store(key, value), m.insert(key, value));
                }
                Op::Delete(key) => {
                    prop_assert_eq!(t.delete(&key), m.remove(&key).is_some());
                }
                Op::LoadAndDelete(key) => {
                    prop_assert_eq!(t.load_and_delete(&key), m.remove(&key));
                }
                Op::LoadOrStore(key, value) => {
                    let expected = match m.get(&key) {
                        Some(&existing) => Entry::Loaded(existing),
                        None => {
                            m.insert(key, value);
                            Entry::Stored(value)
                        }
                    };
                    prop_assert_eq!(t.load_or_store(key, value), expected);
                }
                Op::TryInsert(key, value) => {
                    let expected = if m.contains_key(&key) {
                        Err(AvlError::KeyExists)
                    } else {
                        m.insert(key, value);
                        Ok(())
                    };
                    prop_assert_eq!(t.try_insert(key, value), expected);
                }
                Op::Load(key) => {
                    prop_assert_eq!(t.load(&key), m.get(&key).copied());
                }
                Op::Clear => {
                    t.clear();
                    m.clear();
                }
            }

            prop_assert_eq!(t.len(), m.len());
            validate_tree(&t);
        }

        let mut got = Vec::new();
        t.range(|k, v| {
            got.push((*k, *v));
            true
        });
        let expected: Vec<(u16, u32)> = m.iter().map(|(k, v)| (*k, *v)).collect();
        prop_assert_eq!(&got, &expected);

        let mut got_rev = Vec::new();
        t.range_reverse(|k, v| {
            got_rev.push((*k, *v));
            true
        });
        got_rev.reverse();
        prop_assert_eq!(got_rev, expected);

        prop_assert_eq!(t.first(), m.first_key_value().map(|(k, v)| (*k, *v)));
        prop_assert_eq!(t.last(), m.last_key_value().map(|(k, v)| (*k, *v)));
    }

    #[test]
    fn prop_range_stops_after_limit(
        keys in prop::collection::btree_set(any::<i32>(), 0..200),
        limit in 1usize..20,
    ) {
        let t: AvlTree<i32, ()> = keys.iter().map(|k| (*k, ())).collect();

        let mut seen = Vec::new();
        t.range(|k, _| {
            seen.push(*k);
            seen.len() < limit
        });
        let expected: Vec<i32> = keys.iter().copied().take(limit).collect();
        prop_assert_eq!(seen, expected);

        let mut seen = Vec::new();
        t.range_reverse(|k, _| {
            seen.push(*k);
            seen.len() < limit
        });
        let expected: Vec<i32> = keys.iter().rev().copied().take(limit).collect();
        prop_assert_eq!(seen, expected);
    }
}

fn for_each_permutation<T: Clone>(items: &[T], mut f: impl FnMut(Vec<T>)) {
    fn rec<T: Clone>(items: &[T], used: &mut [bool], out: &mut Vec<T>, f: &mut impl FnMut(Vec<T>)) {
        if out.len() == items.len() {
            f(out.clone());
            return;
        }
        for i in 0..items.len() {
            if used[i] {
                continue;
            }
            used[i] = true;
            out.push(items[i].clone());
            rec(items, used, out, f);
            out.pop();
            used[i] = false;
        }
    }

    let mut used = vec![false; items.len()];
    let mut out = Vec::with_capacity(items.len());
    rec(items, &mut used, &mut out, &mut f);
}

#[test]
fn exhaustive_insert_order_small_set() {
    let keys: Vec<u8> = (1..=7).collect();

    for_each_permutation(&keys, |perm| {
        let t: AvlTree<u8, u64> = AvlTree::new();
        let mut m: BTreeMap<u8, u64> = BTreeMap::new();

        for (i, k) in perm.into_iter().enumerate() {
            let v = i as u64;
            assert_eq!(t.store(k, v), m.insert(k, v));
            validate_tree(&t);
        }

        // Seven keys always fit in height 3 or 4.
        assert!(t.height() <= 4);
        let mut got = Vec::new();
        t.range(|k, v| {
            got.push((*k, *v));
            true
        });
        let expected: Vec<(u8, u64)> = m.iter().map(|(k, v)| (*k, *v)).collect();
        assert_eq!(got, expected);
    });
}

#[test]
fn exhaustive_remove_order_small_set() {
    let keys: Vec<u8> = (1..=7).collect();

    // Insert in a fixed order, then remove in all permutations.
    let base_tree: AvlTree<u8, u64> = AvlTree::new();
    let mut base_map: BTreeMap<u8, u64> = BTreeMap::new();
    for (i, k) in keys.iter().enumerate() {
        let v = i as u64;
        assert_eq!(base_tree.store(*k, v), base_map.insert(*k, v));
    }

    for_each_permutation(&keys, |perm| {
        let t = base_tree.clone();
        let mut m = base_map.clone();

        for k in perm {
            assert_eq!(t.load_and_delete(&k), m.remove(&k));
            assert_eq!(t.len(), m.len());
            validate_tree(&t);
        }
        assert_eq!(t.len(), 0);
        assert!(t.inner.read().link.is_none());
    });
}
