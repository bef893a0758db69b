#![cfg(test)]

// Property tests for RehashMap kept inside the crate so they can inspect the
// generations, the cursor and the chains directly.

use crate::buckets::Buckets;
use crate::error::ResizeError;
use crate::hasher::{FnHasher, KeyHasher};
use crate::key::KeyBytes;
use crate::rehash_map::{RehashMap, State};
use proptest::prelude::*;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::hash::Hash;

#[derive(Clone, Debug)]
enum Op<K> {
    Insert(K, i32),
    Remove(K),
    Get(K),
    Peek(K),
    Resize(usize),
    Shrink,
    Step(usize),
    Iterate,
    Clear,
}

fn arb_ops<K, S>(key: S) -> impl Strategy<Value = Vec<Op<K>>>
where
    K: Clone + core::fmt::Debug,
    S: Strategy<Value = K> + Clone,
{
    proptest::collection::vec(
        prop_oneof![
            6 => (key.clone(), any::<i32>()).prop_map(|(k, v)| Op::Insert(k, v)),
            3 => key.clone().prop_map(Op::Remove),
            2 => key.clone().prop_map(Op::Get),
            1 => key.prop_map(Op::Peek),
            2 => (0usize..300).prop_map(Op::Resize),
            1 => Just(Op::Shrink),
            2 => (0usize..8).prop_map(Op::Step),
            1 => Just(Op::Iterate),
            1 => Just(Op::Clear),
        ],
        1..200,
    )
}

/// Count a generation's chained entries, checking each sits in the bucket its
/// stored hash maps to.
fn walk<K, V, H>(m: &RehashMap<K, V, H>, b: &Buckets, from: usize) -> usize {
    let mut n = 0;
    for (i, head) in b.heads().iter().enumerate().skip(from) {
        let mut cur = *head;
        while let Some(k) = cur {
            let e = &m.arena[k];
            assert_eq!(b.index(e.hash), i, "entry chained in the wrong bucket");
            n += 1;
            cur = e.next;
        }
    }
    n
}

fn check_structure<K, V, H>(m: &RehashMap<K, V, H>) {
    match &m.state {
        State::Unallocated => assert_eq!(m.arena.len(), 0),
        State::Stable(b) => {
            assert!(b.capacity().is_power_of_two() && b.capacity() >= 4);
            assert_eq!(walk(m, b, 0), b.used);
            assert_eq!(b.used, m.arena.len());
        }
        State::Rehashing { old, new, cursor } => {
            assert!(old.capacity().is_power_of_two() && old.capacity() >= 4);
            assert!(new.capacity().is_power_of_two() && new.capacity() >= 4);
            assert_ne!(old.capacity(), new.capacity());
            assert!(*cursor <= old.capacity());
            assert!(
                old.heads()[..*cursor].iter().all(Option::is_none),
                "migrated prefix must be empty"
            );
            assert_eq!(walk(m, old, *cursor), old.used);
            assert_eq!(walk(m, new, 0), new.used);
            assert_eq!(old.used + new.used, m.arena.len());
        }
    }
}

fn run_state_machine<K, H>(mut sut: RehashMap<K, i32, H>, ops: Vec<Op<K>>) -> Result<(), TestCaseError>
where
    K: KeyBytes + Eq + Hash + Ord + Clone + core::fmt::Debug,
    H: KeyHasher,
{
    let mut model: HashMap<K, i32> = HashMap::new();

    for op in ops {
        match op {
            Op::Insert(k, v) => {
                let prev = sut.insert(k.clone(), v);
                prop_assert_eq!(prev, model.insert(k, v));
            }
            Op::Remove(k) => {
                let got = sut.remove(&k);
                prop_assert_eq!(got, model.remove(&k));
            }
            Op::Get(k) => {
                prop_assert_eq!(sut.get(&k), model.get(&k));
            }
            Op::Peek(k) => {
                prop_assert_eq!(sut.peek(&k), model.get(&k));
            }
            Op::Resize(n) => {
                let was_rehashing = sut.is_rehashing();
                match sut.request_resize(n) {
                    Ok(()) => {
                        prop_assert!(!was_rehashing);
                        prop_assert!(n >= model.len());
                        let s = sut.stats();
                        let target = if sut.is_rehashing() { s.capacity[1] } else { s.capacity[0] };
                        prop_assert!(target.is_power_of_two());
                        prop_assert!(target >= n && target >= 4);
                    }
                    Err(ResizeError::AlreadyRehashing) => prop_assert!(was_rehashing),
                    Err(ResizeError::SizeTooSmall { requested, len }) => {
                        prop_assert!(!was_rehashing);
                        prop_assert_eq!(requested, n);
                        prop_assert_eq!(len, model.len());
                        prop_assert!(n < len);
                    }
                    Err(e) => prop_assert!(false, "unexpected error {:?}", e),
                }
            }
            Op::Shrink => {
                let was_rehashing = sut.is_rehashing();
                match sut.shrink_to_fit() {
                    Ok(()) => prop_assert!(!was_rehashing),
                    Err(e) => {
                        prop_assert!(was_rehashing);
                        prop_assert_eq!(e, ResizeError::AlreadyRehashing);
                    }
                }
            }
            Op::Step(n) => {
                let before = sut.stats();
                let still = sut.rehash_step(n);
                prop_assert_eq!(still, sut.is_rehashing());
                if n == 0 {
                    if before.rehash_cursor.is_some() && before.used[0] == 0 {
                        // Nothing left to drain: promoted without a budget.
                        prop_assert!(!still);
                        prop_assert_eq!(sut.stats().capacity, [before.capacity[1], 0]);
                        prop_assert_eq!(sut.stats().used, [before.used[1], 0]);
                    } else {
                        prop_assert_eq!(sut.stats(), before);
                    }
                }
            }
            Op::Iterate => {
                let mut seen: BTreeMap<K, i32> = BTreeMap::new();
                let mut visits = 0;
                sut.range(|k, v| {
                    visits += 1;
                    seen.insert(k.clone(), *v);
                });
                let expected: BTreeMap<K, i32> = model.iter().map(|(k, v)| (k.clone(), *v)).collect();
                prop_assert_eq!(visits, model.len());
                prop_assert_eq!(seen, expected);
            }
            Op::Clear => {
                sut.clear();
                model.clear();
            }
        }

        check_structure(&sut);
        prop_assert_eq!(sut.len(), model.len());
        prop_assert_eq!(sut.is_empty(), model.is_empty());
    }

    // Draining the migration changes nothing observable.
    sut.finish_rehash();
    prop_assert!(!sut.is_rehashing());
    check_structure(&sut);
    let keys: BTreeSet<K> = sut.keys().cloned().collect();
    let model_keys: BTreeSet<K> = model.keys().cloned().collect();
    prop_assert_eq!(keys, model_keys);
    for (k, v) in &model {
        prop_assert_eq!(sut.peek(k), Some(v));
    }
    Ok(())
}

proptest! {
    #[test]
    fn prop_state_machine(ops in arb_ops(0u16..64)) {
        run_state_machine(RehashMap::new(), ops)?;
    }

    // Collision variant: a handful of hash values force long shared chains
    // that split differently in every generation size.
    #[test]
    fn prop_state_machine_with_collisions(ops in arb_ops("[a-d]{0,3}")) {
        let sut = RehashMap::with_hasher(FnHasher(|b: &[u8]| b.len() as u64));
        run_state_machine::<String, _>(sut, ops)?;
    }

    // Larger budgets per operation.
    #[test]
    fn prop_state_machine_wide_steps(ops in arb_ops(0u32..200)) {
        let sut = RehashMap::builder().step_buckets(3).empty_visit_factor(2).build();
        run_state_machine(sut, ops)?;
    }
}
