#![cfg(test)]

// Property tests for ArenaTree kept inside the crate so they can reach the
// test-only invariant checker.

use crate::arena_tree::{ArenaTree, NodeId};
use crate::error::InsertError;
use proptest::prelude::*;
use std::collections::{BTreeMap, HashMap};

#[derive(Clone, Debug)]
enum Op {
    Insert(String, i32),
    Remove(String),
    Find(String),
    Mutate(String, i32),
    Iterate,
    Drain,
}

// A small alphabet keeps collisions between generated keys frequent.
fn arb_key() -> impl Strategy<Value = String> {
    "[a-e]{0,3}"
}

prop_compose! {
    fn arb_ops()(ops in proptest::collection::vec(
        prop_oneof![
            6 => (arb_key(), any::<i32>()).prop_map(|(k, v)| Op::Insert(k, v)),
            4 => arb_key().prop_map(Op::Remove),
            2 => arb_key().prop_map(Op::Find),
            2 => (arb_key(), any::<i32>()).prop_map(|(k, d)| Op::Mutate(k, d)),
            1 => Just(Op::Iterate),
            1 => Just(Op::Drain),
        ], 1..200)) -> Vec<Op> { ops }
}

// State machine harness over ArenaTree against a BTreeMap model.
proptest! {
    #[test]
    fn prop_state_machine(ops in arb_ops()) {
        let mut sut: ArenaTree<String, i32> = ArenaTree::new();
        let mut model: BTreeMap<String, i32> = BTreeMap::new();
        let mut live: HashMap<String, NodeId> = HashMap::new();
        let mut stale: Vec<NodeId> = Vec::new();

        for op in ops {
            match op {
                Op::Insert(k, v) => {
                    let already = model.contains_key(&k);
                    match sut.insert(k.clone(), v) {
                        Ok(h) => {
                            prop_assert!(!already, "insert must fail on duplicate");
                            prop_assert!(live.insert(k.clone(), h).is_none());
                            model.insert(k, v);
                        }
                        Err(InsertError::DuplicateKey) => {
                            prop_assert!(already, "duplicate error only when key exists");
                        }
                    }
                }
                Op::Remove(k) => {
                    let got = sut.remove(k.as_str());
                    let expected = model.remove(&k).map(|v| (k.clone(), v));
                    prop_assert_eq!(got, expected);
                    if let Some(h) = live.remove(&k) {
                        stale.push(h);
                    }
                }
                Op::Find(k) => {
                    let found = sut.find(k.as_str());
                    prop_assert_eq!(found.is_some(), model.contains_key(&k));
                    prop_assert_eq!(found, live.get(&k).copied());
                    prop_assert_eq!(sut.get(k.as_str()).map(|(_, v)| *v), model.get(&k).copied());
                }
                Op::Mutate(k, d) => {
                    if let Some(v) = sut.get_mut(k.as_str()) {
                        *v = v.wrapping_add(d);
                        let mv = model.get_mut(&k).expect("model has every live key");
                        *mv = mv.wrapping_add(d);
                    } else {
                        prop_assert!(!model.contains_key(&k));
                    }
                }
                Op::Iterate => {
                    let seen: Vec<(String, i32)> = sut.iter().map(|(_, k, v)| (k.clone(), *v)).collect();
                    let expected: Vec<(String, i32)> = model.iter().map(|(k, v)| (k.clone(), *v)).collect();
                    prop_assert_eq!(seen, expected);
                }
                Op::Drain => {
                    let mut drained: Vec<(String, i32)> = sut.drain().collect();
                    drained.sort();
                    let expected: Vec<(String, i32)> = std::mem::take(&mut model).into_iter().collect();
                    prop_assert_eq!(drained, expected);
                    stale.extend(live.drain().map(|(_, h)| h));
                }
            }

            // Post-conditions after each op
            sut.assert_invariants();
            for &h in &stale {
                prop_assert!(h.value(&sut).is_none(), "stale handle resolved");
            }
            for (k, h) in &live {
                prop_assert_eq!(h.key(&sut), Some(k));
            }
            prop_assert_eq!(sut.len(), model.len());
            prop_assert_eq!(sut.is_empty(), model.is_empty());
        }
    }
}

// Ascending and descending runs are the inputs that degrade an unbalanced BST.
proptest! {
    #[test]
    fn prop_monotonic_runs_stay_balanced(n in 1u32..2000, descending in any::<bool>()) {
        let mut t: ArenaTree<u32, ()> = ArenaTree::new();
        for i in 0..n {
            let k = if descending { n - i } else { i };
            t.insert(k, ()).unwrap();
        }
        t.assert_invariants();
        // AVL height bound: h < 1.4405 * log2(n + 2)
        let bound = (1.4405 * f64::from(n + 2).log2()).ceil() as u8;
        prop_assert!(t.height() <= bound, "height {} exceeds {}", t.height(), bound);
    }
}
