// KeyedStore property tests.
//
// Property 1: the store agrees with a BTreeMap model after every operation.
//  - Operations: put, try_put, remove, get, clear.
//  - Invariant: get/len/contains_key match the model; foreach yields the
//    model's entries in key order.
//
// Property 2: release discipline.
//  - Every value carries a unique id. The callback records released ids.
//  - Invariant: released ids never repeat, never include an id that is still
//    stored, and together with the stored ids cover every id ever put
//    (checked again after the store is dropped).
use keyed_store::{Entry, KeyedStore};
use proptest::prelude::*;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex};

#[derive(Clone, Debug)]
enum Op {
    Put(String),
    TryPut(String),
    Remove(String),
    Get(String),
    Clear,
}

fn arb_op() -> impl Strategy<Value = Op> {
    let key = "[a-d]{0,2}";
    prop_oneof![
        6 => key.prop_map(Op::Put),
        2 => key.prop_map(Op::TryPut),
        4 => key.prop_map(Op::Remove),
        3 => key.prop_map(Op::Get),
        1 => Just(Op::Clear),
    ]
}

proptest! {
    #[test]
    fn prop_store_matches_model_and_releases_once(ops in proptest::collection::vec(arb_op(), 1..150)) {
        let released: Arc<Mutex<Vec<u64>>> = Arc::default();
        let sink = Arc::clone(&released);
        let mut store: KeyedStore<u64> = KeyedStore::with_release(move |e: Entry<'_, u64>| {
            sink.lock().unwrap().push(*e.value());
        });
        let mut model: BTreeMap<String, u64> = BTreeMap::new();
        let mut next_id = 0u64;

        for op in ops {
            match op {
                Op::Put(k) => {
                    store.put(&k, next_id);
                    model.insert(k, next_id);
                    next_id += 1;
                }
                Op::TryPut(k) => {
                    prop_assert!(store.try_put(&k, next_id).is_ok());
                    model.insert(k, next_id);
                    next_id += 1;
                }
                Op::Remove(k) => {
                    store.remove(&k);
                    model.remove(&k);
                }
                Op::Get(k) => {
                    prop_assert_eq!(store.get(&k), model.get(&k));
                }
                Op::Clear => {
                    store.clear();
                    model.clear();
                    prop_assert_eq!(store.iter().count(), 0);
                }
            }

            prop_assert_eq!(store.len(), model.len());
            let mut seen = Vec::new();
            store.foreach(|e| seen.push((e.key().to_string(), *e.value())));
            let expected: Vec<(String, u64)> = model.iter().map(|(k, v)| (k.clone(), *v)).collect();
            prop_assert_eq!(seen, expected);

            let rel = released.lock().unwrap();
            let rel_set: BTreeSet<u64> = rel.iter().copied().collect();
            prop_assert_eq!(rel_set.len(), rel.len(), "a value was released twice");
            let stored: BTreeSet<u64> = model.values().copied().collect();
            prop_assert!(rel_set.is_disjoint(&stored), "a stored value was released");
            prop_assert_eq!(rel_set.len() + stored.len(), next_id as usize);
        }

        drop(store);
        let rel = released.lock().unwrap();
        let rel_set: BTreeSet<u64> = rel.iter().copied().collect();
        prop_assert_eq!(rel.len(), next_id as usize);
        prop_assert_eq!(rel_set, (0..next_id).collect::<BTreeSet<u64>>());
    }
}
