use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use keyed_store::{Entry, KeyedStore};
use std::time::Duration;

fn lcg(mut s: u64) -> impl Iterator<Item = u64> {
    std::iter::from_fn(move || {
        s = s.wrapping_mul(6364136223846793005).wrapping_add(1);
        Some(s)
    })
}

fn key(n: u64) -> String {
    format!("k{:016x}", n)
}

fn filled(seed: u64, n: usize) -> (KeyedStore<u64>, Vec<String>) {
    let keys: Vec<_> = lcg(seed).take(n).map(key).collect();
    let mut s = KeyedStore::with_capacity(n, None);
    for (i, k) in keys.iter().enumerate() {
        s.put(k, i as u64);
    }
    (s, keys)
}

fn bench_put_random(c: &mut Criterion) {
    let keys: Vec<_> = lcg(1).take(10_000).map(key).collect();
    c.bench_function("keyed_store_put_random_10k", |b| {
        b.iter_batched(
            KeyedStore::<u64>::new,
            |mut s| {
                for (i, k) in keys.iter().enumerate() {
                    s.put(k, i as u64);
                }
                black_box(s)
            },
            BatchSize::SmallInput,
        )
    });
}

// Ascending keys degrade an unbalanced tree to a list.
fn bench_put_ascending(c: &mut Criterion) {
    let keys: Vec<_> = (0..10_000u64).map(key).collect();
    c.bench_function("keyed_store_put_ascending_10k", |b| {
        b.iter_batched(
            KeyedStore::<u64>::new,
            |mut s| {
                for (i, k) in keys.iter().enumerate() {
                    s.put(k, i as u64);
                }
                black_box(s)
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_overwrite_with_release(c: &mut Criterion) {
    c.bench_function("keyed_store_overwrite_with_release", |b| {
        let mut s = KeyedStore::with_release(|e: Entry<'_, u64>| {
            black_box(e.value());
        });
        s.put("key", 0);
        let mut i = 0u64;
        b.iter(|| {
            i += 1;
            s.put("key", i);
        })
    });
}

fn bench_get_hit(c: &mut Criterion) {
    c.bench_function("keyed_store_get_hit", |b| {
        let (s, keys) = filled(7, 20_000);
        let mut it = keys.iter().cycle();
        b.iter(|| {
            let k = it.next().unwrap();
            black_box(s.get(k));
        })
    });
}

fn bench_get_miss(c: &mut Criterion) {
    c.bench_function("keyed_store_get_miss", |b| {
        let (s, _keys) = filled(11, 10_000);
        let mut miss = lcg(0xdead_beef);
        b.iter(|| {
            // generate keys unlikely in the store
            let k = key(miss.next().unwrap());
            black_box(s.get(&k));
        })
    });
}

fn bench_remove_all(c: &mut Criterion) {
    c.bench_function("keyed_store_remove_10k", |b| {
        b.iter_batched(
            || filled(3, 10_000),
            |(mut s, keys)| {
                for k in &keys {
                    s.remove(k);
                }
                black_box(s)
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_foreach(c: &mut Criterion) {
    c.bench_function("keyed_store_foreach_10k", |b| {
        let (s, _keys) = filled(5, 10_000);
        b.iter(|| {
            let mut sum = 0u64;
            s.foreach(|e| sum = sum.wrapping_add(*e.value()));
            black_box(sum)
        })
    });
}

fn bench_config() -> Criterion {
    Criterion::default()
        .sample_size(50)
        .measurement_time(Duration::from_secs(8))
        .warm_up_time(Duration::from_secs(2))
}

criterion_group! {
    name = benches;
    config = bench_config();
    targets = bench_put_random, bench_put_ascending, bench_overwrite_with_release,
        bench_get_hit, bench_get_miss, bench_remove_all, bench_foreach
}
criterion_main!(benches);
