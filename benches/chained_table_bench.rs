use chained_hashtable::{ChainedHashTable, StringContent, TableBuilder};
use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use hashbrown::HashMap;
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

type Table = ChainedHashTable<String, u64, StringContent, StringContent>;

fn string_table() -> Table {
    ChainedHashTable::with_strategies(StringContent, StringContent)
}

fn bench_set_fresh_100k(c: &mut Criterion) {
    c.bench_function("chained::set_fresh_100k", |b| {
        b.iter_batched(
            string_table,
            |mut t| {
                for (i, x) in lcg(1).take(100_000).enumerate() {
                    t.set(key(x), i as u64).unwrap();
                }
                black_box(t)
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_set_presized_100k(c: &mut Criterion) {
    c.bench_function("chained::set_presized_100k", |b| {
        b.iter_batched(
            || {
                TableBuilder::new(StringContent, StringContent)
                    .min_capacity(16_384)
                    .build()
                    .unwrap()
            },
            |mut t: Table| {
                for (i, x) in lcg(3).take(100_000).enumerate() {
                    t.set(key(x), i as u64).unwrap();
                }
                black_box(t)
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_get_hit_miss(c: &mut Criterion) {
    let mut t = string_table();
    let keys: Vec<String> = lcg(7).take(100_000).map(key).collect();
    for (i, k) in keys.iter().enumerate() {
        t.set(k.clone(), i as u64).unwrap();
    }
    let misses: Vec<String> = lcg(8).take(10_000).map(key).collect();

    c.bench_function("chained::get_hit_10k", |b| {
        b.iter(|| {
            for k in keys.iter().step_by(10) {
                black_box(t.get(k.as_str()));
            }
        })
    });
    c.bench_function("chained::get_miss_10k", |b| {
        b.iter(|| {
            for k in &misses {
                black_box(t.get(k.as_str()));
            }
        })
    });
}

fn bench_remove_random_10k(c: &mut Criterion) {
    c.bench_function("chained::remove_random_10k_of_110k", |b| {
        b.iter_batched(
            || {
                let mut t = string_table();
                let keys: Vec<String> = lcg(5).take(110_000).map(key).collect();
                for (i, k) in keys.iter().enumerate() {
                    t.set(k.clone(), i as u64).unwrap();
                }
                // Precompute 10k unique indices via LCG
                let n = keys.len();
                let mut sel = std::collections::HashSet::with_capacity(10_000);
                let mut s = 0x9e3779b97f4a7c15u64;
                while sel.len() < 10_000 {
                    s = s.wrapping_mul(2862933555777941757).wrapping_add(3037000493);
                    sel.insert((s as usize) % n);
                }
                let to_remove: Vec<String> = sel.into_iter().map(|i| keys[i].clone()).collect();
                (t, to_remove)
            },
            |(mut t, to_remove)| {
                for k in &to_remove {
                    let _ = t.remove(k.as_str());
                }
                black_box(t)
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_traverse_100k(c: &mut Criterion) {
    let mut t = string_table();
    for (i, x) in lcg(11).take(100_000).enumerate() {
        t.set(key(x), i as u64).unwrap();
    }
    c.bench_function("chained::traverse_100k", |b| {
        b.iter(|| {
            let mut sum = 0u64;
            let none: Option<()> = t.traverse(|_, v| {
                sum = sum.wrapping_add(*v);
                None
            });
            black_box((none, sum))
        })
    });
}

// Baseline: the same workloads on hashbrown's SwissTable.
fn bench_hashbrown_baseline(c: &mut Criterion) {
    c.bench_function("hashbrown::insert_fresh_100k", |b| {
        b.iter_batched(
            HashMap::<String, u64>::new,
            |mut m| {
                for (i, x) in lcg(1).take(100_000).enumerate() {
                    m.insert(key(x), i as u64);
                }
                black_box(m)
            },
            BatchSize::SmallInput,
        )
    });

    let mut m = HashMap::new();
    let keys: Vec<String> = lcg(7).take(100_000).map(key).collect();
    for (i, k) in keys.iter().enumerate() {
        m.insert(k.clone(), i as u64);
    }
    c.bench_function("hashbrown::get_hit_10k", |b| {
        b.iter(|| {
            for k in keys.iter().step_by(10) {
                black_box(m.get(k.as_str()));
            }
        })
    });
}

fn bench_config() -> Criterion {
    Criterion::default()
        .sample_size(12)
        .measurement_time(Duration::from_secs(5))
        .warm_up_time(Duration::from_secs(1))
}

criterion_group! {
    name = benches_insert;
    config = bench_config();
    targets = bench_set_fresh_100k, bench_set_presized_100k
}
criterion_group! {
    name = benches_ops;
    config = bench_config();
    targets = bench_get_hit_miss,
              bench_remove_random_10k,
              bench_traverse_100k
}
criterion_group! {
    name = benches_baseline;
    config = bench_config();
    targets = bench_hashbrown_baseline
}
criterion_main!(benches_insert, benches_ops, benches_baseline);
