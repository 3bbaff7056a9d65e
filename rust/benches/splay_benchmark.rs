use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use paged_containers::SplayIndex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeMap;

fn random_keys(n: usize, seed: u64) -> Vec<u64> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n).map(|_| rng.gen()).collect()
}

fn build_index(keys: &[u64]) -> SplayIndex<u64> {
    let mut index = SplayIndex::new();
    for &key in keys {
        let _ = index.insert(key, key);
    }
    index
}

fn insertion_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("insertion");

    for size in [1_000usize, 10_000, 100_000] {
        let keys = random_keys(size, 1);

        group.bench_with_input(BenchmarkId::new("splay_index", size), &keys, |b, keys| {
            b.iter(|| black_box(build_index(keys)))
        });

        group.bench_with_input(BenchmarkId::new("btree_map", size), &keys, |b, keys| {
            b.iter(|| {
                let mut map = BTreeMap::new();
                for &key in keys {
                    map.insert(key, key);
                }
                black_box(map)
            })
        });
    }

    group.finish();
}

fn lookup_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("lookup");
    let keys = random_keys(100_000, 2);
    let mut index = build_index(&keys);
    let map: BTreeMap<u64, u64> = keys.iter().map(|&k| (k, k)).collect();

    group.bench_function("splay_find_random", |b| {
        let mut i = 0;
        b.iter(|| {
            i = (i + 7919) % keys.len();
            black_box(index.find(keys[i]))
        })
    });

    // Repeated access to a small working set is where splaying pays off.
    let hot: Vec<u64> = keys[..16].to_vec();
    group.bench_function("splay_find_hot_set", |b| {
        let mut i = 0;
        b.iter(|| {
            i = (i + 1) % hot.len();
            black_box(index.find(hot[i]))
        })
    });

    group.bench_function("splay_lookup_no_splay", |b| {
        let mut i = 0;
        b.iter(|| {
            i = (i + 7919) % keys.len();
            black_box(index.lookup(keys[i]))
        })
    });

    group.bench_function("btree_map_get", |b| {
        let mut i = 0;
        b.iter(|| {
            i = (i + 7919) % keys.len();
            black_box(map.get(&keys[i]))
        })
    });

    group.finish();
}

fn removal_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("removal");
    let keys = random_keys(10_000, 3);

    group.bench_function("splay_remove_all", |b| {
        b.iter_batched(
            || build_index(&keys),
            |mut index| {
                for &key in &keys {
                    index.remove_key(key);
                }
                black_box(index)
            },
            criterion::BatchSize::LargeInput,
        )
    });

    group.bench_function("splay_retain_half", |b| {
        b.iter_batched(
            || build_index(&keys),
            |mut index| black_box(index.retain(|key, _| key % 2 == 0)),
            criterion::BatchSize::LargeInput,
        )
    });

    group.finish();
}

fn iteration_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("iteration");
    let keys = random_keys(100_000, 4);
    let index = build_index(&keys);
    let map: BTreeMap<u64, u64> = keys.iter().map(|&k| (k, k)).collect();

    group.bench_function("splay_iter", |b| {
        b.iter(|| black_box(index.iter().map(|(k, _)| k).fold(0u64, u64::wrapping_add)))
    });

    group.bench_function("btree_map_iter", |b| {
        b.iter(|| black_box(map.keys().fold(0u64, |acc, &k| acc.wrapping_add(k))))
    });

    group.finish();
}

criterion_group!(
    benches,
    insertion_benchmark,
    lookup_benchmark,
    removal_benchmark,
    iteration_benchmark
);
criterion_main!(benches);
