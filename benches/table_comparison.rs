use core::hash::BuildHasher;
use core::hash::Hash;
use core::hint::black_box;

use criterion::AxisScale;
use criterion::BatchSize;
use criterion::Criterion;
use criterion::PlotConfiguration;
use criterion::Throughput;
use criterion::criterion_group;
use criterion::criterion_main;
use hashbrown::HashMap as HashbrownMap;
use probe_table::HashTable as ProbeTable;
use rand::Rng;
use rand::SeedableRng;
use rand::TryRngCore;
use rand::rngs::OsRng;
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand_distr::Zipf;
use siphasher::sip::SipHasher;

#[derive(Clone, Copy, Default)]
struct SipBuild;

impl BuildHasher for SipBuild {
    type Hasher = SipHasher;

    fn build_hasher(&self) -> Self::Hasher {
        SipHasher::new()
    }
}

trait BenchKey: Clone + Hash + Eq {
    fn new(key: u64) -> Self;
}

#[derive(Clone, Hash, PartialEq, Eq)]
struct SmallKey(u64);

impl BenchKey for SmallKey {
    fn new(key: u64) -> Self {
        black_box(Self(key))
    }
}

#[derive(Clone, Hash, PartialEq, Eq)]
struct StringKey(String);

impl BenchKey for StringKey {
    fn new(key: u64) -> Self {
        black_box(Self(format!("key_{:016X}", key)))
    }
}

const SIZES: &[usize] = &[
    (1 << 10),
    (1 << 11),
    (1 << 12),
    (1 << 13),
    (1 << 14),
    (1 << 15),
    (1 << 16),
];

/// Entries that fit in a table of `size` slots without growing.
fn fill_count(size: usize) -> usize {
    size * probe_table::hash_table::MAX_FILL_PERCENT / 100
}

fn random_keys<K: BenchKey>(count: usize) -> Vec<K> {
    let mut rng = OsRng;
    (0..count)
        .map(|_| K::new(rng.try_next_u64().unwrap()))
        .collect()
}

fn sequential_keys<K: BenchKey>(range: core::ops::Range<usize>) -> Vec<K> {
    range.map(|i| K::new(i as u64)).collect()
}

fn bench_insert_random<K: BenchKey, const MAX_SIZE: usize>(c: &mut Criterion) {
    let mut group = c.benchmark_group(format!(
        "insert_random_{}",
        core::any::type_name::<K>()
    ));
    group.plot_config(PlotConfiguration::default().summary_scale(AxisScale::Logarithmic));

    for &size in SIZES[..=MAX_SIZE].iter() {
        let count = fill_count(size);
        let keys = random_keys::<K>(count);
        group.throughput(Throughput::Elements(count as u64));

        group.bench_function(format!("probe_table/{size}"), |b| {
            b.iter_batched(
                || {
                    let mut keys = keys.clone();
                    keys.shuffle(&mut SmallRng::from_os_rng());
                    keys
                },
                |keys| {
                    let mut table = ProbeTable::with_capacity_and_hasher(8, SipBuild);
                    for (i, key) in keys.into_iter().enumerate() {
                        table.insert(key, i);
                    }
                    black_box(table)
                },
                BatchSize::SmallInput,
            )
        });

        group.bench_function(format!("hashbrown/{size}"), |b| {
            b.iter_batched(
                || {
                    let mut keys = keys.clone();
                    keys.shuffle(&mut SmallRng::from_os_rng());
                    keys
                },
                |keys| {
                    let mut table = HashbrownMap::with_hasher(SipBuild);
                    for (i, key) in keys.into_iter().enumerate() {
                        table.insert(key, i);
                    }
                    black_box(table)
                },
                BatchSize::SmallInput,
            )
        });
    }

    group.finish();
}

fn bench_insert_preallocated<K: BenchKey, const MAX_SIZE: usize>(c: &mut Criterion) {
    let mut group = c.benchmark_group(format!(
        "insert_preallocated_{}",
        core::any::type_name::<K>()
    ));
    group.plot_config(PlotConfiguration::default().summary_scale(AxisScale::Logarithmic));

    for &size in SIZES[..=MAX_SIZE].iter() {
        let count = fill_count(size);
        let keys = random_keys::<K>(count);
        group.throughput(Throughput::Elements(count as u64));

        group.bench_function(format!("probe_table/{size}"), |b| {
            b.iter_batched(
                || keys.clone(),
                |keys| {
                    let mut table = ProbeTable::with_capacity_and_hasher(size, SipBuild);
                    for (i, key) in keys.into_iter().enumerate() {
                        table.insert(key, i);
                    }
                    black_box(table)
                },
                BatchSize::SmallInput,
            )
        });

        group.bench_function(format!("hashbrown/{size}"), |b| {
            b.iter_batched(
                || keys.clone(),
                |keys| {
                    let mut table = HashbrownMap::with_capacity_and_hasher(count, SipBuild);
                    for (i, key) in keys.into_iter().enumerate() {
                        table.insert(key, i);
                    }
                    black_box(table)
                },
                BatchSize::SmallInput,
            )
        });
    }

    group.finish();
}

fn bench_find_hit<K: BenchKey, const MAX_SIZE: usize>(c: &mut Criterion) {
    let mut group = c.benchmark_group(format!("find_hit_{}", core::any::type_name::<K>()));
    group.plot_config(PlotConfiguration::default().summary_scale(AxisScale::Logarithmic));

    for &size in SIZES[..=MAX_SIZE].iter() {
        let count = fill_count(size);
        let mut keys = sequential_keys::<K>(0..count);

        let mut probe = ProbeTable::with_capacity_and_hasher(size, SipBuild);
        let mut hashbrown = HashbrownMap::with_capacity_and_hasher(count, SipBuild);
        for (i, key) in keys.iter().enumerate() {
            probe.insert(key.clone(), i);
            hashbrown.insert(key.clone(), i);
        }
        keys.shuffle(&mut SmallRng::from_os_rng());
        group.throughput(Throughput::Elements(count as u64));

        group.bench_function(format!("probe_table/{size}"), |b| {
            b.iter(|| {
                for key in &keys {
                    black_box(probe.try_get(key));
                }
            })
        });

        group.bench_function(format!("hashbrown/{size}"), |b| {
            b.iter(|| {
                for key in &keys {
                    black_box(hashbrown.get(key));
                }
            })
        });
    }

    group.finish();
}

fn bench_find_miss<K: BenchKey, const MAX_SIZE: usize>(c: &mut Criterion) {
    let mut group = c.benchmark_group(format!("find_miss_{}", core::any::type_name::<K>()));
    group.plot_config(PlotConfiguration::default().summary_scale(AxisScale::Logarithmic));

    for &size in SIZES[..=MAX_SIZE].iter() {
        let count = fill_count(size);
        let present = sequential_keys::<K>(0..count);
        let absent = sequential_keys::<K>(count..count * 2);

        let mut probe = ProbeTable::with_capacity_and_hasher(size, SipBuild);
        let mut hashbrown = HashbrownMap::with_capacity_and_hasher(count, SipBuild);
        for (i, key) in present.into_iter().enumerate() {
            probe.insert(key.clone(), i);
            hashbrown.insert(key, i);
        }
        group.throughput(Throughput::Elements(count as u64));

        group.bench_function(format!("probe_table/{size}"), |b| {
            b.iter(|| {
                for key in &absent {
                    black_box(probe.try_get(key));
                }
            })
        });

        group.bench_function(format!("hashbrown/{size}"), |b| {
            b.iter(|| {
                for key in &absent {
                    black_box(hashbrown.get(key));
                }
            })
        });
    }

    group.finish();
}

fn bench_remove<K: BenchKey, const MAX_SIZE: usize>(c: &mut Criterion) {
    let mut group = c.benchmark_group(format!("remove_{}", core::any::type_name::<K>()));
    group.plot_config(PlotConfiguration::default().summary_scale(AxisScale::Logarithmic));

    for &size in SIZES[..=MAX_SIZE].iter() {
        let count = fill_count(size);
        let keys = random_keys::<K>(count);
        group.throughput(Throughput::Elements(count as u64));

        group.bench_function(format!("probe_table/{size}"), |b| {
            b.iter_batched(
                || {
                    let mut table = ProbeTable::with_capacity_and_hasher(size, SipBuild);
                    for (i, key) in keys.iter().enumerate() {
                        table.insert(key.clone(), i);
                    }
                    let mut order = keys.clone();
                    order.shuffle(&mut SmallRng::from_os_rng());
                    (table, order)
                },
                |(mut table, order)| {
                    for key in &order {
                        black_box(table.remove(key));
                    }
                    black_box(table)
                },
                BatchSize::SmallInput,
            )
        });

        group.bench_function(format!("hashbrown/{size}"), |b| {
            b.iter_batched(
                || {
                    let mut table = HashbrownMap::with_capacity_and_hasher(count, SipBuild);
                    for (i, key) in keys.iter().enumerate() {
                        table.insert(key.clone(), i);
                    }
                    let mut order = keys.clone();
                    order.shuffle(&mut SmallRng::from_os_rng());
                    (table, order)
                },
                |(mut table, order)| {
                    for key in &order {
                        black_box(table.remove(key));
                    }
                    black_box(table)
                },
                BatchSize::SmallInput,
            )
        });
    }

    group.finish();
}

fn bench_iteration<K: BenchKey, const MAX_SIZE: usize>(c: &mut Criterion) {
    let mut group = c.benchmark_group(format!("iteration_{}", core::any::type_name::<K>()));
    group.plot_config(PlotConfiguration::default().summary_scale(AxisScale::Logarithmic));

    for &size in SIZES[..=MAX_SIZE].iter() {
        let count = fill_count(size);
        let keys = random_keys::<K>(count);

        let mut probe = ProbeTable::with_capacity_and_hasher(size, SipBuild);
        let mut hashbrown = HashbrownMap::with_capacity_and_hasher(count, SipBuild);
        for (i, key) in keys.into_iter().enumerate() {
            probe.insert(key.clone(), i);
            hashbrown.insert(key, i);
        }
        group.throughput(Throughput::Elements(count as u64));

        group.bench_function(format!("probe_table/{size}"), |b| {
            b.iter(|| black_box(probe.values().sum::<usize>()))
        });

        group.bench_function(format!("hashbrown/{size}"), |b| {
            b.iter(|| black_box(hashbrown.values().sum::<usize>()))
        });
    }

    group.finish();
}

#[derive(Clone, Copy)]
enum Operation {
    Insert,
    Find,
    Remove,
}

/// Inserts, finds and removes over a Zipf-distributed key space twice the
/// size of the table, leaving a tombstone-heavy table behind.
fn bench_mixed_zipf<K: BenchKey, const MAX_SIZE: usize>(c: &mut Criterion) {
    const KEY_SPACE_MULTIPLIER: usize = 2;

    let mut group = c.benchmark_group(format!("mixed_zipf_{}", core::any::type_name::<K>()));
    group.plot_config(PlotConfiguration::default().summary_scale(AxisScale::Logarithmic));

    for &size in SIZES[..=MAX_SIZE].iter() {
        let count = fill_count(size);
        let operations = (0..count * 3)
            .map(|i| match i % 3 {
                0 => Operation::Insert,
                1 => Operation::Find,
                _ => Operation::Remove,
            })
            .collect::<Vec<_>>();
        let key_distr = Zipf::new((size * KEY_SPACE_MULTIPLIER) as f32 - 1.0, 1.0).unwrap();
        group.throughput(Throughput::Elements(operations.len() as u64));

        group.bench_function(format!("probe_table/{size}"), |b| {
            let mut rng = SmallRng::from_os_rng();
            b.iter_batched(
                || {
                    let mut operations = operations.clone();
                    operations.shuffle(&mut SmallRng::from_os_rng());
                    operations
                },
                |operations| {
                    let mut table = ProbeTable::with_capacity_and_hasher(8, SipBuild);
                    for operation in operations {
                        let key = K::new(rng.sample(key_distr) as u64);
                        match operation {
                            Operation::Insert => table.insert(key, 0usize),
                            Operation::Find => {
                                black_box(table.try_get(&key));
                            }
                            Operation::Remove => {
                                black_box(table.remove(&key));
                            }
                        }
                    }
                    black_box(table)
                },
                BatchSize::SmallInput,
            )
        });

        group.bench_function(format!("hashbrown/{size}"), |b| {
            let mut rng = SmallRng::from_os_rng();
            b.iter_batched(
                || {
                    let mut operations = operations.clone();
                    operations.shuffle(&mut SmallRng::from_os_rng());
                    operations
                },
                |operations| {
                    let mut table = HashbrownMap::with_hasher(SipBuild);
                    for operation in operations {
                        let key = K::new(rng.sample(key_distr) as u64);
                        match operation {
                            Operation::Insert => {
                                table.insert(key, 0usize);
                            }
                            Operation::Find => {
                                black_box(table.get(&key));
                            }
                            Operation::Remove => {
                                black_box(table.remove(&key));
                            }
                        }
                    }
                    black_box(table)
                },
                BatchSize::SmallInput,
            )
        });
    }

    group.finish();
}

/// Repeated insert/remove pairs on a half-full table.
fn bench_churn<K: BenchKey, const MAX_SIZE: usize>(c: &mut Criterion) {
    let mut group = c.benchmark_group(format!("churn_{}", core::any::type_name::<K>()));
    group.plot_config(PlotConfiguration::default().summary_scale(AxisScale::Logarithmic));

    for &size in SIZES[..=MAX_SIZE].iter() {
        let resident = sequential_keys::<K>(0..size / 2);
        let transient = sequential_keys::<K>(size..size * 2);
        group.throughput(Throughput::Elements(transient.len() as u64 * 2));

        group.bench_function(format!("probe_table/{size}"), |b| {
            b.iter_batched(
                || {
                    let mut table = ProbeTable::with_capacity_and_hasher(size, SipBuild);
                    for key in &resident {
                        table.insert(key.clone(), 0usize);
                    }
                    table
                },
                |mut table| {
                    for key in &transient {
                        table.insert(key.clone(), 1);
                        black_box(table.remove(key));
                    }
                    black_box(table)
                },
                BatchSize::SmallInput,
            )
        });

        group.bench_function(format!("hashbrown/{size}"), |b| {
            b.iter_batched(
                || {
                    let mut table = HashbrownMap::with_capacity_and_hasher(size, SipBuild);
                    for key in &resident {
                        table.insert(key.clone(), 0usize);
                    }
                    table
                },
                |mut table| {
                    for key in &transient {
                        table.insert(key.clone(), 1);
                        black_box(table.remove(key));
                    }
                    black_box(table)
                },
                BatchSize::SmallInput,
            )
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_insert_random::<SmallKey, 6>,
    bench_insert_random::<StringKey, 4>,
    bench_insert_preallocated::<SmallKey, 6>,
    bench_insert_preallocated::<StringKey, 4>,
    bench_find_hit::<SmallKey, 6>,
    bench_find_hit::<StringKey, 4>,
    bench_find_miss::<SmallKey, 6>,
    bench_find_miss::<StringKey, 4>,
    bench_remove::<SmallKey, 6>,
    bench_remove::<StringKey, 4>,
    bench_iteration::<SmallKey, 6>,
    bench_mixed_zipf::<SmallKey, 5>,
    bench_mixed_zipf::<StringKey, 3>,
    bench_churn::<SmallKey, 5>,
    bench_churn::<StringKey, 3>,
);

criterion_main!(benches);
