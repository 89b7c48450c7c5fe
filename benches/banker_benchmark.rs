/*!
 * Banker's Algorithm Benchmarks
 *
 * Cost of the safety check and of a full request evaluation at the sizes
 * the simulator allows (up to 17 processes, 20 resource kinds)
 */

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use oss_sim::resources::banker;
use oss_sim::{ResourceTable, SlotId};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// A table with `processes` admitted entries, each holding part of its claim
fn populated_table(processes: usize, kinds: usize) -> ResourceTable {
    let mut rng = StdRng::seed_from_u64(17);
    let mut table = ResourceTable::random(kinds, processes, &mut rng).unwrap();
    for slot in 0..processes as u32 {
        let claim = (0..kinds).map(|_| rng.gen_range(0..3)).collect();
        table.admit(SlotId(slot), claim).unwrap();
    }
    for _ in 0..processes * kinds {
        let slot = SlotId(rng.gen_range(0..processes as u32));
        let _ = table.request(slot, rng.gen_range(0..kinds));
    }
    table
}

fn bench_safety_check(c: &mut Criterion) {
    let mut group = c.benchmark_group("safety_check");

    for processes in [1usize, 5, 10, 17] {
        let table = populated_table(processes, 20);
        let snapshot = table.snapshot();

        group.bench_with_input(BenchmarkId::from_parameter(processes), &snapshot, |b, snap| {
            b.iter(|| banker::is_safe(black_box(&snap.available), black_box(&snap.entries)));
        });
    }

    group.finish();
}

fn bench_request(c: &mut Criterion) {
    let mut group = c.benchmark_group("request_evaluation");

    for processes in [5usize, 17] {
        let table = populated_table(processes, 20);

        group.bench_with_input(BenchmarkId::from_parameter(processes), &table, |b, table| {
            b.iter_batched(
                || table.clone(),
                |mut table| {
                    for resource in 0..20 {
                        let _ = black_box(table.request(SlotId(0), resource));
                    }
                },
                criterion::BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

criterion_group!(benches, bench_safety_check, bench_request);
criterion_main!(benches);
