//! Cost of the lock in the shared-counter workload.

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use handoff_core::counter::{run_guarded_increment, run_unguarded_increment};

const PER_THREAD: u64 = 10_000;

fn bench_counters(c: &mut Criterion) {
    let mut group = c.benchmark_group("shared_counter");
    for threads in [1_usize, 2, 4] {
        group.bench_with_input(BenchmarkId::new("guarded", threads), &threads, |b, &n| {
            b.iter(|| criterion::black_box(run_guarded_increment(n, PER_THREAD)));
        });
        group.bench_with_input(BenchmarkId::new("unguarded", threads), &threads, |b, &n| {
            b.iter(|| criterion::black_box(run_unguarded_increment(n, PER_THREAD)));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_counters);
criterion_main!(benches);
