use std::hint::black_box;
use std::time::Duration;

use criterion::Criterion;
use criterion::criterion_group;
use criterion::criterion_main;
use tb_ratelimit::Bucket;
use tb_ratelimit::ManualClock;
use tb_ratelimit::UNBOUNDED_WAIT;

fn bench_take(c: &mut Criterion) {
    let bucket = Bucket::new(Duration::from_nanos(1), 16 * 1024);
    c.bench_function("take 1", |b| b.iter(|| bucket.take(black_box(1))));

    let bucket = Bucket::new(Duration::from_nanos(1), 16 * 1024);
    c.bench_function("take_available 1", |b| b.iter(|| bucket.take_available(black_box(1))));
}

fn bench_reserve_explicit_time(c: &mut Criterion) {
    let bucket = Bucket::new_with_clock(Duration::from_millis(1), 1_000, ManualClock::new());
    let mut now = bucket.start_time();

    c.bench_function("reserve with explicit time", |b| {
        b.iter(|| {
            now += Duration::from_micros(10);
            bucket.reserve(black_box(now), black_box(1), UNBOUNDED_WAIT)
        })
    });
}

fn bench_rate_solver(c: &mut Criterion) {
    c.bench_function("with_rate 4e18", |b| b.iter(|| Bucket::with_rate(black_box(4e18), 1 << 62)));

    c.bench_function("with_rate 1e-5", |b| b.iter(|| Bucket::with_rate(black_box(1e-5), 1)));
}

criterion_group!(benches, bench_take, bench_reserve_explicit_time, bench_rate_solver);
criterion_main!(benches);
