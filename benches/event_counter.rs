use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;
use windowed_event_counter::{EventCounter, ManualClock, Window, SECONDS_IN_24_HOURS};

const T0: i64 = 1_700_000_000_000;

fn bench_insert_same_second(c: &mut Criterion) {
    let clock = ManualClock::new(T0);
    let counter = EventCounter::with_clock(&clock);
    c.bench_function("insert_same_second", |b| {
        b.iter(|| counter.insert(black_box(())));
    });
}

fn bench_insert_steady_rate(c: &mut Criterion) {
    let clock = ManualClock::new(T0);
    let counter = EventCounter::with_clock(&clock);
    c.bench_function("insert_steady_rate", |b| {
        b.iter(|| {
            clock.advance(10);
            counter.insert(black_box(()))
        });
    });
}

fn bench_insert_after_idle_hour(c: &mut Criterion) {
    let clock = ManualClock::new(T0);
    let counter = EventCounter::with_clock(&clock);
    c.bench_function("insert_after_idle_hour", |b| {
        b.iter(|| {
            clock.advance(3_600_000);
            counter.insert(black_box(()))
        });
    });
}

fn bench_count(c: &mut Criterion) {
    let clock = ManualClock::new(T0);
    let counter = EventCounter::with_clock(&clock);
    for _ in 0..SECONDS_IN_24_HOURS {
        counter.insert(());
        clock.advance(1_000);
    }

    c.bench_function("count_last_minute", |b| {
        b.iter(|| counter.count(black_box(Window::Minute)));
    });
    c.bench_function("count_last_day", |b| {
        b.iter(|| counter.count(black_box(Window::Day)));
    });
}

criterion_group!(
    benches,
    bench_insert_same_second,
    bench_insert_steady_rate,
    bench_insert_after_idle_hour,
    bench_count
);
criterion_main!(benches);
