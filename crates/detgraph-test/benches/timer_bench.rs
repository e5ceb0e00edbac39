//! Benchmarks for detgraph timeout service operations

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use detgraph_core::Graph;
use detgraph_test::TestTimeoutPublisherService;
use detgraph_time::metronome_period;

#[derive(Clone, Debug, Default)]
struct Tick(u64);

#[derive(Clone, Debug, Default)]
struct Slow;

fn bench_schedule_timeout(c: &mut Criterion) {
    let service = TestTimeoutPublisherService::new();
    let handle = service.unique_timer_handle();

    c.bench_function("timer_schedule_reschedule", |b| {
        let mut i = 0u64;
        b.iter(|| {
            i = i.wrapping_add(1);
            service.schedule_timeout(Tick(i), black_box(100), handle);
        })
    });
}

fn bench_fire_and_evaluate(c: &mut Criterion) {
    let service = TestTimeoutPublisherService::new();
    let mut graph = Graph::new();
    graph.resolve_topic::<Tick>();
    let handle = service.unique_timer_handle();

    c.bench_function("timer_fire_and_evaluate", |b| {
        b.iter(|| {
            service.schedule_timeout(Tick(1), 10, handle);
            black_box(service.forward_time_and_evaluate(10, &mut graph).is_ok())
        })
    });
}

fn bench_metronome_day(c: &mut Criterion) {
    c.bench_function("metronome_simulated_day", |b| {
        b.iter(|| {
            let service = TestTimeoutPublisherService::new();
            let mut graph = Graph::new();
            let _ = service.schedule_periodic_publishing::<Tick>(90_000);
            let _ = service.schedule_periodic_publishing::<Slow>(1_800_000);
            let _ = service.start_periodic_publishing();
            let _ = service.forward_time_and_evaluate(24 * 60 * 60 * 1000, &mut graph);
            black_box(service.metronome_ticks())
        })
    });
}

fn bench_metronome_period(c: &mut Criterion) {
    let periods = [90_000u64, 1_800_000, 14_400_000, 600_000, 45_000];

    c.bench_function("metronome_period_gcd", |b| {
        b.iter(|| metronome_period(black_box(periods)))
    });
}

criterion_group!(
    benches,
    bench_schedule_timeout,
    bench_fire_and_evaluate,
    bench_metronome_day,
    bench_metronome_period,
);
criterion_main!(benches);
