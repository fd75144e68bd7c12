use criterion::{black_box, criterion_group, criterion_main, Criterion};
use tl_engine::{params, EventSpec, ManualClock, NullOutput, ParamValue, ScheduleOptions, Timeline};

fn busy_timeline(tracks: usize) -> Timeline {
    let mut timeline = Timeline::with_clock(ManualClock::new(120.0, 480));
    timeline.add_output(NullOutput::new(24));
    for i in 0..tracks {
        let spec = EventSpec::new()
            .with(params::NOTE, 48 + (i % 24) as i64)
            .with(params::DURATION, ParamValue::list([0.25; 64]))
            .with(params::GATE, 0.5);
        let _ = timeline.schedule(spec, ScheduleOptions::new());
    }
    timeline
}

fn bench_tick(c: &mut Criterion) {
    c.bench_function("tick_16_tracks_one_beat", |b| {
        b.iter_batched(
            || busy_timeline(16),
            |mut timeline| {
                for _ in 0..480 {
                    black_box(timeline.tick().ok());
                }
                timeline
            },
            criterion::BatchSize::SmallInput,
        )
    });

    c.bench_function("tick_idle", |b| {
        let mut timeline = Timeline::with_clock(ManualClock::new(120.0, 480));
        b.iter(|| black_box(timeline.tick().ok()))
    });
}

criterion_group!(benches, bench_tick);
criterion_main!(benches);
