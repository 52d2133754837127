//! Benchmark for collision surface reconciliation
//!
//! Measures the cost of one full tick (quantization, grid reconciliation,
//! message batching) for a large deck in three regimes: first appearance,
//! steady state with no changes, and continuous vertical movement.

use convoy_network::ObserverMessage;
use convoy_surface::{ObserverState, OrientedSurface, SurfaceTracker, TrackerConfig};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use glam::{DQuat, DVec2, DVec3};

/// A deck covering roughly `size` x `size` block columns
fn deck(center_y: f64, size: f64) -> OrientedSurface {
    OrientedSurface::new(
        DVec3::new(0.0, center_y, 0.0),
        DVec2::splat(size * 0.5),
        DQuat::IDENTITY,
    )
}

fn observer() -> ObserverState {
    ObserverState::new(DVec3::new(0.0, 70.0, 0.0), 0.6, 1.8)
}

fn bench_first_appearance(c: &mut Criterion) {
    c.bench_function("deck_first_update_16x16", |b| {
        b.iter(|| {
            let mut tracker = SurfaceTracker::new(TrackerConfig::default(), observer());
            let handle = tracker.create_surface();
            tracker.add_surface(handle, &deck(64.0, 16.0));

            let mut messages: Vec<ObserverMessage> = Vec::new();
            tracker.update(observer(), &mut messages);
            black_box(messages)
        })
    });
}

fn bench_steady_state(c: &mut Criterion) {
    let mut tracker = SurfaceTracker::new(TrackerConfig::default(), observer());
    let handle = tracker.create_surface();
    tracker.add_surface(handle, &deck(64.0, 16.0));
    tracker.update(observer(), &mut Vec::<ObserverMessage>::new());

    c.bench_function("deck_steady_state_16x16", |b| {
        b.iter(|| {
            // Re-asserting identical geometry must cost near nothing
            tracker.add_surface(handle, &deck(64.0, 16.0));
            let mut messages: Vec<ObserverMessage> = Vec::new();
            tracker.update(observer(), &mut messages);
            black_box(messages)
        })
    });
}

fn bench_moving_deck(c: &mut Criterion) {
    let mut tracker = SurfaceTracker::new(TrackerConfig::default(), observer());
    let handle = tracker.create_surface();
    tracker.add_surface(handle, &deck(64.0, 16.0));
    tracker.update(observer(), &mut Vec::<ObserverMessage>::new());

    let mut tick = 0u64;
    c.bench_function("deck_bobbing_16x16", |b| {
        b.iter(|| {
            // Every column changes elevation each tick: all moves, no
            // respawns
            tick += 1;
            let y = 64.0 - 0.05 * ((tick % 40) as f64);
            tracker.add_surface(handle, &deck(y, 16.0));
            let mut messages: Vec<ObserverMessage> = Vec::new();
            tracker.update(observer(), &mut messages);
            black_box(messages)
        })
    });
}

criterion_group!(
    benches,
    bench_first_appearance,
    bench_steady_state,
    bench_moving_deck
);
criterion_main!(benches);
