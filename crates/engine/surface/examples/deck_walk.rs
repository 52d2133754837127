//! Minimal tick-loop demonstration.
//!
//! Simulates an observer standing next to a vehicle deck that rises past
//! them, printing the wire messages each tick would send. Run with:
//!
//! ```sh
//! cargo run --example deck_walk -p convoy-surface
//! ```

use convoy_network::ObserverMessage;
use convoy_surface::{ObserverState, OrientedSurface, SurfaceTracker, TrackerConfig};
use glam::{DQuat, DVec2, DVec3};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "debug".into()),
        )
        .init();

    let observer = ObserverState::new(DVec3::new(1.5, 64.0, 1.5), 0.6, 1.8);
    let mut tracker = SurfaceTracker::new(TrackerConfig::default(), observer);
    let deck = tracker.create_surface();

    // A 5x5 deck rising from below the observer's feet
    let mut deck_y = 62.0;
    for tick in 0..8 {
        deck_y += 0.4;
        tracker.add_surface(
            deck,
            &OrientedSurface::new(
                DVec3::new(1.5, deck_y, 1.5),
                DVec2::splat(2.5),
                DQuat::IDENTITY,
            ),
        );

        let mut messages: Vec<ObserverMessage> = Vec::new();
        tracker.update(observer, &mut messages);

        println!("tick {tick}: deck at y={deck_y:.1}");
        for message in &messages {
            match message {
                ObserverMessage::DestroyEntities { entity_ids } => {
                    println!("  destroy {} entities", entity_ids.len());
                }
                ObserverMessage::SpawnProxy {
                    proxy_id, position, ..
                } => {
                    println!("  spawn proxy {proxy_id} at {position}");
                }
                ObserverMessage::MoveProxy { mount_id, position } => {
                    println!("  move mount {mount_id} to {position}");
                }
                ObserverMessage::CorrectPosition { y, velocity_y, .. } => {
                    println!("  correct observer to y={y:?} (impulse {velocity_y})");
                }
            }
        }
    }

    // The vehicle despawns; every proxy goes with it
    tracker.clear_surface(deck);
    let mut messages: Vec<ObserverMessage> = Vec::new();
    tracker.update(observer, &mut messages);
    println!("after clear: {} message(s)", messages.len());
}
