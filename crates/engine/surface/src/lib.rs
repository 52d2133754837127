//! Virtual collision surface synthesis.
//!
//! The host world engine only lets an observer collide with real block
//! geometry or entity bounding boxes, never arbitrary meshes. This crate
//! fakes walkable decks, ramps, walls and ceilings for vehicle attachments
//! by quantizing oriented surface planes onto a per-block grid and driving
//! a pool of reusable block-shaped proxy entities on the observer's client.
//!
//! One [`SurfaceTracker`] exists per connected observer. External callers
//! register logical surfaces through [`SurfaceTracker::create_surface`] and
//! feed them fresh geometry every tick; `update()` reconciles the grids and
//! emits the minimal set of destroy/spawn/move messages.

mod floor_grid;
mod geometry;
mod proxy_pool;
mod pusher;
mod shape;
mod tracker;
mod wall_grid;

pub use geometry::{OrientedSurface, SurfaceContext};
pub use shape::{FloorTileShape, SlopeAxis};
pub use tracker::{SurfaceHandle, SurfaceTracker};

use convoy_voxel::Aabb;
use glam::DVec3;

/// Construction-time tuning for one observer's tracker.
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// Blocks around the observer inside which proxies are maintained.
    /// Surface footprints are clipped to this cube before quantization.
    pub view_distance: i32,
    /// Slack, in blocks, added to a surface's half-extents when deciding
    /// whether a projected sample still belongs to the surface. Zero means
    /// samples must land strictly within the surface footprint; 0.5 lets
    /// edge tiles whose centers fall up to half a block outside still
    /// spawn, padding the walkable area outward.
    pub acceptance_distance: f64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            view_distance: 64,
            acceptance_distance: 0.0,
        }
    }
}

/// Snapshot of the observer taken by the caller once per tick.
#[derive(Debug, Clone, Copy)]
pub struct ObserverState {
    /// Bottom-center of the observer's bounding box (feet position).
    pub position: DVec3,
    /// Full bounding box in world space.
    pub aabb: Aabb,
}

impl ObserverState {
    /// Observer snapshot from a feet position and a `width` x `height`
    /// bounding box centered on it.
    pub fn new(position: DVec3, width: f64, height: f64) -> Self {
        let half = width * 0.5;
        Self {
            position,
            aabb: Aabb::new(
                DVec3::new(position.x - half, position.y, position.z - half),
                DVec3::new(position.x + half, position.y + height, position.z + half),
            ),
        }
    }
}
