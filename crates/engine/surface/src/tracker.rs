//! Per-observer surface tracking facade.
//!
//! One [`SurfaceTracker`] composes the floor grid, the lazily-created wall
//! grids, the proxy pool and the displacement corrector for a single
//! observer. External callers hold [`SurfaceHandle`]s (one per logical
//! surface source), feed oriented surfaces through
//! [`SurfaceTracker::add_surface`] between ticks, and call
//! [`SurfaceTracker::update`] once per tick to reconcile and emit wire
//! messages.

use std::collections::HashMap;

use convoy_network::ObserverTransport;
use convoy_voxel::BlockFace;
use glam::DVec3;

use crate::floor_grid::FloorTileGrid;
use crate::geometry::{OrientedSurface, SurfaceContext};
use crate::proxy_pool::ProxyPool;
use crate::pusher::ObserverPusher;
use crate::shape::{FloorTileShape, SlopeAxis};
use crate::wall_grid::WallTileGrid;
use crate::{ObserverState, TrackerConfig};

/// Near-vertical normals render as single-sample level tiles.
const LEVEL_NORMAL_Y: f64 = 0.95;
/// A slope counts as axis-aligned when the normal barely tilts along one
/// horizontal axis.
const SLOPE_AXIS_EPSILON: f64 = 0.2;

/// Handle to one logical surface source registered with a tracker.
///
/// Handles are cheap copyable ids, valid only for the tracker that issued
/// them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SurfaceHandle(u32);

/// Generation bookkeeping for every registered surface.
///
/// A tile write stamps the writer's generation at that moment; a stale
/// sweep later drops any tile whose stamp no longer matches. This replaces
/// remove-by-reference bookkeeping: clearing a surface is a single counter
/// increment, and whatever it stopped asserting is garbage-collected
/// within one tick.
pub(crate) struct SurfaceTable {
    generations: HashMap<SurfaceHandle, u64>,
    next_id: u32,
}

impl SurfaceTable {
    pub fn new() -> Self {
        Self {
            generations: HashMap::new(),
            next_id: 0,
        }
    }

    pub fn create(&mut self) -> SurfaceHandle {
        let handle = SurfaceHandle(self.next_id);
        self.next_id += 1;
        self.generations.insert(handle, 0);
        handle
    }

    /// Advances the surface's generation, invalidating all of its
    /// previously written tiles. Returns the new generation.
    pub fn bump(&mut self, handle: SurfaceHandle) -> u64 {
        let generation = self
            .generations
            .get_mut(&handle)
            .expect("surface handle not registered with this tracker");
        *generation += 1;
        *generation
    }

    /// Current generation of a surface, or `None` for released handles
    /// (whose tiles are all stale by definition).
    pub fn generation(&self, handle: SurfaceHandle) -> Option<u64> {
        self.generations.get(&handle).copied()
    }

    pub fn release(&mut self, handle: SurfaceHandle) {
        self.generations.remove(&handle);
    }
}

/// Keeps one observer's proxy entities in sync with all registered
/// collision surfaces.
pub struct SurfaceTracker {
    config: TrackerConfig,
    observer: ObserverState,
    surfaces: SurfaceTable,
    floor: FloorTileGrid,
    /// Wall grids indexed by [`BlockFace::ALL`] order, created lazily
    walls: [Option<WallTileGrid>; 6],
    pool: ProxyPool,
    pusher: ObserverPusher,
}

impl SurfaceTracker {
    pub fn new(config: TrackerConfig, observer: ObserverState) -> Self {
        Self {
            config,
            observer,
            surfaces: SurfaceTable::new(),
            floor: FloorTileGrid::new(),
            walls: [None, None, None, None, None, None],
            pool: ProxyPool::new(),
            pusher: ObserverPusher::new(),
        }
    }

    /// Registers a new logical surface source. Nothing is tracked until
    /// the first [`Self::add_surface`] call.
    pub fn create_surface(&mut self) -> SurfaceHandle {
        self.surfaces.create()
    }

    /// Invalidates everything the surface currently asserts. Its tiles
    /// are garbage-collected on the next `update()` unless re-added
    /// before then.
    pub fn clear_surface(&mut self, handle: SurfaceHandle) {
        self.surfaces.bump(handle);
    }

    /// Drops the surface entirely. Equivalent to a `clear_surface` that
    /// can never be written again.
    pub fn release_surface(&mut self, handle: SurfaceHandle) {
        self.surfaces.release(handle);
    }

    /// Quantizes one oriented surface into per-tile writes for `handle`,
    /// replacing whatever the handle asserted before.
    ///
    /// Classification happens against the observer snapshot of the last
    /// `update()` call. Steep surfaces become walls on the face matching
    /// the dominant horizontal normal component; near-horizontal surfaces
    /// above or behind the observer become ceilings; everything else
    /// lands in the floor grid as level, sloped or complex tiles.
    pub fn add_surface(&mut self, handle: SurfaceHandle, surface: &OrientedSurface) {
        // Implicit clear: tiles of the previous projection go stale now
        let stamp = self.surfaces.bump(handle);

        let ctx = SurfaceContext::new(surface, self.observer.position, &self.config);
        if ctx.is_fully_clipped {
            return;
        }

        if ctx.is_wall {
            let face = if ctx.normal.x.abs() > ctx.normal.z.abs() {
                if (ctx.normal.x > 0.0) != ctx.is_back_side {
                    BlockFace::West
                } else {
                    BlockFace::East
                }
            } else if (ctx.normal.z > 0.0) != ctx.is_back_side {
                BlockFace::North
            } else {
                BlockFace::South
            };
            self.apply_wall(handle, stamp, &ctx, face);
        } else if (ctx.normal.y < 0.0) != ctx.is_back_side {
            // Near-horizontal above the observer: a ceiling
            self.apply_wall(handle, stamp, &ctx, BlockFace::Up);
        } else if ctx.normal.y > LEVEL_NORMAL_Y {
            self.apply_level(handle, stamp, &ctx);
        } else if ctx.normal.x.abs() < SLOPE_AXIS_EPSILON || ctx.normal.z.abs() < SLOPE_AXIS_EPSILON
        {
            self.apply_slope(handle, stamp, &ctx);
        } else {
            self.apply_complex(handle, stamp, &ctx);
        }
    }

    /// Once-per-tick reconciliation: refresh the observer snapshot, sweep
    /// and reconcile the grids, prune empty wall grids, then flush all
    /// pending entity work as wire messages.
    pub fn update(&mut self, observer: ObserverState, transport: &mut impl ObserverTransport) {
        self.observer = observer;

        self.floor.update(&self.surfaces, &mut self.pool);
        for slot in self.walls.iter_mut() {
            if let Some(grid) = slot {
                grid.update(&self.surfaces, &mut self.pool);
                if grid.is_empty() {
                    *slot = None;
                }
            }
        }

        self.pool.flush(&self.observer, &mut self.pusher, transport);
    }

    /// Proxies currently live for this observer
    pub fn live_proxy_count(&self) -> usize {
        self.pool.live_count()
    }

    fn wall_grid_mut(&mut self, face: BlockFace) -> &mut WallTileGrid {
        let index = BlockFace::ALL
            .iter()
            .position(|&f| f == face)
            .expect("face is one of the six");
        self.walls[index].get_or_insert_with(|| WallTileGrid::new(face))
    }

    /// Projects the surface as a wall (or ceiling) onto the grid of the
    /// given face: every block cell orthogonal to the face axis is
    /// sampled by casting along the axis from the far side of the
    /// footprint cuboid.
    fn apply_wall(&mut self, handle: SurfaceHandle, stamp: u64, ctx: &SurfaceContext, face: BlockFace) {
        let cuboid = ctx.cuboid;
        let half = 0.5 * face.sign_f64();
        let grid = self.wall_grid_mut(face);

        match face {
            BlockFace::Up | BlockFace::Down => {
                let origin_y = if face == BlockFace::Down {
                    cuboid.max.y
                } else {
                    cuboid.min.y
                };
                for x in cuboid.min.x..cuboid.max.x {
                    for z in cuboid.min.z..cuboid.max.z {
                        let origin = DVec3::new(x as f64 + 0.5, origin_y as f64, z as f64 + 0.5);
                        if let Some(hit) = ctx.project(face, origin) {
                            grid.add(handle, stamp, x, z, hit.y + half);
                        }
                    }
                }
            }
            BlockFace::East | BlockFace::West => {
                let origin_x = if face == BlockFace::East {
                    cuboid.max.x
                } else {
                    cuboid.min.x
                };
                for z in cuboid.min.z..cuboid.max.z {
                    for y in cuboid.min.y..cuboid.max.y {
                        let origin = DVec3::new(origin_x as f64, y as f64 + 0.5, z as f64 + 0.5);
                        if let Some(hit) = ctx.project(face, origin) {
                            grid.add(handle, stamp, z, y, hit.x + half);
                        }
                    }
                }
            }
            BlockFace::South | BlockFace::North => {
                let origin_z = if face == BlockFace::South {
                    cuboid.max.z
                } else {
                    cuboid.min.z
                };
                for x in cuboid.min.x..cuboid.max.x {
                    for y in cuboid.min.y..cuboid.max.y {
                        let origin = DVec3::new(x as f64 + 0.5, y as f64 + 0.5, origin_z as f64);
                        if let Some(hit) = ctx.project(face, origin) {
                            grid.add(handle, stamp, x, y, hit.z + half);
                        }
                    }
                }
            }
        }
    }

    /// Projects a mostly-flat surface downward, one sample per column.
    fn apply_level(&mut self, handle: SurfaceHandle, stamp: u64, ctx: &SurfaceContext) {
        let cuboid = ctx.cuboid;
        let top = cuboid.max.y as f64;
        // Proxies above the surface's own top would shrink the walkable
        // area
        let ceiling = ctx.plane_max.y - 0.5;

        for x in cuboid.min.x..cuboid.max.x {
            for z in cuboid.min.z..cuboid.max.z {
                let origin = DVec3::new(x as f64 + 0.5, top, z as f64 + 0.5);
                let Some(hit) = ctx.project(BlockFace::Down, origin) else {
                    continue;
                };
                let y = hit.y - 0.5;
                if y > ceiling {
                    continue;
                }
                self.floor
                    .add(handle, stamp, x, z, FloorTileShape::Level(y));
            }
        }
    }

    /// Projects an axis-aligned sloped surface downward, two samples per
    /// column along the tilt axis.
    fn apply_slope(&mut self, handle: SurfaceHandle, stamp: u64, ctx: &SurfaceContext) {
        let axis = if ctx.normal.x.abs() > ctx.normal.z.abs() {
            SlopeAxis::X
        } else {
            SlopeAxis::Z
        };
        let cuboid = ctx.cuboid;
        let top = cuboid.max.y as f64;
        let ceiling = ctx.plane_max.y - 0.5;

        for x in cuboid.min.x..cuboid.max.x {
            for z in cuboid.min.z..cuboid.max.z {
                let cx = x as f64 + 0.5;
                let cz = z as f64 + 0.5;
                let Some(pos_hit) =
                    ctx.project(BlockFace::Down, DVec3::new(cx + axis.dx(), top, cz + axis.dz()))
                else {
                    continue;
                };
                let Some(neg_hit) =
                    ctx.project(BlockFace::Down, DVec3::new(cx - axis.dx(), top, cz - axis.dz()))
                else {
                    continue;
                };

                let y_pos = pos_hit.y - 0.5;
                let y_neg = neg_hit.y - 0.5;
                if y_pos > ceiling && y_neg > ceiling {
                    continue;
                }

                self.floor.add(
                    handle,
                    stamp,
                    x,
                    z,
                    FloorTileShape::Slope {
                        axis,
                        y_pos: y_pos.min(ceiling),
                        y_neg: y_neg.min(ceiling),
                    },
                );
            }
        }
    }

    /// Projects a diagonal sloped surface downward, four samples per
    /// column.
    fn apply_complex(&mut self, handle: SurfaceHandle, stamp: u64, ctx: &SurfaceContext) {
        let cuboid = ctx.cuboid;
        let top = cuboid.max.y as f64;
        let ceiling = ctx.plane_max.y - 0.5;

        for x in cuboid.min.x..cuboid.max.x {
            for z in cuboid.min.z..cuboid.max.z {
                let base_x = x as f64;
                let base_z = z as f64;
                let mut corners = [0.0f64; 4];
                let mut complete = true;
                for (slot, (dx, dz)) in corners
                    .iter_mut()
                    .zip([(0.25, 0.25), (0.25, 0.75), (0.75, 0.25), (0.75, 0.75)])
                {
                    match ctx.project(
                        BlockFace::Down,
                        DVec3::new(base_x + dx, top, base_z + dz),
                    ) {
                        Some(hit) => *slot = hit.y - 0.5,
                        None => {
                            complete = false;
                            break;
                        }
                    }
                }
                if !complete {
                    continue;
                }

                let [y_nn, y_np, y_pn, y_pp] = corners;
                if y_nn > ceiling && y_np > ceiling && y_pn > ceiling && y_pp > ceiling {
                    continue;
                }

                self.floor.add(
                    handle,
                    stamp,
                    x,
                    z,
                    FloorTileShape::Complex {
                        y_nn: y_nn.min(ceiling),
                        y_np: y_np.min(ceiling),
                        y_pn: y_pn.min(ceiling),
                        y_pp: y_pp.min(ceiling),
                    },
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use convoy_network::ObserverMessage;
    use glam::{DQuat, DVec2};

    fn observer_above() -> ObserverState {
        ObserverState::new(DVec3::new(1.5, 70.0, 1.5), 0.6, 1.8)
    }

    fn flat_deck_3x3() -> OrientedSurface {
        OrientedSurface::new(
            DVec3::new(1.5, 64.0, 1.5),
            DVec2::splat(1.5),
            DQuat::IDENTITY,
        )
    }

    fn spawns(messages: &[ObserverMessage]) -> Vec<DVec3> {
        messages
            .iter()
            .filter_map(|m| match m {
                ObserverMessage::SpawnProxy { position, .. } => Some(*position),
                _ => None,
            })
            .collect()
    }

    fn count<F: Fn(&ObserverMessage) -> bool>(messages: &[ObserverMessage], f: F) -> usize {
        messages.iter().filter(|m| f(m)).count()
    }

    #[test]
    fn test_flat_deck_scenario() {
        let mut tracker = SurfaceTracker::new(TrackerConfig::default(), observer_above());
        let handle = tracker.create_surface();
        tracker.add_surface(handle, &flat_deck_3x3());

        let mut messages: Vec<ObserverMessage> = Vec::new();
        tracker.update(observer_above(), &mut messages);

        // Nine columns, one level proxy each, nothing destroyed or moved
        let positions = spawns(&messages);
        assert_eq!(positions.len(), 9);
        assert_eq!(messages.len(), 9);
        for position in &positions {
            assert_eq!(position.y, 63.5, "cube centers sit half a block down");
            assert!([0.5, 1.5, 2.5].contains(&position.x));
            assert!([0.5, 1.5, 2.5].contains(&position.z));
        }
        assert_eq!(tracker.live_proxy_count(), 9);

        // A tick without changes is completely silent
        let mut messages: Vec<ObserverMessage> = Vec::new();
        tracker.update(observer_above(), &mut messages);
        assert!(messages.is_empty());
        assert_eq!(tracker.live_proxy_count(), 9);
    }

    #[test]
    fn test_cleared_deck_scenario() {
        let mut tracker = SurfaceTracker::new(TrackerConfig::default(), observer_above());
        let handle = tracker.create_surface();
        tracker.add_surface(handle, &flat_deck_3x3());
        tracker.update(observer_above(), &mut Vec::<ObserverMessage>::new());

        // The owner clears and never writes again
        tracker.clear_surface(handle);
        let mut messages: Vec<ObserverMessage> = Vec::new();
        tracker.update(observer_above(), &mut messages);

        assert_eq!(messages.len(), 1);
        match &messages[0] {
            ObserverMessage::DestroyEntities { entity_ids } => {
                assert_eq!(entity_ids.len(), 18, "nine mount/proxy id pairs");
            }
            other => panic!("expected destroy batch, got {:?}", other),
        }
        assert_eq!(tracker.live_proxy_count(), 0);

        // And the tick after that is silent again
        let mut messages: Vec<ObserverMessage> = Vec::new();
        tracker.update(observer_above(), &mut messages);
        assert!(messages.is_empty());
    }

    #[test]
    fn test_repeated_writes_converge() {
        // Writing twice between updates must end in the same observable
        // state as writing the final surface once
        let moved_deck = OrientedSurface::new(
            DVec3::new(4.5, 64.0, 1.5),
            DVec2::splat(1.5),
            DQuat::IDENTITY,
        );
        let observer = ObserverState::new(DVec3::new(4.5, 70.0, 1.5), 0.6, 1.8);

        let mut twice = SurfaceTracker::new(TrackerConfig::default(), observer);
        let handle = twice.create_surface();
        twice.add_surface(handle, &flat_deck_3x3());
        twice.add_surface(handle, &moved_deck);
        let mut twice_messages: Vec<ObserverMessage> = Vec::new();
        twice.update(observer, &mut twice_messages);

        let mut once = SurfaceTracker::new(TrackerConfig::default(), observer);
        let handle = once.create_surface();
        once.add_surface(handle, &moved_deck);
        let mut once_messages: Vec<ObserverMessage> = Vec::new();
        once.update(observer, &mut once_messages);

        let mut twice_positions = spawns(&twice_messages);
        let mut once_positions = spawns(&once_messages);
        twice_positions.sort_by(|a, b| (a.x, a.z).partial_cmp(&(b.x, b.z)).unwrap());
        once_positions.sort_by(|a, b| (a.x, a.z).partial_cmp(&(b.x, b.z)).unwrap());
        assert_eq!(twice_positions, once_positions);
        assert_eq!(twice.live_proxy_count(), once.live_proxy_count());
    }

    #[test]
    fn test_ceiling_classification() {
        // A flat surface well above the observer becomes an Up-face wall
        // pushing downward
        let observer = ObserverState::new(DVec3::new(1.5, 60.0, 1.5), 0.6, 1.8);
        let mut tracker = SurfaceTracker::new(TrackerConfig::default(), observer);
        let handle = tracker.create_surface();
        tracker.add_surface(handle, &flat_deck_3x3());

        let mut messages: Vec<ObserverMessage> = Vec::new();
        tracker.update(observer, &mut messages);

        let pushes: Vec<_> = messages
            .iter()
            .filter_map(|m| match m {
                ObserverMessage::SpawnProxy { push, position, .. } => Some((*push, *position)),
                _ => None,
            })
            .collect();
        assert_eq!(pushes.len(), 9);
        for (push, position) in pushes {
            assert_eq!(push, BlockFace::Down);
            assert_eq!(position.y, 64.5, "ceiling cubes sit above the plane");
        }
    }

    #[test]
    fn test_steep_surface_becomes_wall() {
        // Deck rolled 90 degrees around X at z=0, observer south of it
        let wall = OrientedSurface::new(
            DVec3::new(1.5, 64.5, 0.0),
            DVec2::splat(1.5),
            DQuat::from_rotation_x(std::f64::consts::FRAC_PI_2),
        );
        let observer = ObserverState::new(DVec3::new(1.5, 63.5, 3.5), 0.6, 1.8);
        let mut tracker = SurfaceTracker::new(TrackerConfig::default(), observer);
        let handle = tracker.create_surface();
        tracker.add_surface(handle, &wall);

        let mut messages: Vec<ObserverMessage> = Vec::new();
        tracker.update(observer, &mut messages);

        let spawn_info: Vec<_> = messages
            .iter()
            .filter_map(|m| match m {
                ObserverMessage::SpawnProxy { push, position, .. } => Some((*push, *position)),
                _ => None,
            })
            .collect();
        assert!(!spawn_info.is_empty());
        for (push, position) in spawn_info {
            // Normal points south toward the observer; the wall face is
            // North and its proxies push back south
            assert_eq!(push, BlockFace::South);
            assert_eq!(position.z, -0.5, "wall cubes sit behind the plane");
        }
    }

    #[test]
    fn test_spawn_inside_observer_corrects_first() {
        // The observer's feet are below the deck plane when it appears
        let observer = ObserverState::new(DVec3::new(1.5, 63.2, 1.5), 0.6, 1.8);
        let mut tracker = SurfaceTracker::new(TrackerConfig::default(), observer);
        let handle = tracker.create_surface();
        tracker.add_surface(handle, &flat_deck_3x3());

        let mut messages: Vec<ObserverMessage> = Vec::new();
        tracker.update(observer, &mut messages);

        match &messages[0] {
            ObserverMessage::CorrectPosition { y, velocity_y, .. } => {
                let y = y.expect("upward displacement");
                assert!(y >= 64.0, "feet end up on the deck, got {}", y);
                assert!(*velocity_y > 0.0);
            }
            other => panic!("correction must precede spawns, got {:?}", other),
        }
        assert_eq!(
            count(&messages, |m| matches!(m, ObserverMessage::SpawnProxy { .. })),
            9
        );
    }

    #[test]
    fn test_release_surface_collects_tiles() {
        let mut tracker = SurfaceTracker::new(TrackerConfig::default(), observer_above());
        let handle = tracker.create_surface();
        tracker.add_surface(handle, &flat_deck_3x3());
        tracker.update(observer_above(), &mut Vec::<ObserverMessage>::new());

        tracker.release_surface(handle);
        let mut messages: Vec<ObserverMessage> = Vec::new();
        tracker.update(observer_above(), &mut messages);
        assert!(matches!(
            messages[0],
            ObserverMessage::DestroyEntities { .. }
        ));
        assert_eq!(tracker.live_proxy_count(), 0);
    }

    #[test]
    #[should_panic(expected = "not registered")]
    fn test_unknown_handle_panics() {
        let mut tracker = SurfaceTracker::new(TrackerConfig::default(), observer_above());
        let mut other = SurfaceTracker::new(TrackerConfig::default(), observer_above());
        let foreign = other.create_surface();
        other.release_surface(foreign);
        tracker.add_surface(foreign, &flat_deck_3x3());
    }
}
