//! Per-observer floor tile store.
//!
//! Tracks, per block column below the observer, the floor shapes asserted
//! by every contributing surface, merges them into the one "top" shape the
//! observer actually stands on, and drives that column's proxies. Columns
//! are reconciled only when a member changed, so per-tick cost follows the
//! number of changed columns rather than the total.

use std::collections::HashMap;

use convoy_voxel::BlockFace;
use glam::DVec3;

use crate::proxy_pool::{ProxyKey, ProxyPool};
use crate::shape::FloorTileShape;
use crate::tracker::{SurfaceHandle, SurfaceTable};

pub(crate) struct FloorTileGrid {
    columns: HashMap<(i32, i32), TileColumn>,
    /// Keys of columns whose `changed` flag is set, in marking order
    changed: Vec<(i32, i32)>,
}

impl FloorTileGrid {
    pub fn new() -> Self {
        Self {
            columns: HashMap::new(),
            changed: Vec::new(),
        }
    }

    /// Number of columns currently holding at least one slot
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Adds or replaces the floor shape `surface` asserts at column
    /// `(x, z)`, stamped with the surface's current generation.
    pub fn add(
        &mut self,
        surface: SurfaceHandle,
        stamp: u64,
        x: i32,
        z: i32,
        shape: FloorTileShape,
    ) {
        let key = (x, z);
        let column = self.columns.entry(key).or_insert_with(TileColumn::new);
        if column.add(surface, stamp, shape) {
            column.merged = None;
            if !column.changed {
                column.changed = true;
                self.changed.push(key);
            }
        }
    }

    /// Removes whatever shape `surface` asserted at column `(x, z)`.
    ///
    /// Rarely needed: clearing the surface and re-adding is the reliable
    /// path, this exists for point deletions.
    pub fn remove(&mut self, surface: SurfaceHandle, x: i32, z: i32) {
        let key = (x, z);
        if let Some(column) = self.columns.get_mut(&key) {
            if column.remove_if(|slot| slot.surface == surface) {
                column.merged = None;
                if !column.changed {
                    column.changed = true;
                    self.changed.push(key);
                }
            }
        }
    }

    /// Once-per-tick reconciliation: sweep out slots from cleared
    /// surfaces, then bring proxies in line for every changed column.
    pub fn update(&mut self, surfaces: &SurfaceTable, pool: &mut ProxyPool) {
        for (key, column) in self.columns.iter_mut() {
            if column.remove_if(|slot| surfaces.generation(slot.surface) != Some(slot.stamp)) {
                column.merged = None;
                if !column.changed {
                    column.changed = true;
                    self.changed.push(*key);
                }
            }
        }

        let changed = std::mem::take(&mut self.changed);
        for key in changed {
            let Some(column) = self.columns.get_mut(&key) else {
                continue;
            };
            if !column.changed {
                continue;
            }
            column.changed = false;

            match column.shape() {
                Some(shape) => Self::assign_proxies(column, key, shape, pool),
                None => {
                    // Last contributor gone: the column disappears entirely
                    for proxy in std::mem::take(&mut column.proxies) {
                        pool.destroy(proxy);
                    }
                    self.columns.remove(&key);
                }
            }
        }
    }

    /// Brings the column's proxy set in line with `shape`: grow to the
    /// required count, claim a best-fit existing proxy for every sample
    /// position, then destroy the surplus. Nearest-fit means a changing
    /// slope moves proxies instead of respawning them.
    fn assign_proxies(
        column: &mut TileColumn,
        (x, z): (i32, i32),
        shape: FloorTileShape,
        pool: &mut ProxyPool,
    ) {
        let requested = shape.proxy_count();
        while column.proxies.len() < requested {
            let key = pool.spawn(BlockFace::Up);
            // Fresh proxies start at an unfavored sentinel position so
            // nearest-fit prefers proxies that already sit near a target
            pool.get_mut(key).pos = DVec3::new(f64::NAN, f64::MIN, f64::NAN);
            column.proxies.push(key);
        }

        shape.for_each_sample(x, z, |target| {
            let mut best: Option<ProxyKey> = None;
            for &candidate in &column.proxies {
                let volume = pool.get(candidate);
                if volume.picked {
                    continue;
                }

                // A proxy already at this x/z only changes elevation
                if volume.pos.x == target.x && volume.pos.z == target.z {
                    let volume = pool.get_mut(candidate);
                    volume.pos.y = target.y;
                    volume.picked = true;
                    return;
                }

                match best {
                    None => best = Some(candidate),
                    Some(current) => {
                        if volume.pos.y <= target.y && volume.pos.y > pool.get(current).pos.y {
                            best = Some(candidate);
                        }
                    }
                }
            }

            let best = best.expect("column holds fewer proxies than the shape declares");
            let volume = pool.get_mut(best);
            volume.picked = true;
            volume.pos = target;
        });

        column.proxies.retain(|&proxy| {
            let volume = pool.get_mut(proxy);
            if volume.picked {
                volume.picked = false;
                pool.schedule_move(proxy);
                true
            } else {
                pool.destroy(proxy);
                false
            }
        });
    }
}

/// One shape asserted by one surface.
struct ShapeSlot {
    surface: SurfaceHandle,
    stamp: u64,
    shape: FloorTileShape,
}

/// Slot storage for a column. The single-contributor case is by far the
/// most common, so it stays unboxed; a second contributor promotes to a
/// list and dropping back to one demotes again.
enum ColumnSlots {
    Empty,
    Single(ShapeSlot),
    Multi(Vec<ShapeSlot>),
}

struct TileColumn {
    slots: ColumnSlots,
    /// Cached merge result; `None` after any slot mutation
    merged: Option<FloorTileShape>,
    proxies: Vec<ProxyKey>,
    changed: bool,
}

impl TileColumn {
    fn new() -> Self {
        Self {
            slots: ColumnSlots::Empty,
            merged: None,
            proxies: Vec::new(),
            changed: false,
        }
    }

    /// Returns true when the stored state changed in a way that needs
    /// reconciliation. Stamps always refresh.
    fn add(&mut self, surface: SurfaceHandle, stamp: u64, shape: FloorTileShape) -> bool {
        match &mut self.slots {
            ColumnSlots::Empty => {
                self.slots = ColumnSlots::Single(ShapeSlot {
                    surface,
                    stamp,
                    shape,
                });
                true
            }
            ColumnSlots::Single(slot) if slot.surface == surface => {
                let changed = slot.shape != shape;
                slot.shape = shape;
                slot.stamp = stamp;
                changed
            }
            ColumnSlots::Single(_) => {
                let ColumnSlots::Single(existing) =
                    std::mem::replace(&mut self.slots, ColumnSlots::Empty)
                else {
                    unreachable!();
                };
                self.slots = ColumnSlots::Multi(vec![
                    existing,
                    ShapeSlot {
                        surface,
                        stamp,
                        shape,
                    },
                ]);
                true
            }
            ColumnSlots::Multi(slots) => {
                for slot in slots.iter_mut() {
                    if slot.surface == surface {
                        let changed = slot.shape != shape;
                        slot.shape = shape;
                        slot.stamp = stamp;
                        return changed;
                    }
                }
                slots.push(ShapeSlot {
                    surface,
                    stamp,
                    shape,
                });
                true
            }
        }
    }

    /// Drops every slot matching the predicate, demoting the storage as
    /// members disappear. Returns true when any slot was removed.
    fn remove_if(&mut self, predicate: impl Fn(&ShapeSlot) -> bool) -> bool {
        match &mut self.slots {
            ColumnSlots::Empty => false,
            ColumnSlots::Single(slot) => {
                if predicate(slot) {
                    self.slots = ColumnSlots::Empty;
                    true
                } else {
                    false
                }
            }
            ColumnSlots::Multi(slots) => {
                let before = slots.len();
                slots.retain(|slot| !predicate(slot));
                let removed = slots.len() != before;
                match slots.len() {
                    0 => self.slots = ColumnSlots::Empty,
                    1 => {
                        let slot = slots.pop().expect("one slot remains");
                        self.slots = ColumnSlots::Single(slot);
                    }
                    _ => {}
                }
                removed
            }
        }
    }

    /// The merged "top" shape the observer walks on, or `None` for an
    /// empty column. Cached until a member changes.
    fn shape(&mut self) -> Option<FloorTileShape> {
        if let Some(shape) = self.merged {
            return Some(shape);
        }
        let shape = match &mut self.slots {
            ColumnSlots::Empty => return None,
            ColumnSlots::Single(slot) => slot.shape,
            ColumnSlots::Multi(slots) => {
                // Highest tiles first; a candidate entirely below the
                // running merge is occluded, and so is everything after it
                slots.sort_by(|a, b| b.shape.max_y().total_cmp(&a.shape.max_y()));
                let mut merged = slots[0].shape;
                for slot in &slots[1..] {
                    if slot.shape.max_y() > merged.min_y() {
                        merged = merged.merge(slot.shape);
                    } else {
                        break;
                    }
                }
                merged
            }
        };
        self.merged = Some(shape);
        Some(shape)
    }
}
