//! Per-observer wall tile store, one instance per block face.
//!
//! Walls (and ceilings, which are Up-face walls) render one proxy per
//! tile: when several surfaces assert a wall in the same face-relative
//! cell, the one nearest the observer along the face's push axis wins.
//! Walls are a single plane, not merged terrain.
//!
//! Tiles are keyed by two face-relative coordinates; the stored scalar is
//! the proxy cube-center coordinate on the remaining axis.

use std::collections::HashMap;

use convoy_voxel::BlockFace;
use glam::DVec3;

use crate::proxy_pool::{ProxyKey, ProxyPool};
use crate::tracker::{SurfaceHandle, SurfaceTable};

pub(crate) struct WallTileGrid {
    face: BlockFace,
    push: BlockFace,
    columns: HashMap<(i32, i32), TileColumn>,
    changed: Vec<(i32, i32)>,
}

impl WallTileGrid {
    pub fn new(face: BlockFace) -> Self {
        Self {
            face,
            push: face.opposite(),
            columns: HashMap::new(),
            changed: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Adds or refreshes the wall scalar `surface` asserts at the
    /// face-relative cell `(a, b)`.
    pub fn add(&mut self, surface: SurfaceHandle, stamp: u64, a: i32, b: i32, value: f64) {
        let key = (a, b);
        let column = self.columns.entry(key).or_insert_with(TileColumn::new);
        if column.add(surface, stamp, value) {
            if !column.changed {
                column.changed = true;
                self.changed.push(key);
            }
        }
    }

    /// Removes whatever `surface` asserted at the face-relative cell.
    pub fn remove(&mut self, surface: SurfaceHandle, a: i32, b: i32) {
        let key = (a, b);
        if let Some(column) = self.columns.get_mut(&key) {
            if column.remove_if(|slot| slot.surface == surface) {
                if !column.changed {
                    column.changed = true;
                    self.changed.push(key);
                }
            }
        }
    }

    /// Once-per-tick reconciliation, mirroring the floor grid: stale
    /// sweep, then proxy sync for changed cells only.
    pub fn update(&mut self, surfaces: &SurfaceTable, pool: &mut ProxyPool) {
        for (key, column) in self.columns.iter_mut() {
            if column.remove_if(|slot| surfaces.generation(slot.surface) != Some(slot.stamp)) {
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

            match column.winning_value(self.push) {
                Some(value) => {
                    let proxy = match column.proxy {
                        Some(proxy) => proxy,
                        None => {
                            let proxy = pool.spawn(self.push);
                            column.proxy = Some(proxy);
                            proxy
                        }
                    };
                    pool.get_mut(proxy).pos = Self::tile_position(self.face, key, value);
                    pool.schedule_move(proxy);
                }
                None => {
                    if let Some(proxy) = column.proxy.take() {
                        pool.destroy(proxy);
                    }
                    self.columns.remove(&key);
                }
            }
        }
    }

    /// Cube-center position of the proxy for face-relative cell `(a, b)`
    /// holding `value` on the face axis.
    ///
    /// Vertical faces key by (x, z), horizontal faces key by the
    /// orthogonal horizontal coordinate and y.
    fn tile_position(face: BlockFace, (a, b): (i32, i32), value: f64) -> DVec3 {
        let a = a as f64 + 0.5;
        let b = b as f64 + 0.5;
        match face {
            BlockFace::Up | BlockFace::Down => DVec3::new(a, value, b),
            BlockFace::East | BlockFace::West => DVec3::new(value, b, a),
            BlockFace::South | BlockFace::North => DVec3::new(a, b, value),
        }
    }
}

/// One wall scalar asserted by one surface.
struct TileSlot {
    surface: SurfaceHandle,
    stamp: u64,
    value: f64,
}

struct TileColumn {
    slots: Vec<TileSlot>,
    proxy: Option<ProxyKey>,
    changed: bool,
}

impl TileColumn {
    fn new() -> Self {
        Self {
            slots: Vec::new(),
            proxy: None,
            changed: false,
        }
    }

    fn add(&mut self, surface: SurfaceHandle, stamp: u64, value: f64) -> bool {
        for slot in self.slots.iter_mut() {
            if slot.surface == surface {
                slot.stamp = stamp;
                if slot.value != value {
                    slot.value = value;
                    return true;
                }
                return false;
            }
        }
        self.slots.push(TileSlot {
            surface,
            stamp,
            value,
        });
        true
    }

    fn remove_if(&mut self, predicate: impl Fn(&TileSlot) -> bool) -> bool {
        let before = self.slots.len();
        self.slots.retain(|slot| !predicate(slot));
        self.slots.len() != before
    }

    /// The scalar nearest the observer along the push axis: the largest
    /// value when pushing positive, the smallest otherwise. Ties keep the
    /// first-added slot, giving a fixed per-face order.
    fn winning_value(&self, push: BlockFace) -> Option<f64> {
        let mut winner: Option<f64> = None;
        for slot in &self.slots {
            winner = Some(match winner {
                None => slot.value,
                Some(current) => {
                    if push.sign() > 0 {
                        if slot.value > current {
                            slot.value
                        } else {
                            current
                        }
                    } else if slot.value < current {
                        slot.value
                    } else {
                        current
                    }
                }
            });
        }
        winner
    }
}
