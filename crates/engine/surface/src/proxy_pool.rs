//! Proxy entity records, id recycling and message batching.
//!
//! Client entity identifiers live in a finite space and spawning is the
//! expensive operation, so proxy records (each carrying a mount id and a
//! proxy id) are pooled in a LIFO freelist and recycled aggressively. All
//! spawn/destroy/move traffic for one tick is collected here and flushed
//! in a fixed order: destroy stale, correct the observer, spawn new, move
//! the rest.

use convoy_network::{EntityId, ObserverMessage, ObserverTransport};
use convoy_voxel::BlockFace;
use glam::DVec3;

use crate::pusher::ObserverPusher;
use crate::ObserverState;

/// How many fresh records are allocated at once when the freelist runs dry
const GROW_CHUNK: usize = 16;

/// Index of a [`ProxyVolume`] in its pool's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ProxyKey(usize);

/// The state tracked for a single proxy entity pair.
///
/// A record is owned by exactly one tile column while live, otherwise by
/// the pool freelist. Position change tracking is per observer, like
/// everything else in this crate.
#[derive(Debug)]
pub(crate) struct ProxyVolume {
    /// Entity id of the invisible mount the proxy rides in
    pub mount_id: EntityId,
    /// Entity id of the solid proxy itself
    pub proxy_id: EntityId,
    /// Direction an overlapping observer is shoved during spawning
    pub push: BlockFace,
    /// Last-calculated cube-center position
    pub pos: DVec3,
    /// Last position synchronized to the observer
    sync: DVec3,
    /// Transient claim flag used during per-column assignment
    pub picked: bool,
    pending_spawn: bool,
    pending_destroy: bool,
    pending_move: bool,
}

pub(crate) struct ProxyPool {
    volumes: Vec<ProxyVolume>,
    /// Freelist of recycled records; most recently destroyed on top
    freelist: Vec<ProxyKey>,
    next_entity_id: EntityId,
    to_spawn: Vec<ProxyKey>,
    to_destroy: Vec<ProxyKey>,
    to_move: Vec<ProxyKey>,
}

impl ProxyPool {
    pub fn new() -> Self {
        Self {
            volumes: Vec::new(),
            freelist: Vec::new(),
            next_entity_id: 1,
            to_spawn: Vec::new(),
            to_destroy: Vec::new(),
            to_move: Vec::new(),
        }
    }

    pub fn get(&self, key: ProxyKey) -> &ProxyVolume {
        &self.volumes[key.0]
    }

    pub fn get_mut(&mut self, key: ProxyKey) -> &mut ProxyVolume {
        &mut self.volumes[key.0]
    }

    /// Number of records currently owned by columns
    pub fn live_count(&self) -> usize {
        self.volumes.len() - self.freelist.len()
    }

    /// Number of records ever allocated
    pub fn allocated_count(&self) -> usize {
        self.volumes.len()
    }

    /// Takes a record from the freelist (growing the arena by a chunk when
    /// empty), assigns its push direction and schedules its spawn.
    pub fn spawn(&mut self, push: BlockFace) -> ProxyKey {
        let key = match self.freelist.pop() {
            Some(key) => key,
            None => {
                self.grow();
                self.freelist.pop().expect("freelist populated by grow")
            }
        };

        let volume = &mut self.volumes[key.0];
        volume.push = push;
        volume.picked = false;
        self.schedule_spawn(key);
        key
    }

    /// Schedules the record's destruction and returns it to the freelist.
    pub fn destroy(&mut self, key: ProxyKey) {
        self.schedule_destroy(key);
        self.freelist.push(key);
    }

    /// Queues a position sync. Spawns carry their own initial position, so
    /// a record with a pending spawn is left alone.
    pub fn schedule_move(&mut self, key: ProxyKey) {
        let volume = &mut self.volumes[key.0];
        if !volume.pending_spawn && !volume.pending_move {
            volume.pending_move = true;
            self.to_move.push(key);
        }
    }

    fn schedule_spawn(&mut self, key: ProxyKey) {
        let volume = &mut self.volumes[key.0];
        if !volume.pending_spawn {
            volume.pending_spawn = true;
            self.to_spawn.push(key);
        }
    }

    fn schedule_destroy(&mut self, key: ProxyKey) {
        let volume = &mut self.volumes[key.0];
        if volume.pending_spawn {
            // Spawned and destroyed within one tick: a no-op on the wire
            volume.pending_spawn = false;
        } else if !volume.pending_destroy {
            volume.pending_destroy = true;
            self.to_destroy.push(key);
        }
        volume.pending_move = false;
    }

    fn grow(&mut self) {
        for _ in 0..GROW_CHUNK {
            let key = ProxyKey(self.volumes.len());
            self.volumes.push(ProxyVolume {
                mount_id: self.next_entity_id,
                proxy_id: self.next_entity_id + 1,
                push: BlockFace::Up,
                pos: DVec3::ZERO,
                sync: DVec3::ZERO,
                picked: false,
                pending_spawn: false,
                pending_destroy: false,
                pending_move: false,
            });
            self.next_entity_id += 2;
            self.freelist.push(key);
        }
    }

    /// Flushes all pending work for this tick.
    ///
    /// Message order is significant: stale entities are destroyed first,
    /// then the observer is pushed clear of anything about to spawn, then
    /// spawns, then plain moves. Queues are drained with a check-and-clear
    /// of each record's flag, so entries cancelled after queueing are
    /// skipped.
    pub fn flush(
        &mut self,
        observer: &ObserverState,
        pusher: &mut ObserverPusher,
        transport: &mut impl ObserverTransport,
    ) {
        // 1. Destroy batch
        let mut entity_ids: Vec<EntityId> = Vec::new();
        let to_destroy = std::mem::take(&mut self.to_destroy);
        for key in to_destroy {
            let volume = &mut self.volumes[key.0];
            if volume.pending_destroy {
                volume.pending_destroy = false;
                entity_ids.push(volume.mount_id);
                entity_ids.push(volume.proxy_id);
            }
        }
        if !entity_ids.is_empty() {
            tracing::trace!(count = entity_ids.len() / 2, "destroying proxies");
            transport.send(ObserverMessage::DestroyEntities { entity_ids });
        }

        // 2. Push the observer clear of everything about to spawn, to a
        // fixed point: every proxy pushes along one fixed direction only
        // and the per-axis push is monotone, so this terminates.
        pusher.reset(observer);
        loop {
            let mut pushed = false;
            for i in 0..self.to_spawn.len() {
                let volume = &self.volumes[self.to_spawn[i].0];
                if volume.pending_spawn {
                    pushed |= pusher.proxy_spawned(volume);
                }
            }
            if !pushed {
                break;
            }
        }
        pusher.send_push(transport);

        // 3. Spawns
        let to_spawn = std::mem::take(&mut self.to_spawn);
        for key in to_spawn {
            let volume = &mut self.volumes[key.0];
            if volume.pending_spawn {
                volume.pending_spawn = false;
                volume.sync = volume.pos;
                transport.send(ObserverMessage::SpawnProxy {
                    mount_id: volume.mount_id,
                    proxy_id: volume.proxy_id,
                    position: volume.pos,
                    push: volume.push,
                });
            }
        }

        // 4. Moves, only where the position actually changed
        let to_move = std::mem::take(&mut self.to_move);
        for key in to_move {
            let volume = &mut self.volumes[key.0];
            if volume.pending_move {
                volume.pending_move = false;
                if volume.pos != volume.sync {
                    volume.sync = volume.pos;
                    transport.send(ObserverMessage::MoveProxy {
                        mount_id: volume.mount_id,
                        position: volume.pos,
                    });
                }
            }
        }
    }
}

#[cfg(test)]
impl ProxyVolume {
    /// Bare volume for pusher unit tests.
    pub(crate) fn test_volume(pos: DVec3, push: BlockFace) -> Self {
        Self {
            mount_id: 0,
            proxy_id: 0,
            push,
            pos,
            sync: pos,
            picked: false,
            pending_spawn: false,
            pending_destroy: false,
            pending_move: false,
        }
    }
}
