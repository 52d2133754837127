//! Observer displacement correction.
//!
//! A proxy that spawns inside the observer's bounding box would trap or
//! eject the observer through native collision resolution on the client.
//! Before spawn messages go out, the pusher accumulates the minimal
//! displacement that moves the observer clear of every pending proxy,
//! each along that proxy's fixed push direction, and emits at most one
//! corrective position message per tick.

use convoy_network::{ObserverMessage, ObserverTransport};
use convoy_voxel::{Aabb, BlockFace};
use glam::DVec3;

use crate::proxy_pool::ProxyVolume;
use crate::ObserverState;

/// A small extra distance kept between proxy and observer after a push
const PUSH_EXTRA: f64 = 1e-4;
/// Upwards velocity countering gravity for one tick after an upward push
const PUSH_UP_VELOCITY: f64 = 0.04;

pub(crate) struct ObserverPusher {
    origin: DVec3,
    bbox: Aabb,
    push: DVec3,
}

impl ObserverPusher {
    pub fn new() -> Self {
        Self {
            origin: DVec3::ZERO,
            bbox: Aabb::new(DVec3::ZERO, DVec3::ZERO),
            push: DVec3::ZERO,
        }
    }

    /// Re-arms the pusher from this tick's observer snapshot.
    pub fn reset(&mut self, observer: &ObserverState) {
        self.origin = observer.position;
        self.bbox = observer.aabb;
        self.push = DVec3::ZERO;
    }

    /// Handles one about-to-spawn proxy. If its unit cube intersects the
    /// observer's bounding box (offset by pushes accumulated so far), the
    /// push along the proxy's direction is extended and `true` is
    /// returned.
    pub fn proxy_spawned(&mut self, proxy: &ProxyVolume) -> bool {
        // The bbox is not re-derived after earlier pushes; shift the cube
        // the other way instead
        if !self
            .bbox
            .intersects(&Aabb::unit_cube(proxy.pos - self.push))
        {
            return false;
        }

        // Observer position is the bottom-center of its bounding box
        let size = self.bbox.size();
        match proxy.push {
            BlockFace::North => {
                let pushed = (proxy.pos.z - 0.5 - 0.5 * size.z) - self.origin.z - PUSH_EXTRA;
                if pushed < self.push.z {
                    self.push.z = pushed;
                    return true;
                }
            }
            BlockFace::South => {
                let pushed = (proxy.pos.z + 0.5 + 0.5 * size.z) - self.origin.z + PUSH_EXTRA;
                if pushed > self.push.z {
                    self.push.z = pushed;
                    return true;
                }
            }
            BlockFace::West => {
                let pushed = (proxy.pos.x - 0.5 - 0.5 * size.x) - self.origin.x - PUSH_EXTRA;
                if pushed < self.push.x {
                    self.push.x = pushed;
                    return true;
                }
            }
            BlockFace::East => {
                let pushed = (proxy.pos.x + 0.5 + 0.5 * size.x) - self.origin.x + PUSH_EXTRA;
                if pushed > self.push.x {
                    self.push.x = pushed;
                    return true;
                }
            }
            BlockFace::Down => {
                let pushed = (proxy.pos.y - 0.5 - size.y) - self.origin.y - PUSH_EXTRA;
                if pushed < self.push.y {
                    self.push.y = pushed;
                    return true;
                }
            }
            BlockFace::Up => {
                let pushed = (proxy.pos.y + 0.5) - self.origin.y + PUSH_EXTRA;
                if pushed > self.push.y {
                    self.push.y = pushed;
                    return true;
                }
            }
        }
        false
    }

    /// Emits the corrective position message, if any push accumulated.
    pub fn send_push(&self, transport: &mut impl ObserverTransport) {
        if self.push == DVec3::ZERO {
            return;
        }

        tracing::debug!(push = ?self.push, "displacing observer clear of spawning proxies");
        transport.send(ObserverMessage::CorrectPosition {
            x: (self.push.x != 0.0).then_some(self.origin.x + self.push.x),
            y: (self.push.y != 0.0).then_some(self.origin.y + self.push.y),
            z: (self.push.z != 0.0).then_some(self.origin.z + self.push.z),
            velocity_y: if self.push.y > 0.0 { PUSH_UP_VELOCITY } else { 0.0 },
        });
    }
}
