//! Wire message types sent to a single observer.
//!
//! These are the messages the collision surface subsystem produces each
//! tick. They are transport-agnostic and can be serialized over any
//! transport; ordering within one tick is significant (destroys before
//! spawns before moves).

use convoy_voxel::BlockFace;
use glam::DVec3;
use serde::{Deserialize, Serialize};

/// Client-side entity identifier.
///
/// Identifiers live in a finite per-session space on the client, so the
/// subsystem recycles them aggressively (see the surface crate's proxy
/// pool).
pub type EntityId = u32;

/// Messages sent to one observer to keep its proxy entities in sync.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ObserverMessage {
    /// Destroy a batch of entities in one message.
    ///
    /// Contains both mount and proxy ids; at most one of these is sent
    /// per tick.
    DestroyEntities { entity_ids: Vec<EntityId> },

    /// Spawn one proxy volume: an invisible mount plus the solid proxy
    /// entity mounted into it, at its initial position.
    ///
    /// `position` is the center of the unit cube the proxy occupies.
    /// `push` is the direction the proxy shoves an overlapping observer.
    SpawnProxy {
        mount_id: EntityId,
        proxy_id: EntityId,
        position: DVec3,
        push: BlockFace,
    },

    /// Move a live proxy volume (addressed by its mount) to a new
    /// cube-center position.
    MoveProxy { mount_id: EntityId, position: DVec3 },

    /// Corrective observer position update, sent at most once per tick
    /// before any spawns. Axes that were not displaced are `None` and
    /// keep their client-side value.
    CorrectPosition {
        x: Option<f64>,
        y: Option<f64>,
        z: Option<f64>,
        /// One-tick upward impulse countering gravity after an upward push.
        velocity_y: f64,
    },
}

/// Serialize a message to bytes using bincode.
pub fn serialize(message: &ObserverMessage) -> Result<Vec<u8>, crate::NetworkError> {
    bincode::serialize(message).map_err(|e| crate::NetworkError::Serialization(e.to_string()))
}

/// Deserialize a message from bytes using bincode.
pub fn deserialize(bytes: &[u8]) -> Result<ObserverMessage, crate::NetworkError> {
    bincode::deserialize(bytes).map_err(|e| crate::NetworkError::Deserialization(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip_spawn() {
        let message = ObserverMessage::SpawnProxy {
            mount_id: 7,
            proxy_id: 8,
            position: DVec3::new(0.5, 63.5, 2.5),
            push: BlockFace::Up,
        };
        let bytes = serialize(&message).expect("serialize failed");
        match deserialize(&bytes).expect("deserialize failed") {
            ObserverMessage::SpawnProxy {
                mount_id,
                proxy_id,
                position,
                push,
            } => {
                assert_eq!(mount_id, 7);
                assert_eq!(proxy_id, 8);
                assert_eq!(position, DVec3::new(0.5, 63.5, 2.5));
                assert_eq!(push, BlockFace::Up);
            }
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[test]
    fn test_destroy_batch_keeps_order() {
        let message = ObserverMessage::DestroyEntities {
            entity_ids: vec![3, 4, 1, 2],
        };
        let bytes = serialize(&message).expect("serialize failed");
        match deserialize(&bytes).expect("deserialize failed") {
            ObserverMessage::DestroyEntities { entity_ids } => {
                assert_eq!(entity_ids, vec![3, 4, 1, 2]);
            }
            other => panic!("unexpected message: {:?}", other),
        }
    }
}
