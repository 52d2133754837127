//! Observer-facing wire message types for Convoy.
//!
//! This crate defines the messages the collision surface subsystem emits
//! toward a connected observer. They are transport-agnostic: any reliable,
//! ordered byte transport can carry them. The subsystem never reads
//! anything back; the protocol here is strictly server-to-observer.

mod error;
mod message;
mod transport;

pub use error::NetworkError;
pub use message::{deserialize, serialize, EntityId, ObserverMessage};
pub use transport::ObserverTransport;
