//! Transport abstraction for observer messages.

use crate::ObserverMessage;

/// Sink for messages addressed to one observer.
///
/// The collision surface subsystem drives this once per tick; a real
/// implementation encodes and forwards to the session owning the
/// observer, while tests simply collect into a `Vec`.
pub trait ObserverTransport {
    fn send(&mut self, message: ObserverMessage);
}

impl ObserverTransport for Vec<ObserverMessage> {
    fn send(&mut self, message: ObserverMessage) {
        self.push(message);
    }
}
