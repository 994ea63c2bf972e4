/// Real-time notification relay
///
/// In-process fan-out of domain events to connected WebSocket clients.
/// The registry tracks connections per user and per tenant; controllers
/// emit events after commits and the transport task drains each
/// connection's channel into its socket.
///
/// Delivery is best effort: events for offline users are dropped, and a
/// send to a closed connection is counted as a miss, never an error.

pub mod event;
pub mod registry;

pub use event::{EventKind, WsEvent};
pub use registry::{ConnectionHandle, ConnectionRegistry};
