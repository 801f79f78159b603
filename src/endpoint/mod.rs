//! Endpoints: one stateful adapter per external chat transport.
//!
//! An endpoint owns its connection, config and subscriber list inside a
//! [`Pump`](crate::pump::Pump) worker, so connect, send and close are
//! serialized no matter how many tasks call them.
//!
//! ## Module Structure
//!
//! - `transport`: `Transport` and `Connection` traits implemented by telnet, discord and eqlog
//! - `actor`: the endpoint actor (connection lifecycle) and its handles

pub mod actor;
pub mod transport;

#[cfg(test)]
pub mod testing;

use std::sync::Arc;

use crate::common::ChatMessage;

pub use actor::{ConnectionState, Endpoint, EndpointHandle};
pub use transport::{Connection, InboundSink, Transport, TransportEvent};

/// Callback run for every inbound message of an endpoint.
pub type Subscriber = Arc<dyn Fn(ChatMessage) + Send + Sync>;

/// Announcement sent when a connection comes back after being up before.
pub const STATUS_UP: &str = "Server is now UP";

/// Announcement sent when an established connection drops.
pub const STATUS_DOWN: &str = "Server is now DOWN";
