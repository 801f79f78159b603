//! Game server telnet console endpoint.
//!
//! ## Module Structure
//!
//! - `codec`: line framing with telnet negotiation stripped
//! - `parser`: console line to chat message
//! - `client`: dial, login and read loop

pub mod client;
pub mod codec;
pub mod parser;

pub use client::TelnetTransport;
