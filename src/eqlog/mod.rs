//! Game client log endpoint.
//!
//! ## Module Structure
//!
//! - `tail`: polling reader for an appended file
//! - `client`: read-only transport over the tail

pub mod client;
pub mod tail;

pub use client::EqlogTransport;
