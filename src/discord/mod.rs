//! Discord bot endpoint.
//!
//! ## Module Structure
//!
//! - `client`: transport, gateway lifecycle and outbound sends
//! - `handler`: gateway events to chat messages
//! - `commands`: character registration commands
//! - `split`: message length limits

pub mod client;
pub mod commands;
pub mod handler;
pub mod split;

pub use client::DiscordTransport;
