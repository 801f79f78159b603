//! Game-side text handling.
//!
//! This module contains:
//! - Item link decoding
//! - Chat channel numbers and say-phrase classification
//! - Sanitization of text entering the relay

pub mod channels;
pub mod links;
pub mod sanitize;

pub use links::convert_links;
pub use sanitize::{sanitize, sanitize_name};
