//! Message dispatch between endpoints.
//!
//! ## Module Structure
//!
//! - `manager`: routes inbound messages and fans them out to target endpoints
//! - `supervisor`: keep-alive loop that redials disconnected endpoints

pub mod manager;
pub mod supervisor;

pub use manager::Manager;
pub use supervisor::supervise;
