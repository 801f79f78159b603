//! File-backed lookup stores.
//!
//! ## Module Structure
//!
//! - `file`: generic JSON map with whole-map swaps and file-watch reload
//! - `mappings`: user names and guild channels
//! - `registrations`: pending character registrations

pub mod file;
pub mod mappings;
pub mod registrations;

pub use file::StoreWatcher;
pub use mappings::{GuildStore, UserStore};
pub use registrations::{RegistrationStatus, RegistrationStore};
