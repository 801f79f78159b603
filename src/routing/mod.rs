//! Message routing.
//!
//! This module handles:
//! - Compiling configured routes (triggers and message templates)
//! - Matching inbound messages against routes in configured order
//! - Resolving destination channels through guild mappings

pub mod route;
pub mod router;
pub mod template;

pub use router::Router;

/// Guild key to destination channel lookup.
pub trait GuildLookup: Send + Sync {
    fn channel_id(&self, guild: &str) -> Option<String>;
}

/// Lookup with no mappings.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoGuilds;

impl GuildLookup for NoGuilds {
    fn channel_id(&self, _guild: &str) -> Option<String> {
        None
    }
}
