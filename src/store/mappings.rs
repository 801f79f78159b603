//! Name and channel mappings.

use std::path::PathBuf;
use std::sync::Arc;

use super::file::{FileStore, StoreWatcher};
use crate::common::error::StoreResult;
use crate::routing::GuildLookup;

/// Discord user id to in-game character name.
#[derive(Clone)]
pub struct UserStore {
    inner: Arc<FileStore<String>>,
}

impl UserStore {
    pub fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        Ok(Self {
            inner: Arc::new(FileStore::open(path)?),
        })
    }

    pub fn name(&self, discord_id: &str) -> Option<String> {
        self.inner.get(discord_id)
    }

    pub fn set(&self, discord_id: &str, name: &str) -> StoreResult<()> {
        self.inner.set(discord_id, name.to_string())
    }

    pub fn watch(&self) -> StoreResult<StoreWatcher> {
        self.inner.watch()
    }
}

/// Guild key to destination channel id.
#[derive(Clone)]
pub struct GuildStore {
    inner: Arc<FileStore<String>>,
}

impl GuildStore {
    pub fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        Ok(Self {
            inner: Arc::new(FileStore::open(path)?),
        })
    }

    pub fn set(&self, guild: &str, channel_id: &str) -> StoreResult<()> {
        self.inner.set(guild, channel_id.to_string())
    }

    pub fn watch(&self) -> StoreResult<StoreWatcher> {
        self.inner.watch()
    }
}

impl GuildLookup for GuildStore {
    fn channel_id(&self, guild: &str) -> Option<String> {
        self.inner.get(guild)
    }
}
