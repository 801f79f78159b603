//! Pending character registrations.
//!
//! A Discord user asks to be shown under a character name; an admin approves
//! or denies the request by its six-digit code.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::file::{FileStore, StoreWatcher};
use crate::common::error::StoreResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistrationStatus {
    Pending,
    Approved,
    Denied,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    pub discord_id: String,
    pub discord_name: String,
    pub character: String,
    pub code: String,
    pub status: RegistrationStatus,
    /// Unix seconds.
    pub created_at: i64,
}

/// Registrations keyed by Discord user id; one per user.
#[derive(Clone)]
pub struct RegistrationStore {
    inner: Arc<FileStore<Registration>>,
}

impl RegistrationStore {
    pub fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        Ok(Self {
            inner: Arc::new(FileStore::open(path)?),
        })
    }

    /// Queue a new request, replacing any earlier one from the same user.
    pub fn add(
        &self,
        discord_id: &str,
        discord_name: &str,
        character: &str,
    ) -> StoreResult<Registration> {
        let registration = Registration {
            discord_id: discord_id.to_string(),
            discord_name: discord_name.to_string(),
            character: character.to_string(),
            code: self.unused_code(),
            status: RegistrationStatus::Pending,
            created_at: Utc::now().timestamp(),
        };
        self.inner.set(discord_id, registration.clone())?;
        Ok(registration)
    }

    pub fn find_by_code(&self, code: &str) -> Option<Registration> {
        self.inner
            .snapshot()
            .values()
            .find(|registration| registration.code == code)
            .cloned()
    }

    /// Store `registration` under its user.
    pub fn update(&self, registration: Registration) -> StoreResult<()> {
        let key = registration.discord_id.clone();
        self.inner.set(key, registration)
    }

    pub fn watch(&self) -> StoreResult<StoreWatcher> {
        self.inner.watch()
    }

    fn unused_code(&self) -> String {
        let mut rng = rand::thread_rng();
        loop {
            let code = rng.gen_range(100_000..1_000_000).to_string();
            if self.find_by_code(&code).is_none() {
                return code;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store(dir: &TempDir) -> RegistrationStore {
        RegistrationStore::open(dir.path().join("registrations.json")).unwrap()
    }

    #[test]
    fn test_add_and_find() {
        let dir = TempDir::new().unwrap();
        let registrations = store(&dir);

        let added = registrations.add("1001", "shin#0001", "Shin").unwrap();
        assert_eq!(added.code.len(), 6);
        assert_eq!(added.status, RegistrationStatus::Pending);

        let found = registrations.find_by_code(&added.code).unwrap();
        assert_eq!(found, added);
        assert!(registrations.find_by_code("000000").is_none());
    }

    #[test]
    fn test_update_status_persists() {
        let dir = TempDir::new().unwrap();
        let registrations = store(&dir);

        let mut registration = registrations.add("1001", "shin#0001", "Shin").unwrap();
        registration.status = RegistrationStatus::Approved;
        registrations.update(registration.clone()).unwrap();

        let reopened = store(&dir);
        assert_eq!(
            reopened.find_by_code(&registration.code).unwrap().status,
            RegistrationStatus::Approved
        );
    }

    #[test]
    fn test_new_request_replaces_old() {
        let dir = TempDir::new().unwrap();
        let registrations = store(&dir);

        let first = registrations.add("1001", "shin#0001", "Shin").unwrap();
        let second = registrations.add("1001", "shin#0001", "Shinobi").unwrap();

        if first.code != second.code {
            assert!(registrations.find_by_code(&first.code).is_none());
        }
        assert_eq!(
            registrations.find_by_code(&second.code).unwrap().character,
            "Shinobi"
        );
    }
}
