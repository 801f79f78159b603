//! JSON-file-backed key/value map.
//!
//! The whole map lives behind one `RwLock` and is replaced wholesale on
//! every write or reload, so readers always see a complete snapshot.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError, RwLock, Weak};
use std::time::Duration;

use notify_debouncer_full::notify::{EventKind, RecommendedWatcher, RecursiveMode};
use notify_debouncer_full::{new_debouncer, DebounceEventResult, Debouncer, RecommendedCache};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::common::error::{StoreError, StoreResult};

const WATCH_DEBOUNCE: Duration = Duration::from_millis(250);

pub struct FileStore<V> {
    path: PathBuf,
    entries: RwLock<Arc<HashMap<String, V>>>,
    /// Serializes read-modify-write cycles.
    writer: Mutex<()>,
}

impl<V> FileStore<V>
where
    V: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    /// Open the store at `path`. A missing file is an empty store.
    pub fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();
        let entries = read_file(&path)?;
        debug!(path = %path.display(), entries = entries.len(), "Opened store");

        Ok(Self {
            path,
            entries: RwLock::new(Arc::new(entries)),
            writer: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current contents. Later writes do not affect the returned map.
    pub fn snapshot(&self) -> Arc<HashMap<String, V>> {
        Arc::clone(&self.entries.read().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn get(&self, key: &str) -> Option<V> {
        self.snapshot().get(key).cloned()
    }

    /// Insert or replace `key`, persisting before the new map is visible.
    pub fn set(&self, key: impl Into<String>, value: V) -> StoreResult<()> {
        let key = key.into();
        self.update(|entries| {
            entries.insert(key, value);
        })
    }

    pub fn remove(&self, key: &str) -> StoreResult<Option<V>> {
        let mut removed = None;
        self.update(|entries| removed = entries.remove(key))?;
        Ok(removed)
    }

    /// Re-read the file. On failure the current contents are kept.
    pub fn reload(&self) -> StoreResult<()> {
        let _guard = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let entries = read_file(&self.path)?;
        debug!(path = %self.path.display(), entries = entries.len(), "Reloaded store");
        self.swap(entries);
        Ok(())
    }

    fn update(&self, change: impl FnOnce(&mut HashMap<String, V>)) -> StoreResult<()> {
        let _guard = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let mut entries = (*self.snapshot()).clone();
        change(&mut entries);
        write_file(&self.path, &entries)?;
        self.swap(entries);
        Ok(())
    }

    fn swap(&self, entries: HashMap<String, V>) {
        *self.entries.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(entries);
    }
}

/// Keeps a store in sync with its file while alive.
pub struct StoreWatcher {
    _debouncer: Debouncer<RecommendedWatcher, RecommendedCache>,
}

impl<V> FileStore<V>
where
    V: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    /// Reload whenever the file changes on disk.
    ///
    /// Watches the parent directory so replacing the file (rename over it)
    /// is seen too.
    pub fn watch(self: &Arc<Self>) -> StoreResult<StoreWatcher> {
        let store: Weak<Self> = Arc::downgrade(self);
        let file_name = self.path.file_name().map(|name| name.to_os_string());
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let mut debouncer = new_debouncer(
            WATCH_DEBOUNCE,
            None,
            move |result: DebounceEventResult| match result {
                Ok(events) => {
                    let touched = events.iter().any(|event| {
                        !matches!(event.kind, EventKind::Access(_))
                            && event
                                .paths
                                .iter()
                                .any(|path| path.file_name() == file_name.as_deref())
                    });
                    if !touched {
                        return;
                    }
                    let Some(store) = store.upgrade() else { return };
                    match store.reload() {
                        Ok(()) => info!(path = %store.path.display(), "Store reloaded from disk"),
                        Err(e) => warn!("Store reload failed: {}", e),
                    }
                }
                Err(errors) => {
                    for e in errors {
                        warn!(error = %e, "Store watcher error");
                    }
                }
            },
        )?;

        debouncer.watch(&dir, RecursiveMode::NonRecursive)?;
        debug!(dir = %dir.display(), "Watching store directory");

        Ok(StoreWatcher {
            _debouncer: debouncer,
        })
    }
}

fn read_file<V: DeserializeOwned>(path: &Path) -> StoreResult<HashMap<String, V>> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(HashMap::new()),
        Err(source) => {
            return Err(StoreError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    if content.trim().is_empty() {
        return Ok(HashMap::new());
    }

    serde_json::from_str(&content).map_err(|source| StoreError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Write through a temporary file so readers of the file never see half of it.
fn write_file<V: Serialize>(path: &Path, entries: &HashMap<String, V>) -> StoreResult<()> {
    let io_error = |source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    };

    let sorted: BTreeMap<_, _> = entries.iter().collect();
    let json = serde_json::to_string_pretty(&sorted).map_err(|source| StoreError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    let mut tmp = path.as_os_str().to_os_string();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    fs::write(&tmp, json).map_err(io_error)?;
    fs::rename(&tmp, path).map_err(io_error)
}
