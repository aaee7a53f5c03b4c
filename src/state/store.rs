//! Persisted key/value stores with same-context and cross-context change
//! notification.
//!
//! A [`Store`] is bound to one storage key and one context (a view, tab or
//! process sharing the same storage). Saves notify the writer's own
//! subscribers synchronously through a `watch` channel, and publish a
//! [`StorageEvent`] on the [`StorageBus`] so stores in *other* contexts reload
//! the key. The bus never redelivers an event to the context that wrote it.

use std::{
    collections::HashMap,
    fs, io,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use tokio::sync::{broadcast, watch};
use tracing::{debug, info, warn};

use super::settings::{Persisted, SelectedPreset, TimerPreferences, TimerSettings};
use crate::error::{FocusError, Result};

/// Minimal key/value storage capability
pub trait Storage: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

/// Process-local storage, used by tests and ephemeral runs
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.entries
            .lock()
            .map_err(|e| FocusError::Storage(io::Error::new(io::ErrorKind::Other, e.to_string())))
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries()?.remove(key);
        Ok(())
    }
}

/// One JSON file per key inside a data directory
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Open (and create if needed) the storage directory
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        info!("File storage opened at {}", dir.display());
        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl Storage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key);
        let tmp = self.dir.join(format!(".{key}.json.tmp"));
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Notification that a key changed, tagged with the writing context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageEvent {
    pub key: String,
    pub origin: String,
}

/// Cross-context change channel shared by every store over the same storage
#[derive(Debug, Clone)]
pub struct StorageBus {
    tx: broadcast::Sender<StorageEvent>,
}

impl StorageBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn publish(&self, event: StorageEvent) {
        // No other context listening is the common single-view case
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StorageEvent> {
        self.tx.subscribe()
    }
}

impl Default for StorageBus {
    fn default() -> Self {
        Self::new(64)
    }
}

/// A persisted value of type `T` as seen from one context
pub struct Store<T: Persisted> {
    storage: Arc<dyn Storage>,
    bus: StorageBus,
    context: String,
    tx: watch::Sender<T>,
}

impl<T: Persisted> Store<T> {
    /// Create a store for `context`, loading (and healing) the current value
    pub fn new(storage: Arc<dyn Storage>, bus: StorageBus, context: impl Into<String>) -> Self {
        let initial = read_or_heal::<T>(storage.as_ref());
        let (tx, _) = watch::channel(initial);
        Self {
            storage,
            bus,
            context: context.into(),
            tx,
        }
    }

    /// Read the persisted value, falling back to (and rewriting) the default.
    /// Never fails.
    pub fn load(&self) -> T {
        let value = read_or_heal::<T>(self.storage.as_ref());
        self.tx.send_if_modified(|current| replace_if_changed(current, &value));
        value
    }

    /// Latest value known to this context without touching storage
    pub fn current(&self) -> T {
        self.tx.borrow().clone()
    }

    /// Validate and persist `value`, then notify this context and the bus.
    /// On rejection storage and subscribers keep the previous value.
    pub fn save(&self, value: T) -> Result<T> {
        value.validate()?;
        let raw = serde_json::to_string(&value)?;
        self.storage.set(T::KEY, &raw)?;
        debug!("Saved {} from context {}", T::KEY, self.context);

        self.tx.send_replace(value.clone());
        self.bus.publish(StorageEvent {
            key: T::KEY.to_string(),
            origin: self.context.clone(),
        });
        Ok(value)
    }

    /// Remove the persisted value and go back to the default
    pub fn reset(&self) -> Result<T> {
        self.storage.remove(T::KEY)?;
        info!("Reset {} to defaults", T::KEY);
        let value = T::default();
        self.tx.send_replace(value.clone());
        self.bus.publish(StorageEvent {
            key: T::KEY.to_string(),
            origin: self.context.clone(),
        });
        Ok(value)
    }

    /// Receiver that always holds the latest value for this context
    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.tx.subscribe()
    }

    /// React to a change written by another context. Returns true when the
    /// event applied to this store and the value changed.
    pub fn handle_storage_event(&self, event: &StorageEvent) -> bool {
        if event.key != T::KEY || event.origin == self.context {
            return false;
        }
        let value = read_or_heal::<T>(self.storage.as_ref());
        let changed = self
            .tx
            .send_if_modified(|current| replace_if_changed(current, &value));
        if changed {
            debug!(
                "Context {} picked up {} written by {}",
                self.context, T::KEY, event.origin
            );
        }
        changed
    }
}

fn replace_if_changed<T: PartialEq + Clone>(current: &mut T, value: &T) -> bool {
    if current == value {
        false
    } else {
        *current = value.clone();
        true
    }
}

/// Read `T` from storage; absent, unreadable, unparseable or invalid values
/// are replaced by the default, which is written back when possible.
fn read_or_heal<T: Persisted>(storage: &dyn Storage) -> T {
    let outcome = match storage.get(T::KEY) {
        Ok(Some(raw)) => serde_json::from_str::<T>(&raw)
            .map_err(|e| FocusError::PersistenceCorrupt {
                key: T::KEY.to_string(),
                reason: e.to_string(),
            })
            .and_then(|value| {
                value.validate().map(|_| value).map_err(|e| FocusError::PersistenceCorrupt {
                    key: T::KEY.to_string(),
                    reason: e.to_string(),
                })
            })
            .map(Some),
        Ok(None) => Ok(None),
        Err(e) => Err(e),
    };

    match outcome {
        Ok(Some(value)) => return value,
        Ok(None) => debug!("No stored value for {}, writing defaults", T::KEY),
        Err(e) => warn!("Falling back to defaults for {}: {}", T::KEY, e),
    }

    let value = T::default();
    match serde_json::to_string(&value) {
        Ok(raw) => {
            if let Err(e) = storage.set(T::KEY, &raw) {
                warn!("Failed to write defaults for {}: {}", T::KEY, e);
            }
        }
        Err(e) => warn!("Failed to encode defaults for {}: {}", T::KEY, e),
    }
    value
}

/// The three stores as seen from one context
#[derive(Clone)]
pub struct StoreSet {
    pub settings: Arc<Store<TimerSettings>>,
    pub preferences: Arc<Store<TimerPreferences>>,
    pub ambient: Arc<Store<SelectedPreset>>,
}

impl StoreSet {
    pub fn open(storage: Arc<dyn Storage>, bus: &StorageBus, context: &str) -> Self {
        Self {
            settings: Arc::new(Store::new(storage.clone(), bus.clone(), context)),
            preferences: Arc::new(Store::new(storage.clone(), bus.clone(), context)),
            ambient: Arc::new(Store::new(storage, bus.clone(), context)),
        }
    }

    /// Route a bus event to whichever store owns the key
    pub fn handle_storage_event(&self, event: &StorageEvent) -> bool {
        self.settings.handle_storage_event(event)
            || self.preferences.handle_storage_event(event)
            || self.ambient.handle_storage_event(event)
    }

    /// Reload every key from storage
    pub fn reload(&self) {
        self.settings.load();
        self.preferences.load();
        self.ambient.load();
    }
}
