use anyhow::{anyhow, Result};
use std::{
    collections::BTreeMap,
    rc::Rc,
    sync::{Arc, Mutex, MutexGuard},
};
use tracing::*;

/// Durable key/value store, one serialized value per key. Every write
/// replaces the previous value for that key wholesale.
pub trait Storage {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, serialized: &str) -> Result<()>;
    fn query_all(&self) -> Result<Vec<PersistedEntry>>;
}

pub trait StorageFactory: Send + Sync {
    fn migrate(&self) -> Result<()>;
    fn create_storage(&self) -> Result<Rc<dyn Storage>>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct PersistedEntry {
    pub key: String,
    pub serialized: String,
}

impl PersistedEntry {
    pub fn to_json_value(&self) -> Result<serde_json::Value> {
        Ok(serde_json::from_str(&self.serialized)?)
    }
}

/// Process-local storage, used by tests and as a scratch profile. Clones
/// share the same entries, the way separate connections to one database file
/// observe each other's writes.
#[derive(Default, Clone)]
pub struct InMemoryStorage {
    entries: Arc<Mutex<BTreeMap<String, String>>>,
}

impl InMemoryStorage {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    fn entries(&self) -> Result<MutexGuard<'_, BTreeMap<String, String>>> {
        self.entries
            .lock()
            .map_err(|_| anyhow!("in-memory storage poisoned"))
    }
}

impl Storage for InMemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        trace!(%key, "get");

        Ok(self.entries()?.get(key).cloned())
    }

    fn set(&self, key: &str, serialized: &str) -> Result<()> {
        debug!(%key, bytes = serialized.len(), "set");

        self.entries()?.insert(key.to_owned(), serialized.to_owned());

        Ok(())
    }

    fn query_all(&self) -> Result<Vec<PersistedEntry>> {
        Ok(self
            .entries()?
            .iter()
            .map(|(key, serialized)| PersistedEntry {
                key: key.clone(),
                serialized: serialized.clone(),
            })
            .collect())
    }
}

#[derive(Default)]
pub struct InMemoryFactory {
    shared: InMemoryStorage,
}

impl InMemoryFactory {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StorageFactory for InMemoryFactory {
    fn migrate(&self) -> Result<()> {
        Ok(())
    }

    fn create_storage(&self) -> Result<Rc<dyn Storage>> {
        Ok(Rc::new(self.shared.clone()))
    }
}
