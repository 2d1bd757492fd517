use anyhow::{Context, Result};
use serde::{de::DeserializeOwned, Serialize};
use std::marker::PhantomData;
use tracing::*;

use crate::storage::Storage;

pub const MEMORIES_KEY: &str = "memories";
pub const COMMENTS_KEY: &str = "comments";
pub const CURRENT_USER_KEY: &str = "current_user";

/// A whole sequence of records persisted under a single storage key. Reads
/// and writes always move the entire sequence.
pub struct Collection<T> {
    key: &'static str,
    _marker: PhantomData<T>,
}

impl<T> Collection<T> {
    pub const fn new(key: &'static str) -> Self {
        Self {
            key,
            _marker: PhantomData,
        }
    }

    pub fn key(&self) -> &'static str {
        self.key
    }
}

impl<T> Collection<T>
where
    T: Serialize + DeserializeOwned,
{
    /// Unreadable or undecodable collections load as empty.
    pub fn load(&self, storage: &dyn Storage) -> Vec<T> {
        let serialized = match storage.get(self.key) {
            Ok(Some(serialized)) => serialized,
            Ok(None) => return Vec::new(),
            Err(e) => {
                warn!(key = %self.key, error = %e, "collection:unreadable");
                return Vec::new();
            }
        };

        match serde_json::from_str(&serialized) {
            Ok(items) => items,
            Err(e) => {
                warn!(key = %self.key, error = %e, "collection:corrupt");
                Vec::new()
            }
        }
    }

    pub fn save(&self, storage: &dyn Storage, items: &[T]) -> Result<()> {
        let serialized = serde_json::to_string(items)?;

        storage
            .set(self.key, &serialized)
            .with_context(|| format!("saving '{}'", self.key))?;

        trace!(key = %self.key, len = items.len(), "collection:saved");

        Ok(())
    }
}
