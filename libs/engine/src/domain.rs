use anyhow::Result;
use std::sync::Arc;
use tracing::{info, trace};

use crate::{
    clock::Clock,
    sequences::Keys,
    storage::{PersistedEntry, StorageFactory},
    SessionPolicy, Store,
};

/// Wires a storage backend, identifier sources and a clock together and
/// hands out stores and session policies over them.
#[derive(Clone)]
pub struct Domain {
    storage_factory: Arc<dyn StorageFactory>,
    keys: Keys,
    clock: Arc<dyn Clock>,
}

impl Domain {
    pub fn new(
        storage_factory: Arc<dyn StorageFactory>,
        keys: Keys,
        clock: Arc<dyn Clock>,
    ) -> Self {
        info!("domain-new");

        Domain {
            storage_factory,
            keys,
            clock,
        }
    }

    pub fn migrate(&self) -> Result<()> {
        self.storage_factory.migrate()
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn open_store(&self) -> Result<Store> {
        trace!("store-open");

        let storage = self.storage_factory.create_storage()?;

        Ok(Store::new(storage, self.keys.clone(), Arc::clone(&self.clock)))
    }

    pub fn open_session_policy(&self) -> Result<SessionPolicy> {
        let storage = self.storage_factory.create_storage()?;

        Ok(SessionPolicy::open(storage))
    }

    pub fn query_all(&self) -> Result<Vec<PersistedEntry>> {
        let storage = self.storage_factory.create_storage()?;
        storage.query_all()
    }
}
