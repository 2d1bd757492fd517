use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use kernel::{CommentId, MemoryId, VersionId};

pub trait Sequence<T>: Send + Sync {
    fn following(&self) -> T;
}

/// Random, collision-resistant identifiers for durable profiles.
#[derive(Default)]
pub struct RandomKeys {}

impl Sequence<MemoryId> for RandomKeys {
    fn following(&self) -> MemoryId {
        MemoryId::from_string(nanoid::nanoid!())
    }
}

impl Sequence<VersionId> for RandomKeys {
    fn following(&self) -> VersionId {
        VersionId::from_string(nanoid::nanoid!())
    }
}

impl Sequence<CommentId> for RandomKeys {
    fn following(&self) -> CommentId {
        CommentId::from_string(nanoid::nanoid!())
    }
}

/// Predictable identifiers for tests, one counter shared by every kind.
pub struct DeterministicKeys {
    sequence: AtomicU64,
}

impl DeterministicKeys {
    pub fn new() -> Self {
        Self {
            sequence: AtomicU64::new(0),
        }
    }

    fn next(&self, prefix: &str) -> String {
        format!("{}-{}", prefix, self.sequence.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for DeterministicKeys {
    fn default() -> Self {
        Self::new()
    }
}

impl Sequence<MemoryId> for DeterministicKeys {
    fn following(&self) -> MemoryId {
        MemoryId::from_string(self.next("M"))
    }
}

impl Sequence<VersionId> for DeterministicKeys {
    fn following(&self) -> VersionId {
        VersionId::from_string(self.next("V"))
    }
}

impl Sequence<CommentId> for DeterministicKeys {
    fn following(&self) -> CommentId {
        CommentId::from_string(self.next("C"))
    }
}

/// The identifier sources a store draws from.
#[derive(Clone)]
pub struct Keys {
    pub memories: Arc<dyn Sequence<MemoryId>>,
    pub versions: Arc<dyn Sequence<VersionId>>,
    pub comments: Arc<dyn Sequence<CommentId>>,
}

impl Keys {
    pub fn random() -> Self {
        let keys = Arc::new(RandomKeys::default());
        Self {
            memories: keys.clone(),
            versions: keys.clone(),
            comments: keys,
        }
    }

    pub fn deterministic() -> Self {
        let keys = Arc::new(DeterministicKeys::new());
        Self {
            memories: keys.clone(),
            versions: keys.clone(),
            comments: keys,
        }
    }
}
