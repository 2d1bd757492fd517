use anyhow::Result;
use std::{rc::Rc, sync::Arc};
use tracing::*;

use crate::{
    clock::Clock,
    collection::{Collection, COMMENTS_KEY, MEMORIES_KEY},
    sequences::Keys,
    storage::Storage,
};
use kernel::{Comment, Memory, MemoryId, MemoryVersion, Millis, User};

pub const MEMORIES: Collection<Memory> = Collection::new(MEMORIES_KEY);
pub const COMMENTS: Collection<Comment> = Collection::new(COMMENTS_KEY);

/// CRUD over the memories and comments collections.
///
/// Every write is one full load, mutate, save cycle over its collection.
/// Nothing isolates two such cycles from each other, the later save wins.
/// Missing records come back as `None`, unreadable collections as empty, and
/// only a failed save is reported as an error.
pub struct Store {
    storage: Rc<dyn Storage>,
    keys: Keys,
    clock: Arc<dyn Clock>,
}

impl Store {
    pub fn new(storage: Rc<dyn Storage>, keys: Keys, clock: Arc<dyn Clock>) -> Self {
        Self {
            storage,
            keys,
            clock,
        }
    }

    fn load_memories(&self) -> Vec<Memory> {
        MEMORIES.load(self.storage.as_ref())
    }

    fn save_memories(&self, memories: &[Memory]) -> Result<()> {
        MEMORIES.save(self.storage.as_ref(), memories)
    }

    fn load_comments(&self) -> Vec<Comment> {
        COMMENTS.load(self.storage.as_ref())
    }

    fn save_comments(&self, comments: &[Comment]) -> Result<()> {
        COMMENTS.save(self.storage.as_ref(), comments)
    }

    /// Runs `modify` against the memory with `id` and saves the collection,
    /// unless there's no such memory, in which case nothing is written.
    fn modify_memory<T>(
        &self,
        id: &MemoryId,
        modify: impl FnOnce(&mut Memory, Millis) -> T,
    ) -> Result<Option<T>> {
        let mut memories = self.load_memories();
        let Some(memory) = memories.iter_mut().find(|m| &m.id == id) else {
            debug!(%id, "memory:missing");
            return Ok(None);
        };

        let value = modify(memory, self.clock.now());

        self.save_memories(&memories)?;

        Ok(Some(value))
    }

    /// Most recently updated first. Ties keep their stored order.
    pub fn list_memories(&self) -> Vec<Memory> {
        let mut memories = self.load_memories();
        memories.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        memories
    }

    pub fn list_memories_by_author(&self, author: User) -> Vec<Memory> {
        self.list_memories()
            .into_iter()
            .filter(|m| m.author == author)
            .collect()
    }

    pub fn get_memory(&self, id: &MemoryId) -> Option<Memory> {
        self.load_memories().into_iter().find(|m| &m.id == id)
    }

    pub fn create_memory(
        &self,
        title: &str,
        author: User,
        initial_content: &str,
    ) -> Result<Memory> {
        let mut memories = self.load_memories();
        let now = self.clock.now();
        let memory = Memory {
            id: self.keys.memories.following(),
            title: title.to_owned(),
            content: initial_content.to_owned(),
            author,
            created_at: now,
            updated_at: now,
            versions: Vec::new(),
        };

        memories.push(memory.clone());
        self.save_memories(&memories)?;

        info!(%memory.id, %author, "memory:created");

        Ok(memory)
    }

    pub fn update_memory_content(&self, id: &MemoryId, content: &str) -> Result<Option<Memory>> {
        let updated = self.modify_memory(id, |memory, now| {
            memory.content = content.to_owned();
            touch(memory, now);
            memory.clone()
        })?;

        if let Some(memory) = &updated {
            debug!(%memory.id, updated_at = memory.updated_at, "memory:content");
        }

        Ok(updated)
    }

    pub fn update_memory_title(&self, id: &MemoryId, title: &str) -> Result<Option<Memory>> {
        let updated = self.modify_memory(id, |memory, now| {
            memory.title = title.to_owned();
            touch(memory, now);
            memory.clone()
        })?;

        if let Some(memory) = &updated {
            debug!(%memory.id, updated_at = memory.updated_at, "memory:title");
        }

        Ok(updated)
    }

    /// Appends a snapshot of the memory's current persisted content. Two calls
    /// in a row produce two identical snapshots.
    pub fn save_version(&self, id: &MemoryId) -> Result<Option<MemoryVersion>> {
        let version_id = self.keys.versions.following();
        let version = self.modify_memory(id, |memory, now| {
            let saved_at = memory
                .latest_version()
                .map_or(now, |latest| now.max(latest.saved_at));
            let version = MemoryVersion {
                id: version_id,
                content: memory.content.clone(),
                saved_at,
            };
            memory.versions.push(version.clone());
            version
        })?;

        if let Some(version) = &version {
            info!(%id, %version.id, "memory:version");
        }

        Ok(version)
    }

    /// Comments aren't checked against existing memories.
    pub fn add_comment(
        &self,
        memory_id: &MemoryId,
        author: User,
        text: &str,
    ) -> Result<Comment> {
        let mut comments = self.load_comments();
        let comment = Comment {
            id: self.keys.comments.following(),
            memory_id: memory_id.clone(),
            author,
            text: text.to_owned(),
            created_at: self.clock.now(),
        };

        comments.push(comment.clone());
        self.save_comments(&comments)?;

        info!(%memory_id, %comment.id, %author, "comment:added");

        Ok(comment)
    }

    /// Oldest first.
    pub fn list_comments_for_memory(&self, memory_id: &MemoryId) -> Vec<Comment> {
        let mut comments: Vec<_> = self
            .load_comments()
            .into_iter()
            .filter(|c| &c.memory_id == memory_id)
            .collect();
        comments.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        comments
    }
}

/// `updated_at` moves forward on every mutation, even within one millisecond.
fn touch(memory: &mut Memory, now: Millis) {
    memory.updated_at = now.max(memory.updated_at.saturating_add(1));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{clock::ManualClock, storage::InMemoryStorage};
    use anyhow::anyhow;
    use serde::Serialize;

    struct Fixture {
        storage: Rc<InMemoryStorage>,
        clock: Arc<ManualClock>,
        store: Store,
    }

    fn fixture() -> Fixture {
        let storage = InMemoryStorage::new();
        let clock = Arc::new(ManualClock::new(1_000));
        let store = Store::new(storage.clone(), Keys::deterministic(), clock.clone());
        Fixture {
            storage,
            clock,
            store,
        }
    }

    #[test]
    fn it_creates_memory_round_trip() -> Result<()> {
        let f = fixture();

        let created = f.store.create_memory("T", User::Rini, "hello")?;
        let loaded = f.store.get_memory(&created.id).unwrap();

        assert_eq!(loaded.content, "hello");
        assert_eq!(loaded.title, "T");
        assert_eq!(loaded.author, User::Rini);
        assert_eq!(loaded.created_at, loaded.updated_at);
        assert!(loaded.versions.is_empty());
        assert_eq!(loaded, created);

        Ok(())
    }

    #[test]
    fn it_creates_memories_with_empty_content_and_duplicate_titles() -> Result<()> {
        let f = fixture();

        let a = f.store.create_memory("Untitled Memory", User::Yadish, "")?;
        let b = f.store.create_memory("Untitled Memory", User::Yadish, "")?;

        assert_ne!(a.id, b.id);
        assert_eq!(a.content, "");
        assert_eq!(f.store.list_memories().len(), 2);

        Ok(())
    }

    #[test]
    fn it_returns_none_for_missing_memory() -> Result<()> {
        let f = fixture();

        let missing = MemoryId::new("nope");

        assert!(f.store.get_memory(&missing).is_none());
        assert!(f.store.update_memory_content(&missing, "x")?.is_none());
        assert!(f.store.update_memory_title(&missing, "x")?.is_none());
        assert!(f.store.save_version(&missing)?.is_none());

        Ok(())
    }

    #[test]
    fn it_does_not_write_when_memory_is_missing() -> Result<()> {
        let f = fixture();

        f.store.update_memory_content(&MemoryId::new("nope"), "x")?;

        assert!(f.storage.get(MEMORIES_KEY)?.is_none());

        Ok(())
    }

    #[test]
    fn it_advances_updated_at_on_every_update() -> Result<()> {
        let f = fixture();

        let created = f.store.create_memory("T", User::Rini, "a")?;

        // Same millisecond as creation.
        let first = f.store.update_memory_content(&created.id, "b")?.unwrap();
        assert!(first.updated_at > created.updated_at);
        assert_eq!(first.created_at, created.created_at);

        f.clock.advance(10);
        let second = f.store.update_memory_title(&created.id, "U")?.unwrap();
        assert!(second.updated_at > first.updated_at);
        assert_eq!(second.updated_at, 1_010);

        Ok(())
    }

    #[test]
    fn it_advances_updated_at_for_unchanged_content() -> Result<()> {
        let f = fixture();

        let created = f.store.create_memory("T", User::Rini, "same")?;
        f.clock.advance(1);
        let updated = f.store.update_memory_content(&created.id, "same")?.unwrap();

        assert_eq!(updated.content, "same");
        assert!(updated.updated_at > created.updated_at);

        Ok(())
    }

    #[test]
    fn it_lists_most_recently_updated_first() -> Result<()> {
        let f = fixture();

        let a = f.store.create_memory("a", User::Rini, "")?;
        f.clock.advance(1);
        let b = f.store.create_memory("b", User::Yadish, "")?;
        f.clock.advance(1);
        let c = f.store.create_memory("c", User::Rini, "")?;

        let titles = |store: &Store| -> Vec<String> {
            store.list_memories().into_iter().map(|m| m.title).collect()
        };

        assert_eq!(titles(&f.store), vec!["c", "b", "a"]);

        f.clock.advance(1);
        f.store.update_memory_content(&a.id, "touched")?;
        assert_eq!(titles(&f.store), vec!["a", "c", "b"]);

        f.clock.advance(1);
        f.store.update_memory_title(&b.id, "b2")?;
        assert_eq!(titles(&f.store), vec!["b2", "a", "c"]);

        let listed = f.store.list_memories();
        assert!(listed.windows(2).all(|w| w[0].updated_at >= w[1].updated_at));
        assert_eq!(listed.last().map(|m| &m.id), Some(&c.id));

        Ok(())
    }

    #[test]
    fn it_lists_memories_by_author() -> Result<()> {
        let f = fixture();

        f.store.create_memory("a", User::Rini, "")?;
        f.clock.advance(1);
        f.store.create_memory("b", User::Yadish, "")?;
        f.clock.advance(1);
        f.store.create_memory("c", User::Rini, "")?;

        let rini: Vec<_> = f
            .store
            .list_memories_by_author(User::Rini)
            .into_iter()
            .map(|m| m.title)
            .collect();

        assert_eq!(rini, vec!["c", "a"]);
        assert_eq!(f.store.list_memories_by_author(User::Yadish).len(), 1);

        Ok(())
    }

    #[test]
    fn it_appends_versions() -> Result<()> {
        let f = fixture();

        let memory = f.store.create_memory("T", User::Rini, "one")?;

        let first = f.store.save_version(&memory.id)?.unwrap();
        f.clock.advance(5);
        f.store.update_memory_content(&memory.id, "two")?;
        let second = f.store.save_version(&memory.id)?.unwrap();
        let third = f.store.save_version(&memory.id)?.unwrap();

        let loaded = f.store.get_memory(&memory.id).unwrap();

        assert_eq!(loaded.versions.len(), 3);
        assert_eq!(loaded.versions[0], first);
        assert_eq!(loaded.versions[0].content, "one");
        assert_eq!(loaded.versions[1], second);
        assert_eq!(loaded.versions[2], third);
        assert_eq!(second.content, third.content);
        assert_ne!(second.id, third.id);
        assert!(loaded
            .versions
            .windows(2)
            .all(|w| w[0].saved_at <= w[1].saved_at));

        Ok(())
    }

    #[test]
    fn it_keeps_saved_at_non_decreasing_when_clock_goes_backwards() -> Result<()> {
        let f = fixture();

        let memory = f.store.create_memory("T", User::Rini, "one")?;
        f.clock.set(5_000);
        f.store.save_version(&memory.id)?;
        f.clock.set(4_000);
        let later = f.store.save_version(&memory.id)?.unwrap();

        assert_eq!(later.saved_at, 5_000);

        Ok(())
    }

    #[test]
    fn it_does_not_touch_updated_at_when_saving_versions() -> Result<()> {
        let f = fixture();

        let memory = f.store.create_memory("T", User::Rini, "one")?;
        f.clock.advance(100);
        f.store.save_version(&memory.id)?;

        let loaded = f.store.get_memory(&memory.id).unwrap();
        assert_eq!(loaded.updated_at, memory.updated_at);

        Ok(())
    }

    #[test]
    fn it_lists_comments_chronologically() -> Result<()> {
        let f = fixture();

        let memory = f.store.create_memory("T", User::Rini, "")?;
        let other = f.store.create_memory("O", User::Yadish, "")?;

        f.clock.advance(1);
        f.store.add_comment(&memory.id, User::Rini, "first")?;
        f.clock.advance(1);
        f.store.add_comment(&other.id, User::Rini, "elsewhere")?;
        f.clock.advance(1);
        let hi = f.store.add_comment(&memory.id, User::Yadish, "hi")?;

        let comments = f.store.list_comments_for_memory(&memory.id);
        let texts: Vec<_> = comments.iter().map(|c| c.text.as_str()).collect();

        assert_eq!(texts, vec!["first", "hi"]);
        assert_eq!(comments.last(), Some(&hi));
        assert_eq!(
            f.store
                .list_comments_for_memory(&memory.id)
                .iter()
                .filter(|c| c.text == "hi")
                .count(),
            1
        );

        Ok(())
    }

    #[test]
    fn it_orders_comments_by_creation_not_storage_order() -> Result<()> {
        let f = fixture();

        let memory = f.store.create_memory("T", User::Rini, "")?;

        f.clock.set(3_000);
        f.store.add_comment(&memory.id, User::Rini, "third")?;
        f.clock.set(1_000);
        f.store.add_comment(&memory.id, User::Yadish, "first")?;
        f.clock.set(2_000);
        f.store.add_comment(&memory.id, User::Rini, "second")?;

        let stored: Vec<_> = COMMENTS
            .load(f.storage.as_ref())
            .into_iter()
            .map(|c| c.text)
            .collect();
        assert_eq!(stored, vec!["third", "first", "second"]);

        let listed: Vec<_> = f
            .store
            .list_comments_for_memory(&memory.id)
            .into_iter()
            .map(|c| (c.created_at, c.text))
            .collect();
        assert_eq!(
            listed,
            vec![
                (1_000, "first".to_owned()),
                (2_000, "second".to_owned()),
                (3_000, "third".to_owned()),
            ]
        );

        Ok(())
    }

    #[test]
    fn it_updates_memories_stamped_at_the_end_of_time() -> Result<()> {
        let f = fixture();

        let mut memory = f.store.create_memory("T", User::Rini, "")?;
        memory.updated_at = Millis::MAX;
        MEMORIES.save(f.storage.as_ref(), &[memory.clone()])?;

        let updated = f.store.update_memory_content(&memory.id, "still here")?.unwrap();

        assert_eq!(updated.updated_at, Millis::MAX);
        assert_eq!(updated.content, "still here");

        Ok(())
    }

    #[test]
    fn it_accepts_comments_on_missing_memories_and_empty_text() -> Result<()> {
        let f = fixture();

        let dangling = MemoryId::new("never-created");
        let comment = f.store.add_comment(&dangling, User::Yadish, "")?;

        assert_eq!(comment.text, "");
        assert_eq!(f.store.list_comments_for_memory(&dangling), vec![comment]);

        Ok(())
    }

    #[test]
    fn it_treats_corrupt_collections_as_empty() -> Result<()> {
        let f = fixture();

        f.storage.set(MEMORIES_KEY, "definitely not json")?;
        f.storage.set(COMMENTS_KEY, "[{\"id\": 3}]")?;

        assert!(f.store.list_memories().is_empty());
        assert!(f.store.list_comments_for_memory(&MemoryId::new("M-0")).is_empty());

        let created = f.store.create_memory("fresh", User::Rini, "")?;
        assert_eq!(f.store.list_memories(), vec![created]);

        Ok(())
    }

    #[test]
    fn it_loses_the_earlier_write_when_cycles_interleave() -> Result<()> {
        let f = fixture();

        let a = f.store.create_memory("a", User::Rini, "")?;
        let b = f.store.create_memory("b", User::Yadish, "")?;

        // A second handle read the collection before our update landed.
        let stale = MEMORIES.load(f.storage.as_ref());

        f.store.update_memory_content(&a.id, "from a")?;

        let mut stale = stale;
        stale
            .iter_mut()
            .filter(|m| m.id == b.id)
            .for_each(|m| m.content = "from b".to_owned());
        MEMORIES.save(f.storage.as_ref(), &stale)?;

        assert_eq!(f.store.get_memory(&a.id).unwrap().content, "");
        assert_eq!(f.store.get_memory(&b.id).unwrap().content, "from b");

        Ok(())
    }

    #[test]
    fn it_persists_memories_in_the_documented_layout() -> Result<()> {
        let f = fixture();

        let memory = f.store.create_memory("Market", User::Rini, "<p>mangoes</p>")?;
        f.clock.advance(250);
        f.store.save_version(&memory.id)?;
        f.clock.advance(250);
        f.store.add_comment(&memory.id, User::Yadish, "hi")?;

        #[derive(Serialize)]
        struct Layout {
            memories: Vec<Memory>,
            comments: Vec<Comment>,
        }

        let layout = Layout {
            memories: serde_json::from_str(&f.storage.get(MEMORIES_KEY)?.unwrap())?,
            comments: serde_json::from_str(&f.storage.get(COMMENTS_KEY)?.unwrap())?,
        };

        insta::assert_json_snapshot!(layout);

        Ok(())
    }

    struct ReadOnlyStorage {
        inner: Rc<InMemoryStorage>,
    }

    impl Storage for ReadOnlyStorage {
        fn get(&self, key: &str) -> Result<Option<String>> {
            self.inner.get(key)
        }

        fn set(&self, _key: &str, _serialized: &str) -> Result<()> {
            Err(anyhow!("quota exceeded"))
        }

        fn query_all(&self) -> Result<Vec<crate::storage::PersistedEntry>> {
            self.inner.query_all()
        }
    }

    #[test]
    fn it_reports_failed_writes_without_changing_stored_state() -> Result<()> {
        let f = fixture();

        let memory = f.store.create_memory("T", User::Rini, "kept")?;

        let read_only = Store::new(
            Rc::new(ReadOnlyStorage {
                inner: f.storage.clone(),
            }),
            Keys::deterministic(),
            f.clock.clone(),
        );

        assert!(read_only.update_memory_content(&memory.id, "lost").is_err());
        assert!(read_only.save_version(&memory.id).is_err());
        assert!(read_only.add_comment(&memory.id, User::Rini, "lost").is_err());

        let loaded = read_only.get_memory(&memory.id).unwrap();
        assert_eq!(loaded.content, "kept");
        assert!(loaded.versions.is_empty());
        assert!(read_only.list_comments_for_memory(&memory.id).is_empty());

        Ok(())
    }
}
