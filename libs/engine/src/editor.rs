use tracing::*;

use crate::{autosave::AutosaveTimer, session::SessionPolicy, store::Store};
use kernel::{Comment, DomainError, Memory, MemoryId, MemoryVersion, Millis, User, VersionId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Editable,
    ReadOnly,
}

/// Only a memory's author may change it.
pub fn access(memory: &Memory, active: User) -> Access {
    if memory.is_owned_by(active) {
        Access::Editable
    } else {
        Access::ReadOnly
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Autosave {
    NotOwner,
    Unchanged,
    Saved(Memory),
    Missing,
}

/// A memory opened for viewing or editing: the cached record, the live
/// editing buffer and the discussion around it.
///
/// The cache is a copy. It's kept in step by applying the same mutations
/// locally after the store accepts them.
#[derive(Debug, Clone)]
pub struct OpenMemory {
    memory: Memory,
    buffer: String,
    persisted: String,
    comments: Vec<Comment>,
}

impl OpenMemory {
    pub fn open(store: &Store, id: &MemoryId) -> Option<Self> {
        let memory = store.get_memory(id)?;
        let comments = store.list_comments_for_memory(id);

        debug!(%memory.id, comments = comments.len(), "open");

        Some(Self {
            buffer: memory.content.clone(),
            persisted: memory.content.clone(),
            memory,
            comments,
        })
    }

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    pub fn comments(&self) -> &[Comment] {
        &self.comments
    }

    pub fn access(&self, session: &SessionPolicy) -> Access {
        access(&self.memory, session.current())
    }

    /// True when the buffer holds something autosave hasn't written yet.
    pub fn is_dirty(&self) -> bool {
        self.buffer != self.persisted
    }

    fn require_owner(&self, session: &SessionPolicy) -> Result<(), DomainError> {
        let active = session.current();
        match access(&self.memory, active) {
            Access::Editable => Ok(()),
            Access::ReadOnly => Err(DomainError::ReadOnly {
                memory: self.memory.id.clone(),
                author: self.memory.author,
                active,
            }),
        }
    }

    pub fn edit(&mut self, session: &SessionPolicy, text: &str) -> Result<(), DomainError> {
        self.require_owner(session)?;

        self.buffer = text.to_owned();

        Ok(())
    }

    /// Writes the buffer if it differs from what was last persisted. Never
    /// writes on behalf of anyone but the author.
    pub fn autosave(
        &mut self,
        store: &Store,
        session: &SessionPolicy,
    ) -> Result<Autosave, DomainError> {
        if self.access(session) != Access::Editable {
            return Ok(Autosave::NotOwner);
        }

        if !self.is_dirty() {
            return Ok(Autosave::Unchanged);
        }

        match store.update_memory_content(&self.memory.id, &self.buffer)? {
            Some(updated) => {
                info!(%updated.id, updated_at = updated.updated_at, "autosave:saved");
                self.persisted = updated.content.clone();
                self.memory.content = updated.content.clone();
                self.memory.updated_at = updated.updated_at;
                Ok(Autosave::Saved(updated))
            }
            None => {
                warn!(memory = %self.memory.id, "autosave:missing");
                Ok(Autosave::Missing)
            }
        }
    }

    /// Flushes the buffer and then snapshots it, so the version always holds
    /// the latest edits. An empty buffer saves nothing.
    pub fn save_version(
        &mut self,
        store: &Store,
        session: &SessionPolicy,
    ) -> Result<Option<MemoryVersion>, DomainError> {
        self.require_owner(session)?;

        if self.buffer.is_empty() {
            return Ok(None);
        }

        let Some(flushed) = store.update_memory_content(&self.memory.id, &self.buffer)? else {
            return Ok(None);
        };

        self.persisted = flushed.content.clone();
        self.memory.content = flushed.content;
        self.memory.updated_at = flushed.updated_at;

        let version = store.save_version(&self.memory.id)?;
        if let Some(version) = &version {
            self.memory.versions.push(version.clone());
        }

        Ok(version)
    }

    /// Loads a historical version into the buffer for preview. Nothing is
    /// written, the restored content is persisted by the next autosave or
    /// manual save.
    pub fn restore(&mut self, version: &VersionId) -> Result<&MemoryVersion, DomainError> {
        let Some(index) = self.memory.versions.iter().position(|v| &v.id == version) else {
            return Err(DomainError::NoSuchVersion(
                self.memory.id.clone(),
                version.clone(),
            ));
        };

        debug!(memory = %self.memory.id, %version, "restore");

        let content = self.memory.versions[index].content.clone();
        self.buffer = content.clone();
        self.memory.content = content;

        Ok(&self.memory.versions[index])
    }

    pub fn rename(
        &mut self,
        store: &Store,
        session: &SessionPolicy,
        title: &str,
    ) -> Result<Option<Memory>, DomainError> {
        self.require_owner(session)?;

        let updated = store.update_memory_title(&self.memory.id, title)?;
        if let Some(updated) = &updated {
            self.memory.title = updated.title.clone();
            self.memory.updated_at = updated.updated_at;
        }

        Ok(updated)
    }

    /// Anyone may comment, but there has to be something to say.
    pub fn post_comment(
        &mut self,
        store: &Store,
        session: &SessionPolicy,
        text: &str,
    ) -> Result<Comment, DomainError> {
        if text.trim().is_empty() {
            return Err(DomainError::EmptyComment);
        }

        let comment = store.add_comment(&self.memory.id, session.current(), text)?;

        self.comments.push(comment.clone());

        Ok(comment)
    }
}

/// An open memory together with its autosave timer.
#[derive(Debug)]
pub struct Editor {
    open: OpenMemory,
    timer: AutosaveTimer,
}

impl Editor {
    pub fn new(open: OpenMemory, timer: AutosaveTimer) -> Self {
        Self { open, timer }
    }

    pub fn open(&self) -> &OpenMemory {
        &self.open
    }

    pub fn open_mut(&mut self) -> &mut OpenMemory {
        &mut self.open
    }

    pub fn timer(&self) -> &AutosaveTimer {
        &self.timer
    }

    /// Syncs the timer with the current record and user, then autosaves if
    /// an interval has elapsed.
    pub fn tick(
        &mut self,
        store: &Store,
        session: &SessionPolicy,
        now: Millis,
    ) -> Result<Option<Autosave>, DomainError> {
        self.timer.sync(self.open.memory(), session.current(), now);

        if !self.timer.poll(now) {
            return Ok(None);
        }

        let saved = self.open.autosave(store, session)?;

        // The saved record is a new dependency.
        self.timer.sync(self.open.memory(), session.current(), now);

        Ok(Some(saved))
    }

    pub fn close(mut self) -> OpenMemory {
        self.timer.cancel();
        self.open
    }
}
