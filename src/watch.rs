use anyhow::Result;
use clap::Args;
use std::{path::PathBuf, time::Duration};
use tracing::*;

use crate::open_memory;
use engine::{
    clock::Clock, Access, Autosave, AutosaveTimer, Domain, Editor, OpenMemory, Store,
};
use kernel::{MemoryId, Millis};

const POLL_INTERVAL: Duration = Duration::from_millis(250);

#[derive(Debug, Args, Clone)]
pub struct Command {
    id: String,
    /// Plain text file standing in for the editing surface.
    file: PathBuf,
    /// Seconds between autosaves, at most a day.
    #[arg(long, default_value_t = 5, value_parser = clap::value_parser!(u64).range(1..=86_400))]
    interval_secs: u64,
}

/// Mirrors a file into an open memory's buffer and lets the autosave timer
/// decide when to persist it.
pub struct Watch {
    editor: Editor,
    file: PathBuf,
}

impl Watch {
    pub fn new(open: OpenMemory, interval: Duration, file: PathBuf) -> Self {
        Self {
            editor: Editor::new(open, AutosaveTimer::new(interval)),
            file,
        }
    }

    pub fn editor(&self) -> &Editor {
        &self.editor
    }

    /// The active user is read again on every step, so switching in another
    /// shell takes effect here too.
    pub fn step(
        &mut self,
        domain: &Domain,
        store: &Store,
        now: Millis,
    ) -> Result<Option<Autosave>> {
        let session = domain.open_session_policy()?;
        let open = self.editor.open_mut();

        if open.access(&session) == Access::Editable {
            match std::fs::read_to_string(&self.file) {
                Ok(text) if text != open.buffer() => open.edit(&session, &text)?,
                Ok(_) => {}
                Err(e) => warn!(file = ?self.file, "watch:unreadable {:?}", e),
            }
        }

        Ok(self.editor.tick(store, &session, now)?)
    }

    pub fn close(self) -> OpenMemory {
        self.editor.close()
    }
}

/// Steps once and reports how it went. A failed step leaves the buffer dirty
/// for the next one to retry. False once there's nothing left to watch.
fn on_tick(watch: &mut Watch, domain: &Domain, store: &Store, now: Millis) -> bool {
    match watch.step(domain, store, now) {
        Ok(Some(Autosave::Saved(memory))) => {
            println!("saved {}", memory.id);
            true
        }
        Ok(Some(Autosave::Missing)) => {
            println!("memory no longer exists");
            false
        }
        Ok(_) => true,
        Err(e) => {
            warn!(memory = %watch.editor().open().memory().id, "watch:failed {:?}", e);
            true
        }
    }
}

#[tokio::main(flavor = "current_thread")]
pub async fn execute_command(domain: &Domain, cmd: &Command) -> Result<()> {
    let store = domain.open_store()?;
    let open = open_memory(&store, &MemoryId::new(&cmd.id))?;
    let mut watch = Watch::new(open, Duration::from_secs(cmd.interval_secs), cmd.file.clone());

    info!(id = %cmd.id, file = ?cmd.file, "watching");

    let mut ticks = tokio::time::interval(POLL_INTERVAL);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = ticks.tick() => {
                if !on_tick(&mut watch, domain, &store, domain.clock().now()) {
                    break;
                }
            }
            _ = &mut ctrl_c => break,
        }
    }

    let open = watch.close();
    if open.is_dirty() {
        warn!(memory = %open.memory().id, "watch:unsaved");
    }

    Ok(())
}
