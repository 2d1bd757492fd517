use anyhow::Result;
use clap::Args;

use crate::{open_memory, text};
use engine::{Autosave, Domain};
use kernel::{MemoryId, VersionId};

#[derive(Debug, Args, Clone)]
pub struct SaveCommand {
    id: String,
    /// Replace the content before taking the snapshot.
    #[arg(short, long)]
    content: Option<String>,
}

pub fn save(domain: &Domain, cmd: &SaveCommand) -> Result<()> {
    let store = domain.open_store()?;
    let session = domain.open_session_policy()?;
    let mut open = open_memory(&store, &MemoryId::new(&cmd.id))?;

    if let Some(content) = &cmd.content {
        open.edit(&session, content)?;
    }

    match open.save_version(&store, &session)? {
        Some(version) => println!("{}", text::version_line(&version)),
        None => println!("nothing to save"),
    }

    Ok(())
}

#[derive(Debug, Args, Clone)]
pub struct ListCommand {
    id: String,
}

/// Newest first.
pub fn list(domain: &Domain, cmd: &ListCommand) -> Result<()> {
    let store = domain.open_store()?;
    let open = open_memory(&store, &MemoryId::new(&cmd.id))?;

    for version in open.memory().history() {
        println!("{}", text::version_line(version));
    }

    Ok(())
}

#[derive(Debug, Args, Clone)]
pub struct RestoreCommand {
    id: String,
    version: String,
    /// Persist the restored content right away, as the next autosave would.
    #[arg(long)]
    commit: bool,
}

pub fn restore(domain: &Domain, cmd: &RestoreCommand) -> Result<()> {
    let store = domain.open_store()?;
    let session = domain.open_session_policy()?;
    let mut open = open_memory(&store, &MemoryId::new(&cmd.id))?;

    open.restore(&VersionId::new(&cmd.version))?;

    if cmd.commit {
        match open.autosave(&store, &session)? {
            Autosave::Saved(_) => println!("restored"),
            Autosave::Unchanged => println!("already current"),
            Autosave::NotOwner => println!("read only, restored content was not saved"),
            Autosave::Missing => println!("memory disappeared"),
        }
    } else {
        println!(
            "{}",
            text::memory_detail(open.memory(), open.access(&session), open.buffer())
        );
    }

    Ok(())
}
