use anyhow::Result;
use clap::Args;
use tracing::*;

use crate::{open_memory, text};
use engine::Domain;
use kernel::{MemoryId, User, UNTITLED};

#[derive(Debug, Args, Clone)]
pub struct ListCommand {
    #[arg(short, long)]
    author: Option<User>,
}

pub fn list(domain: &Domain, cmd: &ListCommand) -> Result<()> {
    let store = domain.open_store()?;

    let memories = match cmd.author {
        Some(author) => store.list_memories_by_author(author),
        None => store.list_memories(),
    };

    for memory in &memories {
        println!("{}", text::memory_line(memory));
    }

    Ok(())
}

#[derive(Debug, Args, Clone)]
pub struct CreateCommand {
    #[arg(short, long, default_value = UNTITLED)]
    title: String,
    #[arg(short, long, default_value = "")]
    content: String,
}

/// New memories belong to whoever is acting.
pub fn create(domain: &Domain, cmd: &CreateCommand) -> Result<()> {
    let store = domain.open_store()?;
    let session = domain.open_session_policy()?;

    let memory = store.create_memory(&cmd.title, session.current(), &cmd.content)?;

    println!("{}", memory.id);

    Ok(())
}

#[derive(Debug, Args, Clone)]
pub struct ShowCommand {
    id: String,
}

pub fn show(domain: &Domain, cmd: &ShowCommand) -> Result<()> {
    let store = domain.open_store()?;
    let session = domain.open_session_policy()?;
    let open = open_memory(&store, &MemoryId::new(&cmd.id))?;

    println!(
        "{}",
        text::memory_detail(open.memory(), open.access(&session), open.buffer())
    );

    Ok(())
}

#[derive(Debug, Args, Clone)]
pub struct EditCommand {
    id: String,
    content: String,
}

/// Replaces the content, as if typed and left for autosave to pick up.
pub fn edit(domain: &Domain, cmd: &EditCommand) -> Result<()> {
    let store = domain.open_store()?;
    let session = domain.open_session_policy()?;
    let mut open = open_memory(&store, &MemoryId::new(&cmd.id))?;

    open.edit(&session, &cmd.content)?;

    let saved = open.autosave(&store, &session)?;

    info!(id = %cmd.id, ?saved, "edit");

    Ok(())
}

#[derive(Debug, Args, Clone)]
pub struct TitleCommand {
    id: String,
    title: String,
}

pub fn title(domain: &Domain, cmd: &TitleCommand) -> Result<()> {
    let store = domain.open_store()?;
    let session = domain.open_session_policy()?;
    let mut open = open_memory(&store, &MemoryId::new(&cmd.id))?;

    open.rename(&store, &session, &cmd.title)?;

    println!("{}", text::memory_line(open.memory()));

    Ok(())
}
