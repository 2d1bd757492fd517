use anyhow::Result;
use clap::Args;

use crate::{open_memory, text};
use engine::Domain;
use kernel::MemoryId;

#[derive(Debug, Args, Clone)]
pub struct PostCommand {
    id: String,
    text: String,
}

pub fn post(domain: &Domain, cmd: &PostCommand) -> Result<()> {
    let store = domain.open_store()?;
    let session = domain.open_session_policy()?;
    let mut open = open_memory(&store, &MemoryId::new(&cmd.id))?;

    let comment = open.post_comment(&store, &session, &cmd.text)?;

    println!("{}", text::comment_line(&comment));

    Ok(())
}

#[derive(Debug, Args, Clone)]
pub struct ListCommand {
    id: String,
}

pub fn list(domain: &Domain, cmd: &ListCommand) -> Result<()> {
    let store = domain.open_store()?;

    for comment in store.list_comments_for_memory(&MemoryId::new(&cmd.id)) {
        println!("{}", text::comment_line(&comment));
    }

    Ok(())
}
