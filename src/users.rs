use anyhow::Result;
use clap::Args;

use engine::Domain;
use kernel::User;

pub fn whoami(domain: &Domain) -> Result<()> {
    let session = domain.open_session_policy()?;

    println!("{}", session.current());

    Ok(())
}

#[derive(Debug, Args, Clone)]
pub struct SwitchCommand {
    /// Either of the two participants.
    user: User,
}

pub fn switch(domain: &Domain, cmd: &SwitchCommand) -> Result<()> {
    let session = domain.open_session_policy()?;

    session.switch_to(cmd.user)?;

    println!("now acting as {}", session.current());

    Ok(())
}
