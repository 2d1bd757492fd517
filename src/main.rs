use anyhow::Result;
use clap::{Parser, Subcommand};
use std::{
    error::Error,
    path::{Path, PathBuf},
    sync::Arc,
};
use tracing::*;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use engine::{clock::SystemClock, sequences::Keys, Domain, OpenMemory, Store};
use kernel::MemoryId;

mod comments;
mod dump;
mod memories;
mod text;
mod users;
mod versions;
mod watch;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[arg(
        short,
        long,
        value_name = "FILE",
        env = "KEEPSAKE_DB",
        default_value = "keepsake.sqlite3",
        global = true
    )]
    path: PathBuf,
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the active user.
    Whoami,
    /// Act as the other participant from now on.
    Switch(users::SwitchCommand),
    List(memories::ListCommand),
    Create(memories::CreateCommand),
    Show(memories::ShowCommand),
    Edit(memories::EditCommand),
    Title(memories::TitleCommand),
    /// Snapshot the current content as a new version.
    Version(versions::SaveCommand),
    Versions(versions::ListCommand),
    Restore(versions::RestoreCommand),
    Comment(comments::PostCommand),
    Comments(comments::ListCommand),
    Dump(dump::Command),
    /// Keep a memory open, autosaving edits made to a file.
    Watch(watch::Command),
}

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("No memory with id '{0}'")]
    NoSuchMemory(MemoryId),
}

pub fn open_memory(store: &Store, id: &MemoryId) -> Result<OpenMemory> {
    OpenMemory::open(store, id).ok_or_else(|| CliError::NoSuchMemory(id.clone()).into())
}

fn get_rust_log(verbose: u8) -> String {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    std::env::var("RUST_LOG")
        .unwrap_or_else(|_| format!("keepsake={},engine={},sqlite={}", level, level, level))
}

fn make_domain(path: &Path) -> Result<Domain> {
    let storage_factory = sqlite::Factory::new(&path.to_string_lossy())?;
    let domain = Domain::new(
        Arc::new(storage_factory),
        Keys::random(),
        Arc::new(SystemClock::default()),
    );

    domain.migrate()?;

    Ok(domain)
}

fn main() -> Result<(), Box<dyn Error>> {
    color_backtrace::install();

    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(get_rust_log(cli.verbose)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!(path = ?cli.path, "initialized, ready");

    let Some(command) = &cli.command else {
        return Ok(());
    };

    let domain = make_domain(&cli.path)?;

    match command {
        Commands::Whoami => Ok(users::whoami(&domain)?),
        Commands::Switch(cmd) => Ok(users::switch(&domain, cmd)?),
        Commands::List(cmd) => Ok(memories::list(&domain, cmd)?),
        Commands::Create(cmd) => Ok(memories::create(&domain, cmd)?),
        Commands::Show(cmd) => Ok(memories::show(&domain, cmd)?),
        Commands::Edit(cmd) => Ok(memories::edit(&domain, cmd)?),
        Commands::Title(cmd) => Ok(memories::title(&domain, cmd)?),
        Commands::Version(cmd) => Ok(versions::save(&domain, cmd)?),
        Commands::Versions(cmd) => Ok(versions::list(&domain, cmd)?),
        Commands::Restore(cmd) => Ok(versions::restore(&domain, cmd)?),
        Commands::Comment(cmd) => Ok(comments::post(&domain, cmd)?),
        Commands::Comments(cmd) => Ok(comments::list(&domain, cmd)?),
        Commands::Dump(cmd) => Ok(dump::execute_command(&domain, cmd)?),
        Commands::Watch(cmd) => Ok(watch::execute_command(&domain, cmd)?),
    }
}
