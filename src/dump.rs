use std::io::{self, Write};

use anyhow::Result;
use clap::Args;

use engine::Domain;

#[derive(Debug, Args, Clone)]
pub struct Command {
    /// Raw stored values, one per line, instead of a JSON array.
    #[arg(short, long)]
    lines: bool,
}

pub fn execute_command(domain: &Domain, cmd: &Command) -> Result<()> {
    let entries = domain.query_all()?;
    let mut stdout = io::stdout();

    if cmd.lines {
        for entry in entries {
            stdout.write_all(entry.key.as_bytes())?;
            stdout.write_all(b"\t")?;
            stdout.write_all(entry.serialized.as_bytes())?;
            stdout.write_all(b"\n")?;
        }
    } else {
        let entries = entries
            .into_iter()
            .map(|e| Ok((e.key.clone(), e.to_json_value()?)))
            .collect::<Result<serde_json::Map<_, _>>>()?;
        stdout.write_all(&serde_json::to_vec_pretty(&entries)?)?;
        stdout.write_all(b"\n")?;
    }

    Ok(())
}
