use std::fmt::Write;

use engine::{clock::to_utc_time, Access};
use kernel::{Comment, Memory, MemoryVersion, Millis};

pub fn format_time(millis: Millis) -> String {
    match to_utc_time(millis) {
        Some(time) => time.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => format!("@{}", millis),
    }
}

pub fn memory_line(memory: &Memory) -> String {
    format!(
        "{}  {:<24}  {:<6}  {}  ({} versions)",
        memory.id,
        memory.display_title(),
        memory.author,
        format_time(memory.updated_at),
        memory.versions.len()
    )
}

pub fn memory_detail(memory: &Memory, access: Access, buffer: &str) -> String {
    let mode = match access {
        Access::Editable => "EDIT MODE",
        Access::ReadOnly => "READ ONLY",
    };

    let mut out = String::new();
    let _ = writeln!(out, "{} [{}]", memory.display_title(), mode);
    let _ = writeln!(out, "id:       {}", memory.id);
    let _ = writeln!(out, "author:   {}", memory.author);
    let _ = writeln!(out, "created:  {}", format_time(memory.created_at));
    let _ = writeln!(out, "updated:  {}", format_time(memory.updated_at));
    let _ = writeln!(out, "versions: {}", memory.versions.len());
    let _ = writeln!(out);
    let _ = write!(out, "{}", buffer);
    out
}

pub fn version_line(version: &MemoryVersion) -> String {
    format!(
        "{}  {}  {} bytes",
        version.id,
        format_time(version.saved_at),
        version.content.len()
    )
}

pub fn comment_line(comment: &Comment) -> String {
    format!(
        "[{}] {}: {}",
        format_time(comment.created_at),
        comment.author,
        comment.text
    )
}
