use anyhow::{anyhow, Context, Result};
use rusqlite::{Connection, OpenFlags, OptionalExtension};
use std::{rc::Rc, sync::Mutex};
use tracing::*;

use engine::storage::{PersistedEntry, Storage, StorageFactory};

pub const MEMORY_SPECIAL: &str = ":memory:";

pub struct SqliteStorage<C>
where
    C: AsConnection,
{
    conn: C,
}

enum SetupQuery {
    Execute(&'static str),
    Query(&'static str),
}

pub trait AsConnection {
    fn connection(&self) -> &Connection;
}

pub trait Migrate {
    fn migrate(&self) -> Result<()>;
}

impl Migrate for Connection {
    fn migrate(&self) -> Result<()> {
        let exec = |query: SetupQuery| -> Result<()> {
            match query {
                SetupQuery::Execute(sql) => {
                    let mut stmt = self.prepare(sql)?;
                    stmt.execute([])?;
                }
                SetupQuery::Query(sql) => {
                    let mut stmt = self.prepare(sql)?;
                    let _ = stmt.query([])?;
                }
            };
            Ok(())
        };

        exec(SetupQuery::Query("PRAGMA journal_mode = WAL"))?;

        exec(SetupQuery::Execute(
            r#"
                CREATE TABLE IF NOT EXISTS entries (
                    key TEXT NOT NULL PRIMARY KEY,
                    serialized TEXT NOT NULL
                )"#,
        ))?;

        Ok(())
    }
}

struct Owned {
    conn: Connection,
}

impl Owned {
    fn new(uri: &str) -> Result<Self> {
        let conn = Connection::open_with_flags(
            uri,
            OpenFlags::SQLITE_OPEN_URI
                | OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE,
        )
        .with_context(|| format!("opening {}", uri))?;

        Ok(Self { conn })
    }
}

impl AsConnection for Owned {
    fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl<C> SqliteStorage<C>
where
    C: AsConnection,
{
    pub fn wrap(conn: C) -> Result<Rc<Self>> {
        Ok(Rc::new(Self { conn }))
    }

    fn connection(&self) -> &Connection {
        self.conn.connection()
    }
}

impl<C> Storage for SqliteStorage<C>
where
    C: AsConnection,
{
    fn get(&self, key: &str) -> Result<Option<String>> {
        trace!(%key, "querying");

        let mut stmt = self
            .connection()
            .prepare("SELECT serialized FROM entries WHERE key = ?1")?;

        Ok(stmt.query_row([key], |row| row.get(0)).optional()?)
    }

    fn set(&self, key: &str, serialized: &str) -> Result<()> {
        debug!(%key, bytes = serialized.len(), "saving");

        let mut stmt = self.connection().prepare(
            "INSERT INTO entries (key, serialized) VALUES (?1, ?2) ON CONFLICT(key) DO UPDATE SET serialized = excluded.serialized",
        )?;

        let affected = stmt
            .execute((key, serialized))
            .with_context(|| format!("saving '{}'", key))?;

        if affected != 1 {
            Err(anyhow!("no rows affected by save"))
        } else {
            Ok(())
        }
    }

    fn query_all(&self) -> Result<Vec<PersistedEntry>> {
        let mut stmt = self
            .connection()
            .prepare("SELECT key, serialized FROM entries ORDER BY key")?;

        let entries = stmt.query_map([], |row| {
            Ok(PersistedEntry {
                key: row.get(0)?,
                serialized: row.get(1)?,
            })
        })?;

        entries.into_iter().map(|v| Ok(v?)).collect::<Result<_>>()
    }
}

struct InMemoryKeepAlive {
    _connection: Mutex<Connection>,
    url: String,
}

impl InMemoryKeepAlive {
    fn new(id: &str) -> Result<Self> {
        let url = format!("file:keepsake-{}?mode=memory&cache=shared", id);
        Ok(Self {
            _connection: Mutex::new(Connection::open_with_flags(
                &url,
                OpenFlags::SQLITE_OPEN_URI | OpenFlags::SQLITE_OPEN_READ_WRITE,
            )?),
            url,
        })
    }
}

pub struct Factory {
    uri: String,
    _id: String,
    _keep_alive: Option<InMemoryKeepAlive>,
}

impl Factory {
    pub fn new(path: &str) -> Result<Self> {
        let id = nanoid::nanoid!();
        let (keep_alive, uri) = if path == MEMORY_SPECIAL {
            let keep_alive = InMemoryKeepAlive::new(&id)?;
            let uri = keep_alive.url.to_owned();
            (Some(keep_alive), uri)
        } else {
            (None, format!("file:{}", path))
        };

        Ok(Factory {
            uri,
            _id: id,
            _keep_alive: keep_alive,
        })
    }
}

impl StorageFactory for Factory {
    fn migrate(&self) -> Result<()> {
        let conn = Owned::new(&self.uri)?;
        conn.connection().migrate()
    }

    fn create_storage(&self) -> Result<Rc<dyn Storage>> {
        Ok(SqliteStorage::wrap(Owned::new(&self.uri)?)?)
    }
}
