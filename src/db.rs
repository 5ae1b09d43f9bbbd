use anyhow::{bail, Context, Result};
use rusqlite::Connection;

/// Bump when `SCHEMA` changes shape.
pub const SCHEMA_VERSION: i64 = 1;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS notes (
    id               INTEGER PRIMARY KEY,
    dir_key          TEXT NOT NULL,
    position         INTEGER NOT NULL,
    message          TEXT NOT NULL CHECK(length(message) BETWEEN 1 AND 255),
    time_of_day      TEXT CHECK(time_of_day IS NULL OR length(time_of_day) = 5),
    interval_minutes INTEGER CHECK(interval_minutes IS NULL OR interval_minutes > 0),
    last_fired       INTEGER NOT NULL DEFAULT 0,
    UNIQUE (dir_key, position)
);
";

fn set_pragmas(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA busy_timeout = 5000;",
    )?;
    Ok(())
}

pub fn open(path: &str) -> Result<Connection> {
    let conn =
        Connection::open(path).with_context(|| format!("failed to open database {path}"))?;
    set_pragmas(&conn)?;
    Ok(conn)
}

/// Create tables (idempotent) and stamp the schema version. Refuses a
/// database written by a newer schema.
pub fn init(conn: &Connection) -> Result<()> {
    let version: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
    if version > SCHEMA_VERSION {
        bail!("database schema version {version} is newer than supported version {SCHEMA_VERSION}");
    }
    conn.execute_batch(SCHEMA)?;
    if version < SCHEMA_VERSION {
        conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
    }
    Ok(())
}

#[cfg(test)]
pub fn open_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory()?;
    set_pragmas(&conn)?;
    init(&conn)?;
    Ok(conn)
}
