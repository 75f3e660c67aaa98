//! Schema creation and `user_version` migrations.

use rusqlite::{Connection, Result};

const SCHEMA_VERSION: i64 = 2;

pub(super) fn initialize(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "PRAGMA foreign_keys = ON;
         PRAGMA journal_mode = WAL;
         PRAGMA synchronous = NORMAL;",
    )?;

    let mut version: i64 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;

    if version < 1 {
        apply_migration_1(conn)?;
        version = 1;
        conn.pragma_update(None, "user_version", version)?;
    }

    if version < 2 {
        apply_migration_2(conn)?;
        version = 2;
        conn.pragma_update(None, "user_version", version)?;
    }

    if version > SCHEMA_VERSION {
        log::warn!("snapshot store has schema version {version}, newer than {SCHEMA_VERSION}");
    }

    Ok(())
}

fn apply_migration_1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS entries (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            timestamp TEXT NOT NULL,
            timestamp_us INTEGER NOT NULL,
            root_path TEXT NOT NULL,
            total_files INTEGER NOT NULL DEFAULT 0,
            total_dirs INTEGER NOT NULL DEFAULT 0,
            max_depth INTEGER NOT NULL DEFAULT 0,
            naming_violations INTEGER NOT NULL DEFAULT 0,
            forbidden_hits INTEGER NOT NULL DEFAULT 0,
            oversized_files INTEGER NOT NULL DEFAULT 0,
            score REAL NOT NULL DEFAULT 0,
            depth_score REAL NOT NULL DEFAULT 0,
            naming_score REAL NOT NULL DEFAULT 0,
            forbidden_score REAL NOT NULL DEFAULT 0,
            oversized_score REAL NOT NULL DEFAULT 0,
            density_score REAL NOT NULL DEFAULT 0,
            snapshot_json TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_entries_timestamp ON entries(timestamp_us);

        CREATE TABLE IF NOT EXISTS entry_reports (
            entry_id INTEGER PRIMARY KEY REFERENCES entries(id),
            created_at TEXT NOT NULL,
            narrative TEXT NOT NULL,
            alert INTEGER NOT NULL DEFAULT 0,
            degraded INTEGER NOT NULL DEFAULT 0
        );
        ",
    )
}

// Vectors carry no foreign key: the index is a rebuildable cache and
// reconciliation prunes rows whose entry is gone.
fn apply_migration_2(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS entry_vectors (
            entry_id INTEGER PRIMARY KEY,
            dimensions INTEGER NOT NULL,
            vector BLOB NOT NULL
        );
        ",
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initialize_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        initialize(&conn).unwrap();
        let version: i64 = conn.pragma_query_value(None, "user_version", |row| row.get(0)).unwrap();
        assert_eq!(version, SCHEMA_VERSION);
    }
}
