use anyhow::{Context, Result};
use rusqlite::Connection;
use std::path::Path;

type Migration = fn(&Connection) -> rusqlite::Result<()>;

/// Ordered schema migrations. The stored `user_version` pragma records how
/// many have run; never reorder or edit an entry that has shipped.
const MIGRATIONS: &[Migration] = &[migrate_initial_schema, migrate_visible_counts];

fn migrate_initial_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS indexed_files (
            path TEXT PRIMARY KEY,
            mtime INTEGER NOT NULL,
            session_id TEXT NOT NULL,
            project_path TEXT NOT NULL
        );

        CREATE VIRTUAL TABLE IF NOT EXISTS messages_fts USING fts5(
            content,
            session_id,
            project_path,
            message_uuid,
            user_type,
            timestamp
        );

        CREATE TABLE IF NOT EXISTS summaries (
            id TEXT PRIMARY KEY,
            type TEXT NOT NULL,
            target_id TEXT NOT NULL,
            project_path TEXT NOT NULL,
            content TEXT NOT NULL,
            created_at INTEGER NOT NULL,
            message_count INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_summaries_lookup
            ON summaries(type, target_id, project_path);
        ",
    )
}

/// Adds the derived list-view columns. Clearing the indexed data here forces
/// the next sync to rebuild it with the counts populated; stale derived data
/// would otherwise survive indefinitely for unchanged files.
fn migrate_visible_counts(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "
        ALTER TABLE indexed_files ADD COLUMN visible_message_count INTEGER NOT NULL DEFAULT 0;
        ALTER TABLE indexed_files ADD COLUMN first_message TEXT NOT NULL DEFAULT '';
        DELETE FROM indexed_files;
        DELETE FROM messages_fts;
        ",
    )
}

fn run_migrations(conn: &mut Connection) -> Result<()> {
    let current: i64 = conn
        .pragma_query_value(None, "user_version", |row| row.get(0))
        .context("Failed to read schema version")?;

    for (i, migration) in MIGRATIONS.iter().enumerate().skip(current as usize) {
        let tx = conn
            .transaction()
            .context("Failed to start migration transaction")?;
        migration(&tx).with_context(|| format!("Migration {} failed", i + 1))?;
        tx.pragma_update(None, "user_version", i as i64 + 1)
            .context("Failed to advance schema version")?;
        tx.commit()
            .with_context(|| format!("Failed to commit migration {}", i + 1))?;
    }

    Ok(())
}

pub fn open_db(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
    }
    let mut conn = Connection::open(path)
        .with_context(|| format!("Failed to open database at {}", path.display()))?;
    conn.execute_batch("PRAGMA journal_mode=WAL;")?;
    run_migrations(&mut conn)?;
    Ok(conn)
}

pub fn open_in_memory() -> Result<Connection> {
    let mut conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
    run_migrations(&mut conn)?;
    Ok(conn)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_run_to_latest() {
        let conn = open_in_memory().unwrap();
        let version: i64 = conn
            .pragma_query_value(None, "user_version", |row| row.get(0))
            .unwrap();
        assert_eq!(version, MIGRATIONS.len() as i64);
    }

    #[test]
    fn test_migrations_are_idempotent_across_opens() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("index.db");
        drop(open_db(&path).unwrap());
        let conn = open_db(&path).unwrap();

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM indexed_files", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }
}
