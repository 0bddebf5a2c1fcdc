use std::collections::HashMap;

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};

use super::models::{
    IndexStats, IndexedFile, MessageHit, ProjectStats, SessionOverview, Summary, SummaryKind,
};

pub fn insert_message(
    conn: &Connection,
    content: &str,
    session_id: &str,
    project_path: &str,
    message_uuid: &str,
    user_type: &str,
    timestamp: i64,
) -> Result<()> {
    conn.execute(
        "INSERT INTO messages_fts (content, session_id, project_path, message_uuid, user_type, timestamp)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            content,
            session_id,
            project_path,
            message_uuid,
            user_type,
            timestamp.to_string(),
        ],
    )
    .context("Failed to insert message row")?;
    Ok(())
}

pub fn upsert_indexed_file(conn: &Connection, file: &IndexedFile) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO indexed_files (path, mtime, session_id, project_path, visible_message_count, first_message)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            file.path,
            file.mtime,
            file.session_id,
            file.project_path,
            file.visible_message_count,
            file.first_message,
        ],
    )
    .context("Failed to upsert indexed file")?;
    Ok(())
}

/// path -> stored mtime for every currently indexed file.
pub fn indexed_mtimes(conn: &Connection) -> Result<HashMap<String, i64>> {
    let mut stmt = conn.prepare("SELECT path, mtime FROM indexed_files")?;
    let rows = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<std::result::Result<HashMap<String, i64>, _>>()
        .context("Failed to load indexed file mtimes")?;
    Ok(rows)
}

/// (session_id, project_path) for one indexed path, if present.
pub fn file_identity(conn: &Connection, path: &str) -> Result<Option<(String, String)>> {
    conn.query_row(
        "SELECT session_id, project_path FROM indexed_files WHERE path = ?1",
        params![path],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )
    .optional()
    .context("Failed to look up indexed file")
}

pub fn delete_file_messages(conn: &Connection, session_id: &str, project_path: &str) -> Result<()> {
    conn.execute(
        "DELETE FROM messages_fts WHERE session_id = ?1 AND project_path = ?2",
        params![session_id, project_path],
    )
    .context("Failed to delete message rows")?;
    Ok(())
}

pub fn delete_indexed_file(conn: &Connection, path: &str) -> Result<()> {
    conn.execute("DELETE FROM indexed_files WHERE path = ?1", params![path])
        .context("Failed to delete indexed file")?;
    Ok(())
}

pub fn index_stats(conn: &Connection) -> Result<IndexStats> {
    let file_count: i64 = conn
        .query_row("SELECT COUNT(*) FROM indexed_files", [], |row| row.get(0))
        .context("Failed to count indexed files")?;
    let message_count: i64 = conn
        .query_row("SELECT COUNT(*) FROM messages_fts", [], |row| row.get(0))
        .context("Failed to count indexed messages")?;
    Ok(IndexStats {
        file_count,
        message_count,
    })
}

pub fn project_stats(conn: &Connection) -> Result<HashMap<String, ProjectStats>> {
    let mut stmt = conn.prepare(
        "SELECT project_path, COUNT(*), SUM(visible_message_count)
         FROM indexed_files
         WHERE visible_message_count > 0
         GROUP BY project_path",
    )?;

    let rows = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                ProjectStats {
                    session_count: row.get(1)?,
                    total_messages: row.get(2)?,
                },
            ))
        })?
        .collect::<std::result::Result<HashMap<_, _>, _>>()
        .context("Failed to collect project stats")?;

    Ok(rows)
}

pub fn session_overviews(conn: &Connection, project_path: &str) -> Result<Vec<SessionOverview>> {
    let mut stmt = conn.prepare(
        "SELECT session_id, first_message, visible_message_count, mtime
         FROM indexed_files
         WHERE project_path = ?1 AND visible_message_count > 0 AND first_message != ''
         ORDER BY mtime DESC",
    )?;

    let rows = stmt
        .query_map(params![project_path], |row| {
            Ok(SessionOverview {
                id: row.get(0)?,
                first_message: row.get(1)?,
                message_count: row.get(2)?,
                last_activity: row.get(3)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()
        .context("Failed to collect session overviews")?;

    Ok(rows)
}

/// Ranked FTS matches, best first. `match_query` must already be valid FTS5
/// syntax (see the search engine for construction).
pub fn search_messages(
    conn: &Connection,
    match_query: &str,
    limit: usize,
    project_path: Option<&str>,
) -> Result<Vec<MessageHit>> {
    const COLUMNS: &str = "
        content,
        session_id,
        project_path,
        message_uuid,
        user_type,
        timestamp,
        snippet(messages_fts, 0, '<mark>', '</mark>', '...', 64),
        rank";

    let map_row = |row: &rusqlite::Row<'_>| -> rusqlite::Result<MessageHit> {
        Ok(MessageHit {
            content: row.get(0)?,
            session_id: row.get(1)?,
            project_path: row.get(2)?,
            message_uuid: row.get(3)?,
            user_type: row.get(4)?,
            timestamp: row
                .get::<_, String>(5)?
                .parse::<i64>()
                .unwrap_or(0),
            snippet: row.get(6)?,
            rank: row.get(7)?,
        })
    };

    let results = match project_path {
        Some(project) => {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS}
                 FROM messages_fts
                 WHERE messages_fts MATCH ?1 AND project_path = ?2
                 ORDER BY rank
                 LIMIT ?3"
            ))?;
            let rows = stmt
                .query_map(params![match_query, project, limit as i64], map_row)?
                .collect::<std::result::Result<Vec<_>, _>>();
            rows
        }
        None => {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS}
                 FROM messages_fts
                 WHERE messages_fts MATCH ?1
                 ORDER BY rank
                 LIMIT ?2"
            ))?;
            let rows = stmt
                .query_map(params![match_query, limit as i64], map_row)?
                .collect::<std::result::Result<Vec<_>, _>>();
            rows
        }
    }
    .context("Failed to collect search results")?;

    Ok(results)
}

fn summary_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Summary> {
    let kind: String = row.get(1)?;
    Ok(Summary {
        id: Some(row.get(0)?),
        kind: if kind == "project" {
            SummaryKind::Project
        } else {
            SummaryKind::Session
        },
        target_id: row.get(2)?,
        project_path: row.get(3)?,
        content: row.get(4)?,
        created_at: row.get(5)?,
        message_count: row.get(6)?,
    })
}

pub fn get_summary(
    conn: &Connection,
    kind: SummaryKind,
    target_id: &str,
    project_path: &str,
) -> Result<Option<Summary>> {
    conn.query_row(
        "SELECT id, type, target_id, project_path, content, created_at, message_count
         FROM summaries
         WHERE type = ?1 AND target_id = ?2 AND project_path = ?3",
        params![kind.as_str(), target_id, project_path],
        summary_from_row,
    )
    .optional()
    .context("Failed to look up summary")
}

pub fn upsert_summary(conn: &Connection, id: &str, summary: &Summary) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO summaries (id, type, target_id, project_path, content, created_at, message_count)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            id,
            summary.kind.as_str(),
            summary.target_id,
            summary.project_path,
            summary.content,
            summary.created_at,
            summary.message_count,
        ],
    )
    .context("Failed to upsert summary")?;
    Ok(())
}

/// Cached session-type summaries for one project.
pub fn session_summaries(conn: &Connection, project_path: &str) -> Result<Vec<Summary>> {
    let mut stmt = conn.prepare(
        "SELECT id, type, target_id, project_path, content, created_at, message_count
         FROM summaries
         WHERE type = 'session' AND project_path = ?1
         ORDER BY created_at DESC",
    )?;

    let rows = stmt
        .query_map(params![project_path], summary_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()
        .context("Failed to collect session summaries")?;

    Ok(rows)
}

/// Sessions whose cached summary is missing, or stale because the visible
/// message count moved since generation.
pub fn sessions_needing_summary(
    conn: &Connection,
    project_path: &str,
) -> Result<Vec<SessionOverview>> {
    let mut stmt = conn.prepare(
        "SELECT f.session_id, f.first_message, f.visible_message_count, f.mtime
         FROM indexed_files f
         LEFT JOIN summaries s
           ON s.type = 'session'
          AND s.project_path = f.project_path
          AND s.target_id = f.session_id
         WHERE f.project_path = ?1
           AND f.visible_message_count > 0
           AND (s.id IS NULL OR s.message_count != f.visible_message_count)
         ORDER BY f.mtime DESC",
    )?;

    let rows = stmt
        .query_map(params![project_path], |row| {
            Ok(SessionOverview {
                id: row.get(0)?,
                first_message: row.get(1)?,
                message_count: row.get(2)?,
                last_activity: row.get(3)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()
        .context("Failed to collect sessions needing summary")?;

    Ok(rows)
}

/// Rewrites the encoded project id everywhere it is stored, including the
/// composite summary ids that embed it. Callers wrap this in a transaction.
pub fn rename_project(conn: &Connection, old_path: &str, new_path: &str) -> Result<()> {
    conn.execute(
        "UPDATE indexed_files SET project_path = ?1 WHERE project_path = ?2",
        params![new_path, old_path],
    )
    .context("Failed to rename project in file table")?;

    conn.execute(
        "UPDATE messages_fts SET project_path = ?1 WHERE project_path = ?2",
        params![new_path, old_path],
    )
    .context("Failed to rename project in message index")?;

    conn.execute(
        "UPDATE summaries SET project_path = ?1, id = REPLACE(id, ?2, ?1) WHERE project_path = ?2",
        params![new_path, old_path],
    )
    .context("Failed to rename project in summaries")?;

    Ok(())
}
