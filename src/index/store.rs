use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rusqlite::Connection;

use crate::db::models::{
    IndexStats, IndexedFile, ProjectStats, SearchResult, SessionOverview, Summary, SummaryKind,
    SyncReport,
};
use crate::db::{queries, schema};
use crate::paths::codec::ProjectPathCodec;
use crate::search::engine::{self, SearchOptions};
use crate::transcript::message::{self, MessageKind, TranscriptMessage};
use crate::transcript::scanner::{self, TranscriptFile};

const FIRST_MESSAGE_MAX_CHARS: usize = 500;

/// Persistent full-text index over the transcript tree, plus the derived
/// per-session metadata and the summary cache.
///
/// One instance per process, constructed at startup and passed to whatever
/// consumes it. Mutating operations take `&mut self`, so two syncs on the
/// same instance cannot interleave.
pub struct SearchDb {
    conn: Connection,
    projects_dir: PathBuf,
    codec: ProjectPathCodec,
}

impl SearchDb {
    pub fn open(db_path: &Path, projects_dir: PathBuf) -> Result<Self> {
        Ok(Self {
            conn: schema::open_db(db_path)?,
            projects_dir,
            codec: ProjectPathCodec::new(),
        })
    }

    /// In-memory store over a real projects directory. Used by tests.
    pub fn open_in_memory(projects_dir: PathBuf) -> Result<Self> {
        Ok(Self {
            conn: schema::open_in_memory()?,
            projects_dir,
            codec: ProjectPathCodec::new(),
        })
    }

    pub fn codec(&self) -> &ProjectPathCodec {
        &self.codec
    }

    pub fn projects_dir(&self) -> &Path {
        &self.projects_dir
    }

    /// Reconcile the index against the live file set.
    ///
    /// New files are indexed, files whose mtime moved forward are reindexed
    /// from scratch, unchanged files are not reparsed, and files that
    /// disappeared are dropped. The whole pass is one transaction; readers
    /// see pre-sync or post-sync state, never a mix.
    ///
    /// mtime comparison is best-effort change detection: coarse clocks or
    /// adversarial same-millisecond rewrites can hide a change until the
    /// next touch. Fine for human-paced local edits.
    pub fn sync(&mut self) -> Result<SyncReport> {
        let live_files = scanner::list_transcript_files(&self.projects_dir, &self.codec);

        let tx = self.conn.transaction().context("Failed to begin sync")?;
        let indexed: HashMap<String, i64> = queries::indexed_mtimes(&tx)?;
        let live_paths: HashSet<&str> = live_files
            .iter()
            .filter_map(|f| f.path.to_str())
            .collect();

        let mut report = SyncReport::default();

        for file in &live_files {
            let path = match file.path.to_str() {
                Some(p) => p,
                None => continue,
            };
            match indexed.get(path) {
                None => {
                    index_file(&tx, file)?;
                    report.added += 1;
                }
                Some(&stored_mtime) if stored_mtime < file.mtime => {
                    remove_file(&tx, path)?;
                    index_file(&tx, file)?;
                    report.updated += 1;
                }
                Some(_) => {}
            }
        }

        for path in indexed.keys() {
            if !live_paths.contains(path.as_str()) {
                remove_file(&tx, path)?;
                report.removed += 1;
            }
        }

        tx.commit().context("Failed to commit sync")?;
        Ok(report)
    }

    /// Ranked full-text search. Empty queries return nothing without
    /// touching the index.
    pub fn search(
        &self,
        query: &str,
        limit: Option<usize>,
        project_path: Option<&str>,
    ) -> Result<Vec<SearchResult>> {
        let opts = SearchOptions {
            query: query.to_string(),
            project_path: project_path.map(str::to_string),
            limit: limit.unwrap_or_else(|| SearchOptions::default().limit),
        };
        engine::search(&self.conn, &self.codec, &opts)
    }

    pub fn get_index_stats(&self) -> Result<IndexStats> {
        queries::index_stats(&self.conn)
    }

    /// Per-project session/message counts. An empty store triggers a sync
    /// first, so a fresh install sees data on its first page load.
    pub fn get_project_stats(&mut self) -> Result<HashMap<String, ProjectStats>> {
        if self.get_index_stats()?.file_count == 0 {
            self.sync()?;
        }
        queries::project_stats(&self.conn)
    }

    /// Session list view for one project, most recent first, served entirely
    /// from the index.
    pub fn get_session_summaries_from_db(
        &self,
        encoded_project: &str,
    ) -> Result<Vec<SessionOverview>> {
        queries::session_overviews(&self.conn, encoded_project)
    }

    pub fn get_summary(
        &self,
        kind: SummaryKind,
        target_id: &str,
        project_path: &str,
    ) -> Result<Option<Summary>> {
        queries::get_summary(&self.conn, kind, target_id, project_path)
    }

    /// Upsert a summary under its composite id and return it with the id
    /// filled in. No history is retained.
    pub fn save_summary(&self, mut summary: Summary) -> Result<Summary> {
        let id = Summary::composite_id(summary.kind, &summary.project_path, &summary.target_id);
        queries::upsert_summary(&self.conn, &id, &summary)?;
        summary.id = Some(id);
        Ok(summary)
    }

    pub fn get_session_summaries(&self, encoded_project: &str) -> Result<Vec<Summary>> {
        queries::session_summaries(&self.conn, encoded_project)
    }

    pub fn sessions_needing_summary(
        &self,
        encoded_project: &str,
    ) -> Result<Vec<SessionOverview>> {
        queries::sessions_needing_summary(&self.conn, encoded_project)
    }

    /// Rewrite an encoded project id across the file table, the message
    /// index, and the summary cache in one transaction. Coordinating with
    /// the on-disk rename is the caller's problem.
    pub fn rename_project_in_index(&mut self, old_encoded: &str, new_encoded: &str) -> Result<()> {
        let tx = self.conn.transaction().context("Failed to begin rename")?;
        queries::rename_project(&tx, old_encoded, new_encoded)?;
        tx.commit().context("Failed to commit rename")
    }

    /// Parse one session transcript from disk.
    pub fn load_session_messages(
        &self,
        encoded_project: &str,
        session_id: &str,
    ) -> Vec<TranscriptMessage> {
        let path = self
            .projects_dir
            .join(encoded_project)
            .join(format!("{session_id}.jsonl"));
        message::parse_transcript_file(&path)
    }
}

/// Parse a transcript and insert every visible message plus the file's
/// metadata row. Rows for one file always land together.
fn index_file(conn: &Connection, file: &TranscriptFile) -> Result<()> {
    let messages = message::parse_transcript_file(&file.path);

    let mut visible_count: i64 = 0;
    let mut first_message = String::new();

    for msg in &messages {
        if !message::is_visible(msg) {
            continue;
        }

        let content = message::extract_text(&msg.message.content);
        visible_count += 1;
        if first_message.is_empty() && msg.kind == MessageKind::User {
            first_message = content.chars().take(FIRST_MESSAGE_MAX_CHARS).collect();
        }

        queries::insert_message(
            conn,
            content,
            &file.session_id,
            &file.encoded_project,
            &msg.uuid,
            msg.kind.as_str(),
            msg.timestamp.as_millis(),
        )?;
    }

    queries::upsert_indexed_file(
        conn,
        &IndexedFile {
            path: file.path.to_string_lossy().into_owned(),
            mtime: file.mtime,
            session_id: file.session_id.clone(),
            project_path: file.encoded_project.clone(),
            visible_message_count: visible_count,
            first_message,
        },
    )
}

/// Drop a file's message rows and its metadata row together.
fn remove_file(conn: &Connection, path: &str) -> Result<()> {
    if let Some((session_id, project_path)) = queries::file_identity(conn, path)? {
        queries::delete_file_messages(conn, &session_id, &project_path)?;
        queries::delete_indexed_file(conn, path)?;
    }
    Ok(())
}
