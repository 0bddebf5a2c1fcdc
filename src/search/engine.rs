use anyhow::Result;
use rusqlite::Connection;

use crate::db::models::SearchResult;
use crate::db::queries;
use crate::paths::codec::{self, ProjectPathCodec};

pub struct SearchOptions {
    pub query: String,
    /// Encoded project id to restrict results to.
    pub project_path: Option<String>,
    pub limit: usize,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            query: String::new(),
            project_path: None,
            limit: 50,
        }
    }
}

/// Ranked full-text search over indexed messages.
///
/// Whitespace-split terms become quoted prefix tokens, implicitly ANDed, so
/// multi-word queries favor precision over recall. An unknown project filter
/// yields an empty list, not an error.
pub fn search(
    conn: &Connection,
    paths: &ProjectPathCodec,
    opts: &SearchOptions,
) -> Result<Vec<SearchResult>> {
    let Some(match_query) = build_match_query(&opts.query) else {
        return Ok(Vec::new());
    };

    let hits = queries::search_messages(
        conn,
        &match_query,
        opts.limit,
        opts.project_path.as_deref(),
    )?;

    Ok(hits
        .into_iter()
        .map(|hit| {
            let decoded = paths.decode(&hit.project_path);
            SearchResult {
                project_name: codec::project_name(&decoded),
                content: hit.content,
                session_id: hit.session_id,
                project_path: hit.project_path,
                message_uuid: hit.message_uuid,
                user_type: hit.user_type,
                timestamp: hit.timestamp,
                snippet: hit.snippet,
                rank: hit.rank,
            }
        })
        .collect())
}

/// Quoted prefix token per term: `fix auth` -> `"fix"* "auth"*`. Embedded
/// quotes are doubled so user input cannot break out of the FTS5 string.
fn build_match_query(query: &str) -> Option<String> {
    if query.trim().is_empty() {
        return None;
    }

    let tokens: Vec<String> = query
        .split_whitespace()
        .map(|term| format!("\"{}\"*", term.replace('"', "\"\"")))
        .collect();

    Some(tokens.join(" "))
}
