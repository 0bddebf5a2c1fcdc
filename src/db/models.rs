use serde::{Deserialize, Serialize};

/// One row per transcript file currently believed indexed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexedFile {
    pub path: String,
    pub mtime: i64,
    pub session_id: String,
    /// Encoded project id (the on-disk directory name).
    pub project_path: String,
    pub visible_message_count: i64,
    /// First visible user message, truncated to 500 chars at index time.
    pub first_message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SummaryKind {
    Session,
    Project,
}

impl SummaryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SummaryKind::Session => "session",
            SummaryKind::Project => "project",
        }
    }
}

impl std::str::FromStr for SummaryKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "session" => Ok(SummaryKind::Session),
            "project" => Ok(SummaryKind::Project),
            other => Err(anyhow::anyhow!("Unknown summary type: {other}")),
        }
    }
}

/// A cached AI-generated synopsis, unique per (type, target, project).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    /// Composite `{type}-{project}-{target}` id; None until saved.
    pub id: Option<String>,
    pub kind: SummaryKind,
    pub target_id: String,
    pub project_path: String,
    pub content: String,
    pub created_at: i64,
    /// Visible message count at generation time, for staleness checks.
    pub message_count: i64,
}

impl Summary {
    pub fn composite_id(kind: SummaryKind, project_path: &str, target_id: &str) -> String {
        format!("{}-{}-{}", kind.as_str(), project_path, target_id)
    }
}

/// One full-text match as it comes off the messages table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageHit {
    pub content: String,
    pub session_id: String,
    pub project_path: String,
    pub message_uuid: String,
    pub user_type: String,
    pub timestamp: i64,
    pub snippet: String,
    pub rank: f64,
}

/// A `MessageHit` plus the human-readable project name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub content: String,
    pub session_id: String,
    pub project_path: String,
    pub project_name: String,
    pub message_uuid: String,
    pub user_type: String,
    pub timestamp: i64,
    pub snippet: String,
    pub rank: f64,
}

/// Cheap list-view row for one session, served from the index without
/// reparsing the transcript.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionOverview {
    pub id: String,
    pub first_message: String,
    pub message_count: i64,
    pub last_activity: i64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectStats {
    pub session_count: i64,
    pub total_messages: i64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexStats {
    pub file_count: i64,
    pub message_count: i64,
}

/// What one reconciliation pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    pub added: usize,
    pub updated: usize,
    pub removed: usize,
}
