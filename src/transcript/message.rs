use std::path::Path;

use serde::{Deserialize, Serialize};

/// Prefixes that mark a user-role line as command/system plumbing rather
/// than conversation.
const SYSTEM_PREFIXES: [&str; 4] = [
    "<command-name>",
    "<local-command-",
    "Caveat:",
    "<system-reminder>",
];

/// One line of a transcript file.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptMessage {
    #[serde(default)]
    pub parent_uuid: Option<String>,
    #[serde(default)]
    pub is_sidechain: bool,
    #[serde(default)]
    pub is_meta: bool,
    #[serde(default)]
    pub session_id: String,
    #[serde(rename = "type")]
    pub kind: MessageKind,
    pub message: MessagePayload,
    #[serde(default)]
    pub uuid: String,
    #[serde(default)]
    pub timestamp: Timestamp,
}

/// Entry type. Transcripts interleave conversation with markers like
/// file-history snapshots; everything unrecognized collapses to `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    User,
    Assistant,
    #[serde(other)]
    Other,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::User => "user",
            MessageKind::Assistant => "assistant",
            MessageKind::Other => "other",
        }
    }

    pub fn is_conversational(&self) -> bool {
        matches!(self, MessageKind::User | MessageKind::Assistant)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MessagePayload {
    #[serde(default)]
    pub role: Option<String>,
    pub content: MessageContent,
    #[serde(default)]
    pub usage: Option<TokenUsage>,
}

/// Message content is either a plain string or an ordered block sequence.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Blocks(Vec<ContentBlock>),
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "type")]
pub enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "tool_use")]
    ToolUse {
        id: String,
        name: String,
        #[serde(default)]
        input: serde_json::Value,
    },
    #[serde(rename = "tool_result")]
    ToolResult {
        tool_use_id: String,
        #[serde(default)]
        content: serde_json::Value,
    },
    // Unknown block kinds (thinking, images, ...) must not sink the line.
    #[serde(untagged)]
    Other(serde_json::Value),
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TokenUsage {
    #[serde(default)]
    pub input_tokens: u64,
    #[serde(default)]
    pub output_tokens: u64,
    #[serde(default)]
    pub cache_creation_input_tokens: u64,
    #[serde(default)]
    pub cache_read_input_tokens: u64,
}

/// Timestamps arrive as either epoch-millis or an ISO-8601 string.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum Timestamp {
    Millis(i64),
    Text(String),
}

impl Default for Timestamp {
    fn default() -> Self {
        Timestamp::Millis(0)
    }
}

impl Timestamp {
    /// Normalize to epoch-millis; unparseable strings become 0.
    pub fn as_millis(&self) -> i64 {
        match self {
            Timestamp::Millis(ms) => *ms,
            Timestamp::Text(s) => chrono::DateTime::parse_from_rfc3339(s)
                .map(|dt| dt.timestamp_millis())
                .unwrap_or(0),
        }
    }
}

/// Parse a transcript file into its conversational messages.
///
/// Malformed lines are dropped silently, and an unreadable file yields an
/// empty list rather than an error.
pub fn parse_transcript_file(path: &Path) -> Vec<TranscriptMessage> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(_) => return Vec::new(),
    };

    content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| serde_json::from_str::<TranscriptMessage>(line).ok())
        .filter(|msg| msg.kind.is_conversational())
        .collect()
}

/// Text of the first text block (or the whole string content). Used for
/// list-view previews and the indexed row content.
pub fn extract_text(content: &MessageContent) -> &str {
    match content {
        MessageContent::Text(s) => s,
        MessageContent::Blocks(blocks) => blocks
            .iter()
            .find_map(|block| match block {
                ContentBlock::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .unwrap_or(""),
    }
}

/// Text of every text block, newline-joined. Used by the conversation
/// sampler so multi-block assistant turns are not cut to their first block.
pub fn extract_all_text(content: &MessageContent) -> String {
    match content {
        MessageContent::Text(s) => s.clone(),
        MessageContent::Blocks(blocks) => blocks
            .iter()
            .filter_map(|block| match block {
                ContentBlock::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n"),
    }
}

pub fn is_system_message(msg: &TranscriptMessage) -> bool {
    if msg.is_meta {
        return true;
    }
    let text = extract_text(&msg.message.content);
    SYSTEM_PREFIXES.iter().any(|prefix| text.starts_with(prefix))
}

pub fn has_visible_content(content: &MessageContent) -> bool {
    match content {
        MessageContent::Text(s) => !s.trim().is_empty(),
        MessageContent::Blocks(blocks) => blocks.iter().any(|block| {
            matches!(block, ContentBlock::Text { text } if !text.trim().is_empty())
        }),
    }
}

/// The one visibility rule every message count in the system agrees on.
pub fn is_visible(msg: &TranscriptMessage) -> bool {
    !is_system_message(msg) && has_visible_content(&msg.message.content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn parse(line: &str) -> TranscriptMessage {
        serde_json::from_str(line).unwrap()
    }

    #[test]
    fn test_parse_string_content() {
        let msg = parse(
            r#"{"type":"user","uuid":"u1","message":{"role":"user","content":"hello"},"timestamp":1700000000000}"#,
        );
        assert_eq!(msg.kind, MessageKind::User);
        assert_eq!(extract_text(&msg.message.content), "hello");
        assert_eq!(msg.timestamp.as_millis(), 1_700_000_000_000);
    }

    #[test]
    fn test_parse_block_content() {
        let msg = parse(
            r#"{"type":"assistant","uuid":"a1","message":{"role":"assistant","content":[{"type":"tool_use","id":"t1","name":"Bash","input":{}},{"type":"text","text":"first"},{"type":"text","text":"second"}]}}"#,
        );
        assert_eq!(extract_text(&msg.message.content), "first");
        assert_eq!(extract_all_text(&msg.message.content), "first\nsecond");
    }

    #[test]
    fn test_unknown_block_kind_survives() {
        let msg = parse(
            r#"{"type":"assistant","uuid":"a1","message":{"role":"assistant","content":[{"type":"thinking","thinking":"..."},{"type":"text","text":"answer"}]}}"#,
        );
        assert_eq!(extract_text(&msg.message.content), "answer");
    }

    #[test]
    fn test_unknown_kind_collapses_to_other() {
        let msg = parse(
            r#"{"type":"file-history-snapshot","uuid":"f1","message":{"role":"user","content":""}}"#,
        );
        assert_eq!(msg.kind, MessageKind::Other);
        assert!(!msg.kind.is_conversational());
    }

    #[test]
    fn test_iso_timestamp_normalization() {
        let msg = parse(
            r#"{"type":"user","uuid":"u1","message":{"role":"user","content":"x"},"timestamp":"2026-01-15T10:00:00Z"}"#,
        );
        assert_eq!(msg.timestamp.as_millis(), 1_768_471_200_000);

        let bad = parse(
            r#"{"type":"user","uuid":"u1","message":{"role":"user","content":"x"},"timestamp":"not a date"}"#,
        );
        assert_eq!(bad.timestamp.as_millis(), 0);
    }

    #[test]
    fn test_system_classification() {
        let meta = parse(
            r#"{"type":"user","isMeta":true,"uuid":"u1","message":{"role":"user","content":"anything"}}"#,
        );
        assert!(is_system_message(&meta));

        for prefix in ["<command-name>", "<local-command-stdout>", "Caveat:", "<system-reminder>"] {
            let msg = parse(&format!(
                r#"{{"type":"user","uuid":"u1","message":{{"role":"user","content":"{prefix} rest"}}}}"#
            ));
            assert!(is_system_message(&msg), "prefix {prefix} not recognized");
        }

        let normal = parse(
            r#"{"type":"user","uuid":"u1","message":{"role":"user","content":"fix the bug"}}"#,
        );
        assert!(!is_system_message(&normal));
    }

    #[test]
    fn test_visibility() {
        let blank = parse(
            r#"{"type":"user","uuid":"u1","message":{"role":"user","content":"   "}}"#,
        );
        assert!(!has_visible_content(&blank.message.content));

        let tool_only = parse(
            r#"{"type":"assistant","uuid":"a1","message":{"role":"assistant","content":[{"type":"tool_use","id":"t1","name":"Bash","input":{}}]}}"#,
        );
        assert!(!has_visible_content(&tool_only.message.content));

        let visible = parse(
            r#"{"type":"assistant","uuid":"a1","message":{"role":"assistant","content":[{"type":"text","text":"done"}]}}"#,
        );
        assert!(is_visible(&visible));
    }

    #[test]
    fn test_parse_file_skips_malformed_lines() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"{{"type":"user","uuid":"u1","message":{{"role":"user","content":"one"}}}}"#
        )
        .unwrap();
        writeln!(file, "{{not json").unwrap();
        writeln!(file).unwrap();
        writeln!(
            file,
            r#"{{"type":"assistant","uuid":"a1","message":{{"role":"assistant","content":"two"}}}}"#
        )
        .unwrap();

        let messages = parse_transcript_file(file.path());
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].uuid, "u1");
        assert_eq!(messages[1].uuid, "a1");
    }

    #[test]
    fn test_parse_missing_file_is_empty() {
        let messages = parse_transcript_file(Path::new("/nonexistent/session.jsonl"));
        assert!(messages.is_empty());
    }

    #[test]
    fn test_token_usage_parsed() {
        let msg = parse(
            r#"{"type":"assistant","uuid":"a1","message":{"role":"assistant","content":"ok","usage":{"input_tokens":12,"output_tokens":34,"cache_creation_input_tokens":0,"cache_read_input_tokens":5}}}"#,
        );
        let usage = msg.message.usage.unwrap();
        assert_eq!(usage.input_tokens, 12);
        assert_eq!(usage.output_tokens, 34);
        assert_eq!(usage.cache_read_input_tokens, 5);
    }
}
