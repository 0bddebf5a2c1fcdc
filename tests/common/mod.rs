//! Shared helpers for building synthetic transcript trees.
#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::json;
use tempfile::TempDir;

pub const BASE_TIMESTAMP: i64 = 1_768_471_200_000; // 2026-01-15T10:00:00Z

/// A temporary projects root the store can sync against.
pub struct ProjectsRoot {
    temp_dir: TempDir,
}

impl ProjectsRoot {
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().expect("Failed to create temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn write_session(&self, encoded_project: &str, session_id: &str, content: &str) -> PathBuf {
        let dir = self.temp_dir.path().join(encoded_project);
        fs::create_dir_all(&dir).expect("Failed to create project dir");
        let file_path = dir.join(format!("{session_id}.jsonl"));
        fs::write(&file_path, content).expect("Failed to write session file");
        file_path
    }

    pub fn remove_session(&self, encoded_project: &str, session_id: &str) {
        let file_path = self
            .temp_dir
            .path()
            .join(encoded_project)
            .join(format!("{session_id}.jsonl"));
        fs::remove_file(file_path).expect("Failed to remove session file");
    }
}

fn base_message(kind: &str, content: serde_json::Value) -> serde_json::Value {
    json!({
        "parentUuid": null,
        "isSidechain": false,
        "userType": "human",
        "cwd": "/tmp/test-project",
        "sessionId": "test-session",
        "version": "1.0.0",
        "gitBranch": "main",
        "type": kind,
        "message": {
            "role": if kind == "assistant" { "assistant" } else { "user" },
            "content": content,
        },
        "uuid": uuid::Uuid::new_v4().to_string(),
        "timestamp": BASE_TIMESTAMP,
    })
}

pub fn user_message(text: &str) -> String {
    base_message("user", json!(text)).to_string()
}

pub fn assistant_message(text: &str) -> String {
    base_message("assistant", json!(text)).to_string()
}

pub fn system_message(text: &str) -> String {
    let mut msg = base_message("user", json!(text));
    msg["isMeta"] = json!(true);
    msg.to_string()
}

pub fn assistant_blocks_message(blocks: serde_json::Value) -> String {
    base_message("assistant", blocks).to_string()
}

pub fn to_jsonl(lines: &[String]) -> String {
    let mut content = lines.join("\n");
    content.push('\n');
    content
}

/// Pin a file's mtime to an absolute epoch-seconds value.
pub fn set_mtime(path: &Path, unix_seconds: i64) {
    filetime::set_file_mtime(path, filetime::FileTime::from_unix_time(unix_seconds, 0))
        .expect("Failed to set mtime");
}
