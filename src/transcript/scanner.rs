use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use crate::paths::codec::ProjectPathCodec;

const TRANSCRIPT_SUFFIX: &str = ".jsonl";
/// Sub-agent scratch transcripts, not user-facing sessions.
const AGENT_PREFIX: &str = "agent-";

/// One transcript file found under the projects root.
#[derive(Debug, Clone)]
pub struct TranscriptFile {
    pub path: PathBuf,
    /// Last modification time, epoch millis.
    pub mtime: i64,
    /// Filename without the transcript extension.
    pub session_id: String,
    /// Project directory name as it appears on disk.
    pub encoded_project: String,
    /// Decoded original project path (may not exist, see path codec).
    pub project_path: PathBuf,
}

/// Enumerate every session transcript one level below the projects root.
///
/// Unreadable projects or files are skipped, never fatal; a missing root
/// yields an empty list.
pub fn list_transcript_files(projects_dir: &Path, codec: &ProjectPathCodec) -> Vec<TranscriptFile> {
    let mut files = Vec::new();

    let project_dirs = match std::fs::read_dir(projects_dir) {
        Ok(entries) => entries,
        Err(_) => return files,
    };

    for project_entry in project_dirs.flatten() {
        let project_dir = project_entry.path();
        if !project_dir.is_dir() {
            continue;
        }
        let encoded_project = match project_dir.file_name() {
            Some(name) => name.to_string_lossy().into_owned(),
            None => continue,
        };
        let project_path = codec.decode(&encoded_project);

        let session_files = match std::fs::read_dir(&project_dir) {
            Ok(entries) => entries,
            Err(err) => {
                eprintln!(
                    "Warning: skipping unreadable project {}: {}",
                    project_dir.display(),
                    err
                );
                continue;
            }
        };

        for file_entry in session_files.flatten() {
            let file_name = file_entry.file_name().to_string_lossy().into_owned();
            if !file_name.ends_with(TRANSCRIPT_SUFFIX) || file_name.starts_with(AGENT_PREFIX) {
                continue;
            }

            let mtime = match file_entry.metadata().and_then(|m| m.modified()) {
                Ok(modified) => modified
                    .duration_since(UNIX_EPOCH)
                    .map(|d| d.as_millis() as i64)
                    .unwrap_or(0),
                Err(_) => continue,
            };

            files.push(TranscriptFile {
                path: file_entry.path(),
                mtime,
                session_id: file_name
                    .strip_suffix(TRANSCRIPT_SUFFIX)
                    .unwrap_or(&file_name)
                    .to_string(),
                encoded_project: encoded_project.clone(),
                project_path: project_path.clone(),
            });
        }
    }

    files
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_lists_only_session_transcripts() {
        let tmp = TempDir::new().unwrap();
        let project = tmp.path().join("-home-user-site");
        fs::create_dir_all(&project).unwrap();
        fs::write(project.join("sess1.jsonl"), "{}\n").unwrap();
        fs::write(project.join("agent-task.jsonl"), "{}\n").unwrap();
        fs::write(project.join("notes.txt"), "notes").unwrap();
        // Non-directory entries at the root are skipped.
        fs::write(tmp.path().join("stray.jsonl"), "{}\n").unwrap();

        let codec = ProjectPathCodec::new();
        let files = list_transcript_files(tmp.path(), &codec);

        assert_eq!(files.len(), 1);
        let file = &files[0];
        assert_eq!(file.session_id, "sess1");
        assert_eq!(file.encoded_project, "-home-user-site");
        assert!(file.mtime > 0);
    }

    #[test]
    fn test_missing_root_is_empty() {
        let codec = ProjectPathCodec::new();
        let files = list_transcript_files(Path::new("/nonexistent/projects"), &codec);
        assert!(files.is_empty());
    }
}
