use anyhow::{bail, Result};

use crate::config::settings::LlmConfig;
use crate::llm::client::generate;
use crate::summary::sampler;
use crate::transcript::message::TranscriptMessage;

/// Summarize one session from its sampled conversation text.
pub async fn summarize_session(
    config: &LlmConfig,
    messages: &[TranscriptMessage],
) -> Result<String> {
    let conversation = sampler::format_for_summary(messages);
    if conversation.is_empty() {
        bail!("Session has no conversational content to summarize");
    }

    let prompt = format!(
        "Summarise this Claude Code session in 2-3 sentences. Focus on what was being built or fixed. Be specific and concise.\n\nUser requests from this session:\n{conversation}"
    );

    generate(config, &prompt).await
}

/// Roll a project's cached session summaries up into one overview.
pub async fn summarize_project(
    config: &LlmConfig,
    session_summaries: &[String],
) -> Result<String> {
    if session_summaries.is_empty() {
        bail!("No session summaries to roll up");
    }

    let summaries_text = session_summaries
        .iter()
        .enumerate()
        .map(|(i, s)| format!("Session {}: {}", i + 1, s))
        .collect::<Vec<_>>()
        .join("\n");

    let prompt = format!(
        "Given these session summaries from a coding project, provide a brief 2-3 sentence overview of what this project involves and recent activity.\n\n{summaries_text}"
    );

    generate(config, &prompt).await
}
