use crate::transcript::message::{self, MessageKind, TranscriptMessage};

/// Overall character budget for one summarization prompt.
const MAX_TOTAL: usize = 12_000;
const MAX_USER: usize = 300;
const MAX_ASSISTANT: usize = 200;

/// One user turn plus every assistant turn that immediately followed it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationPair {
    pub user: String,
    pub assistant: String,
}

/// Pair each user message with the newline-joined text of the consecutive
/// assistant messages after it. System, sidechain, and non-conversational
/// entries are dropped first; assistant messages with no preceding user
/// message are never emitted as orphan pairs.
pub fn build_pairs(messages: &[TranscriptMessage]) -> Vec<ConversationPair> {
    let meaningful: Vec<&TranscriptMessage> = messages
        .iter()
        .filter(|m| {
            !message::is_system_message(m) && !m.is_sidechain && m.kind.is_conversational()
        })
        .collect();

    let mut pairs = Vec::new();
    let mut i = 0;

    while i < meaningful.len() {
        if meaningful[i].kind == MessageKind::User {
            let user_text = message::extract_all_text(&meaningful[i].message.content)
                .trim()
                .to_string();

            let mut assistant_text = String::new();
            let mut j = i + 1;
            while j < meaningful.len() && meaningful[j].kind == MessageKind::Assistant {
                let text = message::extract_all_text(&meaningful[j].message.content)
                    .trim()
                    .to_string();
                if !text.is_empty() {
                    if !assistant_text.is_empty() {
                        assistant_text.push('\n');
                    }
                    assistant_text.push_str(&text);
                }
                j += 1;
            }

            if !user_text.is_empty() || !assistant_text.is_empty() {
                pairs.push(ConversationPair {
                    user: user_text,
                    assistant: assistant_text,
                });
            }
            i = j;
        } else {
            i += 1;
        }
    }

    pairs
}

/// Bound a long conversation to a representative subset: always the first
/// two and last two pairs, plus evenly spaced picks from the middle scaled
/// by transcript length.
pub fn sample_pairs(pairs: &[ConversationPair]) -> Vec<ConversationPair> {
    if pairs.len() <= 10 {
        return pairs.to_vec();
    }

    let first = &pairs[..2];
    let last = &pairs[pairs.len() - 2..];
    let middle = &pairs[2..pairs.len() - 2];

    let max_middle = if pairs.len() <= 20 {
        6
    } else if pairs.len() <= 40 {
        8
    } else {
        10
    };
    let step = middle.len() as f64 / max_middle as f64;

    let mut sampled = Vec::with_capacity(max_middle + 4);
    sampled.extend_from_slice(first);
    for i in 0..max_middle {
        let offset = i as f64 * step;
        if offset >= middle.len() as f64 {
            break;
        }
        sampled.push(middle[offset.floor() as usize].clone());
    }
    sampled.extend_from_slice(last);

    sampled
}

/// Keep the head and tail halves of an over-long assistant turn, joined by
/// a ` [...] ` marker, so both the opening and the resolution survive.
pub fn truncate_assistant(text: &str, limit: usize) -> String {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= limit {
        return text.to_string();
    }
    let half = limit.saturating_sub(7) / 2;
    let head: String = chars[..half].iter().collect();
    let tail: String = chars[chars.len() - half..].iter().collect();
    format!("{head} [...] {tail}")
}

/// Render a transcript into the bounded prompt text handed to the
/// summarizer. Returns an empty string when nothing conversational remains.
pub fn format_for_summary(messages: &[TranscriptMessage]) -> String {
    let pairs = build_pairs(messages);
    let sampled = sample_pairs(&pairs);

    let mut output = String::new();
    let mut output_chars = 0;

    for pair in &sampled {
        let user_text = if pair.user.chars().count() > MAX_USER {
            let head: String = pair.user.chars().take(MAX_USER).collect();
            format!("{head}...")
        } else {
            pair.user.clone()
        };

        let mut block = format!("> User: {user_text}\n");
        if !pair.assistant.is_empty() {
            let assistant_text = truncate_assistant(&pair.assistant, MAX_ASSISTANT);
            block.push_str(&format!("  Assistant: {assistant_text}\n"));
        }
        block.push('\n');

        let block_chars = block.chars().count();
        if output_chars + block_chars > MAX_TOTAL {
            break;
        }
        output.push_str(&block);
        output_chars += block_chars;
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcript::message::{MessageContent, MessagePayload, Timestamp};

    fn msg(kind: MessageKind, text: &str) -> TranscriptMessage {
        TranscriptMessage {
            parent_uuid: None,
            is_sidechain: false,
            is_meta: false,
            session_id: String::new(),
            kind,
            message: MessagePayload {
                role: None,
                content: MessageContent::Text(text.to_string()),
                usage: None,
            },
            uuid: String::new(),
            timestamp: Timestamp::Millis(0),
        }
    }

    fn user(text: &str) -> TranscriptMessage {
        msg(MessageKind::User, text)
    }

    fn assistant(text: &str) -> TranscriptMessage {
        msg(MessageKind::Assistant, text)
    }

    fn exchange(count: usize) -> Vec<ConversationPair> {
        (0..count)
            .map(|i| ConversationPair {
                user: format!("question {i}"),
                assistant: format!("answer {i}"),
            })
            .collect()
    }

    #[test]
    fn test_build_pairs_joins_consecutive_assistants() {
        let messages = vec![
            user("how do I do X?"),
            assistant("first part"),
            assistant("second part"),
            user("thanks"),
        ];

        let pairs = build_pairs(&messages);
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0].user, "how do I do X?");
        assert_eq!(pairs[0].assistant, "first part\nsecond part");
        assert_eq!(pairs[1].assistant, "");
    }

    #[test]
    fn test_build_pairs_skips_leading_assistants() {
        let messages = vec![assistant("orphan"), user("hello"), assistant("hi")];
        let pairs = build_pairs(&messages);
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].user, "hello");
    }

    #[test]
    fn test_build_pairs_filters_system_and_sidechain() {
        let mut meta = user("<command-name>ls</command-name>");
        meta.is_meta = true;
        let mut side = assistant("sidechain thought");
        side.is_sidechain = true;

        let messages = vec![meta, user("real"), side, assistant("reply")];
        let pairs = build_pairs(&messages);
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].user, "real");
        assert_eq!(pairs[0].assistant, "reply");
    }

    #[test]
    fn test_build_pairs_drops_empty_pairs() {
        let messages = vec![user("   "), user("visible")];
        let pairs = build_pairs(&messages);
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].user, "visible");
    }

    #[test]
    fn test_sample_identity_at_ten_or_fewer() {
        let pairs = exchange(10);
        assert_eq!(sample_pairs(&pairs), pairs);
    }

    #[test]
    fn test_sample_fifteen_keeps_ten() {
        let pairs = exchange(15);
        let sampled = sample_pairs(&pairs);
        assert_eq!(sampled.len(), 10);
        assert_eq!(sampled[0], pairs[0]);
        assert_eq!(sampled[1], pairs[1]);
        assert_eq!(sampled[8], pairs[13]);
        assert_eq!(sampled[9], pairs[14]);
    }

    #[test]
    fn test_sample_fifty_keeps_fourteen() {
        let pairs = exchange(50);
        let sampled = sample_pairs(&pairs);
        assert_eq!(sampled.len(), 14);
        assert_eq!(sampled[12], pairs[48]);
        assert_eq!(sampled[13], pairs[49]);
    }

    #[test]
    fn test_truncate_keeps_head_and_tail() {
        let text = format!("{}{}{}", "A".repeat(50), "B".repeat(200), "C".repeat(50));
        let truncated = truncate_assistant(&text, 200);
        assert!(truncated.contains(" [...] "));
        assert!(truncated.starts_with('A'));
        assert!(truncated.ends_with('C'));
        assert!(truncated.chars().count() <= 200);
    }

    #[test]
    fn test_truncate_short_text_unchanged() {
        assert_eq!(truncate_assistant("short", 200), "short");
    }

    #[test]
    fn test_format_layout() {
        let messages = vec![user("build a parser"), assistant("done, see parser.rs")];
        let formatted = format_for_summary(&messages);
        assert_eq!(
            formatted,
            "> User: build a parser\n  Assistant: done, see parser.rs\n\n"
        );
    }

    #[test]
    fn test_format_truncates_long_user_text() {
        let long_question = "q".repeat(400);
        let messages = vec![user(&long_question)];
        let formatted = format_for_summary(&messages);
        assert!(formatted.contains(&format!("{}...", "q".repeat(300))));
        assert!(!formatted.contains(&"q".repeat(301)));
    }

    #[test]
    fn test_format_stays_within_budget_on_long_transcripts() {
        // Worst case per pair is ~530 chars after per-side truncation, and
        // sampling caps output at 14 pairs, so the 12k ceiling holds.
        let mut messages = Vec::new();
        for i in 0..60 {
            messages.push(user(&format!("{i} {}", "u".repeat(400))));
            messages.push(assistant(&"a".repeat(5_000)));
        }

        let formatted = format_for_summary(&messages);
        assert!(formatted.chars().count() <= 12_000);
        assert!(formatted.starts_with("> User: 0"));
        assert_eq!(formatted.matches("> User: ").count(), 14);
    }

    #[test]
    fn test_format_empty_transcript() {
        assert_eq!(format_for_summary(&[]), "");
    }
}
