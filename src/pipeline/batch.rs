//! The textual batch protocol used for human review.
//!
//! A batch file carries a shared header, a classification legend, and one
//! record per conversation: an 80-`=` rule, a `CONVERSATION <n> - File:`
//! header line, score and metric lines, a closing rule, then one
//! `role: text` line per message. The parser is the structural inverse of
//! the serializer; record boundaries are detected only by the literal
//! record-header token, never by rules or colon counts, so message text
//! containing colons or `=` runs cannot confuse it.

use std::fmt::Write as _;

use crate::models::{Conversation, Message, RoleTag};
use crate::pipeline::transcript::split_sender;

/// Width of the record rule lines.
const RULE_WIDTH: usize = 80;

/// Literal prefix of a record header line.
const RECORD_HEADER_PREFIX: &str = "CONVERSATION ";

/// Literal separator between ordinal and filename in a record header.
const RECORD_FILE_MARKER: &str = "- File: ";

fn rule() -> String {
    "=".repeat(RULE_WIDTH)
}

/// Render one batch of scored conversations. `start_ordinal` is the ordinal
/// of the first conversation in the batch (ordinals are global across
/// batches, 1-based).
pub fn serialize_batch(
    batch_number: usize,
    start_ordinal: usize,
    conversations: &[Conversation],
) -> String {
    let mut out = String::new();

    let min_score = conversations.last().map(|c| c.quality_score).unwrap_or(0);
    let max_score = conversations.first().map(|c| c.quality_score).unwrap_or(0);

    let _ = writeln!(out, "=== BATCH {batch_number} - TOP QUALITY CONVERSATIONS ===");
    let _ = writeln!(out, "Total conversations in this batch: {}", conversations.len());
    let _ = writeln!(out, "Quality score range: {min_score} - {max_score}");
    let _ = writeln!(out);
    let _ = writeln!(out, "CLASSIFICATION LEGEND:");
    let _ = writeln!(out, "• agent: Staff members (Rona, Soha, Modi, Sarah Call Center, etc.)");
    let _ = writeln!(out, "• guest: Customer/client messages");
    let _ = writeln!(out, "• template: Automated template messages (booking confirmations, etc.)");
    let _ = writeln!(out, "• bot: Automated bot responses");
    let _ = writeln!(out);

    for (offset, conv) in conversations.iter().enumerate() {
        let ordinal = start_ordinal + offset;
        let _ = writeln!(out);
        let _ = writeln!(out, "{}", rule());
        let _ = writeln!(out, "{RECORD_HEADER_PREFIX}{ordinal} {RECORD_FILE_MARKER}{}", conv.filename);
        let _ = writeln!(out, "Quality Score: {}", conv.quality_score);
        let _ = writeln!(
            out,
            "Messages: {}, Avg Length: {:.1}, Questions: {}",
            conv.metrics.message_count,
            conv.metrics.avg_message_length,
            conv.metrics.has_questions,
        );
        let _ = writeln!(out, "{}", rule());
        for msg in &conv.messages {
            let _ = writeln!(out, "{}: {}", msg.role, msg.text);
        }
        let _ = writeln!(out);
    }

    out
}

/// Parser states for extracting one conversation out of a batch file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParserState {
    /// Looking for the record header matching the target filename.
    Seeking,
    /// Inside the target's metric block, consuming until the closing rule.
    InHeader,
    /// Consuming `role: text` message lines.
    InMessages,
}

/// True iff the line is a record header (`CONVERSATION <n> - File: <name>`).
fn is_record_header(line: &str) -> bool {
    line.starts_with(RECORD_HEADER_PREFIX) && line.contains(RECORD_FILE_MARKER)
}

/// Extract the target conversation's messages from batch file content.
///
/// Timestamps are intentionally not preserved across the batch round trip;
/// recovered messages carry an empty `raw_timestamp`. A missing target
/// yields an empty result, not an error.
pub fn extract_conversation(content: &str, target_filename: &str) -> Vec<Message> {
    let target_marker = format!("{RECORD_FILE_MARKER}{target_filename}");
    let closing_rule = rule();

    let mut state = ParserState::Seeking;
    let mut messages = Vec::new();

    for raw_line in content.lines() {
        let line = raw_line.trim();

        match state {
            ParserState::Seeking => {
                if is_record_header(line) && line.ends_with(target_marker.as_str()) {
                    state = ParserState::InHeader;
                }
            }
            ParserState::InHeader => {
                if line == closing_rule {
                    state = ParserState::InMessages;
                }
            }
            ParserState::InMessages => {
                // Only the literal record-header token ends the record.
                if is_record_header(line) {
                    break;
                }
                if line == closing_rule {
                    // Opening rule of the next record; not a boundary.
                    continue;
                }
                let Some((token, rest)) = line.split_once(':') else {
                    continue;
                };
                let Some(role) = RoleTag::parse(token.trim()) else {
                    continue;
                };
                let text = rest.trim();
                if text.is_empty() {
                    continue;
                }

                let (sender_name, body) = split_sender(text);
                messages.push(Message {
                    index: messages.len(),
                    raw_timestamp: String::new(),
                    sender_name,
                    role,
                    text: text.to_string(),
                    body,
                });
            }
        }
    }

    messages
}
