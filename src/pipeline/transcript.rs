//! Transcript line parsing.
//!
//! A line is a message iff it starts with a bracketed timestamp span; the
//! first `]` closes the bracket. Lines without a leading bracket are ignored
//! (multi-line messages are not supported). Empty remainders produce no
//! message at all, so downstream message counts only see real content.

use std::path::Path;

use regex::Regex;

use crate::models::Message;
use crate::pipeline::ScanError;

/// Read a transcript file and parse its messages. Invalid UTF-8 is replaced,
/// never fatal; only an unreadable file is an error.
pub fn read_transcript(path: &Path) -> Result<Vec<Message>, ScanError> {
    let bytes = std::fs::read(path)?;
    let content = String::from_utf8_lossy(&bytes);
    Ok(parse_transcript(&content))
}

/// Parse raw transcript content into ordered messages with roles unset
/// (the classifier assigns them afterwards).
pub fn parse_transcript(content: &str) -> Vec<Message> {
    let timestamp_re = Regex::new(r"^\[([^\]]+)\]").unwrap();

    let mut messages = Vec::new();
    for line in content.lines() {
        let Some(caps) = timestamp_re.captures(line) else {
            continue;
        };

        let raw_timestamp = caps[1].to_string();
        let text = line[caps[0].len()..].trim();
        if text.is_empty() {
            continue;
        }

        let (sender_name, body) = split_sender(text);
        messages.push(Message {
            index: messages.len(),
            raw_timestamp,
            sender_name,
            role: Default::default(),
            text: text.to_string(),
            body,
        });
    }
    messages
}

/// Split a `Name: rest` prefix off a message text. The name must be non-empty
/// after trimming; otherwise the whole text is the body and there is no
/// sender. Used both for transcript lines and for messages recovered from
/// batch files, so the two paths agree on what a sender prefix is.
pub(crate) fn split_sender(text: &str) -> (Option<String>, String) {
    let sender_re = Regex::new(r"^([^:]+):\s*(.+)$").unwrap();

    if let Some(caps) = sender_re.captures(text) {
        let name = caps[1].trim().to_lowercase();
        if !name.is_empty() {
            return (Some(name), caps[2].trim().to_string());
        }
    }
    (None, text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_timestamped_lines_in_order() {
        let content = "\
[01/01/2024 10:00:00] John: Hello, do you have availability?
[01/01/2024 10:01:00] Rona: Yes we do, what time?
[01/01/2024 10:02:00] System: Your verification code is 1234";

        let messages = parse_transcript(content);
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].index, 0);
        assert_eq!(messages[0].raw_timestamp, "01/01/2024 10:00:00");
        assert_eq!(messages[0].sender_name.as_deref(), Some("john"));
        assert_eq!(messages[0].body, "Hello, do you have availability?");
        assert_eq!(messages[0].text, "John: Hello, do you have availability?");
        assert_eq!(messages[2].sender_name.as_deref(), Some("system"));
    }

    #[test]
    fn lines_without_bracket_are_ignored() {
        let content = "\
no bracket here
[ts] first
continuation of first, but not merged
[ts] second";

        let messages = parse_transcript(content);
        assert_eq!(messages.len(), 2, "non-bracketed lines produce no messages");
        assert_eq!(messages[1].text, "second");
    }

    #[test]
    fn empty_remainder_dropped() {
        let messages = parse_transcript("[01/01/2024 10:00:00]\n[01/01/2024 10:00:01]   ");
        assert!(messages.is_empty());
    }

    #[test]
    fn first_closing_bracket_ends_timestamp() {
        let messages = parse_transcript("[a]b] hello");
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].raw_timestamp, "a");
        assert_eq!(messages[0].text, "b] hello");
    }

    #[test]
    fn message_without_sender_prefix() {
        let messages = parse_transcript("[ts] just a bare message");
        assert_eq!(messages[0].sender_name, None);
        assert_eq!(messages[0].body, "just a bare message");
        assert_eq!(messages[0].body, messages[0].text);
    }

    #[test]
    fn whitespace_sender_name_is_no_sender() {
        let (sender, body) = split_sender("   : hello");
        assert_eq!(sender, None);
        assert_eq!(body, "   : hello");
    }

    #[test]
    fn sender_split_uses_first_colon() {
        let (sender, body) = split_sender("John: see you at 10:30");
        assert_eq!(sender.as_deref(), Some("john"));
        assert_eq!(body, "see you at 10:30");
    }

    #[test]
    fn read_replaces_invalid_utf8() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chat.txt");
        let mut bytes = b"[ts] hello ".to_vec();
        bytes.extend_from_slice(&[0xff, 0xfe]);
        bytes.extend_from_slice(b" world\n");
        std::fs::write(&path, bytes).unwrap();

        let messages = read_transcript(&path).unwrap();
        assert_eq!(messages.len(), 1, "decode errors are replaced, not fatal");
        assert!(messages[0].text.contains("world"));
    }
}
