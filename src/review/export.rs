//! Export of accepted conversations as training data.
//!
//! Training pairs are strictly adjacent guest-then-agent exchanges; bot and
//! template messages never contribute. Pairs are rendered as chat-format
//! JSONL or JSON, and whole conversations can be exported as flat text or a
//! gzipped tar archive of per-conversation files.

use std::io::Write as _;
use std::path::Path;

use flate2::write::GzEncoder;
use flate2::Compression;
use serde::Serialize;
use thiserror::Error;

use crate::models::{Message, RoleTag};

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// One guest question paired with the agent answer that directly followed it.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingPair {
    pub guest: String,
    pub agent: String,
}

/// A conversation selected for export, with its effective messages already
/// resolved (overlay applied where one exists).
#[derive(Debug)]
pub struct ExportItem {
    pub filename: String,
    pub messages: Vec<Message>,
}

#[derive(Serialize)]
struct ChatTurn<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatSample<'a> {
    messages: [ChatTurn<'a>; 2],
}

impl<'a> From<&'a TrainingPair> for ChatSample<'a> {
    fn from(pair: &'a TrainingPair) -> Self {
        Self {
            messages: [
                ChatTurn {
                    role: "user",
                    content: &pair.guest,
                },
                ChatTurn {
                    role: "assistant",
                    content: &pair.agent,
                },
            ],
        }
    }
}

/// Extract guest-to-agent pairs from a message sequence.
///
/// Only a guest message immediately followed by an agent message forms a
/// pair; any other adjacency is skipped, and a pair with an empty cleaned
/// side is dropped.
pub fn extract_training_pairs(messages: &[Message]) -> Vec<TrainingPair> {
    messages
        .windows(2)
        .filter(|w| w[0].role == RoleTag::Guest && w[1].role == RoleTag::Agent)
        .filter_map(|w| {
            let guest = w[0].clean_body();
            let agent = w[1].clean_body();
            if guest.is_empty() || agent.is_empty() {
                None
            } else {
                Some(TrainingPair { guest, agent })
            }
        })
        .collect()
}

/// Render pairs as JSON Lines, one chat sample per line.
pub fn to_jsonl_string(pairs: &[TrainingPair]) -> Result<String, ExportError> {
    let mut out = String::new();
    for pair in pairs {
        out.push_str(&serde_json::to_string(&ChatSample::from(pair))?);
        out.push('\n');
    }
    Ok(out)
}

/// Render pairs as a pretty-printed JSON array of chat samples.
pub fn to_json_string(pairs: &[TrainingPair]) -> Result<String, ExportError> {
    let samples: Vec<ChatSample<'_>> = pairs.iter().map(ChatSample::from).collect();
    Ok(serde_json::to_string_pretty(&samples)?)
}

/// Render one conversation as flat reviewable text.
pub fn flat_text(filename: &str, messages: &[Message]) -> String {
    let mut out = String::new();
    out.push_str(&format!("=== CONVERSATION: {filename} ===\n"));
    for msg in messages {
        let clean = msg.clean_body();
        if clean.is_empty() {
            continue;
        }
        out.push_str(&format!("{}: {clean}\n", msg.role));
    }
    out.push_str(&"=".repeat(80));
    out.push('\n');
    out
}

/// Render the per-conversation file stored inside the export archive.
fn approved_file_content(item: &ExportItem, exported_at: &str) -> String {
    let mut out = String::new();
    out.push_str(&format!("=== APPROVED CONVERSATION: {} ===\n", item.filename));
    out.push_str(&format!("Total Messages: {}\n", item.messages.len()));
    out.push_str(&format!("Exported: {exported_at}\n"));
    out.push_str(&"=".repeat(50));
    out.push('\n');
    out.push('\n');
    for msg in &item.messages {
        let clean = msg.clean_body();
        if clean.is_empty() {
            continue;
        }
        out.push_str(&format!("{}: {clean}\n", msg.role));
    }
    out
}

/// Write a gzipped tar archive of approved conversations to `out_path`.
/// Each conversation becomes `<stem>_approved.txt` at the archive root.
pub fn write_archive(out_path: &Path, items: &[ExportItem]) -> Result<(), ExportError> {
    let file = std::fs::File::create(out_path)?;
    let encoder = GzEncoder::new(file, Compression::default());
    let mut builder = tar::Builder::new(encoder);

    let exported_at = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S").to_string();

    for item in items {
        let stem = Path::new(&item.filename)
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| item.filename.clone());
        let entry_name = format!("{stem}_approved.txt");
        let content = approved_file_content(item, &exported_at);

        let mut header = tar::Header::new_gnu();
        header.set_size(content.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append_data(&mut header, &entry_name, content.as_bytes())?;
    }

    let encoder = builder.into_inner()?;
    let mut file = encoder.finish()?;
    file.flush()?;
    Ok(())
}
