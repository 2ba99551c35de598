//! Corrected-message overlay resolution and find/replace.
//!
//! A persisted overlay wholly replaces the parsed conversation for every
//! downstream read, including export. It is never merged field-by-field
//! with the parse result, and the original transcript file on disk is
//! never modified. A corrupt overlay logs a warning and falls back to the
//! parsed content.

use std::path::Path;

use regex::RegexBuilder;

use crate::lexicon::Lexicons;
use crate::models::Message;
use crate::pipeline::batch::extract_conversation;
use crate::pipeline::classify::RoleClassifier;
use crate::pipeline::transcript::read_transcript;
use crate::review::store::ReviewStore;
use crate::review::ReviewError;

/// Decode the stored overlay for a filename, if present and well-formed.
/// Corrupt JSON is treated as no overlay.
pub fn corrected_overlay(store: &ReviewStore, filename: &str) -> Option<Vec<Message>> {
    let json = match store.corrected_json(filename) {
        Ok(json) => json?,
        Err(e) => {
            tracing::warn!("Could not read overlay for {filename}: {e}");
            return None;
        }
    };

    match serde_json::from_str::<Vec<Message>>(&json) {
        Ok(messages) => Some(messages),
        Err(e) => {
            tracing::warn!("Corrupt overlay for {filename}, falling back to parsed content: {e}");
            None
        }
    }
}

/// Resolve the effective message list for a filename.
///
/// Resolution order: stored overlay, then the individual transcript file,
/// then extraction from batch files in the organized directory. A filename
/// found nowhere resolves to an empty list.
pub fn effective_messages(
    store: &ReviewStore,
    filename: &str,
    chats_dir: &Path,
    organized_dir: &Path,
    lexicons: &Lexicons,
) -> Result<Vec<Message>, ReviewError> {
    if let Some(messages) = corrected_overlay(store, filename) {
        return Ok(messages);
    }

    let transcript_path = chats_dir.join(filename);
    if transcript_path.is_file() {
        let mut messages = read_transcript(&transcript_path).map_err(ReviewError::Scan)?;
        RoleClassifier::new(lexicons).classify_messages(&mut messages);
        return Ok(messages);
    }

    extract_from_batches(organized_dir, filename)
}

/// Search every batch file in the organized directory for the conversation.
fn extract_from_batches(organized_dir: &Path, filename: &str) -> Result<Vec<Message>, ReviewError> {
    let mut batch_paths: Vec<_> = std::fs::read_dir(organized_dir)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok().map(|e| e.path()))
                .filter(|p| is_batch_file(p))
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();
    batch_paths.sort();

    for path in batch_paths {
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!("Could not read batch file {}: {e}", path.display());
                continue;
            }
        };
        let messages = extract_conversation(&content, filename);
        if !messages.is_empty() {
            return Ok(messages);
        }
    }

    tracing::warn!("Conversation {filename} not found in transcripts or batch files");
    Ok(Vec::new())
}

pub(crate) fn is_batch_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with("conversations_batch_") && n.ends_with(".txt"))
}

/// Result of a find/replace pass.
#[derive(Debug)]
pub struct ReplaceOutcome {
    /// Number of messages that had at least one occurrence replaced.
    pub replaced: usize,
    pub messages: Vec<Message>,
}

/// Case-insensitive substring find/replace over the effective message list.
///
/// Rewrites both `text` and `body`. If anything changed, the mutated list
/// is persisted as the new overlay. The source transcript is untouched.
pub fn find_replace(
    store: &ReviewStore,
    filename: &str,
    chats_dir: &Path,
    organized_dir: &Path,
    lexicons: &Lexicons,
    find: &str,
    replace: &str,
) -> Result<ReplaceOutcome, ReviewError> {
    let mut messages = effective_messages(store, filename, chats_dir, organized_dir, lexicons)?;

    let pattern = RegexBuilder::new(&regex::escape(find))
        .case_insensitive(true)
        .build()
        .expect("escaped literal is a valid pattern");

    let mut replaced = 0;
    for msg in &mut messages {
        if !pattern.is_match(&msg.text) && !pattern.is_match(&msg.body) {
            continue;
        }
        msg.text = pattern.replace_all(&msg.text, replace).into_owned();
        msg.body = pattern.replace_all(&msg.body, replace).into_owned();
        replaced += 1;
    }

    if replaced > 0 {
        let json = serde_json::to_string(&messages)?;
        store.save_corrected_json(filename, &json)?;
    }

    Ok(ReplaceOutcome { replaced, messages })
}
