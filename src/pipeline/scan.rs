//! Corpus scan: the authoring path end to end.
//!
//! Walks a directory of `*.txt` transcripts, parses, classifies, and scores
//! each file independently, keeps conversations with a positive score, sorts
//! by quality descending, and writes the quality report artifact plus the
//! review batch files. Per-file failures are recorded with their kind and
//! never abort the run.

use std::path::{Path, PathBuf};

use crate::config;
use crate::lexicon::Lexicons;
use crate::models::{Conversation, QualityReportEntry};
use crate::pipeline::batch::serialize_batch;
use crate::pipeline::classify::RoleClassifier;
use crate::pipeline::quality::score_conversation;
use crate::pipeline::transcript::read_transcript;
use crate::pipeline::ScanError;

/// A file that could not be processed, with the error kind recorded.
#[derive(Debug)]
pub struct ScanFailure {
    pub path: PathBuf,
    pub error: ScanError,
}

/// Result of scanning one directory: scored conversations plus the typed
/// failures the caller may want to report.
#[derive(Debug, Default)]
pub struct ScanOutcome {
    pub conversations: Vec<Conversation>,
    pub failures: Vec<ScanFailure>,
}

/// Summary of a full analyze run.
#[derive(Debug)]
pub struct AnalyzeSummary {
    pub files_seen: usize,
    pub conversations_kept: usize,
    pub batches_written: usize,
    pub failures: Vec<ScanFailure>,
}

/// Scan every `*.txt` file under `chat_dir`. Conversations scoring zero
/// (including files with fewer than two messages) are dropped; unreadable
/// files are recorded as failures and skipped.
pub fn scan_directory(chat_dir: &Path, lexicons: &Lexicons) -> Result<ScanOutcome, ScanError> {
    if !chat_dir.is_dir() {
        return Err(ScanError::NotADirectory(chat_dir.display().to_string()));
    }

    let classifier = RoleClassifier::new(lexicons);
    let mut outcome = ScanOutcome::default();

    let mut paths: Vec<PathBuf> = std::fs::read_dir(chat_dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.extension().is_some_and(|ext| ext == "txt"))
        .collect();
    paths.sort();

    tracing::info!("Scanning {} transcript files in {}", paths.len(), chat_dir.display());

    for path in paths {
        match read_transcript(&path) {
            Ok(mut messages) => {
                classifier.classify_messages(&mut messages);
                let (quality_score, metrics) = score_conversation(&messages, lexicons);
                if quality_score == 0 {
                    continue;
                }
                let filename = path
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_default();
                outcome.conversations.push(Conversation {
                    filename,
                    messages,
                    quality_score,
                    metrics,
                });
            }
            Err(error) => {
                tracing::warn!("Skipping {}: {error}", path.display());
                outcome.failures.push(ScanFailure { path, error });
            }
        }
    }

    Ok(outcome)
}

/// Full authoring run: scan, rank, truncate to the top `top` conversations,
/// write the quality report and the batch files into `out_dir`.
pub fn analyze_corpus(
    chat_dir: &Path,
    out_dir: &Path,
    lexicons: &Lexicons,
    top: usize,
) -> Result<AnalyzeSummary, ScanError> {
    let outcome = scan_directory(chat_dir, lexicons)?;
    let files_seen = outcome.conversations.len() + outcome.failures.len();

    let mut conversations = outcome.conversations;
    // Stable sort: equal scores keep scan order.
    conversations.sort_by(|a, b| b.quality_score.cmp(&a.quality_score));
    conversations.truncate(top);

    std::fs::create_dir_all(out_dir)?;
    write_quality_report(out_dir, &conversations)?;
    let batches_written = write_batches(out_dir, &conversations)?;

    tracing::info!(
        "Kept {} of {} files; wrote {} batch files to {}",
        conversations.len(),
        files_seen,
        batches_written,
        out_dir.display(),
    );

    Ok(AnalyzeSummary {
        files_seen,
        conversations_kept: conversations.len(),
        batches_written,
        failures: outcome.failures,
    })
}

/// Write `quality_analysis_report.json` for the ranked conversations.
pub fn write_quality_report(
    out_dir: &Path,
    conversations: &[Conversation],
) -> Result<(), ScanError> {
    let entries: Vec<QualityReportEntry> =
        conversations.iter().map(QualityReportEntry::from).collect();
    let json = serde_json::to_string_pretty(&entries)?;
    std::fs::write(out_dir.join(config::QUALITY_REPORT_FILENAME), json)?;
    Ok(())
}

/// Write `conversations_batch_NN.txt` files of `config::BATCH_SIZE`
/// conversations each. Returns the number of batch files written.
pub fn write_batches(out_dir: &Path, conversations: &[Conversation]) -> Result<usize, ScanError> {
    let mut batches_written = 0;
    for (chunk_index, chunk) in conversations.chunks(config::BATCH_SIZE).enumerate() {
        let batch_number = chunk_index + 1;
        let start_ordinal = chunk_index * config::BATCH_SIZE + 1;
        let content = serialize_batch(batch_number, start_ordinal, chunk);
        let path = out_dir.join(format!("conversations_batch_{batch_number:02}.txt"));
        std::fs::write(path, content)?;
        batches_written += 1;
    }
    Ok(batches_written)
}

#[cfg(test)]
mod tests {
    use super::*;

    const GOOD_CHAT: &str = "\
[01/01/2024 10:00:00] John: Hello, do you have availability for tonight?
[01/01/2024 10:05:00] Rona: Yes we do, what time would suit you best?
[01/01/2024 11:00:00] John: Around eight in the evening, party of four
[01/01/2024 11:05:00] Rona: Done, we look forward to welcoming you all";

    fn corpus() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("good.txt"), GOOD_CHAT).unwrap();
        // Single-message file: scores zero and is dropped.
        std::fs::write(dir.path().join("thin.txt"), "[ts] lone message\n").unwrap();
        // Not a transcript shape at all: zero messages, dropped.
        std::fs::write(dir.path().join("noise.txt"), "no brackets anywhere\n").unwrap();
        // Non-txt files are never scanned.
        std::fs::write(dir.path().join("ignore.csv"), "a,b,c\n").unwrap();
        dir
    }

    #[test]
    fn scan_keeps_only_positive_scores() {
        let lexicons = Lexicons::bundled().unwrap();
        let dir = corpus();

        let outcome = scan_directory(dir.path(), &lexicons).unwrap();
        assert_eq!(outcome.conversations.len(), 1);
        assert_eq!(outcome.conversations[0].filename, "good.txt");
        assert!(outcome.conversations[0].quality_score > 0);
        assert!(outcome.failures.is_empty());
    }

    #[test]
    fn scan_rejects_non_directory() {
        let lexicons = Lexicons::bundled().unwrap();
        let err = scan_directory(Path::new("/nonexistent/chats"), &lexicons).unwrap_err();
        assert!(matches!(err, ScanError::NotADirectory(_)));
    }

    #[test]
    fn analyze_writes_report_and_batches() {
        let lexicons = Lexicons::bundled().unwrap();
        let dir = corpus();
        let out = tempfile::tempdir().unwrap();

        let summary = analyze_corpus(dir.path(), out.path(), &lexicons, 5000).unwrap();
        assert_eq!(summary.conversations_kept, 1);
        assert_eq!(summary.batches_written, 1);

        let report = out.path().join(config::QUALITY_REPORT_FILENAME);
        let entries: Vec<QualityReportEntry> =
            serde_json::from_str(&std::fs::read_to_string(report).unwrap()).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].filename, "good.txt");
        assert_eq!(entries[0].message_count, 4);

        let batch = out.path().join("conversations_batch_01.txt");
        let content = std::fs::read_to_string(batch).unwrap();
        assert!(content.contains("CONVERSATION 1 - File: good.txt"));
    }

    #[test]
    fn analyze_ranks_by_score_descending() {
        let lexicons = Lexicons::bundled().unwrap();
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("long.txt"), GOOD_CHAT).unwrap();
        // Two messages only, scores lower than the four-message chat.
        std::fs::write(
            dir.path().join("short.txt"),
            "[01/01/2024 10:00:00] Maya: Is the terrace open today?\n\
             [01/01/2024 10:30:00] Soha: It is, come by any time\n",
        )
        .unwrap();
        let out = tempfile::tempdir().unwrap();

        analyze_corpus(dir.path(), out.path(), &lexicons, 5000).unwrap();
        let report = out.path().join(config::QUALITY_REPORT_FILENAME);
        let entries: Vec<QualityReportEntry> =
            serde_json::from_str(&std::fs::read_to_string(report).unwrap()).unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries[0].quality_score >= entries[1].quality_score);
        assert_eq!(entries[0].filename, "long.txt");
    }

    #[test]
    fn top_limit_truncates() {
        let lexicons = Lexicons::bundled().unwrap();
        let dir = tempfile::tempdir().unwrap();
        for i in 0..3 {
            std::fs::write(dir.path().join(format!("c{i}.txt")), GOOD_CHAT).unwrap();
        }
        let out = tempfile::tempdir().unwrap();

        let summary = analyze_corpus(dir.path(), out.path(), &lexicons, 2).unwrap();
        assert_eq!(summary.conversations_kept, 2);
    }
}
