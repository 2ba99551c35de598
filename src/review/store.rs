//! SQLite-backed tracking of review status and corrections.
//!
//! Keyed by conversation filename. The core only needs get/put semantics;
//! concurrent writers are last-writer-wins, no versioning. Corrected message
//! lists are stored as opaque JSON text and decoded by the overlay layer so
//! a corrupt value can degrade gracefully instead of failing a query.

use std::path::Path;

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Conversation not found: {0}")]
    NotFound(String),

    #[error("Invalid enum value for {field}: {value}")]
    InvalidEnum { field: String, value: String },

    #[error("Migration failed at version {version}: {reason}")]
    MigrationFailed { version: i64, reason: String },
}

/// Review lifecycle of one conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewStatus {
    Pending,
    Reviewed,
}

impl ReviewStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Reviewed => "reviewed",
        }
    }
}

impl std::str::FromStr for ReviewStatus {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "reviewed" => Ok(Self::Reviewed),
            _ => Err(StoreError::InvalidEnum {
                field: "status".into(),
                value: s.into(),
            }),
        }
    }
}

/// One conversation row as listed for reviewers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewRow {
    pub filename: String,
    pub quality_score: u32,
    pub message_count: usize,
    pub status: ReviewStatus,
    pub reviewer: Option<String>,
    pub notes: Option<String>,
    pub accepted: Option<bool>,
}

/// Per-reviewer counters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewerProgress {
    pub reviewer: String,
    pub total_reviewed: i64,
    pub accepted: i64,
    pub rejected: i64,
    pub last_active: Option<String>,
}

/// Team-wide progress summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressSummary {
    pub team: Vec<ReviewerProgress>,
    pub total_conversations: i64,
    pub total_reviewed: i64,
    pub total_accepted: i64,
    pub progress_percentage: f64,
}

/// An accepted conversation, with its stored overlay JSON if any.
#[derive(Debug, Clone)]
pub struct AcceptedConversation {
    pub filename: String,
    pub corrected_json: Option<String>,
}

pub struct ReviewStore {
    conn: Connection,
}

impl ReviewStore {
    /// Open (or create) the review store at the given path and run migrations.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        configure_pragmas(&conn)?;
        run_migrations(&conn)?;
        Ok(Self { conn })
    }

    /// Open an in-memory store (for testing).
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        configure_pragmas(&conn)?;
        run_migrations(&conn)?;
        Ok(Self { conn })
    }

    /// Seed conversations from catalog entries. Existing rows keep their
    /// review state (INSERT OR IGNORE). Returns the number of new rows.
    pub fn seed(&self, entries: &[crate::models::QualityReportEntry]) -> Result<usize, StoreError> {
        let mut inserted = 0;
        let mut stmt = self.conn.prepare(
            "INSERT OR IGNORE INTO conversations (filename, quality_score, message_count)
             VALUES (?1, ?2, ?3)",
        )?;
        for entry in entries {
            inserted += stmt.execute(params![
                entry.filename,
                entry.quality_score,
                entry.message_count as i64,
            ])?;
        }
        tracing::info!("Seeded {inserted} new conversations into the review store");
        Ok(inserted)
    }

    /// Page through conversations in a given status, best quality first.
    /// Returns the page and the total count in that status.
    pub fn list_by_status(
        &self,
        status: ReviewStatus,
        limit: usize,
        offset: usize,
    ) -> Result<(Vec<ReviewRow>, i64), StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT filename, quality_score, message_count, status, reviewer, notes, accepted
             FROM conversations
             WHERE status = ?1
             ORDER BY quality_score DESC, message_count DESC
             LIMIT ?2 OFFSET ?3",
        )?;
        let rows = stmt
            .query_map(params![status.as_str(), limit as i64, offset as i64], |row| {
                Ok(ReviewRow {
                    filename: row.get(0)?,
                    quality_score: row.get::<_, i64>(1)? as u32,
                    message_count: row.get::<_, i64>(2)? as usize,
                    status: row
                        .get::<_, String>(3)?
                        .parse()
                        .unwrap_or(ReviewStatus::Pending),
                    reviewer: row.get(4)?,
                    notes: row.get(5)?,
                    accepted: row.get(6)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let total: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM conversations WHERE status = ?1",
            params![status.as_str()],
            |row| row.get(0),
        )?;

        Ok((rows, total))
    }

    /// Record a review verdict and bump the reviewer's progress counters.
    pub fn submit_review(
        &self,
        filename: &str,
        reviewer: &str,
        accepted: bool,
        notes: &str,
        corrected_json: Option<&str>,
    ) -> Result<(), StoreError> {
        let now = Utc::now().to_rfc3339();
        let changed = self.conn.execute(
            "UPDATE conversations
             SET status = 'reviewed', reviewer = ?1, reviewed_at = ?2,
                 accepted = ?3, notes = ?4,
                 corrected_messages = COALESCE(?5, corrected_messages)
             WHERE filename = ?6",
            params![reviewer, now, accepted, notes, corrected_json, filename],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(filename.to_string()));
        }

        self.conn.execute(
            "INSERT INTO team_progress (reviewer, total_reviewed, accepted, rejected, last_active)
             VALUES (?1, 1, ?2, ?3, ?4)
             ON CONFLICT(reviewer) DO UPDATE SET
                 total_reviewed = total_reviewed + 1,
                 accepted = accepted + excluded.accepted,
                 rejected = rejected + excluded.rejected,
                 last_active = excluded.last_active",
            params![reviewer, accepted as i64, (!accepted) as i64, now],
        )?;

        Ok(())
    }

    /// Raw corrected-messages JSON for a filename, if any was stored.
    pub fn corrected_json(&self, filename: &str) -> Result<Option<String>, StoreError> {
        let value: Option<Option<String>> = self
            .conn
            .query_row(
                "SELECT corrected_messages FROM conversations WHERE filename = ?1",
                params![filename],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value.flatten())
    }

    /// Store (or replace) the corrected-messages JSON for a filename.
    /// Last writer wins.
    pub fn save_corrected_json(&self, filename: &str, json: &str) -> Result<(), StoreError> {
        let changed = self.conn.execute(
            "UPDATE conversations SET corrected_messages = ?1 WHERE filename = ?2",
            params![json, filename],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(filename.to_string()));
        }
        Ok(())
    }

    /// All accepted, reviewed conversations with their overlay JSON.
    pub fn accepted(&self) -> Result<Vec<AcceptedConversation>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT filename, corrected_messages FROM conversations
             WHERE accepted = 1 AND status = 'reviewed'
             ORDER BY quality_score DESC, message_count DESC",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok(AcceptedConversation {
                    filename: row.get(0)?,
                    corrected_json: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Team-wide progress statistics.
    pub fn team_progress(&self) -> Result<ProgressSummary, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT reviewer, total_reviewed, accepted, rejected, last_active
             FROM team_progress ORDER BY reviewer",
        )?;
        let team = stmt
            .query_map([], |row| {
                Ok(ReviewerProgress {
                    reviewer: row.get(0)?,
                    total_reviewed: row.get(1)?,
                    accepted: row.get(2)?,
                    rejected: row.get(3)?,
                    last_active: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let total_conversations: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM conversations", [], |row| row.get(0))?;
        let total_reviewed: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM conversations WHERE status = 'reviewed'",
            [],
            |row| row.get(0),
        )?;
        let total_accepted: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM conversations WHERE accepted = 1",
            [],
            |row| row.get(0),
        )?;

        let progress_percentage = if total_conversations > 0 {
            (total_reviewed as f64 / total_conversations as f64 * 1000.0).round() / 10.0
        } else {
            0.0
        };

        Ok(ProgressSummary {
            team,
            total_conversations,
            total_reviewed,
            total_accepted,
            progress_percentage,
        })
    }
}

fn configure_pragmas(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(
        "PRAGMA journal_mode=DELETE;
         PRAGMA foreign_keys=ON;",
    )?;
    Ok(())
}

/// Run all pending migrations.
fn run_migrations(conn: &Connection) -> Result<(), StoreError> {
    let current_version = get_current_version(conn);

    let migrations: Vec<(i64, &str)> = vec![(
        1,
        include_str!("../../resources/migrations/001_initial.sql"),
    )];

    for (version, sql) in migrations {
        if version > current_version {
            tracing::info!("Running migration v{version}");
            conn.execute_batch(sql).map_err(|e| StoreError::MigrationFailed {
                version,
                reason: e.to_string(),
            })?;
        }
    }

    Ok(())
}

/// Current schema version (0 if no schema exists yet).
fn get_current_version(conn: &Connection) -> i64 {
    conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| {
        row.get::<_, i64>(0)
    })
    .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::QualityReportEntry;

    fn entry(filename: &str, score: u32, count: usize) -> QualityReportEntry {
        QualityReportEntry {
            filename: filename.into(),
            quality_score: score,
            message_count: count,
            avg_message_length: 40.0,
            has_questions: true,
            template_ratio: 0.1,
            unique_content_ratio: 0.9,
        }
    }

    fn seeded_store() -> ReviewStore {
        let store = ReviewStore::open_in_memory().unwrap();
        store
            .seed(&[
                entry("a.txt", 70, 12),
                entry("b.txt", 55, 6),
                entry("c.txt", 55, 9),
            ])
            .unwrap();
        store
    }

    #[test]
    fn migrations_create_schema() {
        let store = ReviewStore::open_in_memory().unwrap();
        let version = get_current_version(&store.conn);
        assert_eq!(version, 1);
    }

    #[test]
    fn migration_idempotent() {
        let store = ReviewStore::open_in_memory().unwrap();
        assert!(run_migrations(&store.conn).is_ok());
    }

    #[test]
    fn seed_is_idempotent_and_preserves_state() {
        let store = seeded_store();
        store
            .submit_review("a.txt", "dana", true, "solid", None)
            .unwrap();

        let inserted = store.seed(&[entry("a.txt", 99, 99)]).unwrap();
        assert_eq!(inserted, 0, "re-seeding must not overwrite existing rows");

        let (rows, _) = store.list_by_status(ReviewStatus::Reviewed, 10, 0).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].quality_score, 70, "original score kept");
    }

    #[test]
    fn listing_orders_by_score_then_count() {
        let store = seeded_store();
        let (rows, total) = store.list_by_status(ReviewStatus::Pending, 10, 0).unwrap();
        assert_eq!(total, 3);
        let names: Vec<&str> = rows.iter().map(|r| r.filename.as_str()).collect();
        // Equal scores tie-break on message_count descending.
        assert_eq!(names, vec!["a.txt", "c.txt", "b.txt"]);
    }

    #[test]
    fn listing_paginates() {
        let store = seeded_store();
        let (page, total) = store.list_by_status(ReviewStatus::Pending, 2, 2).unwrap();
        assert_eq!(total, 3);
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].filename, "b.txt");
    }

    #[test]
    fn review_updates_status_and_progress() {
        let store = seeded_store();
        store
            .submit_review("a.txt", "dana", true, "keep", None)
            .unwrap();
        store
            .submit_review("b.txt", "dana", false, "templated", None)
            .unwrap();

        let (pending, _) = store.list_by_status(ReviewStatus::Pending, 10, 0).unwrap();
        assert_eq!(pending.len(), 1);

        let progress = store.team_progress().unwrap();
        assert_eq!(progress.total_conversations, 3);
        assert_eq!(progress.total_reviewed, 2);
        assert_eq!(progress.total_accepted, 1);
        assert_eq!(progress.progress_percentage, 66.7);
        assert_eq!(progress.team.len(), 1);
        assert_eq!(progress.team[0].total_reviewed, 2);
        assert_eq!(progress.team[0].accepted, 1);
        assert_eq!(progress.team[0].rejected, 1);
    }

    #[test]
    fn review_of_unknown_file_errors() {
        let store = seeded_store();
        let err = store
            .submit_review("ghost.txt", "dana", true, "", None)
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[test]
    fn corrected_json_round_trip() {
        let store = seeded_store();
        assert_eq!(store.corrected_json("a.txt").unwrap(), None);

        store.save_corrected_json("a.txt", r#"[{"x":1}]"#).unwrap();
        assert_eq!(
            store.corrected_json("a.txt").unwrap().as_deref(),
            Some(r#"[{"x":1}]"#)
        );

        // Last writer wins.
        store.save_corrected_json("a.txt", r#"[{"x":2}]"#).unwrap();
        assert_eq!(
            store.corrected_json("a.txt").unwrap().as_deref(),
            Some(r#"[{"x":2}]"#)
        );
    }

    #[test]
    fn corrected_json_missing_row() {
        let store = seeded_store();
        assert_eq!(store.corrected_json("ghost.txt").unwrap(), None);
        assert!(store.save_corrected_json("ghost.txt", "[]").is_err());
    }

    #[test]
    fn accepted_lists_only_accepted_reviewed() {
        let store = seeded_store();
        store.submit_review("a.txt", "dana", true, "", None).unwrap();
        store.submit_review("b.txt", "omar", false, "", None).unwrap();

        let accepted = store.accepted().unwrap();
        assert_eq!(accepted.len(), 1);
        assert_eq!(accepted[0].filename, "a.txt");
    }

    #[test]
    fn review_can_attach_corrections() {
        let store = seeded_store();
        store
            .submit_review("a.txt", "dana", true, "", Some("[]"))
            .unwrap();
        assert_eq!(store.corrected_json("a.txt").unwrap().as_deref(), Some("[]"));

        // A later review without corrections keeps the stored overlay.
        store
            .submit_review("a.txt", "omar", true, "second pass", None)
            .unwrap();
        assert_eq!(store.corrected_json("a.txt").unwrap().as_deref(), Some("[]"));
    }

    #[test]
    fn opens_on_disk_idempotently() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reviews.db");
        {
            let store = ReviewStore::open(&path).unwrap();
            store.seed(&[entry("a.txt", 70, 12)]).unwrap();
        }
        let store = ReviewStore::open(&path).unwrap();
        let (_, total) = store.list_by_status(ReviewStatus::Pending, 10, 0).unwrap();
        assert_eq!(total, 1);
    }
}
