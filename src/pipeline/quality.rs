//! Conversation quality scoring.
//!
//! Seven independent factors accumulate an integer score over the full message
//! set. The weights and thresholds are the frozen contract of this corpus;
//! they define what "quality" means here and must not be retuned casually.
//! Scoring uses only text, lengths, counts, and timestamps; roles are not
//! consulted.

use std::collections::HashSet;

use chrono::NaiveDateTime;

use crate::lexicon::Lexicons;
use crate::models::{Message, QualityMetrics};

/// Timestamp formats tried in order; the first that parses wins.
const TIMESTAMP_FORMATS: [&str; 3] = [
    "%m/%d/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
];

/// Cap on the question-count score contribution.
const MAX_QUESTION_SCORE: i64 = 20;

/// Score one conversation. Fails fast with score 0 and default metrics when
/// there are fewer than two messages; ratios would be meaningless there.
/// Negative intermediate sums are allowed; the clamp to zero happens once,
/// at the end.
pub fn score_conversation(messages: &[Message], lexicons: &Lexicons) -> (u32, QualityMetrics) {
    if messages.len() < 2 {
        return (0, QualityMetrics::default());
    }

    let mut score: i64 = 0;
    let mut metrics = QualityMetrics {
        message_count: messages.len(),
        ..Default::default()
    };

    // 1. Message count bucket.
    score += match messages.len() {
        n if n >= 10 => 20,
        n if n >= 5 => 10,
        n if n >= 3 => 5,
        _ => 0,
    };

    // 2. Average body length, avoiding too short or too long.
    let total_length: usize = messages.iter().map(|m| m.body.chars().count()).sum();
    let avg_length = total_length as f64 / messages.len() as f64;
    metrics.avg_message_length = avg_length;
    if (20.0..=200.0).contains(&avg_length) {
        score += 15;
    } else if (10.0..=300.0).contains(&avg_length) {
        score += 10;
    }

    // 3. Question signal.
    let question_count = messages
        .iter()
        .filter(|m| {
            let lower = m.body.to_lowercase();
            lexicons.question_cues.iter().any(|cue| lower.contains(cue.as_str()))
        })
        .count() as i64;
    if question_count > 0 {
        metrics.has_questions = true;
        score += (question_count * 5).min(MAX_QUESTION_SCORE);
    }

    // 4. Template ratio penalty for heavily templated conversations.
    let template_count = messages
        .iter()
        .filter(|m| {
            let lower = m.body.to_lowercase();
            lexicons
                .scoring_template_indicators
                .iter()
                .any(|ind| lower.contains(ind.as_str()))
        })
        .count();
    metrics.template_ratio = template_count as f64 / messages.len() as f64;
    if metrics.template_ratio < 0.3 {
        score += 15;
    } else if metrics.template_ratio < 0.5 {
        score += 10;
    } else {
        score -= 10;
    }

    // 5. Conversation flow: length variety suggests real back-and-forth.
    // Only evaluated for conversations of at least four messages.
    if messages.len() >= 4 {
        let lengths: Vec<usize> = messages.iter().map(|m| m.body.chars().count()).collect();
        let max = lengths.iter().copied().max().unwrap_or(0);
        let min = lengths.iter().copied().min().unwrap_or(0);
        if max - min > 50 {
            score += 10;
            metrics.conversation_flow = true;
        }
    }

    // 6. Unique content ratio.
    let unique: HashSet<&str> = messages.iter().map(|m| m.body.as_str()).collect();
    metrics.unique_content_ratio = unique.len() as f64 / messages.len() as f64;
    if metrics.unique_content_ratio > 0.8 {
        score += 10;
    } else if metrics.unique_content_ratio > 0.6 {
        score += 5;
    }

    // 7. Time span: prefer conversations that unfold over a reasonable
    // window. Unparsable timestamps are excluded, never fatal.
    let timestamps: Vec<NaiveDateTime> = messages
        .iter()
        .filter_map(|m| parse_timestamp(&m.raw_timestamp))
        .collect();
    if timestamps.len() >= 2 {
        let max = timestamps.iter().max().copied();
        let min = timestamps.iter().min().copied();
        if let (Some(max), Some(min)) = (max, min) {
            let hours = (max - min).num_seconds() as f64 / 3600.0;
            metrics.time_span_hours = hours;
            if (0.5..=48.0).contains(&hours) {
                score += 10;
            } else if (0.1..=168.0).contains(&hours) {
                score += 5;
            }
        }
    }

    (score.max(0) as u32, metrics)
}

/// Try each known format in order; the first success wins.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
}
