use serde::{Deserialize, Serialize};

use super::message::Message;

/// Metrics accumulated by the quality scorer over one conversation.
///
/// `template_ratio` and `unique_content_ratio` are ratios over
/// `message_count`; they stay at their defaults when the conversation has
/// fewer than two messages and scoring is skipped.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QualityMetrics {
    pub message_count: usize,
    pub avg_message_length: f64,
    pub has_questions: bool,
    pub template_ratio: f64,
    pub unique_content_ratio: f64,
    pub conversation_flow: bool,
    pub time_span_hours: f64,
}

/// One scored, classified conversation. `filename` is the unique id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub filename: String,
    pub messages: Vec<Message>,
    pub quality_score: u32,
    pub metrics: QualityMetrics,
}

/// One row of the quality report artifact exchanged with the review store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityReportEntry {
    pub filename: String,
    pub quality_score: u32,
    pub message_count: usize,
    pub avg_message_length: f64,
    pub has_questions: bool,
    pub template_ratio: f64,
    pub unique_content_ratio: f64,
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

impl From<&Conversation> for QualityReportEntry {
    fn from(conv: &Conversation) -> Self {
        Self {
            filename: conv.filename.clone(),
            quality_score: conv.quality_score,
            message_count: conv.metrics.message_count,
            avg_message_length: round2(conv.metrics.avg_message_length),
            has_questions: conv.metrics.has_questions,
            template_ratio: round2(conv.metrics.template_ratio),
            unique_content_ratio: round2(conv.metrics.unique_content_ratio),
        }
    }
}
