//! Indicator lexicons consumed by classification and scoring.
//!
//! The lexicons are configuration data, not behavior: roster changes and new
//! indicator phrases never require touching the classifier. A bundled copy
//! ships inside the binary; an external JSON file with the same shape can be
//! loaded instead. Every table must be non-empty; an empty table would make
//! classification silently degenerate, so it is rejected at load time.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LexiconError {
    #[error("Could not read lexicon file {0}: {1}")]
    Read(String, String),

    #[error("Could not parse lexicon data: {0}")]
    Parse(String),

    #[error("Lexicon table '{0}' is empty")]
    EmptyTable(&'static str),
}

/// Immutable indicator tables, injected into the classifier and scorer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lexicons {
    /// Phrases marking automated bot responses (highest precedence).
    pub bot_indicators: Vec<String>,
    /// Phrases marking automated template messages.
    pub template_indicators: Vec<String>,
    /// Known staff aliases; a sender or message mentioning one is an agent.
    pub agent_names: Vec<String>,
    /// Bilingual question cues used by the engagement score factor.
    pub question_cues: Vec<String>,
    /// Broader template set used only for the scoring template-ratio factor.
    pub scoring_template_indicators: Vec<String>,
}

const BUNDLED_LEXICONS: &str = include_str!("../resources/lexicons.json");

impl Lexicons {
    /// Load the lexicons bundled into the binary.
    pub fn bundled() -> Result<Self, LexiconError> {
        let lexicons: Lexicons = serde_json::from_str(BUNDLED_LEXICONS)
            .map_err(|e| LexiconError::Parse(e.to_string()))?;
        lexicons.validate()
    }

    /// Load lexicons from an external JSON file.
    pub fn load(path: &Path) -> Result<Self, LexiconError> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| LexiconError::Read(path.display().to_string(), e.to_string()))?;
        let lexicons: Lexicons =
            serde_json::from_str(&json).map_err(|e| LexiconError::Parse(e.to_string()))?;
        lexicons.validate()
    }

    /// Reject empty tables and normalize every entry to lowercase.
    ///
    /// Matching is case-insensitive everywhere, so lowercasing once here
    /// keeps the per-message hot path to a single `to_lowercase` call.
    fn validate(mut self) -> Result<Self, LexiconError> {
        let tables: [(&'static str, &mut Vec<String>); 5] = [
            ("bot_indicators", &mut self.bot_indicators),
            ("template_indicators", &mut self.template_indicators),
            ("agent_names", &mut self.agent_names),
            ("question_cues", &mut self.question_cues),
            (
                "scoring_template_indicators",
                &mut self.scoring_template_indicators,
            ),
        ];

        for (name, table) in tables {
            if table.is_empty() {
                return Err(LexiconError::EmptyTable(name));
            }
            for entry in table.iter_mut() {
                *entry = entry.to_lowercase();
            }
        }

        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_lexicons_load() {
        let lexicons = Lexicons::bundled().unwrap();
        assert!(!lexicons.bot_indicators.is_empty());
        assert!(!lexicons.agent_names.is_empty());
        assert!(lexicons.question_cues.contains(&"?".to_string()));
    }

    #[test]
    fn bundled_entries_are_lowercase() {
        let lexicons = Lexicons::bundled().unwrap();
        for entry in &lexicons.agent_names {
            assert_eq!(entry, &entry.to_lowercase());
        }
    }

    #[test]
    fn empty_table_rejected() {
        let json = r#"{
            "bot_indicators": [],
            "template_indicators": ["template"],
            "agent_names": ["rona"],
            "question_cues": ["?"],
            "scoring_template_indicators": ["template"]
        }"#;
        let lexicons: Lexicons = serde_json::from_str(json).unwrap();
        let err = lexicons.validate().unwrap_err();
        assert!(matches!(err, LexiconError::EmptyTable("bot_indicators")));
    }

    #[test]
    fn load_missing_file_errors() {
        let err = Lexicons::load(Path::new("/nonexistent/lexicons.json")).unwrap_err();
        assert!(matches!(err, LexiconError::Read(_, _)));
    }
}
