pub mod batch;
pub mod classify;
pub mod quality;
pub mod scan;
pub mod transcript;

pub use batch::*;
pub use classify::*;
pub use quality::*;
pub use scan::*;
pub use transcript::*;

use thiserror::Error;

use crate::lexicon::LexiconError;

/// Errors surfaced by the authoring pipeline. Decode problems never appear
/// here: invalid UTF-8 is replaced and malformed timestamps are dropped,
/// neither is fatal.
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Lexicon error: {0}")]
    Lexicon(#[from] LexiconError),

    #[error("Not a directory: {0}")]
    NotADirectory(String),
}
