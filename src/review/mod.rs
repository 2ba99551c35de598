pub mod catalog;
pub mod export;
pub mod overlay;
pub mod store;

pub use catalog::*;
pub use export::*;
pub use overlay::*;
pub use store::*;

use thiserror::Error;

use crate::pipeline::ScanError;

/// Errors surfaced by the review/export path.
#[derive(Error, Debug)]
pub enum ReviewError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Scan error: {0}")]
    Scan(#[from] ScanError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
