//! convosift sifts exported chat transcripts into review batches and
//! fine-tuning data.
//!
//! The authoring path parses raw transcripts, classifies each message's
//! speaker role, scores conversation quality, and writes textual review
//! batches. The review path re-extracts conversations from those batches,
//! applies reviewer corrections stored in SQLite, and exports accepted
//! conversations as supervised training pairs.

pub mod config;
pub mod lexicon;
pub mod models;
pub mod pipeline;
pub mod review;
