//! Score assembly and pipeline results
//!
//! - Symbolic score model and builder
//! - Transcription result and metadata

pub mod metadata;
pub mod result;
pub mod score;

pub use score::{Score, ScoreBuilder, ScoreNote};
