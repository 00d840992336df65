//! Mood Fusion Server Library
//!
//! Fuses the emotion heard in a voice recording with the emotion of what was
//! said into a single mood. Exposes the internal modules for the binaries and
//! the end-to-end tests.

pub mod analysis;
pub mod audio;
pub mod config;
pub mod emotion;
pub mod fusion;
pub mod server;
pub mod sqlite_persistence;
pub mod store;
pub mod transcription;

#[cfg(test)]
mod test_support;

// Re-export commonly used types for convenience
pub use analysis::{AnalysisPipeline, MoodAnalysis, PersistencePolicy};
pub use fusion::{FusionMatrix, FusionRule, MoodVerdict};
pub use server::{make_app, run_server, RequestsLoggingLevel};
pub use store::{AnalysisStore, FusionRuleStore, SqliteMoodStore};
