//! SQLite schema for the mood database.

use crate::sqlite_column;
use crate::sqlite_persistence::{Column, SqlType, Table, VersionedSchema};

// =============================================================================
// Version 1 - Fusion matrix and analysis history
// =============================================================================

/// Fusion rules, one row per (audio_emotion, text_emotion) pair.
const VOICE_MATRIX_TABLE_V1: Table = Table {
    name: "voice_matrix",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("audio_emotion", &SqlType::Text, non_null = true),
        sqlite_column!("text_emotion", &SqlType::Text, non_null = true),
        sqlite_column!("final_mood", &SqlType::Text, non_null = true),
        sqlite_column!("emoji", &SqlType::Text, non_null = true),
        sqlite_column!("description", &SqlType::Text),
    ],
    indices: &[],
    unique_constraints: &[&["audio_emotion", "text_emotion"]],
};

/// Every completed analysis, append-only.
const VOICE_ANALYSIS_TABLE_V1: Table = Table {
    name: "voice_analysis",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("created_at", &SqlType::Text, non_null = true), // RFC 3339, UTC
        sqlite_column!("transcribed_text", &SqlType::Text, non_null = true),
        sqlite_column!("audio_emotion", &SqlType::Text, non_null = true),
        sqlite_column!("audio_confidence", &SqlType::Real, non_null = true),
        sqlite_column!("text_emotion", &SqlType::Text, non_null = true),
        sqlite_column!("text_confidence", &SqlType::Real, non_null = true),
        sqlite_column!("final_mood", &SqlType::Text, non_null = true),
        sqlite_column!("emoji", &SqlType::Text, non_null = true),
        sqlite_column!("description", &SqlType::Text),
    ],
    indices: &[("idx_voice_analysis_created_at", "created_at DESC")],
    unique_constraints: &[],
};

pub const MOOD_VERSIONED_SCHEMAS: &[VersionedSchema] = &[VersionedSchema {
    version: 1,
    tables: &[VOICE_MATRIX_TABLE_V1, VOICE_ANALYSIS_TABLE_V1],
    migration: None,
}];
