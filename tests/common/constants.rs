//! Shared constants for end-to-end tests
//!
//! Uploads are fake audio: the stub transcriber reads the file content as
//! the transcript and the stub audio classifier takes the file stem as the
//! heard emotion. See `fixtures.rs`.

// ============================================================================
// Timing
// ============================================================================

pub const SERVER_READY_TIMEOUT_MS: u64 = 5000;
pub const SERVER_READY_POLL_INTERVAL_MS: u64 = 20;
pub const REQUEST_TIMEOUT_SECS: u64 = 10;

// ============================================================================
// Uploads
// ============================================================================

/// Audio classified as happy.
pub const HAPPY_VOICE_FILE: &str = "happy.wav";

/// Audio classified as angry.
pub const ANGRY_VOICE_FILE: &str = "angry.mp3";

/// Audio classified as neutral.
pub const NEUTRAL_VOICE_FILE: &str = "neutral.webm";

/// Audio whose classifier call fails.
pub const UNREACHABLE_VOICE_FILE: &str = "unreachable.wav";

/// Transcript the stub text classifier reads as happy.
pub const HAPPY_WORDS: &str = "What a wonderful day, I love it";

/// Transcript the stub text classifier reads as sad.
pub const SAD_WORDS: &str = "I miss her so much";

/// Transcript the stub text classifier reads as angry.
pub const ANGRY_WORDS: &str = "This is unacceptable, I am furious";

/// Upload limit used by servers that test the size check.
pub const SMALL_UPLOAD_LIMIT_BYTES: usize = 1024;

// ============================================================================
// Fusion matrix
// ============================================================================

pub const BUILT_IN_RULE_COUNT: usize = 49;
pub const NEUTRAL_FALLBACK_DESCRIPTION: &str =
    "No exact match found, defaulting to neutral mood.";
