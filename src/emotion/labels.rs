/// Raw audio model classes to canonical audio labels.
pub const AUDIO_SYNONYMS: &[(&str, &str)] = &[
    ("anger", "angry"),
    ("angry", "angry"),
    ("disgust", "disgust"),
    ("fear", "fear"),
    ("fearful", "fear"),
    ("happiness", "happy"),
    ("happy", "happy"),
    ("neutral", "neutral"),
    ("calm", "neutral"),
    ("sadness", "sad"),
    ("sad", "sad"),
    ("surprise", "surprise"),
    ("surprised", "surprise"),
];

/// Raw text model classes to canonical text labels.
pub const TEXT_SYNONYMS: &[(&str, &str)] = &[
    ("anger", "angry"),
    ("disgust", "disgusted"),
    ("fear", "fearful"),
    ("joy", "happy"),
    ("neutral", "neutral"),
    ("sadness", "sad"),
    ("surprise", "surprised"),
];

fn lookup(table: &[(&str, &str)], raw: &str) -> String {
    let raw = raw.trim().to_lowercase();
    table
        .iter()
        .find(|(from, _)| *from == raw)
        .map(|(_, to)| to.to_string())
        .unwrap_or(raw)
}

pub fn canonical_audio_label(raw: &str) -> String {
    lookup(AUDIO_SYNONYMS, raw)
}

pub fn canonical_text_label(raw: &str) -> String {
    lookup(TEXT_SYNONYMS, raw)
}
