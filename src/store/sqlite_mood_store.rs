use super::models::{AnalysisRecord, NewAnalysis};
use super::schema::MOOD_VERSIONED_SCHEMAS;
use super::{AnalysisStore, FusionRuleStore};
use crate::fusion::FusionRule;
use crate::sqlite_persistence::BASE_DB_VERSION;
use anyhow::{bail, Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::info;

const ANALYSIS_COLUMNS: &str = "id, created_at, transcribed_text, audio_emotion, audio_confidence, \
     text_emotion, text_confidence, final_mood, emoji, description";

#[derive(Clone, Debug)]
pub struct SqliteMoodStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteMoodStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let path = db_path.as_ref();
        let is_new_db = !path.exists();

        let mut conn = Connection::open(path).context("Failed to open mood database")?;

        if is_new_db {
            info!("Creating new mood database at {:?}", path);
            Self::latest_schema()?.create(&conn)?;
        } else {
            Self::check_and_migrate(&mut conn)?;
        }

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Fresh database with the latest schema, used by tests and tools.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::latest_schema()?.create(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn latest_schema() -> Result<&'static crate::sqlite_persistence::VersionedSchema> {
        MOOD_VERSIONED_SCHEMAS
            .last()
            .context("No mood database schema defined")
    }

    fn check_and_migrate(conn: &mut Connection) -> Result<()> {
        let raw_version: i64 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
        let db_version = raw_version - BASE_DB_VERSION as i64;

        if db_version < 1 {
            bail!(
                "Mood database version {} is invalid (expected >= 1)",
                db_version
            );
        }

        let version_index = MOOD_VERSIONED_SCHEMAS
            .iter()
            .position(|s| s.version == db_version as usize)
            .with_context(|| format!("Unknown mood database version {}", db_version))?;
        MOOD_VERSIONED_SCHEMAS[version_index]
            .validate(conn)
            .with_context(|| {
                format!(
                    "Mood database schema validation failed for version {}",
                    db_version
                )
            })?;

        let current_version = Self::latest_schema()?.version;
        if (db_version as usize) < current_version {
            info!(
                "Migrating mood database from version {} to {}",
                db_version, current_version
            );
            Self::migrate_if_needed(conn, db_version as usize)?;
        }
        Ok(())
    }

    fn migrate_if_needed(conn: &mut Connection, from_version: usize) -> Result<()> {
        let tx = conn.transaction()?;
        let mut latest_from = from_version;
        for schema in MOOD_VERSIONED_SCHEMAS
            .iter()
            .filter(|s| s.version > from_version)
        {
            if let Some(migration_fn) = schema.migration {
                migration_fn(&tx).with_context(|| {
                    format!("Failed to run migration to version {}", schema.version)
                })?;
            }
            latest_from = schema.version;
        }
        tx.execute(
            &format!("PRAGMA user_version = {}", BASE_DB_VERSION + latest_from),
            [],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow::anyhow!("Mood database connection lock poisoned"))
    }

    fn format_datetime(dt: &DateTime<Utc>) -> String {
        // Fixed precision keeps the text column sortable
        dt.to_rfc3339_opts(SecondsFormat::Micros, true)
    }

    fn row_to_rule(row: &rusqlite::Row) -> rusqlite::Result<FusionRule> {
        Ok(FusionRule {
            audio_emotion: row.get("audio_emotion")?,
            text_emotion: row.get("text_emotion")?,
            final_mood: row.get("final_mood")?,
            emoji: row.get("emoji")?,
            description: row
                .get::<_, Option<String>>("description")?
                .unwrap_or_default(),
        })
    }

    fn row_to_record(row: &rusqlite::Row) -> rusqlite::Result<AnalysisRecord> {
        let created_at_str: String = row.get("created_at")?;
        let created_at = DateTime::parse_from_rfc3339(&created_at_str)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    1,
                    rusqlite::types::Type::Text,
                    Box::new(e),
                )
            })?;

        Ok(AnalysisRecord {
            id: row.get("id")?,
            created_at,
            transcribed_text: row.get("transcribed_text")?,
            audio_emotion: row.get("audio_emotion")?,
            audio_confidence: row.get("audio_confidence")?,
            text_emotion: row.get("text_emotion")?,
            text_confidence: row.get("text_confidence")?,
            final_mood: row.get("final_mood")?,
            emoji: row.get("emoji")?,
            description: row
                .get::<_, Option<String>>("description")?
                .unwrap_or_default(),
        })
    }

    fn append_at(&self, analysis: &NewAnalysis, created_at: &DateTime<Utc>) -> Result<i64> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO voice_analysis (created_at, transcribed_text, audio_emotion, audio_confidence, \
             text_emotion, text_confidence, final_mood, emoji, description) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                Self::format_datetime(created_at),
                analysis.transcribed_text,
                analysis.audio_emotion,
                analysis.audio_confidence,
                analysis.text_emotion,
                analysis.text_confidence,
                analysis.final_mood,
                analysis.emoji,
                analysis.description,
            ],
        )
        .context("Failed to insert analysis")?;
        Ok(conn.last_insert_rowid())
    }
}

impl FusionRuleStore for SqliteMoodStore {
    fn list_rules(&self) -> Result<Vec<FusionRule>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT audio_emotion, text_emotion, final_mood, emoji, description \
             FROM voice_matrix ORDER BY id ASC",
        )?;
        let rules = stmt
            .query_map([], Self::row_to_rule)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rules)
    }

    fn count_rules(&self) -> Result<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM voice_matrix", [], |r| r.get(0))?;
        Ok(count as usize)
    }

    fn import_rules(&self, rules: &[FusionRule], replace: bool) -> Result<usize> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        if replace {
            let removed = tx.execute("DELETE FROM voice_matrix", [])?;
            info!("Removed {} existing fusion rules", removed);
        }
        {
            let mut stmt = tx.prepare(
                "INSERT INTO voice_matrix (audio_emotion, text_emotion, final_mood, emoji, description) \
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for rule in rules {
                stmt.execute(params![
                    rule.audio_emotion,
                    rule.text_emotion,
                    rule.final_mood,
                    rule.emoji,
                    rule.description,
                ])
                .with_context(|| {
                    format!(
                        "Failed to insert fusion rule ({}, {})",
                        rule.audio_emotion, rule.text_emotion
                    )
                })?;
            }
        }
        tx.commit()?;
        Ok(rules.len())
    }
}

impl AnalysisStore for SqliteMoodStore {
    fn append(&self, analysis: &NewAnalysis) -> Result<i64> {
        self.append_at(analysis, &Utc::now())
    }

    fn list_recent(&self, limit: usize) -> Result<Vec<AnalysisRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM voice_analysis ORDER BY created_at DESC, id DESC LIMIT ?1",
            ANALYSIS_COLUMNS
        ))?;
        let records = stmt
            .query_map(params![limit as i64], Self::row_to_record)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }

    fn get(&self, id: i64) -> Result<Option<AnalysisRecord>> {
        let conn = self.lock()?;
        let record = conn
            .query_row(
                &format!("SELECT {} FROM voice_analysis WHERE id = ?1", ANALYSIS_COLUMNS),
                params![id],
                Self::row_to_record,
            )
            .optional()?;
        Ok(record)
    }
}
