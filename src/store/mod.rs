mod models;
mod schema;
mod sqlite_mood_store;

pub use models::*;
pub use schema::MOOD_VERSIONED_SCHEMAS;
pub use sqlite_mood_store::SqliteMoodStore;

use crate::fusion::{default_rules, load_rules_from_file, FusionRule};
use anyhow::{Context, Result};
use std::path::Path;
use tracing::info;

/// Default file name of the mood database inside the database directory.
pub const MOOD_DB_FILE_NAME: &str = "mood.db";

pub trait FusionRuleStore: Send + Sync {
    /// All rules in insertion order.
    fn list_rules(&self) -> Result<Vec<FusionRule>>;
    fn count_rules(&self) -> Result<usize>;
    /// Inserts `rules` in one transaction. With `replace` the existing rules
    /// are deleted first, otherwise an existing pair makes the import fail.
    fn import_rules(&self, rules: &[FusionRule], replace: bool) -> Result<usize>;
}

pub trait AnalysisStore: Send + Sync {
    /// Records a completed analysis and returns its id.
    fn append(&self, analysis: &NewAnalysis) -> Result<i64>;
    /// Most recent first, ties broken by id.
    fn list_recent(&self, limit: usize) -> Result<Vec<AnalysisRecord>>;
    fn get(&self, id: i64) -> Result<Option<AnalysisRecord>>;
}

/// Imports the seed rules when the rule table is empty, from `seed_file` or
/// the built-in seed. Returns how many rules were imported.
pub fn seed_if_empty(store: &dyn FusionRuleStore, seed_file: Option<&Path>) -> Result<usize> {
    let existing = store.count_rules()?;
    if existing > 0 {
        info!("Fusion matrix already holds {} rules, skipping seed", existing);
        return Ok(0);
    }

    let rules = match seed_file {
        Some(path) => {
            info!("Seeding fusion matrix from {:?}", path);
            load_rules_from_file(path)
                .with_context(|| format!("Failed to load seed file {:?}", path))?
        }
        None => {
            info!("Seeding fusion matrix from the built-in rules");
            default_rules().context("Built-in seed is invalid")?
        }
    };
    store.import_rules(&rules, false)
}
