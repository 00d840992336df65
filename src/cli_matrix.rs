//! Offline management of the fusion matrix stored in the mood database.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cli_style;

use cli_style::{get_styles, TableBuilder};
use mood_fusion_server::fusion::{
    load_rules_from_file, FusionMatrix, AUDIO_VOCABULARY, TEXT_VOCABULARY,
};
use mood_fusion_server::store::{FusionRuleStore, SqliteMoodStore, MOOD_DB_FILE_NAME};

fn parse_path(s: &str) -> Result<PathBuf> {
    let original_path = PathBuf::from(s);
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
#[command(styles = get_styles())]
struct CliArgs {
    /// Directory holding the mood database.
    #[clap(long, value_parser = parse_path, default_value = ".")]
    pub db_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Shows every rule in the database, in load order.
    List,

    /// Shows the mood a pair of emotions resolves to, and which tier answered.
    Resolve { audio: String, text: String },

    /// Imports the rules of a seed file into the database.
    Import {
        #[clap(value_parser = parse_path)]
        file: PathBuf,

        /// Delete the existing rules first.
        #[clap(long)]
        replace: bool,
    },

    /// Validates a seed file without touching the database.
    Check {
        #[clap(value_parser = parse_path)]
        file: PathBuf,
    },
}

fn open_store(db_dir: &std::path::Path) -> Result<SqliteMoodStore> {
    if !db_dir.is_dir() {
        bail!("Database directory does not exist: {:?}", db_dir);
    }
    SqliteMoodStore::new(db_dir.join(MOOD_DB_FILE_NAME))
}

/// Opens the database for reading, without creating it when it is missing.
fn open_existing_store(db_dir: &std::path::Path) -> Result<SqliteMoodStore> {
    let db_path = db_dir.join(MOOD_DB_FILE_NAME);
    if !db_path.is_file() {
        bail!("No mood database found at {:?}", db_path);
    }
    open_store(db_dir)
}

fn load_matrix(store: &SqliteMoodStore) -> Result<FusionMatrix> {
    Ok(FusionMatrix::from_rules(store.list_rules()?))
}

fn list(store: &SqliteMoodStore) -> Result<()> {
    let matrix = load_matrix(store)?;
    if matrix.is_empty() {
        println!("The fusion matrix is empty.");
        return Ok(());
    }

    let mut table = TableBuilder::new(&["#", "audio", "text", "mood", "emoji"]);
    for (index, rule) in matrix.list_all().iter().enumerate() {
        table.add_row(vec![
            (index + 1).to_string(),
            rule.audio_emotion.clone(),
            rule.text_emotion.clone(),
            rule.final_mood.clone(),
            rule.emoji.clone(),
        ]);
    }
    table.print();
    println!("{} rules", matrix.len());
    Ok(())
}

fn resolve(store: &SqliteMoodStore, audio: &str, text: &str) -> Result<()> {
    let matrix = load_matrix(store)?;
    let resolution = matrix.resolve_with_tier(audio, text);
    println!(
        "{} {} ({})",
        resolution.verdict.final_mood,
        resolution.verdict.emoji,
        resolution.tier.as_str()
    );
    if !resolution.verdict.description.is_empty() {
        println!("{}", resolution.verdict.description);
    }
    Ok(())
}

/// Pairs of the two vocabularies the rules leave to the fallback tiers.
fn uncovered_pairs(matrix: &FusionMatrix) -> Vec<(&'static str, &'static str)> {
    AUDIO_VOCABULARY
        .iter()
        .flat_map(|audio| TEXT_VOCABULARY.iter().map(move |text| (*audio, *text)))
        .filter(|(audio, text)| {
            !matrix
                .list_all()
                .iter()
                .any(|rule| rule.key() == (*audio, *text))
        })
        .collect()
}

fn check(file: &std::path::Path) -> Result<()> {
    let rules = load_rules_from_file(file)
        .with_context(|| format!("Invalid seed file {:?}", file))?;
    let matrix = FusionMatrix::from_rules(rules);
    println!("{:?}: {} valid rules", file, matrix.len());

    let uncovered = uncovered_pairs(&matrix);
    if !uncovered.is_empty() {
        println!(
            "{} vocabulary pairs fall back to the neutral rule:",
            uncovered.len()
        );
        for (audio, text) in uncovered {
            println!("  ({}, {})", audio, text);
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    match cli_args.command {
        Command::Check { file } => check(&file),
        Command::List => list(&open_existing_store(&cli_args.db_dir)?),
        Command::Resolve { audio, text } => {
            resolve(&open_existing_store(&cli_args.db_dir)?, &audio, &text)
        }
        Command::Import { file, replace } => {
            let rules = load_rules_from_file(&file)
                .with_context(|| format!("Invalid seed file {:?}", file))?;
            let store = open_store(&cli_args.db_dir)?;
            let imported = store.import_rules(&rules, replace)?;
            println!(
                "Imported {} rules into {:?}",
                imported,
                cli_args.db_dir.join(MOOD_DB_FILE_NAME)
            );
            Ok(())
        }
    }
}
