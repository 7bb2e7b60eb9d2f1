use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use cnlex::affinity::AffinityTrainer;
use cnlex::config::Config;
use cnlex::lexicon::{Lexicon, LexiconKind};
use cnlex::stats::WordTrainer;
use tracing_subscriber::{fmt, EnvFilter};

use std::path::{Path, PathBuf};
use std::time::Instant;

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Train token dictionaries and affinity tables from a corpus", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Count document frequencies and save the identifier and df dictionaries
    WordTrain {
        /// Training configuration file
        #[arg(long)]
        config: PathBuf,
        /// Corpus root directory
        #[arg(long)]
        corpus: PathBuf,
        /// Lexicon engine for the saved dictionaries
        #[arg(long = "type", default_value = "trie")]
        kind: LexiconKind,
        /// Override a configuration value, `key=value`
        #[arg(long = "set", value_name = "KEY=VALUE")]
        overrides: Vec<String>,
    },
    /// Score token co-occurrences and save the affinity table
    AffTrain {
        #[arg(long)]
        config: PathBuf,
        #[arg(long)]
        corpus: PathBuf,
        #[arg(long = "set", value_name = "KEY=VALUE")]
        overrides: Vec<String>,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::WordTrain { config, corpus, kind, overrides } => {
            word_train(&load_config(&config, &overrides)?, &corpus, kind)
        }
        Commands::AffTrain { config, corpus, overrides } => {
            aff_train(&load_config(&config, &overrides)?, &corpus)
        }
    }
}

fn load_config(path: &Path, overrides: &[String]) -> Result<Config> {
    let mut cfg = Config::load(path).with_context(|| format!("loading config {}", path.display()))?;
    for o in overrides {
        cfg.apply_override(o)?;
    }
    Ok(cfg)
}

fn word_train(cfg: &Config, corpus: &Path, kind: LexiconKind) -> Result<()> {
    let started = Instant::now();
    let mut trainer = WordTrainer::from_config(cfg).context("word trainer setup")?;
    let files = trainer.parse_dir(corpus)?;
    let (ids, _) = trainer.save_token_dicts(kind)?;
    tracing::info!(
        files,
        documents = trainer.stats().documents(),
        tokens = ids.len(),
        engine = %kind,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "word training complete"
    );
    Ok(())
}

fn aff_train(cfg: &Config, corpus: &Path) -> Result<()> {
    let started = Instant::now();
    let mut trainer = AffinityTrainer::from_config(cfg).context("affinity trainer setup")?;
    let files = trainer.parse_dir(corpus)?;
    let table = trainer.save_table()?;
    tracing::info!(
        files,
        documents = trainer.documents(),
        records = table.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "affinity training complete"
    );
    Ok(())
}
