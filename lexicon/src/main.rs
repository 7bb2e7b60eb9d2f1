use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use cnlex::affinity::AffinityTable;
use cnlex::config::Config;
use cnlex::lexicon::{Lexicon, LexiconFactory, LexiconKind};
use cnlex::processor::{BreakProcessor, Processor};
use cnlex::stats::FeatureFilter;
use cnlex::tokenizer::{tokenizer_from_config, Tokenizer, TokenizerRegistry};
use tracing_subscriber::{fmt, EnvFilter};

use std::fs;
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

#[derive(Parser)]
#[command(name = "lexicon")]
#[command(about = "Build, inspect and apply lexicon indexes", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a binary index from `token value` lines
    Build {
        #[arg(long)]
        source: PathBuf,
        #[arg(long)]
        index: PathBuf,
        #[arg(long = "type", default_value = "datrie")]
        kind: LexiconKind,
        /// Treat values as frequencies and drop entries rejected by the
        /// feature filter of this config
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long = "set", value_name = "KEY=VALUE", requires = "config")]
        overrides: Vec<String>,
    },
    /// Write every entry of an index as text
    Dump {
        #[arg(long)]
        index: PathBuf,
        #[arg(long)]
        target: PathBuf,
    },
    /// Print the stored value of each query token
    Query {
        #[arg(long)]
        index: PathBuf,
        #[arg(required = true)]
        tokens: Vec<String>,
    },
    /// Print entry count and value aggregates
    Info {
        #[arg(long)]
        index: PathBuf,
    },
    /// Tokenize text and split tokens with the configured break lexicon
    Segment {
        #[arg(long)]
        config: PathBuf,
        /// Input file, `-` for stdin
        #[arg(default_value = "-")]
        input: String,
        /// Print `token/tag` when a tag is known
        #[arg(long, default_value_t = false)]
        pos: bool,
        /// Use this entry of the config's `parsers` list instead of `tokenizer`
        #[arg(long)]
        parser: Option<String>,
        #[arg(long = "set", value_name = "KEY=VALUE")]
        overrides: Vec<String>,
    },
    /// Look up or dump an affinity table
    Affinity {
        #[arg(long)]
        table: PathBuf,
        /// Identifier lexicon the table was trained with
        #[arg(long)]
        ids: Option<PathBuf>,
        /// Write all records as text instead of querying
        #[arg(long)]
        dump: Option<PathBuf>,
        words: Vec<String>,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Build { source, index, kind, config, overrides } => {
            let filter = match config {
                Some(config) => Some(FeatureFilter::from_config(&load_config(&config, &overrides)?)?),
                None => None,
            };
            build(&source, &index, kind, filter.as_ref())
        }
        Commands::Dump { index, target } => dump(&index, &target),
        Commands::Query { index, tokens } => query(&index, &tokens),
        Commands::Info { index } => info(&index),
        Commands::Segment { config, input, pos, parser, overrides } => {
            segment(&config, &input, pos, parser.as_deref(), &overrides)
        }
        Commands::Affinity { table, ids, dump, words } => affinity(&table, ids.as_deref(), dump.as_deref(), &words),
    }
}

fn load_config(path: &Path, overrides: &[String]) -> Result<Config> {
    let mut cfg = Config::load(path).with_context(|| format!("loading config {}", path.display()))?;
    for o in overrides {
        cfg.apply_override(o)?;
    }
    Ok(cfg)
}

fn build(source: &Path, index: &Path, kind: LexiconKind, filter: Option<&FeatureFilter>) -> Result<()> {
    let mut lex = LexiconFactory::create(kind);
    let read = lex
        .read_from_text(source, filter)
        .with_context(|| format!("reading {}", source.display()))?;
    lex.save(index)?;
    tracing::info!(read, entries = lex.len(), engine = %kind, index = %index.display(), "index built");
    Ok(())
}

fn dump(index: &Path, target: &Path) -> Result<()> {
    let lex = LexiconFactory::load(index)?;
    let written = lex.write_to_text(target)?;
    tracing::info!(written, target = %target.display(), "index dumped");
    Ok(())
}

fn query(index: &Path, tokens: &[String]) -> Result<()> {
    let lex = LexiconFactory::load(index)?;
    let mut out = io::stdout().lock();
    for t in tokens {
        writeln!(out, "{t}\t{}", lex.search(t))?;
    }
    Ok(())
}

fn info(index: &Path) -> Result<()> {
    let lex = LexiconFactory::load(index)?;
    println!("engine\t{}", lex.kind());
    println!("entries\t{}", lex.len());
    println!("max\t{}", lex.max_value());
    println!("min\t{}", lex.min_value());
    println!("sum\t{}", lex.sum_value());
    Ok(())
}

fn segment(config: &Path, input: &str, pos: bool, parser: Option<&str>, overrides: &[String]) -> Result<()> {
    let cfg = load_config(config, overrides)?;
    let registry;
    let configured;
    let tokenizer: &dyn Tokenizer = match parser {
        Some(name) => {
            registry = TokenizerRegistry::from_config(&cfg)?;
            registry.get(name).with_context(|| format!("parser '{name}' is not in 'parsers'"))?
        }
        None => {
            configured = tokenizer_from_config(&cfg)?;
            configured.as_ref()
        }
    };
    let mut breaker = if cfg.contains("break") { Some(BreakProcessor::from_config(&cfg)?) } else { None };

    let mut text = String::new();
    if input == "-" {
        io::stdin().read_to_string(&mut text)?;
    } else {
        text = fs::read_to_string(input).with_context(|| format!("reading {input}"))?;
    }

    let started = Instant::now();
    let mut out = BufWriter::new(io::stdout().lock());
    for line in text.lines() {
        let mut tokens = tokenizer.tokenize(line)?;
        if let Some(b) = breaker.as_mut() {
            tokens = b.process(&tokens)?;
        }
        let rendered: Vec<String> = tokens
            .iter()
            .map(|t| match (pos, t.tag()) {
                (true, Some(tag)) => format!("{}/{tag}", t.text()),
                _ => t.text().to_string(),
            })
            .collect();
        writeln!(out, "{}", rendered.join(" "))?;
    }
    out.flush()?;
    tracing::info!(elapsed_us = started.elapsed().as_micros() as u64, "segmented");
    Ok(())
}

fn affinity(table: &Path, ids: Option<&Path>, dump: Option<&Path>, words: &[String]) -> Result<()> {
    let table = AffinityTable::load(table)?;
    if let Some(target) = dump {
        let written = table.write_to_text(target)?;
        tracing::info!(written, target = %target.display(), "affinity table dumped");
        return Ok(());
    }
    let [first, second] = words else {
        bail!("expected two words or --dump");
    };
    let Some(ids) = ids else {
        bail!("--ids is required to look up words");
    };
    let ids = LexiconFactory::load(ids)?;
    match table.affinity_of(&ids, first, second) {
        Some(score) => println!("{first}\t{second}\t{score}"),
        None => println!("{first}\t{second}\t-"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_applies_the_configured_filter() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("freq.txt");
        fs::write(&source, "北京\t5\n北\t9\n大学\t1\n").unwrap();
        let config = dir.path().join("filter.cfg");
        fs::write(&config, "freq_threshold = 2\nfeature_min_length = 1\nfeature_min_utf8_length = 2\n").unwrap();

        let filter = FeatureFilter::from_config(&load_config(&config, &[]).unwrap()).unwrap();
        let index = dir.path().join("filtered.idx");
        build(&source, &index, LexiconKind::Trie, Some(&filter)).unwrap();
        let lex = LexiconFactory::load(&index).unwrap();
        assert_eq!(lex.entries(), vec![("北京".to_string(), 5)]);

        let loose = load_config(&config, &["freq_threshold=1".to_string()]).unwrap();
        let filter = FeatureFilter::from_config(&loose).unwrap();
        build(&source, &index, LexiconKind::Trie, Some(&filter)).unwrap();
        assert_eq!(LexiconFactory::load(&index).unwrap().len(), 2);

        build(&source, &index, LexiconKind::Hash, None).unwrap();
        assert_eq!(LexiconFactory::load(&index).unwrap().len(), 3);
    }
}
