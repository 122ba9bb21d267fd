//! Sharded Corpus Pipeline Command-Line Driver
//!
//! This binary drives the corpus pipeline end to end: building vocabularies
//! from a shard directory, inspecting a corpus, and assembling batches.
//!
//! # Usage
//!
//! ```bash
//! # Build and save vocabularies with the default configuration
//! corpus build-vocab
//!
//! # Use a configuration file and a different shard directory
//! corpus --config corpus.toml build-vocab --shard-dir wmt14/train --cutoff 5
//!
//! # Show shard and vocabulary statistics
//! corpus --config corpus.toml inspect
//!
//! # Assemble the first 10 batches and report their shapes
//! corpus --config corpus.toml batches --limit 10
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use corpus_core::dataset::ShardStream;
use corpus_core::{Corpus, CorpusConfig};

/// Sharded corpus pipeline
#[derive(Parser, Debug)]
#[command(name = "corpus")]
#[command(about = "Build vocabularies and batches from a sharded parallel corpus")]
struct Args {
    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build source and target vocabularies and save them
    BuildVocab {
        /// Shard directory, relative to the storage base path
        #[arg(long)]
        shard_dir: Option<PathBuf>,

        /// Minimum token frequency for a dedicated id
        #[arg(long)]
        cutoff: Option<u32>,
    },

    /// Print shard and vocabulary statistics
    Inspect,

    /// Assemble batches with the saved vocabularies
    Batches {
        /// Stop after this many batches
        #[arg(long)]
        limit: Option<u64>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Initialize logging
    let filter = tracing_subscriber::filter::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::filter::EnvFilter::new(&args.log_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = match &args.config {
        Some(path) => CorpusConfig::from_file(path)?,
        None => CorpusConfig::default(),
    }
    .with_env_overrides();

    if let Command::BuildVocab { shard_dir, cutoff } = &args.command {
        if let Some(dir) = shard_dir {
            config.reader.shard_dir = dir.clone();
        }
        if let Some(cutoff) = cutoff {
            config.vocab.cutoff = *cutoff;
        }
    }

    let corpus = Corpus::from_config(config)?;

    match args.command {
        Command::BuildVocab { .. } => build_vocab(&corpus)?,
        Command::Inspect => inspect(&corpus)?,
        Command::Batches { limit } => batches(&corpus, limit)?,
    }

    Ok(())
}

fn build_vocab(corpus: &Corpus) -> corpus_core::Result<()> {
    let config = corpus.config();
    tracing::info!(
        "Building vocabularies from {} (cutoff {})",
        config.reader.shard_dir.display(),
        config.vocab.cutoff
    );

    let (source, target) = corpus.build_vocabularies()?;
    corpus.save_vocabularies(&source, &target)?;

    println!(
        "source vocabulary: {} tokens -> {}",
        source.len(),
        config.vocab.source_path.display()
    );
    println!(
        "target vocabulary: {} tokens -> {}",
        target.len(),
        config.vocab.target_path.display()
    );
    Ok(())
}

fn inspect(corpus: &Corpus) -> corpus_core::Result<()> {
    let reader = corpus.open_reader()?;
    let manifest = reader.manifest();

    println!("shard directory: {}", corpus.config().reader.shard_dir.display());
    println!("shards: {}", manifest.len());
    println!("pairs: {}", reader.len());
    for shard in manifest.shards() {
        println!("  {} ({} rows)", shard.path.display(), shard.rows);
    }

    let store = corpus.vocab_store();
    for (side, path) in [
        ("source", &corpus.config().vocab.source_path),
        ("target", &corpus.config().vocab.target_path),
    ] {
        if store.exists(path)? {
            let header = store.read_header(path)?;
            println!(
                "{side} vocabulary: {} tokens, cutoff {} ({})",
                header.entry_count,
                header.cutoff,
                path.display()
            );
        } else {
            println!("{side} vocabulary: not built ({})", path.display());
        }
    }
    Ok(())
}

fn batches(corpus: &Corpus, limit: Option<u64>) -> corpus_core::Result<()> {
    let (source, target) = corpus.load_vocabularies()?;
    let reader = corpus.open_reader()?;
    let mut assembler = corpus.batches(reader, source, target)?;

    tracing::info!(
        "Assembling {} batches of up to {} pairs",
        assembler.expected_batches(),
        assembler.batch_size()
    );

    let mut count = 0u64;
    let mut pairs = 0u64;
    while limit.map_or(true, |max| count < max) {
        let Some(batch) = assembler.next_batch()? else {
            break;
        };

        let source_tokens: usize = batch.source_lengths.iter().sum();
        let target_tokens: usize = batch.target_lengths.iter().sum();
        println!(
            "batch {}: {} x {} (source tokens {}, target tokens {})",
            batch.batch_index, batch.rows, batch.seq_len, source_tokens, target_tokens
        );

        count += 1;
        pairs += batch.rows as u64;
    }

    println!(
        "{} batches, {} pairs ({:.1}% of corpus)",
        count,
        pairs,
        assembler.stream().progress() * 100.0
    );
    Ok(())
}
