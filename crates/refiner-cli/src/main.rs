//! CLI for the rating refiner.
//!
//! Runs a batch of cleaned JSONL records through the refinement engine,
//! persists the report through one of the storage backends and optionally
//! keeps the learned policy table in a snapshot file between runs.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use log::{info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use refiner_bandits::{load, snapshot};
use refiner_core::{BatchReport, PolicyTable};
use refiner_pipeline::{
    BatchOrchestrator, BlobSink, EngineConfig, JsonDocumentSink, ListSink, PersistReceipt,
    StorageSink,
};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use time::OffsetDateTime;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Refine a batch of cleaned records
    Run(RunArgs),
    /// Print a stored policy snapshot
    Policy {
        /// Path to the policy snapshot
        #[arg(long, default_value = "data/refiner.policy.json")]
        policy: PathBuf,
    },
}

#[derive(clap::Args, Debug, Clone)]
struct RunArgs {
    /// JSONL file with one cleaned record per line
    #[arg(long)]
    input: PathBuf,

    /// Engine config (TOML); defaults apply if the file does not exist
    #[arg(long, default_value = "refiner.toml")]
    config: PathBuf,

    /// Storage backend for the batch report
    #[arg(long, value_enum, default_value_t = Backend::Json)]
    backend: Backend,

    /// Report file (json), container directory (blob) or list file (list).
    /// Defaults to a backend specific path under `outputs/`
    #[arg(long)]
    output: Option<PathBuf>,

    /// Policy snapshot to resume from and save to. Without it every run starts from an empty table.
    #[arg(long)]
    policy: Option<PathBuf>,

    /// Seed for exploration, overrides the config
    #[arg(long)]
    seed: Option<u64>,

    /// Exploration rate, overrides the config
    #[arg(long)]
    epsilon: Option<f64>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Backend {
    Json,
    Blob,
    List,
}

impl Backend {
    fn default_output(self) -> PathBuf {
        PathBuf::from(match self {
            Backend::Json => "outputs/refined_data.json",
            Backend::Blob => "outputs/refined_blobs",
            Backend::List => "outputs/refined_list.json",
        })
    }
}

/// Policy table persisted between runs, as written by [`snapshot`].
#[derive(Serialize, Deserialize, Debug)]
struct PolicyState {
    q_table: serde_json::Value,
    batches: u64,
    #[serde(with = "time::serde::iso8601::option")]
    last_saved: Option<OffsetDateTime>,
}

impl PolicyState {
    fn load(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let file = File::open(path)?;
        let state: PolicyState = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("Invalid policy snapshot {}", path.display()))?;
        Ok(Some(state))
    }

    fn table(&self) -> Result<PolicyTable> {
        Ok(load(self.q_table.clone())?)
    }

    fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = File::create(path)?;
        serde_json::to_writer_pretty(file, self)?;
        Ok(())
    }
}

fn build_sink(backend: Backend, output: &Path) -> Box<dyn StorageSink> {
    match backend {
        Backend::Json => Box::new(JsonDocumentSink::new(output)),
        Backend::Blob => Box::new(BlobSink::new(output)),
        Backend::List => Box::new(ListSink::new(output)),
    }
}

/// Reads the raw input. Lines are split later so that a line with bad
/// encoding only fails its own record.
fn read_input(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).with_context(|| format!("Failed to read input file {}", path.display()))
}

fn run_batch(args: &RunArgs) -> Result<(BatchReport, PersistReceipt)> {
    let mut config = EngineConfig::load(&args.config)?;
    if let Some(epsilon) = args.epsilon {
        config.learning.exploration_rate = epsilon;
    }
    let params = config.learning_params()?;
    let ratings = config.rating_map()?;
    let classifier = config.classifier()?;
    let rng = match args.seed.or(config.seed) {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let (mut table, batches) = match &args.policy {
        Some(path) => match PolicyState::load(path)? {
            Some(state) => {
                let table = state
                    .table()
                    .with_context(|| format!("Invalid policy table in {}", path.display()))?;
                info!(
                    "Resuming policy from {} ({} categories, {} batches)",
                    path.display(),
                    table.len(),
                    state.batches
                );
                (table, state.batches)
            }
            None => (PolicyTable::new(), 0),
        },
        None => (PolicyTable::new(), 0),
    };

    let input = read_input(&args.input)?;
    let mut orchestrator = BatchOrchestrator::new(classifier, ratings, params, rng);
    let report = orchestrator
        .refine_lines(&mut table, input.split(|b| *b == b'\n'))
        .context("Batch aborted")?;

    let output = args
        .output
        .clone()
        .unwrap_or_else(|| args.backend.default_output());
    let mut sink = build_sink(args.backend, &output);
    let receipt = sink
        .persist(&report)
        .context("Failed to persist batch report")?;

    if let Some(path) = &args.policy {
        PolicyState {
            q_table: snapshot(&table),
            batches: batches + 1,
            last_saved: Some(OffsetDateTime::now_utc()),
        }
        .save(path)
        .context("Failed to save policy snapshot")?;
    }

    Ok((report, receipt))
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run(args) => {
            let (report, receipt) = run_batch(&args)?;
            if report.summary.failed > 0 {
                warn!("{} records failed", report.summary.failed);
            }
            println!(
                "Processed {} records ({} failed). Average reward {:.3}. Stored {} entries via {} at {}",
                report.results.len(),
                report.summary.failed,
                report.summary.average_reward,
                receipt.entries,
                receipt.backend,
                receipt.location.display()
            );
        }
        Commands::Policy { policy } => {
            let state = PolicyState::load(&policy)?
                .with_context(|| format!("No policy snapshot at {}", policy.display()))?;
            state
                .table()
                .with_context(|| format!("Invalid policy table in {}", policy.display()))?;
            println!("{}", serde_json::to_string_pretty(&state)?);
        }
    }

    Ok(())
}
