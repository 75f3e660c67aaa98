//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Longest history window `trend` accepts, about a century.
pub const MAX_TREND_DAYS: i64 = 36_500;

/// Top-level CLI parser for `tidyscan`.
#[derive(Debug, Parser)]
#[command(name = "tidyscan", version, about = "Watch a directory tree for creeping messiness")]
pub struct Cli {
    /// Options shared by every command.
    #[command(flatten)]
    pub global: GlobalArgs,
    /// The command to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Options accepted by every subcommand.
#[derive(Debug, Clone, Default, Args)]
pub struct GlobalArgs {
    /// History database [env: `TIDYSCAN_DB`] [default: tidyscan.db]
    #[arg(long, global = true, value_name = "PATH")]
    pub db: Option<PathBuf>,
    /// Standards document (YAML or JSON) [default: tidyscan.yaml]
    #[arg(long, global = true, value_name = "PATH")]
    pub standards: Option<PathBuf>,
    /// Ollama base URL [env: `TIDYSCAN_OLLAMA_URL`]
    #[arg(long, global = true, value_name = "URL")]
    pub ollama_url: Option<String>,
    /// Text-generation model [env: `TIDYSCAN_MODEL`]
    #[arg(long, global = true)]
    pub model: Option<String>,
    /// Embedding model [env: `TIDYSCAN_EMBED_MODEL`]
    #[arg(long, global = true)]
    pub embed_model: Option<String>,
    /// Per-call timeout for model requests, in seconds
    #[arg(long, global = true, value_name = "SECS")]
    pub timeout_secs: Option<u64>,
}

/// Tunables shared by commands that run monitoring cycles.
#[derive(Debug, Clone, Args)]
pub struct CycleArgs {
    /// Score at or above which the report raises an alert [default: 5.0]
    #[arg(long)]
    pub alert_threshold: Option<f64>,
    /// Number of similar past scans given to the model
    #[arg(long, default_value_t = 5)]
    pub top_k: usize,
}

/// Supported top-level subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Scan a directory once, store the result, and print the report.
    Scan {
        /// Directory to scan.
        #[arg(default_value = ".")]
        path: PathBuf,
        /// Cycle tunables.
        #[command(flatten)]
        cycle: CycleArgs,
        /// Print the report as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Scan a directory repeatedly at a fixed interval.
    Watch {
        /// Directory to watch.
        #[arg(default_value = ".")]
        path: PathBuf,
        /// Seconds between cycles.
        #[arg(long, default_value_t = 300)]
        interval_secs: u64,
        /// Stop after this many cycles (at least 1).
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
        cycles: Option<u64>,
        /// Cycle tunables.
        #[command(flatten)]
        cycle: CycleArgs,
    },
    /// List the most recent scans.
    History {
        /// Number of scans to show.
        #[arg(long, short = 'n', default_value_t = 10)]
        limit: usize,
    },
    /// Show aggregate statistics over all scans.
    Stats,
    /// Compare the last week with the week before and draw a sparkline.
    Trend {
        /// Days of history to include (1 to 36500).
        #[arg(long, default_value_t = 30, value_parser = clap::value_parser!(i64).range(1..=MAX_TREND_DAYS))]
        days: i64,
        /// Sparkline width in characters.
        #[arg(long, default_value_t = 50)]
        width: usize,
    },
    /// Write one stored scan and its report to a file.
    Export {
        /// Entry identifier (see `history`).
        id: i64,
        /// Output path; `.yaml`/`.yml` selects YAML, anything else JSON.
        #[arg(long, short = 'o', default_value = "tidyscan-report.json")]
        output: PathBuf,
    },
    /// Rebuild missing similarity vectors and drop orphaned ones.
    Reconcile,
    /// Write the default standards document for editing.
    Standards {
        /// Where to write it [default: the --standards path]
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },
    /// Check that the history database and model backends are usable.
    Doctor,
}
