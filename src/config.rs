//! Runtime settings resolved from CLI flags, environment, and defaults.
//!
//! Precedence: explicit flag, then `TIDYSCAN_*` environment variable, then
//! the built-in default. `.env` files are loaded by the binary before this
//! runs, so their values arrive through the environment.

use std::path::PathBuf;
use std::time::Duration;

use crate::cli::GlobalArgs;
use crate::monitor::MonitorOptions;
use crate::report::DEFAULT_ALERT_THRESHOLD;
use crate::scanner;

/// Default Ollama endpoint.
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
/// Default text-generation model.
pub const DEFAULT_MODEL: &str = "qwen2.5:latest";
/// Default embedding model.
pub const DEFAULT_EMBED_MODEL: &str = "nomic-embed-text";
/// Default per-call timeout for model requests.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
/// Default history database.
pub const DEFAULT_DB_PATH: &str = "tidyscan.db";
/// Standards file picked up from the working directory when present.
pub const DEFAULT_STANDARDS_PATH: &str = "tidyscan.yaml";

/// Environment variable overriding the database path.
pub const ENV_DB: &str = "TIDYSCAN_DB";
/// Environment variable overriding the Ollama endpoint.
pub const ENV_OLLAMA_URL: &str = "TIDYSCAN_OLLAMA_URL";
/// Environment variable overriding the text-generation model.
pub const ENV_MODEL: &str = "TIDYSCAN_MODEL";
/// Environment variable overriding the embedding model.
pub const ENV_EMBED_MODEL: &str = "TIDYSCAN_EMBED_MODEL";
/// Environment variable naming a directory to record cassettes into.
pub const ENV_RECORD: &str = "TIDYSCAN_RECORD";

/// Fully resolved settings for one invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// SQLite history file.
    pub db_path: PathBuf,
    /// Standards document; a missing file means defaults.
    pub standards_path: PathBuf,
    /// Base URL of the Ollama server.
    pub ollama_url: String,
    /// Text-generation model.
    pub model: String,
    /// Embedding model.
    pub embed_model: String,
    /// Upper bound for each model call.
    pub timeout: Duration,
}

impl Settings {
    /// Resolves settings from the process environment.
    #[must_use]
    pub fn from_args(args: &GlobalArgs) -> Self {
        Self::resolve(args, |key| std::env::var(key).ok())
    }

    /// Resolves settings using `env` for environment lookups.
    pub fn resolve(args: &GlobalArgs, env: impl Fn(&str) -> Option<String>) -> Self {
        let pick = |flag: &Option<String>, key: &str, default: &str| -> String {
            flag.clone()
                .or_else(|| env(key).filter(|v| !v.trim().is_empty()))
                .unwrap_or_else(|| default.to_string())
        };
        let db_path = args
            .db
            .clone()
            .or_else(|| env(ENV_DB).filter(|v| !v.trim().is_empty()).map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_PATH));

        Self {
            db_path,
            standards_path: args
                .standards
                .clone()
                .unwrap_or_else(|| PathBuf::from(DEFAULT_STANDARDS_PATH)),
            ollama_url: pick(&args.ollama_url, ENV_OLLAMA_URL, DEFAULT_OLLAMA_URL)
                .trim_end_matches('/')
                .to_string(),
            model: pick(&args.model, ENV_MODEL, DEFAULT_MODEL),
            embed_model: pick(&args.embed_model, ENV_EMBED_MODEL, DEFAULT_EMBED_MODEL),
            timeout: Duration::from_secs(args.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS).max(1)),
        }
    }

    /// Monitor options for these settings.
    #[must_use]
    pub fn monitor_options(&self, alert_threshold: Option<f64>, top_k: usize) -> MonitorOptions {
        MonitorOptions {
            model: self.model.clone(),
            embed_model: self.embed_model.clone(),
            timeout: self.timeout,
            alert_threshold: alert_threshold.unwrap_or(DEFAULT_ALERT_THRESHOLD),
            top_k,
            ignore_patterns: scanner::default_ignore_patterns(),
            ..MonitorOptions::default()
        }
    }
}
