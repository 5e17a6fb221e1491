//! Server configuration: environment variables with `clap`-derived CLI
//! overrides. No config file schema.

use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(name = "recalld")]
#[command(about = "Persistent memory server for AI coding agents")]
pub struct Config {
    /// Directory holding the SQLite database file and any local state.
    #[arg(long, env = "RECALL_DATA_DIR", default_value = "./data")]
    pub data_dir: PathBuf,

    /// Port the HTTP server listens on.
    #[arg(long, env = "RECALL_PORT", default_value_t = 37777)]
    pub port: u16,

    /// Model name passed through to the generator LLM.
    #[arg(long, env = "RECALL_MODEL", default_value = "claude-sonnet-4")]
    pub model: String,

    /// Default observation count for `/api/context/:project`.
    #[arg(long, env = "RECALL_CONTEXT_LIMIT", default_value_t = 50)]
    pub context_limit: i64,

    /// Base URL of the external generator LLM service.
    #[arg(long, env = "RECALL_GENERATOR_URL", default_value = "http://127.0.0.1:8787")]
    pub generator_url: String,

    /// Base URL of the external vector collection service. If unset, the
    /// server runs with a no-op vector index (FTS-only search).
    #[arg(long, env = "RECALL_VECTOR_URL")]
    pub vector_url: Option<String>,

    /// Comma-separated tool-name overrides for the observation skip-set
    /// (see `recall_runtime::SkipList`).
    #[arg(long, env = "RECALL_SKIP_TOOLS")]
    pub skip_tools: Option<String>,
}

impl Config {
    pub fn database_url(&self) -> String {
        format!("sqlite://{}/recall.db", self.data_dir.display())
    }
}
