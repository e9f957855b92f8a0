//! # CLI Interface
//!
//! Defines the command-line argument structure for `hodl-node` using
//! `clap` derive. Supports four subcommands: `run`, `init`, `inspect`,
//! and `version`.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use hodl_protocol::config::{DEFAULT_API_PORT, DEFAULT_METRICS_PORT};

use crate::logging::LogFormat;

/// HODL vault ledger node.
///
/// Serves a time-locked vault ledger over HTTP: signed vault
/// transactions in, records and annotated holdings out, with Prometheus
/// metrics on a separate port.
#[derive(Parser, Debug)]
#[command(
    name = "hodl-node",
    about = "HODL vault ledger node",
    version,
    propagate_version = true
)]
pub struct HodlNodeCli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands for the node binary.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Open the ledger and serve the API and metrics endpoints.
    Run(RunArgs),
    /// Create the data directory, a default ledger config, and an
    /// operator keypair.
    Init(InitArgs),
    /// Print the vaults and lockups of an owner from a local database.
    Inspect(InspectArgs),
    /// Print version information and exit.
    Version,
}

/// Arguments for the `run` subcommand.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Path to the ledger configuration file (JSON).
    ///
    /// When omitted, the node looks for `config.json` in the data
    /// directory and falls back to built-in defaults.
    #[arg(long, short = 'c', env = "HODL_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory holding the ledger database and operator key.
    #[arg(long, short = 'd', env = "HODL_DATA_DIR", default_value = "hodl-data")]
    pub data_dir: PathBuf,

    /// Port for the REST API.
    #[arg(long, env = "HODL_API_PORT", default_value_t = DEFAULT_API_PORT)]
    pub api_port: u16,

    /// Port for the Prometheus metrics endpoint.
    #[arg(long, env = "HODL_METRICS_PORT", default_value_t = DEFAULT_METRICS_PORT)]
    pub metrics_port: u16,

    /// JSON token list used to label holdings.
    #[arg(long, env = "HODL_ASSET_LIST")]
    pub asset_list: Option<PathBuf>,

    /// Log output format: `pretty` or `json`.
    #[arg(long, env = "HODL_LOG_FORMAT", default_value = "pretty", value_parser = LogFormat::from_str_lossy)]
    pub log_format: LogFormat,
}

/// Arguments for the `init` subcommand.
#[derive(Parser, Debug)]
pub struct InitArgs {
    /// Path to the data directory to initialize.
    #[arg(long, short = 'd', env = "HODL_DATA_DIR", default_value = "hodl-data")]
    pub data_dir: PathBuf,

    /// Overwrite an existing operator key.
    #[arg(long)]
    pub force: bool,
}

/// Arguments for the `inspect` subcommand.
#[derive(Parser, Debug)]
pub struct InspectArgs {
    /// Base58 address of the vault owner.
    pub owner: String,

    /// Data directory of a stopped node.
    #[arg(long, short = 'd', env = "HODL_DATA_DIR", default_value = "hodl-data")]
    pub data_dir: PathBuf,

    /// Path to the ledger configuration file (JSON).
    #[arg(long, short = 'c', env = "HODL_CONFIG")]
    pub config: Option<PathBuf>,
}
