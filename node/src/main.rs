// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # HODL Node
//!
//! Entry point for the `hodl-node` binary. Parses CLI arguments,
//! initializes logging and metrics, opens the ledger, and serves the
//! HTTP API.
//!
//! The binary supports four subcommands:
//!
//! - `run`     - serve the API and metrics endpoints
//! - `init`    - create the data directory, config, and operator key
//! - `inspect` - print an owner's vaults and lockups from a local database
//! - `version` - print build version information

mod api;
mod cli;
mod logging;
mod metrics;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::signal;

use hodl_protocol::config::{LedgerConfig, PROTOCOL_VERSION};
use hodl_protocol::crypto::keys::Keypair;
use hodl_protocol::metadata::{format_units, AssetRegistry};
use hodl_protocol::records::LockupRecord;
use hodl_protocol::storage::LedgerDb;
use hodl_protocol::{Address, Ledger, SystemClock};

use cli::{Commands, HodlNodeCli};
use logging::{LogFormat, DEFAULT_DIRECTIVE};
use metrics::NodeMetrics;

const CONFIG_FILE: &str = "config.json";
const OPERATOR_KEY_FILE: &str = "operator.key";
const DB_DIR: &str = "ledger";

#[tokio::main]
async fn main() -> Result<()> {
    let cli = HodlNodeCli::parse();

    match cli.command {
        Commands::Run(args) => run_node(args).await,
        Commands::Init(args) => init_node(args),
        Commands::Inspect(args) => inspect(args),
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

/// Explicit config path, else `<data_dir>/config.json` if present, else defaults.
fn load_config(explicit: Option<&Path>, data_dir: &Path) -> Result<LedgerConfig> {
    let path: Option<PathBuf> = match explicit {
        Some(p) => Some(p.to_path_buf()),
        None => Some(data_dir.join(CONFIG_FILE)).filter(|p| p.exists()),
    };
    match path {
        Some(p) => LedgerConfig::from_json_file(&p)
            .with_context(|| format!("failed to load ledger config from {}", p.display())),
        None => Ok(LedgerConfig::default()),
    }
}

/// The operator keypair written by `init`, or `None` if there is none.
fn load_operator(data_dir: &Path) -> Result<Option<Keypair>> {
    let path = data_dir.join(OPERATOR_KEY_FILE);
    if !path.exists() {
        return Ok(None);
    }
    let hex = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read operator key from {}", path.display()))?;
    let keypair = Keypair::from_hex(hex.trim())
        .with_context(|| format!("invalid operator key in {}", path.display()))?;
    Ok(Some(keypair))
}

fn open_db(data_dir: &Path) -> Result<LedgerDb> {
    let db_path = data_dir.join(DB_DIR);
    std::fs::create_dir_all(&db_path)
        .with_context(|| format!("failed to create database directory: {}", db_path.display()))?;
    LedgerDb::open(&db_path)
        .with_context(|| format!("failed to open database at {}", db_path.display()))
}

/// Opens the ledger and serves the API and metrics endpoints until a
/// shutdown signal arrives.
async fn run_node(args: cli::RunArgs) -> Result<()> {
    logging::init_logging(DEFAULT_DIRECTIVE, args.log_format);

    tracing::info!(
        api_port = args.api_port,
        metrics_port = args.metrics_port,
        data_dir = %args.data_dir.display(),
        "starting hodl-node"
    );

    // --- Ledger ---
    let config = load_config(args.config.as_deref(), &args.data_dir)?;
    let db = open_db(&args.data_dir)?;
    let ledger = Ledger::new(db, config, Arc::new(SystemClock));
    tracing::info!(program_id = %ledger.program_id(), "ledger opened");

    // --- Operator ---
    let operator = load_operator(&args.data_dir)?.map(|k| k.address());
    match &operator {
        Some(address) => {
            let allocation = ledger.config().operator_allocation;
            ledger
                .initialize_genesis(address, allocation)
                .context("failed to credit genesis allocation")?;
            tracing::info!(operator = %address, "operator key loaded");
        }
        None => tracing::warn!("no operator key found, faucet and mint routes disabled"),
    }

    // --- Asset list ---
    let assets = match &args.asset_list {
        Some(path) => AssetRegistry::from_json_file(path)
            .with_context(|| format!("failed to load asset list from {}", path.display()))?,
        None => AssetRegistry::default(),
    };
    tracing::info!(assets = assets.len(), "asset list loaded");

    // --- Metrics ---
    let node_metrics = Arc::new(NodeMetrics::new().context("failed to create metrics registry")?);
    let outstanding = ledger
        .records::<LockupRecord>()
        .context("failed to count outstanding lockups")?
        .len();
    node_metrics.outstanding_lockups.set(outstanding as i64);

    // --- Application state ---
    let app_state = api::AppState {
        version: format!("{} (protocol {})", env!("CARGO_PKG_VERSION"), PROTOCOL_VERSION),
        ledger: ledger.clone(),
        assets: Arc::new(assets),
        metrics: Arc::clone(&node_metrics),
        operator,
    };

    // --- API server ---
    let api_router = api::create_router(app_state);
    let api_addr = format!("0.0.0.0:{}", args.api_port);
    let api_listener = tokio::net::TcpListener::bind(&api_addr)
        .await
        .with_context(|| format!("failed to bind API listener on {}", api_addr))?;
    tracing::info!("API server listening on {}", api_addr);

    // --- Metrics server ---
    let metrics_router = axum::Router::new()
        .route("/metrics", axum::routing::get(metrics::metrics_handler))
        .with_state(Arc::clone(&node_metrics));
    let metrics_addr = format!("0.0.0.0:{}", args.metrics_port);
    let metrics_listener = tokio::net::TcpListener::bind(&metrics_addr)
        .await
        .with_context(|| format!("failed to bind metrics listener on {}", metrics_addr))?;
    tracing::info!("Metrics server listening on {}", metrics_addr);

    // --- Serve ---
    tokio::select! {
        res = axum::serve(api_listener, api_router) => {
            if let Err(e) = res {
                tracing::error!("API server error: {}", e);
            }
        }
        res = axum::serve(metrics_listener, metrics_router) => {
            if let Err(e) = res {
                tracing::error!("Metrics server error: {}", e);
            }
        }
        _ = shutdown_signal() => {
            tracing::info!("shutdown signal received, draining connections");
        }
    }

    ledger.db().flush().context("failed to flush ledger")?;
    tracing::info!("hodl-node stopped");
    Ok(())
}

/// Creates the data directory, a default config, and an operator keypair.
fn init_node(args: cli::InitArgs) -> Result<()> {
    logging::init_logging("hodl_node=info", LogFormat::Pretty);

    let data_dir = &args.data_dir;
    tracing::info!(data_dir = %data_dir.display(), "initializing node");

    std::fs::create_dir_all(data_dir)
        .with_context(|| format!("failed to create data directory: {}", data_dir.display()))?;

    let config_path = data_dir.join(CONFIG_FILE);
    if !config_path.exists() {
        let json = serde_json::to_string_pretty(&LedgerConfig::default())
            .context("failed to encode default config")?;
        std::fs::write(&config_path, json)
            .with_context(|| format!("failed to write config to {}", config_path.display()))?;
    }

    let key_path = data_dir.join(OPERATOR_KEY_FILE);
    if key_path.exists() && !args.force {
        anyhow::bail!(
            "operator key already exists at {} (pass --force to replace it)",
            key_path.display()
        );
    }

    let keypair = Keypair::generate();
    std::fs::write(&key_path, keypair.secret_hex())
        .with_context(|| format!("failed to write operator key to {}", key_path.display()))?;

    // Restrict permissions on Unix.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&key_path, std::fs::Permissions::from_mode(0o600))?;
    }

    tracing::info!(
        address = %keypair.address(),
        key_path = %key_path.display(),
        "operator keypair generated"
    );

    println!("Node initialized successfully.");
    println!("  Data directory : {}", data_dir.display());
    println!("  Config         : {}", config_path.display());
    println!("  Operator key   : {}", key_path.display());
    println!("  Address        : {}", keypair.address());

    Ok(())
}

/// Prints an owner's vault and lockup records from a stopped node's database.
fn inspect(args: cli::InspectArgs) -> Result<()> {
    let owner: Address = args
        .owner
        .parse()
        .with_context(|| format!("invalid owner address: {}", args.owner))?;
    let config = load_config(args.config.as_deref(), &args.data_dir)?;
    let db = open_db(&args.data_dir)?;
    let ledger = Ledger::new(db, config, Arc::new(SystemClock));
    let now = ledger.now();

    println!("owner {owner}");

    let vaults = ledger.vaults_of(&owner)?;
    let native = ledger.native_vaults_of(&owner)?;
    println!("vaults ({})", vaults.len() + native.len());
    for (address, vault) in &vaults {
        println!("  {address}  asset={}  holding={}", vault.asset, vault.holding);
    }
    for (address, _) in &native {
        println!("  {address}  native");
    }

    let lockups = ledger.lockups_of(&owner)?;
    println!("lockups ({})", lockups.len());
    for (address, lockup) in &lockups {
        let state = if lockup.is_mature(now) { "mature" } else { "locked" };
        println!(
            "  {address}  amount={}  release={}  {state}",
            lockup.amount,
            release_display(lockup.release_time),
        );
    }

    let coin = format_units(ledger.lamports(&owner)?, hodl_protocol::config::NATIVE_DECIMALS);
    println!("balance {coin}");
    Ok(())
}

fn release_display(release_time: i64) -> String {
    chrono::DateTime::from_timestamp(release_time, 0)
        .map(|t| t.to_rfc3339())
        .unwrap_or_else(|| release_time.to_string())
}

/// Prints version information to stdout.
fn print_version() {
    println!("hodl-node {}", env!("CARGO_PKG_VERSION"));
    println!("protocol  {}", PROTOCOL_VERSION);
}

/// Waits for SIGINT (Ctrl+C) or SIGTERM, whichever comes first.
///
/// On non-Unix platforms, only Ctrl+C is supported.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
