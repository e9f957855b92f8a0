//! # Protocol Configuration & Constants
//!
//! Every magic number in HODL lives here: derivation seeds, program ids,
//! record framing, and storage-deposit parameters. If you're hardcoding a
//! seed somewhere else, you're doing it wrong.
//!
//! Seeds are part of the address scheme. Changing one orphans every record
//! derived from it, so treat them as frozen once a ledger has data.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::address::Address;

// ---------------------------------------------------------------------------
// Derivation Seeds
// ---------------------------------------------------------------------------

/// Label for fungible vault records: `["token-vault", owner, asset]`.
pub const VAULT_SEED: &[u8] = b"token-vault";

/// Label for native-coin vault records: `["native-token-vault", owner]`.
pub const NATIVE_VAULT_SEED: &[u8] = b"native-token-vault";

/// Label for custodial holdings: `["token-seed", asset]`. One holding per
/// asset, shared by every depositor of that asset.
pub const HOLDING_SEED: &[u8] = b"token-seed";

/// Label for lockup records: `["token-lockup", owner, holding_or_vault]`.
pub const LOCKUP_SEED: &[u8] = b"token-lockup";

/// Label for the vault authority: `["vault"]`. Not parameterized.
pub const AUTHORITY_SEED: &[u8] = b"vault";

/// Domain marker appended to every derived-address preimage.
pub const PDA_MARKER: &[u8] = b"ProgramDerivedAddress";

/// Maximum number of seeds in one derivation, bump included.
pub const MAX_SEEDS: usize = 16;

/// Maximum length of a single seed in bytes.
pub const MAX_SEED_LEN: usize = 32;

// ---------------------------------------------------------------------------
// Program Identifiers
// ---------------------------------------------------------------------------

/// Owner of plain wallets. All zeros, like every chain that came before us.
pub const SYSTEM_PROGRAM_ID: Address = Address::new_from_array([0u8; 32]);

/// Owner of mints and token accounts.
pub const TOKEN_PROGRAM_ID: Address = Address::new_from_array([
    0x06, 0xdd, 0xf6, 0xe1, 0xd7, 0x65, 0xa1, 0x93, 0xd9, 0xcb, 0xe1, 0x46, 0xce, 0xeb, 0x79, 0xac,
    0x1c, 0xb4, 0x85, 0xed, 0x5f, 0x5b, 0x37, 0x91, 0x3a, 0x8c, 0xf5, 0x85, 0x7e, 0xff, 0x00, 0xa9,
]);

/// Namespace for associated token account derivation.
pub const ASSOCIATED_TOKEN_PROGRAM_ID: Address = Address::new_from_array([
    0x8c, 0x97, 0x25, 0x8f, 0x4e, 0x24, 0x89, 0xf1, 0xbb, 0x3d, 0x10, 0x29, 0x14, 0x8e, 0x0d, 0x83,
    0x0b, 0x5a, 0x13, 0x99, 0xda, 0xff, 0x10, 0x84, 0x04, 0x8e, 0x7b, 0xd8, 0xdb, 0xe9, 0xf8, 0x59,
]);

/// Default id of the vault program. Every vault, holding, lockup, and the
/// authority are derived under this id unless the config says otherwise.
pub const DEFAULT_VAULT_PROGRAM_ID: Address = Address::new_from_array([
    0x1c, 0x97, 0x61, 0x2c, 0x5c, 0x4c, 0x7c, 0xc0, 0x81, 0x98, 0xb5, 0x2d, 0xb6, 0x2d, 0xcd, 0x8c,
    0x4b, 0x0e, 0x36, 0x8d, 0xa5, 0xb3, 0x5b, 0xe5, 0x2d, 0x4b, 0x17, 0x84, 0xe9, 0x4b, 0x9c, 0x82,
]);

// ---------------------------------------------------------------------------
// Record Framing
// ---------------------------------------------------------------------------

/// Every record starts with this many discriminator bytes.
pub const DISCRIMINATOR_LEN: usize = 8;

/// Namespace mixed into discriminators: `sha256("account:<Name>")[..8]`.
pub const DISCRIMINATOR_NAMESPACE: &str = "account";

// ---------------------------------------------------------------------------
// Storage Deposits
// ---------------------------------------------------------------------------

/// Fixed per-account overhead charged on top of the data length.
pub const ACCOUNT_STORAGE_OVERHEAD: u64 = 128;

/// Default deposit rate in lamports per stored byte.
pub const DEFAULT_LAMPORTS_PER_BYTE: u64 = 6_960;

/// Native coin has 9 decimals. Display only; the ledger never divides.
pub const NATIVE_DECIMALS: u8 = 9;

/// One whole native coin in lamports.
pub const LAMPORTS_PER_COIN: u64 = 1_000_000_000;

// ---------------------------------------------------------------------------
// Node Defaults
// ---------------------------------------------------------------------------

/// Default HTTP API port.
pub const DEFAULT_API_PORT: u16 = 9741;

/// Default metrics (Prometheus) port.
pub const DEFAULT_METRICS_PORT: u16 = 9742;

/// Coin credited to the operator when a node starts on an empty ledger.
pub const DEFAULT_OPERATOR_ALLOCATION: u64 = 1_000 * LAMPORTS_PER_COIN;

/// Largest single faucet payout from the operator balance.
pub const DEFAULT_FAUCET_LIMIT: u64 = 10 * LAMPORTS_PER_COIN;

/// Protocol version reported by the node.
pub const PROTOCOL_VERSION: &str = "0.1.0";

// ---------------------------------------------------------------------------
// Runtime Configuration
// ---------------------------------------------------------------------------

/// Errors raised while loading a [`LedgerConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Storage-deposit schedule.
///
/// A record must hold `minimum_balance(data_len)` lamports for as long as
/// it exists. Deposits come back when the record is closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RentConfig {
    pub lamports_per_byte: u64,
    pub account_overhead: u64,
}

impl RentConfig {
    /// A schedule that charges nothing. Handy for tests that only care
    /// about asset balances.
    pub const fn free() -> Self {
        Self {
            lamports_per_byte: 0,
            account_overhead: 0,
        }
    }

    /// Deposit required for an account holding `data_len` bytes.
    pub fn minimum_balance(&self, data_len: usize) -> u64 {
        (self.account_overhead + data_len as u64).saturating_mul(self.lamports_per_byte)
    }
}

impl Default for RentConfig {
    fn default() -> Self {
        Self {
            lamports_per_byte: DEFAULT_LAMPORTS_PER_BYTE,
            account_overhead: ACCOUNT_STORAGE_OVERHEAD,
        }
    }
}

/// Ledger-wide settings. Everything has a default, so an empty JSON
/// object is a valid config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Program id all vault addresses are derived under.
    pub program_id: Address,
    pub rent: RentConfig,
    /// Genesis balance of the operator key, paid once on first start.
    pub operator_allocation: u64,
    /// Per-request cap for the operator faucet.
    pub faucet_limit: u64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            program_id: DEFAULT_VAULT_PROGRAM_ID,
            rent: RentConfig::default(),
            operator_allocation: DEFAULT_OPERATOR_ALLOCATION,
            faucet_limit: DEFAULT_FAUCET_LIMIT,
        }
    }
}

impl LedgerConfig {
    /// Parse a config from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a config from a JSON file on disk.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }
}
