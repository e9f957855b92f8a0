//! Vault records. Created once by an initialize operation and never
//! changed afterwards.

use serde::{Deserialize, Serialize};

use super::{Record, RecordOwner};
use crate::address::Address;

/// Custody of one fungible asset for one depositor.
///
/// The balance itself sits in the shared holding for `asset`, not here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultRecord {
    pub owner: Address,
    pub asset: Address,
    /// Custodial holding for `asset`.
    pub holding: Address,
    /// Bump of the vault authority, kept for signing.
    pub bump: u8,
}

impl Record for VaultRecord {
    const NAME: &'static str = "TokenVault";
    const LEN: usize = 8 + 32 + 32 + 32 + 1;
    const OWNER: RecordOwner = RecordOwner::Vault;
}

/// Native-coin vault. The locked coin is this account's own lamport
/// balance above its storage deposit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeVaultRecord {
    pub owner: Address,
}

impl Record for NativeVaultRecord {
    const NAME: &'static str = "NativeTokenVault";
    const LEN: usize = 8 + 32;
    const OWNER: RecordOwner = RecordOwner::Vault;
}
