//! # Ledger Records
//!
//! Every address maps to an [`Account`]: a native-coin balance, the
//! program that controls it, and an opaque data blob. Typed records
//! (vaults, lockups, mints, token accounts) live inside that blob as
//!
//! ```text
//! discriminator (8 bytes) || bincode(fields in declaration order)
//! ```
//!
//! where the discriminator is `sha256("account:<Name>")[..8]`. The
//! discriminator stops one record kind from being read as another; the
//! owning program stops a token account from being passed off as a vault.

pub mod lockup;
pub mod token;
pub mod vault;

pub use lockup::LockupRecord;
pub use token::{Mint, TokenAccount};
pub use vault::{NativeVaultRecord, VaultRecord};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::address::Address;
use crate::config::{DISCRIMINATOR_LEN, DISCRIMINATOR_NAMESPACE, SYSTEM_PROGRAM_ID, TOKEN_PROGRAM_ID};
use crate::crypto::hash::sha256;

// ---------------------------------------------------------------------------
// Account
// ---------------------------------------------------------------------------

/// The raw contents of one address.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Native coin balance, in lamports.
    pub lamports: u64,
    /// Program that controls `data`.
    pub owner: Address,
    pub data: Vec<u8>,
}

impl Account {
    /// A plain wallet: lamports, no data, owned by the system program.
    pub fn wallet(lamports: u64) -> Self {
        Self {
            lamports,
            owner: SYSTEM_PROGRAM_ID,
            data: Vec::new(),
        }
    }

    pub fn is_wallet(&self) -> bool {
        self.owner == SYSTEM_PROGRAM_ID && self.data.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Record framing
// ---------------------------------------------------------------------------

/// Which program controls a record kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOwner {
    /// The token program (mints, token accounts).
    Token,
    /// The vault program under whatever id the ledger was configured with.
    Vault,
}

impl RecordOwner {
    /// Resolve to a concrete program id.
    pub fn resolve(self, vault_program_id: &Address) -> Address {
        match self {
            RecordOwner::Token => TOKEN_PROGRAM_ID,
            RecordOwner::Vault => *vault_program_id,
        }
    }
}

/// Why a blob failed to decode as a record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    #[error("data too short: {0} bytes")]
    TooShort(usize),

    #[error("discriminator does not match {0}")]
    WrongDiscriminator(&'static str),

    #[error("malformed {name}: {reason}")]
    Malformed { name: &'static str, reason: String },
}

/// `sha256("account:<name>")[..8]`.
pub fn discriminator(name: &str) -> [u8; DISCRIMINATOR_LEN] {
    let digest = sha256(format!("{DISCRIMINATOR_NAMESPACE}:{name}").as_bytes());
    let mut out = [0u8; DISCRIMINATOR_LEN];
    out.copy_from_slice(&digest[..DISCRIMINATOR_LEN]);
    out
}

/// A typed, discriminator-prefixed record.
pub trait Record: Serialize + DeserializeOwned {
    /// Record name; feeds the discriminator.
    const NAME: &'static str;
    /// Encoded length, discriminator included.
    const LEN: usize;
    const OWNER: RecordOwner;

    fn discriminator() -> [u8; DISCRIMINATOR_LEN] {
        discriminator(Self::NAME)
    }

    fn encode(&self) -> Result<Vec<u8>, RecordError> {
        let mut out = Vec::with_capacity(Self::LEN);
        out.extend_from_slice(&Self::discriminator());
        bincode::serialize_into(&mut out, self).map_err(|e| RecordError::Malformed {
            name: Self::NAME,
            reason: e.to_string(),
        })?;
        Ok(out)
    }

    fn decode(data: &[u8]) -> Result<Self, RecordError> {
        if data.len() < DISCRIMINATOR_LEN {
            return Err(RecordError::TooShort(data.len()));
        }
        let (head, body) = data.split_at(DISCRIMINATOR_LEN);
        if head != Self::discriminator() {
            return Err(RecordError::WrongDiscriminator(Self::NAME));
        }
        bincode::deserialize(body).map_err(|e| RecordError::Malformed {
            name: Self::NAME,
            reason: e.to_string(),
        })
    }

    /// Whether `data` starts with this record's discriminator.
    fn matches(data: &[u8]) -> bool {
        data.len() >= DISCRIMINATOR_LEN && data[..DISCRIMINATOR_LEN] == Self::discriminator()
    }
}
