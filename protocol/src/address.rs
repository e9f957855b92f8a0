//! # Addresses & Program-Derived Addresses
//!
//! Every account in the ledger lives at a 32-byte [`Address`]. There are
//! two kinds:
//!
//! - **Key addresses** - Ed25519 verifying keys. Whoever holds the secret
//!   can sign for them. Wallets, mints, and depositors live here.
//! - **Derived addresses** - `sha256(seeds || program_id || marker)`,
//!   forced *off* the Ed25519 curve. No secret exists for them, so only
//!   the ledger's own logic can act on their behalf. Vaults, holdings,
//!   lockups, and the vault authority live here.
//!
//! ## Bump search
//!
//! Roughly half of all hashes land on the curve. [`Address::find_program_address`]
//! appends a one-byte "bump" seed, starting at 255 and counting down, and
//! returns the first off-curve result. Same seeds, same program id, same
//! answer. Every time.

use curve25519_dalek::edwards::CompressedEdwardsY;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::config::{MAX_SEEDS, MAX_SEED_LEN, PDA_MARKER};
use crate::crypto::hash::sha256_multi;

/// Errors raised while parsing or deriving addresses.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    #[error("invalid base58 address: {0}")]
    InvalidBase58(String),

    #[error("invalid address length: expected 32 bytes, got {0}")]
    InvalidLength(usize),

    #[error("too many seeds or a seed longer than {MAX_SEED_LEN} bytes")]
    MaxSeedLengthExceeded,

    #[error("derived address falls on the ed25519 curve")]
    OnCurve,

    #[error("no viable bump seed found")]
    NoViableBump,
}

/// A 32-byte ledger address.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address([u8; 32]);

impl Address {
    pub const fn new_from_array(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_array(&self) -> &[u8; 32] {
        &self.0
    }

    /// A random address. Used for fresh mints; never for vault state.
    pub fn new_unique() -> Self {
        Self(rand::random())
    }

    /// Whether these bytes decode to a point on the Ed25519 curve, i.e.
    /// whether a keypair could exist for this address.
    pub fn is_on_curve(&self) -> bool {
        CompressedEdwardsY(self.0).decompress().is_some()
    }

    /// Hash `seeds` under `program_id` into an address.
    ///
    /// Fails if the seeds are out of bounds or if the result lands on the
    /// curve. The caller picks the bump; see [`Self::find_program_address`]
    /// for the search.
    pub fn create_program_address(
        seeds: &[&[u8]],
        program_id: &Address,
    ) -> Result<Address, AddressError> {
        if seeds.len() > MAX_SEEDS || seeds.iter().any(|s| s.len() > MAX_SEED_LEN) {
            return Err(AddressError::MaxSeedLengthExceeded);
        }

        let mut parts: Vec<&[u8]> = Vec::with_capacity(seeds.len() + 2);
        parts.extend_from_slice(seeds);
        parts.push(program_id.as_ref());
        parts.push(PDA_MARKER);

        let candidate = Address(sha256_multi(&parts));
        if candidate.is_on_curve() {
            return Err(AddressError::OnCurve);
        }
        Ok(candidate)
    }

    /// Find the canonical derived address and bump for `seeds`.
    pub fn find_program_address(
        seeds: &[&[u8]],
        program_id: &Address,
    ) -> Result<(Address, u8), AddressError> {
        // One slot is reserved for the bump itself.
        if seeds.len() >= MAX_SEEDS {
            return Err(AddressError::MaxSeedLengthExceeded);
        }

        for bump in (0..=u8::MAX).rev() {
            let bump_seed = [bump];
            let mut with_bump: Vec<&[u8]> = Vec::with_capacity(seeds.len() + 1);
            with_bump.extend_from_slice(seeds);
            with_bump.push(&bump_seed);
            match Self::create_program_address(&with_bump, program_id) {
                Ok(address) => return Ok((address, bump)),
                Err(AddressError::OnCurve) => {}
                Err(other) => return Err(other),
            }
        }
        Err(AddressError::NoViableBump)
    }
}

impl AsRef<[u8]> for Address {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; 32]> for Address {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", bs58::encode(self.0).into_string())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({self})")
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = bs58::decode(s)
            .into_vec()
            .map_err(|e| AddressError::InvalidBase58(e.to_string()))?;
        let array: [u8; 32] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| AddressError::InvalidLength(bytes.len()))?;
        Ok(Self(array))
    }
}

// JSON gets base58 strings; bincode gets 32 raw bytes with no length
// prefix, which keeps record layouts fixed-size.
impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.serialize_str(&self.to_string())
        } else {
            self.0.serialize(serializer)
        }
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        if deserializer.is_human_readable() {
            let s = String::deserialize(deserializer)?;
            s.parse().map_err(serde::de::Error::custom)
        } else {
            <[u8; 32]>::deserialize(deserializer).map(Self)
        }
    }
}
