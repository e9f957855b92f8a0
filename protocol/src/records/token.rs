//! Token-program records: mints and the accounts that hold their units.

use serde::{Deserialize, Serialize};

use super::{Record, RecordOwner};
use crate::address::Address;

/// A fungible asset definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mint {
    /// The only identity allowed to mint new units.
    pub mint_authority: Address,
    pub decimals: u8,
    pub supply: u64,
}

impl Record for Mint {
    const NAME: &'static str = "Mint";
    const LEN: usize = 8 + 32 + 1 + 8;
    const OWNER: RecordOwner = RecordOwner::Token;
}

/// A balance of one mint controlled by `owner`.
///
/// For custodial holdings `owner` is the vault authority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenAccount {
    pub mint: Address,
    pub owner: Address,
    pub amount: u64,
}

impl Record for TokenAccount {
    const NAME: &'static str = "TokenAccount";
    const LEN: usize = 8 + 32 + 32 + 8;
    const OWNER: RecordOwner = RecordOwner::Token;
}
