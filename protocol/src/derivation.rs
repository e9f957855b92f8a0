//! # Derivation Rules
//!
//! Where each kind of record lives. All of these are pure functions of
//! their inputs and the program id; nothing here reads the ledger.
//!
//! | Role         | Seeds                                      |
//! |--------------|--------------------------------------------|
//! | vault        | `"token-vault", owner, asset`              |
//! | native vault | `"native-token-vault", owner`              |
//! | holding      | `"token-seed", asset`                      |
//! | lockup       | `"token-lockup", owner, holding_or_vault`  |
//! | authority    | `"vault"`                                  |
//!
//! Fungible lockups hang off the *holding* address, native lockups off the
//! native vault address. Either way there is exactly one lockup slot per
//! (owner, custody) pair.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::address::{Address, AddressError};
use crate::config::{
    ASSOCIATED_TOKEN_PROGRAM_ID, AUTHORITY_SEED, HOLDING_SEED, LOCKUP_SEED, NATIVE_VAULT_SEED,
    TOKEN_PROGRAM_ID, VAULT_SEED,
};

/// The part an account plays in an instruction. Used in error reports so
/// "address mismatch" says *which* address was wrong.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountRole {
    Vault,
    NativeVault,
    Holding,
    Lockup,
    Authority,
    Asset,
    Source,
}

impl fmt::Display for AccountRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AccountRole::Vault => "vault",
            AccountRole::NativeVault => "native vault",
            AccountRole::Holding => "holding",
            AccountRole::Lockup => "lockup",
            AccountRole::Authority => "vault authority",
            AccountRole::Asset => "asset",
            AccountRole::Source => "source",
        };
        f.write_str(name)
    }
}

/// Vault record for `owner`'s deposits of `asset`.
pub fn vault_address(
    owner: &Address,
    asset: &Address,
    program_id: &Address,
) -> Result<(Address, u8), AddressError> {
    Address::find_program_address(&[VAULT_SEED, owner.as_ref(), asset.as_ref()], program_id)
}

/// Native-coin vault record for `owner`.
pub fn native_vault_address(
    owner: &Address,
    program_id: &Address,
) -> Result<(Address, u8), AddressError> {
    Address::find_program_address(&[NATIVE_VAULT_SEED, owner.as_ref()], program_id)
}

/// Custodial holding shared by every depositor of `asset`.
pub fn holding_address(
    asset: &Address,
    program_id: &Address,
) -> Result<(Address, u8), AddressError> {
    Address::find_program_address(&[HOLDING_SEED, asset.as_ref()], program_id)
}

/// Lockup slot for `owner` against `custody` (the holding for fungible
/// vaults, the vault record itself for native vaults).
pub fn lockup_address(
    owner: &Address,
    custody: &Address,
    program_id: &Address,
) -> Result<(Address, u8), AddressError> {
    Address::find_program_address(&[LOCKUP_SEED, owner.as_ref(), custody.as_ref()], program_id)
}

/// The one authority that signs every outbound transfer.
pub fn authority_address(program_id: &Address) -> Result<(Address, u8), AddressError> {
    Address::find_program_address(&[AUTHORITY_SEED], program_id)
}

/// Canonical token account for (`owner`, `mint`).
pub fn associated_token_address(
    owner: &Address,
    mint: &Address,
) -> Result<(Address, u8), AddressError> {
    Address::find_program_address(
        &[owner.as_ref(), TOKEN_PROGRAM_ID.as_ref(), mint.as_ref()],
        &ASSOCIATED_TOKEN_PROGRAM_ID,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_VAULT_PROGRAM_ID;
    use crate::crypto::keys::Keypair;

    const PROGRAM: Address = DEFAULT_VAULT_PROGRAM_ID;

    fn alice() -> Address {
        Keypair::from_seed(&[1u8; 32]).address()
    }

    fn bob() -> Address {
        Keypair::from_seed(&[2u8; 32]).address()
    }

    fn mint() -> Address {
        Keypair::from_seed(&[3u8; 32]).address()
    }

    #[test]
    fn vault_depends_on_owner_and_asset() {
        let (a, _) = vault_address(&alice(), &mint(), &PROGRAM).unwrap();
        let (b, _) = vault_address(&bob(), &mint(), &PROGRAM).unwrap();
        let (c, _) = vault_address(&alice(), &bob(), &PROGRAM).unwrap();
        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_eq!(a, vault_address(&alice(), &mint(), &PROGRAM).unwrap().0);
    }

    #[test]
    fn holding_is_shared_across_owners() {
        let (h1, _) = holding_address(&mint(), &PROGRAM).unwrap();
        let (h2, _) = holding_address(&mint(), &PROGRAM).unwrap();
        assert_eq!(h1, h2);
        assert!(!h1.is_on_curve());
    }

    #[test]
    fn native_and_fungible_vaults_never_collide() {
        let (native, _) = native_vault_address(&alice(), &PROGRAM).unwrap();
        let (fungible, _) = vault_address(&alice(), &mint(), &PROGRAM).unwrap();
        assert_ne!(native, fungible);
    }

    #[test]
    fn one_lockup_slot_per_owner_and_custody() {
        let (holding, _) = holding_address(&mint(), &PROGRAM).unwrap();
        let (l1, _) = lockup_address(&alice(), &holding, &PROGRAM).unwrap();
        let (l2, _) = lockup_address(&alice(), &holding, &PROGRAM).unwrap();
        let (l3, _) = lockup_address(&bob(), &holding, &PROGRAM).unwrap();
        assert_eq!(l1, l2);
        assert_ne!(l1, l3);
    }

    #[test]
    fn authority_is_global() {
        let (a, bump) = authority_address(&PROGRAM).unwrap();
        let bump_seed = [bump];
        let seeds: &[&[u8]] = &[AUTHORITY_SEED, &bump_seed];
        assert_eq!(Address::create_program_address(seeds, &PROGRAM).unwrap(), a);

        let (other, _) = authority_address(&Address::new_from_array([9; 32])).unwrap();
        assert_ne!(a, other);
    }

    #[test]
    fn associated_token_account_is_per_owner_and_mint() {
        let (a, _) = associated_token_address(&alice(), &mint()).unwrap();
        let (b, _) = associated_token_address(&bob(), &mint()).unwrap();
        assert_ne!(a, b);
        assert!(!a.is_on_curve());
    }

    #[test]
    fn role_display() {
        assert_eq!(AccountRole::NativeVault.to_string(), "native vault");
        assert_eq!(AccountRole::Authority.to_string(), "vault authority");
    }
}
