//! # Instructions
//!
//! The six vault operations, each carrying the account references it
//! acts on. References are never trusted: the processor re-derives every
//! one of them and rejects the instruction on any mismatch.
//!
//! The builder functions derive the correct references for you, which
//! is what honest clients should use. Constructing a variant by hand is
//! allowed (and is how tests exercise the mismatch checks).

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::address::{Address, AddressError};
use crate::derivation::{
    associated_token_address, authority_address, holding_address, lockup_address,
    native_vault_address, vault_address,
};

/// A vault operation plus its account references.
///
/// The signer is not listed here; it comes from the enclosing
/// transaction and is always the depositor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Instruction {
    InitializeVault {
        asset: Address,
        vault: Address,
        holding: Address,
        authority: Address,
    },
    InitializeNativeVault {
        vault: Address,
    },
    Lock {
        amount: u64,
        release_time: i64,
        vault: Address,
        holding: Address,
        lockup: Address,
        /// Depositor's token account the amount is drawn from.
        source: Address,
    },
    LockNative {
        amount: u64,
        release_time: i64,
        vault: Address,
        lockup: Address,
    },
    Unlock {
        vault: Address,
        holding: Address,
        lockup: Address,
        authority: Address,
        /// Token account that receives the released amount.
        receiver: Address,
    },
    UnlockNative {
        vault: Address,
        lockup: Address,
        /// Identity that receives the released coin.
        receiver: Address,
    },
}

/// Instruction discriminant, for logs, receipts, and metrics labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstructionKind {
    InitializeVault,
    InitializeNativeVault,
    Lock,
    LockNative,
    Unlock,
    UnlockNative,
}

impl InstructionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            InstructionKind::InitializeVault => "initialize_vault",
            InstructionKind::InitializeNativeVault => "initialize_native_vault",
            InstructionKind::Lock => "lock",
            InstructionKind::LockNative => "lock_native",
            InstructionKind::Unlock => "unlock",
            InstructionKind::UnlockNative => "unlock_native",
        }
    }
}

impl fmt::Display for InstructionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Instruction {
    pub fn kind(&self) -> InstructionKind {
        match self {
            Instruction::InitializeVault { .. } => InstructionKind::InitializeVault,
            Instruction::InitializeNativeVault { .. } => InstructionKind::InitializeNativeVault,
            Instruction::Lock { .. } => InstructionKind::Lock,
            Instruction::LockNative { .. } => InstructionKind::LockNative,
            Instruction::Unlock { .. } => InstructionKind::Unlock,
            Instruction::UnlockNative { .. } => InstructionKind::UnlockNative,
        }
    }

    /// Every account the instruction references, signer first, without
    /// duplicates.
    pub fn account_keys(&self, signer: &Address) -> Vec<Address> {
        let mut keys = vec![*signer];
        let refs: Vec<Address> = match self {
            Instruction::InitializeVault {
                asset,
                vault,
                holding,
                authority,
            } => vec![*asset, *vault, *holding, *authority],
            Instruction::InitializeNativeVault { vault } => vec![*vault],
            Instruction::Lock {
                vault,
                holding,
                lockup,
                source,
                ..
            } => vec![*vault, *holding, *lockup, *source],
            Instruction::LockNative { vault, lockup, .. } => vec![*vault, *lockup],
            Instruction::Unlock {
                vault,
                holding,
                lockup,
                authority,
                receiver,
            } => vec![*vault, *holding, *lockup, *authority, *receiver],
            Instruction::UnlockNative {
                vault,
                lockup,
                receiver,
            } => vec![*vault, *lockup, *receiver],
        };
        for key in refs {
            if !keys.contains(&key) {
                keys.push(key);
            }
        }
        keys
    }

    // -- Builders -------------------------------------------------------------

    pub fn initialize_vault(
        program_id: &Address,
        owner: &Address,
        asset: &Address,
    ) -> Result<Self, AddressError> {
        let (vault, _) = vault_address(owner, asset, program_id)?;
        let (holding, _) = holding_address(asset, program_id)?;
        let (authority, _) = authority_address(program_id)?;
        Ok(Instruction::InitializeVault {
            asset: *asset,
            vault,
            holding,
            authority,
        })
    }

    pub fn initialize_native_vault(program_id: &Address, owner: &Address) -> Result<Self, AddressError> {
        let (vault, _) = native_vault_address(owner, program_id)?;
        Ok(Instruction::InitializeNativeVault { vault })
    }

    /// Lock `amount` of `asset`, drawn from the owner's associated token
    /// account.
    pub fn lock(
        program_id: &Address,
        owner: &Address,
        asset: &Address,
        amount: u64,
        release_time: i64,
    ) -> Result<Self, AddressError> {
        let (source, _) = associated_token_address(owner, asset)?;
        Self::lock_from(program_id, owner, asset, &source, amount, release_time)
    }

    /// Lock `amount` of `asset`, drawn from an explicit token account.
    pub fn lock_from(
        program_id: &Address,
        owner: &Address,
        asset: &Address,
        source: &Address,
        amount: u64,
        release_time: i64,
    ) -> Result<Self, AddressError> {
        let (vault, _) = vault_address(owner, asset, program_id)?;
        let (holding, _) = holding_address(asset, program_id)?;
        let (lockup, _) = lockup_address(owner, &holding, program_id)?;
        Ok(Instruction::Lock {
            amount,
            release_time,
            vault,
            holding,
            lockup,
            source: *source,
        })
    }

    pub fn lock_native(
        program_id: &Address,
        owner: &Address,
        amount: u64,
        release_time: i64,
    ) -> Result<Self, AddressError> {
        let (vault, _) = native_vault_address(owner, program_id)?;
        let (lockup, _) = lockup_address(owner, &vault, program_id)?;
        Ok(Instruction::LockNative {
            amount,
            release_time,
            vault,
            lockup,
        })
    }

    /// Release the owner's lockup into their associated token account.
    pub fn unlock(program_id: &Address, owner: &Address, asset: &Address) -> Result<Self, AddressError> {
        let (receiver, _) = associated_token_address(owner, asset)?;
        Self::unlock_to(program_id, owner, asset, &receiver)
    }

    /// Release the owner's lockup into an explicit token account.
    pub fn unlock_to(
        program_id: &Address,
        owner: &Address,
        asset: &Address,
        receiver: &Address,
    ) -> Result<Self, AddressError> {
        let (vault, _) = vault_address(owner, asset, program_id)?;
        let (holding, _) = holding_address(asset, program_id)?;
        let (lockup, _) = lockup_address(owner, &holding, program_id)?;
        let (authority, _) = authority_address(program_id)?;
        Ok(Instruction::Unlock {
            vault,
            holding,
            lockup,
            authority,
            receiver: *receiver,
        })
    }

    pub fn unlock_native(program_id: &Address, owner: &Address) -> Result<Self, AddressError> {
        Self::unlock_native_to(program_id, owner, owner)
    }

    pub fn unlock_native_to(
        program_id: &Address,
        owner: &Address,
        receiver: &Address,
    ) -> Result<Self, AddressError> {
        let (vault, _) = native_vault_address(owner, program_id)?;
        let (lockup, _) = lockup_address(owner, &vault, program_id)?;
        Ok(Instruction::UnlockNative {
            vault,
            lockup,
            receiver: *receiver,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_VAULT_PROGRAM_ID;

    fn addr(b: u8) -> Address {
        Address::new_from_array([b; 32])
    }

    #[test]
    fn lock_and_unlock_share_vault_and_lockup() {
        let p = DEFAULT_VAULT_PROGRAM_ID;
        let lock = Instruction::lock(&p, &addr(1), &addr(2), 5, 0).unwrap();
        let unlock = Instruction::unlock(&p, &addr(1), &addr(2)).unwrap();

        let (
            Instruction::Lock {
                vault: v1,
                lockup: l1,
                source,
                ..
            },
            Instruction::Unlock {
                vault: v2,
                lockup: l2,
                receiver,
                ..
            },
        ) = (lock, unlock)
        else {
            panic!("unexpected variants");
        };
        assert_eq!(v1, v2);
        assert_eq!(l1, l2);
        assert_eq!(source, receiver);
    }

    #[test]
    fn account_keys_start_with_signer_and_dedupe() {
        let ix = Instruction::UnlockNative {
            vault: addr(2),
            lockup: addr(3),
            receiver: addr(1),
        };
        assert_eq!(ix.account_keys(&addr(1)), vec![addr(1), addr(2), addr(3)]);
    }

    #[test]
    fn json_is_tagged() {
        let ix = Instruction::lock_native(&DEFAULT_VAULT_PROGRAM_ID, &addr(1), 5_000, 10).unwrap();
        let json = serde_json::to_value(&ix).unwrap();
        assert_eq!(json["type"], "lock_native");
        assert_eq!(json["amount"], 5_000);
        let back: Instruction = serde_json::from_value(json).unwrap();
        assert_eq!(back, ix);
        assert_eq!(ix.kind().to_string(), "lock_native");
    }
}
