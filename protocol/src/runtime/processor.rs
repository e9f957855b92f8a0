//! # Vault Processor
//!
//! The six state transitions. Each one runs against an [`AccountSet`]
//! that already holds every referenced account, and follows the same
//! shape:
//!
//! 1. Re-derive every supplied reference from the signer and the stored
//!    records. Any difference is an `AddressMismatch`.
//! 2. Check prior state (record exists, slot is free, lock has matured).
//! 3. Move funds and create or close records.
//!
//! Nothing here persists anything. If any step fails the caller drops
//! the working set and the ledger is untouched.

use tracing::debug;

use super::accounts::AccountSet;
use super::instruction::Instruction;
use super::token;
use crate::address::Address;
use crate::config::AUTHORITY_SEED;
use crate::derivation::{
    authority_address, holding_address, lockup_address, native_vault_address, vault_address,
    AccountRole,
};
use crate::error::{LedgerError, LedgerResult};
use crate::records::{LockupRecord, Mint, NativeVaultRecord, Record, TokenAccount, VaultRecord};

/// Apply `instruction` on behalf of `signer` at ledger time `now`.
pub fn process(
    accounts: &mut AccountSet,
    signer: &Address,
    instruction: &Instruction,
    now: i64,
) -> LedgerResult<()> {
    debug!(kind = %instruction.kind(), %signer, "dispatching instruction");

    match instruction {
        Instruction::InitializeVault {
            asset,
            vault,
            holding,
            authority,
        } => initialize_vault(accounts, signer, asset, vault, holding, authority),
        Instruction::InitializeNativeVault { vault } => {
            initialize_native_vault(accounts, signer, vault)
        }
        Instruction::Lock {
            amount,
            release_time,
            vault,
            holding,
            lockup,
            source,
        } => lock(
            accounts,
            signer,
            *amount,
            *release_time,
            vault,
            holding,
            lockup,
            source,
        ),
        Instruction::LockNative {
            amount,
            release_time,
            vault,
            lockup,
        } => lock_native(accounts, signer, *amount, *release_time, vault, lockup),
        Instruction::Unlock {
            vault,
            holding,
            lockup,
            authority,
            receiver,
        } => unlock(accounts, signer, now, vault, holding, lockup, authority, receiver),
        Instruction::UnlockNative {
            vault,
            lockup,
            receiver,
        } => unlock_native(accounts, signer, now, vault, lockup, receiver),
    }
}

// ---------------------------------------------------------------------------
// Initialize
// ---------------------------------------------------------------------------

fn initialize_vault(
    accounts: &mut AccountSet,
    signer: &Address,
    asset: &Address,
    vault: &Address,
    holding: &Address,
    authority: &Address,
) -> LedgerResult<()> {
    let program_id = *accounts.program_id();
    let (expected_vault, _) = vault_address(signer, asset, &program_id)?;
    check_address(AccountRole::Vault, &expected_vault, vault)?;
    let (expected_holding, _) = holding_address(asset, &program_id)?;
    check_address(AccountRole::Holding, &expected_holding, holding)?;
    let (expected_authority, bump) = authority_address(&program_id)?;
    check_address(AccountRole::Authority, &expected_authority, authority)?;

    accounts.record::<Mint>(asset)?;
    if accounts.is_initialized(vault) {
        return Err(LedgerError::AlreadyInitialized { address: *vault });
    }

    // The holding is shared per asset: the first depositor creates it,
    // everyone after reuses it.
    if accounts.is_initialized(holding) {
        let existing = accounts.record::<TokenAccount>(holding)?;
        if existing.owner != *authority {
            return Err(LedgerError::OwnerMismatch {
                role: AccountRole::Holding,
                expected: *authority,
                got: existing.owner,
            });
        }
        if existing.mint != *asset {
            return Err(LedgerError::InvalidAccountData {
                address: *holding,
                reason: format!("holding is not for asset {asset}"),
            });
        }
    } else {
        token::create_account(accounts, signer, holding, asset, authority)?;
        debug!(%holding, %asset, "created custodial holding");
    }

    let record = VaultRecord {
        owner: *signer,
        asset: *asset,
        holding: *holding,
        bump,
    };
    accounts.create_record(vault, signer, &record)?;
    debug!(%vault, owner = %signer, %asset, "initialized vault");
    Ok(())
}

fn initialize_native_vault(accounts: &mut AccountSet, signer: &Address, vault: &Address) -> LedgerResult<()> {
    let (expected, _) = native_vault_address(signer, accounts.program_id())?;
    check_address(AccountRole::NativeVault, &expected, vault)?;

    accounts.create_record(vault, signer, &NativeVaultRecord { owner: *signer })?;
    debug!(%vault, owner = %signer, "initialized native vault");
    Ok(())
}

// ---------------------------------------------------------------------------
// Lock
// ---------------------------------------------------------------------------

#[allow(clippy::too_many_arguments)]
fn lock(
    accounts: &mut AccountSet,
    signer: &Address,
    amount: u64,
    release_time: i64,
    vault: &Address,
    holding: &Address,
    lockup: &Address,
    source: &Address,
) -> LedgerResult<()> {
    if amount == 0 {
        return Err(LedgerError::InvalidAmount);
    }
    let program_id = *accounts.program_id();
    let record = load_vault(accounts, signer, vault)?;

    check_address(AccountRole::Holding, &record.holding, holding)?;
    let (expected_holding, _) = holding_address(&record.asset, &program_id)?;
    check_address(AccountRole::Holding, &expected_holding, holding)?;
    let (expected_lockup, _) = lockup_address(signer, holding, &program_id)?;
    check_address(AccountRole::Lockup, &expected_lockup, lockup)?;

    if accounts.is_initialized(lockup) {
        return Err(LedgerError::AlreadyLocked { address: *lockup });
    }

    let src = accounts.record::<TokenAccount>(source)?;
    if src.owner != *signer {
        return Err(LedgerError::OwnerMismatch {
            role: AccountRole::Source,
            expected: *signer,
            got: src.owner,
        });
    }
    if src.mint != record.asset {
        return Err(LedgerError::InvalidAccountData {
            address: *source,
            reason: format!("source is not for asset {}", record.asset),
        });
    }

    token::transfer(accounts, source, holding, signer, amount)?;
    let lockup_record = LockupRecord {
        owner: *signer,
        vault: *vault,
        amount,
        release_time,
    };
    accounts.create_record(lockup, signer, &lockup_record)?;
    debug!(%lockup, amount, release_time, "locked tokens");
    Ok(())
}

fn lock_native(
    accounts: &mut AccountSet,
    signer: &Address,
    amount: u64,
    release_time: i64,
    vault: &Address,
    lockup: &Address,
) -> LedgerResult<()> {
    if amount == 0 {
        return Err(LedgerError::InvalidAmount);
    }
    let program_id = *accounts.program_id();
    let record = accounts
        .maybe_record::<NativeVaultRecord>(vault)?
        .ok_or(LedgerError::VaultNotFound { address: *vault })?;
    let (expected_vault, _) = native_vault_address(signer, &program_id)?;
    check_address(AccountRole::NativeVault, &expected_vault, vault)?;
    if record.owner != *signer {
        return Err(LedgerError::OwnerMismatch {
            role: AccountRole::NativeVault,
            expected: *signer,
            got: record.owner,
        });
    }

    let (expected_lockup, _) = lockup_address(signer, vault, &program_id)?;
    check_address(AccountRole::Lockup, &expected_lockup, lockup)?;
    if accounts.is_initialized(lockup) {
        return Err(LedgerError::AlreadyLocked { address: *lockup });
    }

    let deposit = accounts.rent().minimum_balance(LockupRecord::LEN);
    let available = accounts.lamports(signer)?;
    // An amount that overflows with the deposit can never be covered.
    let required = amount.checked_add(deposit).unwrap_or(u64::MAX);
    if available < required {
        return Err(LedgerError::InsufficientFunds {
            required,
            available,
        });
    }

    accounts.transfer_lamports(signer, vault, amount)?;
    let lockup_record = LockupRecord {
        owner: *signer,
        vault: *vault,
        amount,
        release_time,
    };
    accounts.create_record(lockup, signer, &lockup_record)?;
    debug!(%lockup, amount, release_time, "locked native coin");
    Ok(())
}

// ---------------------------------------------------------------------------
// Unlock
// ---------------------------------------------------------------------------

#[allow(clippy::too_many_arguments)]
fn unlock(
    accounts: &mut AccountSet,
    signer: &Address,
    now: i64,
    vault: &Address,
    holding: &Address,
    lockup: &Address,
    authority: &Address,
    receiver: &Address,
) -> LedgerResult<()> {
    let program_id = *accounts.program_id();
    let record = load_vault(accounts, signer, vault)?;

    check_address(AccountRole::Holding, &record.holding, holding)?;
    let bump_seed = [record.bump];
    let authority_seeds: &[&[u8]] = &[AUTHORITY_SEED, &bump_seed];
    let expected_authority = Address::create_program_address(authority_seeds, &program_id)?;
    check_address(AccountRole::Authority, &expected_authority, authority)?;
    let (expected_lockup, _) = lockup_address(signer, holding, &program_id)?;
    check_address(AccountRole::Lockup, &expected_lockup, lockup)?;

    let lock = accounts
        .maybe_record::<LockupRecord>(lockup)?
        .ok_or(LedgerError::LockupNotFound { address: *lockup })?;
    check_lockup(&lock, signer, vault)?;

    // Receiver first: a wrong receiver will never succeed, however long
    // the caller waits.
    let receiver_ok = matches!(
        accounts.record::<TokenAccount>(receiver),
        Ok(account) if account.owner == lock.owner && account.mint == record.asset
    );
    if !receiver_ok {
        return Err(LedgerError::UnauthorizedReceiver {
            receiver: *receiver,
        });
    }
    if !lock.is_mature(now) {
        return Err(LedgerError::NotYetMatured {
            release_time: lock.release_time,
            now,
        });
    }

    token::transfer(accounts, holding, receiver, authority, lock.amount)?;
    accounts.close(lockup, signer)?;
    debug!(%lockup, amount = lock.amount, %receiver, "released tokens");
    Ok(())
}

fn unlock_native(
    accounts: &mut AccountSet,
    signer: &Address,
    now: i64,
    vault: &Address,
    lockup: &Address,
    receiver: &Address,
) -> LedgerResult<()> {
    let program_id = *accounts.program_id();
    accounts
        .maybe_record::<NativeVaultRecord>(vault)?
        .ok_or(LedgerError::VaultNotFound { address: *vault })?;
    let (expected_vault, _) = native_vault_address(signer, &program_id)?;
    check_address(AccountRole::NativeVault, &expected_vault, vault)?;
    let (expected_lockup, _) = lockup_address(signer, vault, &program_id)?;
    check_address(AccountRole::Lockup, &expected_lockup, lockup)?;

    let lock = accounts
        .maybe_record::<LockupRecord>(lockup)?
        .ok_or(LedgerError::LockupNotFound { address: *lockup })?;
    check_lockup(&lock, signer, vault)?;

    if *receiver != lock.owner {
        return Err(LedgerError::UnauthorizedReceiver {
            receiver: *receiver,
        });
    }
    if !lock.is_mature(now) {
        return Err(LedgerError::NotYetMatured {
            release_time: lock.release_time,
            now,
        });
    }

    // The vault never dips into its own storage deposit.
    let floor = accounts.minimum_balance(vault)?;
    let available = accounts.lamports(vault)?.saturating_sub(floor);
    if available < lock.amount {
        return Err(LedgerError::InsufficientFunds {
            required: lock.amount,
            available,
        });
    }

    accounts.transfer_lamports(vault, receiver, lock.amount)?;
    accounts.close(lockup, signer)?;
    debug!(%lockup, amount = lock.amount, %receiver, "released native coin");
    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn check_address(role: AccountRole, expected: &Address, got: &Address) -> LedgerResult<()> {
    if expected == got {
        Ok(())
    } else {
        Err(LedgerError::AddressMismatch {
            role,
            expected: *expected,
            got: *got,
        })
    }
}

/// Load a fungible vault and confirm it is the signer's vault for the
/// asset it records.
fn load_vault(accounts: &AccountSet, signer: &Address, vault: &Address) -> LedgerResult<VaultRecord> {
    let record = accounts
        .maybe_record::<VaultRecord>(vault)?
        .ok_or(LedgerError::VaultNotFound { address: *vault })?;
    let (expected, _) = vault_address(signer, &record.asset, accounts.program_id())?;
    check_address(AccountRole::Vault, &expected, vault)?;
    Ok(record)
}

/// The lockup must belong to the signer and point at the vault being
/// drawn from. The authority signs for every holding, so this is what
/// stops one depositor's claim from draining another's vault.
fn check_lockup(lock: &LockupRecord, signer: &Address, vault: &Address) -> LedgerResult<()> {
    if lock.owner != *signer {
        return Err(LedgerError::OwnerMismatch {
            role: AccountRole::Lockup,
            expected: *signer,
            got: lock.owner,
        });
    }
    check_address(AccountRole::Vault, &lock.vault, vault)
}
