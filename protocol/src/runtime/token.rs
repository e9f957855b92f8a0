//! # Token Program
//!
//! Just enough of a fungible-token program for vaults to work against:
//! mints, token accounts, minting, and authority-checked transfers.
//!
//! Custodial holdings are ordinary token accounts whose `owner` is the
//! vault authority. Nothing here knows about vaults; the processor
//! decides *who* may act as the authority before calling [`transfer`].

use crate::address::Address;
use crate::derivation::AccountRole;
use crate::error::{LedgerError, LedgerResult};
use crate::records::{Mint, TokenAccount};

use super::accounts::AccountSet;

/// Create a mint at `mint`. `payer` funds the storage deposit.
pub fn create_mint(
    accounts: &mut AccountSet,
    payer: &Address,
    mint: &Address,
    mint_authority: &Address,
    decimals: u8,
) -> LedgerResult<Mint> {
    let record = Mint {
        mint_authority: *mint_authority,
        decimals,
        supply: 0,
    };
    accounts.create_record(mint, payer, &record)?;
    Ok(record)
}

/// Create an empty token account of `mint` controlled by `owner`.
pub fn create_account(
    accounts: &mut AccountSet,
    payer: &Address,
    address: &Address,
    mint: &Address,
    owner: &Address,
) -> LedgerResult<TokenAccount> {
    accounts.record::<Mint>(mint)?;
    let record = TokenAccount {
        mint: *mint,
        owner: *owner,
        amount: 0,
    };
    accounts.create_record(address, payer, &record)?;
    Ok(record)
}

/// Issue `amount` new units of `mint` into `destination`.
pub fn mint_to(
    accounts: &mut AccountSet,
    mint: &Address,
    destination: &Address,
    authority: &Address,
    amount: u64,
) -> LedgerResult<()> {
    let mut mint_record = accounts.record::<Mint>(mint)?;
    if mint_record.mint_authority != *authority {
        return Err(LedgerError::OwnerMismatch {
            role: AccountRole::Asset,
            expected: mint_record.mint_authority,
            got: *authority,
        });
    }
    let mut dest = accounts.record::<TokenAccount>(destination)?;
    if dest.mint != *mint {
        return Err(mint_mismatch(destination, mint));
    }

    mint_record.supply = mint_record
        .supply
        .checked_add(amount)
        .ok_or(LedgerError::ArithmeticOverflow)?;
    dest.amount = dest
        .amount
        .checked_add(amount)
        .ok_or(LedgerError::ArithmeticOverflow)?;

    accounts.write_record(mint, &mint_record)?;
    accounts.write_record(destination, &dest)?;
    Ok(())
}

/// Move `amount` units from `source` to `destination`, authorized by
/// `authority`, which must own `source`.
pub fn transfer(
    accounts: &mut AccountSet,
    source: &Address,
    destination: &Address,
    authority: &Address,
    amount: u64,
) -> LedgerResult<()> {
    let mut src = accounts.record::<TokenAccount>(source)?;
    let mut dst = accounts.record::<TokenAccount>(destination)?;

    if src.owner != *authority {
        return Err(LedgerError::OwnerMismatch {
            role: AccountRole::Source,
            expected: src.owner,
            got: *authority,
        });
    }
    if dst.mint != src.mint {
        return Err(mint_mismatch(destination, &src.mint));
    }
    if src.amount < amount {
        return Err(LedgerError::InsufficientFunds {
            required: amount,
            available: src.amount,
        });
    }
    if source == destination {
        return Ok(());
    }

    src.amount -= amount;
    dst.amount = dst
        .amount
        .checked_add(amount)
        .ok_or(LedgerError::ArithmeticOverflow)?;

    accounts.write_record(source, &src)?;
    accounts.write_record(destination, &dst)?;
    Ok(())
}

fn mint_mismatch(account: &Address, mint: &Address) -> LedgerError {
    LedgerError::InvalidAccountData {
        address: *account,
        reason: format!("token account is not for mint {mint}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{RentConfig, DEFAULT_VAULT_PROGRAM_ID};
    use crate::records::Account;

    fn addr(b: u8) -> Address {
        Address::new_from_array([b; 32])
    }

    const PAYER: u8 = 1;
    const MINT: u8 = 2;
    const ALICE_TA: u8 = 3;
    const BOB_TA: u8 = 4;
    const ALICE: u8 = 10;
    const BOB: u8 = 11;

    fn setup() -> AccountSet {
        let mut accounts = AccountSet::new(
            DEFAULT_VAULT_PROGRAM_ID,
            RentConfig::free(),
            vec![
                (addr(PAYER), Some(Account::wallet(0))),
                (addr(MINT), None),
                (addr(ALICE_TA), None),
                (addr(BOB_TA), None),
            ],
        );
        create_mint(&mut accounts, &addr(PAYER), &addr(MINT), &addr(PAYER), 6).unwrap();
        create_account(&mut accounts, &addr(PAYER), &addr(ALICE_TA), &addr(MINT), &addr(ALICE)).unwrap();
        create_account(&mut accounts, &addr(PAYER), &addr(BOB_TA), &addr(MINT), &addr(BOB)).unwrap();
        mint_to(&mut accounts, &addr(MINT), &addr(ALICE_TA), &addr(PAYER), 1_000).unwrap();
        accounts
    }

    fn balance(accounts: &AccountSet, b: u8) -> u64 {
        accounts.record::<TokenAccount>(&addr(b)).unwrap().amount
    }

    #[test]
    fn mint_to_updates_supply() {
        let accounts = setup();
        assert_eq!(balance(&accounts, ALICE_TA), 1_000);
        assert_eq!(accounts.record::<Mint>(&addr(MINT)).unwrap().supply, 1_000);
    }

    #[test]
    fn mint_to_requires_mint_authority() {
        let mut accounts = setup();
        let err = mint_to(&mut accounts, &addr(MINT), &addr(ALICE_TA), &addr(ALICE), 1).unwrap_err();
        assert!(matches!(err, LedgerError::OwnerMismatch { .. }));
    }

    #[test]
    fn transfer_moves_units() {
        let mut accounts = setup();
        transfer(&mut accounts, &addr(ALICE_TA), &addr(BOB_TA), &addr(ALICE), 400).unwrap();
        assert_eq!(balance(&accounts, ALICE_TA), 600);
        assert_eq!(balance(&accounts, BOB_TA), 400);
    }

    #[test]
    fn transfer_requires_source_owner() {
        let mut accounts = setup();
        let err = transfer(&mut accounts, &addr(ALICE_TA), &addr(BOB_TA), &addr(BOB), 1).unwrap_err();
        assert_eq!(
            err,
            LedgerError::OwnerMismatch {
                role: AccountRole::Source,
                expected: addr(ALICE),
                got: addr(BOB),
            }
        );
    }

    #[test]
    fn transfer_rejects_overdraft() {
        let mut accounts = setup();
        let err = transfer(&mut accounts, &addr(ALICE_TA), &addr(BOB_TA), &addr(ALICE), 1_001).unwrap_err();
        assert_eq!(
            err,
            LedgerError::InsufficientFunds {
                required: 1_001,
                available: 1_000
            }
        );
        assert_eq!(balance(&accounts, ALICE_TA), 1_000);
    }

    #[test]
    fn token_account_needs_a_real_mint() {
        let mut accounts = setup();
        let err = create_account(&mut accounts, &addr(PAYER), &addr(BOB_TA), &addr(ALICE_TA), &addr(BOB))
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidAccountData { .. }));
    }
}
