//! # Account Working Set
//!
//! An [`AccountSet`] holds every account one operation may touch, loaded
//! up front from a storage snapshot. Processing mutates the set in
//! memory; only when the whole operation succeeds are the dirty entries
//! handed back to storage as one atomic write. A failure simply drops
//! the set.
//!
//! Accounts that were not loaded cannot be read or written. An operation
//! can only ever affect the accounts its instruction named.

use std::collections::BTreeMap;

use crate::address::Address;
use crate::config::{RentConfig, SYSTEM_PROGRAM_ID};
use crate::error::{LedgerError, LedgerResult};
use crate::records::{Account, Record};
use crate::storage::{AccountWrite, Snapshot};

#[derive(Debug)]
struct Entry {
    account: Option<Account>,
    dirty: bool,
}

/// Working copy of the accounts referenced by one operation.
#[derive(Debug)]
pub struct AccountSet {
    program_id: Address,
    rent: RentConfig,
    entries: BTreeMap<Address, Entry>,
}

impl AccountSet {
    pub fn new(program_id: Address, rent: RentConfig, snapshot: Snapshot) -> Self {
        let entries = snapshot
            .into_iter()
            .map(|(address, account)| {
                (
                    address,
                    Entry {
                        account,
                        dirty: false,
                    },
                )
            })
            .collect();
        Self {
            program_id,
            rent,
            entries,
        }
    }

    pub fn program_id(&self) -> &Address {
        &self.program_id
    }

    pub fn rent(&self) -> &RentConfig {
        &self.rent
    }

    fn entry(&self, address: &Address) -> LedgerResult<&Entry> {
        self.entries
            .get(address)
            .ok_or(LedgerError::AccountNotFound(*address))
    }

    fn entry_mut(&mut self, address: &Address) -> LedgerResult<&mut Entry> {
        let entry = self
            .entries
            .get_mut(address)
            .ok_or(LedgerError::AccountNotFound(*address))?;
        entry.dirty = true;
        Ok(entry)
    }

    // -- Reads ----------------------------------------------------------------

    /// Whether an account exists at `address`. Unloaded counts as absent.
    pub fn exists(&self, address: &Address) -> bool {
        matches!(
            self.entries.get(address),
            Some(Entry {
                account: Some(_),
                ..
            })
        )
    }

    /// Whether `address` holds anything beyond a bare lamport balance.
    /// Coin sent to an address ahead of time does not block creation.
    pub fn is_initialized(&self, address: &Address) -> bool {
        matches!(
            self.entries.get(address),
            Some(Entry {
                account: Some(account),
                ..
            }) if !account.is_wallet()
        )
    }

    pub fn get(&self, address: &Address) -> LedgerResult<&Account> {
        self.entry(address)?
            .account
            .as_ref()
            .ok_or(LedgerError::AccountNotFound(*address))
    }

    /// Lamport balance; zero for an absent account.
    pub fn lamports(&self, address: &Address) -> LedgerResult<u64> {
        Ok(self
            .entry(address)?
            .account
            .as_ref()
            .map_or(0, |a| a.lamports))
    }

    /// Decode the record at `address`, checking owner and discriminator.
    pub fn record<R: Record>(&self, address: &Address) -> LedgerResult<R> {
        let account = self.get(address)?;
        let expected_owner = R::OWNER.resolve(&self.program_id);
        if account.owner != expected_owner {
            return Err(LedgerError::InvalidAccountData {
                address: *address,
                reason: format!("{} must be owned by {expected_owner}", R::NAME),
            });
        }
        R::decode(&account.data).map_err(|e| LedgerError::InvalidAccountData {
            address: *address,
            reason: e.to_string(),
        })
    }

    /// Like [`Self::record`], but `None` when no record lives there.
    pub fn maybe_record<R: Record>(&self, address: &Address) -> LedgerResult<Option<R>> {
        if self.is_initialized(address) {
            self.record(address).map(Some)
        } else {
            Ok(None)
        }
    }

    // -- Writes ---------------------------------------------------------------

    /// Move lamports between two loaded accounts. A missing destination
    /// springs into existence as a wallet.
    pub fn transfer_lamports(&mut self, from: &Address, to: &Address, amount: u64) -> LedgerResult<()> {
        if amount == 0 || from == to {
            return Ok(());
        }
        let available = self.lamports(from)?;
        let remaining = available
            .checked_sub(amount)
            .ok_or(LedgerError::InsufficientFunds {
                required: amount,
                available,
            })?;
        let credited = self
            .lamports(to)?
            .checked_add(amount)
            .ok_or(LedgerError::ArithmeticOverflow)?;

        if let Some(account) = self.entry_mut(from)?.account.as_mut() {
            account.lamports = remaining;
        }
        let dest = self.entry_mut(to)?;
        dest.account
            .get_or_insert_with(|| Account::wallet(0))
            .lamports = credited;
        Ok(())
    }

    /// Add lamports out of thin air. Faucet only.
    pub fn credit_lamports(&mut self, to: &Address, amount: u64) -> LedgerResult<()> {
        let credited = self
            .lamports(to)?
            .checked_add(amount)
            .ok_or(LedgerError::ArithmeticOverflow)?;
        self.entry_mut(to)?
            .account
            .get_or_insert_with(|| Account::wallet(0))
            .lamports = credited;
        Ok(())
    }

    /// Create `record` at an empty address, with `payer` funding the
    /// storage deposit.
    pub fn create_record<R: Record>(&mut self, address: &Address, payer: &Address, record: &R) -> LedgerResult<()> {
        if self.is_initialized(address) {
            return Err(LedgerError::AlreadyInitialized { address: *address });
        }
        let data = record.encode().map_err(|e| LedgerError::Serialization(e.to_string()))?;
        let deposit = self.rent.minimum_balance(data.len());
        self.transfer_lamports(payer, address, deposit)?;

        let owner = R::OWNER.resolve(&self.program_id);
        let entry = self.entry_mut(address)?;
        let account = entry.account.get_or_insert_with(|| Account::wallet(0));
        account.owner = owner;
        account.data = data;
        Ok(())
    }

    /// Overwrite an existing record of the same kind.
    pub fn write_record<R: Record>(&mut self, address: &Address, record: &R) -> LedgerResult<()> {
        // Type and owner check on the old contents.
        self.record::<R>(address)?;
        let data = record.encode().map_err(|e| LedgerError::Serialization(e.to_string()))?;
        let entry = self.entry_mut(address)?;
        if let Some(account) = entry.account.as_mut() {
            account.data = data;
        }
        Ok(())
    }

    /// Delete the account at `address`, sending every lamport it held to
    /// `refund_to`.
    pub fn close(&mut self, address: &Address, refund_to: &Address) -> LedgerResult<u64> {
        let lamports = self.get(address)?.lamports;
        self.transfer_lamports(address, refund_to, lamports)?;
        self.entry_mut(address)?.account = None;
        Ok(lamports)
    }

    /// Storage deposit the account at `address` must keep.
    pub fn minimum_balance(&self, address: &Address) -> LedgerResult<u64> {
        let account = self.get(address)?;
        if account.owner == SYSTEM_PROGRAM_ID && account.data.is_empty() {
            return Ok(0);
        }
        Ok(self.rent.minimum_balance(account.data.len()))
    }

    // -- Commit ---------------------------------------------------------------

    /// Changed entries, ready for storage.
    pub fn into_writes(self) -> Vec<AccountWrite> {
        self.entries
            .into_iter()
            .filter(|(_, entry)| entry.dirty)
            .map(|(address, entry)| (address, entry.account))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_VAULT_PROGRAM_ID;
    use crate::records::{LockupRecord, NativeVaultRecord, TokenAccount};

    fn addr(b: u8) -> Address {
        Address::new_from_array([b; 32])
    }

    fn set(rent: RentConfig, snapshot: Snapshot) -> AccountSet {
        AccountSet::new(DEFAULT_VAULT_PROGRAM_ID, rent, snapshot)
    }

    #[test]
    fn unloaded_accounts_are_unreachable() {
        let mut accounts = set(RentConfig::free(), vec![(addr(1), None)]);
        assert_eq!(accounts.get(&addr(2)), Err(LedgerError::AccountNotFound(addr(2))));
        assert!(accounts.transfer_lamports(&addr(1), &addr(2), 0).is_ok());
        assert!(accounts.credit_lamports(&addr(2), 5).is_err());
    }

    #[test]
    fn transfer_checks_balance() {
        let mut accounts = set(
            RentConfig::free(),
            vec![(addr(1), Some(Account::wallet(10))), (addr(2), None)],
        );
        assert_eq!(
            accounts.transfer_lamports(&addr(1), &addr(2), 11),
            Err(LedgerError::InsufficientFunds {
                required: 11,
                available: 10
            })
        );
        accounts.transfer_lamports(&addr(1), &addr(2), 4).unwrap();
        assert_eq!(accounts.lamports(&addr(1)).unwrap(), 6);
        assert_eq!(accounts.lamports(&addr(2)).unwrap(), 4);
        assert_eq!(accounts.into_writes().len(), 2);
    }

    #[test]
    fn create_record_charges_deposit() {
        let rent = RentConfig {
            lamports_per_byte: 1,
            account_overhead: 0,
        };
        let mut accounts = set(
            rent,
            vec![(addr(1), Some(Account::wallet(100))), (addr(2), None)],
        );
        let record = NativeVaultRecord { owner: addr(1) };
        accounts.create_record(&addr(2), &addr(1), &record).unwrap();

        assert_eq!(accounts.lamports(&addr(2)).unwrap(), NativeVaultRecord::LEN as u64);
        assert_eq!(accounts.lamports(&addr(1)).unwrap(), 100 - NativeVaultRecord::LEN as u64);
        assert_eq!(accounts.record::<NativeVaultRecord>(&addr(2)).unwrap(), record);
        assert_eq!(accounts.minimum_balance(&addr(2)).unwrap(), NativeVaultRecord::LEN as u64);

        assert_eq!(
            accounts.create_record(&addr(2), &addr(1), &record),
            Err(LedgerError::AlreadyInitialized { address: addr(2) })
        );
    }

    #[test]
    fn create_record_fails_without_deposit() {
        let mut accounts = set(
            RentConfig::default(),
            vec![(addr(1), Some(Account::wallet(1))), (addr(2), None)],
        );
        let err = accounts
            .create_record(&addr(2), &addr(1), &NativeVaultRecord { owner: addr(1) })
            .unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientFunds { .. }));
        assert!(!accounts.exists(&addr(2)));
    }

    #[test]
    fn prefunded_address_can_still_be_created() {
        let mut accounts = set(
            RentConfig::free(),
            vec![(addr(1), None), (addr(2), Some(Account::wallet(50)))],
        );
        assert!(accounts.exists(&addr(2)));
        assert!(!accounts.is_initialized(&addr(2)));
        accounts
            .create_record(&addr(2), &addr(1), &NativeVaultRecord { owner: addr(1) })
            .unwrap();
        assert!(accounts.is_initialized(&addr(2)));
        assert_eq!(accounts.lamports(&addr(2)).unwrap(), 50);
    }

    #[test]
    fn record_checks_owner_program() {
        let token = TokenAccount {
            mint: addr(9),
            owner: addr(1),
            amount: 5,
        };
        let forged = Account {
            lamports: 0,
            owner: DEFAULT_VAULT_PROGRAM_ID,
            data: token.encode().unwrap(),
        };
        let accounts = set(RentConfig::free(), vec![(addr(2), Some(forged))]);
        assert!(matches!(
            accounts.record::<TokenAccount>(&addr(2)),
            Err(LedgerError::InvalidAccountData { .. })
        ));
        assert!(matches!(
            accounts.record::<LockupRecord>(&addr(2)),
            Err(LedgerError::InvalidAccountData { .. })
        ));
    }

    #[test]
    fn close_refunds_everything() {
        let rent = RentConfig {
            lamports_per_byte: 2,
            account_overhead: 0,
        };
        let mut accounts = set(
            rent,
            vec![(addr(1), Some(Account::wallet(1_000))), (addr(2), None)],
        );
        let lockup = LockupRecord {
            owner: addr(1),
            vault: addr(3),
            amount: 1,
            release_time: 0,
        };
        accounts.create_record(&addr(2), &addr(1), &lockup).unwrap();
        let refunded = accounts.close(&addr(2), &addr(1)).unwrap();

        assert_eq!(refunded, 2 * LockupRecord::LEN as u64);
        assert_eq!(accounts.lamports(&addr(1)).unwrap(), 1_000);
        assert!(!accounts.exists(&addr(2)));
        assert_eq!(accounts.maybe_record::<LockupRecord>(&addr(2)).unwrap(), None);

        let writes = accounts.into_writes();
        assert!(writes.contains(&(addr(2), None)));
    }

    #[test]
    fn untouched_accounts_are_not_written() {
        let accounts = set(RentConfig::free(), vec![(addr(1), Some(Account::wallet(5)))]);
        assert!(accounts.into_writes().is_empty());
    }
}
