//! # LedgerDb: Persistent Account Store
//!
//! The persistence layer for the HODL ledger, built on sled's embedded
//! key-value store. All on-disk data flows through this module.
//!
//! ## Tree Layout
//!
//! | Tree         | Key                 | Value               |
//! |--------------|---------------------|---------------------|
//! | `accounts`   | `address` (32B)     | `bincode(Account)`  |
//! | `signatures` | `signature` (64B)   | `bincode(receipt)`  |
//!
//! ## Atomicity
//!
//! [`LedgerDb::transact`] reads every account an operation references,
//! hands them to the caller's closure, and writes the result back in one
//! sled transaction spanning both trees. Either every account change and
//! the signature entry land, or nothing does.
//!
//! sled transactions are optimistic: if another thread commits a write to
//! any key we read, our closure is re-run against the fresh values. Two
//! racing operations on the same address are therefore serialized, and
//! the loser sees the winner's state. The closure must be a pure function
//! of its input for this to hold.

use serde::de::DeserializeOwned;
use serde::Serialize;
use sled::transaction::{ConflictableTransactionError, ConflictableTransactionResult, TransactionError};
use sled::{Db, Transactional, Tree};
use std::path::Path;

use crate::address::Address;
use crate::crypto::keys::Signature;
use crate::error::{LedgerError, LedgerResult};
use crate::records::Account;

/// One account change: `Some` to write, `None` to delete.
pub type AccountWrite = (Address, Option<Account>);

/// Accounts as loaded for one operation, in request order. Missing
/// addresses come back as `None`.
pub type Snapshot = Vec<(Address, Option<Account>)>;

// ---------------------------------------------------------------------------
// LedgerDb
// ---------------------------------------------------------------------------

/// Persistent storage for ledger accounts and processed signatures.
///
/// # Thread Safety
///
/// sled trees support lock-free concurrent reads and serialized writes.
/// `LedgerDb` is a bundle of cheap handles; clone it freely across
/// threads.
#[derive(Debug, Clone)]
pub struct LedgerDb {
    db: Db,
    accounts: Tree,
    signatures: Tree,
}

impl LedgerDb {
    /// Open or create a database at the given filesystem path.
    pub fn open<P: AsRef<Path>>(path: P) -> LedgerResult<Self> {
        let db = sled::open(path)?;
        Self::from_db(db)
    }

    /// A database that is deleted when dropped. Ideal for tests.
    pub fn open_temporary() -> LedgerResult<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::from_db(db)
    }

    fn from_db(db: Db) -> LedgerResult<Self> {
        let accounts = db.open_tree("accounts")?;
        let signatures = db.open_tree("signatures")?;
        Ok(Self {
            db,
            accounts,
            signatures,
        })
    }

    // -- Reads ---------------------------------------------------------------

    /// The account at `address`, if any.
    pub fn get_account(&self, address: &Address) -> LedgerResult<Option<Account>> {
        match self.accounts.get(address.as_ref())? {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Every stored account, in address order.
    pub fn scan_accounts(&self) -> impl Iterator<Item = LedgerResult<(Address, Account)>> + '_ {
        self.accounts.iter().map(|entry| {
            let (key, value) = entry?;
            let bytes: [u8; 32] = key.as_ref().try_into().map_err(|_| {
                LedgerError::Serialization(format!("bad account key length {}", key.len()))
            })?;
            let account: Account = bincode::deserialize(&value)?;
            Ok((Address::new_from_array(bytes), account))
        })
    }

    pub fn has_signature(&self, signature: &Signature) -> LedgerResult<bool> {
        Ok(self.signatures.contains_key(&signature.as_bytes()[..])?)
    }

    /// The value committed alongside `signature`.
    pub fn get_receipt<T: DeserializeOwned>(&self, signature: &Signature) -> LedgerResult<Option<T>> {
        match self.signatures.get(&signature.as_bytes()[..])? {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn account_count(&self) -> usize {
        self.accounts.len()
    }

    pub fn signature_count(&self) -> usize {
        self.signatures.len()
    }

    // -- Atomic commit -------------------------------------------------------

    /// Load `keys`, run `apply`, and commit its writes atomically.
    ///
    /// When `signature` is given it must not have been processed before
    /// (checked inside the same transaction), and `apply`'s output is
    /// stored under it. `apply` may run more than once under contention.
    pub fn transact<T, F>(
        &self,
        signature: Option<Signature>,
        keys: &[Address],
        apply: F,
    ) -> LedgerResult<T>
    where
        T: Serialize,
        F: Fn(Snapshot) -> LedgerResult<(T, Vec<AccountWrite>)>,
    {
        let result = (&self.accounts, &self.signatures).transaction(
            |(accounts, signatures)| -> ConflictableTransactionResult<T, LedgerError> {
                if let Some(sig) = &signature {
                    if signatures.get(&sig.as_bytes()[..])?.is_some() {
                        return Err(abort(LedgerError::DuplicateTransaction(*sig)));
                    }
                }

                let mut snapshot = Vec::with_capacity(keys.len());
                for key in keys {
                    let account = match accounts.get(key.as_ref())? {
                        Some(bytes) => Some(
                            bincode::deserialize::<Account>(&bytes)
                                .map_err(|e| abort(e.into()))?,
                        ),
                        None => None,
                    };
                    snapshot.push((*key, account));
                }

                let (output, writes) = apply(snapshot).map_err(abort)?;

                for (address, account) in &writes {
                    match account {
                        Some(account) => {
                            let bytes = bincode::serialize(account).map_err(|e| abort(e.into()))?;
                            accounts.insert(address.as_ref(), bytes)?;
                        }
                        None => {
                            accounts.remove(address.as_ref())?;
                        }
                    }
                }

                if let Some(sig) = &signature {
                    let bytes = bincode::serialize(&output).map_err(|e| abort(e.into()))?;
                    signatures.insert(&sig.as_bytes()[..], bytes)?;
                }

                Ok(output)
            },
        );

        match result {
            Ok(output) => Ok(output),
            Err(TransactionError::Abort(err)) => Err(err),
            Err(TransactionError::Storage(err)) => Err(err.into()),
        }
    }

    /// Force a flush of all pending writes to disk.
    pub fn flush(&self) -> LedgerResult<()> {
        self.db.flush()?;
        Ok(())
    }
}

fn abort(err: LedgerError) -> ConflictableTransactionError<LedgerError> {
    ConflictableTransactionError::Abort(err)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::keys::Keypair;

    fn addr(b: u8) -> Address {
        Address::new_from_array([b; 32])
    }

    fn fund(db: &LedgerDb, address: Address, lamports: u64) {
        db.transact(None, &[address], |_| {
            Ok(((), vec![(address, Some(Account::wallet(lamports)))]))
        })
        .unwrap();
    }

    #[test]
    fn open_temporary_database() {
        let db = LedgerDb::open_temporary().expect("should create temp db");
        assert_eq!(db.account_count(), 0);
        assert_eq!(db.signature_count(), 0);
        assert_eq!(db.get_account(&addr(1)).unwrap(), None);
    }

    #[test]
    fn reopen_persistent_database() {
        let dir = tempfile::tempdir().expect("tempdir");
        {
            let db = LedgerDb::open(dir.path()).expect("should open db");
            fund(&db, addr(1), 500);
            db.flush().unwrap();
        }
        let db = LedgerDb::open(dir.path()).expect("should reopen db");
        assert_eq!(db.get_account(&addr(1)).unwrap(), Some(Account::wallet(500)));
    }

    #[test]
    fn snapshot_follows_key_order() {
        let db = LedgerDb::open_temporary().unwrap();
        fund(&db, addr(2), 7);

        db.transact(None, &[addr(1), addr(2)], |snapshot| {
            assert_eq!(snapshot[0], (addr(1), None));
            assert_eq!(snapshot[1], (addr(2), Some(Account::wallet(7))));
            Ok(((), Vec::new()))
        })
        .unwrap();
    }

    #[test]
    fn aborted_transaction_writes_nothing() {
        let db = LedgerDb::open_temporary().unwrap();
        let sig = Keypair::generate().sign(b"tx");

        let err = db
            .transact::<(), _>(Some(sig), &[addr(1)], |_| Err(LedgerError::InvalidAmount))
            .unwrap_err();
        assert_eq!(err, LedgerError::InvalidAmount);
        assert_eq!(db.account_count(), 0);
        assert!(!db.has_signature(&sig).unwrap());
    }

    #[test]
    fn deletes_and_writes_commit_together() {
        let db = LedgerDb::open_temporary().unwrap();
        fund(&db, addr(1), 10);

        db.transact(None, &[addr(1), addr(2)], |_| {
            Ok((
                (),
                vec![(addr(1), None), (addr(2), Some(Account::wallet(10)))],
            ))
        })
        .unwrap();

        assert_eq!(db.get_account(&addr(1)).unwrap(), None);
        assert_eq!(db.get_account(&addr(2)).unwrap(), Some(Account::wallet(10)));
    }

    #[test]
    fn signature_is_indexed_with_output() {
        let db = LedgerDb::open_temporary().unwrap();
        let sig = Keypair::generate().sign(b"tx");

        let out = db
            .transact(Some(sig), &[], |_| Ok((42u64, Vec::new())))
            .unwrap();
        assert_eq!(out, 42);
        assert!(db.has_signature(&sig).unwrap());
        assert_eq!(db.get_receipt::<u64>(&sig).unwrap(), Some(42));

        let err = db
            .transact(Some(sig), &[], |_| Ok((43u64, Vec::new())))
            .unwrap_err();
        assert_eq!(err, LedgerError::DuplicateTransaction(sig));
    }

    #[test]
    fn scan_returns_every_account() {
        let db = LedgerDb::open_temporary().unwrap();
        fund(&db, addr(3), 3);
        fund(&db, addr(1), 1);

        let all: Vec<_> = db.scan_accounts().collect::<LedgerResult<_>>().unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].0, addr(1));
        assert_eq!(all[1].1.lamports, 3);
    }
}
