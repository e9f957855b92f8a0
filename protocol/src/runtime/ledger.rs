//! # Ledger
//!
//! The front door. A [`Ledger`] ties together storage, configuration, and
//! a clock, and exposes:
//!
//! - [`Ledger::process`] / [`Ledger::submit`] for the six vault
//!   operations, as signed transactions.
//! - Setup utilities a development ledger needs before anyone can lock
//!   anything: a coin faucet, mint creation, token accounts, minting.
//! - Read-only snapshots for display: single records and owner scans.
//!
//! `Ledger` is cheap to clone and safe to share across threads. Every
//! write goes through one sled transaction, so concurrent submissions
//! that touch the same address are serialized by storage.

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::accounts::AccountSet;
use super::clock::Clock;
use super::instruction::Instruction;
use super::processor;
use super::token;
use super::transaction::{Receipt, Transaction};
use crate::address::Address;
use crate::config::LedgerConfig;
use crate::crypto::keys::{Keypair, Signature};
use crate::derivation::{associated_token_address, holding_address, lockup_address, native_vault_address, vault_address};
use crate::error::{LedgerError, LedgerResult};
use crate::records::{Account, LockupRecord, NativeVaultRecord, Record, TokenAccount, VaultRecord};
use crate::storage::LedgerDb;

/// A vault ledger over a [`LedgerDb`].
#[derive(Debug, Clone)]
pub struct Ledger {
    db: LedgerDb,
    config: LedgerConfig,
    clock: Arc<dyn Clock>,
}

impl Ledger {
    pub fn new(db: LedgerDb, config: LedgerConfig, clock: Arc<dyn Clock>) -> Self {
        Self { db, config, clock }
    }

    /// A ledger over a throwaway database.
    pub fn open_temporary(config: LedgerConfig, clock: Arc<dyn Clock>) -> LedgerResult<Self> {
        Ok(Self::new(LedgerDb::open_temporary()?, config, clock))
    }

    pub fn program_id(&self) -> &Address {
        &self.config.program_id
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn db(&self) -> &LedgerDb {
        &self.db
    }

    /// Current ledger time.
    pub fn now(&self) -> i64 {
        self.clock.now()
    }

    // -- Transactions ---------------------------------------------------------

    /// Verify and apply a signed transaction.
    pub fn process(&self, tx: &Transaction) -> LedgerResult<Receipt> {
        let result = tx.verify().and_then(|()| self.apply(tx));
        match &result {
            Ok(receipt) => info!(
                signature = %receipt.signature,
                kind = %receipt.kind,
                signer = %receipt.signer,
                touched = receipt.touched.len(),
                "transaction committed"
            ),
            Err(err) => warn!(
                signature = %tx.signature,
                kind = %tx.instruction.kind(),
                code = err.code(),
                error = %err,
                "transaction rejected"
            ),
        }
        result
    }

    /// Sign `instruction` with `keypair` under a random nonce and process it.
    pub fn submit(&self, keypair: &Keypair, instruction: Instruction) -> LedgerResult<Receipt> {
        let tx = Transaction::new_signed(instruction, keypair, rand::random())?;
        self.process(&tx)
    }

    fn apply(&self, tx: &Transaction) -> LedgerResult<Receipt> {
        let keys = tx.instruction.account_keys(&tx.signer);
        self.db.transact(Some(tx.signature), &keys, |snapshot| {
            let now = self.clock.now();
            let mut accounts = AccountSet::new(self.config.program_id, self.config.rent, snapshot);
            processor::process(&mut accounts, &tx.signer, &tx.instruction, now)?;
            let writes = accounts.into_writes();
            let receipt = Receipt {
                signature: tx.signature,
                kind: tx.instruction.kind(),
                signer: tx.signer,
                timestamp: now,
                touched: writes.iter().map(|(address, _)| *address).collect(),
            };
            Ok((receipt, writes))
        })
    }

    /// Receipt of an already processed transaction.
    pub fn receipt(&self, signature: &Signature) -> LedgerResult<Option<Receipt>> {
        self.db.get_receipt(signature)
    }

    // -- Setup utilities ------------------------------------------------------

    /// Faucet: credit `lamports` of native coin to `to`.
    pub fn airdrop(&self, to: &Address, lamports: u64) -> LedgerResult<()> {
        self.run_unsigned(&[*to], |accounts| accounts.credit_lamports(to, lamports))?;
        debug!(%to, lamports, "airdrop");
        Ok(())
    }

    /// Genesis: credit `lamports` to `operator` if the account has never
    /// existed. Returns whether anything was paid.
    pub fn initialize_genesis(&self, operator: &Address, lamports: u64) -> LedgerResult<bool> {
        let funded = self.run_unsigned(&[*operator], |accounts| {
            if accounts.exists(operator) {
                return Ok(false);
            }
            accounts.credit_lamports(operator, lamports)?;
            Ok(true)
        })?;
        if funded {
            info!(%operator, lamports, "genesis allocation credited");
        }
        Ok(funded)
    }

    /// Move native coin between two wallets.
    pub fn transfer(&self, from: &Address, to: &Address, lamports: u64) -> LedgerResult<()> {
        if lamports == 0 {
            return Err(LedgerError::InvalidAmount);
        }
        self.run_unsigned(&[*from, *to], |accounts| accounts.transfer_lamports(from, to, lamports))?;
        debug!(%from, %to, lamports, "transfer");
        Ok(())
    }

    /// Create a new mint at a fresh address. `payer` funds the deposit.
    pub fn create_mint(&self, payer: &Address, mint_authority: &Address, decimals: u8) -> LedgerResult<Address> {
        let mint = Address::new_unique();
        self.run_unsigned(&[*payer, mint], |accounts| {
            token::create_mint(accounts, payer, &mint, mint_authority, decimals).map(|_| ())
        })?;
        debug!(%mint, decimals, "created mint");
        Ok(mint)
    }

    /// Create `owner`'s associated token account for `mint`.
    pub fn create_token_account(&self, payer: &Address, owner: &Address, mint: &Address) -> LedgerResult<Address> {
        let (address, _) = associated_token_address(owner, mint)?;
        self.run_unsigned(&[*payer, *mint, address], |accounts| {
            token::create_account(accounts, payer, &address, mint, owner).map(|_| ())
        })?;
        debug!(%address, %owner, %mint, "created token account");
        Ok(address)
    }

    /// Mint `amount` units into `owner`'s associated token account.
    pub fn mint_to(&self, mint: &Address, mint_authority: &Address, owner: &Address, amount: u64) -> LedgerResult<()> {
        let (destination, _) = associated_token_address(owner, mint)?;
        self.run_unsigned(&[*mint, destination], |accounts| {
            token::mint_to(accounts, mint, &destination, mint_authority, amount)
        })?;
        debug!(%mint, %destination, amount, "minted");
        Ok(())
    }

    fn run_unsigned<T, F>(&self, keys: &[Address], apply: F) -> LedgerResult<T>
    where
        T: serde::Serialize,
        F: Fn(&mut AccountSet) -> LedgerResult<T>,
    {
        self.db.transact(None, keys, |snapshot| {
            let mut accounts = AccountSet::new(self.config.program_id, self.config.rent, snapshot);
            let out = apply(&mut accounts)?;
            Ok((out, accounts.into_writes()))
        })
    }

    // -- Reads ----------------------------------------------------------------

    pub fn account(&self, address: &Address) -> LedgerResult<Option<Account>> {
        self.db.get_account(address)
    }

    /// Native coin balance; zero for an unknown address.
    pub fn lamports(&self, address: &Address) -> LedgerResult<u64> {
        Ok(self.account(address)?.map_or(0, |a| a.lamports))
    }

    /// Typed record at `address`, if one lives there.
    pub fn record<R: Record>(&self, address: &Address) -> LedgerResult<Option<R>> {
        match self.account(address)? {
            Some(account) if !account.is_wallet() => self.decode(address, &account).map(Some),
            _ => Ok(None),
        }
    }

    fn decode<R: Record>(&self, address: &Address, account: &Account) -> LedgerResult<R> {
        let expected_owner = R::OWNER.resolve(&self.config.program_id);
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

    pub fn vault(&self, owner: &Address, asset: &Address) -> LedgerResult<Option<VaultRecord>> {
        let (address, _) = vault_address(owner, asset, self.program_id())?;
        self.record(&address)
    }

    pub fn native_vault(&self, owner: &Address) -> LedgerResult<Option<NativeVaultRecord>> {
        let (address, _) = native_vault_address(owner, self.program_id())?;
        self.record(&address)
    }

    /// Outstanding fungible lockup of `owner` for `asset`.
    pub fn lockup(&self, owner: &Address, asset: &Address) -> LedgerResult<Option<LockupRecord>> {
        let (holding, _) = holding_address(asset, self.program_id())?;
        let (address, _) = lockup_address(owner, &holding, self.program_id())?;
        self.record(&address)
    }

    /// Outstanding native lockup of `owner`.
    pub fn native_lockup(&self, owner: &Address) -> LedgerResult<Option<LockupRecord>> {
        let (vault, _) = native_vault_address(owner, self.program_id())?;
        let (address, _) = lockup_address(owner, &vault, self.program_id())?;
        self.record(&address)
    }

    /// Units of `mint` in `owner`'s associated token account.
    pub fn token_balance(&self, owner: &Address, mint: &Address) -> LedgerResult<u64> {
        let (address, _) = associated_token_address(owner, mint)?;
        Ok(self
            .record::<TokenAccount>(&address)?
            .map_or(0, |account| account.amount))
    }

    /// Every record of kind `R` on the ledger.
    pub fn records<R: Record>(&self) -> LedgerResult<Vec<(Address, R)>> {
        let owner = R::OWNER.resolve(&self.config.program_id);
        let mut out = Vec::new();
        for entry in self.db.scan_accounts() {
            let (address, account) = entry?;
            if account.owner == owner && R::matches(&account.data) {
                out.push((address, self.decode(&address, &account)?));
            }
        }
        Ok(out)
    }

    pub fn vaults_of(&self, owner: &Address) -> LedgerResult<Vec<(Address, VaultRecord)>> {
        Ok(self
            .records::<VaultRecord>()?
            .into_iter()
            .filter(|(_, r)| r.owner == *owner)
            .collect())
    }

    pub fn native_vaults_of(&self, owner: &Address) -> LedgerResult<Vec<(Address, NativeVaultRecord)>> {
        Ok(self
            .records::<NativeVaultRecord>()?
            .into_iter()
            .filter(|(_, r)| r.owner == *owner)
            .collect())
    }

    pub fn lockups_of(&self, owner: &Address) -> LedgerResult<Vec<(Address, LockupRecord)>> {
        Ok(self
            .records::<LockupRecord>()?
            .into_iter()
            .filter(|(_, r)| r.owner == *owner)
            .collect())
    }

    pub fn token_accounts_of(&self, owner: &Address) -> LedgerResult<Vec<(Address, TokenAccount)>> {
        Ok(self
            .records::<TokenAccount>()?
            .into_iter()
            .filter(|(_, r)| r.owner == *owner)
            .collect())
    }
}
