// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # HODL Protocol: Core Library
//!
//! A custodial escrow ledger. Depositors park a fungible asset (a token
//! mint or the native coin) in a vault, attach a time lock to it, and can
//! only get it back once the lock has matured. Nobody else can touch it
//! in the meantime, and there is no admin override.
//!
//! All state lives in addressed accounts. Every interesting address is
//! *derived* from stable seeds (owner, asset, role), so the runtime can
//! check that a caller handed it the right account instead of trusting
//! whatever it was given.
//!
//! ## Architecture
//!
//! - **address / derivation** - 32-byte addresses and the seed rules that
//!   produce vault, holding, lockup, and authority addresses.
//! - **records** - the on-ledger record layouts (vaults, lockups, mints,
//!   token accounts) and their discriminator-prefixed encoding.
//! - **storage** - sled-backed account store with atomic commits.
//! - **runtime** - transactions, the working account set, token-program
//!   semantics, the six vault operations, and the [`Ledger`] facade.
//! - **metadata** - asset metadata lists for display.
//! - **config** - seeds, program ids, and storage-deposit parameters.
//!
//! ## Design Philosophy
//!
//! 1. Every operation commits completely or not at all.
//! 2. Every supplied account reference is re-derived and checked.
//! 3. Time is injected. The core never reads a wall clock on its own.
//! 4. If it touches money, it has tests. Plural.

pub mod address;
pub mod config;
pub mod crypto;
pub mod derivation;
pub mod error;
pub mod metadata;
pub mod records;
pub mod runtime;
pub mod storage;

pub use address::Address;
pub use error::{ErrorClass, LedgerError, LedgerResult};
pub use runtime::{Clock, Instruction, Ledger, ManualClock, Receipt, SystemClock, Transaction};
