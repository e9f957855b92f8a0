//! Error types for the HODL ledger.
//!
//! Every operation that can fail returns a [`LedgerError`]. Each variant
//! carries a stable numeric code (6000 range) that callers can match on
//! without parsing messages, and an [`ErrorClass`] that says whether
//! waiting could ever help.
//!
//! No error leaves partial state behind: a failed transaction commits
//! nothing, including its signature.

use serde::Serialize;
use thiserror::Error;

use crate::address::{Address, AddressError};
use crate::crypto::keys::Signature;
use crate::derivation::AccountRole;

/// How a caller should treat a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    /// The same request may succeed later without any change.
    Transient,
    /// The request itself is wrong. Resubmitting it will fail again.
    CallerError,
    /// Something broke underneath the ledger.
    Internal,
}

/// Errors raised by the ledger runtime.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// A record already exists at the derived address.
    #[error("account {address} is already initialized")]
    AlreadyInitialized { address: Address },

    /// No vault record at the supplied address.
    #[error("no vault at {address}")]
    VaultNotFound { address: Address },

    /// The owner already has an outstanding lockup against this vault.
    #[error("lockup {address} is already outstanding")]
    AlreadyLocked { address: Address },

    /// No lockup record at the derived address.
    #[error("no lockup at {address}")]
    LockupNotFound { address: Address },

    /// The lockup exists but its release time is still in the future.
    #[error("lockup matures at {release_time}, current time is {now}")]
    NotYetMatured { release_time: i64, now: i64 },

    /// The receiver does not belong to the depositor.
    #[error("receiver {receiver} does not belong to the lockup owner")]
    UnauthorizedReceiver { receiver: Address },

    #[error("insufficient funds: required {required}, available {available}")]
    InsufficientFunds { required: u64, available: u64 },

    /// A supplied account reference does not match its derived address.
    #[error("{role} address mismatch: expected {expected}, got {got}")]
    AddressMismatch {
        role: AccountRole,
        expected: Address,
        got: Address,
    },

    #[error("amount must be greater than zero")]
    InvalidAmount,

    #[error("account {0} not found")]
    AccountNotFound(Address),

    /// The account exists but does not hold the expected record.
    #[error("account {address} holds invalid data: {reason}")]
    InvalidAccountData { address: Address, reason: String },

    /// An account is controlled by someone other than expected.
    #[error("{role} owner mismatch: expected {expected}, got {got}")]
    OwnerMismatch {
        role: AccountRole,
        expected: Address,
        got: Address,
    },

    #[error("arithmetic overflow")]
    ArithmeticOverflow,

    #[error("invalid derivation seeds: {0}")]
    InvalidSeeds(String),

    #[error("invalid transaction signature")]
    InvalidSignature,

    #[error("transaction {0} was already processed")]
    DuplicateTransaction(Signature),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Shorthand used across the crate.
pub type LedgerResult<T> = Result<T, LedgerError>;

impl LedgerError {
    /// Stable numeric code. Never renumber an existing variant.
    pub fn code(&self) -> u32 {
        match self {
            LedgerError::AlreadyInitialized { .. } => 6000,
            LedgerError::VaultNotFound { .. } => 6001,
            LedgerError::AlreadyLocked { .. } => 6002,
            LedgerError::LockupNotFound { .. } => 6003,
            LedgerError::NotYetMatured { .. } => 6004,
            LedgerError::UnauthorizedReceiver { .. } => 6005,
            LedgerError::InsufficientFunds { .. } => 6006,
            LedgerError::AddressMismatch { .. } => 6007,
            LedgerError::InvalidAmount => 6008,
            LedgerError::AccountNotFound(_) => 6009,
            LedgerError::InvalidAccountData { .. } => 6010,
            LedgerError::OwnerMismatch { .. } => 6011,
            LedgerError::ArithmeticOverflow => 6012,
            LedgerError::InvalidSeeds(_) => 6013,
            LedgerError::InvalidSignature => 6014,
            LedgerError::DuplicateTransaction(_) => 6015,
            LedgerError::Storage(_) => 6016,
            LedgerError::Serialization(_) => 6017,
        }
    }

    /// Variant name, for logs and API bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            LedgerError::AlreadyInitialized { .. } => "AlreadyInitialized",
            LedgerError::VaultNotFound { .. } => "VaultNotFound",
            LedgerError::AlreadyLocked { .. } => "AlreadyLocked",
            LedgerError::LockupNotFound { .. } => "LockupNotFound",
            LedgerError::NotYetMatured { .. } => "NotYetMatured",
            LedgerError::UnauthorizedReceiver { .. } => "UnauthorizedReceiver",
            LedgerError::InsufficientFunds { .. } => "InsufficientFunds",
            LedgerError::AddressMismatch { .. } => "AddressMismatch",
            LedgerError::InvalidAmount => "InvalidAmount",
            LedgerError::AccountNotFound(_) => "AccountNotFound",
            LedgerError::InvalidAccountData { .. } => "InvalidAccountData",
            LedgerError::OwnerMismatch { .. } => "OwnerMismatch",
            LedgerError::ArithmeticOverflow => "ArithmeticOverflow",
            LedgerError::InvalidSeeds(_) => "InvalidSeeds",
            LedgerError::InvalidSignature => "InvalidSignature",
            LedgerError::DuplicateTransaction(_) => "DuplicateTransaction",
            LedgerError::Storage(_) => "Storage",
            LedgerError::Serialization(_) => "Serialization",
        }
    }

    pub fn class(&self) -> ErrorClass {
        match self {
            LedgerError::NotYetMatured { .. } => ErrorClass::Transient,
            LedgerError::Storage(_) | LedgerError::Serialization(_) => ErrorClass::Internal,
            _ => ErrorClass::CallerError,
        }
    }

    /// Whether resubmitting later, unchanged, could succeed.
    pub fn is_transient(&self) -> bool {
        self.class() == ErrorClass::Transient
    }
}

impl From<AddressError> for LedgerError {
    fn from(err: AddressError) -> Self {
        LedgerError::InvalidSeeds(err.to_string())
    }
}

impl From<sled::Error> for LedgerError {
    fn from(err: sled::Error) -> Self {
        LedgerError::Storage(err.to_string())
    }
}

impl From<bincode::Error> for LedgerError {
    fn from(err: bincode::Error) -> Self {
        LedgerError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(b: u8) -> Address {
        Address::new_from_array([b; 32])
    }

    #[test]
    fn only_maturity_is_transient() {
        let not_yet = LedgerError::NotYetMatured {
            release_time: 100,
            now: 50,
        };
        assert!(not_yet.is_transient());

        let receiver = LedgerError::UnauthorizedReceiver { receiver: addr(1) };
        let mismatch = LedgerError::AddressMismatch {
            role: AccountRole::Vault,
            expected: addr(1),
            got: addr(2),
        };
        assert_eq!(receiver.class(), ErrorClass::CallerError);
        assert_eq!(mismatch.class(), ErrorClass::CallerError);
        assert_ne!(receiver.code(), mismatch.code());
    }

    #[test]
    fn storage_failures_are_internal() {
        assert_eq!(
            LedgerError::Storage("disk on fire".into()).class(),
            ErrorClass::Internal
        );
        assert_eq!(
            LedgerError::Serialization("bad".into()).class(),
            ErrorClass::Internal
        );
    }

    #[test]
    fn codes_are_stable() {
        assert_eq!(LedgerError::AlreadyInitialized { address: addr(0) }.code(), 6000);
        assert_eq!(LedgerError::AddressMismatch {
            role: AccountRole::Lockup,
            expected: addr(0),
            got: addr(1),
        }
        .code(), 6007);
        assert_eq!(LedgerError::Serialization(String::new()).code(), 6017);
    }

    #[test]
    fn messages_name_the_role() {
        let err = LedgerError::AddressMismatch {
            role: AccountRole::Holding,
            expected: addr(1),
            got: addr(2),
        };
        assert!(err.to_string().starts_with("holding address mismatch"));
        assert_eq!(err.kind(), "AddressMismatch");
    }

    #[test]
    fn address_errors_become_invalid_seeds() {
        let err: LedgerError = AddressError::MaxSeedLengthExceeded.into();
        assert!(matches!(err, LedgerError::InvalidSeeds(_)));
    }
}
