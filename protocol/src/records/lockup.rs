use serde::{Deserialize, Serialize};

use super::{Record, RecordOwner};
use crate::address::Address;

/// One outstanding timed claim.
///
/// Created by a lock, never mutated, closed by the matching unlock in
/// the same commit as the outbound transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockupRecord {
    /// The depositor, and the only identity funds can go back to.
    pub owner: Address,
    /// Vault record this claim was made against.
    pub vault: Address,
    pub amount: u64,
    /// Seconds since the Unix epoch.
    pub release_time: i64,
}

impl LockupRecord {
    pub fn is_mature(&self, now: i64) -> bool {
        now >= self.release_time
    }
}

impl Record for LockupRecord {
    const NAME: &'static str = "TokenLockup";
    const LEN: usize = 8 + 32 + 32 + 8 + 8;
    const OWNER: RecordOwner = RecordOwner::Vault;
}
