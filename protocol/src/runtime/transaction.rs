//! Signed transaction envelope and receipts.
//!
//! The signing data is `bincode(instruction, signer, nonce)`. The nonce
//! only exists so that the same instruction can be submitted twice on
//! purpose; identical envelopes produce identical signatures, and the
//! ledger refuses to process a signature it has seen before.

use serde::{Deserialize, Serialize};

use super::instruction::{Instruction, InstructionKind};
use crate::address::Address;
use crate::crypto::keys::{Keypair, Signature};
use crate::error::{LedgerError, LedgerResult};

/// An instruction signed by the depositor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub instruction: Instruction,
    pub signer: Address,
    pub nonce: u64,
    pub signature: Signature,
}

impl Transaction {
    /// Build and sign in one step.
    pub fn new_signed(instruction: Instruction, keypair: &Keypair, nonce: u64) -> LedgerResult<Self> {
        let signer = keypair.address();
        let message = signable_bytes(&instruction, &signer, nonce)?;
        let signature = keypair.sign(&message);
        Ok(Self {
            instruction,
            signer,
            nonce,
            signature,
        })
    }

    /// Canonical bytes covered by the signature.
    pub fn signable_bytes(&self) -> LedgerResult<Vec<u8>> {
        signable_bytes(&self.instruction, &self.signer, self.nonce)
    }

    /// Check the signature against the signer address.
    pub fn verify(&self) -> LedgerResult<()> {
        let message = self.signable_bytes()?;
        if self.signature.verify(&self.signer, &message) {
            Ok(())
        } else {
            Err(LedgerError::InvalidSignature)
        }
    }
}

fn signable_bytes(instruction: &Instruction, signer: &Address, nonce: u64) -> LedgerResult<Vec<u8>> {
    Ok(bincode::serialize(&(instruction, signer, nonce))?)
}

/// What a committed transaction did. Stored in the signature index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub signature: Signature,
    pub kind: InstructionKind,
    pub signer: Address,
    /// Ledger time the transaction was processed at.
    pub timestamp: i64,
    /// Accounts written or closed.
    pub touched: Vec<Address>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_VAULT_PROGRAM_ID;

    fn lock_ix(owner: &Address) -> Instruction {
        Instruction::lock_native(&DEFAULT_VAULT_PROGRAM_ID, owner, 100, 0).unwrap()
    }

    #[test]
    fn signed_transaction_verifies() {
        let kp = Keypair::generate();
        let tx = Transaction::new_signed(lock_ix(&kp.address()), &kp, 1).unwrap();
        assert!(tx.verify().is_ok());
    }

    #[test]
    fn tampering_breaks_signature() {
        let kp = Keypair::generate();
        let mut tx = Transaction::new_signed(lock_ix(&kp.address()), &kp, 1).unwrap();
        tx.nonce = 2;
        assert_eq!(tx.verify(), Err(LedgerError::InvalidSignature));
    }

    #[test]
    fn signer_swap_is_rejected() {
        let alice = Keypair::generate();
        let mallory = Keypair::generate();
        let mut tx = Transaction::new_signed(lock_ix(&alice.address()), &mallory, 1).unwrap();
        tx.signer = alice.address();
        assert_eq!(tx.verify(), Err(LedgerError::InvalidSignature));
    }

    #[test]
    fn nonce_changes_signature() {
        let kp = Keypair::from_seed(&[4u8; 32]);
        let a = Transaction::new_signed(lock_ix(&kp.address()), &kp, 1).unwrap();
        let b = Transaction::new_signed(lock_ix(&kp.address()), &kp, 1).unwrap();
        let c = Transaction::new_signed(lock_ix(&kp.address()), &kp, 2).unwrap();
        assert_eq!(a.signature, b.signature);
        assert_ne!(a.signature, c.signature);
    }

    #[test]
    fn json_roundtrip_still_verifies() {
        let kp = Keypair::generate();
        let tx = Transaction::new_signed(lock_ix(&kp.address()), &kp, 9).unwrap();
        let json = serde_json::to_string(&tx).unwrap();
        let back: Transaction = serde_json::from_str(&json).unwrap();
        assert_eq!(back, tx);
        assert!(back.verify().is_ok());
    }
}
