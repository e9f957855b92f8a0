//! # Hashing Utilities
//!
//! SHA-256 is the only hash in the ledger. It feeds derived addresses
//! (`sha256(seeds || program_id || marker)`) and record discriminators
//! (`sha256("account:<Name>")[..8]`). Both are part of the persisted
//! format, so swapping the hash would orphan every existing record.

use sha2::{Digest, Sha256};

/// Compute the SHA-256 hash of the input data.
///
/// # Example
///
/// ```
/// use hodl_protocol::crypto::sha256;
///
/// let hash = sha256(b"HODL");
/// assert_eq!(hash.len(), 32);
/// ```
pub fn sha256(data: &[u8]) -> Vec<u8> {
    sha256_array(data).to_vec()
}

/// Compute the SHA-256 hash and return a fixed-size array.
pub fn sha256_array(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let mut output = [0u8; 32];
    output.copy_from_slice(&hasher.finalize());
    output
}

/// Hash multiple byte slices together without concatenation overhead.
///
/// Derivation preimages are a handful of seeds plus the program id, so
/// feeding them to the hasher one by one saves the temporary buffer.
pub fn sha256_multi(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    let mut output = [0u8; 32];
    output.copy_from_slice(&hasher.finalize());
    output
}
