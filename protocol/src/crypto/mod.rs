//! # Cryptographic Primitives for HODL
//!
//! Two jobs, both boring on purpose:
//!
//! - **SHA-256** for address derivation and record discriminators.
//! - **Ed25519** for transaction signatures - the caller identity behind
//!   every vault operation.
//!
//! Everything here is a thin, type-safe wrapper around audited crates.
//! If you're tempted to optimize these functions, please reconsider.

pub mod hash;
pub mod keys;

pub use hash::{sha256, sha256_array, sha256_multi};
pub use keys::{KeyError, Keypair, Signature};
