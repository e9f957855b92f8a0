//! Storage layer.
//!
//! - [`db`] - sled-backed account store with atomic multi-key commits and
//!   a processed-signature index.

pub mod db;

pub use db::{AccountWrite, LedgerDb, Snapshot};
