//! # Runtime
//!
//! Everything between "a signed transaction arrives" and "accounts are
//! committed".
//!
//! ```text
//! clock.rs       - Clock trait, SystemClock, ManualClock
//! instruction.rs - The six operations and their account references
//! transaction.rs - Signed envelope, verification, receipts
//! accounts.rs    - Per-operation working set of loaded accounts
//! token.rs       - Mints, token accounts, authority-checked transfers
//! processor.rs   - Validation and state transitions for each operation
//! ledger.rs      - Facade: submit, setup utilities, reads
//! ```

pub mod accounts;
pub mod clock;
pub mod instruction;
pub mod ledger;
pub mod processor;
pub mod token;
pub mod transaction;

pub use accounts::AccountSet;
pub use clock::{Clock, ManualClock, SystemClock};
pub use instruction::{Instruction, InstructionKind};
pub use ledger::Ledger;
pub use transaction::{Receipt, Transaction};
