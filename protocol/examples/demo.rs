//! Walkthrough of a full HODL vault lifecycle.
//!
//! Funds a depositor, issues a token, opens a fungible and a native
//! vault, locks both, tries to unlock early, lets time pass, and unlocks.
//! The output uses ANSI escape codes for colored terminal rendering.
//!
//! Run with:
//!   cargo run --example demo

use std::sync::Arc;

use hodl_protocol::config::{LedgerConfig, LAMPORTS_PER_COIN, NATIVE_DECIMALS};
use hodl_protocol::crypto::keys::Keypair;
use hodl_protocol::derivation::holding_address;
use hodl_protocol::metadata::format_units;
use hodl_protocol::records::TokenAccount;
use hodl_protocol::{Instruction, Ledger, LedgerError, ManualClock};

// ---------------------------------------------------------------------------
// ANSI color constants
// ---------------------------------------------------------------------------

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";

const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const RED: &str = "\x1b[31m";
const CYAN: &str = "\x1b[36m";
const WHITE: &str = "\x1b[37m";

const BG_BLUE: &str = "\x1b[44m";

// ---------------------------------------------------------------------------
// Display helpers
// ---------------------------------------------------------------------------

fn banner() {
    println!();
    println!("{BG_BLUE}{BOLD}{WHITE}                                                        {RESET}");
    println!("{BG_BLUE}{BOLD}{WHITE}    HODL  --  Time-Locked Vault Walkthrough             {RESET}");
    println!("{BG_BLUE}{BOLD}{WHITE}                                                        {RESET}");
    println!();
}

fn section(num: u32, title: &str) {
    println!();
    println!("{BOLD}{CYAN}===[{YELLOW} Step {num} {CYAN}]==========================================={RESET}");
    println!("{BOLD}{WHITE}  {title}{RESET}");
}

fn kv(key: &str, value: impl std::fmt::Display) {
    println!("  {DIM}{key:<22}{RESET} {value}");
}

fn ok(text: &str) {
    println!("  {GREEN}✓ {text}{RESET}");
}

fn rejected(err: &LedgerError) {
    println!(
        "  {RED}✗ rejected [{}] {}{RESET} {DIM}({:?}){RESET}",
        err.code(),
        err,
        err.class()
    );
}

fn main() -> Result<(), LedgerError> {
    banner();

    let start = 1_700_000_000;
    let clock = Arc::new(ManualClock::new(start));
    let ledger = Ledger::open_temporary(LedgerConfig::default(), clock.clone())?;
    let program = *ledger.program_id();

    // -- 1 ---------------------------------------------------------------------
    section(1, "Fund a depositor and issue a token");
    let issuer = Keypair::generate();
    let alice = Keypair::generate();
    ledger.airdrop(&issuer.address(), 2 * LAMPORTS_PER_COIN)?;
    ledger.airdrop(&alice.address(), 2 * LAMPORTS_PER_COIN)?;

    let mint = ledger.create_mint(&issuer.address(), &issuer.address(), 6)?;
    ledger.create_token_account(&issuer.address(), &alice.address(), &mint)?;
    ledger.mint_to(&mint, &issuer.address(), &alice.address(), 100_000)?;
    kv("depositor", alice.address());
    kv("mint", mint);
    kv("token balance", ledger.token_balance(&alice.address(), &mint)?);
    kv(
        "coin balance",
        format_units(ledger.lamports(&alice.address())?, NATIVE_DECIMALS),
    );

    // -- 2 ---------------------------------------------------------------------
    section(2, "Open vaults");
    ledger.submit(&alice, Instruction::initialize_vault(&program, &alice.address(), &mint)?)?;
    ledger.submit(&alice, Instruction::initialize_native_vault(&program, &alice.address())?)?;
    ok("fungible and native vaults created");
    if let Err(err) = ledger.submit(&alice, Instruction::initialize_vault(&program, &alice.address(), &mint)?) {
        rejected(&err);
    }

    // -- 3 ---------------------------------------------------------------------
    section(3, "Lock for one hour");
    let release = start + 3_600;
    ledger.submit(&alice, Instruction::lock(&program, &alice.address(), &mint, 5_000, release)?)?;
    ledger.submit(&alice, Instruction::lock_native(&program, &alice.address(), LAMPORTS_PER_COIN / 2, release)?)?;
    let (holding, _) = holding_address(&mint, &program)?;
    let held = ledger.record::<TokenAccount>(&holding)?.map_or(0, |h| h.amount);
    kv("holding balance", held);
    kv("depositor tokens", ledger.token_balance(&alice.address(), &mint)?);
    kv("outstanding lockups", ledger.lockups_of(&alice.address())?.len());

    // -- 4 ---------------------------------------------------------------------
    section(4, "Try to unlock early");
    match ledger.submit(&alice, Instruction::unlock(&program, &alice.address(), &mint)?) {
        Ok(_) => ok("unexpectedly released"),
        Err(err) => rejected(&err),
    }

    // -- 5 ---------------------------------------------------------------------
    section(5, "Wait for maturity, then unlock");
    clock.advance(3_600);
    ledger.submit(&alice, Instruction::unlock(&program, &alice.address(), &mint)?)?;
    ledger.submit(&alice, Instruction::unlock_native(&program, &alice.address())?)?;
    ok("both lockups released");
    kv("depositor tokens", ledger.token_balance(&alice.address(), &mint)?);
    kv(
        "coin balance",
        format_units(ledger.lamports(&alice.address())?, NATIVE_DECIMALS),
    );
    kv("outstanding lockups", ledger.lockups_of(&alice.address())?.len());

    println!();
    Ok(())
}
