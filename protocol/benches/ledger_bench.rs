// Transaction processing benchmarks.
//
// Full lock/unlock cycles through a temporary sled database: signature
// verification, account loading, validation, and the atomic commit.

use std::sync::Arc;

use criterion::{criterion_group, criterion_main, Criterion};

use hodl_protocol::config::LedgerConfig;
use hodl_protocol::crypto::keys::Keypair;
use hodl_protocol::{Instruction, Ledger, ManualClock, Transaction};

fn setup() -> (Ledger, Keypair) {
    let ledger = Ledger::open_temporary(LedgerConfig::default(), Arc::new(ManualClock::new(0)))
        .expect("temp ledger");
    let kp = Keypair::generate();
    ledger.airdrop(&kp.address(), u64::MAX / 2).unwrap();
    (ledger, kp)
}

fn bench_native_cycle(c: &mut Criterion) {
    let (ledger, kp) = setup();
    let program = *ledger.program_id();
    ledger
        .submit(&kp, Instruction::initialize_native_vault(&program, &kp.address()).unwrap())
        .unwrap();
    let lock = Instruction::lock_native(&program, &kp.address(), 1_000, 0).unwrap();
    let unlock = Instruction::unlock_native(&program, &kp.address()).unwrap();

    c.bench_function("ledger/native_lock_unlock", |b| {
        b.iter(|| {
            ledger.submit(&kp, lock.clone()).unwrap();
            ledger.submit(&kp, unlock.clone()).unwrap();
        });
    });
}

fn bench_fungible_cycle(c: &mut Criterion) {
    let (ledger, kp) = setup();
    let program = *ledger.program_id();
    let owner = kp.address();
    let mint = ledger.create_mint(&owner, &owner, 6).unwrap();
    ledger.create_token_account(&owner, &owner, &mint).unwrap();
    ledger.mint_to(&mint, &owner, &owner, 1_000_000).unwrap();
    ledger
        .submit(&kp, Instruction::initialize_vault(&program, &owner, &mint).unwrap())
        .unwrap();
    let lock = Instruction::lock(&program, &owner, &mint, 10, 0).unwrap();
    let unlock = Instruction::unlock(&program, &owner, &mint).unwrap();

    c.bench_function("ledger/fungible_lock_unlock", |b| {
        b.iter(|| {
            ledger.submit(&kp, lock.clone()).unwrap();
            ledger.submit(&kp, unlock.clone()).unwrap();
        });
    });
}

fn bench_verify(c: &mut Criterion) {
    let kp = Keypair::generate();
    let ix = Instruction::lock_native(&LedgerConfig::default().program_id, &kp.address(), 1, 0).unwrap();
    let tx = Transaction::new_signed(ix, &kp, 7).unwrap();

    c.bench_function("ledger/verify_transaction", |b| {
        b.iter(|| tx.verify().unwrap());
    });
}

criterion_group!(benches, bench_native_cycle, bench_fungible_cycle, bench_verify);
criterion_main!(benches);
