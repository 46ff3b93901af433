//! Concurrent access tests
//!
//! Several threads share one `BankContext` and race on the same rows. The
//! balance must never go negative and no successful operation may be lost.
//!
//! Run with: cargo test --test concurrent_access_test -- --nocapture

use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

use rust_decimal::Decimal;
use tempfile::TempDir;

use bank_core::{BankContext, ErrorKind};

/// Number of concurrent threads for stress tests
const THREAD_COUNT: usize = 8;

/// Number of iterations per thread
const ITERATIONS_PER_THREAD: usize = 10;

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn open_shared(temp_dir: &TempDir) -> Arc<BankContext> {
    Arc::new(BankContext::new(temp_dir.path()).expect("Failed to open bank"))
}

/// Two withdrawals that each drain the whole balance: exactly one wins
#[test]
fn test_racing_withdrawals_only_one_succeeds() {
    let temp_dir = TempDir::new().unwrap();
    let bank = open_shared(&temp_dir);
    let alice = bank.users.create("Alice", "alice@example.com").unwrap();
    let account = bank.accounts.create(alice.id, None).unwrap();
    bank.accounts.deposit(account.id, dec("100.00")).unwrap();
    let account_id = account.id;

    let barrier = Arc::new(Barrier::new(2));
    let handles: Vec<_> = (0..2)
        .map(|_| {
            let bank = Arc::clone(&bank);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                bank.accounts.withdraw(account_id, dec("100.00"))
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let successes = results.iter().filter(|r| r.is_ok()).count();
    let conflicts = results
        .iter()
        .filter(|r| matches!(r, Err(e) if e.kind() == ErrorKind::Conflict))
        .count();

    assert_eq!(successes, 1);
    assert_eq!(conflicts, 1);
    assert_eq!(bank.accounts.get(account.id).unwrap().balance, Decimal::ZERO);
}

/// Many threads registering the same email: one user is created
#[test]
fn test_racing_registrations_single_winner() {
    let temp_dir = TempDir::new().unwrap();
    let bank = open_shared(&temp_dir);

    let barrier = Arc::new(Barrier::new(THREAD_COUNT));
    let handles: Vec<_> = (0..THREAD_COUNT)
        .map(|i| {
            let bank = Arc::clone(&bank);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                bank.users.create(&format!("Racer {}", i), "same@example.com")
            })
        })
        .collect();

    let mut successes = 0;
    for handle in handles {
        match handle.join().unwrap() {
            Ok(_) => successes += 1,
            Err(e) => assert_eq!(e.kind(), ErrorKind::Conflict),
        }
    }

    assert_eq!(successes, 1);
    assert_eq!(bank.users.list_all().unwrap().len(), 1);
}

/// Mixed deposits and withdrawals: the final balance equals the sum of the
/// operations that reported success
#[test]
fn test_mixed_operations_keep_balance_consistent() {
    let temp_dir = TempDir::new().unwrap();
    let bank = open_shared(&temp_dir);
    let alice = bank.users.create("Alice", "alice@example.com").unwrap();
    let account = bank.accounts.create(alice.id, None).unwrap();
    bank.accounts.deposit(account.id, dec("5.00")).unwrap();
    let account_id = account.id;

    let deposits = Arc::new(AtomicUsize::new(0));
    let withdrawals = Arc::new(AtomicUsize::new(0));
    let barrier = Arc::new(Barrier::new(THREAD_COUNT));

    let handles: Vec<_> = (0..THREAD_COUNT)
        .map(|thread_id| {
            let bank = Arc::clone(&bank);
            let barrier = Arc::clone(&barrier);
            let deposits = Arc::clone(&deposits);
            let withdrawals = Arc::clone(&withdrawals);
            thread::spawn(move || {
                barrier.wait();
                for _ in 0..ITERATIONS_PER_THREAD {
                    if thread_id % 2 == 0 {
                        bank.accounts.deposit(account_id, dec("1.25")).unwrap();
                        deposits.fetch_add(1, Ordering::SeqCst);
                    } else {
                        match bank.accounts.withdraw(account_id, dec("2.50")) {
                            Ok(()) => {
                                withdrawals.fetch_add(1, Ordering::SeqCst);
                            }
                            Err(e) => assert_eq!(e.kind(), ErrorKind::Conflict),
                        }
                    }
                    let balance = bank.accounts.get(account_id).unwrap().balance;
                    assert!(balance >= Decimal::ZERO, "balance went negative: {}", balance);
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    let deposits = deposits.load(Ordering::SeqCst) as i64;
    let withdrawals = withdrawals.load(Ordering::SeqCst) as i64;
    let expected = dec("5.00") + dec("1.25") * Decimal::from(deposits)
        - dec("2.50") * Decimal::from(withdrawals);

    let account = bank.accounts.get(account.id).unwrap();
    println!(
        "deposits: {}, withdrawals: {}, balance: {}",
        deposits, withdrawals, account.balance
    );
    assert_eq!(account.balance, expected);
    assert_eq!(account.version, 1 + deposits + withdrawals);
    assert!(bank.health.run_checks().unwrap().is_healthy());
}

/// Concurrent account creation for one user: ids stay unique
#[test]
fn test_concurrent_account_creation() {
    let temp_dir = TempDir::new().unwrap();
    let bank = open_shared(&temp_dir);
    let alice = bank.users.create("Alice", "alice@example.com").unwrap();
    let user_id = alice.id;

    let barrier = Arc::new(Barrier::new(THREAD_COUNT));
    let handles: Vec<_> = (0..THREAD_COUNT)
        .map(|_| {
            let bank = Arc::clone(&bank);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                bank.accounts.create(user_id, None).unwrap().id
            })
        })
        .collect();

    let mut ids: Vec<i64> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    ids.sort_unstable();
    ids.dedup();

    assert_eq!(ids.len(), THREAD_COUNT);
    assert_eq!(bank.accounts.list_by_user(user_id).unwrap().len(), THREAD_COUNT);
}
