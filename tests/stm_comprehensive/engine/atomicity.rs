//! Commit Atomicity Tests
//!
//! Concurrent writers on overlapping cells; every observer sees either all
//! of a commit's writes or none of them.

use crate::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Barrier;
use tinsel::Transaction;

// =============================================================================
// OVERLAPPING WRITERS
// =============================================================================

#[test]
fn test_pair_writes_are_never_torn() {
    const WRITERS: usize = 4;
    const ROUNDS: u64 = 400;

    let stm = create_stm();
    let left = stm.allocate(0u64);
    let right = stm.allocate(0u64);
    let barrier = Arc::new(Barrier::new(WRITERS + 1));
    let done = Arc::new(AtomicBool::new(false));

    let writers: Vec<_> = (0..WRITERS)
        .map(|_| {
            let (stm, left, right, barrier) =
                (Arc::clone(&stm), left.clone(), right.clone(), Arc::clone(&barrier));
            thread::spawn(move || {
                barrier.wait();
                for _ in 0..ROUNDS {
                    stm.atomically(|tx| {
                        let n = tx.read(&left)?;
                        tx.store(&left, n + 1)?;
                        tx.store(&right, n + 1)
                    })
                    .unwrap();
                }
            })
        })
        .collect();

    let observer = {
        let (stm, left, right, barrier, done) = (
            Arc::clone(&stm),
            left.clone(),
            right.clone(),
            Arc::clone(&barrier),
            Arc::clone(&done),
        );
        thread::spawn(move || {
            barrier.wait();
            while !done.load(Ordering::Acquire) {
                let (l, r) = stm
                    .atomically(|tx| Ok((tx.read(&left)?, tx.read(&right)?)))
                    .unwrap();
                assert_eq!(l, r, "observer saw a torn commit");
            }
        })
    };

    for writer in writers {
        writer.join().unwrap();
    }
    done.store(true, Ordering::Release);
    observer.join().unwrap();

    assert_eq!(left.peek(), WRITERS as u64 * ROUNDS);
    assert_eq!(right.peek(), left.peek());
    assert_eq!(left.version(), right.version());
}

#[test]
fn test_concurrent_transactions_on_shared_counter() {
    let stm = create_stm();
    let counter = stm.allocate(0u32);

    let bump = {
        let counter = counter.clone();
        Transaction::builder()
            .named("bump")
            .step(move |tx| {
                tx.modify(&counter, |n| n + 1)?;
                Ok(())
            })
            .build()
    };

    let handles = stm
        .run_concurrently((0..16).map(|_| bump.clone()))
        .unwrap();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(counter.peek(), 16);
    assert!(bump.status().is_committed());
}

// =============================================================================
// FAILED ATTEMPTS APPLY NOTHING
// =============================================================================

#[test]
fn test_panicking_step_applies_no_write() {
    let stm = create_stm();
    let a = stm.allocate(1i32);
    let b = stm.allocate(2i32);

    let (wa, wb) = (a.clone(), b.clone());
    let txn = Transaction::builder()
        .step(move |tx| tx.store(&wa, 10))
        .step(move |tx| {
            tx.store(&wb, 20)?;
            panic!("second step failed")
        })
        .build();

    let err = stm.run(&txn).unwrap_err();
    assert!(err.is_panic());
    assert_eq!((a.peek(), b.peek()), (1, 2));
    // The engine keeps working after a panic
    stm.atomically(|tx| tx.store(&a, 3)).unwrap();
    assert_eq!(a.peek(), 3);
}

#[test]
fn test_foreign_cell_is_misuse() {
    let stm = create_stm();
    let other = Stm::new();
    let stranger = other.allocate(0u8);

    let err = stm.atomically(|tx| tx.store(&stranger, 1)).unwrap_err();
    assert!(err.is_misuse());
    assert!(matches!(err, tinsel_core::Error::ForeignCell { cell } if cell == stranger.id()));
    assert_eq!(stranger.peek(), 0);
}
