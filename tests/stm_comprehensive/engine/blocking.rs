//! Blocking Retry Tests
//!
//! `check(false)` parks the attempt until a cell it read changes.

use crate::*;
use tinsel::{retry, unwrap_or_retry};

#[test]
fn test_check_waits_for_dependency() {
    let stm = create_stm();
    let balance = stm.allocate(0i64);

    let withdraw = {
        let (stm, balance) = (Arc::clone(&stm), balance.clone());
        thread::spawn(move || {
            stm.atomically(|tx| {
                let n = tx.read(&balance)?;
                tx.check(|| n >= 50)?;
                tx.store(&balance, n - 50)
            })
        })
    };

    for _ in 0..5 {
        stm.atomically(|tx| {
            tx.modify(&balance, |n| n + 10)?;
            Ok(())
        })
        .unwrap();
    }

    withdraw.join().unwrap().unwrap();
    assert_eq!(balance.peek(), 0);
    assert!(stm.metrics().total_retries >= 1);
}

#[test]
fn test_blocked_attempt_hook_never_fires() {
    let stm = create_stm();
    let ready = stm.allocate(false);
    let fired = stm.allocate(0u32);
    let hook_runs = Arc::new(std::sync::atomic::AtomicU32::new(0));

    let waiter = {
        let (stm, ready, hook_runs) = (Arc::clone(&stm), ready.clone(), Arc::clone(&hook_runs));
        thread::spawn(move || {
            stm.atomically(|tx| {
                let runs = Arc::clone(&hook_runs);
                tx.on_commit(move || {
                    runs.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                });
                let ok = tx.read(&ready)?;
                tx.check(|| ok)
            })
        })
    };

    wait_until("waiter to block", || stm.metrics().total_retries >= 1);
    assert_eq!(hook_runs.load(std::sync::atomic::Ordering::SeqCst), 0);

    stm.atomically(|tx| {
        tx.store(&fired, 1)?;
        tx.store(&ready, true)
    })
    .unwrap();
    waiter.join().unwrap().unwrap();
    assert_eq!(hook_runs.load(std::sync::atomic::Ordering::SeqCst), 1);
}

#[test]
fn test_unwrap_or_retry_takes_value_once_present() {
    let stm = create_stm();
    let mailbox = stm.allocate(None::<&'static str>);

    let reader = {
        let (stm, mailbox) = (Arc::clone(&stm), mailbox.clone());
        thread::spawn(move || {
            stm.atomically(|tx| {
                let letter = unwrap_or_retry(tx.read(&mailbox)?)?;
                tx.store(&mailbox, None)?;
                Ok(letter)
            })
        })
    };

    stm.atomically(|tx| tx.store(&mailbox, Some("dear santa"))).unwrap();
    assert_eq!(reader.join().unwrap().unwrap(), "dear santa");
    assert_eq!(mailbox.peek(), None);
}

#[test]
fn test_retry_with_empty_read_set_resumes_after_any_commit() {
    let stm = create_stm();
    let other = stm.allocate(0u8);
    let attempts = Arc::new(std::sync::atomic::AtomicU32::new(0));

    let waiter = {
        let (stm, attempts) = (Arc::clone(&stm), Arc::clone(&attempts));
        thread::spawn(move || {
            stm.atomically(|_| {
                if attempts.fetch_add(1, std::sync::atomic::Ordering::SeqCst) == 0 {
                    retry()
                } else {
                    Ok(())
                }
            })
        })
    };

    stm.atomically(|tx| tx.store(&other, 1)).unwrap();
    waiter.join().unwrap().unwrap();
    assert_eq!(attempts.load(std::sync::atomic::Ordering::SeqCst), 2);
}
