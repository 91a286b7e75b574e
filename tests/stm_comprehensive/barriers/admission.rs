//! Group Admission Tests
//!
//! A group of capacity N admits exactly N of N + K joiners per cohort.

use crate::*;
use std::sync::atomic::{AtomicUsize, Ordering};

#[test]
fn test_exactly_capacity_joiners_admitted() {
    const CAPACITY: usize = 3;
    const EXTRA: usize = 2;

    let stm = create_stm();
    let group = Group::new(&stm, CAPACITY).unwrap();
    let joined = Arc::new(AtomicUsize::new(0));

    let joiners: Vec<_> = (0..CAPACITY + EXTRA)
        .map(|_| {
            let (stm, group, joined) = (Arc::clone(&stm), group.clone(), Arc::clone(&joined));
            thread::spawn(move || {
                let gates = group.join_now(&stm).unwrap();
                joined.fetch_add(1, Ordering::SeqCst);
                gates
            })
        })
        .collect();

    wait_until("first cohort to fill", || joined.load(Ordering::SeqCst) == CAPACITY);
    thread::sleep(Duration::from_millis(50));
    assert_eq!(joined.load(Ordering::SeqCst), CAPACITY);
    assert_eq!(spaces_left(&stm, &group), 0);

    let first_cohort = group.await_full_now(&stm).unwrap();
    wait_until("late joiners", || joined.load(Ordering::SeqCst) == CAPACITY + EXTRA);
    assert_eq!(spaces_left(&stm, &group), CAPACITY - EXTRA);

    let gates: Vec<_> = joiners.into_iter().map(|j| j.join().unwrap()).collect();
    let in_first = gates.iter().filter(|g| **g == first_cohort).count();
    assert_eq!(in_first, CAPACITY);
}

#[test]
fn test_await_full_leaves_fresh_closed_gates() {
    let stm = create_stm();
    let group = Group::new(&stm, 2).unwrap();
    group.join_now(&stm).unwrap();
    group.join_now(&stm).unwrap();

    let taken = group.await_full_now(&stm).unwrap();
    let stored = stm.atomically(|tx| group.current_gates(tx)).unwrap();

    assert_eq!(spaces_left(&stm, &group), group.capacity());
    assert_ne!(taken.entry, stored.entry);
    assert_ne!(taken.exit, stored.exit);
    assert_eq!(stored.entry.peek_remaining(), 0);
    assert_eq!(stored.exit.peek_remaining(), 0);
}

#[test]
fn test_invalid_capacity_is_misuse() {
    let stm = create_stm();
    let err = Group::new(&stm, 0).unwrap_err();
    assert!(err.is_misuse());
    assert!(tinsel::Gate::new(&stm, 0).unwrap_err().is_misuse());
}
