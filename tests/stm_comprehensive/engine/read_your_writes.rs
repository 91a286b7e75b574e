//! Read-Your-Own-Writes Tests

use crate::*;
use tinsel::{Transaction, TransactionStatus};

#[test]
fn test_read_after_write_sees_staged_value() {
    let stm = create_stm();
    let cell = stm.allocate(String::from("before"));

    let seen = stm
        .atomically(|tx| {
            tx.store(&cell, String::from("after"))?;
            tx.read(&cell)
        })
        .unwrap();

    assert_eq!(seen, "after");
    assert_eq!(cell.peek(), "after");
}

#[test]
fn test_last_write_in_attempt_wins() {
    let stm = create_stm();
    let cell = stm.allocate(0u8);

    let seen = stm
        .atomically(|tx| {
            tx.store(&cell, 1)?;
            tx.store(&cell, 2)?;
            let mid = tx.read(&cell)?;
            tx.store(&cell, 3)?;
            Ok(mid)
        })
        .unwrap();

    assert_eq!(seen, 2);
    assert_eq!(cell.peek(), 3);
}

#[test]
fn test_later_step_sees_earlier_step_write() {
    let stm = create_stm();
    let cell = stm.allocate(0u32);

    let (w, r) = (cell.clone(), cell.clone());
    let txn = Transaction::builder()
        .step(move |tx| tx.store(&w, 7))
        .finish(move |tx| tx.read(&r));

    assert_eq!(txn.status(), TransactionStatus::Pending);
    assert_eq!(stm.run(&txn).unwrap(), 7);
    assert!(matches!(txn.status(), TransactionStatus::Committed { .. }));
}

#[test]
fn test_staged_write_invisible_to_others_until_commit() {
    let stm = create_stm();
    let cell = stm.allocate(0u32);

    stm.atomically(|tx| {
        tx.store(&cell, 5)?;
        assert_eq!(cell.peek(), 0);
        Ok(())
    })
    .unwrap();

    assert_eq!(cell.peek(), 5);
}
