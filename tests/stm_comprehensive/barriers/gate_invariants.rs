//! Gate Invariant Tests
//!
//! `0 <= remaining <= capacity` for every sequence of opens and passes.

use crate::*;
use proptest::prelude::*;
use tinsel::Gate;

#[derive(Debug, Clone, Copy)]
enum GateOp {
    Open,
    Pass,
}

fn gate_op() -> impl Strategy<Value = GateOp> {
    prop_oneof![Just(GateOp::Open), Just(GateOp::Pass)]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_remaining_stays_within_capacity(
        capacity in 1usize..8,
        ops in prop::collection::vec(gate_op(), 0..60),
    ) {
        let stm = Stm::new();
        let gate = Gate::new(&stm, capacity).unwrap();
        let mut model = 0usize;

        for op in ops {
            match op {
                GateOp::Open => {
                    gate.open_now(&stm).unwrap();
                    model = capacity;
                }
                // Pass only when it would not block
                GateOp::Pass => {
                    let passed = stm
                        .atomically(|tx| {
                            if gate.remaining(tx)? == 0 {
                                return Ok(false);
                            }
                            gate.pass(tx)?;
                            Ok(true)
                        })
                        .unwrap();
                    prop_assert_eq!(passed, model > 0);
                    model = model.saturating_sub(1);
                }
            }
            let remaining = gate.peek_remaining();
            prop_assert!(remaining <= capacity);
            prop_assert_eq!(remaining, model);
        }
    }
}

#[test]
fn test_concurrent_passers_never_exceed_opening() {
    const CAPACITY: usize = 4;
    const PASSERS: usize = 10;

    let stm = create_stm();
    let gate = Gate::new(&stm, CAPACITY).unwrap();
    let passed = Arc::new(std::sync::atomic::AtomicUsize::new(0));

    let passers: Vec<_> = (0..PASSERS)
        .map(|_| {
            let (stm, gate, passed) = (Arc::clone(&stm), gate.clone(), Arc::clone(&passed));
            thread::spawn(move || {
                gate.pass_now(&stm).unwrap();
                passed.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            })
        })
        .collect();

    gate.open_now(&stm).unwrap();
    gate.await_drained_now(&stm).unwrap();
    wait_until("first opening to be used", || {
        passed.load(std::sync::atomic::Ordering::SeqCst) == CAPACITY
    });
    thread::sleep(Duration::from_millis(30));
    assert_eq!(passed.load(std::sync::atomic::Ordering::SeqCst), CAPACITY);

    // Remaining passers go through over further openings
    let mut openings = 1;
    while passed.load(std::sync::atomic::Ordering::SeqCst) < PASSERS {
        gate.open_now(&stm).unwrap();
        openings += 1;
        let expected = (openings * CAPACITY).min(PASSERS);
        wait_until("next opening to be used", || {
            passed.load(std::sync::atomic::Ordering::SeqCst) == expected
        });
        assert!(gate.peek_remaining() <= CAPACITY);
    }
    for passer in passers {
        passer.join().unwrap();
    }
    assert_eq!(openings, 3);
    // Last opening admitted only two of its four passes
    assert_eq!(gate.peek_remaining(), 2);
}
