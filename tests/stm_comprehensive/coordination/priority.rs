//! Priority Arbitration Tests
//!
//! When both pools are full in the same cycle, every task-side effect of the
//! high-priority pool happens before any of the low-priority pool.

use crate::*;
use tinsel::{HelperKind, Journal, Priority, Santa, Worker, WorkshopEvent};

fn spawn_cohort(
    stm: &Arc<Stm>,
    group: &Group,
    kind: HelperKind,
    journal: &Journal,
) -> Vec<thread::JoinHandle<()>> {
    (0..group.capacity())
        .map(|id| {
            let worker = Worker::new(kind, id, Arc::clone(stm), group.clone())
                .with_journal(journal.clone());
            thread::spawn(move || worker.run_cycle().unwrap())
        })
        .collect()
}

#[test]
fn test_high_pool_effects_strictly_first() {
    let stm = create_stm();
    let small = Group::new(&stm, 3).unwrap();
    let large = Group::new(&stm, 9).unwrap();
    let journal = Journal::new();

    let mut santa = Santa::with_names(
        Arc::clone(&stm),
        ("elves", small.clone()),
        ("reindeer", large.clone()),
    )
    .with_journal(journal.clone());

    let mut helpers = spawn_cohort(&stm, &large, HelperKind::Reindeer, &journal);
    helpers.extend(spawn_cohort(&stm, &small, HelperKind::Elf, &journal));

    // Both pools full and reported before the first arbitration
    wait_until("both groups to fill", || {
        spaces_left(&stm, &small) == 0 && spaces_left(&stm, &large) == 0
    });
    santa.launch().unwrap();
    wait_until("both reports", || santa.pending_reports() == 2);

    let first = santa.run_cycle().unwrap();
    let second = santa.run_cycle().unwrap();
    for helper in helpers {
        helper.join().unwrap();
    }

    assert_eq!((first.pool.as_str(), first.priority), ("elves", Priority::High));
    assert_eq!((second.pool.as_str(), second.priority), ("reindeer", Priority::Low));

    let tasks: Vec<HelperKind> = journal
        .snapshot()
        .into_iter()
        .filter_map(|event| match event {
            WorkshopEvent::TaskPerformed { kind, .. } => Some(kind),
            _ => None,
        })
        .collect();
    assert_eq!(tasks.len(), 12);
    assert!(tasks[..3].iter().all(|k| *k == HelperKind::Elf));
    assert!(tasks[3..].iter().all(|k| *k == HelperKind::Reindeer));
}

#[test]
fn test_low_pool_served_when_high_is_idle() {
    let stm = create_stm();
    let high = Group::new(&stm, 2).unwrap();
    let low = Group::new(&stm, 1).unwrap();
    let journal = Journal::new();
    let mut santa = Santa::new(Arc::clone(&stm), high, low.clone()).with_journal(journal.clone());

    let helpers = spawn_cohort(&stm, &low, HelperKind::Elf, &journal);
    let serviced = santa.run_cycle().unwrap();
    for helper in helpers {
        helper.join().unwrap();
    }

    assert_eq!(serviced.priority, Priority::Low);
    assert_eq!(santa.cycles(), 1);
}
