//! Workshop Tests
//!
//! Full runs with helper threads; the journal shows every service bracketed
//! by start and finish with exactly one group's tasks inside.

use crate::*;
use tinsel::{HelperKind, Workshop, WorkshopConfig, WorkshopEvent};

fn kind_of(pool: &str) -> HelperKind {
    match pool {
        "reindeer" => HelperKind::Reindeer,
        _ => HelperKind::Elf,
    }
}

fn assert_well_bracketed(events: &[WorkshopEvent], config: &WorkshopConfig) {
    let mut open: Option<(String, usize)> = None;
    let mut services = 0;

    for event in events {
        match event {
            WorkshopEvent::ServiceStarted { pool, .. } => {
                assert!(open.is_none(), "service started while another was open");
                open = Some((pool.clone(), 0));
            }
            WorkshopEvent::TaskPerformed { kind, .. } => {
                let (pool, count) = open.as_mut().expect("task outside a service");
                assert_eq!(*kind, kind_of(pool));
                *count += 1;
            }
            WorkshopEvent::ServiceFinished { pool } => {
                let (started, count) = open.take().expect("finish without start");
                assert_eq!(&started, pool);
                let expected = match kind_of(pool) {
                    HelperKind::Reindeer => config.reindeer_group_size,
                    HelperKind::Elf => config.elf_group_size,
                };
                assert_eq!(count, expected);
                services += 1;
            }
        }
    }
    assert_eq!(Some(services), config.cycles);
}

#[test]
fn test_default_sized_workshop() {
    init_tracing();
    let config = WorkshopConfig {
        retry_wait_ms: 10,
        ..WorkshopConfig::default().with_cycles(6)
    };
    let workshop = Workshop::new(config.clone()).unwrap();
    let report = workshop.run().unwrap();

    assert_eq!(report.serviced.len(), 6);
    assert_eq!(
        report.services_of("reindeer") + report.services_of("elf"),
        6
    );
    // Events recorded after the last service are ignored
    let cut = report
        .events
        .iter()
        .rposition(|e| matches!(e, WorkshopEvent::ServiceFinished { .. }))
        .unwrap();
    assert_well_bracketed(&report.events[..=cut], &config);
}

#[test]
fn test_workshop_with_random_pauses() {
    init_tracing();
    let config = WorkshopConfig {
        elves: 4,
        elf_group_size: 2,
        reindeer: 3,
        reindeer_group_size: 3,
        cycles: Some(5),
        max_worker_delay_ms: Some(3),
        retry_wait_ms: 10,
    };
    let workshop = Workshop::new(config.clone()).unwrap();
    let report = workshop.run().unwrap();

    let cut = report
        .events
        .iter()
        .rposition(|e| matches!(e, WorkshopEvent::ServiceFinished { .. }))
        .unwrap();
    assert_well_bracketed(&report.events[..=cut], &config);
    assert!(report.metrics.commit_rate() > 0.0);
}

#[test]
fn test_config_from_json_drives_workshop() {
    let config = WorkshopConfig::from_json(
        r#"{ "elves": 3, "elf_group_size": 3, "reindeer": 1, "reindeer_group_size": 1, "cycles": 2 }"#,
    )
    .unwrap();
    let report = Workshop::new(config).unwrap().run().unwrap();
    assert_eq!(report.serviced.len(), 2);
}
