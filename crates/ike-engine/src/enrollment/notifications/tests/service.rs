use std::sync::{Arc, Barrier};
use std::thread;

use super::common::*;
use crate::enrollment::notifications::domain::{NotificationId, NotificationStatus};
use crate::enrollment::notifications::repository::{NotificationRepository, RepositoryError};
use crate::enrollment::notifications::service::{
    EngineError, NotificationEngine, ReminderOutcome,
};

#[test]
fn create_dual_placement_dispatches_one_payload() {
    let (engine, repository, sink) = build_engine();

    let notification = engine
        .create_dual_placement("s1", "Student s1", dual_placement_details())
        .expect("create succeeds");

    assert!(notification.is_active());
    assert_eq!(repository.record_count(), 1);

    let payloads = sink.payloads();
    assert_eq!(payloads.len(), 1);
    assert_eq!(
        payloads[0].recipients,
        vec!["rektor@alpha.se".to_string(), "rektor@beta.se".to_string()]
    );
    assert!(payloads[0].subject.contains("overlapping placements"));
    assert!(payloads[0].body.contains("Alpha"));
    assert!(payloads[0].body.contains("ongoing"));
}

#[test]
fn grade_repetition_notifies_the_home_municipality() {
    let (engine, _, sink) = build_engine();

    engine
        .create_grade_repetition("s2", "Student s2", grade_repetition_details())
        .expect("create succeeds");

    let payloads = sink.payloads();
    assert_eq!(payloads.len(), 1);
    assert_eq!(payloads[0].recipients, vec!["ike-s2@kommun.se".to_string()]);
    assert!(payloads[0].subject.contains("repeated school year"));
    assert!(payloads[0].body.contains("no payment block"));
}

#[test]
fn dispatch_failure_does_not_roll_back_the_record() {
    let repository = Arc::new(MemoryRepository::default());
    let engine = NotificationEngine::new(repository.clone(), Arc::new(FailingSink));

    let notification = engine
        .create_dual_placement("s1", "Student s1", dual_placement_details())
        .expect("creation survives a dead sink");

    assert!(notification.is_active());
    assert_eq!(repository.record_count(), 1);
    assert!(engine
        .is_payment_blocked("s1")
        .expect("block query succeeds"));
}

#[test]
fn resolve_excludes_the_record_from_active_but_keeps_it_for_audit() {
    let (engine, repository, _) = build_engine();
    let notification = engine
        .create_dual_placement("s1", "Student s1", dual_placement_details())
        .expect("create succeeds");

    engine.resolve(&notification.id).expect("resolve succeeds");

    let active = engine.active_notifications().expect("active query");
    assert!(active.is_empty());

    let stored = repository
        .fetch(&notification.id)
        .expect("fetch succeeds")
        .expect("record retained after resolution");
    assert_eq!(stored.status, NotificationStatus::Resolved);
}

#[test]
fn resolving_twice_is_a_no_op() {
    let (engine, _, _) = build_engine();
    let notification = engine
        .create_dual_placement("s1", "Student s1", dual_placement_details())
        .expect("create succeeds");

    engine.resolve(&notification.id).expect("first resolve");
    engine
        .resolve(&notification.id)
        .expect("second resolve is a no-op");
}

#[test]
fn resolve_unknown_id_signals_not_found() {
    let (engine, _, _) = build_engine();

    match engine.resolve(&NotificationId("ntf-999999".to_string())) {
        Err(EngineError::Repository(RepositoryError::NotFound)) => {}
        other => panic!("expected not found, got {other:?}"),
    }
}

#[test]
fn payment_block_follows_active_dual_placements_only() {
    let (engine, _, _) = build_engine();

    let dual = engine
        .create_dual_placement("s1", "Student s1", dual_placement_details())
        .expect("create dual placement");
    engine
        .create_grade_repetition("s2", "Student s2", grade_repetition_details())
        .expect("create repetition");

    let blocked = engine.payment_blocked_students().expect("block query");
    assert_eq!(blocked.into_iter().collect::<Vec<_>>(), vec!["s1"]);
    assert!(!engine.is_payment_blocked("s2").expect("block query"));

    engine.resolve(&dual.id).expect("resolve clears the block");
    assert!(!engine.is_payment_blocked("s1").expect("block query"));
}

#[test]
fn daily_reminders_resend_active_dual_placements_only() {
    let (engine, _, sink) = build_engine();

    engine
        .create_dual_placement("s1", "Student s1", dual_placement_details())
        .expect("create dual placement");
    engine
        .create_grade_repetition("s2", "Student s2", grade_repetition_details())
        .expect("create repetition");
    let resolved = engine
        .create_dual_placement("s3", "Student s3", dual_placement_details())
        .expect("create second dual placement");
    engine.resolve(&resolved.id).expect("resolve");

    // Three creation dispatches so far.
    assert_eq!(sink.payloads().len(), 3);

    let outcome = engine.daily_reminders().expect("sweep runs");
    assert_eq!(outcome, ReminderOutcome::Completed { dispatched: 1 });

    let payloads = sink.payloads();
    assert_eq!(payloads.len(), 4);
    assert!(payloads[3].subject.contains("overlapping placements"));
    assert!(payloads[3].subject.contains("Student s1"));
}

#[test]
fn overlapping_reminder_trigger_is_skipped() {
    let repository = Arc::new(MemoryRepository::default());
    let seed = NotificationEngine::new(repository.clone(), Arc::new(MemorySink::default()));
    seed.create_dual_placement("s1", "Student s1", dual_placement_details())
        .expect("seed notification");

    let entered = Arc::new(Barrier::new(2));
    let release = Arc::new(Barrier::new(2));
    let engine = Arc::new(NotificationEngine::new(
        repository,
        Arc::new(GatedSink {
            entered: entered.clone(),
            release: release.clone(),
        }),
    ));

    let background = {
        let engine = engine.clone();
        thread::spawn(move || engine.daily_reminders().expect("first sweep completes"))
    };

    // First sweep is now parked inside the sink, still holding the guard.
    entered.wait();
    let outcome = engine.daily_reminders().expect("second trigger returns");
    assert_eq!(outcome, ReminderOutcome::SkippedOverlapping);

    release.wait();
    let first = background.join().expect("sweep thread joins");
    assert_eq!(first, ReminderOutcome::Completed { dispatched: 1 });
}

#[test]
fn scan_creates_notifications_for_both_detectors() {
    let (engine, _, sink) = build_engine();

    let mut dataset = overlap_dataset();
    dataset.extend(repetition_dataset());

    let summary = engine.scan(&dataset).expect("scan runs");
    assert_eq!(summary.dual_placements_found, 1);
    assert_eq!(summary.grade_repetitions_found, 1);
    assert_eq!(summary.notifications_created, 2);
    assert_eq!(summary.duplicates_suppressed, 0);
    assert_eq!(sink.payloads().len(), 2);
}

#[test]
fn rescanning_unchanged_data_suppresses_duplicates() {
    let (engine, repository, _) = build_engine();
    let dataset = overlap_dataset();

    engine.scan(&dataset).expect("first scan");
    let second = engine.scan(&dataset).expect("second scan");

    assert_eq!(second.dual_placements_found, 1);
    assert_eq!(second.notifications_created, 0);
    assert_eq!(second.duplicates_suppressed, 1);
    assert_eq!(repository.record_count(), 1);
}

#[test]
fn redetection_after_resolution_creates_a_sibling_record() {
    let (engine, repository, _) = build_engine();
    let dataset = overlap_dataset();

    engine.scan(&dataset).expect("first scan");
    let first = engine.active_notifications().expect("active query");
    engine.resolve(&first[0].id).expect("resolve");

    let summary = engine.scan(&dataset).expect("rescan");
    assert_eq!(summary.notifications_created, 1);
    assert_eq!(repository.record_count(), 2);

    let active = engine.active_notifications().expect("active query");
    assert_eq!(active.len(), 1);
    assert_ne!(active[0].id, first[0].id);
}

#[test]
fn scan_aborts_on_malformed_dates_without_creating_records() {
    let (engine, repository, sink) = build_engine();
    let mut dataset = overlap_dataset();
    dataset.push(enrollment("s9", "Gamma", "August 19th", None));

    match engine.scan(&dataset) {
        Err(EngineError::Detection(error)) => {
            assert!(error.to_string().contains("s9"));
        }
        other => panic!("expected detection error, got {other:?}"),
    }
    assert_eq!(repository.record_count(), 0);
    assert!(sink.payloads().is_empty());
}

#[test]
fn active_notifications_keep_creation_order() {
    let (engine, _, _) = build_engine();

    let first = engine
        .create_dual_placement("s1", "Student s1", dual_placement_details())
        .expect("create");
    let second = engine
        .create_grade_repetition("s2", "Student s2", grade_repetition_details())
        .expect("create");

    let active = engine.active_notifications().expect("active query");
    assert_eq!(active.len(), 2);
    assert_eq!(active[0].id, first.id);
    assert_eq!(active[1].id, second.id);
}
