//! Attendance accrual, finalization and display through the store and manager


use chrono::{Duration, TimeZone, Utc};
use classroom_monitor::attendance::{summarize, AttendancePolicy, DisplayStatus, TrackingState};
use classroom_monitor::lifecycle::SessionManager;
use classroom_monitor::model::{AttendanceStatus, SessionPhase, WarningType};
use classroom_monitor::store::{AttendanceRepository, ClassRepository};
use test_helpers::{minutes, seeded_store};

fn t0() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 4, 9, 0, 0).unwrap()
}

#[tokio::test]
async fn test_final_status_by_accrued_minutes() {
    let store = seeded_store(4, &[(1, 60.0)]);
    let manager = SessionManager::new(store.clone(), AttendancePolicy::default());
    manager.start_class(1, t0()).await.unwrap();

    for (student, present) in [(1, 50), (2, 20), (3, 0), (4, 45)] {
        store.record_detection(student, 1, minutes(present), t0() + Duration::minutes(1)).unwrap();
    }

    let records = manager.end_class(1, t0() + Duration::minutes(60)).await.unwrap();
    let statuses: Vec<AttendanceStatus> = records.iter().map(|r| r.status).collect();
    assert_eq!(
        statuses,
        vec![
            AttendanceStatus::Present,
            AttendanceStatus::Late,
            AttendanceStatus::Absent,
            AttendanceStatus::Present,
        ]
    );
    assert!(records.iter().all(|r| r.tracking_state() == TrackingState::Finalized));
}

#[tokio::test]
async fn test_presence_accrues_per_cycle() {
    let store = seeded_store(1, &[(1, 60.0)]);
    let manager = SessionManager::new(store.clone(), AttendancePolicy::default());
    manager.start_class(1, t0()).await.unwrap();

    for cycle in 1..=30 {
        store.record_detection(1, 1, minutes(1), t0() + Duration::minutes(cycle)).unwrap();
    }
    let records = store.records_for_class(1).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].detection_count, 30);
    assert_eq!(records[0].time_present(), minutes(30));
    assert_eq!(records[0].last_seen, t0() + Duration::minutes(30));

    // a stale sighting does not move last_seen back
    store.record_detection(1, 1, minutes(1), t0()).unwrap();
    assert_eq!(store.records_for_class(1).unwrap()[0].last_seen, t0() + Duration::minutes(30));
}

#[tokio::test]
async fn test_threshold_reached_by_many_short_cycles() {
    let store = seeded_store(2, &[(1, 60.0)]);
    let manager = SessionManager::new(store.clone(), AttendancePolicy::default());
    manager.start_class(1, t0()).await.unwrap();

    // exactly 75% of a 60-minute class in one-second cycles, and one cycle short
    let second = std::time::Duration::from_secs(1);
    for cycle in 0..2700 {
        let seen = t0() + Duration::seconds(cycle);
        store.record_detection(1, 1, second, seen).unwrap();
        if cycle > 0 {
            store.record_detection(2, 1, second, seen).unwrap();
        }
    }

    let records = manager.end_class(1, t0() + Duration::minutes(60)).await.unwrap();
    let class = store.get_class(1).unwrap();
    assert_eq!(records[0].time_present(), minutes(45));
    assert_eq!(records[0].percentage(&class), 75.0);
    assert_eq!(records[0].status, AttendanceStatus::Present);
    assert_eq!(records[1].detection_count, 2699);
    assert_eq!(records[1].status, AttendanceStatus::Late);
}

#[tokio::test]
async fn test_finalize_twice_is_idempotent() {
    let store = seeded_store(2, &[(1, 60.0)]);
    let manager = SessionManager::new(store.clone(), AttendancePolicy::default());
    manager.start_class(1, t0()).await.unwrap();
    store.record_detection(1, 1, minutes(30), t0()).unwrap();
    store.record_detection(2, 1, minutes(5), t0()).unwrap();

    let first = manager.end_class(1, t0() + Duration::minutes(60)).await.unwrap();
    let second = manager.finalize_class(1, t0() + Duration::minutes(90)).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(first[0].status, AttendanceStatus::Late);
    assert_eq!(first[1].status, AttendanceStatus::Absent);
    assert_eq!(first[0].finalized_at, Some(t0() + Duration::minutes(60)));
}

#[tokio::test]
async fn test_threshold_is_per_class() {
    let store = seeded_store(1, &[]);
    let mut strict = classroom_monitor::model::ClassSession::new(7, "Seminar", 60.0);
    strict.attendance_threshold = 90.0;
    store.add_class(strict).unwrap();

    let manager = SessionManager::new(store.clone(), AttendancePolicy::default());
    manager.start_class(7, t0()).await.unwrap();
    store.record_detection(1, 7, minutes(50), t0()).unwrap();
    let records = manager.end_class(7, t0() + Duration::hours(1)).await.unwrap();
    assert_eq!(records[0].status, AttendanceStatus::Late);
}

#[tokio::test]
async fn test_starting_a_class_ends_the_active_one() {
    let store = seeded_store(1, &[(1, 60.0), (2, 60.0)]);
    let manager = SessionManager::new(store.clone(), AttendancePolicy::default());

    manager.start_class(1, t0()).await.unwrap();
    store.record_detection(1, 1, minutes(50), t0()).unwrap();

    let later = t0() + Duration::minutes(50);
    let transition = manager.start_class(2, later).await.unwrap();
    assert_eq!(transition.force_ended.len(), 1);

    let a = store.get_class(1).unwrap();
    assert_eq!(a.phase(), SessionPhase::Ended);
    assert_eq!(a.ended_at, Some(later));
    assert_eq!(store.get_class(2).unwrap().phase(), SessionPhase::Active);
    assert_eq!(store.active_classes().unwrap().len(), 1);

    // the force-ended class was finalized as well
    let records = store.records_for_class(1).unwrap();
    assert_eq!(records[0].status, AttendanceStatus::Present);
    assert_eq!(records[0].finalized_at, Some(later));

    // detections for the ended class are rejected
    assert!(store.record_detection(1, 1, minutes(1), later).is_err());
}

#[tokio::test]
async fn test_not_detected_is_derived_and_flagged_once() {
    let store = seeded_store(2, &[(1, 60.0)]);
    let manager = SessionManager::new(store.clone(), AttendancePolicy::default());
    manager.start_class(1, t0()).await.unwrap();
    store.record_detection(1, 1, minutes(1), t0()).unwrap();
    store.record_detection(2, 1, minutes(1), t0() + Duration::minutes(8)).unwrap();

    let now = t0() + Duration::minutes(10);
    let warnings = manager.sweep_not_detected(1, now).unwrap();
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].student_id, 1);
    assert_eq!(warnings[0].warning_type, WarningType::NotDetected);
    assert!(manager.sweep_not_detected(1, now + Duration::minutes(1)).unwrap().is_empty());

    let records = store.records_for_class(1).unwrap();
    let policy = manager.policy();
    assert_eq!(records[0].display_status(now, policy), DisplayStatus::NotDetected);
    assert_eq!(records[1].display_status(now, policy), DisplayStatus::Present);
    // the stored status is untouched
    assert_eq!(records[0].status, AttendanceStatus::Present);

    // a new sighting starts a new episode
    store.record_detection(1, 1, minutes(1), now).unwrap();
    assert!(manager.sweep_not_detected(1, now + Duration::minutes(2)).unwrap().is_empty());
    let again = manager.sweep_not_detected(1, now + Duration::minutes(6)).unwrap();
    assert_eq!(again.len(), 2);
}

#[tokio::test]
async fn test_summary_after_end() {
    let store = seeded_store(3, &[(1, 60.0)]);
    let manager = SessionManager::new(store.clone(), AttendancePolicy::default());
    manager.start_class(1, t0()).await.unwrap();
    store.record_detection(1, 1, minutes(60), t0()).unwrap();
    store.record_detection(2, 1, minutes(30), t0()).unwrap();
    store.record_detection(3, 1, minutes(6), t0()).unwrap();

    let end = t0() + Duration::hours(1);
    let records = manager.end_class(1, end).await.unwrap();
    let class = store.get_class(1).unwrap();
    let summary = summarize(&records, &class, end + Duration::hours(1), manager.policy());

    assert_eq!((summary.present, summary.late, summary.absent, summary.not_detected), (1, 1, 1, 0));
    assert_eq!(summary.total(), 3);
    assert!((summary.mean_percentage - 160.0 / 3.0).abs() < 1e-9);
}
