use std::collections::BTreeMap;
use std::sync::{Arc, Barrier, Mutex};

use chrono::NaiveDate;

use crate::enrollment::domain::EnrollmentRecord;
use crate::enrollment::notifications::domain::{
    DualPlacementDetails, EnrollmentSnapshot, GradeRepetitionDetails, Notification,
    NotificationId, OverlappingPlacement,
};
use crate::enrollment::notifications::repository::{
    DispatchError, DispatchPayload, DispatchSink, NotificationRepository, RepositoryError,
};
use crate::enrollment::notifications::service::NotificationEngine;

pub(super) fn enrollment(
    student_id: &str,
    school_unit: &str,
    start: &str,
    end: Option<&str>,
) -> EnrollmentRecord {
    EnrollmentRecord {
        student_id: student_id.to_string(),
        student_name: format!("Student {student_id}"),
        school_unit: school_unit.to_string(),
        contact_email: format!("rektor@{}.se", school_unit.to_ascii_lowercase()),
        start_date: start.to_string(),
        end_date: end.map(str::to_string),
        study_path: "Naturvetenskap".to_string(),
        school_year: 2,
        home_municipality_contact: format!("ike-{student_id}@kommun.se"),
    }
}

/// Student S1: overlapping placements at two schools. The second placement
/// is on a different study path so only the overlap detector fires.
pub(super) fn overlap_dataset() -> Vec<EnrollmentRecord> {
    let mut records = vec![
        enrollment("s1", "Alpha", "2024-01-01", Some("2024-06-30")),
        enrollment("s1", "Beta", "2024-05-01", None),
    ];
    records[1].study_path = "Teknik".to_string();
    records
}

/// Student S2: same study path and year twice in a row at different schools.
pub(super) fn repetition_dataset() -> Vec<EnrollmentRecord> {
    vec![
        enrollment("s2", "X", "2023-08-15", Some("2024-06-10")),
        enrollment("s2", "Y", "2024-08-19", None),
    ]
}

pub(super) fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

pub(super) fn dual_placement_details() -> DualPlacementDetails {
    DualPlacementDetails {
        overlapping_schools: vec![
            OverlappingPlacement {
                school_unit: "Alpha".to_string(),
                start_date: date(2024, 1, 1),
                end_date: Some(date(2024, 6, 30)),
                contact_email: "rektor@alpha.se".to_string(),
            },
            OverlappingPlacement {
                school_unit: "Beta".to_string(),
                start_date: date(2024, 5, 1),
                end_date: None,
                contact_email: "rektor@beta.se".to_string(),
            },
        ],
    }
}

pub(super) fn grade_repetition_details() -> GradeRepetitionDetails {
    GradeRepetitionDetails {
        previous: EnrollmentSnapshot {
            study_path: "Naturvetenskap".to_string(),
            school_year: 2,
            school_unit: "X".to_string(),
            start_date: date(2023, 8, 15),
            end_date: Some(date(2024, 6, 10)),
        },
        current: EnrollmentSnapshot {
            study_path: "Naturvetenskap".to_string(),
            school_year: 2,
            school_unit: "Y".to_string(),
            start_date: date(2024, 8, 19),
            end_date: None,
        },
        home_municipality_contact: "ike-s2@kommun.se".to_string(),
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryRepository {
    records: Arc<Mutex<BTreeMap<NotificationId, Notification>>>,
}

impl NotificationRepository for MemoryRepository {
    fn insert(&self, notification: Notification) -> Result<Notification, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if guard.contains_key(&notification.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(notification.id.clone(), notification.clone());
        Ok(notification)
    }

    fn update(&self, notification: Notification) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if guard.contains_key(&notification.id) {
            guard.insert(notification.id.clone(), notification);
            Ok(())
        } else {
            Err(RepositoryError::NotFound)
        }
    }

    fn fetch(&self, id: &NotificationId) -> Result<Option<Notification>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn active(&self) -> Result<Vec<Notification>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard
            .values()
            .filter(|notification| notification.is_active())
            .cloned()
            .collect())
    }
}

impl MemoryRepository {
    pub(super) fn record_count(&self) -> usize {
        self.records.lock().expect("repository mutex poisoned").len()
    }
}

#[derive(Default, Clone)]
pub(super) struct MemorySink {
    payloads: Arc<Mutex<Vec<DispatchPayload>>>,
}

impl MemorySink {
    pub(super) fn payloads(&self) -> Vec<DispatchPayload> {
        self.payloads.lock().expect("sink mutex poisoned").clone()
    }
}

impl DispatchSink for MemorySink {
    fn send(&self, payload: DispatchPayload) -> Result<(), DispatchError> {
        self.payloads
            .lock()
            .expect("sink mutex poisoned")
            .push(payload);
        Ok(())
    }
}

pub(super) struct FailingSink;

impl DispatchSink for FailingSink {
    fn send(&self, _payload: DispatchPayload) -> Result<(), DispatchError> {
        Err(DispatchError::Transport("smtp relay offline".to_string()))
    }
}

/// Sink that parks inside `send` until the test releases it, so a reminder
/// sweep can be held mid-dispatch while a second trigger fires.
pub(super) struct GatedSink {
    pub(super) entered: Arc<Barrier>,
    pub(super) release: Arc<Barrier>,
}

impl DispatchSink for GatedSink {
    fn send(&self, _payload: DispatchPayload) -> Result<(), DispatchError> {
        self.entered.wait();
        self.release.wait();
        Ok(())
    }
}

pub(super) fn build_engine() -> (
    Arc<NotificationEngine<MemoryRepository, MemorySink>>,
    Arc<MemoryRepository>,
    Arc<MemorySink>,
) {
    let repository = Arc::new(MemoryRepository::default());
    let sink = Arc::new(MemorySink::default());
    let engine = Arc::new(NotificationEngine::new(repository.clone(), sink.clone()));
    (engine, repository, sink)
}
