use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::enrollment::domain::EnrollmentInterval;

/// Identifier wrapper for notification records.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NotificationId(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    DualPlacement,
    GradeRepetition,
}

impl NotificationKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::DualPlacement => "Dual placement",
            Self::GradeRepetition => "Grade repetition",
        }
    }

    /// Only dual placements block compensation payments.
    pub const fn blocks_payment(self) -> bool {
        matches!(self, Self::DualPlacement)
    }
}

/// Lifecycle state. Resolved is terminal; re-detection after resolution
/// creates a new record instead of reopening this one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationStatus {
    Active,
    Resolved,
}

impl NotificationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Active => "Active",
            Self::Resolved => "Resolved",
        }
    }
}

/// One school's slice of a dual placement, in dataset input order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverlappingPlacement {
    pub school_unit: String,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub contact_email: String,
}

impl From<&EnrollmentInterval> for OverlappingPlacement {
    fn from(interval: &EnrollmentInterval) -> Self {
        Self {
            school_unit: interval.school_unit.clone(),
            start_date: interval.start_date,
            end_date: interval.end_date,
            contact_email: interval.contact_email.clone(),
        }
    }
}

/// Detail payload for a dual placement: at least two placements, each
/// overlapping at least one other in the set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DualPlacementDetails {
    pub overlapping_schools: Vec<OverlappingPlacement>,
}

impl DualPlacementDetails {
    /// Distinct contact addresses in placement order.
    pub fn recipients(&self) -> Vec<String> {
        let mut recipients: Vec<String> = Vec::new();
        for placement in &self.overlapping_schools {
            if !recipients.contains(&placement.contact_email) {
                recipients.push(placement.contact_email.clone());
            }
        }
        recipients
    }
}

/// Enrollment snapshot embedded in grade-repetition details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrollmentSnapshot {
    pub study_path: String,
    pub school_year: u8,
    pub school_unit: String,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
}

impl From<&EnrollmentInterval> for EnrollmentSnapshot {
    fn from(interval: &EnrollmentInterval) -> Self {
        Self {
            study_path: interval.study_path.clone(),
            school_year: interval.school_year,
            school_unit: interval.school_unit.clone(),
            start_date: interval.start_date,
            end_date: interval.end_date,
        }
    }
}

/// Detail payload for a grade repetition: the repeated pair plus the contact
/// of the municipality responsible for the new placement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GradeRepetitionDetails {
    pub previous: EnrollmentSnapshot,
    pub current: EnrollmentSnapshot,
    pub home_municipality_contact: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NotificationDetails {
    DualPlacement(DualPlacementDetails),
    GradeRepetition(GradeRepetitionDetails),
}

impl NotificationDetails {
    /// Canonical key for suppressing re-detections of the same underlying
    /// condition. School sets are sorted so member order does not matter.
    pub(crate) fn fingerprint(&self) -> String {
        match self {
            Self::DualPlacement(details) => {
                let mut keys: Vec<String> = details
                    .overlapping_schools
                    .iter()
                    .map(|placement| {
                        format!(
                            "{}|{}|{}",
                            placement.school_unit,
                            placement.start_date,
                            format_end(placement.end_date)
                        )
                    })
                    .collect();
                keys.sort();
                keys.join(";")
            }
            Self::GradeRepetition(details) => format!(
                "{}|{}|{}|{}",
                details.current.study_path,
                details.current.school_year,
                details.previous.start_date,
                details.current.start_date
            ),
        }
    }
}

/// Stateful conflict record. Mutated only by resolution; kept forever.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub kind: NotificationKind,
    pub student_id: String,
    pub student_name: String,
    pub message: String,
    pub details: NotificationDetails,
    pub created_at: DateTime<Utc>,
    pub status: NotificationStatus,
}

impl Notification {
    pub fn is_active(&self) -> bool {
        self.status == NotificationStatus::Active
    }
}

pub(crate) fn format_end(end_date: Option<NaiveDate>) -> String {
    match end_date {
        Some(date) => date.to_string(),
        None => "ongoing".to_string(),
    }
}
