use std::collections::{BTreeSet, HashSet};
use std::fmt::Write as _;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::Utc;
use serde::Serialize;
use tracing::warn;

use super::domain::{
    format_end, DualPlacementDetails, EnrollmentSnapshot, GradeRepetitionDetails, Notification,
    NotificationDetails, NotificationId, NotificationKind, NotificationStatus,
};
use super::repository::{DispatchPayload, DispatchSink, NotificationRepository, RepositoryError};
use crate::enrollment::domain::{DetectionError, EnrollmentRecord};
use crate::enrollment::overlap::detect_dual_placements;
use crate::enrollment::repetition::detect_grade_repetitions;

/// Engine owning the notification lifecycle: creation with synchronous
/// dispatch, active queries, resolution, the daily reminder sweep, and the
/// dataset scan that feeds the detectors into it.
pub struct NotificationEngine<R, S> {
    repository: Arc<R>,
    sink: Arc<S>,
    reminder_sweep: Mutex<()>,
}

static NOTIFICATION_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_notification_id() -> NotificationId {
    let id = NOTIFICATION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    NotificationId(format!("ntf-{id:06}"))
}

/// Outcome of a reminder sweep. A sweep that fires while a previous one is
/// still dispatching is skipped, never run in parallel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ReminderOutcome {
    Completed { dispatched: usize },
    SkippedOverlapping,
}

/// Counters describing one scan over a dataset snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScanSummary {
    pub dual_placements_found: usize,
    pub grade_repetitions_found: usize,
    pub notifications_created: usize,
    pub duplicates_suppressed: usize,
}

impl<R, S> NotificationEngine<R, S>
where
    R: NotificationRepository + 'static,
    S: DispatchSink + 'static,
{
    pub fn new(repository: Arc<R>, sink: Arc<S>) -> Self {
        Self {
            repository,
            sink,
            reminder_sweep: Mutex::new(()),
        }
    }

    /// Record a dual placement and dispatch its payload to every affected
    /// school. Always creates a new record; scan-level dedup lives in
    /// [`Self::scan`].
    pub fn create_dual_placement(
        &self,
        student_id: &str,
        student_name: &str,
        details: DualPlacementDetails,
    ) -> Result<Notification, EngineError> {
        let message = format!(
            "{} has overlapping placements at {} school units; compensation payments are blocked until resolved",
            student_name,
            details.overlapping_schools.len()
        );
        self.create(
            NotificationKind::DualPlacement,
            student_id,
            student_name,
            message,
            NotificationDetails::DualPlacement(details),
        )
    }

    /// Record a grade repetition and notify the responsible municipality.
    /// Advisory only; never blocks payment.
    pub fn create_grade_repetition(
        &self,
        student_id: &str,
        student_name: &str,
        details: GradeRepetitionDetails,
    ) -> Result<Notification, EngineError> {
        let message = format!(
            "{} re-enrolled in {} year {} at {} directly after the same year at {}",
            student_name,
            details.current.study_path,
            details.current.school_year,
            details.current.school_unit,
            details.previous.school_unit
        );
        self.create(
            NotificationKind::GradeRepetition,
            student_id,
            student_name,
            message,
            NotificationDetails::GradeRepetition(details),
        )
    }

    fn create(
        &self,
        kind: NotificationKind,
        student_id: &str,
        student_name: &str,
        message: String,
        details: NotificationDetails,
    ) -> Result<Notification, EngineError> {
        let notification = Notification {
            id: next_notification_id(),
            kind,
            student_id: student_id.to_string(),
            student_name: student_name.to_string(),
            message,
            details,
            created_at: Utc::now(),
            status: NotificationStatus::Active,
        };

        // The record is the source of truth for payment blocking; it must
        // outlive a failed delivery.
        let stored = self.repository.insert(notification)?;
        let payload = build_payload(&stored);
        if let Err(err) = self.sink.send(payload) {
            warn!(notification = %stored.id.0, error = %err, "dispatch failed; record kept");
        }

        Ok(stored)
    }

    /// All non-resolved records, in creation order.
    pub fn active_notifications(&self) -> Result<Vec<Notification>, EngineError> {
        Ok(self.repository.active()?)
    }

    /// Mark a notification resolved. Unknown ids surface
    /// [`RepositoryError::NotFound`]; resolving an already-resolved record
    /// is a no-op.
    pub fn resolve(&self, id: &NotificationId) -> Result<(), EngineError> {
        let mut notification = self
            .repository
            .fetch(id)?
            .ok_or(RepositoryError::NotFound)?;

        if notification.status == NotificationStatus::Resolved {
            return Ok(());
        }

        notification.status = NotificationStatus::Resolved;
        self.repository.update(notification)?;
        Ok(())
    }

    /// Students excluded from payable/receivable totals: anyone with an
    /// active dual-placement notification.
    pub fn payment_blocked_students(&self) -> Result<BTreeSet<String>, EngineError> {
        let blocked = self
            .repository
            .active()?
            .into_iter()
            .filter(|notification| notification.kind.blocks_payment())
            .map(|notification| notification.student_id)
            .collect();
        Ok(blocked)
    }

    pub fn is_payment_blocked(&self, student_id: &str) -> Result<bool, EngineError> {
        Ok(self
            .payment_blocked_students()?
            .contains(student_id))
    }

    /// Re-dispatch the current payload for every active dual placement.
    /// Grade repetitions are advisory and never re-sent. Each call sends
    /// again — schedule at most once per day. Payloads are copied out before
    /// any dispatch so a slow sink never blocks the store.
    pub fn daily_reminders(&self) -> Result<ReminderOutcome, EngineError> {
        let Ok(_guard) = self.reminder_sweep.try_lock() else {
            warn!("reminder sweep still running; skipping this trigger");
            return Ok(ReminderOutcome::SkippedOverlapping);
        };

        let payloads: Vec<DispatchPayload> = self
            .repository
            .active()?
            .iter()
            .filter(|notification| notification.kind.blocks_payment())
            .map(build_payload)
            .collect();

        let mut dispatched = 0;
        for payload in payloads {
            match self.sink.send(payload) {
                Ok(()) => dispatched += 1,
                Err(err) => warn!(error = %err, "reminder dispatch failed"),
            }
        }

        Ok(ReminderOutcome::Completed { dispatched })
    }

    /// Run both detectors over a full dataset snapshot and create
    /// notifications for what they find. Candidates matching an existing
    /// active notification — same kind, student, and canonicalized details —
    /// are suppressed so repeated scans of unchanged data do not pile up
    /// duplicate records.
    pub fn scan(&self, records: &[EnrollmentRecord]) -> Result<ScanSummary, EngineError> {
        let conflicts = detect_dual_placements(records)?;
        let repetitions = detect_grade_repetitions(records)?;

        let existing: HashSet<(NotificationKind, String, String)> = self
            .repository
            .active()?
            .iter()
            .map(|notification| {
                (
                    notification.kind,
                    notification.student_id.clone(),
                    notification.details.fingerprint(),
                )
            })
            .collect();

        let mut summary = ScanSummary {
            dual_placements_found: conflicts.len(),
            grade_repetitions_found: repetitions.len(),
            ..ScanSummary::default()
        };

        for conflict in conflicts {
            let details = DualPlacementDetails {
                overlapping_schools: conflict.members.iter().map(Into::into).collect(),
            };
            let key = (
                NotificationKind::DualPlacement,
                conflict.student_id.clone(),
                NotificationDetails::DualPlacement(details.clone()).fingerprint(),
            );
            if existing.contains(&key) {
                summary.duplicates_suppressed += 1;
                continue;
            }
            self.create_dual_placement(&conflict.student_id, &conflict.student_name, details)?;
            summary.notifications_created += 1;
        }

        for repetition in repetitions {
            let details = GradeRepetitionDetails {
                previous: EnrollmentSnapshot::from(&repetition.previous),
                current: EnrollmentSnapshot::from(&repetition.current),
                home_municipality_contact: repetition.current.home_municipality_contact.clone(),
            };
            let key = (
                NotificationKind::GradeRepetition,
                repetition.student_id.clone(),
                NotificationDetails::GradeRepetition(details.clone()).fingerprint(),
            );
            if existing.contains(&key) {
                summary.duplicates_suppressed += 1;
                continue;
            }
            self.create_grade_repetition(
                &repetition.student_id,
                &repetition.student_name,
                details,
            )?;
            summary.notifications_created += 1;
        }

        Ok(summary)
    }
}

/// Build the outbound payload for a notification. Reminders re-send the
/// same payload, so this derives everything from the stored record.
pub(crate) fn build_payload(notification: &Notification) -> DispatchPayload {
    match &notification.details {
        NotificationDetails::DualPlacement(details) => {
            let mut body = String::new();
            writeln!(
                &mut body,
                "{} is enrolled at {} school units with overlapping dates:",
                notification.student_name,
                details.overlapping_schools.len()
            )
            .expect("write body heading");
            for placement in &details.overlapping_schools {
                writeln!(
                    &mut body,
                    "- {}: {} to {}",
                    placement.school_unit,
                    placement.start_date,
                    format_end(placement.end_date)
                )
                .expect("write placement line");
            }
            writeln!(
                &mut body,
                "Compensation payments for this student are blocked until the placement is corrected and the notification is resolved."
            )
            .expect("write blocking note");

            DispatchPayload {
                recipients: details.recipients(),
                subject: format!(
                    "Action required: overlapping placements for {}",
                    notification.student_name
                ),
                body,
            }
        }
        NotificationDetails::GradeRepetition(details) => {
            let mut body = String::new();
            writeln!(
                &mut body,
                "{} re-enrolled in {} year {}:",
                notification.student_name,
                details.current.study_path,
                details.current.school_year
            )
            .expect("write body heading");
            writeln!(
                &mut body,
                "- Previous: {} ({} to {})",
                details.previous.school_unit,
                details.previous.start_date,
                format_end(details.previous.end_date)
            )
            .expect("write previous line");
            writeln!(
                &mut body,
                "- Current: {} ({} to {})",
                details.current.school_unit,
                details.current.start_date,
                format_end(details.current.end_date)
            )
            .expect("write current line");
            writeln!(
                &mut body,
                "Advisory only; no payment block applies. Review whether the repeated year affects the compensation agreement."
            )
            .expect("write advisory note");

            DispatchPayload {
                recipients: vec![details.home_municipality_contact.clone()],
                subject: format!(
                    "Advisory: repeated school year for {}",
                    notification.student_name
                ),
                body,
            }
        }
    }
}

/// Error raised by the notification engine.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Detection(#[from] DetectionError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
