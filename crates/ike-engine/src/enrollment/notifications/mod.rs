//! Notification lifecycle for enrollment conflicts.
//!
//! Detected conflicts become stateful notification records that are
//! dispatched to the affected schools and municipalities. Active dual
//! placements block compensation payments until explicitly resolved;
//! grade repetitions are advisory. Records are soft-resolved and retained
//! for audit, never deleted.

pub mod domain;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use domain::{
    DualPlacementDetails, EnrollmentSnapshot, GradeRepetitionDetails, Notification,
    NotificationDetails, NotificationId, NotificationKind, NotificationStatus,
    OverlappingPlacement,
};
pub use repository::{
    DispatchError, DispatchPayload, DispatchSink, NotificationRepository, RepositoryError,
};
pub use router::notification_router;
pub use service::{EngineError, NotificationEngine, ReminderOutcome, ScanSummary};
