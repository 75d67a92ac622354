use serde::{Deserialize, Serialize};

use super::domain::{Notification, NotificationId};

/// Storage abstraction for notification records so the engine can run
/// against an in-memory map in tests and a persistent store in production.
/// Implementations serialize concurrent access themselves; the engine never
/// holds a store lock across a dispatch call.
pub trait NotificationRepository: Send + Sync {
    fn insert(&self, notification: Notification) -> Result<Notification, RepositoryError>;
    fn update(&self, notification: Notification) -> Result<(), RepositoryError>;
    fn fetch(&self, id: &NotificationId) -> Result<Option<Notification>, RepositoryError>;
    /// All non-resolved records in ascending id order. Ids are minted from a
    /// sequence, so this is creation order and stable within a process run.
    fn active(&self) -> Result<Vec<Notification>, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("notification already exists")]
    Conflict,
    #[error("notification not found")]
    NotFound,
    #[error("notification store unavailable: {0}")]
    Unavailable(String),
}

/// Outbound message handed to the delivery collaborator. The engine only
/// builds payloads; transport (SMTP, queue, console) lives behind the sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchPayload {
    pub recipients: Vec<String>,
    pub subject: String,
    pub body: String,
}

/// Best-effort delivery hook. The engine treats failures as reportable but
/// never lets them roll back a notification record; retries, if any, belong
/// to the implementation.
pub trait DispatchSink: Send + Sync {
    fn send(&self, payload: DispatchPayload) -> Result<(), DispatchError>;
}

/// Dispatch failure.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("dispatch transport unavailable: {0}")]
    Transport(String),
    #[error("dispatch timed out: {0}")]
    Timeout(String),
}
