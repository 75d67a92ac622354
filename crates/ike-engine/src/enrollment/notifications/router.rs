use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;

use super::domain::{NotificationId, NotificationStatus};
use super::repository::{DispatchSink, NotificationRepository, RepositoryError};
use super::service::{EngineError, NotificationEngine};
use crate::enrollment::domain::EnrollmentRecord;

#[derive(Debug, Deserialize)]
pub(crate) struct ScanRequest {
    pub(crate) records: Vec<EnrollmentRecord>,
}

/// Router builder exposing the scan, notification, and reminder endpoints.
pub fn notification_router<R, S>(engine: Arc<NotificationEngine<R, S>>) -> Router
where
    R: NotificationRepository + 'static,
    S: DispatchSink + 'static,
{
    Router::new()
        .route("/api/v1/enrollment/scan", post(scan_handler::<R, S>))
        .route(
            "/api/v1/enrollment/notifications",
            get(active_handler::<R, S>),
        )
        .route(
            "/api/v1/enrollment/notifications/:notification_id/resolve",
            post(resolve_handler::<R, S>),
        )
        .route(
            "/api/v1/enrollment/payment-blocks",
            get(payment_blocks_handler::<R, S>),
        )
        .route(
            "/api/v1/enrollment/reminders",
            post(reminders_handler::<R, S>),
        )
        .with_state(engine)
}

pub(crate) async fn scan_handler<R, S>(
    State(engine): State<Arc<NotificationEngine<R, S>>>,
    axum::Json(request): axum::Json<ScanRequest>,
) -> Response
where
    R: NotificationRepository + 'static,
    S: DispatchSink + 'static,
{
    match engine.scan(&request.records) {
        Ok(summary) => (StatusCode::OK, axum::Json(summary)).into_response(),
        Err(EngineError::Detection(error)) => {
            let payload = json!({ "error": error.to_string() });
            (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(payload)).into_response()
        }
        Err(other) => {
            let payload = json!({ "error": other.to_string() });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
    }
}

pub(crate) async fn active_handler<R, S>(
    State(engine): State<Arc<NotificationEngine<R, S>>>,
) -> Response
where
    R: NotificationRepository + 'static,
    S: DispatchSink + 'static,
{
    match engine.active_notifications() {
        Ok(notifications) => (StatusCode::OK, axum::Json(notifications)).into_response(),
        Err(error) => {
            let payload = json!({ "error": error.to_string() });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
    }
}

pub(crate) async fn resolve_handler<R, S>(
    State(engine): State<Arc<NotificationEngine<R, S>>>,
    Path(notification_id): Path<String>,
) -> Response
where
    R: NotificationRepository + 'static,
    S: DispatchSink + 'static,
{
    let id = NotificationId(notification_id);
    match engine.resolve(&id) {
        Ok(()) => {
            let payload = json!({
                "notification_id": id.0,
                "status": NotificationStatus::Resolved.label(),
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(EngineError::Repository(RepositoryError::NotFound)) => {
            let payload = json!({ "error": "notification not found" });
            (StatusCode::NOT_FOUND, axum::Json(payload)).into_response()
        }
        Err(other) => {
            let payload = json!({ "error": other.to_string() });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
    }
}

pub(crate) async fn payment_blocks_handler<R, S>(
    State(engine): State<Arc<NotificationEngine<R, S>>>,
) -> Response
where
    R: NotificationRepository + 'static,
    S: DispatchSink + 'static,
{
    match engine.payment_blocked_students() {
        Ok(students) => {
            let payload = json!({ "students": students });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => {
            let payload = json!({ "error": error.to_string() });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
    }
}

pub(crate) async fn reminders_handler<R, S>(
    State(engine): State<Arc<NotificationEngine<R, S>>>,
) -> Response
where
    R: NotificationRepository + 'static,
    S: DispatchSink + 'static,
{
    match engine.daily_reminders() {
        Ok(outcome) => (StatusCode::OK, axum::Json(outcome)).into_response(),
        Err(error) => {
            let payload = json!({ "error": error.to_string() });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
    }
}
