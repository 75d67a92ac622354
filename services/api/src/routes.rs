use crate::infra::{deserialize_optional_date, AppState};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use chrono::{Local, NaiveDate};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use ike_engine::enrollment::notifications::{
    notification_router, DispatchSink, NotificationEngine, NotificationRepository,
};
use ike_engine::enrollment::{regional_summary, IdentityAnonymizer, RegionalRecord, RegionalSummary};
use ike_engine::error::AppError;

#[derive(Debug, Deserialize)]
pub(crate) struct RegionalReportRequest {
    pub(crate) records: Vec<RegionalRecord>,
    /// Reference date for the age buckets; defaults to today.
    #[serde(default, deserialize_with = "deserialize_optional_date")]
    pub(crate) reference_date: Option<NaiveDate>,
}

pub(crate) fn with_enrollment_routes<R, S>(
    engine: Arc<NotificationEngine<R, S>>,
) -> axum::Router
where
    R: NotificationRepository + 'static,
    S: DispatchSink + 'static,
{
    notification_router(engine)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
        .route(
            "/api/v1/enrollment/report",
            axum::routing::post(regional_report_endpoint),
        )
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

pub(crate) async fn regional_report_endpoint(
    Extension(anonymizer): Extension<Arc<IdentityAnonymizer>>,
    Json(payload): Json<RegionalReportRequest>,
) -> Result<Json<RegionalSummary>, AppError> {
    let RegionalReportRequest {
        records,
        reference_date,
    } = payload;

    let reference_date = reference_date.unwrap_or_else(|| Local::now().date_naive());
    let summary = regional_summary(&records, &anonymizer, reference_date)?;
    Ok(Json(summary))
}
