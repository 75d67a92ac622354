use crate::cli::ServeArgs;
use crate::infra::{
    shared_anonymizer, AppState, InMemoryNotificationRepository, TracingDispatchSink,
};
use crate::routes::with_enrollment_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use ike_engine::config::AppConfig;
use ike_engine::enrollment::notifications::{NotificationEngine, ReminderOutcome};
use ike_engine::error::AppError;
use ike_engine::telemetry;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let repository = Arc::new(InMemoryNotificationRepository::default());
    let sink = Arc::new(TracingDispatchSink);
    let engine = Arc::new(NotificationEngine::new(repository, sink));
    let anonymizer = shared_anonymizer();

    if config.reminders.enabled() {
        spawn_reminder_scheduler(engine.clone(), config.reminders.interval_hours);
    }

    let app = with_enrollment_routes(engine)
        .layer(Extension(app_state))
        .layer(Extension(anonymizer))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "enrollment conflict engine ready");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Periodic reminder sweep for unresolved dual placements. The engine's own
/// guard makes overlapping triggers skip, so at most one sweep runs at a
/// time even if a sweep outlasts the interval.
fn spawn_reminder_scheduler<R, S>(
    engine: Arc<NotificationEngine<R, S>>,
    interval_hours: u64,
) where
    R: ike_engine::enrollment::notifications::NotificationRepository + 'static,
    S: ike_engine::enrollment::notifications::DispatchSink + 'static,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(interval_hours * 60 * 60));
        // The first tick completes immediately; skip it so the sweep waits a
        // full interval after startup.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            match engine.daily_reminders() {
                Ok(ReminderOutcome::Completed { dispatched }) => {
                    info!(dispatched, "reminder sweep completed");
                }
                Ok(ReminderOutcome::SkippedOverlapping) => {
                    info!("reminder sweep skipped; previous sweep still running");
                }
                Err(err) => error!(error = %err, "reminder sweep failed"),
            }
        }
    });
}
