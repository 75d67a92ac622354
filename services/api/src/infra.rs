use chrono::NaiveDate;
use ike_engine::enrollment::notifications::{
    DispatchError, DispatchPayload, DispatchSink, Notification, NotificationId,
    NotificationRepository, RepositoryError,
};
use ike_engine::enrollment::IdentityAnonymizer;
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::BTreeMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// In-memory notification store. The BTreeMap keeps records in id order,
/// which is creation order, so active listings stay stable for the life of
/// the process.
#[derive(Default, Clone)]
pub(crate) struct InMemoryNotificationRepository {
    records: Arc<Mutex<BTreeMap<NotificationId, Notification>>>,
}

impl NotificationRepository for InMemoryNotificationRepository {
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

/// Simulated delivery: payloads are logged instead of mailed. Real SMTP or
/// queue transport is a deployment concern behind the same trait.
#[derive(Default, Clone)]
pub(crate) struct TracingDispatchSink;

impl DispatchSink for TracingDispatchSink {
    fn send(&self, payload: DispatchPayload) -> Result<(), DispatchError> {
        info!(
            recipients = %payload.recipients.join(", "),
            subject = %payload.subject,
            "simulated notification delivery"
        );
        debug!(body = %payload.body, "notification body");
        Ok(())
    }
}

/// Sink that records payloads so the CLI demo can show what was sent.
#[derive(Default, Clone)]
pub(crate) struct RecordingDispatchSink {
    payloads: Arc<Mutex<Vec<DispatchPayload>>>,
}

impl RecordingDispatchSink {
    pub(crate) fn payloads(&self) -> Vec<DispatchPayload> {
        self.payloads.lock().expect("sink mutex poisoned").clone()
    }
}

impl DispatchSink for RecordingDispatchSink {
    fn send(&self, payload: DispatchPayload) -> Result<(), DispatchError> {
        self.payloads
            .lock()
            .expect("sink mutex poisoned")
            .push(payload);
        Ok(())
    }
}

pub(crate) fn shared_anonymizer() -> Arc<IdentityAnonymizer> {
    Arc::new(IdentityAnonymizer::new())
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

pub(crate) fn deserialize_optional_date<'de, D>(
    deserializer: D,
) -> Result<Option<NaiveDate>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::Deserialize;

    let opt = Option::<String>::deserialize(deserializer)?;
    opt.map(|value| parse_date(&value).map_err(serde::de::Error::custom))
        .transpose()
}
