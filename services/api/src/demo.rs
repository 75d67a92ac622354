use crate::infra::{InMemoryNotificationRepository, RecordingDispatchSink};
use clap::Args;
use ike_engine::enrollment::notifications::{
    Notification, NotificationEngine, ReminderOutcome, ScanSummary,
};
use ike_engine::enrollment::EnrollmentRecord;
use ike_engine::error::AppError;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct ScanArgs {
    /// JSON file containing an array of enrollment records
    #[arg(long)]
    pub(crate) dataset: PathBuf,
}

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Optional JSON dataset to scan instead of the built-in mock data
    #[arg(long)]
    pub(crate) dataset: Option<PathBuf>,
    /// Print the full dispatched payload bodies
    #[arg(long)]
    pub(crate) show_payloads: bool,
}

pub(crate) fn run_scan(args: ScanArgs) -> Result<(), AppError> {
    let dataset = load_dataset(&args.dataset)?;
    let (engine, _sink) = build_demo_engine();

    let summary = engine.scan(&dataset)?;
    render_scan_summary(&summary);

    let active = engine.active_notifications()?;
    render_notifications(&active);
    render_payment_blocks(&engine)?;

    Ok(())
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    println!("Enrollment conflict engine demo");

    let dataset = match &args.dataset {
        Some(path) => load_dataset(path)?,
        None => mock_dataset(),
    };
    let (engine, sink) = build_demo_engine();

    let summary = engine.scan(&dataset)?;
    render_scan_summary(&summary);

    let active = engine.active_notifications()?;
    render_notifications(&active);
    render_payment_blocks(&engine)?;

    println!("\nDaily reminder sweep");
    match engine.daily_reminders()? {
        ReminderOutcome::Completed { dispatched } => {
            println!("- re-dispatched {dispatched} payload(s) for unresolved dual placements");
        }
        ReminderOutcome::SkippedOverlapping => {
            println!("- skipped: a previous sweep is still running");
        }
    }

    if let Some(blocking) = active
        .iter()
        .find(|notification| notification.kind.blocks_payment())
    {
        println!("\nResolving {} for {}", blocking.id.0, blocking.student_name);
        engine.resolve(&blocking.id)?;
        render_payment_blocks(&engine)?;
    }

    let rescan = engine.scan(&dataset)?;
    println!(
        "\nRe-scan of the same dataset: {} created, {} suppressed as duplicates",
        rescan.notifications_created, rescan.duplicates_suppressed
    );

    let payloads = sink.payloads();
    println!("\nDispatched payloads: {}", payloads.len());
    for payload in &payloads {
        println!("- to {}: {}", payload.recipients.join(", "), payload.subject);
        if args.show_payloads {
            for line in payload.body.lines() {
                println!("    {line}");
            }
        }
    }

    Ok(())
}

fn build_demo_engine() -> (
    Arc<NotificationEngine<InMemoryNotificationRepository, RecordingDispatchSink>>,
    Arc<RecordingDispatchSink>,
) {
    let repository = Arc::new(InMemoryNotificationRepository::default());
    let sink = Arc::new(RecordingDispatchSink::default());
    let engine = Arc::new(NotificationEngine::new(repository, sink.clone()));
    (engine, sink)
}

fn load_dataset(path: &Path) -> Result<Vec<EnrollmentRecord>, AppError> {
    let raw = std::fs::read_to_string(path)?;
    let records: Vec<EnrollmentRecord> = serde_json::from_str(&raw)
        .map_err(|err| std::io::Error::new(std::io::ErrorKind::InvalidData, err))?;
    Ok(records)
}

fn render_scan_summary(summary: &ScanSummary) {
    println!("\nScan summary");
    println!("- dual placements found: {}", summary.dual_placements_found);
    println!(
        "- grade repetitions found: {}",
        summary.grade_repetitions_found
    );
    println!(
        "- notifications created: {} ({} duplicate(s) suppressed)",
        summary.notifications_created, summary.duplicates_suppressed
    );
}

fn render_notifications(notifications: &[Notification]) {
    if notifications.is_empty() {
        println!("\nActive notifications: none");
        return;
    }

    println!("\nActive notifications");
    for notification in notifications {
        println!(
            "- {} [{}] {}",
            notification.id.0,
            notification.kind.label(),
            notification.message
        );
    }
}

fn render_payment_blocks(
    engine: &NotificationEngine<InMemoryNotificationRepository, RecordingDispatchSink>,
) -> Result<(), AppError> {
    let blocked = engine.payment_blocked_students()?;
    if blocked.is_empty() {
        println!("Payment blocks: none");
    } else {
        println!(
            "Payment blocks: {}",
            blocked.into_iter().collect::<Vec<_>>().join(", ")
        );
    }
    Ok(())
}

/// The mock dataset the dashboard ships with: one dual placement, one grade
/// repetition, and one clean enrollment.
fn mock_dataset() -> Vec<EnrollmentRecord> {
    fn record(
        student_id: &str,
        student_name: &str,
        school_unit: &str,
        contact_email: &str,
        start: &str,
        end: Option<&str>,
        study_path: &str,
        school_year: u8,
    ) -> EnrollmentRecord {
        EnrollmentRecord {
            student_id: student_id.to_string(),
            student_name: student_name.to_string(),
            school_unit: school_unit.to_string(),
            contact_email: contact_email.to_string(),
            start_date: start.to_string(),
            end_date: end.map(str::to_string),
            study_path: study_path.to_string(),
            school_year,
            home_municipality_contact: "ike@hemkommun.se".to_string(),
        }
    }

    vec![
        record(
            "S1",
            "Signe Ek",
            "Norra Gymnasiet",
            "admin@norra.se",
            "2024-01-01",
            Some("2024-06-30"),
            "Naturvetenskap",
            2,
        ),
        record(
            "S1",
            "Signe Ek",
            "Västra Gymnasiet",
            "admin@vastra.se",
            "2024-05-01",
            None,
            "Teknik",
            2,
        ),
        record(
            "S2",
            "Omar Lind",
            "Norra Gymnasiet",
            "admin@norra.se",
            "2023-08-15",
            Some("2024-06-10"),
            "Naturvetenskap",
            2,
        ),
        record(
            "S2",
            "Omar Lind",
            "Södra Gymnasiet",
            "admin@sodra.se",
            "2024-08-19",
            None,
            "Naturvetenskap",
            2,
        ),
        record(
            "S3",
            "Nils Berg",
            "Södra Gymnasiet",
            "admin@sodra.se",
            "2024-08-19",
            None,
            "Teknik",
            1,
        ),
    ]
}
