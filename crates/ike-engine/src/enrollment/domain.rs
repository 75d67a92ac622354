use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Raw enrollment row exactly as the upstream student-records system hands
/// it over. Dates stay as strings here so the detectors own validation and
/// can point at the offending record instead of failing somewhere in a
/// deserializer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrollmentRecord {
    pub student_id: String,
    pub student_name: String,
    pub school_unit: String,
    pub contact_email: String,
    /// Placement start, `YYYY-MM-DD`.
    pub start_date: String,
    /// Placement end, `YYYY-MM-DD`. Absent or blank means the enrollment is
    /// ongoing.
    #[serde(default)]
    pub end_date: Option<String>,
    pub study_path: String,
    pub school_year: u8,
    /// Contact at the municipality financially responsible for this
    /// placement.
    pub home_municipality_contact: String,
}

impl EnrollmentRecord {
    /// Parse the date fields into a validated interval. A malformed date
    /// fails the record rather than being skipped, since a dropped record
    /// could hide a payment-blocking overlap.
    pub fn validate(&self) -> Result<EnrollmentInterval, DetectionError> {
        let start_date = parse_date(&self.student_id, "start_date", &self.start_date)?;
        let end_date = match self.end_date.as_deref().map(str::trim) {
            Some("") | None => None,
            Some(raw) => Some(parse_date(&self.student_id, "end_date", raw)?),
        };

        Ok(EnrollmentInterval {
            student_id: self.student_id.clone(),
            student_name: self.student_name.clone(),
            school_unit: self.school_unit.clone(),
            contact_email: self.contact_email.clone(),
            start_date,
            end_date,
            study_path: self.study_path.clone(),
            school_year: self.school_year,
            home_municipality_contact: self.home_municipality_contact.clone(),
        })
    }
}

/// Validated snapshot of a single placement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnrollmentInterval {
    pub student_id: String,
    pub student_name: String,
    pub school_unit: String,
    pub contact_email: String,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub study_path: String,
    pub school_year: u8,
    pub home_municipality_contact: String,
}

impl EnrollmentInterval {
    /// Ongoing enrollments compare as if they ran forever.
    pub fn effective_end(&self) -> NaiveDate {
        self.end_date.unwrap_or(NaiveDate::MAX)
    }

    /// Two intervals overlap iff each starts no later than the other ends.
    pub fn overlaps(&self, other: &Self) -> bool {
        self.start_date <= other.effective_end() && other.start_date <= self.effective_end()
    }
}

/// Validate a whole dataset up front. Any malformed record aborts the call;
/// detection never runs over a partially parsed dataset.
pub(crate) fn validate_dataset(
    records: &[EnrollmentRecord],
) -> Result<Vec<EnrollmentInterval>, DetectionError> {
    records.iter().map(EnrollmentRecord::validate).collect()
}

pub(crate) fn parse_date(
    student_id: &str,
    field: &'static str,
    raw: &str,
) -> Result<NaiveDate, DetectionError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| DetectionError::InvalidDate {
        student_id: student_id.to_string(),
        field,
        value: raw.to_string(),
    })
}

/// Validation failure raised by the detectors and the regional report.
#[derive(Debug, thiserror::Error)]
pub enum DetectionError {
    #[error("record for student {student_id} has unparseable {field} '{value}' (expected YYYY-MM-DD)")]
    InvalidDate {
        student_id: String,
        field: &'static str,
        value: String,
    },
}
