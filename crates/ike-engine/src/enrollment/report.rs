use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::anonymizer::{age_group, AgeGroup, IdentityAnonymizer};
use super::domain::{parse_date, DetectionError};

/// Input row for regional statistics. Separate from [`super::EnrollmentRecord`]
/// because only the reporting path is allowed to see birth dates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionalRecord {
    pub student_id: String,
    /// Birth date, `YYYY-MM-DD`.
    pub birth_date: String,
    pub school_unit: String,
    pub study_path: String,
    pub school_year: u8,
}

/// De-identified row: pseudonymous id plus coarse attribute buckets, never
/// the real identifier.
#[derive(Debug, Clone, Serialize)]
pub struct RegionalRow {
    pub anonymized_id: String,
    pub age_group: &'static str,
    pub school_unit: String,
    pub study_path: String,
    pub school_year: u8,
}

#[derive(Debug, Clone, Serialize)]
pub struct AgeGroupCount {
    pub age_group: &'static str,
    pub students: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct SchoolUnitCount {
    pub school_unit: String,
    pub students: usize,
}

/// Regional enrollment summary safe to share outside the municipality.
#[derive(Debug, Clone, Serialize)]
pub struct RegionalSummary {
    pub reference_date: NaiveDate,
    pub rows: Vec<RegionalRow>,
    pub age_distribution: Vec<AgeGroupCount>,
    pub school_units: Vec<SchoolUnitCount>,
}

/// Build the de-identified regional summary for a dataset.
///
/// The anonymizer is shared by the caller so identifiers stay stable across
/// successive reports. Malformed birth dates abort the whole call, matching
/// the detectors' validation contract.
pub fn regional_summary(
    records: &[RegionalRecord],
    anonymizer: &IdentityAnonymizer,
    reference_date: NaiveDate,
) -> Result<RegionalSummary, DetectionError> {
    let mut rows = Vec::with_capacity(records.len());
    let mut per_age_group: HashMap<AgeGroup, usize> = HashMap::new();
    let mut per_school_unit: BTreeMap<String, usize> = BTreeMap::new();

    for record in records {
        let birth_date = parse_date(&record.student_id, "birth_date", &record.birth_date)?;
        let bucket = age_group(birth_date, reference_date);

        rows.push(RegionalRow {
            anonymized_id: anonymizer.anonymized_id(&record.student_id),
            age_group: bucket.label(),
            school_unit: record.school_unit.clone(),
            study_path: record.study_path.clone(),
            school_year: record.school_year,
        });

        *per_age_group.entry(bucket).or_default() += 1;
        *per_school_unit
            .entry(record.school_unit.clone())
            .or_default() += 1;
    }

    let age_distribution = AgeGroup::ordered()
        .into_iter()
        .filter_map(|bucket| {
            per_age_group.get(&bucket).map(|students| AgeGroupCount {
                age_group: bucket.label(),
                students: *students,
            })
        })
        .collect();

    let school_units = per_school_unit
        .into_iter()
        .map(|(school_unit, students)| SchoolUnitCount {
            school_unit,
            students,
        })
        .collect();

    Ok(RegionalSummary {
        reference_date,
        rows,
        age_distribution,
        school_units,
    })
}
