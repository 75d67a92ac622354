use std::collections::HashMap;

use serde::Serialize;

use super::domain::{validate_dataset, DetectionError, EnrollmentInterval, EnrollmentRecord};

/// One student simultaneously placed at two or more school units with
/// overlapping date ranges. `members` keeps the dataset's input order.
#[derive(Debug, Clone, Serialize)]
pub struct DualPlacementConflict {
    pub student_id: String,
    pub student_name: String,
    pub members: Vec<EnrollmentInterval>,
}

/// Find every dual placement in the dataset.
///
/// Overlapping pairs for the same student are unioned into a single conflict
/// set: with placements A, B, C where A overlaps B and B overlaps C, all
/// three land in one conflict even if A and C never directly overlap. One
/// conflict per student keeps downstream notifications from fragmenting.
///
/// Pure function; the pairwise test is O(n²) per student, which is fine for
/// the handful of concurrent placements a student can realistically hold.
pub fn detect_dual_placements(
    records: &[EnrollmentRecord],
) -> Result<Vec<DualPlacementConflict>, DetectionError> {
    let intervals = validate_dataset(records)?;

    let mut student_order: Vec<String> = Vec::new();
    let mut by_student: HashMap<String, Vec<EnrollmentInterval>> = HashMap::new();
    for interval in intervals {
        let group = by_student.entry(interval.student_id.clone()).or_default();
        if group.is_empty() {
            student_order.push(interval.student_id.clone());
        }
        group.push(interval);
    }

    let mut conflicts = Vec::new();
    for student_id in student_order {
        let group = &by_student[&student_id];
        if group.len() < 2 {
            continue;
        }

        let mut in_conflict = vec![false; group.len()];
        for i in 0..group.len() {
            for j in (i + 1)..group.len() {
                if group[i].overlaps(&group[j]) {
                    in_conflict[i] = true;
                    in_conflict[j] = true;
                }
            }
        }

        let members: Vec<EnrollmentInterval> = group
            .iter()
            .zip(&in_conflict)
            .filter(|(_, flagged)| **flagged)
            .map(|(interval, _)| interval.clone())
            .collect();

        if members.len() >= 2 {
            conflicts.push(DualPlacementConflict {
                student_id,
                student_name: members[0].student_name.clone(),
                members,
            });
        }
    }

    Ok(conflicts)
}
