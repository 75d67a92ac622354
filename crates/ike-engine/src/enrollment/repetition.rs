use std::collections::HashMap;

use serde::Serialize;

use super::domain::{validate_dataset, DetectionError, EnrollmentInterval, EnrollmentRecord};

/// A student re-enrolling in the same study path and school year directly
/// after a prior enrollment in that same path/year. Advisory only; carries
/// no payment block.
#[derive(Debug, Clone, Serialize)]
pub struct GradeRepetition {
    pub student_id: String,
    pub student_name: String,
    pub previous: EnrollmentInterval,
    pub current: EnrollmentInterval,
}

/// Find grade repetitions in a student's enrollment history.
///
/// Each student's history is stable-sorted by start date (ties keep input
/// order) and walked pairwise; only strictly consecutive repeats count. A
/// history of Year 2 / Year 3 / Year 2 is NOT a repetition — the student
/// did not re-enroll "right after" the earlier Year 2.
pub fn detect_grade_repetitions(
    records: &[EnrollmentRecord],
) -> Result<Vec<GradeRepetition>, DetectionError> {
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

    let mut repetitions = Vec::new();
    for student_id in student_order {
        let Some(group) = by_student.get_mut(&student_id) else {
            continue;
        };
        group.sort_by_key(|interval| interval.start_date);

        for pair in group.windows(2) {
            let (previous, current) = (&pair[0], &pair[1]);
            if previous.study_path == current.study_path
                && previous.school_year == current.school_year
            {
                repetitions.push(GradeRepetition {
                    student_id: student_id.clone(),
                    student_name: current.student_name.clone(),
                    previous: previous.clone(),
                    current: current.clone(),
                });
            }
        }
    }

    Ok(repetitions)
}
