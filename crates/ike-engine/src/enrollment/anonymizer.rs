use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

/// Coarse, non-invertible age bucket for regional statistics. Buckets use
/// calendar-year difference only — intentionally not exact age, so the value
/// cannot be triangulated back to a birth date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AgeGroup {
    SixteenAndUnder,
    SeventeenToEighteen,
    NineteenToTwenty,
    TwentyOneAndOver,
}

impl AgeGroup {
    pub const fn ordered() -> [Self; 4] {
        [
            Self::SixteenAndUnder,
            Self::SeventeenToEighteen,
            Self::NineteenToTwenty,
            Self::TwentyOneAndOver,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::SixteenAndUnder => "≤16",
            Self::SeventeenToEighteen => "17-18",
            Self::NineteenToTwenty => "19-20",
            Self::TwentyOneAndOver => "21+",
        }
    }
}

/// Bucket a birth date relative to a reference date.
pub fn age_group(birth_date: NaiveDate, reference_date: NaiveDate) -> AgeGroup {
    let years = reference_date.year() - birth_date.year();
    match years {
        i32::MIN..=16 => AgeGroup::SixteenAndUnder,
        17 | 18 => AgeGroup::SeventeenToEighteen,
        19 | 20 => AgeGroup::NineteenToTwenty,
        _ => AgeGroup::TwentyOneAndOver,
    }
}

#[derive(Debug, Default)]
struct AnonymizerState {
    assigned: HashMap<String, String>,
    next_sequence: u64,
}

/// Assigns stable pseudonymous identifiers for regional reporting.
///
/// The first lookup for a real id mints `ANON-{sequence:06}`; every later
/// lookup returns the same value for the lifetime of the instance. Sequence
/// numbers follow first-seen order, so output depends on call order —
/// reporting paths share one instance to keep identifiers consistent across
/// reports.
#[derive(Debug, Default)]
pub struct IdentityAnonymizer {
    state: Mutex<AnonymizerState>,
}

impl IdentityAnonymizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn anonymized_id(&self, real_id: &str) -> String {
        let mut state = self.state.lock().expect("anonymizer mutex poisoned");
        if let Some(existing) = state.assigned.get(real_id) {
            return existing.clone();
        }

        state.next_sequence += 1;
        let minted = format!("ANON-{:06}", state.next_sequence);
        state.assigned.insert(real_id.to_string(), minted.clone());
        minted
    }

    /// Number of real ids seen so far.
    pub fn assigned_count(&self) -> usize {
        self.state
            .lock()
            .expect("anonymizer mutex poisoned")
            .assigned
            .len()
    }
}
