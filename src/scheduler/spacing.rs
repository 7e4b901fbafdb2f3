use chrono::{Duration, NaiveDate};

use crate::models::Checkpoints;

// Fixed spaced-repetition offsets, in days after the study date.
pub const PRACTICE_OFFSET: i64 = 2;
pub const FIRST_REVISION_OFFSET: i64 = 6;
pub const SECOND_REVISION_OFFSET: i64 = 20;

/// Derives the three checkpoint dates from a study date. Pure calendar
/// arithmetic; no time-of-day is involved anywhere in the engine.
pub fn derive_checkpoints(study_date: NaiveDate) -> Checkpoints {
    Checkpoints {
        practice: study_date + Duration::days(PRACTICE_OFFSET),
        first_revision: study_date + Duration::days(FIRST_REVISION_OFFSET),
        second_revision: study_date + Duration::days(SECOND_REVISION_OFFSET),
    }
}
