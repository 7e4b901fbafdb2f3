use std::collections::HashSet;

use chrono::NaiveDate;
use log::warn;
use serde_json::{json, Value};

use crate::advisor::{extract_json_array, Advisor};
use crate::error::ScheduleError;
use crate::models::Topic;

/// One validated reassignment proposed by the advisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateChange {
    pub topic_id: i64,
    pub new_study_date: NaiveDate,
}

/// Asks the advisor to reinterpret the future plan under a free-text
/// directive and returns the validated delta.
///
/// Unlike ordering there is no deterministic fallback: the directive's
/// intent cannot be guessed, so advisor failure or an out-of-contract
/// reply is surfaced to the caller. Individual bad entries (unknown id,
/// missing field, bad date) are dropped, never repaired — malformed model
/// output must not introduce or orphan an id.
pub fn interpret(
    future_topics: &[Topic],
    directive: &str,
    advisor: &dyn Advisor,
) -> Result<Vec<DateChange>, ScheduleError> {
    let projection: Vec<Value> = future_topics
        .iter()
        .map(|t| {
            json!({
                "id": t.id,
                "title": t.title,
                "subject": t.subject,
                "currentStudyDate": t.study_date,
                "priority": t.priority.map(|p| p.as_str()),
            })
        })
        .collect();

    let prompt = format!(
        "You are adjusting an existing study plan. Currently scheduled topics:\n{}\n\n\
         User directive: {}\n\n\
         Move topics as the directive asks. Respond with ONLY a JSON array \
         of objects of the form {{\"id\": <topic id>, \"studyDate\": \
         \"YYYY-MM-DD\"}}. Keep ids exactly as given, include only topics \
         whose date should change, and output nothing but the array.",
        serde_json::to_string_pretty(&projection).unwrap_or_default(),
        directive
    );

    let raw = advisor.complete(&prompt)?;
    let snippet = extract_json_array(&raw)
        .ok_or_else(|| ScheduleError::AdvisorResponse("no JSON array in reply".into()))?;
    let value: Value = serde_json::from_str(&snippet)
        .map_err(|e| ScheduleError::AdvisorResponse(format!("unparseable JSON: {}", e)))?;
    let entries = value
        .as_array()
        .ok_or_else(|| ScheduleError::AdvisorResponse("reply is not an array".into()))?;

    let known: HashSet<i64> = future_topics.iter().map(|t| t.id).collect();
    let mut seen: HashSet<i64> = HashSet::new();
    let mut changes = Vec::new();

    for entry in entries {
        let Some(id) = entry.get("id").and_then(Value::as_i64) else {
            warn!("reschedule entry without a usable id: {}", entry);
            continue;
        };
        if !known.contains(&id) {
            warn!("reschedule entry for unknown topic id {}", id);
            continue;
        }
        if !seen.insert(id) {
            warn!("duplicate reschedule entry for topic id {}", id);
            continue;
        }
        let Some(date_str) = entry.get("studyDate").and_then(Value::as_str) else {
            warn!("reschedule entry for topic {} has no studyDate", id);
            continue;
        };
        match NaiveDate::parse_from_str(date_str, "%Y-%m-%d") {
            Ok(new_study_date) => changes.push(DateChange {
                topic_id: id,
                new_study_date,
            }),
            Err(_) => warn!(
                "reschedule entry for topic {} has invalid date '{}'",
                id, date_str
            ),
        }
    }

    Ok(changes)
}
