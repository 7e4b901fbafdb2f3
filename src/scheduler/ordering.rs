use std::collections::{HashMap, HashSet};

use log::warn;
use serde_json::{json, Value};

use crate::advisor::{extract_json_array, Advisor};
use crate::error::ScheduleError;
use crate::models::{Strategy, Topic};

/// Turns the unordered backlog into a total order.
///
/// Always returns a permutation of the input. The AI-custom strategy never
/// surfaces an error: any advisor failure or out-of-contract reply falls
/// back to the deterministic two-level sort.
pub fn order(
    mut topics: Vec<Topic>,
    strategy: Strategy,
    directive: Option<&str>,
    advisor: &dyn Advisor,
) -> Vec<Topic> {
    match strategy {
        Strategy::Priority => {
            topics.sort_by_key(|t| t.priority_rank());
            topics
        }
        Strategy::Alphabetical => {
            topics.sort_by(|a, b| a.title.cmp(&b.title));
            topics
        }
        Strategy::AiCustom => {
            let directive = directive.unwrap_or_default();
            match ai_order(&topics, directive, advisor) {
                Ok(ordered) => ordered,
                Err(e) => {
                    warn!("ai ordering failed, using deterministic fallback: {}", e);
                    fallback_order(topics)
                }
            }
        }
    }
}

/// Two-level deterministic fallback: priority rank, then subject name.
fn fallback_order(mut topics: Vec<Topic>) -> Vec<Topic> {
    topics.sort_by(|a, b| {
        a.priority_rank()
            .cmp(&b.priority_rank())
            .then_with(|| a.subject.cmp(&b.subject))
    });
    topics
}

fn ai_order(
    topics: &[Topic],
    directive: &str,
    advisor: &dyn Advisor,
) -> Result<Vec<Topic>, ScheduleError> {
    let projection: Vec<Value> = topics
        .iter()
        .map(|t| {
            json!({
                "id": t.id,
                "title": t.title,
                "subject": t.subject,
                "priority": t.priority.map(|p| p.as_str()),
            })
        })
        .collect();

    let prompt = format!(
        "You are ordering a study backlog. Topics:\n{}\n\n\
         User directive: {}\n\n\
         Order the topics so that higher priority comes first; within a \
         priority tier, keep topics sharing a subject next to each other \
         when the directive implies grouping. Respond with ONLY a JSON \
         array of topic ids in the desired order, nothing else.",
        serde_json::to_string_pretty(&projection).unwrap_or_default(),
        directive
    );

    let raw = advisor.complete(&prompt)?;
    let snippet = extract_json_array(&raw)
        .ok_or_else(|| ScheduleError::AdvisorResponse("no JSON array in reply".into()))?;
    let value: Value = serde_json::from_str(&snippet)
        .map_err(|e| ScheduleError::AdvisorResponse(format!("unparseable JSON: {}", e)))?;
    let ids = value
        .as_array()
        .ok_or_else(|| ScheduleError::AdvisorResponse("reply is not an array".into()))?;

    let mut by_id: HashMap<i64, &Topic> = topics.iter().map(|t| (t.id, t)).collect();
    let mut taken: HashSet<i64> = HashSet::new();
    let mut ordered: Vec<Topic> = Vec::with_capacity(topics.len());

    for id_value in ids {
        let Some(id) = id_value.as_i64() else {
            warn!("advisor order entry is not an id: {}", id_value);
            continue;
        };
        if !taken.insert(id) {
            continue;
        }
        match by_id.remove(&id) {
            Some(topic) => ordered.push(topic.clone()),
            None => warn!("advisor order references unknown topic id {}", id),
        }
    }

    // Anything the model forgot keeps its original relative position at the end.
    for topic in topics {
        if by_id.contains_key(&topic.id) {
            ordered.push(topic.clone());
        }
    }

    Ok(ordered)
}
