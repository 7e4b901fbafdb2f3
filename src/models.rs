use chrono::{NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

/// A study topic scoped to one owner and one plan.
///
/// Topics pre-exist before the scheduler touches them; the engine only
/// reads and rewrites the four date fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Topic {
    pub id: i64,
    pub owner_id: String,
    pub plan_id: String,
    pub title: String,
    pub subject: Option<String>,
    pub priority: Option<Priority>,
    pub estimated_hours: f64,
    pub study_date: Option<NaiveDate>,
    pub practice_date: Option<NaiveDate>,
    pub first_revision_date: Option<NaiveDate>,
    pub second_revision_date: Option<NaiveDate>,
    pub completed: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl Topic {
    /// Duration used for hour-capacity packing. Zero, negative, or
    /// non-finite estimates fall back to one hour.
    pub fn effective_hours(&self) -> f64 {
        if self.estimated_hours.is_finite() && self.estimated_hours > 0.0 {
            self.estimated_hours
        } else {
            1.0
        }
    }

    /// Sort rank for priority ordering; absent priority ranks last.
    pub fn priority_rank(&self) -> u8 {
        self.priority.map(|p| p.rank()).unwrap_or(4)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Priority {
    High,
    Moderate,
    Low,
}

impl Priority {
    pub fn rank(&self) -> u8 {
        match self {
            Priority::High => 1,
            Priority::Moderate => 2,
            Priority::Low => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::High => "high",
            Priority::Moderate => "moderate",
            Priority::Low => "low",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "high" | "h" => Some(Priority::High),
            "moderate" | "medium" | "m" => Some(Priority::Moderate),
            "low" | "l" => Some(Priority::Low),
            _ => None,
        }
    }
}

/// How the backlog is turned into a total order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Priority,
    Alphabetical,
    AiCustom,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Priority => "priority",
            Strategy::Alphabetical => "alphabetical",
            Strategy::AiCustom => "custom",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "priority" | "p" => Some(Strategy::Priority),
            "alphabetical" | "alpha" | "a" => Some(Strategy::Alphabetical),
            "custom" | "ai" | "c" => Some(Strategy::AiCustom),
            _ => None,
        }
    }
}

/// Daily budget for the day assigner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Capacity {
    MaxTopics(u32),
    MaxHours(f64),
}

/// The three checkpoint dates derived from a study date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoints {
    pub practice: NaiveDate,
    pub first_revision: NaiveDate,
    pub second_revision: NaiveDate,
}

/// One topic's full set of new dates, ready for a batched write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateUpdate {
    pub topic_id: i64,
    pub study_date: NaiveDate,
    pub practice_date: NaiveDate,
    pub first_revision_date: NaiveDate,
    pub second_revision_date: NaiveDate,
}

impl DateUpdate {
    pub fn new(topic_id: i64, study_date: NaiveDate, checkpoints: Checkpoints) -> Self {
        Self {
            topic_id,
            study_date,
            practice_date: checkpoints.practice,
            first_revision_date: checkpoints.first_revision,
            second_revision_date: checkpoints.second_revision,
        }
    }
}

/// Maps the external weekday numbering (0=Sunday .. 6=Saturday) onto chrono.
pub fn weekday_from_number(n: u8) -> Option<Weekday> {
    match n {
        0 => Some(Weekday::Sun),
        1 => Some(Weekday::Mon),
        2 => Some(Weekday::Tue),
        3 => Some(Weekday::Wed),
        4 => Some(Weekday::Thu),
        5 => Some(Weekday::Fri),
        6 => Some(Weekday::Sat),
        _ => None,
    }
}

// JSON output wrapper for CLI
#[derive(Debug, Serialize)]
pub struct JsonOutput<T: Serialize> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T: Serialize> JsonOutput<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(msg.into()),
        }
    }
}

#[cfg(test)]
pub(crate) fn test_topic(id: i64, title: &str) -> Topic {
    Topic {
        id,
        owner_id: "owner-1".to_string(),
        plan_id: "plan-1".to_string(),
        title: title.to_string(),
        subject: None,
        priority: None,
        estimated_hours: 1.0,
        study_date: None,
        practice_date: None,
        first_revision_date: None,
        second_revision_date: None,
        completed: false,
        created_at: String::new(),
        updated_at: String::new(),
    }
}
