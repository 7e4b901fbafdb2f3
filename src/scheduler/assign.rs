use std::collections::HashSet;

use chrono::{Datelike, Duration, NaiveDate, Weekday};

use crate::error::ScheduleError;
use crate::models::{Capacity, Topic};

/// A topic placed on a concrete calendar day.
#[derive(Debug, Clone)]
pub struct Assignment {
    pub topic: Topic,
    pub date: NaiveDate,
}

/// Walks the ordered backlog and packs topics onto calendar days.
///
/// The cursor only moves forward; counters reset whenever it does. An
/// empty day always accepts its first topic in hours mode, even when that
/// topic alone exceeds the daily budget, so the loop cannot stall on an
/// oversized topic.
pub fn assign(
    ordered: Vec<Topic>,
    start: NaiveDate,
    capacity: &Capacity,
    off_days: &HashSet<Weekday>,
) -> Result<Vec<Assignment>, ScheduleError> {
    if off_days.len() >= 7 {
        return Err(ScheduleError::AllDaysOff);
    }

    let mut cursor = start;
    let mut topics_today: u32 = 0;
    let mut hours_today: f64 = 0.0;
    let mut assignments = Vec::with_capacity(ordered.len());

    for topic in ordered {
        let hours = topic.effective_hours();
        loop {
            while off_days.contains(&cursor.weekday()) {
                cursor += Duration::days(1);
                topics_today = 0;
                hours_today = 0.0;
            }

            let fits = match capacity {
                Capacity::MaxTopics(max) => topics_today < *max,
                Capacity::MaxHours(max) => {
                    hours_today == 0.0 || hours_today + hours <= *max
                }
            };
            if fits {
                break;
            }
            cursor += Duration::days(1);
            topics_today = 0;
            hours_today = 0.0;
        }

        assignments.push(Assignment {
            date: cursor,
            topic,
        });
        topics_today += 1;
        hours_today += hours;
    }

    Ok(assignments)
}
