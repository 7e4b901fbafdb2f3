pub mod assign;
pub mod commit;
pub mod ordering;
pub mod reschedule;
pub mod spacing;

use std::collections::HashSet;

use chrono::{NaiveDate, Weekday};
use log::info;
use serde::Serialize;

use crate::advisor::Advisor;
use crate::db::Database;
use crate::error::ScheduleError;
use crate::models::{Capacity, DateUpdate, Strategy};
use commit::CommitReport;
use spacing::derive_checkpoints;

/// Input for one schedule generation run.
#[derive(Debug, Clone)]
pub struct ScheduleRequest {
    pub owner_id: String,
    pub plan_id: String,
    pub start_date: NaiveDate,
    pub strategy: Strategy,
    pub directive: Option<String>,
    pub capacity: Capacity,
    pub off_days: HashSet<Weekday>,
}

/// Input for one reschedule run. `today` is explicit so callers (and
/// tests) control what counts as the future.
#[derive(Debug, Clone)]
pub struct RescheduleRequest {
    pub owner_id: String,
    pub plan_id: String,
    pub directive: String,
    pub today: NaiveDate,
}

#[derive(Debug, Serialize)]
pub struct ScheduleOutcome {
    pub scheduled_count: usize,
    pub batch_errors: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct RescheduleOutcome {
    pub rescheduled_count: usize,
    pub batch_errors: Vec<String>,
}

fn batch_error_messages(report: &CommitReport) -> Vec<String> {
    report
        .errors
        .iter()
        .map(|e| format!("batch {}: {}", e.batch_index, e.cause))
        .collect()
}

fn validate_scope(owner_id: &str, plan_id: &str) -> Result<(), ScheduleError> {
    if owner_id.trim().is_empty() {
        return Err(ScheduleError::input("owner id is required"));
    }
    if plan_id.trim().is_empty() {
        return Err(ScheduleError::input("plan id is required"));
    }
    Ok(())
}

/// Generates a full plan: order the backlog, pack it onto days, derive
/// checkpoints, and persist in batches. Partial persistence is reported,
/// not raised.
pub fn generate_schedule(
    db: &Database,
    advisor: &dyn Advisor,
    request: &ScheduleRequest,
) -> Result<ScheduleOutcome, ScheduleError> {
    validate_scope(&request.owner_id, &request.plan_id)?;
    match request.capacity {
        Capacity::MaxTopics(n) if n == 0 => {
            return Err(ScheduleError::input("topics per day must be positive"));
        }
        Capacity::MaxHours(h) if !(h.is_finite() && h > 0.0) => {
            return Err(ScheduleError::input("daily hours must be positive"));
        }
        _ => {}
    }
    if request.strategy == Strategy::AiCustom
        && request.directive.as_deref().map_or(true, |d| d.trim().is_empty())
    {
        return Err(ScheduleError::input(
            "the custom strategy needs a directive",
        ));
    }
    if request.off_days.len() >= 7 {
        return Err(ScheduleError::AllDaysOff);
    }

    let backlog = db.incomplete_topics(&request.owner_id, &request.plan_id)?;
    if backlog.is_empty() {
        return Ok(ScheduleOutcome {
            scheduled_count: 0,
            batch_errors: Vec::new(),
        });
    }

    let ordered = ordering::order(
        backlog,
        request.strategy,
        request.directive.as_deref(),
        advisor,
    );
    let assignments = assign::assign(
        ordered,
        request.start_date,
        &request.capacity,
        &request.off_days,
    )?;

    let updates: Vec<DateUpdate> = assignments
        .iter()
        .map(|a| DateUpdate::new(a.topic.id, a.date, derive_checkpoints(a.date)))
        .collect();

    let report = commit::commit(db, &updates);
    info!(
        "scheduled {} of {} topics for plan {}",
        report.committed,
        updates.len(),
        request.plan_id
    );
    Ok(ScheduleOutcome {
        scheduled_count: report.committed,
        batch_errors: batch_error_messages(&report),
    })
}

/// Mutates the future plan under a free-text directive. Only topics the
/// validated delta names are touched; checkpoints are re-derived for each
/// of them.
pub fn reschedule_plan(
    db: &Database,
    advisor: &dyn Advisor,
    request: &RescheduleRequest,
) -> Result<RescheduleOutcome, ScheduleError> {
    validate_scope(&request.owner_id, &request.plan_id)?;
    if request.directive.trim().is_empty() {
        return Err(ScheduleError::input("a reschedule directive is required"));
    }

    let future = db.future_topics(&request.owner_id, &request.plan_id, request.today)?;
    if future.is_empty() {
        return Ok(RescheduleOutcome {
            rescheduled_count: 0,
            batch_errors: Vec::new(),
        });
    }

    let changes = reschedule::interpret(&future, &request.directive, advisor)?;
    if changes.is_empty() {
        return Err(ScheduleError::AdvisorResponse(
            "no valid reassignment survived validation".into(),
        ));
    }

    let updates: Vec<DateUpdate> = changes
        .iter()
        .map(|c| {
            DateUpdate::new(
                c.topic_id,
                c.new_study_date,
                derive_checkpoints(c.new_study_date),
            )
        })
        .collect();

    let report = commit::commit(db, &updates);
    info!(
        "rescheduled {} of {} topics for plan {}",
        report.committed,
        updates.len(),
        request.plan_id
    );
    Ok(RescheduleOutcome {
        rescheduled_count: report.committed,
        batch_errors: batch_error_messages(&report),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::advisor::testing::ScriptedAdvisor;
    use crate::models::Priority;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn setup_db() -> Database {
        let db = Database::open(":memory:").unwrap();
        db.init().unwrap();
        db
    }

    fn seed(db: &Database, count: usize) -> Vec<i64> {
        (0..count)
            .map(|i| {
                db.add_topic("o", "p", &format!("Topic {}", i + 1), None, None, 1.0)
                    .unwrap()
            })
            .collect()
    }

    fn basic_request(start: NaiveDate) -> ScheduleRequest {
        ScheduleRequest {
            owner_id: "o".to_string(),
            plan_id: "p".to_string(),
            start_date: start,
            strategy: Strategy::Priority,
            directive: None,
            capacity: Capacity::MaxTopics(3),
            off_days: HashSet::new(),
        }
    }

    mod generate {
        use super::*;

        #[test]
        fn seven_topics_three_per_day_end_to_end() {
            let db = setup_db();
            let ids = seed(&db, 7);
            let advisor = ScriptedAdvisor::replies("unused");

            let outcome =
                generate_schedule(&db, &advisor, &basic_request(date(2024, 1, 1))).unwrap();
            assert_eq!(outcome.scheduled_count, 7);
            assert!(outcome.batch_errors.is_empty());

            let topics = db.list_topics("o", "p").unwrap();
            let by_id = |id: i64| topics.iter().find(|t| t.id == id).unwrap();

            assert_eq!(by_id(ids[0]).study_date, Some(date(2024, 1, 1)));
            assert_eq!(by_id(ids[3]).study_date, Some(date(2024, 1, 2)));
            assert_eq!(by_id(ids[6]).study_date, Some(date(2024, 1, 3)));

            // Checkpoints for the first topic: +2, +6, +20 days.
            let first = by_id(ids[0]);
            assert_eq!(first.practice_date, Some(date(2024, 1, 3)));
            assert_eq!(first.first_revision_date, Some(date(2024, 1, 7)));
            assert_eq!(first.second_revision_date, Some(date(2024, 1, 21)));
        }

        #[test]
        fn off_day_sunday_is_skipped_end_to_end() {
            let db = setup_db();
            let ids = seed(&db, 7);
            let advisor = ScriptedAdvisor::replies("unused");

            let mut request = basic_request(date(2024, 1, 6));
            request.off_days = HashSet::from([Weekday::Sun]);
            let outcome = generate_schedule(&db, &advisor, &request).unwrap();
            assert_eq!(outcome.scheduled_count, 7);

            let topics = db.list_topics("o", "p").unwrap();
            let by_id = |id: i64| topics.iter().find(|t| t.id == id).unwrap();
            assert_eq!(by_id(ids[0]).study_date, Some(date(2024, 1, 6)));
            assert_eq!(by_id(ids[3]).study_date, Some(date(2024, 1, 8)));
            assert_eq!(by_id(ids[6]).study_date, Some(date(2024, 1, 9)));
        }

        #[test]
        fn completed_topics_are_not_rescheduled() {
            let db = setup_db();
            let ids = seed(&db, 3);
            db.set_completed(ids[1], true).unwrap();
            let advisor = ScriptedAdvisor::replies("unused");

            let outcome =
                generate_schedule(&db, &advisor, &basic_request(date(2024, 1, 1))).unwrap();
            assert_eq!(outcome.scheduled_count, 2);

            let topics = db.list_topics("o", "p").unwrap();
            let done = topics.iter().find(|t| t.id == ids[1]).unwrap();
            assert!(done.study_date.is_none());
        }

        #[test]
        fn empty_backlog_schedules_nothing() {
            let db = setup_db();
            let advisor = ScriptedAdvisor::replies("unused");
            let outcome =
                generate_schedule(&db, &advisor, &basic_request(date(2024, 1, 1))).unwrap();
            assert_eq!(outcome.scheduled_count, 0);
        }

        #[test]
        fn custom_strategy_with_broken_advisor_still_schedules() {
            let db = setup_db();
            db.add_topic("o", "p", "B", Some("Maths"), Some(Priority::Low), 1.0)
                .unwrap();
            db.add_topic("o", "p", "A", Some("Physics"), Some(Priority::High), 1.0)
                .unwrap();
            let advisor = ScriptedAdvisor::fails("down for maintenance");

            let mut request = basic_request(date(2024, 1, 1));
            request.strategy = Strategy::AiCustom;
            request.directive = Some("physics first".to_string());
            let outcome = generate_schedule(&db, &advisor, &request).unwrap();
            assert_eq!(outcome.scheduled_count, 2);
        }

        #[test]
        fn validation_rejects_bad_input() {
            let db = setup_db();
            seed(&db, 1);
            let advisor = ScriptedAdvisor::replies("unused");

            let mut blank_plan = basic_request(date(2024, 1, 1));
            blank_plan.plan_id = "  ".to_string();
            assert!(matches!(
                generate_schedule(&db, &advisor, &blank_plan),
                Err(ScheduleError::Input(_))
            ));

            let mut zero_capacity = basic_request(date(2024, 1, 1));
            zero_capacity.capacity = Capacity::MaxTopics(0);
            assert!(matches!(
                generate_schedule(&db, &advisor, &zero_capacity),
                Err(ScheduleError::Input(_))
            ));

            let mut bad_hours = basic_request(date(2024, 1, 1));
            bad_hours.capacity = Capacity::MaxHours(0.0);
            assert!(matches!(
                generate_schedule(&db, &advisor, &bad_hours),
                Err(ScheduleError::Input(_))
            ));

            let mut no_directive = basic_request(date(2024, 1, 1));
            no_directive.strategy = Strategy::AiCustom;
            assert!(matches!(
                generate_schedule(&db, &advisor, &no_directive),
                Err(ScheduleError::Input(_))
            ));
        }

        #[test]
        fn all_off_days_rejected_before_anything_runs() {
            let db = setup_db();
            seed(&db, 1);
            let advisor = ScriptedAdvisor::replies("unused");
            let mut request = basic_request(date(2024, 1, 1));
            request.off_days = (0..7u8)
                .map(|n| crate::models::weekday_from_number(n).unwrap())
                .collect();
            assert!(matches!(
                generate_schedule(&db, &advisor, &request),
                Err(ScheduleError::AllDaysOff)
            ));
        }
    }

    mod reschedule_tests {
        use super::*;

        fn scheduled_db() -> (Database, Vec<i64>) {
            let db = setup_db();
            let ids = seed(&db, 3);
            let advisor = ScriptedAdvisor::replies("unused");
            generate_schedule(&db, &advisor, &basic_request(date(2024, 6, 10))).unwrap();
            (db, ids)
        }

        fn request(directive: &str) -> RescheduleRequest {
            RescheduleRequest {
                owner_id: "o".to_string(),
                plan_id: "p".to_string(),
                directive: directive.to_string(),
                today: date(2024, 6, 1),
            }
        }

        #[test]
        fn validated_delta_is_applied_with_fresh_checkpoints() {
            let (db, ids) = scheduled_db();
            let reply = format!(
                r#"[{{"id": {}, "studyDate": "2024-06-20"}}, {{"id": 42, "studyDate": "2024-06-21"}}]"#,
                ids[0]
            );
            let advisor = ScriptedAdvisor::replies(&reply);

            let outcome = reschedule_plan(&db, &advisor, &request("push a week")).unwrap();
            assert_eq!(outcome.rescheduled_count, 1);

            let topics = db.list_topics("o", "p").unwrap();
            let moved = topics.iter().find(|t| t.id == ids[0]).unwrap();
            assert_eq!(moved.study_date, Some(date(2024, 6, 20)));
            assert_eq!(moved.practice_date, Some(date(2024, 6, 22)));
            assert_eq!(moved.first_revision_date, Some(date(2024, 6, 26)));
            assert_eq!(moved.second_revision_date, Some(date(2024, 7, 10)));

            // Topics the delta never mentioned keep their original dates.
            let untouched = topics.iter().find(|t| t.id == ids[1]).unwrap();
            assert_eq!(untouched.study_date, Some(date(2024, 6, 10)));
        }

        #[test]
        fn advisor_failure_is_a_hard_error() {
            let (db, _ids) = scheduled_db();
            let advisor = ScriptedAdvisor::fails("timeout");
            assert!(matches!(
                reschedule_plan(&db, &advisor, &request("shift")),
                Err(ScheduleError::AdvisorUnavailable(_))
            ));
        }

        #[test]
        fn delta_that_validates_to_empty_is_an_error() {
            let (db, _ids) = scheduled_db();
            let advisor = ScriptedAdvisor::replies(r#"[{"id": 999, "studyDate": "2024-06-20"}]"#);
            assert!(matches!(
                reschedule_plan(&db, &advisor, &request("shift")),
                Err(ScheduleError::AdvisorResponse(_))
            ));
        }

        #[test]
        fn no_future_topics_is_a_quiet_no_op() {
            let db = setup_db();
            seed(&db, 2); // unscheduled, so nothing lies in the future
            let advisor = ScriptedAdvisor::replies("unused");
            let outcome = reschedule_plan(&db, &advisor, &request("shift")).unwrap();
            assert_eq!(outcome.rescheduled_count, 0);
        }

        #[test]
        fn blank_directive_is_rejected() {
            let (db, _ids) = scheduled_db();
            let advisor = ScriptedAdvisor::replies("unused");
            assert!(matches!(
                reschedule_plan(&db, &advisor, &request("   ")),
                Err(ScheduleError::Input(_))
            ));
        }
    }
}
