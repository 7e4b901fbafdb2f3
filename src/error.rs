use thiserror::Error;

/// Errors surfaced by the scheduling engine.
///
/// Partial persistence is deliberately not represented here: a batch that
/// fails to commit is reported inside `CommitReport` so callers still get
/// the count of topics that did land.
#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("invalid input: {0}")]
    Input(String),

    /// Every weekday is an off-day; the assigner would never find a slot.
    #[error("all seven weekdays are off-days; nothing can be scheduled")]
    AllDaysOff,

    /// The AI collaborator could not be reached or errored outright.
    #[error("advisor unavailable: {0}")]
    AdvisorUnavailable(String),

    /// The AI collaborator answered, but the reply was out of contract.
    #[error("advisor returned an unusable response: {0}")]
    AdvisorResponse(String),

    #[error("database error: {0}")]
    Db(#[from] rusqlite::Error),
}

impl ScheduleError {
    pub fn input(msg: impl Into<String>) -> Self {
        ScheduleError::Input(msg.into())
    }
}
