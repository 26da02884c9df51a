use thiserror::Error;

/// Failures of one scheduling request. None of them is retried.
#[derive(Debug, Error)]
pub enum SchedulingError {
    /// The model is infeasible or the time budget ran out before any feasible
    /// schedule was found; callers cannot tell which.
    #[error("no timetable satisfying every rule was found within the time limit")]
    NoSchedule,
    #[error("inconsistent model: {0}")]
    Construction(String),
    #[error("solver failure: {0}")]
    Engine(String),
}

/// Request problems caught before a model is built.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InputError {
    #[error("no students given")]
    MissingStudents,
    #[error("schedule_info.dates is missing or empty")]
    MissingDates,
    #[error("schedule_info.slots_per_day is missing or empty")]
    MissingSlots,
    #[error("timeout must be at least one second")]
    InvalidTimeout,
    #[error("date {0:?} is listed more than once")]
    DuplicateDate(String),
    #[error("slot {0:?} is listed more than once")]
    DuplicateSlot(String),
    #[error("malformed request: {0}")]
    Malformed(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}
