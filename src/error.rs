//! Error taxonomy for roster generation.
//!
//! Distinguishes fatal input errors (no roster can be produced) from
//! boundary rejections (malformed request). Soft problems never surface
//! here — they flow through the validator as [`Conflict`]s.
//!
//! [`Conflict`]: crate::models::Conflict

use chrono::NaiveDate;
use thiserror::Error;

/// Fatal errors that abort a run before a roster exists.
#[derive(Debug, Error)]
pub enum RosterError {
    /// An employee's availability does not cover a day of the horizon.
    #[error("employee '{employee_id}' has no availability entry for {day}")]
    MissingAvailability {
        employee_id: String,
        day: NaiveDate,
    },

    /// A shift code references a station no employee is qualified for.
    #[error("shift code '{code}' references unknown station '{station}'")]
    UnknownStation { code: String, station: String },

    /// Two employees share the same ID.
    #[error("duplicate employee ID: {0}")]
    DuplicateEmployeeId(String),

    /// A pinned assignment falls outside the horizon or uses an unknown code.
    #[error("pinned shift for '{employee_id}' on {day} is outside the horizon or invalid: {detail}")]
    InvalidPin {
        employee_id: String,
        day: NaiveDate,
        detail: String,
    },

    /// The horizon is empty or does not match the dataset.
    #[error("horizon misaligned with dataset: {0}")]
    HorizonMismatch(String),
}

/// Rejections raised at the request boundary, before the pipeline starts.
#[derive(Debug, Error)]
pub enum RequestError {
    /// Planning horizon must be 1, 2, or 4 weeks.
    #[error("weeks must be 1, 2, or 4 (got {0})")]
    InvalidWeeks(u8),

    /// Solver budget exceeds the hard cap.
    #[error("time limit {0}s exceeds the {1}s hard cap")]
    TimeLimitTooLarge(u64, u64),

    /// Solver budget must be positive.
    #[error("time limit must be positive")]
    ZeroTimeLimit,
}

/// Everything that can abort a generate call before a response exists.
#[derive(Debug, Error)]
pub enum GenerateError {
    /// The request itself was malformed.
    #[error(transparent)]
    Request(#[from] RequestError),
    /// The datasets cannot support a run.
    #[error(transparent)]
    Input(#[from] RosterError),
}
