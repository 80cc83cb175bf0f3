//! Request/response boundary types.
//!
//! The thin HTTP layer, file parsers, and UI live outside this crate;
//! they exchange exactly these shapes with the core. A malformed request
//! is rejected here before the pipeline starts.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::agents::WorkflowStep;
use crate::error::RequestError;
use crate::models::{Conflict, EmployeeSchedule};
use crate::scheduler::PeakCoverageMetrics;

/// Allowed planning horizons, in weeks.
pub const ALLOWED_WEEKS: [u8; 3] = [1, 2, 4];

/// A roster generation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateRequest {
    /// First day of the horizon.
    pub start_date: NaiveDate,
    /// Horizon length; one of 1, 2, or 4.
    pub weeks: u8,
    /// Solver wall-clock budget in seconds.
    pub time_limit_seconds: u64,
}

impl GenerateRequest {
    /// Creates a request with the default 120-second solve budget.
    pub fn new(start_date: NaiveDate, weeks: u8) -> Self {
        Self {
            start_date,
            weeks,
            time_limit_seconds: 120,
        }
    }

    /// Overrides the solve budget.
    pub fn with_time_limit(mut self, seconds: u64) -> Self {
        self.time_limit_seconds = seconds;
        self
    }

    /// Rejects malformed requests against the configured hard cap.
    pub fn validate(&self, hard_cap_seconds: u64) -> Result<(), RequestError> {
        if !ALLOWED_WEEKS.contains(&self.weeks) {
            return Err(RequestError::InvalidWeeks(self.weeks));
        }
        if self.time_limit_seconds == 0 {
            return Err(RequestError::ZeroTimeLimit);
        }
        if self.time_limit_seconds > hard_cap_seconds {
            return Err(RequestError::TimeLimitTooLarge(
                self.time_limit_seconds,
                hard_cap_seconds,
            ));
        }
        Ok(())
    }

    /// The ordered horizon days.
    pub fn horizon(&self) -> Vec<NaiveDate> {
        (0..u64::from(self.weeks) * 7)
            .filter_map(|offset| {
                self.start_date
                    .checked_add_signed(chrono::Duration::days(offset as i64))
            })
            .collect()
    }
}

/// Terminal status of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    /// Feasible and no blocking conflicts.
    Success,
    /// A roster exists but blocking conflicts remain, or the run was cut
    /// short by cancellation or the global budget.
    Partial,
    /// No feasible assignment.
    Failed,
}

/// The complete response shipped back to the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RosterResponse {
    pub status: RunStatus,
    pub roster: Vec<EmployeeSchedule>,
    pub days: Vec<NaiveDate>,
    pub total_employees: usize,
    pub generation_time_seconds: f64,
    pub workflow_log: Vec<WorkflowStep>,
    /// Blocking conflicts (severity High or Critical).
    pub conflicts: Vec<Conflict>,
    /// Non-blocking conflicts (severity Medium or Low).
    pub warnings: Vec<Conflict>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peak_coverage: Option<PeakCoverageMetrics>,
    pub demand_analysis: Map<String, Value>,
    pub skill_matching: Map<String, Value>,
}
