//! Run configuration.
//!
//! All knobs a run depends on are collected into one immutable
//! [`RosterConfig`] value passed at run start. There is no global state;
//! concurrent runs may share a config by reference.
//!
//! # Reference
//! Weekly-hours windows and the 10-hour rest gap follow the Australian
//! Fair Work Act retail award defaults.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::models::EmploymentType;

/// Hard labor rules enforced by the scheduler and re-checked by the validator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LaborRules {
    /// Weekly hours window for full-time employees.
    pub full_time_hours: (f64, f64),
    /// Weekly hours window for part-time employees.
    pub part_time_hours: (f64, f64),
    /// Weekly hours window for casual employees.
    pub casual_hours: (f64, f64),
    /// Minimum rest between the end of one shift and the start of the next.
    pub min_rest_hours: f64,
    /// Maximum hours a single shift may run.
    pub max_daily_hours: f64,
    /// Maximum working days in any sliding 7-day window.
    pub max_consecutive_days: u32,
    /// Managers that must be working (any shift) each day.
    pub min_managers_per_day: u32,
}

impl Default for LaborRules {
    fn default() -> Self {
        Self {
            full_time_hours: (38.0, 48.0),
            part_time_hours: (15.0, 38.0),
            casual_hours: (0.0, 38.0),
            min_rest_hours: 10.0,
            max_daily_hours: 10.0,
            max_consecutive_days: 6,
            min_managers_per_day: 1,
        }
    }
}

impl LaborRules {
    /// Weekly hours window for an employment type.
    pub fn weekly_hours(&self, employment_type: EmploymentType) -> (f64, f64) {
        match employment_type {
            EmploymentType::FullTime => self.full_time_hours,
            EmploymentType::PartTime => self.part_time_hours,
            EmploymentType::Casual => self.casual_hours,
        }
    }
}

/// Demand-shaping knobs consumed by the demand agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DemandKnobs {
    /// Weekend staffing uplift over the weekday base, in percent.
    pub weekend_uplift_pct: f64,
    /// Extra multiplier applied to lunch/dinner peak requirements.
    pub peak_uplift: f64,
    /// Floor on opening-interval headcount.
    pub min_opening: u32,
    /// Floor on closing-interval headcount.
    pub min_closing: u32,
}

impl Default for DemandKnobs {
    fn default() -> Self {
        Self {
            weekend_uplift_pct: 20.0,
            peak_uplift: 1.0,
            min_opening: 1,
            min_closing: 1,
        }
    }
}

/// Soft-objective weights.
///
/// The main weights are scaled by 1000 internally so the tie-breaking
/// terms (weekend spread, preferred placements, employee-id order) can sit
/// below them as small lexicographic contributions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectiveWeights {
    /// Coverage shortfall at opening/closing and peak intervals.
    pub coverage_peak: i64,
    /// Coverage shortfall at any other interval.
    pub coverage_other: i64,
    /// Per-interval manager coverage shortfall.
    pub manager_coverage: i64,
    /// Deviation of weekly hours from the window midpoint.
    pub hours_dispersion: i64,
    /// Pairwise weekend-shift imbalance between employees.
    pub weekend_equity: i64,
    /// Bonus for an assignment on a day the employee marked Preferred.
    pub preferred_day: i64,
}

impl Default for ObjectiveWeights {
    fn default() -> Self {
        Self {
            coverage_peak: 100,
            coverage_other: 40,
            manager_coverage: 100,
            hours_dispersion: 2,
            weekend_equity: 1,
            preferred_day: 2,
        }
    }
}

/// Solver budget and reproducibility settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolverSettings {
    /// Wall-clock budget for the main solve, in seconds.
    pub time_limit_seconds: u64,
    /// Upper bound the request layer may not exceed.
    pub hard_cap_seconds: u64,
    /// Worker threads the solver may use (0 = available cores).
    pub workers: usize,
    /// RNG seed; a fixed seed makes runs reproducible.
    pub seed: u64,
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            time_limit_seconds: 120,
            hard_cap_seconds: 180,
            workers: 0,
            seed: 0x5157_1f7e,
        }
    }
}

impl SolverSettings {
    /// Effective worker count.
    pub fn effective_workers(&self) -> usize {
        if self.workers > 0 {
            self.workers
        } else {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        }
    }

    /// Main-solve budget as a [`Duration`].
    pub fn time_limit(&self) -> Duration {
        Duration::from_secs(self.time_limit_seconds)
    }
}

/// Conflict-repair settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverSettings {
    /// Maximum repair iterations.
    pub max_repairs: u32,
    /// Solver budget per repair attempt, in seconds.
    pub repair_time_limit_seconds: u64,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            max_repairs: 3,
            repair_time_limit_seconds: 15,
        }
    }
}

/// Immutable per-run configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RosterConfig {
    pub labor: LaborRules,
    pub demand: DemandKnobs,
    pub weights: ObjectiveWeights,
    pub solver: SolverSettings,
    pub resolver: ResolverSettings,
    /// Global wall-clock budget for the whole pipeline, in seconds.
    /// Checked between stages; 0 derives it from the solver budget.
    pub global_time_limit_seconds: u64,
}

impl RosterConfig {
    /// Global pipeline budget.
    ///
    /// Defaults to the solve budget plus all repair budgets plus a fixed
    /// grace period for the non-solver stages.
    pub fn global_budget(&self) -> Duration {
        if self.global_time_limit_seconds > 0 {
            return Duration::from_secs(self.global_time_limit_seconds);
        }
        let repairs =
            self.resolver.max_repairs as u64 * self.resolver.repair_time_limit_seconds;
        Duration::from_secs(self.solver.time_limit_seconds + repairs + 10)
    }
}

/// Cooperative cancellation flag carried by a run.
///
/// Agents check it between sub-steps; the solver checks it inside its
/// search loop alongside the deadline.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// Creates a token in the not-cancelled state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation. Safe to call from another thread.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}
