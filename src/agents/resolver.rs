//! Resolver agent.
//!
//! Attempts targeted repairs for blocking conflicts: freeze every
//! assignment outside the conflict's window, tighten the violated rule
//! (hardened coverage bounds; the labor rules are already hard), and
//! re-invoke the scheduler under a reduced budget. A repair is accepted
//! only if the patched solve is feasible and introduces no new Critical
//! conflict; otherwise the roster is rolled back and the conflict is
//! marked irreparable. Hard constraints are never weakened.

use chrono::NaiveDate;
use std::collections::BTreeSet;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::config::RosterConfig;
use crate::cp::{SolveParams, Solver};
use crate::models::{Conflict, ConflictKind, Interval, Roster, Severity};
use crate::scheduler::{Pin, RosterProblem, SchedulePatch};

use super::validator::ValidatorAgent;

/// Summary of one resolver pass.
#[derive(Debug, Clone, Default)]
pub struct ResolutionReport {
    /// Repair iterations attempted.
    pub attempted: u32,
    /// Repairs accepted into the roster.
    pub applied: u32,
    /// Conflicts marked irreparable.
    pub irreparable: u32,
}

/// Repairs blocking conflicts by local re-solves.
pub struct ResolverAgent<'a> {
    problem: &'a RosterProblem<'a>,
    validator: &'a ValidatorAgent<'a>,
    config: &'a RosterConfig,
}

impl<'a> ResolverAgent<'a> {
    /// Creates the agent.
    pub fn new(
        problem: &'a RosterProblem<'a>,
        validator: &'a ValidatorAgent<'a>,
        config: &'a RosterConfig,
    ) -> Self {
        Self {
            problem,
            validator,
            config,
        }
    }

    /// Runs up to `max_repairs` repair iterations before `deadline`.
    ///
    /// Returns the (possibly patched) roster, its current conflict list,
    /// and a pass summary.
    pub fn resolve<S: Solver>(
        &self,
        solver: &S,
        roster: Roster,
        conflicts: Vec<Conflict>,
        base_params: &SolveParams,
        deadline: Instant,
    ) -> (Roster, Vec<Conflict>, ResolutionReport) {
        let mut current = roster;
        let mut current_conflicts = conflicts;
        let mut irreparable: BTreeSet<_> = BTreeSet::new();
        let mut report = ResolutionReport::default();

        for _ in 0..self.config.resolver.max_repairs {
            let Some(target) = pick_target(&current_conflicts, &irreparable) else {
                break;
            };
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining < Duration::from_millis(200) {
                break;
            }

            report.attempted += 1;
            let patch = self.patch_for(&target, &current);
            let params = SolveParams {
                time_limit: remaining
                    .min(Duration::from_secs(self.config.resolver.repair_time_limit_seconds)),
                ..base_params.clone()
            };

            debug!(kind = ?target.kind, "attempting repair");
            let outcome = self.problem.solve(solver, &params, &patch);

            let Some(candidate) = outcome.roster else {
                info!(kind = ?target.kind, "repair solve infeasible; conflict is irreparable");
                irreparable.insert(target.key());
                report.irreparable += 1;
                continue;
            };

            let candidate_conflicts = self.validator.validate(&candidate);
            let old_criticals: BTreeSet<_> = critical_keys(&current_conflicts);
            let new_criticals: BTreeSet<_> = critical_keys(&candidate_conflicts);
            let introduces_critical = new_criticals.difference(&old_criticals).next().is_some();
            let target_resolved = !candidate_conflicts.iter().any(|c| c.key() == target.key());

            if introduces_critical {
                info!(kind = ?target.kind, "repair introduced a critical conflict; rolled back");
                irreparable.insert(target.key());
                report.irreparable += 1;
                continue;
            }

            if !target_resolved {
                // Accepting would loop on the same conflict.
                irreparable.insert(target.key());
                report.irreparable += 1;
                continue;
            }

            report.applied += 1;
            current = candidate;
            current_conflicts = candidate_conflicts;
        }

        (current, current_conflicts, report)
    }

    /// Builds the freeze-and-tighten patch for one conflict.
    fn patch_for(&self, conflict: &Conflict, roster: &Roster) -> SchedulePatch {
        let affected_days = expand_days(&conflict.days, &roster.days);
        let mut patch = SchedulePatch::none();

        // Freeze every cell outside the affected window.
        for schedule in &roster.schedules {
            let employee_affected = match &conflict.employee_id {
                Some(id) => *id == schedule.employee_id,
                None => true,
            };
            for &day in &roster.days {
                if employee_affected && affected_days.contains(&day) {
                    continue;
                }
                patch = patch.pin(Pin::new(
                    schedule.employee_id.clone(),
                    day,
                    schedule.shift_on(day).code,
                ));
            }
        }

        // Tighten coverage where the conflict is a coverage shortfall.
        if matches!(
            conflict.kind,
            ConflictKind::PeakUndercoverage | ConflictKind::OpeningOrClosingUncovered
        ) {
            for &day in &conflict.days {
                for interval in Interval::ALL {
                    let required = self.problem_required(day, interval);
                    if required > 0 {
                        patch = patch.require_coverage(day, interval, required);
                    }
                }
            }
        }

        patch
    }

    fn problem_required(&self, day: NaiveDate, interval: Interval) -> u32 {
        self.problem.demand().required(day, interval)
    }
}

/// Highest-severity blocking conflict not yet marked irreparable.
fn pick_target(
    conflicts: &[Conflict],
    irreparable: &BTreeSet<(ConflictKind, Option<String>, Vec<NaiveDate>)>,
) -> Option<Conflict> {
    conflicts
        .iter()
        .filter(|c| c.severity >= Severity::High)
        .filter(|c| !irreparable.contains(&c.key()))
        .max_by_key(|c| c.severity)
        .cloned()
}

fn critical_keys(conflicts: &[Conflict]) -> BTreeSet<(ConflictKind, Option<String>, Vec<NaiveDate>)> {
    conflicts
        .iter()
        .filter(|c| c.severity == Severity::Critical)
        .map(Conflict::key)
        .collect()
}

/// Affected days expanded by one day on each side (rest and consecutive
/// rules couple adjacent days). Empty input means the whole horizon.
fn expand_days(days: &[NaiveDate], horizon: &[NaiveDate]) -> BTreeSet<NaiveDate> {
    if days.is_empty() {
        return horizon.iter().copied().collect();
    }
    let mut expanded = BTreeSet::new();
    for &day in days {
        expanded.insert(day);
        if let Some(prev) = day.pred_opt() {
            if horizon.contains(&prev) {
                expanded.insert(prev);
            }
        }
        if let Some(next) = day.succ_opt() {
            if horizon.contains(&next) {
                expanded.insert(next);
            }
        }
    }
    expanded
}
