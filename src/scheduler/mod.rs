//! Roster CP formulation.
//!
//! Bridges the rostering domain to the [`crate::cp`] model: one boolean
//! per (employee, day, code) cell of a dense tensor with computed strides,
//! hard labor/coverage constraints, penalized coverage targets, and a
//! preference objective. Solves with any [`Solver`] backend and decodes
//! the assignment back into a [`Roster`].
//!
//! # Formulation
//!
//! Hard: exactly one code per cell, availability and eligibility gates,
//! weekly-hours windows on contained Monday–Sunday weeks (prorated ceiling
//! on partial weeks), forbidden rest-gap pairs on consecutive days, at
//! most six working days per sliding 7-day window, and manager presence
//! per day. Interval coverage and per-interval manager coverage are
//! penalized, not enforced, so a short-staffed day degrades into reported
//! conflicts instead of infeasibility.
//!
//! # Reference
//! - Ernst et al. (2004), "Staff scheduling and rostering: a review"
//! - Van den Bergh et al. (2013), "Personnel scheduling: a literature review"

pub mod metrics;

pub use metrics::PeakCoverageMetrics;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, warn};

use crate::agents::demand::DemandTable;
use crate::agents::matcher::SkillMatrix;
use crate::config::RosterConfig;
use crate::cp::{
    ConstraintClass, LinearConstraint, Lit, Model, SoftConstraint, Solution, SolveParams, Solver,
};
use crate::models::{
    Availability, Conflict, ConflictKind, Employee, EmployeeSchedule, Interval, Roster,
    ShiftCatalog, ShiftInfo, StoreProfile,
};

/// Scale separating main objective weights from tie-breaking terms.
const SCALE: i64 = 1000;

/// A fixed assignment: the employee takes this code on this day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pin {
    pub employee_id: String,
    pub day: NaiveDate,
    pub code: String,
}

impl Pin {
    /// Creates a pin.
    pub fn new(employee_id: impl Into<String>, day: NaiveDate, code: impl Into<String>) -> Self {
        Self {
            employee_id: employee_id.into(),
            day,
            code: code.into(),
        }
    }
}

/// Local modifications applied on top of the base formulation: pinned
/// cells and hardened coverage bounds. Used for the management roster and
/// by the resolver's freeze-and-patch loop.
#[derive(Debug, Clone, Default)]
pub struct SchedulePatch {
    pub pins: Vec<Pin>,
    /// Coverage requirements promoted from penalty to hard constraint.
    pub hard_coverage: Vec<(NaiveDate, Interval, u32)>,
}

impl SchedulePatch {
    /// An empty patch.
    pub fn none() -> Self {
        Self::default()
    }

    /// Adds a pinned assignment.
    pub fn pin(mut self, pin: Pin) -> Self {
        self.pins.push(pin);
        self
    }

    /// Promotes a coverage requirement to a hard constraint.
    pub fn require_coverage(mut self, day: NaiveDate, interval: Interval, count: u32) -> Self {
        self.hard_coverage.push((day, interval, count));
        self
    }
}

/// Result of one scheduling attempt.
#[derive(Debug, Clone)]
pub struct ScheduleOutcome {
    /// Decoded roster; `None` when no feasible assignment was found.
    pub roster: Option<Roster>,
    /// Raw solver result (objective, violations, iterations).
    pub solution: Solution,
}

/// Builds and solves the roster model for one run.
pub struct RosterProblem<'a> {
    employees: &'a [Employee],
    catalog: &'a ShiftCatalog,
    store: &'a StoreProfile,
    demand: &'a DemandTable,
    skills: &'a SkillMatrix,
    config: &'a RosterConfig,
    horizon: &'a [NaiveDate],
    employee_index: HashMap<&'a str, usize>,
    /// Employee rank in id order, for deterministic tie-breaking.
    id_rank: Vec<usize>,
}

impl<'a> RosterProblem<'a> {
    /// Creates the problem over a horizon.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        employees: &'a [Employee],
        catalog: &'a ShiftCatalog,
        store: &'a StoreProfile,
        demand: &'a DemandTable,
        skills: &'a SkillMatrix,
        config: &'a RosterConfig,
        horizon: &'a [NaiveDate],
    ) -> Self {
        let employee_index = employees
            .iter()
            .enumerate()
            .map(|(i, e)| (e.id.as_str(), i))
            .collect();

        let mut order: Vec<usize> = (0..employees.len()).collect();
        order.sort_by(|&a, &b| employees[a].id.cmp(&employees[b].id));
        let mut id_rank = vec![0; employees.len()];
        for (rank, &e_idx) in order.iter().enumerate() {
            id_rank[e_idx] = rank;
        }

        Self {
            employees,
            catalog,
            store,
            demand,
            skills,
            config,
            horizon,
            employee_index,
            id_rank,
        }
    }

    /// The demand table this problem was built against.
    pub fn demand(&self) -> &DemandTable {
        self.demand
    }

    /// The horizon this problem schedules over.
    pub fn horizon(&self) -> &[NaiveDate] {
        self.horizon
    }

    /// Flat tensor index of the (employee, day, code) variable.
    fn var(&self, e_idx: usize, d_idx: usize, c_idx: usize) -> usize {
        (e_idx * self.horizon.len() + d_idx) * self.catalog.len() + c_idx
    }

    /// Deci-hours of a catalog code by position.
    fn hours10(&self, c_idx: usize) -> i64 {
        (self.catalog.codes()[c_idx].hours * 10.0).round() as i64
    }

    /// Builds the constraint model with a patch applied.
    pub fn build(&self, patch: &SchedulePatch) -> Model {
        let mut model = Model::new("roster");
        let days = self.horizon.len();
        let codes = self.catalog.len();
        let off_idx = self.catalog.position(crate::models::OFF_CODE).unwrap_or(0);

        // Decision tensor.
        for e_idx in 0..self.employees.len() {
            for d_idx in 0..days {
                for c_idx in 0..codes {
                    model.new_bool(format!(
                        "x[{},{},{}]",
                        self.employees[e_idx].id,
                        self.horizon[d_idx],
                        self.catalog.codes()[c_idx].code
                    ));
                }
            }
        }

        // Exactly one code per cell; availability and eligibility gates.
        for (e_idx, employee) in self.employees.iter().enumerate() {
            for (d_idx, &day) in self.horizon.iter().enumerate() {
                let cell: Vec<usize> = (0..codes).map(|c| self.var(e_idx, d_idx, c)).collect();
                model.add_exactly_one(cell);

                let available = employee
                    .availability_on(day)
                    .map(Availability::allows_work)
                    .unwrap_or(false);
                for c_idx in 0..codes {
                    if c_idx == off_idx {
                        continue;
                    }
                    if !available || !self.skills.eligible(e_idx, c_idx) {
                        model.fix(self.var(e_idx, d_idx, c_idx), false);
                    }
                }
            }
        }

        self.add_weekly_hours(&mut model);
        self.add_rest_gaps(&mut model);
        self.add_consecutive_cap(&mut model, off_idx);
        self.add_manager_presence(&mut model);
        self.add_coverage_penalties(&mut model);
        self.add_preferences(&mut model, off_idx);

        // Patch: hardened coverage bounds.
        for &(day, interval, count) in &patch.hard_coverage {
            if let Some(d_idx) = self.horizon.iter().position(|&d| d == day) {
                let mut lin = LinearConstraint::new(ConstraintClass::Coverage)
                    .at_least(i64::from(count))
                    .label(format!("{day}|{}", interval.label()));
                for (e_idx, _) in self.employees.iter().enumerate() {
                    for (c_idx, code) in self.catalog.codes().iter().enumerate() {
                        if code.covers(interval, &self.store.hours) {
                            lin = lin.term(self.var(e_idx, d_idx, c_idx), 1);
                        }
                    }
                }
                model.add_linear(lin);
            }
        }

        // Patch: pinned cells.
        for pin in &patch.pins {
            let Some(&e_idx) = self.employee_index.get(pin.employee_id.as_str()) else {
                warn!(employee = %pin.employee_id, "pin for unknown employee skipped");
                continue;
            };
            let Some(d_idx) = self.horizon.iter().position(|&d| d == pin.day) else {
                warn!(day = %pin.day, "pin outside horizon skipped");
                continue;
            };
            let Some(c_idx) = self.catalog.position(&pin.code) else {
                warn!(code = %pin.code, "pin with unknown code skipped");
                continue;
            };
            model.fix(self.var(e_idx, d_idx, c_idx), true);
        }

        debug!(
            vars = model.var_count(),
            linears = model.linear_count(),
            clauses = model.clause_count(),
            softs = model.soft_count(),
            "roster model built"
        );
        model
    }

    /// Monday-aligned calendar weeks intersecting the horizon, as day
    /// indices. The flag marks weeks fully contained in the horizon.
    fn weeks(&self) -> Vec<(Vec<usize>, bool)> {
        use chrono::Datelike;
        let mut buckets: BTreeMap<(i32, u32), Vec<usize>> = BTreeMap::new();
        for (d_idx, day) in self.horizon.iter().enumerate() {
            let iso = day.iso_week();
            buckets.entry((iso.year(), iso.week())).or_default().push(d_idx);
        }
        buckets
            .into_values()
            .map(|days| {
                let full = days.len() == 7;
                (days, full)
            })
            .collect()
    }

    fn add_weekly_hours(&self, model: &mut Model) {
        let codes = self.catalog.len();
        for (e_idx, employee) in self.employees.iter().enumerate() {
            let (min_h, max_h) = employee.weekly_hours_window(&self.config.labor);
            let min10 = (min_h * 10.0).round() as i64;
            let max10 = (max_h * 10.0).round() as i64;
            let midpoint10 = (min10 + max10) / 2;

            for (week, full) in self.weeks() {
                let mut lin = LinearConstraint::new(ConstraintClass::WeeklyHours).label(format!(
                    "{}|{}",
                    employee.id,
                    self.horizon[week[0]]
                ));
                // The floor cannot exceed what availability allows, or a
                // single blocked-out week would sink the whole solve; the
                // validator still reports the underflow.
                let mut achievable10 = 0i64;
                for &d_idx in &week {
                    let day = self.horizon[d_idx];
                    let available = employee
                        .availability_on(day)
                        .map(Availability::allows_work)
                        .unwrap_or(false);
                    let mut best_day10 = 0i64;
                    for c_idx in 0..codes {
                        let h10 = self.hours10(c_idx);
                        if h10 > 0 {
                            lin = lin.term(self.var(e_idx, d_idx, c_idx), h10);
                            if available && self.skills.eligible(e_idx, c_idx) {
                                best_day10 = best_day10.max(h10);
                            }
                        }
                    }
                    achievable10 += best_day10;
                }

                if full {
                    lin = lin.at_least(min10.min(achievable10)).at_most(max10);
                } else {
                    // Partial week: prorated ceiling only.
                    let prorated_num = max10 * week.len() as i64;
                    let prorated = (prorated_num + 6) / 7;
                    lin = lin.at_most(prorated);
                }
                let terms = lin.terms.clone();
                model.add_linear(lin);

                // Hours dispersion: pull full weeks toward the window midpoint.
                if full && self.config.weights.hours_dispersion > 0 {
                    model.add_soft(SoftConstraint {
                        terms,
                        lo: Some(midpoint10),
                        hi: Some(midpoint10),
                        // Weight is per hour; sums are in deci-hours.
                        weight: self.config.weights.hours_dispersion * SCALE / 10,
                        label: format!("dispersion|{}", employee.id),
                    });
                }
            }
        }
    }

    fn add_rest_gaps(&self, model: &mut Model) {
        let min_rest = self.config.labor.min_rest_hours;
        let forbidden: Vec<(usize, usize)> = self
            .catalog
            .forbidden_rest_pairs(min_rest)
            .into_iter()
            .filter_map(|(a, b)| {
                Some((self.catalog.position(&a.code)?, self.catalog.position(&b.code)?))
            })
            .collect();

        for (e_idx, employee) in self.employees.iter().enumerate() {
            for d_idx in 0..self.horizon.len().saturating_sub(1) {
                let today = self.horizon[d_idx];
                let tomorrow = self.horizon[d_idx + 1];
                if today.succ_opt() != Some(tomorrow) {
                    continue; // Non-adjacent dates carry a full night anyway.
                }
                for &(c1, c2) in &forbidden {
                    model.add_clause(
                        vec![
                            Lit::neg(self.var(e_idx, d_idx, c1)),
                            Lit::neg(self.var(e_idx, d_idx + 1, c2)),
                        ],
                        ConstraintClass::RestGap,
                        format!("{}|{}|{}", employee.id, today, tomorrow),
                    );
                }
            }
        }
    }

    fn add_consecutive_cap(&self, model: &mut Model, off_idx: usize) {
        let cap = self.config.labor.max_consecutive_days as i64;
        let window = cap as usize + 1;
        if self.horizon.len() < window {
            return;
        }
        for (e_idx, employee) in self.employees.iter().enumerate() {
            for start in 0..=(self.horizon.len() - window) {
                // At least one off day in every (cap+1)-day window.
                let off_vars =
                    (start..start + window).map(|d_idx| self.var(e_idx, d_idx, off_idx));
                model.add_linear(
                    LinearConstraint::new(ConstraintClass::ConsecutiveDays)
                        .sum_of(off_vars)
                        .at_least(window as i64 - cap)
                        .label(format!("{}|{}", employee.id, self.horizon[start])),
                );
            }
        }
    }

    fn add_manager_presence(&self, model: &mut Model) {
        let required = i64::from(self.config.labor.min_managers_per_day);
        let any_manager = self.employees.iter().any(|e| e.is_manager);

        for (d_idx, &day) in self.horizon.iter().enumerate() {
            let available_managers = self.employees.iter().any(|e| {
                e.is_manager
                    && e.availability_on(day)
                        .map(Availability::allows_work)
                        .unwrap_or(false)
            });
            // A store with managers who are all off on one day degrades to
            // a validator conflict on that day; a store with no managers at
            // all keeps the (empty, unsatisfiable) bound and fails the run.
            if any_manager && !available_managers {
                continue;
            }

            let mut lin = LinearConstraint::new(ConstraintClass::ManagerPresence)
                .at_least(required)
                .label(day.to_string());
            for (e_idx, employee) in self.employees.iter().enumerate() {
                if !employee.is_manager {
                    continue;
                }
                for (c_idx, code) in self.catalog.codes().iter().enumerate() {
                    if code.is_working() {
                        lin = lin.term(self.var(e_idx, d_idx, c_idx), 1);
                    }
                }
            }
            model.add_linear(lin);
        }
    }

    fn add_coverage_penalties(&self, model: &mut Model) {
        let weights = &self.config.weights;
        for (d_idx, &day) in self.horizon.iter().enumerate() {
            for interval in Interval::ALL {
                let required = i64::from(self.demand.required(day, interval));
                let covering: Vec<(usize, i64)> = self
                    .employees
                    .iter()
                    .enumerate()
                    .flat_map(|(e_idx, _)| {
                        self.catalog
                            .codes()
                            .iter()
                            .enumerate()
                            .filter(|(_, code)| code.covers(interval, &self.store.hours))
                            .map(move |(c_idx, _)| (self.var(e_idx, d_idx, c_idx), 1i64))
                            .collect::<Vec<_>>()
                    })
                    .collect();

                if required > 0 {
                    let weight = if interval.is_peak()
                        || matches!(interval, Interval::Opening | Interval::Closing)
                    {
                        weights.coverage_peak
                    } else {
                        weights.coverage_other
                    };
                    model.add_soft(SoftConstraint {
                        terms: covering,
                        lo: Some(required),
                        hi: None,
                        weight: weight * SCALE,
                        label: format!("coverage|{day}|{}", interval.label()),
                    });
                }

                // A manager eye on every interval, softly.
                if weights.manager_coverage > 0 {
                    let manager_covering: Vec<(usize, i64)> = self
                        .employees
                        .iter()
                        .enumerate()
                        .filter(|(_, e)| e.is_manager)
                        .flat_map(|(e_idx, _)| {
                            self.catalog
                                .codes()
                                .iter()
                                .enumerate()
                                .filter(|(_, code)| code.covers(interval, &self.store.hours))
                                .map(move |(c_idx, _)| (self.var(e_idx, d_idx, c_idx), 1i64))
                                .collect::<Vec<_>>()
                        })
                        .collect();
                    if !manager_covering.is_empty() {
                        model.add_soft(SoftConstraint {
                            terms: manager_covering,
                            lo: Some(1),
                            hi: None,
                            weight: weights.manager_coverage * SCALE,
                            label: format!("manager|{day}|{}", interval.label()),
                        });
                    }
                }
            }
        }
    }

    fn add_preferences(&self, model: &mut Model, off_idx: usize) {
        use crate::agents::demand::is_weekend;
        let weights = &self.config.weights;
        let half = self.employees.len() / 2;

        for (e_idx, employee) in self.employees.iter().enumerate() {
            let upper_half = self.id_rank[e_idx] >= half.max(1);
            for (d_idx, &day) in self.horizon.iter().enumerate() {
                let preferred =
                    employee.availability_on(day) == Some(Availability::Preferred);
                let weekend = is_weekend(day);

                for c_idx in 0..self.catalog.len() {
                    if c_idx == off_idx {
                        continue;
                    }
                    let var = self.var(e_idx, d_idx, c_idx);
                    let mut score = self.skills.score(e_idx, c_idx);
                    if preferred {
                        score += 3 + weights.preferred_day;
                    }
                    let mut coeff = -score * SCALE;

                    // Lexicographic tie-breakers, well under one SCALE step:
                    // spread weekends thin, land preferred days, bias work
                    // toward lexicographically smaller employee ids.
                    if weekend {
                        coeff += 4;
                    }
                    if preferred {
                        coeff -= 2;
                    }
                    if upper_half {
                        coeff += 1;
                    }
                    model.add_objective_term(var, coeff);
                }
            }

            // Weekend equity: penalize pairwise weekend-count imbalance.
            if weights.weekend_equity > 0 {
                for (other_idx, other) in self.employees.iter().enumerate().skip(e_idx + 1) {
                    let mut terms = Vec::new();
                    for (d_idx, &day) in self.horizon.iter().enumerate() {
                        if !is_weekend(day) {
                            continue;
                        }
                        for c_idx in 0..self.catalog.len() {
                            if c_idx == off_idx {
                                continue;
                            }
                            terms.push((self.var(e_idx, d_idx, c_idx), 1));
                            terms.push((self.var(other_idx, d_idx, c_idx), -1));
                        }
                    }
                    if !terms.is_empty() {
                        model.add_soft(SoftConstraint {
                            terms,
                            lo: Some(0),
                            hi: Some(0),
                            weight: weights.weekend_equity * SCALE,
                            label: format!("equity|{}|{}", employee.id, other.id),
                        });
                    }
                }
            }
        }
    }

    /// Solves the model and decodes the assignment.
    pub fn solve<S: Solver>(
        &self,
        solver: &S,
        params: &SolveParams,
        patch: &SchedulePatch,
    ) -> ScheduleOutcome {
        let model = self.build(patch);
        let solution = solver.solve(&model, params);
        let roster = solution.is_feasible().then(|| self.decode(&solution));
        ScheduleOutcome { roster, solution }
    }

    /// Decodes a feasible assignment into a roster.
    pub fn decode(&self, solution: &Solution) -> Roster {
        let mut roster = Roster::new(self.horizon.to_vec());

        for (e_idx, employee) in self.employees.iter().enumerate() {
            let mut shifts = BTreeMap::new();
            for (d_idx, &day) in self.horizon.iter().enumerate() {
                let assigned = (0..self.catalog.len())
                    .find(|&c_idx| solution.value(self.var(e_idx, d_idx, c_idx)))
                    .map(|c_idx| &self.catalog.codes()[c_idx]);

                let info = match assigned {
                    Some(code) if code.is_working() => ShiftInfo {
                        code: code.code.clone(),
                        name: code.name.clone(),
                        hours: code.hours,
                        station: code
                            .station
                            .clone()
                            .or_else(|| Some(employee.primary_station.clone())),
                    },
                    _ => ShiftInfo::off(),
                };
                shifts.insert(day, info);
            }

            let mut schedule = EmployeeSchedule {
                employee_id: employee.id.clone(),
                name: employee.name.clone(),
                employment_type: employee.employment_type,
                is_manager: employee.is_manager,
                primary_station: employee.primary_station.clone(),
                shifts,
                total_hours: 0.0,
            };
            schedule.recompute_total_hours();
            roster.add_schedule(schedule);
        }

        roster
    }

    /// Maps an infeasible solution's violated constraints to diagnostic
    /// conflicts naming the tightest-violated constraint classes.
    pub fn diagnose(&self, solution: &Solution) -> Vec<Conflict> {
        let mut conflicts: Vec<Conflict> = Vec::new();
        let mut seen = std::collections::BTreeSet::new();

        for violation in &solution.violations {
            let parts: Vec<&str> = violation.label.split('|').collect();
            let conflict = match violation.class {
                ConstraintClass::ManagerPresence => {
                    let day = parts
                        .first()
                        .and_then(|s| s.parse::<NaiveDate>().ok());
                    let mut c = Conflict::new(
                        ConflictKind::NoManagerOnDuty,
                        format!("no manager can be rostered on {}", violation.label),
                    );
                    if let Some(day) = day {
                        c = c.on_day(day);
                    }
                    c
                }
                ConstraintClass::WeeklyHours => Conflict::new(
                    ConflictKind::WeeklyHoursOverflow,
                    format!(
                        "weekly hours window unsatisfiable for employee {}",
                        parts.first().unwrap_or(&"?")
                    ),
                )
                .for_employee(*parts.first().unwrap_or(&"?")),
                ConstraintClass::RestGap => {
                    let mut c = Conflict::new(
                        ConflictKind::InsufficientRest,
                        format!("rest gap unsatisfiable ({})", violation.label),
                    )
                    .for_employee(*parts.first().unwrap_or(&"?"));
                    for part in parts.iter().skip(1) {
                        if let Ok(day) = part.parse::<NaiveDate>() {
                            c = c.on_day(day);
                        }
                    }
                    c
                }
                ConstraintClass::ConsecutiveDays => Conflict::new(
                    ConflictKind::ConsecutiveDaysExceeded,
                    format!(
                        "consecutive working-day cap unsatisfiable for employee {}",
                        parts.first().unwrap_or(&"?")
                    ),
                )
                .for_employee(*parts.first().unwrap_or(&"?")),
                ConstraintClass::Coverage => {
                    let kind = if parts.get(1).map(|s| s.contains("peak")).unwrap_or(false) {
                        ConflictKind::PeakUndercoverage
                    } else {
                        ConflictKind::OpeningOrClosingUncovered
                    };
                    let mut c = Conflict::new(
                        kind,
                        format!("required coverage unsatisfiable ({})", violation.label),
                    );
                    if let Some(day) = parts.first().and_then(|s| s.parse::<NaiveDate>().ok()) {
                        c = c.on_day(day);
                    }
                    c
                }
                _ => continue,
            };

            if seen.insert(conflict.key()) {
                conflicts.push(conflict);
            }
        }

        conflicts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::demand::DemandAgent;
    use crate::agents::matcher::MatcherAgent;
    use crate::cp::LocalSearchSolver;
    use crate::models::{BaseHeadcount, EmploymentType};
    use std::time::Duration;

    fn horizon() -> Vec<NaiveDate> {
        // Monday 2025-03-03 through Sunday 2025-03-09.
        (3..10)
            .map(|d| NaiveDate::from_ymd_opt(2025, 3, d).unwrap())
            .collect()
    }

    fn small_store() -> StoreProfile {
        StoreProfile::new("s1", BaseHeadcount::uniform(1))
    }

    fn staff(horizon: &[NaiveDate]) -> Vec<Employee> {
        vec![
            Employee::new("m1", "Mo", EmploymentType::FullTime, "Counter")
                .manager()
                .available_all(horizon, Availability::Available),
            Employee::new("m2", "Max", EmploymentType::FullTime, "Counter")
                .manager()
                .available_all(horizon, Availability::Available),
            Employee::new("c1", "Cy", EmploymentType::Casual, "Kitchen")
                .available_all(horizon, Availability::Available),
            Employee::new("c2", "Di", EmploymentType::Casual, "Counter")
                .available_all(horizon, Availability::Available),
        ]
    }

    fn params(ms: u64) -> SolveParams {
        SolveParams {
            time_limit: Duration::from_millis(ms),
            workers: 1,
            seed: 11,
            max_iterations: 0,
            cancel: None,
        }
    }

    struct Fixture {
        employees: Vec<Employee>,
        catalog: ShiftCatalog,
        store: StoreProfile,
        demand: DemandTable,
        skills: SkillMatrix,
        config: RosterConfig,
        horizon: Vec<NaiveDate>,
    }

    fn fixture(employees: Vec<Employee>) -> Fixture {
        let horizon = horizon();
        let catalog = ShiftCatalog::canonical();
        let store = small_store();
        let config = RosterConfig::default();
        let demand = DemandAgent::new(&store, &config.demand).analyze(&horizon);
        let skills = MatcherAgent::new(&employees, &catalog).match_skills();
        Fixture {
            employees,
            catalog,
            store,
            demand,
            skills,
            config,
            horizon,
        }
    }

    impl Fixture {
        fn problem(&self) -> RosterProblem<'_> {
            RosterProblem::new(
                &self.employees,
                &self.catalog,
                &self.store,
                &self.demand,
                &self.skills,
                &self.config,
                &self.horizon,
            )
        }
    }

    #[test]
    fn test_model_shape() {
        let fx = fixture(staff(&horizon()));
        let problem = fx.problem();
        let model = problem.build(&SchedulePatch::none());

        // 4 employees × 7 days × 7 codes.
        assert_eq!(model.var_count(), 4 * 7 * 7);
        // One exactly-one group per cell.
        assert_eq!(model.group_count(), 4 * 7);
        // Weekly hours (4) + consecutive windows (4×1) + manager presence (7).
        assert_eq!(model.linear_count(), 4 + 4 + 7);
        // Rest-gap clauses exist for 3F→{1F,M} on each adjacent pair.
        assert!(model.clause_count() >= 4 * 6 * 2);
        assert!(model.soft_count() > 0);
    }

    #[test]
    fn test_solve_and_decode_invariants() {
        let fx = fixture(staff(&horizon()));
        let problem = fx.problem();
        let outcome = problem.solve(&LocalSearchSolver::new(), &params(2_500), &SchedulePatch::none());

        assert!(outcome.solution.is_feasible());
        let roster = outcome.roster.expect("feasible roster");

        // Exactly one cell per (employee, day); totals add up.
        for schedule in &roster.schedules {
            assert_eq!(schedule.shifts.len(), 7);
            let summed: f64 = schedule.shifts.values().map(|s| s.hours).sum();
            assert!((schedule.total_hours - summed).abs() < 1e-9);
        }

        // Manager presence every day.
        for &day in &fx.horizon {
            assert!(roster.managers_working(day) >= 1, "no manager on {day}");
        }

        // Eligibility gate: crew never hold manager-only codes.
        for schedule in roster.schedules.iter().filter(|s| !s.is_manager) {
            for info in schedule.shifts.values() {
                assert!(!matches!(info.code.as_str(), "SC" | "M"));
            }
        }

        // Full-time weekly window for the managers.
        for id in ["m1", "m2"] {
            let hours = roster.schedule(id).unwrap().total_hours;
            assert!((38.0..=48.0).contains(&hours), "{id} has {hours}h");
        }
    }

    #[test]
    fn test_unavailable_day_is_off() {
        let horizon = horizon();
        let saturday = NaiveDate::from_ymd_opt(2025, 3, 8).unwrap();
        let mut employees = staff(&horizon);
        employees[2] = Employee::new("c1", "Cy", EmploymentType::Casual, "Kitchen")
            .available_all(&horizon, Availability::Available)
            .with_availability(saturday, Availability::Unavailable);

        let fx = fixture(employees);
        let problem = fx.problem();
        let outcome = problem.solve(&LocalSearchSolver::new(), &params(2_500), &SchedulePatch::none());
        let roster = outcome.roster.expect("feasible roster");
        assert_eq!(roster.code_on("c1", saturday), "/");
    }

    #[test]
    fn test_rest_pair_never_assigned() {
        let fx = fixture(staff(&horizon()));
        let problem = fx.problem();
        let outcome = problem.solve(&LocalSearchSolver::new(), &params(2_500), &SchedulePatch::none());
        let roster = outcome.roster.expect("feasible roster");

        let forbidden: Vec<(String, String)> = fx
            .catalog
            .forbidden_rest_pairs(fx.config.labor.min_rest_hours)
            .into_iter()
            .map(|(a, b)| (a.code.clone(), b.code.clone()))
            .collect();
        for schedule in &roster.schedules {
            for pair in fx.horizon.windows(2) {
                let today = schedule.shift_on(pair[0]).code;
                let tomorrow = schedule.shift_on(pair[1]).code;
                assert!(
                    !forbidden.contains(&(today.clone(), tomorrow.clone())),
                    "{} works {today} then {tomorrow}",
                    schedule.employee_id
                );
            }
        }
    }

    #[test]
    fn test_no_managers_is_diagnosed_per_day() {
        let horizon = horizon();
        let crew: Vec<Employee> = (0..5)
            .map(|i| {
                Employee::new(format!("c{i}"), format!("Crew {i}"), EmploymentType::Casual, "Counter")
                    .available_all(&horizon, Availability::Available)
            })
            .collect();

        let fx = fixture(crew);
        let problem = fx.problem();
        let outcome = problem.solve(&LocalSearchSolver::new(), &params(500), &SchedulePatch::none());

        assert!(outcome.roster.is_none());
        let conflicts = problem.diagnose(&outcome.solution);
        let no_manager_days: Vec<_> = conflicts
            .iter()
            .filter(|c| c.kind == ConflictKind::NoManagerOnDuty)
            .collect();
        assert_eq!(no_manager_days.len(), 7);
        assert!(no_manager_days.iter().all(|c| c.severity.is_blocking()));
    }

    #[test]
    fn test_pins_are_honored() {
        let fx = fixture(staff(&horizon()));
        let problem = fx.problem();
        let monday = fx.horizon[0];
        let patch = SchedulePatch::none().pin(Pin::new("m1", monday, "SC"));
        let outcome = problem.solve(&LocalSearchSolver::new(), &params(2_500), &patch);
        let roster = outcome.roster.expect("feasible roster");
        assert_eq!(roster.code_on("m1", monday), "SC");
    }

    #[test]
    fn test_decode_station_falls_back_to_primary() {
        let fx = fixture(staff(&horizon()));
        let problem = fx.problem();
        let outcome = problem.solve(&LocalSearchSolver::new(), &params(2_500), &SchedulePatch::none());
        let roster = outcome.roster.expect("feasible roster");
        for schedule in &roster.schedules {
            for info in schedule.shifts.values() {
                if !info.is_off() {
                    assert!(info.station.is_some());
                }
            }
        }
    }
}
