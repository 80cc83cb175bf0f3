//! Validator agent.
//!
//! Walks a decoded roster and re-checks every labor and coverage rule
//! independently of the solver, so a faulty decode or a relaxed solve
//! still surfaces violations. Validating the same roster twice yields the
//! same conflict list.

use chrono::{Datelike, NaiveDate};
use std::collections::BTreeMap;
use tracing::debug;

use crate::agents::demand::DemandTable;
use crate::config::RosterConfig;
use crate::models::{
    Availability, Conflict, ConflictKind, Employee, Interval, Roster, ShiftCatalog, StoreProfile,
};
use crate::scheduler::PeakCoverageMetrics;

/// Re-checks a roster against labor rules and the demand table.
pub struct ValidatorAgent<'a> {
    employees: &'a [Employee],
    catalog: &'a ShiftCatalog,
    store: &'a StoreProfile,
    demand: &'a DemandTable,
    config: &'a RosterConfig,
}

impl<'a> ValidatorAgent<'a> {
    /// Creates the agent.
    pub fn new(
        employees: &'a [Employee],
        catalog: &'a ShiftCatalog,
        store: &'a StoreProfile,
        demand: &'a DemandTable,
        config: &'a RosterConfig,
    ) -> Self {
        Self {
            employees,
            catalog,
            store,
            demand,
            config,
        }
    }

    /// Runs every check and returns the conflicts found, in a stable order.
    pub fn validate(&self, roster: &Roster) -> Vec<Conflict> {
        let mut conflicts = Vec::new();
        let employee_by_id: BTreeMap<&str, &Employee> =
            self.employees.iter().map(|e| (e.id.as_str(), e)).collect();

        for schedule in &roster.schedules {
            let employee = employee_by_id.get(schedule.employee_id.as_str());
            self.check_weekly_hours(roster, schedule, employee.copied(), &mut conflicts);
            self.check_consecutive_days(roster, schedule, &mut conflicts);
            self.check_rest_gaps(roster, schedule, &mut conflicts);
            self.check_station_skills(schedule, employee.copied(), &mut conflicts);
            self.check_preferences(roster, schedule, employee.copied(), &mut conflicts);
        }

        self.check_manager_presence(roster, &mut conflicts);
        self.check_coverage(roster, &mut conflicts);
        self.check_weekend_uplift(roster, &mut conflicts);

        debug!(conflicts = conflicts.len(), "roster validated");
        conflicts
    }

    /// Monday-aligned calendar weeks of the horizon; full = 7 days present.
    fn weeks(&self, days: &[NaiveDate]) -> Vec<(Vec<NaiveDate>, bool)> {
        let mut buckets: BTreeMap<(i32, u32), Vec<NaiveDate>> = BTreeMap::new();
        for &day in days {
            let iso = day.iso_week();
            buckets.entry((iso.year(), iso.week())).or_default().push(day);
        }
        buckets
            .into_values()
            .map(|week| {
                let full = week.len() == 7;
                (week, full)
            })
            .collect()
    }

    fn check_weekly_hours(
        &self,
        roster: &Roster,
        schedule: &crate::models::EmployeeSchedule,
        employee: Option<&Employee>,
        conflicts: &mut Vec<Conflict>,
    ) {
        let Some(employee) = employee else { return };
        let (min_h, max_h) = employee.weekly_hours_window(&self.config.labor);

        for (week, full) in self.weeks(&roster.days) {
            let hours = schedule.hours_over(&week);
            if hours > max_h + 1e-9 {
                conflicts.push(
                    Conflict::new(
                        ConflictKind::WeeklyHoursOverflow,
                        format!(
                            "{}: {hours:.1}h in week of {} exceeds the {max_h:.0}h maximum",
                            schedule.name, week[0]
                        ),
                    )
                    .for_employee(&schedule.employee_id)
                    .on_days(week.iter().copied()),
                );
            }
            if full && hours + 1e-9 < min_h {
                conflicts.push(
                    Conflict::new(
                        ConflictKind::WeeklyHoursUnderflow,
                        format!(
                            "{}: {hours:.1}h in week of {} is below the {min_h:.0}h minimum",
                            schedule.name, week[0]
                        ),
                    )
                    .for_employee(&schedule.employee_id)
                    .on_days(week.iter().copied()),
                );
            }
        }
    }

    fn check_consecutive_days(
        &self,
        roster: &Roster,
        schedule: &crate::models::EmployeeSchedule,
        conflicts: &mut Vec<Conflict>,
    ) {
        let cap = self.config.labor.max_consecutive_days as usize;
        let mut run: Vec<NaiveDate> = Vec::new();
        let mut reported = false;

        for &day in &roster.days {
            if schedule.works_on(day) {
                run.push(day);
                if run.len() > cap && !reported {
                    conflicts.push(
                        Conflict::new(
                            ConflictKind::ConsecutiveDaysExceeded,
                            format!(
                                "{}: more than {cap} consecutive working days starting {}",
                                schedule.name, run[0]
                            ),
                        )
                        .for_employee(&schedule.employee_id)
                        .on_days(run.iter().copied()),
                    );
                    reported = true;
                }
            } else {
                run.clear();
                reported = false;
            }
        }
    }

    fn check_rest_gaps(
        &self,
        roster: &Roster,
        schedule: &crate::models::EmployeeSchedule,
        conflicts: &mut Vec<Conflict>,
    ) {
        let min_rest = self.config.labor.min_rest_hours;
        for pair in roster.days.windows(2) {
            if pair[0].succ_opt() != Some(pair[1]) {
                continue;
            }
            let today = schedule.shift_on(pair[0]);
            let tomorrow = schedule.shift_on(pair[1]);
            let (Some(c1), Some(c2)) =
                (self.catalog.get(&today.code), self.catalog.get(&tomorrow.code))
            else {
                continue;
            };
            if let Some(rest) = c1.rest_before(c2) {
                if rest < min_rest {
                    conflicts.push(
                        Conflict::new(
                            ConflictKind::InsufficientRest,
                            format!(
                                "{}: only {rest:.1}h rest between {} ({}) and {} ({})",
                                schedule.name, pair[0], today.code, pair[1], tomorrow.code
                            ),
                        )
                        .for_employee(&schedule.employee_id)
                        .on_days(pair.iter().copied()),
                    );
                }
            }
        }
    }

    fn check_station_skills(
        &self,
        schedule: &crate::models::EmployeeSchedule,
        employee: Option<&Employee>,
        conflicts: &mut Vec<Conflict>,
    ) {
        let Some(employee) = employee else { return };
        for (&day, info) in &schedule.shifts {
            if info.is_off() {
                continue;
            }
            let manager_breach = self
                .catalog
                .get(&info.code)
                .map(|c| c.requires_manager && !employee.is_manager)
                .unwrap_or(false);
            let station_breach = info
                .station
                .as_deref()
                .map(|s| !employee.works_station(s))
                .unwrap_or(false);
            if manager_breach || station_breach {
                conflicts.push(
                    Conflict::new(
                        ConflictKind::StationSkillMismatch,
                        format!(
                            "{}: not qualified for {} on {day}",
                            schedule.name,
                            info.station.as_deref().unwrap_or(&info.code)
                        ),
                    )
                    .for_employee(&schedule.employee_id)
                    .on_day(day),
                );
            }
        }
    }

    fn check_preferences(
        &self,
        roster: &Roster,
        schedule: &crate::models::EmployeeSchedule,
        employee: Option<&Employee>,
        conflicts: &mut Vec<Conflict>,
    ) {
        let Some(employee) = employee else { return };
        let preferred_but_off: Vec<NaiveDate> = roster
            .days
            .iter()
            .copied()
            .filter(|&d| {
                employee.availability_on(d) == Some(Availability::Preferred)
                    && !schedule.works_on(d)
            })
            .collect();
        let worked_non_preferred = roster.days.iter().any(|&d| {
            employee.availability_on(d) == Some(Availability::Available) && schedule.works_on(d)
        });

        if !preferred_but_off.is_empty() && worked_non_preferred {
            conflicts.push(
                Conflict::new(
                    ConflictKind::PreferenceIgnored,
                    format!(
                        "{}: rostered on non-preferred days while {} preferred day(s) stay off",
                        schedule.name,
                        preferred_but_off.len()
                    ),
                )
                .for_employee(&schedule.employee_id)
                .on_days(preferred_but_off),
            );
        }
    }

    fn check_manager_presence(&self, roster: &Roster, conflicts: &mut Vec<Conflict>) {
        let required = self.config.labor.min_managers_per_day as usize;
        for &day in &roster.days {
            let managers = roster.managers_working(day);
            if managers < required {
                conflicts.push(
                    Conflict::new(
                        ConflictKind::NoManagerOnDuty,
                        format!("{day}: {managers} manager(s) on duty, {required} required"),
                    )
                    .on_day(day),
                );
            }
        }
    }

    fn check_coverage(&self, roster: &Roster, conflicts: &mut Vec<Conflict>) {
        for &day in &roster.days {
            for interval in Interval::ALL {
                let required = self.demand.required(day, interval) as usize;
                if required == 0 {
                    continue;
                }
                let count = roster.coverage(day, interval, self.catalog, &self.store.hours);
                if count >= required {
                    continue;
                }
                let kind = if interval.is_peak() {
                    ConflictKind::PeakUndercoverage
                } else {
                    ConflictKind::OpeningOrClosingUncovered
                };
                conflicts.push(
                    Conflict::new(
                        kind,
                        format!(
                            "{day}: {} has {count} staff, {required} required",
                            interval.label()
                        ),
                    )
                    .on_day(day),
                );
            }
        }
    }

    fn check_weekend_uplift(&self, roster: &Roster, conflicts: &mut Vec<Conflict>) {
        let metrics = PeakCoverageMetrics::calculate(
            roster,
            self.demand,
            self.catalog,
            &self.store.hours,
            self.config.demand.weekend_uplift_pct,
        );
        if !metrics.meets_weekend_target {
            conflicts.push(Conflict::new(
                ConflictKind::WeekendUpliftMissed,
                format!(
                    "weekend staffing uplift is {:.1}%, target {:.1}%",
                    metrics.weekend_vs_weekday_increase_pct, metrics.weekend_target_pct
                ),
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::demand::DemandAgent;
    use crate::models::{
        BaseHeadcount, EmployeeSchedule, EmploymentType, ShiftInfo,
    };
    use std::collections::BTreeMap as Map;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, d).unwrap()
    }

    fn horizon() -> Vec<NaiveDate> {
        (3..10).map(day).collect()
    }

    fn cell(catalog: &ShiftCatalog, code: &str) -> ShiftInfo {
        if code == "/" {
            return ShiftInfo::off();
        }
        let def = catalog.get(code).unwrap();
        ShiftInfo {
            code: def.code.clone(),
            name: def.name.clone(),
            hours: def.hours,
            station: None,
        }
    }

    fn schedule_with(
        catalog: &ShiftCatalog,
        id: &str,
        is_manager: bool,
        codes: [&str; 7],
    ) -> EmployeeSchedule {
        let mut shifts = Map::new();
        for (i, &code) in codes.iter().enumerate() {
            shifts.insert(day(3 + i as u32), cell(catalog, code));
        }
        let mut schedule = EmployeeSchedule {
            employee_id: id.into(),
            name: id.to_uppercase(),
            employment_type: EmploymentType::FullTime,
            is_manager,
            primary_station: "Counter".into(),
            shifts,
            total_hours: 0.0,
        };
        schedule.recompute_total_hours();
        schedule
    }

    struct Fixture {
        employees: Vec<Employee>,
        catalog: ShiftCatalog,
        store: StoreProfile,
        demand: DemandTable,
        config: RosterConfig,
    }

    fn fixture(employees: Vec<Employee>) -> Fixture {
        let catalog = ShiftCatalog::canonical();
        let store = StoreProfile::new("s1", BaseHeadcount::uniform(1));
        let config = RosterConfig::default();
        let demand = DemandAgent::new(&store, &config.demand).analyze(&horizon());
        Fixture {
            employees,
            catalog,
            store,
            demand,
            config,
        }
    }

    impl Fixture {
        fn validate(&self, roster: &Roster) -> Vec<Conflict> {
            ValidatorAgent::new(
                &self.employees,
                &self.catalog,
                &self.store,
                &self.demand,
                &self.config,
            )
            .validate(roster)
        }
    }

    fn has_kind(conflicts: &[Conflict], kind: ConflictKind) -> bool {
        conflicts.iter().any(|c| c.kind == kind)
    }

    #[test]
    fn test_weekly_hours_overflow_and_underflow() {
        let fx = fixture(vec![
            Employee::new("a", "A", EmploymentType::FullTime, "Counter")
                .available_all(&horizon(), Availability::Available),
            Employee::new("b", "B", EmploymentType::FullTime, "Counter")
                .available_all(&horizon(), Availability::Available),
        ]);
        let mut roster = Roster::new(horizon());
        // a: 7 × 8h = 56h > 48h max. b: 2 × 8h = 16h < 38h min.
        roster.add_schedule(schedule_with(
            &fx.catalog,
            "a",
            false,
            ["1F", "1F", "1F", "1F", "1F", "1F", "1F"],
        ));
        roster.add_schedule(schedule_with(
            &fx.catalog,
            "b",
            false,
            ["1F", "1F", "/", "/", "/", "/", "/"],
        ));

        let conflicts = fx.validate(&roster);
        let overflow: Vec<_> = conflicts
            .iter()
            .filter(|c| c.kind == ConflictKind::WeeklyHoursOverflow)
            .collect();
        assert_eq!(overflow.len(), 1);
        assert_eq!(overflow[0].employee_id.as_deref(), Some("a"));
        assert!(has_kind(&conflicts, ConflictKind::WeeklyHoursUnderflow));
    }

    #[test]
    fn test_consecutive_days_exceeded() {
        let fx = fixture(vec![Employee::new(
            "a",
            "A",
            EmploymentType::FullTime,
            "Counter",
        )
        .with_weekly_hours(0.0, 60.0)
        .available_all(&horizon(), Availability::Available)]);
        let mut roster = Roster::new(horizon());
        roster.add_schedule(schedule_with(
            &fx.catalog,
            "a",
            false,
            ["1F", "1F", "1F", "1F", "1F", "1F", "1F"],
        ));

        let conflicts = fx.validate(&roster);
        let exceeded: Vec<_> = conflicts
            .iter()
            .filter(|c| c.kind == ConflictKind::ConsecutiveDaysExceeded)
            .collect();
        assert_eq!(exceeded.len(), 1);
        assert_eq!(exceeded[0].days.len(), 7);
    }

    #[test]
    fn test_insufficient_rest() {
        let fx = fixture(vec![Employee::new(
            "a",
            "A",
            EmploymentType::Casual,
            "Counter",
        )
        .available_all(&horizon(), Availability::Available)]);
        let mut roster = Roster::new(horizon());
        // 3F ends 23:00, next-day 1F starts 06:30 → 7.5h rest.
        roster.add_schedule(schedule_with(
            &fx.catalog,
            "a",
            false,
            ["3F", "1F", "/", "/", "/", "/", "/"],
        ));

        let conflicts = fx.validate(&roster);
        let rest: Vec<_> = conflicts
            .iter()
            .filter(|c| c.kind == ConflictKind::InsufficientRest)
            .collect();
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].days, vec![day(3), day(4)]);
    }

    #[test]
    fn test_no_manager_on_duty() {
        let fx = fixture(vec![Employee::new(
            "a",
            "A",
            EmploymentType::Casual,
            "Counter",
        )
        .available_all(&horizon(), Availability::Available)]);
        let mut roster = Roster::new(horizon());
        roster.add_schedule(schedule_with(
            &fx.catalog,
            "a",
            false,
            ["1F", "1F", "1F", "/", "/", "1F", "1F"],
        ));

        let conflicts = fx.validate(&roster);
        let missing: Vec<_> = conflicts
            .iter()
            .filter(|c| c.kind == ConflictKind::NoManagerOnDuty)
            .collect();
        // Every day of the week lacks a manager.
        assert_eq!(missing.len(), 7);
    }

    #[test]
    fn test_coverage_conflicts() {
        let fx = fixture(vec![Employee::new(
            "m",
            "M",
            EmploymentType::FullTime,
            "Counter",
        )
        .manager()
        .available_all(&horizon(), Availability::Available)]);
        let mut roster = Roster::new(horizon());
        // M shift covers lunch only: dinner/opening/closing all short.
        roster.add_schedule(schedule_with(
            &fx.catalog,
            "m",
            true,
            ["M", "M", "M", "M", "M", "/", "/"],
        ));

        let conflicts = fx.validate(&roster);
        assert!(has_kind(&conflicts, ConflictKind::PeakUndercoverage));
        assert!(has_kind(&conflicts, ConflictKind::OpeningOrClosingUncovered));
    }

    #[test]
    fn test_station_skill_mismatch() {
        let fx = fixture(vec![Employee::new(
            "a",
            "A",
            EmploymentType::Casual,
            "Counter",
        )
        .available_all(&horizon(), Availability::Available)]);
        let mut roster = Roster::new(horizon());
        let mut schedule =
            schedule_with(&fx.catalog, "a", false, ["S", "/", "/", "/", "/", "/", "/"]);
        // Decoded onto a station the employee is not qualified for.
        if let Some(info) = schedule.shifts.get_mut(&day(3)) {
            info.station = Some("Kitchen".into());
        }
        roster.add_schedule(schedule);

        let conflicts = fx.validate(&roster);
        assert!(has_kind(&conflicts, ConflictKind::StationSkillMismatch));
    }

    #[test]
    fn test_preference_ignored() {
        let saturday = day(8);
        let fx = fixture(vec![Employee::new(
            "a",
            "A",
            EmploymentType::Casual,
            "Counter",
        )
        .available_all(&horizon(), Availability::Available)
        .with_availability(saturday, Availability::Preferred)]);
        let mut roster = Roster::new(horizon());
        // Works Monday (merely available), preferred Saturday stays off.
        roster.add_schedule(schedule_with(
            &fx.catalog,
            "a",
            false,
            ["1F", "/", "/", "/", "/", "/", "/"],
        ));

        let conflicts = fx.validate(&roster);
        let ignored: Vec<_> = conflicts
            .iter()
            .filter(|c| c.kind == ConflictKind::PreferenceIgnored)
            .collect();
        assert_eq!(ignored.len(), 1);
        assert_eq!(ignored[0].days, vec![saturday]);
    }

    #[test]
    fn test_validation_is_idempotent() {
        let fx = fixture(vec![Employee::new(
            "a",
            "A",
            EmploymentType::Casual,
            "Counter",
        )
        .available_all(&horizon(), Availability::Available)]);
        let mut roster = Roster::new(horizon());
        roster.add_schedule(schedule_with(
            &fx.catalog,
            "a",
            false,
            ["3F", "1F", "/", "/", "/", "1F", "/"],
        ));

        let first = fx.validate(&roster);
        let second = fx.validate(&roster);
        assert_eq!(first.len(), second.len());
        for (a, b) in first.iter().zip(second.iter()) {
            assert_eq!(a.key(), b.key());
            assert_eq!(a.description, b.description);
        }
    }
}
