//! Roster (solution) model.
//!
//! A roster is a total assignment: for every employee and every day of the
//! horizon, exactly one shift code (the off code `/` included). It is
//! created by the scheduler, patched only by the resolver, and frozen once
//! the pipeline exits.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::employee::EmploymentType;
use super::shift::{ShiftCatalog, OFF_CODE};
use super::store::{Interval, TradingHours};

/// One decoded shift cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShiftInfo {
    /// Shift code symbol.
    pub code: String,
    /// Shift name from the catalog.
    pub name: String,
    /// Paid hours.
    pub hours: f64,
    /// Station worked; `None` for off days.
    pub station: Option<String>,
}

impl ShiftInfo {
    /// The off-day cell.
    pub fn off() -> Self {
        Self {
            code: OFF_CODE.into(),
            name: "Day Off".into(),
            hours: 0.0,
            station: None,
        }
    }

    /// Whether this cell is a day off.
    pub fn is_off(&self) -> bool {
        self.code == OFF_CODE
    }
}

/// One employee's row of the roster.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmployeeSchedule {
    pub employee_id: String,
    pub name: String,
    pub employment_type: EmploymentType,
    pub is_manager: bool,
    pub primary_station: String,
    /// Shift per day; a total map over the horizon.
    pub shifts: std::collections::BTreeMap<NaiveDate, ShiftInfo>,
    /// Sum of paid hours over the horizon.
    pub total_hours: f64,
}

impl EmployeeSchedule {
    /// The cell for a day, defaulting to off for days outside the map.
    pub fn shift_on(&self, day: NaiveDate) -> ShiftInfo {
        self.shifts.get(&day).cloned().unwrap_or_else(ShiftInfo::off)
    }

    /// Whether the employee works on a day.
    pub fn works_on(&self, day: NaiveDate) -> bool {
        self.shifts.get(&day).map(|s| !s.is_off()).unwrap_or(false)
    }

    /// Recomputes `total_hours` from the cells.
    pub fn recompute_total_hours(&mut self) {
        self.total_hours = self.shifts.values().map(|s| s.hours).sum();
    }

    /// Paid hours over a sub-range of days.
    pub fn hours_over(&self, days: &[NaiveDate]) -> f64 {
        days.iter().map(|d| self.shift_on(*d).hours).sum()
    }
}

/// A complete roster over a horizon.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Roster {
    /// Ordered horizon days.
    pub days: Vec<NaiveDate>,
    /// One row per employee, in input order.
    pub schedules: Vec<EmployeeSchedule>,
}

impl Roster {
    /// Creates an empty roster over a horizon.
    pub fn new(days: Vec<NaiveDate>) -> Self {
        Self {
            days,
            schedules: Vec::new(),
        }
    }

    /// Adds an employee row.
    pub fn add_schedule(&mut self, schedule: EmployeeSchedule) {
        self.schedules.push(schedule);
    }

    /// Finds an employee row.
    pub fn schedule(&self, employee_id: &str) -> Option<&EmployeeSchedule> {
        self.schedules.iter().find(|s| s.employee_id == employee_id)
    }

    /// Finds an employee row mutably.
    pub fn schedule_mut(&mut self, employee_id: &str) -> Option<&mut EmployeeSchedule> {
        self.schedules
            .iter_mut()
            .find(|s| s.employee_id == employee_id)
    }

    /// Shift code assigned to an employee on a day (off if absent).
    pub fn code_on(&self, employee_id: &str, day: NaiveDate) -> String {
        self.schedule(employee_id)
            .map(|s| s.shift_on(day).code)
            .unwrap_or_else(|| OFF_CODE.into())
    }

    /// Number of employees working any shift on a day.
    pub fn working_count(&self, day: NaiveDate) -> usize {
        self.schedules.iter().filter(|s| s.works_on(day)).count()
    }

    /// Number of managers working any shift on a day.
    pub fn managers_working(&self, day: NaiveDate) -> usize {
        self.schedules
            .iter()
            .filter(|s| s.is_manager && s.works_on(day))
            .count()
    }

    /// Headcount on a day whose assigned code staffs `interval`.
    pub fn coverage(
        &self,
        day: NaiveDate,
        interval: Interval,
        catalog: &ShiftCatalog,
        hours: &TradingHours,
    ) -> usize {
        self.schedules
            .iter()
            .filter(|s| {
                let cell = s.shift_on(day);
                catalog
                    .get(&cell.code)
                    .map(|c| c.covers(interval, hours))
                    .unwrap_or(false)
            })
            .count()
    }

    /// Managers on a day whose assigned code staffs `interval`.
    pub fn manager_coverage(
        &self,
        day: NaiveDate,
        interval: Interval,
        catalog: &ShiftCatalog,
        hours: &TradingHours,
    ) -> usize {
        self.schedules
            .iter()
            .filter(|s| s.is_manager)
            .filter(|s| {
                let cell = s.shift_on(day);
                catalog
                    .get(&cell.code)
                    .map(|c| c.covers(interval, hours))
                    .unwrap_or(false)
            })
            .count()
    }

    /// Number of weekend days an employee works.
    pub fn weekend_shifts(&self, employee_id: &str) -> usize {
        use chrono::Datelike;
        self.schedule(employee_id)
            .map(|s| {
                self.days
                    .iter()
                    .filter(|d| d.weekday().number_from_monday() >= 6 && s.works_on(**d))
                    .count()
            })
            .unwrap_or(0)
    }

    /// Number of employee rows.
    pub fn employee_count(&self) -> usize {
        self.schedules.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, d).unwrap()
    }

    fn cell(catalog: &ShiftCatalog, code: &str) -> ShiftInfo {
        let def = catalog.get(code).unwrap();
        ShiftInfo {
            code: def.code.clone(),
            name: def.name.clone(),
            hours: def.hours,
            station: None,
        }
    }

    fn sample_roster() -> (Roster, ShiftCatalog) {
        let catalog = ShiftCatalog::canonical();
        // 2025-03-03 is a Monday.
        let days: Vec<NaiveDate> = (3..10).map(day).collect();
        let mut roster = Roster::new(days.clone());

        let mut mgr_shifts = BTreeMap::new();
        mgr_shifts.insert(day(3), cell(&catalog, "SC"));
        mgr_shifts.insert(day(4), cell(&catalog, "M"));
        for d in 5..10 {
            mgr_shifts.insert(day(d), ShiftInfo::off());
        }
        let mut mgr = EmployeeSchedule {
            employee_id: "m1".into(),
            name: "Mo".into(),
            employment_type: EmploymentType::FullTime,
            is_manager: true,
            primary_station: "Counter".into(),
            shifts: mgr_shifts,
            total_hours: 0.0,
        };
        mgr.recompute_total_hours();
        roster.add_schedule(mgr);

        let mut crew_shifts = BTreeMap::new();
        crew_shifts.insert(day(3), cell(&catalog, "1F"));
        crew_shifts.insert(day(4), cell(&catalog, "3F"));
        // Saturday 2025-03-08 worked.
        crew_shifts.insert(day(8), cell(&catalog, "2F"));
        for d in [5, 6, 7, 9] {
            crew_shifts.insert(day(d), ShiftInfo::off());
        }
        let mut crew = EmployeeSchedule {
            employee_id: "c1".into(),
            name: "Cy".into(),
            employment_type: EmploymentType::Casual,
            is_manager: false,
            primary_station: "Kitchen".into(),
            shifts: crew_shifts,
            total_hours: 0.0,
        };
        crew.recompute_total_hours();
        roster.add_schedule(crew);

        (roster, catalog)
    }

    #[test]
    fn test_total_hours() {
        let (roster, _) = sample_roster();
        assert_eq!(roster.schedule("m1").unwrap().total_hours, 16.0);
        assert_eq!(roster.schedule("c1").unwrap().total_hours, 24.0);
    }

    #[test]
    fn test_working_and_manager_counts() {
        let (roster, _) = sample_roster();
        assert_eq!(roster.working_count(day(3)), 2);
        assert_eq!(roster.managers_working(day(3)), 1);
        assert_eq!(roster.managers_working(day(8)), 0);
        assert_eq!(roster.working_count(day(9)), 0);
    }

    #[test]
    fn test_interval_coverage() {
        let (roster, catalog) = sample_roster();
        let hours = TradingHours::default();
        // Monday: SC (lunch+dinner) + 1F (opening+lunch).
        assert_eq!(roster.coverage(day(3), Interval::LunchPeak, &catalog, &hours), 2);
        assert_eq!(roster.coverage(day(3), Interval::Opening, &catalog, &hours), 1);
        assert_eq!(roster.coverage(day(3), Interval::Closing, &catalog, &hours), 0);
        assert_eq!(
            roster.manager_coverage(day(3), Interval::DinnerPeak, &catalog, &hours),
            1
        );
    }

    #[test]
    fn test_weekend_shifts() {
        let (roster, _) = sample_roster();
        assert_eq!(roster.weekend_shifts("c1"), 1); // Saturday 2F
        assert_eq!(roster.weekend_shifts("m1"), 0);
    }

    #[test]
    fn test_code_on_defaults_to_off() {
        let (roster, _) = sample_roster();
        assert_eq!(roster.code_on("c1", day(5)), "/");
        assert_eq!(roster.code_on("missing", day(3)), "/");
    }

    #[test]
    fn test_shift_info_off() {
        let off = ShiftInfo::off();
        assert!(off.is_off());
        assert_eq!(off.hours, 0.0);
        assert!(off.station.is_none());
    }
}
