//! Employee model.
//!
//! An employee carries an employment type (which fixes the default weekly
//! hours window), station qualifications, managerial status, and a per-day
//! availability calendar over the planning horizon.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::config::LaborRules;

/// Employment classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EmploymentType {
    FullTime,
    PartTime,
    Casual,
}

impl EmploymentType {
    /// Display label matching payroll conventions.
    pub fn label(self) -> &'static str {
        match self {
            EmploymentType::FullTime => "Full-Time",
            EmploymentType::PartTime => "Part-Time",
            EmploymentType::Casual => "Casual",
        }
    }
}

/// Availability of an employee on one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Availability {
    /// Must not be rostered; any working code is forbidden.
    Unavailable,
    /// May be rostered.
    Available,
    /// May be rostered, and would like to be.
    Preferred,
}

impl Availability {
    /// Whether any working shift may be assigned.
    pub fn allows_work(self) -> bool {
        !matches!(self, Availability::Unavailable)
    }
}

/// An employee available for rostering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Employee {
    /// Stable identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Employment classification.
    pub employment_type: EmploymentType,
    /// Whether the employee can hold manager-only shifts.
    pub is_manager: bool,
    /// Home station.
    pub primary_station: String,
    /// Additional stations the employee is certified for.
    pub cross_trained_stations: BTreeSet<String>,
    /// Weekly hours floor; `None` = employment-type default.
    pub min_weekly_hours: Option<f64>,
    /// Weekly hours ceiling; `None` = employment-type default.
    pub max_weekly_hours: Option<f64>,
    /// Availability per day of the horizon.
    pub availability: BTreeMap<NaiveDate, Availability>,
}

impl Employee {
    /// Creates an employee with the given ID, name, and home station.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        employment_type: EmploymentType,
        primary_station: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            employment_type,
            is_manager: false,
            primary_station: primary_station.into(),
            cross_trained_stations: BTreeSet::new(),
            min_weekly_hours: None,
            max_weekly_hours: None,
            availability: BTreeMap::new(),
        }
    }

    /// Grants managerial status.
    pub fn manager(mut self) -> Self {
        self.is_manager = true;
        self
    }

    /// Adds a cross-trained station.
    pub fn cross_trained(mut self, station: impl Into<String>) -> Self {
        self.cross_trained_stations.insert(station.into());
        self
    }

    /// Overrides the weekly hours window.
    pub fn with_weekly_hours(mut self, min: f64, max: f64) -> Self {
        self.min_weekly_hours = Some(min);
        self.max_weekly_hours = Some(max);
        self
    }

    /// Sets availability for one day.
    pub fn with_availability(mut self, day: NaiveDate, availability: Availability) -> Self {
        self.availability.insert(day, availability);
        self
    }

    /// Sets the same availability for every day of `horizon`.
    pub fn available_all(mut self, horizon: &[NaiveDate], availability: Availability) -> Self {
        for &day in horizon {
            self.availability.insert(day, availability);
        }
        self
    }

    /// Availability on a day; `None` if the calendar has no entry.
    pub fn availability_on(&self, day: NaiveDate) -> Option<Availability> {
        self.availability.get(&day).copied()
    }

    /// Effective weekly hours window, falling back to the labor-rule
    /// defaults for the employment type.
    pub fn weekly_hours_window(&self, rules: &LaborRules) -> (f64, f64) {
        let (def_min, def_max) = rules.weekly_hours(self.employment_type);
        (
            self.min_weekly_hours.unwrap_or(def_min),
            self.max_weekly_hours.unwrap_or(def_max),
        )
    }

    /// Whether the employee is qualified for a station.
    pub fn works_station(&self, station: &str) -> bool {
        self.primary_station == station || self.cross_trained_stations.contains(station)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, d).unwrap()
    }

    #[test]
    fn test_employee_builder() {
        let e = Employee::new("e1", "Ava", EmploymentType::PartTime, "Kitchen")
            .cross_trained("Counter")
            .with_availability(day(3), Availability::Preferred);

        assert_eq!(e.id, "e1");
        assert!(!e.is_manager);
        assert!(e.works_station("Kitchen"));
        assert!(e.works_station("Counter"));
        assert!(!e.works_station("McCafe"));
        assert_eq!(e.availability_on(day(3)), Some(Availability::Preferred));
        assert_eq!(e.availability_on(day(4)), None);
    }

    #[test]
    fn test_weekly_hours_defaults() {
        let rules = LaborRules::default();
        let full = Employee::new("f", "F", EmploymentType::FullTime, "Counter");
        assert_eq!(full.weekly_hours_window(&rules), (38.0, 48.0));

        let fixed = Employee::new("c", "C", EmploymentType::Casual, "Counter")
            .with_weekly_hours(8.0, 24.0);
        assert_eq!(fixed.weekly_hours_window(&rules), (8.0, 24.0));
    }

    #[test]
    fn test_availability_allows_work() {
        assert!(!Availability::Unavailable.allows_work());
        assert!(Availability::Available.allows_work());
        assert!(Availability::Preferred.allows_work());
    }

    #[test]
    fn test_available_all() {
        let horizon: Vec<NaiveDate> = (3..10).map(day).collect();
        let e = Employee::new("e", "E", EmploymentType::Casual, "Counter")
            .available_all(&horizon, Availability::Available);
        assert_eq!(e.availability.len(), 7);
        assert!(horizon
            .iter()
            .all(|d| e.availability_on(*d) == Some(Availability::Available)));
    }
}
