//! Roster conflicts.
//!
//! A conflict records one violated scheduling rule: its kind, severity,
//! a human-readable description, and the employee/days involved. Critical
//! and High conflicts block a `success` status; Medium and Low ship as
//! warnings.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Conflict severity, ordered from least to most severe.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Whether this severity blocks a `success` status.
    pub fn is_blocking(self) -> bool {
        self >= Severity::High
    }
}

/// Classification of roster violations.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ConflictKind {
    WeeklyHoursOverflow,
    WeeklyHoursUnderflow,
    ConsecutiveDaysExceeded,
    InsufficientRest,
    NoManagerOnDuty,
    PeakUndercoverage,
    OpeningOrClosingUncovered,
    StationSkillMismatch,
    WeekendUpliftMissed,
    PreferenceIgnored,
}

impl ConflictKind {
    /// The fixed severity of this kind.
    pub fn severity(self) -> Severity {
        match self {
            ConflictKind::WeeklyHoursOverflow
            | ConflictKind::ConsecutiveDaysExceeded
            | ConflictKind::InsufficientRest
            | ConflictKind::NoManagerOnDuty => Severity::Critical,
            ConflictKind::WeeklyHoursUnderflow
            | ConflictKind::PeakUndercoverage
            | ConflictKind::OpeningOrClosingUncovered => Severity::High,
            ConflictKind::StationSkillMismatch => Severity::Medium,
            ConflictKind::WeekendUpliftMissed | ConflictKind::PreferenceIgnored => Severity::Low,
        }
    }
}

/// One violated scheduling rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conflict {
    pub kind: ConflictKind,
    pub severity: Severity,
    pub description: String,
    pub employee_id: Option<String>,
    pub days: Vec<NaiveDate>,
}

impl Conflict {
    /// Creates a conflict with the kind's fixed severity.
    pub fn new(kind: ConflictKind, description: impl Into<String>) -> Self {
        Self {
            kind,
            severity: kind.severity(),
            description: description.into(),
            employee_id: None,
            days: Vec::new(),
        }
    }

    /// Attaches the employee involved.
    pub fn for_employee(mut self, employee_id: impl Into<String>) -> Self {
        self.employee_id = Some(employee_id.into());
        self
    }

    /// Attaches one affected day.
    pub fn on_day(mut self, day: NaiveDate) -> Self {
        self.days.push(day);
        self
    }

    /// Attaches several affected days.
    pub fn on_days(mut self, days: impl IntoIterator<Item = NaiveDate>) -> Self {
        self.days.extend(days);
        self
    }

    /// Whether this conflict blocks a `success` status.
    pub fn is_blocking(&self) -> bool {
        self.severity.is_blocking()
    }

    /// Stable identity used to compare conflict sets across validations
    /// and to track resolution progress.
    pub fn key(&self) -> (ConflictKind, Option<String>, Vec<NaiveDate>) {
        (self.kind, self.employee_id.clone(), self.days.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, d).unwrap()
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Critical > Severity::High);
        assert!(Severity::High > Severity::Medium);
        assert!(Severity::Medium > Severity::Low);
        assert!(Severity::Critical.is_blocking());
        assert!(Severity::High.is_blocking());
        assert!(!Severity::Medium.is_blocking());
        assert!(!Severity::Low.is_blocking());
    }

    #[test]
    fn test_kind_severities() {
        assert_eq!(
            ConflictKind::InsufficientRest.severity(),
            Severity::Critical
        );
        assert_eq!(
            ConflictKind::PeakUndercoverage.severity(),
            Severity::High
        );
        assert_eq!(
            ConflictKind::StationSkillMismatch.severity(),
            Severity::Medium
        );
        assert_eq!(
            ConflictKind::PreferenceIgnored.severity(),
            Severity::Low
        );
    }

    #[test]
    fn test_conflict_builder_and_key() {
        let c = Conflict::new(ConflictKind::InsufficientRest, "short rest")
            .for_employee("e1")
            .on_days([day(3), day(4)]);

        assert_eq!(c.severity, Severity::Critical);
        assert!(c.is_blocking());
        assert_eq!(c.days.len(), 2);

        let same = Conflict::new(ConflictKind::InsufficientRest, "other wording")
            .for_employee("e1")
            .on_days([day(3), day(4)]);
        assert_eq!(c.key(), same.key());
    }

    #[test]
    fn test_kind_serializes_snake_case() {
        let json = serde_json::to_string(&ConflictKind::NoManagerOnDuty).unwrap();
        assert_eq!(json, "\"no_manager_on_duty\"");
    }
}
