//! Demand agent.
//!
//! Derives the per-day, per-interval staffing requirement table from the
//! store profile: weekday/weekend shaping, meal-peak uplift, and the
//! opening/closing floors. The output table is fixed for the rest of the
//! run and consumed by the scheduler, validator, and metrics.
//!
//! This agent never fails on well-formed input; malformed input is caught
//! by [`crate::validation`] before the pipeline starts.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use tracing::debug;

use crate::config::DemandKnobs;
use crate::models::{Interval, StoreProfile};

/// Requirements for one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayDemand {
    pub is_weekend: bool,
    /// Required headcount per interval, in [`Interval::ALL`] order.
    pub required: [u32; 4],
}

impl DayDemand {
    /// Required headcount for one interval.
    pub fn required(&self, interval: Interval) -> u32 {
        let idx = Interval::ALL
            .iter()
            .position(|&i| i == interval)
            .unwrap_or(0);
        self.required[idx]
    }
}

/// The per-day requirement table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DemandTable {
    rows: BTreeMap<NaiveDate, DayDemand>,
}

impl DemandTable {
    /// Requirements for a day; zero for days outside the horizon.
    pub fn day(&self, day: NaiveDate) -> DayDemand {
        self.rows.get(&day).copied().unwrap_or(DayDemand {
            is_weekend: is_weekend(day),
            required: [0; 4],
        })
    }

    /// Required headcount at one (day, interval).
    pub fn required(&self, day: NaiveDate, interval: Interval) -> u32 {
        self.day(day).required(interval)
    }

    /// Number of days in the table.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Whether a civil date falls on Saturday or Sunday.
pub fn is_weekend(day: NaiveDate) -> bool {
    day.weekday().number_from_monday() >= 6
}

/// Analyzes staffing demand over the horizon.
#[derive(Debug, Clone)]
pub struct DemandAgent<'a> {
    store: &'a StoreProfile,
    knobs: &'a DemandKnobs,
}

impl<'a> DemandAgent<'a> {
    /// Creates the agent for a store.
    pub fn new(store: &'a StoreProfile, knobs: &'a DemandKnobs) -> Self {
        Self { store, knobs }
    }

    /// Builds the requirement table for the horizon.
    pub fn analyze(&self, horizon: &[NaiveDate]) -> DemandTable {
        let mut rows = BTreeMap::new();
        for &day in horizon {
            let weekend = is_weekend(day);
            let weekend_factor = if weekend {
                1.0 + self.knobs.weekend_uplift_pct / 100.0
            } else {
                1.0
            };

            let mut required = [0u32; 4];
            for (idx, &interval) in Interval::ALL.iter().enumerate() {
                let base = f64::from(self.store.base.get(interval));
                let peak_factor = if interval.is_peak() {
                    self.knobs.peak_uplift
                } else {
                    1.0
                };
                let mut need = (base * weekend_factor * peak_factor).ceil() as u32;
                need = match interval {
                    Interval::Opening => need.max(self.knobs.min_opening),
                    Interval::Closing => need.max(self.knobs.min_closing),
                    _ => need,
                };
                required[idx] = need;
            }

            rows.insert(
                day,
                DayDemand {
                    is_weekend: weekend,
                    required,
                },
            );
        }

        debug!(days = rows.len(), "demand table built");
        DemandTable { rows }
    }

    /// Opaque per-day summary shipped in the response.
    pub fn summary(&self, table: &DemandTable) -> Map<String, Value> {
        let mut by_day = Map::new();
        for (day, demand) in &table.rows {
            let mut periods = Map::new();
            for (idx, &interval) in Interval::ALL.iter().enumerate() {
                periods.insert(
                    interval.label().to_string(),
                    json!({
                        "min_staff": demand.required[idx],
                        "priority": if interval.is_peak() { "critical" } else { "high" },
                    }),
                );
            }
            by_day.insert(
                day.to_string(),
                json!({
                    "is_weekend": demand.is_weekend,
                    "periods": Value::Object(periods),
                }),
            );
        }

        let weekend_days = table.rows.values().filter(|d| d.is_weekend).count();
        let mut summary = Map::new();
        summary.insert("store_id".into(), json!(self.store.store_id));
        summary.insert("demand_by_day".into(), Value::Object(by_day));
        summary.insert("total_days".into(), json!(table.len()));
        summary.insert("weekend_days".into(), json!(weekend_days));
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BaseHeadcount;

    fn horizon() -> Vec<NaiveDate> {
        // Monday 2025-03-03 through Sunday 2025-03-09.
        (3..10)
            .map(|d| NaiveDate::from_ymd_opt(2025, 3, d).unwrap())
            .collect()
    }

    #[test]
    fn test_weekend_detection() {
        assert!(!is_weekend(NaiveDate::from_ymd_opt(2025, 3, 7).unwrap())); // Friday
        assert!(is_weekend(NaiveDate::from_ymd_opt(2025, 3, 8).unwrap())); // Saturday
        assert!(is_weekend(NaiveDate::from_ymd_opt(2025, 3, 9).unwrap())); // Sunday
    }

    #[test]
    fn test_weekend_uplift_rounds_up() {
        let store = StoreProfile::new("s1", BaseHeadcount::uniform(4));
        let knobs = DemandKnobs::default();
        let table = DemandAgent::new(&store, &knobs).analyze(&horizon());

        let monday = NaiveDate::from_ymd_opt(2025, 3, 3).unwrap();
        let saturday = NaiveDate::from_ymd_opt(2025, 3, 8).unwrap();
        assert_eq!(table.required(monday, Interval::LunchPeak), 4);
        // 4 × 1.2 = 4.8 → 5.
        assert_eq!(table.required(saturday, Interval::LunchPeak), 5);
        assert_eq!(table.required(saturday, Interval::DinnerPeak), 5);
        assert!(table.day(saturday).is_weekend);
    }

    #[test]
    fn test_opening_closing_floors() {
        let store = StoreProfile::new("s1", BaseHeadcount::uniform(0));
        let knobs = DemandKnobs::default();
        let table = DemandAgent::new(&store, &knobs).analyze(&horizon());

        let monday = NaiveDate::from_ymd_opt(2025, 3, 3).unwrap();
        assert_eq!(table.required(monday, Interval::Opening), 1);
        assert_eq!(table.required(monday, Interval::Closing), 1);
        assert_eq!(table.required(monday, Interval::LunchPeak), 0);
    }

    #[test]
    fn test_peak_uplift_multiplier() {
        let store = StoreProfile::new("s1", BaseHeadcount::uniform(4));
        let knobs = DemandKnobs {
            peak_uplift: 1.5,
            ..DemandKnobs::default()
        };
        let table = DemandAgent::new(&store, &knobs).analyze(&horizon());
        let monday = NaiveDate::from_ymd_opt(2025, 3, 3).unwrap();
        // Peaks uplifted, shoulders untouched.
        assert_eq!(table.required(monday, Interval::LunchPeak), 6);
        assert_eq!(table.required(monday, Interval::Opening), 4);
    }

    #[test]
    fn test_summary_shape() {
        let store = StoreProfile::new("s1", BaseHeadcount::uniform(2));
        let knobs = DemandKnobs::default();
        let agent = DemandAgent::new(&store, &knobs);
        let table = agent.analyze(&horizon());
        let summary = agent.summary(&table);

        assert_eq!(summary.get("total_days"), Some(&json!(7)));
        assert_eq!(summary.get("weekend_days"), Some(&json!(2)));
        let by_day = summary.get("demand_by_day").unwrap().as_object().unwrap();
        assert_eq!(by_day.len(), 7);
        assert!(by_day.get("2025-03-08").unwrap()["is_weekend"]
            .as_bool()
            .unwrap());
    }

    #[test]
    fn test_outside_horizon_is_zero() {
        let store = StoreProfile::new("s1", BaseHeadcount::uniform(3));
        let knobs = DemandKnobs::default();
        let table = DemandAgent::new(&store, &knobs).analyze(&horizon());
        let outside = NaiveDate::from_ymd_opt(2025, 4, 1).unwrap();
        assert_eq!(table.required(outside, Interval::LunchPeak), 0);
    }
}
