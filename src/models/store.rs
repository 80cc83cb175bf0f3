//! Store profile and trading-day intervals.
//!
//! A store declares its trading hours and a base headcount for each named
//! interval of the day. The demand agent turns this profile into the
//! per-day requirement table the scheduler consumes.

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

/// Named intervals of the trading day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Interval {
    /// First half hour after doors open (06:30).
    Opening,
    /// Lunch rush, 11:00–14:00.
    LunchPeak,
    /// Dinner rush, 17:00–21:00.
    DinnerPeak,
    /// Last half hour before close (23:00).
    Closing,
}

impl Interval {
    /// All intervals in trading-day order.
    pub const ALL: [Interval; 4] = [
        Interval::Opening,
        Interval::LunchPeak,
        Interval::DinnerPeak,
        Interval::Closing,
    ];

    /// Whether this is one of the meal rushes.
    pub fn is_peak(self) -> bool {
        matches!(self, Interval::LunchPeak | Interval::DinnerPeak)
    }

    /// Snake-case label used in reports.
    pub fn label(self) -> &'static str {
        match self {
            Interval::Opening => "opening",
            Interval::LunchPeak => "lunch_peak",
            Interval::DinnerPeak => "dinner_peak",
            Interval::Closing => "closing",
        }
    }
}

/// Trading-day clock anchors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradingHours {
    /// Doors open; opening coverage means a shift active at this time.
    pub opening: NaiveTime,
    /// Doors close; closing coverage means a shift active at this time.
    pub closing: NaiveTime,
}

impl Default for TradingHours {
    fn default() -> Self {
        Self {
            opening: NaiveTime::from_hms_opt(6, 30, 0).expect("valid opening time"),
            closing: NaiveTime::from_hms_opt(23, 0, 0).expect("valid closing time"),
        }
    }
}

/// Per-interval base headcount.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseHeadcount {
    pub opening: u32,
    pub lunch_peak: u32,
    pub dinner_peak: u32,
    pub closing: u32,
}

impl BaseHeadcount {
    /// Uniform headcount across all intervals.
    pub fn uniform(count: u32) -> Self {
        Self {
            opening: count,
            lunch_peak: count,
            dinner_peak: count,
            closing: count,
        }
    }

    /// Headcount for one interval.
    pub fn get(&self, interval: Interval) -> u32 {
        match interval {
            Interval::Opening => self.opening,
            Interval::LunchPeak => self.lunch_peak,
            Interval::DinnerPeak => self.dinner_peak,
            Interval::Closing => self.closing,
        }
    }
}

/// A store's static profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreProfile {
    /// Stable store identifier.
    pub store_id: String,
    /// Base demand per interval, before weekend/peak shaping.
    pub base: BaseHeadcount,
    /// Trading-day clock anchors.
    pub hours: TradingHours,
}

impl StoreProfile {
    /// Creates a profile with default trading hours.
    pub fn new(store_id: impl Into<String>, base: BaseHeadcount) -> Self {
        Self {
            store_id: store_id.into(),
            base,
            hours: TradingHours::default(),
        }
    }

    /// Overrides the trading hours.
    pub fn with_hours(mut self, hours: TradingHours) -> Self {
        self.hours = hours;
        self
    }
}
