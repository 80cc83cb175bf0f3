//! Shift code catalog.
//!
//! A shift code is a short symbol selecting a canonical tuple of
//! (clock window, paid hours, station, manager-required). The catalog
//! owns the code definitions and derives rest-gap compatibility between
//! consecutive-day pairs from the clock windows.
//!
//! Peak coverage is carried as explicit flags rather than recomputed from
//! the window: a shift that ends at 20:30 still staffs the dinner rush.

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::store::{Interval, TradingHours};

/// The off-day code.
pub const OFF_CODE: &str = "/";

/// A shift's clock span within one civil day, end-inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShiftWindow {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl ShiftWindow {
    /// Creates a window from (hour, minute) pairs.
    pub fn new(start_h: u32, start_m: u32, end_h: u32, end_m: u32) -> Self {
        Self {
            start: NaiveTime::from_hms_opt(start_h, start_m, 0)
                .unwrap_or(NaiveTime::MIN),
            end: NaiveTime::from_hms_opt(end_h, end_m, 0).unwrap_or(NaiveTime::MIN),
        }
    }

    /// Whether the shift is on the clock at `time`.
    ///
    /// The end boundary is inclusive so a 14:30–23:00 shift counts as
    /// present for a 23:00 close.
    pub fn active_at(&self, time: NaiveTime) -> bool {
        self.start <= time && time <= self.end
    }

    /// Minutes from midnight to the window start.
    pub fn start_minutes(&self) -> i64 {
        self.start.signed_duration_since(NaiveTime::MIN).num_minutes()
    }

    /// Minutes from midnight to the window end.
    pub fn end_minutes(&self) -> i64 {
        self.end.signed_duration_since(NaiveTime::MIN).num_minutes()
    }
}

/// A shift code definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShiftCode {
    /// Short symbol (`/`, `S`, `1F`, ...).
    pub code: String,
    /// Human-readable name.
    pub name: String,
    /// Paid hours.
    pub hours: f64,
    /// Station this code is bound to; `None` = any station.
    pub station: Option<String>,
    /// Clock window; `None` for the off code.
    pub window: Option<ShiftWindow>,
    /// Only managers may take this code.
    pub requires_manager: bool,
    /// Staffs the 11:00–14:00 lunch rush.
    pub covers_lunch_peak: bool,
    /// Staffs the 17:00–21:00 dinner rush.
    pub covers_dinner_peak: bool,
}

impl ShiftCode {
    /// Creates a working code with a clock window.
    pub fn new(
        code: impl Into<String>,
        name: impl Into<String>,
        window: ShiftWindow,
        hours: f64,
    ) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            hours,
            station: None,
            window: Some(window),
            requires_manager: false,
            covers_lunch_peak: false,
            covers_dinner_peak: false,
        }
    }

    /// Creates the off-day code.
    pub fn off() -> Self {
        Self {
            code: OFF_CODE.into(),
            name: "Day Off".into(),
            hours: 0.0,
            station: None,
            window: None,
            requires_manager: false,
            covers_lunch_peak: false,
            covers_dinner_peak: false,
        }
    }

    /// Restricts the code to managers.
    pub fn manager_only(mut self) -> Self {
        self.requires_manager = true;
        self
    }

    /// Binds the code to a station.
    pub fn with_station(mut self, station: impl Into<String>) -> Self {
        self.station = Some(station.into());
        self
    }

    /// Marks the code as staffing the lunch rush.
    pub fn lunch_peak(mut self) -> Self {
        self.covers_lunch_peak = true;
        self
    }

    /// Marks the code as staffing the dinner rush.
    pub fn dinner_peak(mut self) -> Self {
        self.covers_dinner_peak = true;
        self
    }

    /// Whether this is the off-day code.
    pub fn is_off(&self) -> bool {
        self.code == OFF_CODE
    }

    /// Whether the code puts the employee on the clock.
    pub fn is_working(&self) -> bool {
        !self.is_off()
    }

    /// Whether this code staffs a named interval of the trading day.
    pub fn covers(&self, interval: Interval, hours: &TradingHours) -> bool {
        match interval {
            Interval::Opening => self
                .window
                .map(|w| w.active_at(hours.opening))
                .unwrap_or(false),
            Interval::Closing => self
                .window
                .map(|w| w.active_at(hours.closing))
                .unwrap_or(false),
            Interval::LunchPeak => self.covers_lunch_peak,
            Interval::DinnerPeak => self.covers_dinner_peak,
        }
    }

    /// Rest gap, in hours, between this code ending today and `next`
    /// starting tomorrow. `None` if either side is an off day.
    pub fn rest_before(&self, next: &ShiftCode) -> Option<f64> {
        let end = self.window?.end_minutes();
        let start = next.window?.start_minutes();
        Some((1440 - end + start) as f64 / 60.0)
    }
}

/// The set of shift codes available to a store.
///
/// Indexed by code symbol; iteration order is the insertion order so the
/// decision-tensor layout is stable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShiftCatalog {
    codes: Vec<ShiftCode>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl ShiftCatalog {
    /// Creates a catalog containing only the off code.
    pub fn new() -> Self {
        let mut catalog = Self {
            codes: Vec::new(),
            index: HashMap::new(),
        };
        catalog.add(ShiftCode::off());
        catalog
    }

    /// The canonical retail catalog.
    ///
    /// Windows are chosen so that `2F` ending 20:30 leaves exactly the
    /// 10-hour legal rest before a 06:30 start, while `3F` ending 23:00
    /// does not.
    pub fn canonical() -> Self {
        let mut catalog = Self::new();
        catalog.add(
            ShiftCode::new("S", "Short", ShiftWindow::new(10, 30, 14, 30), 4.0).lunch_peak(),
        );
        catalog.add(
            ShiftCode::new("1F", "First Full", ShiftWindow::new(6, 30, 15, 0), 8.0).lunch_peak(),
        );
        catalog.add(
            ShiftCode::new("2F", "Second Full", ShiftWindow::new(12, 0, 20, 30), 8.0)
                .dinner_peak(),
        );
        catalog.add(
            ShiftCode::new("3F", "Third Full", ShiftWindow::new(14, 30, 23, 0), 8.0)
                .dinner_peak(),
        );
        catalog.add(
            ShiftCode::new("SC", "Shift Lead", ShiftWindow::new(11, 0, 19, 30), 8.0)
                .manager_only()
                .lunch_peak()
                .dinner_peak(),
        );
        catalog.add(
            ShiftCode::new("M", "Manager Day", ShiftWindow::new(8, 0, 16, 30), 8.0)
                .manager_only()
                .lunch_peak(),
        );
        catalog
    }

    /// Adds a code, replacing any existing definition with the same symbol.
    pub fn add(&mut self, code: ShiftCode) {
        if let Some(&i) = self.index.get(&code.code) {
            self.codes[i] = code;
        } else {
            self.index.insert(code.code.clone(), self.codes.len());
            self.codes.push(code);
        }
    }

    /// Builder: adds a code and returns self.
    pub fn with_code(mut self, code: ShiftCode) -> Self {
        self.add(code);
        self
    }

    /// Looks up a code by symbol.
    pub fn get(&self, code: &str) -> Option<&ShiftCode> {
        self.index.get(code).map(|&i| &self.codes[i])
    }

    /// Position of a code in the catalog order.
    pub fn position(&self, code: &str) -> Option<usize> {
        self.index.get(code).copied()
    }

    /// All codes in catalog order (off code included).
    pub fn codes(&self) -> &[ShiftCode] {
        &self.codes
    }

    /// Working (non-off) codes in catalog order.
    pub fn working_codes(&self) -> impl Iterator<Item = &ShiftCode> {
        self.codes.iter().filter(|c| c.is_working())
    }

    /// Number of codes, off included.
    pub fn len(&self) -> usize {
        self.codes.len()
    }

    /// Whether the catalog has no codes.
    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    /// Paid hours for a code symbol (0.0 for unknown codes).
    pub fn hours_for(&self, code: &str) -> f64 {
        self.get(code).map(|c| c.hours).unwrap_or(0.0)
    }

    /// Pairs `(today, tomorrow)` of working codes whose back-to-back
    /// assignment leaves less than `min_rest_hours` of rest.
    pub fn forbidden_rest_pairs(&self, min_rest_hours: f64) -> Vec<(&ShiftCode, &ShiftCode)> {
        let mut pairs = Vec::new();
        for today in self.working_codes() {
            for tomorrow in self.working_codes() {
                if let Some(rest) = today.rest_before(tomorrow) {
                    if rest < min_rest_hours {
                        pairs.push((today, tomorrow));
                    }
                }
            }
        }
        pairs
    }

    /// Rebuilds the symbol index after deserialization.
    pub fn reindex(&mut self) {
        self.index = self
            .codes
            .iter()
            .enumerate()
            .map(|(i, c)| (c.code.clone(), i))
            .collect();
    }
}

impl Default for ShiftCatalog {
    fn default() -> Self {
        Self::canonical()
    }
}
