//! Matcher agent.
//!
//! Builds, for every (employee, shift code) pair, a hard eligibility flag
//! and a soft compatibility score. Eligibility filters the decision
//! tensor; the score feeds the objective as a preference coefficient.
//!
//! Scoring: 10 for a primary-station match (station-free codes count as
//! primary — the employee works their home station), 5 for a cross-trained
//! station, plus 2 when a manager takes a manager-only code. The per-day
//! Preferred-availability bonus is applied by the scheduler, not here.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use tracing::debug;

use crate::models::{Employee, ShiftCatalog};

/// Eligibility and score grids, indexed by (employee index, code index)
/// in input/catalog order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SkillMatrix {
    employees: usize,
    codes: usize,
    eligible: Vec<bool>,
    score: Vec<i64>,
}

impl SkillMatrix {
    fn idx(&self, employee: usize, code: usize) -> usize {
        employee * self.codes + code
    }

    /// Whether an employee may take a code at all.
    pub fn eligible(&self, employee: usize, code: usize) -> bool {
        self.eligible[self.idx(employee, code)]
    }

    /// Preference score for an (employee, code) pair.
    pub fn score(&self, employee: usize, code: usize) -> i64 {
        self.score[self.idx(employee, code)]
    }

    /// Number of employees covered.
    pub fn employee_count(&self) -> usize {
        self.employees
    }
}

/// Matches employees to shift codes and stations.
#[derive(Debug, Clone)]
pub struct MatcherAgent<'a> {
    employees: &'a [Employee],
    catalog: &'a ShiftCatalog,
}

impl<'a> MatcherAgent<'a> {
    /// Creates the agent.
    pub fn new(employees: &'a [Employee], catalog: &'a ShiftCatalog) -> Self {
        Self { employees, catalog }
    }

    /// Builds the eligibility/score grids.
    pub fn match_skills(&self) -> SkillMatrix {
        let codes = self.catalog.len();
        let mut matrix = SkillMatrix {
            employees: self.employees.len(),
            codes,
            eligible: vec![false; self.employees.len() * codes],
            score: vec![0; self.employees.len() * codes],
        };

        for (e_idx, employee) in self.employees.iter().enumerate() {
            for (c_idx, code) in self.catalog.codes().iter().enumerate() {
                let slot = matrix.idx(e_idx, c_idx);

                if code.is_off() {
                    matrix.eligible[slot] = true;
                    continue;
                }
                if code.requires_manager && !employee.is_manager {
                    continue;
                }
                if let Some(station) = &code.station {
                    if !employee.works_station(station) {
                        continue;
                    }
                }

                matrix.eligible[slot] = true;
                let mut score = match &code.station {
                    None => 10,
                    Some(station) if *station == employee.primary_station => 10,
                    Some(_) => 5,
                };
                if code.requires_manager && employee.is_manager {
                    score += 2;
                }
                matrix.score[slot] = score;
            }
        }

        debug!(
            employees = self.employees.len(),
            codes, "skill matrix built"
        );
        matrix
    }

    /// Opaque per-station summary shipped in the response: qualified
    /// pools and shortages against a per-station requirement map.
    pub fn summary(&self, station_requirements: &BTreeMap<String, u32>) -> Map<String, Value> {
        let mut coverage = Map::new();
        let mut shortages = Vec::new();

        for (station, &required) in station_requirements {
            let qualified: Vec<&str> = self
                .employees
                .iter()
                .filter(|e| e.works_station(station))
                .map(|e| e.id.as_str())
                .collect();
            let available = qualified.len() as u32;
            if available < required {
                shortages.push(json!({
                    "station": station,
                    "shortage": required - available,
                }));
            }
            coverage.insert(
                station.clone(),
                json!({
                    "required": required,
                    "available": available,
                    "is_sufficient": available >= required,
                    "qualified_employees": qualified,
                }),
            );
        }

        let mut summary = Map::new();
        summary.insert("station_coverage".into(), Value::Object(coverage));
        summary.insert("has_shortages".into(), json!(!shortages.is_empty()));
        summary.insert("shortages".into(), Value::Array(shortages));
        summary.insert("total_employees".into(), json!(self.employees.len()));
        summary
    }
}
