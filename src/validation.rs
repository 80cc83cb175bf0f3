//! Fatal input-integrity checks.
//!
//! Runs before the pipeline starts. Anything caught here means no roster
//! can be produced: duplicate employee IDs, availability calendars that do
//! not cover the horizon, shift codes bound to stations nobody works, and
//! management-roster pins that fall outside the horizon. Soft problems are
//! never raised here — they flow through the validator agent as conflicts.

use std::collections::BTreeSet;

use chrono::NaiveDate;

use crate::error::RosterError;
use crate::models::{Employee, ShiftCatalog};
use crate::scheduler::Pin;

/// Validates the inputs of one run.
///
/// Checks, in order:
/// 1. The horizon is non-empty and strictly ascending.
/// 2. No duplicate employee IDs.
/// 3. Every employee's availability covers every horizon day.
/// 4. Every station referenced by a shift code is worked by someone.
/// 5. Every pin names a known employee, a horizon day, and a known code.
///
/// Returns the first fatal error found.
pub fn validate_inputs(
    employees: &[Employee],
    catalog: &ShiftCatalog,
    horizon: &[NaiveDate],
    pins: &[Pin],
) -> Result<(), RosterError> {
    if horizon.is_empty() {
        return Err(RosterError::HorizonMismatch("horizon is empty".into()));
    }
    for pair in horizon.windows(2) {
        if pair[1] <= pair[0] {
            return Err(RosterError::HorizonMismatch(format!(
                "days out of order: {} then {}",
                pair[0], pair[1]
            )));
        }
    }

    let mut ids = BTreeSet::new();
    for employee in employees {
        if !ids.insert(employee.id.as_str()) {
            return Err(RosterError::DuplicateEmployeeId(employee.id.clone()));
        }
        for &day in horizon {
            if employee.availability_on(day).is_none() {
                return Err(RosterError::MissingAvailability {
                    employee_id: employee.id.clone(),
                    day,
                });
            }
        }
    }

    let known_stations: BTreeSet<&str> = employees
        .iter()
        .flat_map(|e| {
            std::iter::once(e.primary_station.as_str())
                .chain(e.cross_trained_stations.iter().map(String::as_str))
        })
        .collect();
    for code in catalog.codes() {
        if let Some(station) = &code.station {
            if !known_stations.contains(station.as_str()) {
                return Err(RosterError::UnknownStation {
                    code: code.code.clone(),
                    station: station.clone(),
                });
            }
        }
    }

    let horizon_set: BTreeSet<NaiveDate> = horizon.iter().copied().collect();
    for pin in pins {
        if !ids.contains(pin.employee_id.as_str()) {
            return Err(RosterError::InvalidPin {
                employee_id: pin.employee_id.clone(),
                day: pin.day,
                detail: "unknown employee".into(),
            });
        }
        if !horizon_set.contains(&pin.day) {
            return Err(RosterError::InvalidPin {
                employee_id: pin.employee_id.clone(),
                day: pin.day,
                detail: "day outside horizon".into(),
            });
        }
        if catalog.get(&pin.code).is_none() {
            return Err(RosterError::InvalidPin {
                employee_id: pin.employee_id.clone(),
                day: pin.day,
                detail: format!("unknown shift code '{}'", pin.code),
            });
        }
    }

    Ok(())
}
