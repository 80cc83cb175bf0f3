//! Rostering domain models.
//!
//! Core data types for the roster generation problem and its solution:
//! employees, the shift-code catalog, the store profile, the roster
//! itself, and the conflicts a roster can carry.
//!
//! | shiftwise | Retail | Fast food |
//! |-----------|--------|-----------|
//! | Employee | Sales assistant | Crew / Manager |
//! | ShiftCode | Shift pattern | `S`, `1F` ... `M` |
//! | StoreProfile | Branch | Restaurant |
//! | Roster | Weekly rota | Crew schedule |

mod conflict;
mod employee;
mod roster;
mod shift;
mod store;

pub use conflict::{Conflict, ConflictKind, Severity};
pub use employee::{Availability, Employee, EmploymentType};
pub use roster::{EmployeeSchedule, Roster, ShiftInfo};
pub use shift::{ShiftCatalog, ShiftCode, ShiftWindow, OFF_CODE};
pub use store::{BaseHeadcount, Interval, StoreProfile, TradingHours};
