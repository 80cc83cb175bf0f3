//! Multi-week employee rostering for retail and fast-food stores.
//!
//! Generates a roster under hard labor-law and operational constraints
//! (weekly-hours windows, 10-hour rest gaps, consecutive-day caps,
//! manager presence) and soft coverage/fairness preferences (peak and
//! opening/closing staffing, weekend equity, availability preferences).
//!
//! # Modules
//!
//! - **`models`**: domain types — `Employee`, `ShiftCatalog`, `StoreProfile`,
//!   `Roster`, `Conflict`
//! - **`validation`**: fatal input-integrity checks
//! - **`cp`**: constraint model abstraction and the bundled local-search solver
//! - **`scheduler`**: the roster CP formulation and coverage metrics
//! - **`agents`**: the five-stage pipeline (demand, matcher, scheduler,
//!   validator, resolver) and its orchestrator
//! - **`api`**: request/response boundary types
//!
//! # Quick Start
//!
//! ```no_run
//! use chrono::NaiveDate;
//! use shiftwise::agents::{Orchestrator, RunInputs};
//! use shiftwise::api::GenerateRequest;
//! use shiftwise::config::CancelToken;
//! use shiftwise::cp::LocalSearchSolver;
//! use shiftwise::models::{BaseHeadcount, Employee, ShiftCatalog, StoreProfile};
//!
//! let employees: Vec<Employee> = vec![/* ... */];
//! let catalog = ShiftCatalog::canonical();
//! let store = StoreProfile::new("store-1", BaseHeadcount::uniform(3));
//! let request = GenerateRequest::new(
//!     NaiveDate::from_ymd_opt(2025, 3, 3).expect("valid date"),
//!     2,
//! );
//!
//! let orchestrator = Orchestrator::new();
//! let response = orchestrator.generate(
//!     RunInputs {
//!         employees: &employees,
//!         catalog: &catalog,
//!         store: &store,
//!         management_roster: &[],
//!     },
//!     &request,
//!     &LocalSearchSolver::new(),
//!     CancelToken::new(),
//! )?;
//! println!("{:?}: {} conflicts", response.status, response.conflicts.len());
//! # Ok::<(), shiftwise::error::GenerateError>(())
//! ```
//!
//! # References
//!
//! - Ernst et al. (2004), "Staff scheduling and rostering: a review"
//! - Burke et al. (2004), "The state of the art of nurse rostering"

pub mod agents;
pub mod api;
pub mod config;
pub mod cp;
pub mod error;
pub mod models;
pub mod scheduler;
pub mod validation;
