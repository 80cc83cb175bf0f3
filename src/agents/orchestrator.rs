//! Pipeline orchestrator.
//!
//! Drives the fixed five-stage pipeline (demand → match → schedule →
//! validate → resolve), records every transition in the append-only
//! workflow log, enforces the global wall-clock budget between stages,
//! and honors cooperative cancellation. Exit is always a well-formed
//! [`RosterResponse`] unless the request or the datasets themselves are
//! rejected up front.

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::time::Instant;

use tracing::info;

use crate::api::{GenerateRequest, RosterResponse, RunStatus};
use crate::config::{CancelToken, RosterConfig};
use crate::cp::{SolveParams, Solver};
use crate::error::GenerateError;
use crate::models::{Conflict, Employee, Roster, ShiftCatalog, StoreProfile};
use crate::scheduler::{PeakCoverageMetrics, Pin, RosterProblem, SchedulePatch};
use crate::validation::validate_inputs;

use super::demand::DemandAgent;
use super::matcher::MatcherAgent;
use super::resolver::ResolverAgent;
use super::validator::ValidatorAgent;
use super::{AgentState, StageTag, WorkflowStep};

/// Immutable datasets for one run. Shared by reference; concurrent runs
/// may reuse the same inputs.
#[derive(Debug, Clone, Copy)]
pub struct RunInputs<'a> {
    pub employees: &'a [Employee],
    pub catalog: &'a ShiftCatalog,
    pub store: &'a StoreProfile,
    /// Pre-pinned manager shifts (manager id → day/code), flattened.
    pub management_roster: &'a [Pin],
}

/// Finite-state driver over the agent pipeline.
#[derive(Debug, Clone, Default)]
pub struct Orchestrator {
    config: RosterConfig,
}

/// Mutable per-run bookkeeping: the workflow log and agent states.
struct Run {
    started: Instant,
    deadline: Instant,
    cancel: CancelToken,
    log: Vec<WorkflowStep>,
    states: BTreeMap<&'static str, AgentState>,
}

impl Run {
    fn new(config: &RosterConfig, cancel: CancelToken) -> Self {
        let started = Instant::now();
        let mut states = BTreeMap::new();
        for name in ["demand", "matcher", "scheduler", "validator", "resolver"] {
            states.insert(name, AgentState::idle(name));
        }
        Self {
            started,
            deadline: started + config.global_budget(),
            cancel,
            log: Vec::new(),
            states,
        }
    }

    fn log_step(&mut self, step: StageTag, message: impl Into<String>) {
        self.log.push(WorkflowStep {
            timestamp_ms: self.started.elapsed().as_millis() as u64,
            step,
            message: message.into(),
        });
    }

    fn state(&mut self, name: &'static str) -> &mut AgentState {
        self.states
            .entry(name)
            .or_insert_with(|| AgentState::idle(name))
    }

    /// Budget/cancellation gate between stages. Appends the terminal step
    /// and reports which one tripped.
    fn checkpoint(&mut self) -> Option<StageTag> {
        if self.cancel.is_cancelled() {
            self.log_step(StageTag::Cancelled, "run cancelled by caller");
            return Some(StageTag::Cancelled);
        }
        if Instant::now() >= self.deadline {
            self.log_step(StageTag::Aborted, "global wall-clock budget exceeded");
            return Some(StageTag::Aborted);
        }
        None
    }

    fn elapsed_seconds(&self) -> f64 {
        (self.started.elapsed().as_secs_f64() * 100.0).round() / 100.0
    }
}

impl Orchestrator {
    /// Creates an orchestrator with the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an orchestrator with an explicit configuration.
    pub fn with_config(config: RosterConfig) -> Self {
        Self { config }
    }

    /// The active configuration.
    pub fn config(&self) -> &RosterConfig {
        &self.config
    }

    /// Runs the full pipeline for one request.
    ///
    /// Fatal input problems and malformed requests surface as
    /// [`GenerateError`]; every other outcome (including infeasibility,
    /// cancellation, and budget exhaustion) is a well-formed response.
    pub fn generate<S: Solver>(
        &self,
        inputs: RunInputs<'_>,
        request: &GenerateRequest,
        solver: &S,
        cancel: CancelToken,
    ) -> Result<RosterResponse, GenerateError> {
        request.validate(self.config.solver.hard_cap_seconds)?;
        let horizon = request.horizon();
        validate_inputs(
            inputs.employees,
            inputs.catalog,
            &horizon,
            inputs.management_roster,
        )?;

        let mut run = Run::new(&self.config, cancel);
        run.log_step(StageTag::Init, "starting roster generation workflow");

        // Stage 1: demand.
        run.state("demand").start("analyze_demand");
        let demand_agent = DemandAgent::new(inputs.store, &self.config.demand);
        let demand = demand_agent.analyze(&horizon);
        let demand_analysis = demand_agent.summary(&demand);
        run.state("demand").succeed("days", demand.len().to_string());
        run.log_step(
            StageTag::Demand,
            format!("staffing demand analyzed for {} days", demand.len()),
        );

        if run.checkpoint().is_some() {
            return Ok(self.respond(
                &mut run,
                RunStatus::Partial,
                None,
                Vec::new(),
                None,
                demand_analysis,
                Default::default(),
                &horizon,
                inputs,
            ));
        }

        // Stage 2: skill matching.
        run.state("matcher").start("match_skills");
        let matcher = MatcherAgent::new(inputs.employees, inputs.catalog);
        let skills = matcher.match_skills();
        let skill_matching = matcher.summary(&station_requirements(inputs));
        run.state("matcher")
            .succeed("employees", inputs.employees.len().to_string());
        run.log_step(
            StageTag::Match,
            format!("{} employees matched to stations", inputs.employees.len()),
        );

        if run.checkpoint().is_some() {
            return Ok(self.respond(
                &mut run,
                RunStatus::Partial,
                None,
                Vec::new(),
                None,
                demand_analysis,
                skill_matching,
                &horizon,
                inputs,
            ));
        }

        // Stage 3: constraint solve.
        run.state("scheduler").start("generate_roster");
        let problem = RosterProblem::new(
            inputs.employees,
            inputs.catalog,
            inputs.store,
            &demand,
            &skills,
            &self.config,
            &horizon,
        );
        let solve_budget = std::time::Duration::from_secs(request.time_limit_seconds)
            .min(run.deadline.saturating_duration_since(Instant::now()));
        let params = SolveParams {
            time_limit: solve_budget,
            workers: self.config.solver.effective_workers(),
            seed: self.config.solver.seed,
            max_iterations: 0,
            cancel: Some(run.cancel.clone()),
        };
        run.log_step(
            StageTag::Schedule,
            format!(
                "solving constraint model ({}s budget, {} workers)",
                solve_budget.as_secs(),
                params.workers
            ),
        );
        let patch = SchedulePatch {
            pins: inputs.management_roster.to_vec(),
            hard_coverage: Vec::new(),
        };
        let outcome = problem.solve(solver, &params, &patch);
        run.log_step(
            StageTag::Schedule,
            format!(
                "solver finished ({} iterations, objective {})",
                outcome.solution.iterations, outcome.solution.objective
            ),
        );

        let Some(mut roster) = outcome.roster else {
            run.state("scheduler").fail("no feasible assignment");
            let conflicts = problem.diagnose(&outcome.solution);
            run.log_step(
                StageTag::Complete,
                format!(
                    "no feasible roster; {} diagnostic conflict(s)",
                    conflicts.len()
                ),
            );
            info!(status = "failed", "roster generation finished");
            return Ok(self.respond(
                &mut run,
                RunStatus::Failed,
                None,
                conflicts,
                None,
                demand_analysis,
                skill_matching,
                &horizon,
                inputs,
            ));
        };
        run.state("scheduler").succeed(
            "objective",
            outcome.solution.objective.to_string(),
        );

        // Stage 4: validation.
        run.state("validator").start("validate_roster");
        let validator = ValidatorAgent::new(
            inputs.employees,
            inputs.catalog,
            inputs.store,
            &demand,
            &self.config,
        );
        let mut conflicts = validator.validate(&roster);
        run.state("validator")
            .succeed("conflicts", conflicts.len().to_string());
        run.log_step(
            StageTag::Validate,
            format!("{} conflict(s) found", conflicts.len()),
        );

        // Stage 5: resolution, when something blocks and budget remains.
        let blocking = conflicts.iter().filter(|c| c.is_blocking()).count();
        let interrupted = run.checkpoint();
        if blocking > 0 && interrupted.is_none() {
            run.state("resolver").start("resolve_conflicts");
            let resolver = ResolverAgent::new(&problem, &validator, &self.config);
            let (patched, patched_conflicts, report) =
                resolver.resolve(solver, roster, conflicts, &params, run.deadline);
            roster = patched;
            conflicts = patched_conflicts;
            run.state("resolver")
                .succeed("applied", report.applied.to_string());
            run.log_step(
                StageTag::Resolve,
                format!(
                    "{} of {} repair(s) applied, {} irreparable",
                    report.applied, report.attempted, report.irreparable
                ),
            );
        } else if blocking == 0 {
            run.log_step(StageTag::Resolve, "no blocking conflicts; resolver skipped");
        }

        let metrics = PeakCoverageMetrics::calculate(
            &roster,
            &demand,
            inputs.catalog,
            &inputs.store.hours,
            self.config.demand.weekend_uplift_pct,
        );

        let still_blocking = conflicts.iter().any(Conflict::is_blocking);
        let status = if interrupted.is_some() || run.cancel.is_cancelled() {
            RunStatus::Partial
        } else if still_blocking {
            RunStatus::Partial
        } else {
            RunStatus::Success
        };

        if interrupted.is_none() {
            run.log_step(
                StageTag::Complete,
                format!("workflow completed in {:.2}s", run.elapsed_seconds()),
            );
        }
        info!(?status, conflicts = conflicts.len(), "roster generation finished");

        Ok(self.respond(
            &mut run,
            status,
            Some(roster),
            conflicts,
            Some(metrics),
            demand_analysis,
            skill_matching,
            &horizon,
            inputs,
        ))
    }

    /// Assembles the terminal response and freezes the workflow log.
    #[allow(clippy::too_many_arguments)]
    fn respond(
        &self,
        run: &mut Run,
        status: RunStatus,
        roster: Option<Roster>,
        conflicts: Vec<Conflict>,
        metrics: Option<PeakCoverageMetrics>,
        demand_analysis: serde_json::Map<String, serde_json::Value>,
        skill_matching: serde_json::Map<String, serde_json::Value>,
        horizon: &[chrono::NaiveDate],
        inputs: RunInputs<'_>,
    ) -> RosterResponse {
        let (blocking, warnings): (Vec<Conflict>, Vec<Conflict>) =
            conflicts.into_iter().partition(|c| c.is_blocking());

        RosterResponse {
            status,
            roster: roster.map(|r| r.schedules).unwrap_or_default(),
            days: horizon.to_vec(),
            total_employees: inputs.employees.len(),
            generation_time_seconds: run.elapsed_seconds(),
            workflow_log: std::mem::take(&mut run.log),
            conflicts: blocking,
            warnings,
            peak_coverage: metrics,
            demand_analysis,
            skill_matching,
        }
    }
}

/// Stations referenced anywhere in the run; each wants at least one
/// qualified employee.
fn station_requirements(inputs: RunInputs<'_>) -> BTreeMap<String, u32> {
    let mut stations: BTreeSet<String> = BTreeSet::new();
    for employee in inputs.employees {
        stations.insert(employee.primary_station.clone());
        stations.extend(employee.cross_trained_stations.iter().cloned());
    }
    for code in inputs.catalog.codes() {
        if let Some(station) = &code.station {
            stations.insert(station.clone());
        }
    }
    stations.into_iter().map(|s| (s, 1)).collect()
}
