//! Min-conflicts local-search backend.
//!
//! Searches over exactly-one groups ("cells"): a move re-selects one
//! cell's member. Hard constraints are repaired first (min-conflicts with
//! noise); once a feasible assignment is held, the search descends on the
//! objective and perturbs out of plateaus. The incumbent is tracked as a
//! `(hard violation, objective)` pair compared lexicographically.
//!
//! Structurally unsatisfiable linear constraints (an unreachable bound
//! given variable ranges and fixings) are detected before search so that
//! e.g. a coverage bound over an empty employee pool reports immediately
//! with its constraint class.
//!
//! # Reference
//! - Minton et al. (1992), "Minimizing conflicts: a heuristic repair method"
//! - Selman et al. (1994), "Noise strategies for improving local search"

use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use super::{
    ConstraintClass, Model, Solution, SolveParams, SolveStatus, Solver, VarId,
    ViolatedConstraint,
};

/// Deadline-bounded min-conflicts solver with parallel seeded workers.
#[derive(Debug, Clone)]
pub struct LocalSearchSolver {
    /// Probability of taking a random repair option instead of the best.
    noise: f64,
    /// Non-improving steps on a feasible plateau before perturbing.
    stagnation_limit: u64,
}

impl LocalSearchSolver {
    /// Creates a solver with default search parameters.
    pub fn new() -> Self {
        Self {
            noise: 0.08,
            stagnation_limit: 2_000,
        }
    }

    /// Overrides the noise probability.
    pub fn with_noise(mut self, noise: f64) -> Self {
        self.noise = noise.clamp(0.0, 1.0);
        self
    }
}

impl Default for LocalSearchSolver {
    fn default() -> Self {
        Self::new()
    }
}

impl Solver for LocalSearchSolver {
    fn solve(&self, model: &Model, params: &SolveParams) -> Solution {
        if let Some(solution) = structural_infeasibility(model) {
            return solution;
        }

        let deadline = Instant::now() + params.time_limit;
        let workers = params.workers.max(1);

        let outcomes: Vec<WorkerOutcome> = if workers == 1 {
            vec![run_worker(model, self, params, params.seed, deadline)]
        } else {
            std::thread::scope(|scope| {
                let handles: Vec<_> = (0..workers)
                    .map(|w| {
                        let seed = params
                            .seed
                            .wrapping_add((w as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15));
                        scope.spawn(move || run_worker(model, self, params, seed, deadline))
                    })
                    .collect();
                handles
                    .into_iter()
                    .filter_map(|h| h.join().ok())
                    .collect()
            })
        };

        let iterations: u64 = outcomes.iter().map(|o| o.iterations).sum();
        let best = outcomes
            .into_iter()
            .min_by_key(|o| (o.hard, o.objective))
            .unwrap_or(WorkerOutcome {
                hard: i64::MAX,
                objective: 0,
                assign: vec![false; model.var_count()],
                iterations: 0,
            });

        let (hard, objective, violations) = evaluate_assignment(model, &best.assign);
        debug!(
            hard,
            objective, iterations, "local search finished"
        );

        let status = if hard == 0 {
            SolveStatus::Feasible
        } else {
            SolveStatus::Infeasible
        };
        Solution::from_assignment(status, best.assign, objective, hard, violations, iterations)
    }
}

/// Detects linear constraints whose bound is unreachable for any
/// assignment, ignoring interactions (a sound relaxation).
fn structural_infeasibility(model: &Model) -> Option<Solution> {
    let mut violations = Vec::new();
    for lin in model.linears() {
        let mut min_sum = 0i64;
        let mut max_sum = 0i64;
        for &(var, coeff) in &lin.terms {
            match model.fixed_value(var) {
                Some(true) => {
                    min_sum += coeff;
                    max_sum += coeff;
                }
                Some(false) => {}
                None => {
                    min_sum += coeff.min(0);
                    max_sum += coeff.max(0);
                }
            }
        }
        let short = lin.lo.map(|lo| (lo - max_sum).max(0)).unwrap_or(0);
        let over = lin.hi.map(|hi| (min_sum - hi).max(0)).unwrap_or(0);
        if short + over > 0 {
            violations.push(ViolatedConstraint {
                class: lin.class,
                label: lin.label.clone(),
                amount: short + over,
            });
        }
    }

    if violations.is_empty() {
        return None;
    }

    let mut values = vec![false; model.var_count()];
    for (var, value) in values.iter_mut().enumerate() {
        *value = model.fixed_value(var).unwrap_or(false);
    }
    let hard: i64 = violations.iter().map(|v| v.amount).sum();
    Some(Solution::from_assignment(
        SolveStatus::Infeasible,
        values,
        0,
        hard,
        violations,
        0,
    ))
}

/// Full evaluation of an assignment: hard violation, objective, and the
/// violated hard constraints sorted by violation amount.
fn evaluate_assignment(
    model: &Model,
    assign: &[bool],
) -> (i64, i64, Vec<ViolatedConstraint>) {
    let mut hard = 0i64;
    let mut violations = Vec::new();

    for group in model.groups() {
        let on = group.iter().filter(|&&v| assign[v]).count() as i64;
        let viol = (on - 1).abs();
        if viol > 0 {
            hard += viol;
            violations.push(ViolatedConstraint {
                class: ConstraintClass::ExactlyOne,
                label: String::new(),
                amount: viol,
            });
        }
    }
    for lin in model.linears() {
        let sum: i64 = lin
            .terms
            .iter()
            .map(|&(v, c)| if assign[v] { c } else { 0 })
            .sum();
        let viol = lin.violation(sum);
        if viol > 0 {
            hard += viol;
            violations.push(ViolatedConstraint {
                class: lin.class,
                label: lin.label.clone(),
                amount: viol,
            });
        }
    }
    for clause in model.clauses() {
        if !clause.lits.iter().any(|l| l.satisfied_by(assign[l.var])) {
            hard += 1;
            violations.push(ViolatedConstraint {
                class: clause.class,
                label: clause.label.clone(),
                amount: 1,
            });
        }
    }

    let mut objective: i64 = model
        .objective()
        .iter()
        .map(|&(v, c)| if assign[v] { c } else { 0 })
        .sum();
    for soft in model.softs() {
        let sum: i64 = soft
            .terms
            .iter()
            .map(|&(v, c)| if assign[v] { c } else { 0 })
            .sum();
        objective += soft.penalty(sum);
    }

    violations.sort_by(|a, b| b.amount.cmp(&a.amount));
    (hard, objective, violations)
}

struct WorkerOutcome {
    hard: i64,
    objective: i64,
    assign: Vec<bool>,
    iterations: u64,
}

/// One selectable cell: an exactly-one group, or a free boolean.
struct Cell {
    members: Vec<VarId>,
    /// Whether "no member selected" is a legal choice (free booleans).
    allow_none: bool,
    /// Pinned cells admit no moves.
    locked: bool,
}

impl Cell {
    fn option_count(&self) -> usize {
        self.members.len() + usize::from(self.allow_none)
    }
}

/// Incremental search state over cells.
struct SearchState<'m> {
    model: &'m Model,
    cells: Vec<Cell>,
    choice: Vec<usize>,
    /// var → (cell index, member index).
    var_cell: Vec<Option<(usize, usize)>>,
    assign: Vec<bool>,
    obj_coeff: Vec<i64>,
    /// var → (linear index, coeff).
    occ_lin: Vec<Vec<(usize, i64)>>,
    /// var → (clause index, positive).
    occ_clause: Vec<Vec<(usize, bool)>>,
    /// var → (soft index, coeff).
    occ_soft: Vec<Vec<(usize, i64)>>,
    lin_sums: Vec<i64>,
    clause_sat: Vec<i64>,
    soft_sums: Vec<i64>,
    hard: i64,
    objective: i64,
    /// Violated hard constraint ids (0..L linears, L.. clauses).
    violated: Vec<usize>,
    violated_pos: Vec<Option<usize>>,
    unlocked: Vec<usize>,
}

impl<'m> SearchState<'m> {
    fn build(model: &'m Model) -> Self {
        let n = model.var_count();
        let mut var_cell = vec![None; n];
        let mut in_group = vec![false; n];
        let mut cells = Vec::new();

        for group in model.groups() {
            let mut members = Vec::new();
            let mut pinned = None;
            for &v in group {
                in_group[v] = true;
                match model.fixed_value(v) {
                    Some(false) => {}
                    Some(true) => pinned = Some(v),
                    None => members.push(v),
                }
            }
            let (members, locked) = match pinned {
                Some(v) => (vec![v], true),
                // A group with every member fixed off cannot be selected;
                // it surfaces as an exactly-one violation at evaluation.
                None if members.is_empty() => (members, true),
                None => (members, false),
            };
            let idx = cells.len();
            for (m, &v) in members.iter().enumerate() {
                var_cell[v] = Some((idx, m));
            }
            cells.push(Cell {
                members,
                allow_none: false,
                locked,
            });
        }

        for v in 0..n {
            if in_group[v] {
                continue;
            }
            let idx = cells.len();
            var_cell[v] = Some((idx, 0));
            cells.push(Cell {
                members: vec![v],
                allow_none: true,
                locked: model.fixed_value(v).is_some(),
            });
        }

        let mut obj_coeff = vec![0i64; n];
        for &(v, c) in model.objective() {
            obj_coeff[v] += c;
        }
        let mut occ_lin = vec![Vec::new(); n];
        for (i, lin) in model.linears().iter().enumerate() {
            for &(v, c) in &lin.terms {
                occ_lin[v].push((i, c));
            }
        }
        let mut occ_clause = vec![Vec::new(); n];
        for (i, clause) in model.clauses().iter().enumerate() {
            for lit in &clause.lits {
                occ_clause[lit.var].push((i, lit.positive));
            }
        }
        let mut occ_soft = vec![Vec::new(); n];
        for (i, soft) in model.softs().iter().enumerate() {
            for &(v, c) in &soft.terms {
                occ_soft[v].push((i, c));
            }
        }

        let hard_ids = model.linear_count() + model.clause_count();
        let unlocked = cells
            .iter()
            .enumerate()
            .filter(|(_, c)| !c.locked && c.option_count() > 1)
            .map(|(i, _)| i)
            .collect();

        Self {
            model,
            choice: vec![0; cells.len()],
            cells,
            var_cell,
            assign: vec![false; n],
            obj_coeff,
            occ_lin,
            occ_clause,
            occ_soft,
            lin_sums: vec![0; model.linear_count()],
            clause_sat: vec![0; model.clause_count()],
            soft_sums: vec![0; model.soft_count()],
            hard: 0,
            objective: 0,
            violated: Vec::new(),
            violated_pos: vec![None; hard_ids],
            unlocked,
        }
    }

    /// Sets initial choices (random for groups, none for free cells) and
    /// computes all sums from scratch.
    fn reset(&mut self, rng: &mut StdRng) {
        for i in 0..self.cells.len() {
            let cell = &self.cells[i];
            self.choice[i] = if cell.locked {
                if cell.members.is_empty() || self.model.fixed_value(cell.members[0]) == Some(false)
                {
                    cell.members.len() // none
                } else if self.model.fixed_value(cell.members[0]) == Some(true) {
                    0
                } else {
                    cell.members.len()
                }
            } else if cell.allow_none {
                cell.members.len()
            } else {
                rng.gen_range(0..cell.members.len())
            };
        }

        self.assign.iter_mut().for_each(|v| *v = false);
        for (i, cell) in self.cells.iter().enumerate() {
            if self.choice[i] < cell.members.len() {
                self.assign[cell.members[self.choice[i]]] = true;
            }
        }

        // Recompute sums and violation bookkeeping.
        self.violated.clear();
        self.violated_pos.iter_mut().for_each(|p| *p = None);
        self.hard = 0;
        self.objective = 0;

        let model = self.model;
        for (i, lin) in model.linears().iter().enumerate() {
            let sum: i64 = lin
                .terms
                .iter()
                .map(|&(v, c)| if self.assign[v] { c } else { 0 })
                .sum();
            self.lin_sums[i] = sum;
            let viol = lin.violation(sum);
            if viol > 0 {
                self.hard += viol;
                self.mark_violated(i);
            }
        }
        for (i, clause) in model.clauses().iter().enumerate() {
            let sat = clause
                .lits
                .iter()
                .filter(|l| l.satisfied_by(self.assign[l.var]))
                .count() as i64;
            self.clause_sat[i] = sat;
            if sat == 0 {
                self.hard += 1;
                self.mark_violated(model.linear_count() + i);
            }
        }
        for (i, soft) in model.softs().iter().enumerate() {
            let sum: i64 = soft
                .terms
                .iter()
                .map(|&(v, c)| if self.assign[v] { c } else { 0 })
                .sum();
            self.soft_sums[i] = sum;
            self.objective += soft.penalty(sum);
        }
        self.objective += model
            .objective()
            .iter()
            .map(|&(v, c)| if self.assign[v] { c } else { 0 })
            .sum::<i64>();
    }

    fn mark_violated(&mut self, id: usize) {
        if self.violated_pos[id].is_none() {
            self.violated_pos[id] = Some(self.violated.len());
            self.violated.push(id);
        }
    }

    fn unmark_violated(&mut self, id: usize) {
        if let Some(pos) = self.violated_pos[id].take() {
            let last = self.violated.len() - 1;
            self.violated.swap(pos, last);
            self.violated.pop();
            if pos < self.violated.len() {
                let moved = self.violated[pos];
                self.violated_pos[moved] = Some(pos);
            }
        }
    }

    fn set_var(&mut self, var: VarId, value: bool) {
        if self.assign[var] == value {
            return;
        }
        self.assign[var] = value;
        let delta = if value { 1i64 } else { -1i64 };
        let model = self.model;

        for idx in 0..self.occ_lin[var].len() {
            let (cid, coeff) = self.occ_lin[var][idx];
            let lin = &model.linears()[cid];
            let old = lin.violation(self.lin_sums[cid]);
            self.lin_sums[cid] += coeff * delta;
            let new = lin.violation(self.lin_sums[cid]);
            self.hard += new - old;
            if old == 0 && new > 0 {
                self.mark_violated(cid);
            } else if old > 0 && new == 0 {
                self.unmark_violated(cid);
            }
        }
        for idx in 0..self.occ_clause[var].len() {
            let (cid, positive) = self.occ_clause[var][idx];
            let gains = positive == value;
            let old_sat = self.clause_sat[cid];
            self.clause_sat[cid] += if gains { 1 } else { -1 };
            let id = model.linear_count() + cid;
            if old_sat == 0 && self.clause_sat[cid] > 0 {
                self.hard -= 1;
                self.unmark_violated(id);
            } else if old_sat > 0 && self.clause_sat[cid] == 0 {
                self.hard += 1;
                self.mark_violated(id);
            }
        }
        for idx in 0..self.occ_soft[var].len() {
            let (cid, coeff) = self.occ_soft[var][idx];
            let soft = &model.softs()[cid];
            let old = soft.penalty(self.soft_sums[cid]);
            self.soft_sums[cid] += coeff * delta;
            self.objective += soft.penalty(self.soft_sums[cid]) - old;
        }
        self.objective += self.obj_coeff[var] * delta;
    }

    /// Re-selects a cell's choice, updating all bookkeeping.
    fn apply(&mut self, cell_idx: usize, new_choice: usize) {
        let old_choice = self.choice[cell_idx];
        if old_choice == new_choice {
            return;
        }
        let member_count = self.cells[cell_idx].members.len();
        if old_choice < member_count {
            let old_var = self.cells[cell_idx].members[old_choice];
            self.set_var(old_var, false);
        }
        if new_choice < member_count {
            let new_var = self.cells[cell_idx].members[new_choice];
            self.set_var(new_var, true);
        }
        self.choice[cell_idx] = new_choice;
    }

    /// Scores a candidate choice by applying and reverting it.
    fn eval(&mut self, cell_idx: usize, candidate: usize) -> (i64, i64) {
        let old = self.choice[cell_idx];
        self.apply(cell_idx, candidate);
        let score = (self.hard, self.objective);
        self.apply(cell_idx, old);
        score
    }

    /// Best choice for a cell by `(hard, objective)`.
    fn best_choice(&mut self, cell_idx: usize) -> (usize, (i64, i64)) {
        let options = self.cells[cell_idx].option_count();
        let mut best = (self.choice[cell_idx], (self.hard, self.objective));
        for candidate in 0..options {
            if candidate == self.choice[cell_idx] {
                continue;
            }
            let score = self.eval(cell_idx, candidate);
            if score < best.1 {
                best = (candidate, score);
            }
        }
        best
    }

    /// A variable involved in a violated hard constraint.
    fn violated_var(&self, id: usize, rng: &mut StdRng) -> Option<VarId> {
        if id < self.model.linear_count() {
            let terms = &self.model.linears()[id].terms;
            if terms.is_empty() {
                return None;
            }
            Some(terms[rng.gen_range(0..terms.len())].0)
        } else {
            let lits = &self.model.clauses()[id - self.model.linear_count()].lits;
            if lits.is_empty() {
                return None;
            }
            Some(lits[rng.gen_range(0..lits.len())].var)
        }
    }
}

fn run_worker(
    model: &Model,
    solver: &LocalSearchSolver,
    params: &SolveParams,
    seed: u64,
    deadline: Instant,
) -> WorkerOutcome {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut state = SearchState::build(model);
    state.reset(&mut rng);
    greedy_sweep(&mut state, &mut rng);

    let mut best_assign = state.assign.clone();
    let mut best = (state.hard, state.objective);
    let mut iterations: u64 = 0;
    let mut stagnation: u64 = 0;

    loop {
        if params.max_iterations > 0 && iterations >= params.max_iterations {
            break;
        }
        if iterations % 128 == 0 {
            if Instant::now() >= deadline {
                break;
            }
            if params
                .cancel
                .as_ref()
                .map(|t| t.is_cancelled())
                .unwrap_or(false)
            {
                break;
            }
        }
        iterations += 1;

        if state.unlocked.is_empty() {
            break;
        }

        if state.hard > 0 {
            repair_step(&mut state, &mut rng, solver.noise);
        } else {
            let improved = improve_step(&mut state, &mut rng);
            if improved {
                stagnation = 0;
            } else {
                stagnation += 1;
            }
            if stagnation > solver.stagnation_limit {
                perturb(&mut state, &mut rng);
                stagnation = 0;
            }
        }

        if (state.hard, state.objective) < best {
            best = (state.hard, state.objective);
            best_assign.copy_from_slice(&state.assign);
        }
    }

    WorkerOutcome {
        hard: best.0,
        objective: best.1,
        assign: best_assign,
        iterations,
    }
}

/// One pass over all unlocked cells in random order, moving each to its
/// best option. Used after (re)initialization.
fn greedy_sweep(state: &mut SearchState<'_>, rng: &mut StdRng) {
    let mut order = state.unlocked.clone();
    for i in (1..order.len()).rev() {
        order.swap(i, rng.gen_range(0..=i));
    }
    for cell_idx in order {
        let (choice, score) = state.best_choice(cell_idx);
        if score < (state.hard, state.objective) {
            state.apply(cell_idx, choice);
        }
    }
}

/// Min-conflicts repair: re-select a cell touched by a violated constraint.
fn repair_step(state: &mut SearchState<'_>, rng: &mut StdRng, noise: f64) {
    if state.violated.is_empty() {
        return;
    }
    let id = state.violated[rng.gen_range(0..state.violated.len())];
    let Some(var) = state.violated_var(id, rng) else {
        return;
    };
    let Some((cell_idx, _)) = state.var_cell[var] else {
        return;
    };
    if state.cells[cell_idx].locked {
        return;
    }

    if rng.gen_bool(noise) {
        let options = state.cells[cell_idx].option_count();
        state.apply(cell_idx, rng.gen_range(0..options));
    } else {
        let (choice, _) = state.best_choice(cell_idx);
        state.apply(cell_idx, choice);
    }
}

/// Objective descent on a feasible assignment. Returns whether the state
/// strictly improved.
fn improve_step(state: &mut SearchState<'_>, rng: &mut StdRng) -> bool {
    let cell_idx = state.unlocked[rng.gen_range(0..state.unlocked.len())];
    let before = (state.hard, state.objective);
    let (choice, score) = state.best_choice(cell_idx);
    if score < before {
        state.apply(cell_idx, choice);
        true
    } else {
        false
    }
}

/// Random kick out of a plateau.
fn perturb(state: &mut SearchState<'_>, rng: &mut StdRng) {
    for _ in 0..3 {
        let cell_idx = state.unlocked[rng.gen_range(0..state.unlocked.len())];
        let options = state.cells[cell_idx].option_count();
        state.apply(cell_idx, rng.gen_range(0..options));
    }
}
