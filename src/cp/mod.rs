//! Constraint model abstraction.
//!
//! The roster formulation is built against this small capability set —
//! boolean variables, exactly-one groups, bounded linear constraints,
//! boolean-or clauses, soft (penalized) linear targets, and a linear
//! minimization objective — so any CP-SAT-class backend can stand behind
//! the [`Solver`] trait. The bundled backend is a deadline-bounded
//! min-conflicts local search ([`LocalSearchSolver`]).
//!
//! # Reference
//! - Minton et al. (1992), "Minimizing conflicts: a heuristic repair method"
//! - Selman et al. (1994), "Noise strategies for improving local search"

pub mod solver;

pub use solver::LocalSearchSolver;

use std::time::Duration;

use crate::config::CancelToken;

/// Index of a boolean decision variable.
pub type VarId = usize;

/// A positive or negated occurrence of a variable in a clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lit {
    pub var: VarId,
    pub positive: bool,
}

impl Lit {
    /// Positive literal.
    pub fn pos(var: VarId) -> Self {
        Self {
            var,
            positive: true,
        }
    }

    /// Negated literal.
    pub fn neg(var: VarId) -> Self {
        Self {
            var,
            positive: false,
        }
    }

    /// Whether the literal is satisfied by a variable value.
    pub fn satisfied_by(&self, value: bool) -> bool {
        self.positive == value
    }
}

/// Constraint classification used for infeasibility diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConstraintClass {
    /// Exactly one code per employee-day cell.
    ExactlyOne,
    /// Weekly hours window.
    WeeklyHours,
    /// Manager presence per day.
    ManagerPresence,
    /// Minimum rest between consecutive working days.
    RestGap,
    /// Sliding-window consecutive working-day cap.
    ConsecutiveDays,
    /// Interval coverage requirement.
    Coverage,
    /// A fixed assignment.
    Pin,
    /// Anything else.
    Other,
}

/// A linear constraint `lo ≤ Σ coeff·x ≤ hi` over boolean variables.
#[derive(Debug, Clone)]
pub struct LinearConstraint {
    pub terms: Vec<(VarId, i64)>,
    pub lo: Option<i64>,
    pub hi: Option<i64>,
    pub class: ConstraintClass,
    pub label: String,
}

impl LinearConstraint {
    /// Starts an empty constraint of a class.
    pub fn new(class: ConstraintClass) -> Self {
        Self {
            terms: Vec::new(),
            lo: None,
            hi: None,
            class,
            label: String::new(),
        }
    }

    /// Adds a term.
    pub fn term(mut self, var: VarId, coeff: i64) -> Self {
        self.terms.push((var, coeff));
        self
    }

    /// Adds unit-coefficient terms for all `vars`.
    pub fn sum_of(mut self, vars: impl IntoIterator<Item = VarId>) -> Self {
        self.terms.extend(vars.into_iter().map(|v| (v, 1)));
        self
    }

    /// Sets the lower bound.
    pub fn at_least(mut self, lo: i64) -> Self {
        self.lo = Some(lo);
        self
    }

    /// Sets the upper bound.
    pub fn at_most(mut self, hi: i64) -> Self {
        self.hi = Some(hi);
        self
    }

    /// Attaches a diagnostic label.
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Violation amount for a given sum.
    pub fn violation(&self, sum: i64) -> i64 {
        let below = self.lo.map(|lo| (lo - sum).max(0)).unwrap_or(0);
        let above = self.hi.map(|hi| (sum - hi).max(0)).unwrap_or(0);
        below + above
    }
}

/// A boolean-or clause.
#[derive(Debug, Clone)]
pub struct Clause {
    pub lits: Vec<Lit>,
    pub class: ConstraintClass,
    pub label: String,
}

/// A penalized linear target: `weight · distance(lo ≤ Σ ≤ hi)` is added
/// to the objective instead of being enforced.
#[derive(Debug, Clone)]
pub struct SoftConstraint {
    pub terms: Vec<(VarId, i64)>,
    pub lo: Option<i64>,
    pub hi: Option<i64>,
    pub weight: i64,
    pub label: String,
}

impl SoftConstraint {
    /// Penalty contributed for a given sum.
    pub fn penalty(&self, sum: i64) -> i64 {
        let below = self.lo.map(|lo| (lo - sum).max(0)).unwrap_or(0);
        let above = self.hi.map(|hi| (sum - hi).max(0)).unwrap_or(0);
        self.weight * (below + above)
    }
}

/// A boolean constraint model.
#[derive(Debug, Clone, Default)]
pub struct Model {
    name: String,
    var_names: Vec<String>,
    /// Fixed values (pins and forced zeros).
    fixed: Vec<Option<bool>>,
    /// Exactly-one groups; each variable belongs to at most one.
    groups: Vec<Vec<VarId>>,
    linears: Vec<LinearConstraint>,
    clauses: Vec<Clause>,
    softs: Vec<SoftConstraint>,
    objective: Vec<(VarId, i64)>,
}

impl Model {
    /// Creates an empty model.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Model name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Adds a boolean variable and returns its index.
    pub fn new_bool(&mut self, name: impl Into<String>) -> VarId {
        self.var_names.push(name.into());
        self.fixed.push(None);
        self.var_names.len() - 1
    }

    /// Fixes a variable to a value. A later fix overrides an earlier one.
    pub fn fix(&mut self, var: VarId, value: bool) {
        self.fixed[var] = Some(value);
    }

    /// The fixed value of a variable, if any.
    pub fn fixed_value(&self, var: VarId) -> Option<bool> {
        self.fixed.get(var).copied().flatten()
    }

    /// Requires exactly one of `vars` to be true.
    pub fn add_exactly_one(&mut self, vars: Vec<VarId>) {
        self.groups.push(vars);
    }

    /// Adds a hard linear constraint.
    pub fn add_linear(&mut self, constraint: LinearConstraint) {
        self.linears.push(constraint);
    }

    /// Adds a boolean-or clause.
    pub fn add_clause(&mut self, lits: Vec<Lit>, class: ConstraintClass, label: impl Into<String>) {
        self.clauses.push(Clause {
            lits,
            class,
            label: label.into(),
        });
    }

    /// Adds a penalized linear target.
    pub fn add_soft(&mut self, soft: SoftConstraint) {
        self.softs.push(soft);
    }

    /// Adds a linear objective term (minimized).
    pub fn add_objective_term(&mut self, var: VarId, coeff: i64) {
        if coeff != 0 {
            self.objective.push((var, coeff));
        }
    }

    pub fn var_count(&self) -> usize {
        self.var_names.len()
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    pub fn linear_count(&self) -> usize {
        self.linears.len()
    }

    pub fn clause_count(&self) -> usize {
        self.clauses.len()
    }

    pub fn soft_count(&self) -> usize {
        self.softs.len()
    }

    pub fn var_name(&self, var: VarId) -> &str {
        &self.var_names[var]
    }

    pub(crate) fn groups(&self) -> &[Vec<VarId>] {
        &self.groups
    }

    pub(crate) fn linears(&self) -> &[LinearConstraint] {
        &self.linears
    }

    pub(crate) fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    pub(crate) fn softs(&self) -> &[SoftConstraint] {
        &self.softs
    }

    pub(crate) fn objective(&self) -> &[(VarId, i64)] {
        &self.objective
    }
}

/// Search budget and reproducibility knobs for one solve call.
#[derive(Debug, Clone)]
pub struct SolveParams {
    /// Wall-clock deadline for the search.
    pub time_limit: Duration,
    /// Parallel seeded workers.
    pub workers: usize,
    /// Base RNG seed; worker `i` derives its own stream from it.
    pub seed: u64,
    /// Per-worker iteration cap (0 = bounded by time only).
    pub max_iterations: u64,
    /// Cooperative cancellation; checked alongside the deadline.
    pub cancel: Option<CancelToken>,
}

impl Default for SolveParams {
    fn default() -> Self {
        Self {
            time_limit: Duration::from_secs(120),
            workers: 1,
            seed: 1,
            max_iterations: 0,
            cancel: None,
        }
    }
}

/// Outcome classification of a solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveStatus {
    /// All hard constraints hold in the returned assignment.
    Feasible,
    /// No assignment satisfying the hard constraints was found in budget.
    Infeasible,
}

/// A hard constraint still violated in the best assignment found.
#[derive(Debug, Clone)]
pub struct ViolatedConstraint {
    pub class: ConstraintClass,
    pub label: String,
    pub amount: i64,
}

/// The result of a solve call.
#[derive(Debug, Clone)]
pub struct Solution {
    pub status: SolveStatus,
    values: Vec<bool>,
    /// Objective of the returned assignment (soft penalties included).
    pub objective: i64,
    /// Total hard violation of the returned assignment (0 when feasible).
    pub hard_violation: i64,
    /// Violated hard constraints, most violated first.
    pub violations: Vec<ViolatedConstraint>,
    /// Search iterations spent across workers.
    pub iterations: u64,
}

impl Solution {
    /// Whether a hard-feasible assignment was found.
    pub fn is_feasible(&self) -> bool {
        self.status == SolveStatus::Feasible
    }

    /// Value of a variable in the returned assignment.
    pub fn value(&self, var: VarId) -> bool {
        self.values.get(var).copied().unwrap_or(false)
    }

    pub(crate) fn from_assignment(
        status: SolveStatus,
        values: Vec<bool>,
        objective: i64,
        hard_violation: i64,
        violations: Vec<ViolatedConstraint>,
        iterations: u64,
    ) -> Self {
        Self {
            status,
            values,
            objective,
            hard_violation,
            violations,
            iterations,
        }
    }
}

/// A backend able to solve a [`Model`] under a deadline.
pub trait Solver {
    /// Solves the model, returning the best assignment found in budget.
    fn solve(&self, model: &Model, params: &SolveParams) -> Solution;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lit_semantics() {
        assert!(Lit::pos(0).satisfied_by(true));
        assert!(!Lit::pos(0).satisfied_by(false));
        assert!(Lit::neg(0).satisfied_by(false));
        assert!(!Lit::neg(0).satisfied_by(true));
    }

    #[test]
    fn test_model_building() {
        let mut model = Model::new("test");
        let a = model.new_bool("a");
        let b = model.new_bool("b");
        let c = model.new_bool("c");

        model.add_exactly_one(vec![a, b, c]);
        model.add_linear(
            LinearConstraint::new(ConstraintClass::Coverage)
                .sum_of([a, b])
                .at_least(1)
                .label("cover"),
        );
        model.add_clause(
            vec![Lit::neg(a), Lit::neg(c)],
            ConstraintClass::RestGap,
            "rest",
        );
        model.add_objective_term(b, 5);
        model.add_objective_term(c, 0); // dropped

        assert_eq!(model.var_count(), 3);
        assert_eq!(model.group_count(), 1);
        assert_eq!(model.linear_count(), 1);
        assert_eq!(model.clause_count(), 1);
        assert_eq!(model.objective().len(), 1);
        assert_eq!(model.var_name(a), "a");
    }

    #[test]
    fn test_linear_violation() {
        let c = LinearConstraint::new(ConstraintClass::WeeklyHours)
            .at_least(10)
            .at_most(20);
        assert_eq!(c.violation(15), 0);
        assert_eq!(c.violation(10), 0);
        assert_eq!(c.violation(20), 0);
        assert_eq!(c.violation(7), 3);
        assert_eq!(c.violation(25), 5);

        let lower_only = LinearConstraint::new(ConstraintClass::Coverage).at_least(2);
        assert_eq!(lower_only.violation(100), 0);
        assert_eq!(lower_only.violation(0), 2);
    }

    #[test]
    fn test_soft_penalty() {
        let s = SoftConstraint {
            terms: vec![],
            lo: Some(4),
            hi: Some(4),
            weight: 100,
            label: "target".into(),
        };
        assert_eq!(s.penalty(4), 0);
        assert_eq!(s.penalty(2), 200);
        assert_eq!(s.penalty(6), 200);
    }

    #[test]
    fn test_fix_overrides() {
        let mut model = Model::new("fix");
        let a = model.new_bool("a");
        assert_eq!(model.fixed_value(a), None);
        model.fix(a, false);
        assert_eq!(model.fixed_value(a), Some(false));
        model.fix(a, true);
        assert_eq!(model.fixed_value(a), Some(true));
    }
}
