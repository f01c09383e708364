use crate::error::Error;
use crate::util::FEAS_EPS;

use std::sync::atomic::{AtomicU64, Ordering};

const LTE_STR: &str = "\u{2264}";
const EQ_STR: &str = "\u{003D}";
const GTE_STR: &str = "\u{2265}";
const INF_STR: &str = "\u{221E}";

static NEXT_MODEL_ID: AtomicU64 = AtomicU64::new(0);

/// Stable handle to a variable. Carries the owning model's identity so a
/// handle from another model is rejected even when its index is in range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VarId {
    model: u64,
    index: usize,
}

impl VarId {
    pub fn index(self) -> usize {
        self.index
    }

    pub(crate) fn model(self) -> u64 {
        self.model
    }
}

/// Stable handle to a constraint row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConId {
    model: u64,
    index: usize,
}

impl ConId {
    pub fn index(self) -> usize {
        self.index
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarKind {
    Continuous,
    Integer,
    Binary,
}

impl VarKind {
    pub fn is_integer(self) -> bool {
        !matches!(self, VarKind::Continuous)
    }
}

/// One recorded model mutation. The journal drives incremental backends and
/// the staleness clock of the result cache.
#[derive(Debug, Clone)]
pub enum Mutation {
    AddVar { lb: f64, ub: f64, kind: VarKind },
    AddConstraint { lb: f64, ub: f64 },
    SetVarBounds { var: usize, lb: f64, ub: f64 },
    SetConstraintBounds { con: usize, lb: f64, ub: f64 },
    SetCoefficient { con: usize, var: usize, value: f64 },
    SetObjectiveCoefficient { var: usize, value: f64 },
    SetMaximize { maximize: bool },
    SetVarKind { var: usize, kind: VarKind },
}

#[derive(Debug, Clone)]
pub struct Variable {
    index: usize,
    lb: f64,
    ub: f64,
    kind: VarKind,
    name: String,
}

impl Variable {
    pub fn lb(&self) -> f64 {
        self.lb
    }

    pub fn ub(&self) -> f64 {
        self.ub
    }

    pub fn kind(&self) -> VarKind {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Debug, Clone)]
pub struct Constraint {
    lb: f64,
    ub: f64,
    name: String,
    coeffs: Vec<(usize, f64)>,
}

impl Constraint {
    pub fn lb(&self) -> f64 {
        self.lb
    }

    pub fn ub(&self) -> f64 {
        self.ub
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Sparse row coefficients as (variable index, value) pairs. Keys are
    /// unique; insertion order is the order of first assignment.
    pub fn coeffs(&self) -> &[(usize, f64)] {
        &self.coeffs
    }
}

#[derive(Debug, Clone, Default)]
struct Objective {
    coeffs: Vec<f64>,
    maximize: bool,
}

/// Mutable linear/mixed-integer model: variables, constraint rows, and a
/// single objective. Indices are assigned densely in creation order and are
/// never reused or renumbered; appending after a solve only appends.
///
/// A clone keeps the source model's identity, so existing handles are
/// accepted by both copies; edits made after cloning do not propagate
/// between them, and handles minted by one copy after the split may name a
/// different entity (or nothing) in the other.
#[derive(Debug, Clone)]
pub struct Model {
    id: u64,
    variables: Vec<Variable>,
    constraints: Vec<Constraint>,
    objective: Objective,
    journal: Vec<Mutation>,
}

impl Default for Model {
    fn default() -> Self {
        Self::new()
    }
}

impl Model {
    pub fn new() -> Self {
        Self {
            id: NEXT_MODEL_ID.fetch_add(1, Ordering::Relaxed),
            variables: Vec::new(),
            constraints: Vec::new(),
            objective: Objective::default(),
            journal: Vec::new(),
        }
    }

    /// Add a variable with bounds `[lb, ub]`. Binary variables are clamped
    /// into `[0, 1]`. Duplicate names are permitted; names are metadata, not
    /// identity.
    pub fn add_var(
        &mut self,
        lb: f64,
        ub: f64,
        kind: VarKind,
        name: impl Into<String>,
    ) -> Result<VarId, Error> {
        let (lb, ub) = match kind {
            VarKind::Binary => (lb.max(0.), ub.min(1.)),
            _ => (lb, ub),
        };

        check_bounds(lb, ub)?;

        let index = self.variables.len();

        self.variables.push(Variable {
            index,
            lb,
            ub,
            kind,
            name: name.into(),
        });

        self.objective.coeffs.push(0.);
        self.journal.push(Mutation::AddVar { lb, ub, kind });

        Ok(VarId {
            model: self.id,
            index,
        })
    }

    /// Add a binary (0/1 integer) variable.
    pub fn add_binary_var(&mut self, name: impl Into<String>) -> Result<VarId, Error> {
        self.add_var(0., 1., VarKind::Binary, name)
    }

    /// Add an empty constraint row `lb <= a'x <= ub`. Coefficients are set
    /// afterwards with [`Model::set_coefficient`].
    pub fn add_constraint(
        &mut self,
        lb: f64,
        ub: f64,
        name: impl Into<String>,
    ) -> Result<ConId, Error> {
        check_bounds(lb, ub)?;

        let index = self.constraints.len();

        self.constraints.push(Constraint {
            lb,
            ub,
            name: name.into(),
            coeffs: Vec::new(),
        });

        self.journal.push(Mutation::AddConstraint { lb, ub });

        Ok(ConId {
            model: self.id,
            index,
        })
    }

    /// Set the coefficient of `var` in row `con`, replacing any previous
    /// value for that pair. Fails with an ownership error (and mutates
    /// nothing) if either handle belongs to another model.
    pub fn set_coefficient(&mut self, con: ConId, var: VarId, value: f64) -> Result<(), Error> {
        let c = self.check_con(con)?;
        let v = self.check_var(var)?;

        let row = &mut self.constraints[c];

        match row.coeffs.iter_mut().find(|(index, _)| *index == v) {
            Some((_, coeff)) => *coeff = value,
            None => row.coeffs.push((v, value)),
        }

        self.journal.push(Mutation::SetCoefficient {
            con: c,
            var: v,
            value,
        });

        Ok(())
    }

    pub fn set_objective_coefficient(&mut self, var: VarId, value: f64) -> Result<(), Error> {
        let v = self.check_var(var)?;
        self.objective.coeffs[v] = value;
        self.journal
            .push(Mutation::SetObjectiveCoefficient { var: v, value });
        Ok(())
    }

    pub fn set_maximize(&mut self, maximize: bool) {
        self.objective.maximize = maximize;
        self.journal.push(Mutation::SetMaximize { maximize });
    }

    pub fn maximize(&self) -> bool {
        self.objective.maximize
    }

    pub fn set_var_bounds(&mut self, var: VarId, lb: f64, ub: f64) -> Result<(), Error> {
        let v = self.check_var(var)?;
        check_bounds(lb, ub)?;

        self.variables[v].lb = lb;
        self.variables[v].ub = ub;
        self.journal.push(Mutation::SetVarBounds { var: v, lb, ub });

        Ok(())
    }

    pub fn set_constraint_bounds(&mut self, con: ConId, lb: f64, ub: f64) -> Result<(), Error> {
        let c = self.check_con(con)?;
        check_bounds(lb, ub)?;

        self.constraints[c].lb = lb;
        self.constraints[c].ub = ub;
        self.journal
            .push(Mutation::SetConstraintBounds { con: c, lb, ub });

        Ok(())
    }

    /// Promote a continuous variable to integer, or relax an integer (or
    /// binary) variable back to continuous.
    pub fn set_integer(&mut self, var: VarId, integer: bool) -> Result<(), Error> {
        let v = self.check_var(var)?;

        let kind = match (integer, self.variables[v].kind) {
            (true, VarKind::Binary) => VarKind::Binary,
            (true, _) => VarKind::Integer,
            (false, _) => VarKind::Continuous,
        };

        self.variables[v].kind = kind;
        self.journal.push(Mutation::SetVarKind { var: v, kind });

        Ok(())
    }

    pub fn var(&self, var: VarId) -> Result<&Variable, Error> {
        let v = self.check_var(var)?;
        Ok(&self.variables[v])
    }

    pub fn constraint(&self, con: ConId) -> Result<&Constraint, Error> {
        let c = self.check_con(con)?;
        Ok(&self.constraints[c])
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    /// Dense objective coefficients, aligned with variable indices.
    pub fn objective_coefficients(&self) -> &[f64] {
        &self.objective.coeffs
    }

    /// Rebuild the handle for an existing variable index.
    pub fn var_id(&self, index: usize) -> Option<VarId> {
        (index < self.variables.len()).then_some(VarId {
            model: self.id,
            index,
        })
    }

    /// Rebuild the handle for an existing constraint index.
    pub fn con_id(&self, index: usize) -> Option<ConId> {
        (index < self.constraints.len()).then_some(ConId {
            model: self.id,
            index,
        })
    }

    /// Monotone revision counter; bumped by every recorded mutation.
    pub fn revision(&self) -> u64 {
        self.journal.len() as u64
    }

    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    pub(crate) fn journal_since(&self, revision: u64) -> &[Mutation] {
        &self.journal[revision as usize..]
    }

    /// Check a candidate point against all bounds and rows within tolerance.
    pub fn is_feasible(&self, x: &[f64]) -> bool {
        if x.len() != self.variables.len() {
            return false;
        }

        for (var, &val) in self.variables.iter().zip(x.iter()) {
            if val < var.lb - FEAS_EPS || val > var.ub + FEAS_EPS {
                return false;
            }

            if var.kind.is_integer() && (val - val.round()).abs() > FEAS_EPS {
                return false;
            }
        }

        for row in &self.constraints {
            let lhs: f64 = row.coeffs.iter().map(|&(v, coeff)| coeff * x[v]).sum();

            if lhs < row.lb - FEAS_EPS || lhs > row.ub + FEAS_EPS {
                return false;
            }
        }

        true
    }

    /// Objective value of a point, in the model's own sense.
    pub fn objective_value(&self, x: &[f64]) -> f64 {
        self.objective
            .coeffs
            .iter()
            .zip(x.iter())
            .map(|(c, v)| c * v)
            .sum()
    }

    fn check_var(&self, var: VarId) -> Result<usize, Error> {
        if var.model != self.id || var.index >= self.variables.len() {
            return Err(Error::Ownership {
                entity: "variable",
                index: var.index,
            });
        }

        Ok(var.index)
    }

    fn check_con(&self, con: ConId) -> Result<usize, Error> {
        if con.model != self.id || con.index >= self.constraints.len() {
            return Err(Error::Ownership {
                entity: "constraint",
                index: con.index,
            });
        }

        Ok(con.index)
    }
}

fn check_bounds(lb: f64, ub: f64) -> Result<(), Error> {
    if lb > ub {
        return Err(Error::InvalidBounds { lb, ub });
    }

    Ok(())
}

fn display_bound_value(f: &mut std::fmt::Formatter, v: f64, neg: bool) -> std::fmt::Result {
    if v.is_infinite() {
        write!(f, "{}{}", if neg { "-" } else { "" }, INF_STR)
    } else {
        write!(f, "{}", v)
    }
}

fn display_row_bounds(
    f: &mut std::fmt::Formatter,
    lb: f64,
    ub: f64,
    body: impl Fn(&mut std::fmt::Formatter) -> std::fmt::Result,
) -> std::fmt::Result {
    if lb == ub {
        body(f)?;
        return write!(f, " {} {}", EQ_STR, lb);
    }

    if lb.is_finite() && ub.is_infinite() {
        body(f)?;
        return write!(f, " {} {}", GTE_STR, lb);
    }

    if lb.is_infinite() && ub.is_finite() {
        body(f)?;
        return write!(f, " {} {}", LTE_STR, ub);
    }

    if lb.is_infinite() && ub.is_infinite() {
        body(f)?;
        return write!(f, " free");
    }

    write!(f, "{} {} ", lb, LTE_STR)?;
    body(f)?;
    write!(f, " {} {}", LTE_STR, ub)
}

impl std::fmt::Display for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        writeln!(
            f,
            "{}",
            if self.objective.maximize {
                "maximize"
            } else {
                "minimize"
            }
        )?;

        for (var, &coeff) in self.variables.iter().zip(&self.objective.coeffs) {
            if coeff == 0. {
                continue;
            }

            write!(
                f,
                "{} {} {} ",
                if coeff > 0. { "+" } else { "-" },
                coeff.abs(),
                var
            )?;
        }

        writeln!(f, "\n\nsubject to")?;

        for row in &self.constraints {
            display_row_bounds(f, row.lb, row.ub, |f| {
                for (v, coeff) in &row.coeffs {
                    if *coeff == 0. {
                        continue;
                    }

                    write!(
                        f,
                        "{} {} {} ",
                        if *coeff >= 0. { "+" } else { "-" },
                        coeff.abs(),
                        self.variables[*v]
                    )?;
                }

                Ok(())
            })?;

            writeln!(f)?;
        }

        writeln!(f, "\nwith the bounds")?;

        for var in &self.variables {
            if var.lb.is_infinite() && var.ub.is_infinite() {
                write!(f, "{} free", var)?;
            } else {
                display_bound_value(f, var.lb, true)?;
                write!(f, " {} {} {} ", LTE_STR, var, LTE_STR)?;
                display_bound_value(f, var.ub, false)?;
            }

            match var.kind {
                VarKind::Continuous => writeln!(f)?,
                VarKind::Integer => writeln!(f, " (integer)")?,
                VarKind::Binary => writeln!(f, " (binary)")?,
            }
        }

        Ok(())
    }
}

impl std::fmt::Display for Variable {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        if self.name.is_empty() {
            write!(f, "x[{}]", self.index)
        } else {
            write!(f, "{}", self.name)
        }
    }
}
