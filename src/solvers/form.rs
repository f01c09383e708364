use crate::error::Error;
use crate::model::{Model, Mutation, VarKind};
use crate::util::FEAS_EPS;

/// One row in backend form: `lb <= coeffs . x <= ub`.
#[derive(Debug, Clone)]
pub(crate) struct LpRow {
    pub coeffs: Vec<(usize, f64)>,
    pub lb: f64,
    pub ub: f64,
}

/// Backend-internal mirror of a model: dense bound arrays, sparse rows, and
/// the objective. A fresh backend rebuilds it from the model on every load;
/// an incremental backend patches it with journal deltas.
#[derive(Debug, Clone)]
pub(crate) struct LpForm {
    pub obj: Vec<f64>,
    pub maximize: bool,
    pub lb: Vec<f64>,
    pub ub: Vec<f64>,
    pub integer: Vec<bool>,
    pub rows: Vec<LpRow>,
}

impl LpForm {
    pub fn from_model(model: &Model) -> Result<Self, Error> {
        let mut form = Self {
            obj: model.objective_coefficients().to_vec(),
            maximize: model.maximize(),
            lb: Vec::with_capacity(model.num_vars()),
            ub: Vec::with_capacity(model.num_vars()),
            integer: Vec::with_capacity(model.num_vars()),
            rows: Vec::with_capacity(model.num_constraints()),
        };

        for var in model.variables() {
            check_bounds(var.lb(), var.ub())?;
            form.lb.push(var.lb());
            form.ub.push(var.ub());
            form.integer.push(var.kind().is_integer());
        }

        for row in model.constraints() {
            check_bounds(row.lb(), row.ub())?;
            form.rows.push(LpRow {
                coeffs: row.coeffs().to_vec(),
                lb: row.lb(),
                ub: row.ub(),
            });
        }

        Ok(form)
    }

    /// Patch the form in place with journal deltas and keep it consistent
    /// with the model that produced them.
    pub fn apply(&mut self, deltas: &[Mutation]) -> Result<(), Error> {
        for delta in deltas {
            match *delta {
                Mutation::AddVar { lb, ub, kind } => {
                    check_bounds(lb, ub)?;
                    self.obj.push(0.);
                    self.lb.push(lb);
                    self.ub.push(ub);
                    self.integer.push(kind.is_integer());
                }

                Mutation::AddConstraint { lb, ub } => {
                    check_bounds(lb, ub)?;
                    self.rows.push(LpRow {
                        coeffs: Vec::new(),
                        lb,
                        ub,
                    });
                }

                Mutation::SetVarBounds { var, lb, ub } => {
                    check_bounds(lb, ub)?;
                    let v = self.check_var(var)?;
                    self.lb[v] = lb;
                    self.ub[v] = ub;
                }

                Mutation::SetConstraintBounds { con, lb, ub } => {
                    check_bounds(lb, ub)?;
                    let c = self.check_con(con)?;
                    self.rows[c].lb = lb;
                    self.rows[c].ub = ub;
                }

                Mutation::SetCoefficient { con, var, value } => {
                    let c = self.check_con(con)?;
                    let v = self.check_var(var)?;
                    let row = &mut self.rows[c];

                    match row.coeffs.iter_mut().find(|(index, _)| *index == v) {
                        Some((_, coeff)) => *coeff = value,
                        None => row.coeffs.push((v, value)),
                    }
                }

                Mutation::SetObjectiveCoefficient { var, value } => {
                    let v = self.check_var(var)?;
                    self.obj[v] = value;
                }

                Mutation::SetMaximize { maximize } => {
                    self.maximize = maximize;
                }

                Mutation::SetVarKind { var, kind } => {
                    let v = self.check_var(var)?;
                    self.integer[v] = kind.is_integer();
                }
            }
        }

        Ok(())
    }

    pub fn num_vars(&self) -> usize {
        self.lb.len()
    }

    pub fn has_integer_vars(&self) -> bool {
        self.integer.iter().any(|&i| i)
    }

    /// Objective value of a point, in the form's own sense.
    pub fn objective_value(&self, x: &[f64]) -> f64 {
        self.obj.iter().zip(x.iter()).map(|(c, v)| c * v).sum()
    }

    /// Check a point against all bounds, integrality flags, and rows within
    /// tolerance.
    pub fn is_feasible(&self, x: &[f64]) -> bool {
        if x.len() != self.lb.len() {
            return false;
        }

        for (j, &value) in x.iter().enumerate() {
            if value < self.lb[j] - FEAS_EPS || value > self.ub[j] + FEAS_EPS {
                return false;
            }

            if self.integer[j] && (value - value.round()).abs() > FEAS_EPS {
                return false;
            }
        }

        for row in &self.rows {
            let lhs: f64 = row.coeffs.iter().map(|&(v, coeff)| coeff * x[v]).sum();

            if lhs < row.lb - FEAS_EPS || lhs > row.ub + FEAS_EPS {
                return false;
            }
        }

        true
    }

    fn check_var(&self, var: usize) -> Result<usize, Error> {
        if var >= self.lb.len() {
            return Err(Error::Ownership {
                entity: "variable",
                index: var,
            });
        }

        Ok(var)
    }

    fn check_con(&self, con: usize) -> Result<usize, Error> {
        if con >= self.rows.len() {
            return Err(Error::Ownership {
                entity: "constraint",
                index: con,
            });
        }

        Ok(con)
    }
}

fn check_bounds(lb: f64, ub: f64) -> Result<(), Error> {
    if lb > ub {
        return Err(Error::InvalidBounds { lb, ub });
    }

    Ok(())
}
