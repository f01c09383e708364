//! Dense two-phase tableau simplex over an [`LpForm`] relaxation.
//!
//! General bounds are lowered to standard form (all columns nonnegative):
//! a finite lower bound shifts the column, a sole finite upper bound reflects
//! it, and a free variable splits into a positive and a negative part. Row
//! bounds become at most two one-sided rows plus slack/surplus columns, with
//! artificials for rows that lack an identity column. Bland's smallest-index
//! rule keeps degenerate problems from cycling.

use crate::error::Error;
use crate::solver::RawOutcome;
use crate::solvers::form::LpForm;
use crate::util::{EPS, FEAS_EPS};

use log::{debug, trace};

use nalgebra::DMatrix;

#[derive(Debug, Clone, Copy)]
enum Subst {
    /// `x = offset + y`, `y >= 0` (finite lower bound).
    Shift { col: usize, offset: f64 },
    /// `x = offset - y`, `y >= 0` (finite upper bound only).
    Reflect { col: usize, offset: f64 },
    /// `x = y_pos - y_neg` (free).
    Split { pos: usize, neg: usize },
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum RowOp {
    Lte,
    Gte,
    Eq,
}

enum Step {
    Optimal,
    Unbounded,
    IterationLimit,
}

/// Solve the continuous relaxation of `form`, ignoring integrality flags.
/// The reported objective is in the form's own sense.
pub(crate) fn solve_relaxation(
    form: &LpForm,
    max_iter: u64,
    backend: &'static str,
) -> Result<RawOutcome, Error> {
    let n = form.num_vars();
    let sense = if form.maximize { -1. } else { 1. };

    let mut substs = Vec::with_capacity(n);
    let mut cost = Vec::new();
    let mut next_col = 0;

    for j in 0..n {
        let c_j = sense * form.obj[j];

        let subst = if form.lb[j].is_finite() {
            cost.push(c_j);
            let s = Subst::Shift {
                col: next_col,
                offset: form.lb[j],
            };
            next_col += 1;
            s
        } else if form.ub[j].is_finite() {
            cost.push(-c_j);
            let s = Subst::Reflect {
                col: next_col,
                offset: form.ub[j],
            };
            next_col += 1;
            s
        } else {
            cost.push(c_j);
            cost.push(-c_j);
            let s = Subst::Split {
                pos: next_col,
                neg: next_col + 1,
            };
            next_col += 2;
            s
        };

        substs.push(subst);
    }

    let ncols = next_col;
    let mut std_rows: Vec<(Vec<f64>, RowOp, f64)> = Vec::new();

    // upper-bound rows for shifted columns
    for j in 0..n {
        if let Subst::Shift { col, offset } = substs[j] {
            if form.ub[j].is_finite() {
                let mut a = vec![0.; ncols];
                a[col] = 1.;
                std_rows.push((a, RowOp::Lte, form.ub[j] - offset));
            }
        }
    }

    for row in &form.rows {
        if row.lb.is_infinite() && row.ub.is_infinite() {
            continue;
        }

        let mut a = vec![0.; ncols];
        let mut shift = 0.;

        for &(j, coeff) in &row.coeffs {
            match substs[j] {
                Subst::Shift { col, offset } => {
                    a[col] += coeff;
                    shift += coeff * offset;
                }

                Subst::Reflect { col, offset } => {
                    a[col] -= coeff;
                    shift += coeff * offset;
                }

                Subst::Split { pos, neg } => {
                    a[pos] += coeff;
                    a[neg] -= coeff;
                }
            }
        }

        if row.lb == row.ub {
            std_rows.push((a, RowOp::Eq, row.lb - shift));
        } else {
            if row.lb.is_finite() {
                std_rows.push((a.clone(), RowOp::Gte, row.lb - shift));
            }

            if row.ub.is_finite() {
                std_rows.push((a, RowOp::Lte, row.ub - shift));
            }
        }
    }

    if std_rows.is_empty() {
        // separable: every column sits at zero unless its cost is negative,
        // in which case it can grow without limit
        if cost.iter().any(|&c| c < -EPS) {
            return Ok(RawOutcome::Unbounded);
        }

        let x = recover(&substs, &vec![0.; ncols]);
        let objective = form.objective_value(&x);
        return Ok(RawOutcome::Optimal { objective, x });
    }

    for (a, op, rhs) in &mut std_rows {
        if *rhs < 0. {
            for v in a.iter_mut() {
                *v = -*v;
            }

            *rhs = -*rhs;

            *op = match *op {
                RowOp::Lte => RowOp::Gte,
                RowOp::Gte => RowOp::Lte,
                RowOp::Eq => RowOp::Eq,
            };
        }
    }

    let m = std_rows.len();
    let num_slack = std_rows.iter().filter(|(_, op, _)| *op != RowOp::Eq).count();
    let num_art = std_rows.iter().filter(|(_, op, _)| *op != RowOp::Lte).count();

    let slack_start = ncols;
    let art_start = slack_start + num_slack;
    let total = art_start + num_art;

    let mut t = DMatrix::<f64>::zeros(m, total + 1);
    let mut basis = vec![0usize; m];
    let mut slack_col = slack_start;
    let mut art_col = art_start;

    for (i, (a, op, rhs)) in std_rows.iter().enumerate() {
        for (j, &v) in a.iter().enumerate() {
            t[(i, j)] = v;
        }

        t[(i, total)] = *rhs;

        match op {
            RowOp::Lte => {
                t[(i, slack_col)] = 1.;
                basis[i] = slack_col;
                slack_col += 1;
            }

            RowOp::Gte => {
                t[(i, slack_col)] = -1.;
                slack_col += 1;
                t[(i, art_col)] = 1.;
                basis[i] = art_col;
                art_col += 1;
            }

            RowOp::Eq => {
                t[(i, art_col)] = 1.;
                basis[i] = art_col;
                art_col += 1;
            }
        }
    }

    if num_art > 0 {
        let mut phase_1_cost = vec![0.; total];

        for c in phase_1_cost.iter_mut().skip(art_start) {
            *c = 1.;
        }

        match run_simplex(&mut t, &mut basis, &phase_1_cost, max_iter) {
            Step::Optimal => (),
            Step::IterationLimit => return Ok(RawOutcome::IterationLimit),

            // the phase-1 objective is bounded below by zero, so an
            // unbounded report here is a numerical breakdown
            Step::Unbounded => {
                return Err(Error::Backend {
                    backend,
                    code: crate::error::codes::NUMERICAL_BREAKDOWN,
                })
            }
        }

        let infeasibility = objective_of(&t, &basis, &phase_1_cost);
        debug!("phase 1 objective: {}", infeasibility);

        if infeasibility > FEAS_EPS {
            return Ok(RawOutcome::Infeasible);
        }

        // drive leftover artificials out of the basis; rows that cannot be
        // repaired are redundant and dropped together with all artificial
        // columns
        let mut keep = vec![true; m];

        for i in 0..m {
            if basis[i] >= art_start {
                let replacement = (0..art_start).find(|&j| t[(i, j)].abs() > EPS);

                match replacement {
                    Some(j) => pivot(&mut t, &mut basis, i, j),
                    None => keep[i] = false,
                }
            }
        }

        let kept: Vec<usize> = (0..m).filter(|&i| keep[i]).collect();
        let mut reduced = DMatrix::<f64>::zeros(kept.len(), art_start + 1);
        let mut reduced_basis = Vec::with_capacity(kept.len());

        for (i2, &i) in kept.iter().enumerate() {
            for j in 0..art_start {
                reduced[(i2, j)] = t[(i, j)];
            }

            reduced[(i2, art_start)] = t[(i, total)];
            reduced_basis.push(basis[i]);
        }

        t = reduced;
        basis = reduced_basis;
    }

    let mut phase_2_cost = vec![0.; t.ncols() - 1];
    phase_2_cost[..ncols].copy_from_slice(&cost);

    match run_simplex(&mut t, &mut basis, &phase_2_cost, max_iter) {
        Step::Optimal => (),
        Step::Unbounded => return Ok(RawOutcome::Unbounded),
        Step::IterationLimit => return Ok(RawOutcome::IterationLimit),
    }

    let rhs_col = t.ncols() - 1;
    let mut y = vec![0.; ncols];

    for (i, &b) in basis.iter().enumerate() {
        if b < ncols {
            y[b] = t[(i, rhs_col)].max(0.);
        }
    }

    let x = recover(&substs, &y);
    let objective = form.objective_value(&x);

    debug!("optimal, objective: {}", objective);

    Ok(RawOutcome::Optimal { objective, x })
}

/// One simplex run with Bland's rule. The tableau stays row-reduced with
/// respect to the basis throughout.
fn run_simplex(t: &mut DMatrix<f64>, basis: &mut [usize], cost: &[f64], max_iter: u64) -> Step {
    let m = t.nrows();
    let rhs_col = t.ncols() - 1;
    let mut iter = 0u64;

    loop {
        if iter >= max_iter {
            debug!("reached max iterations ({})", max_iter);
            return Step::IterationLimit;
        }

        iter += 1;

        // entering: smallest column index with a negative reduced cost
        let mut entering = None;

        'columns: for j in 0..rhs_col {
            let mut r = cost[j];

            for i in 0..m {
                let c_b = cost[basis[i]];

                if c_b != 0. {
                    r -= c_b * t[(i, j)];
                }
            }

            if r < -EPS {
                entering = Some(j);
                break 'columns;
            }
        }

        let e = match entering {
            Some(e) => e,
            None => return Step::Optimal,
        };

        // leaving: minimum ratio, ties broken by smallest basis index
        let mut leave: Option<usize> = None;
        let mut best = f64::INFINITY;

        for i in 0..m {
            let a = t[(i, e)];

            if a > EPS {
                let ratio = t[(i, rhs_col)].max(0.) / a;

                let better = match leave {
                    None => true,
                    Some(l) => {
                        ratio < best - EPS || ((ratio - best).abs() <= EPS && basis[i] < basis[l])
                    }
                };

                if better {
                    leave = Some(i);
                    best = ratio;
                }
            }
        }

        let l = match leave {
            Some(l) => l,
            None => return Step::Unbounded,
        };

        trace!("pivot: col {} enters, row {} (basis {}) leaves", e, l, basis[l]);
        pivot(t, basis, l, e);
    }
}

fn pivot(t: &mut DMatrix<f64>, basis: &mut [usize], row: usize, col: usize) {
    let p = t[(row, col)];
    let ncols = t.ncols();

    for j in 0..ncols {
        t[(row, j)] /= p;
    }

    t[(row, col)] = 1.;

    for i in 0..t.nrows() {
        if i == row {
            continue;
        }

        let f = t[(i, col)];

        if f == 0. {
            continue;
        }

        for j in 0..ncols {
            t[(i, j)] -= f * t[(row, j)];
        }

        t[(i, col)] = 0.;
    }

    basis[row] = col;
}

fn objective_of(t: &DMatrix<f64>, basis: &[usize], cost: &[f64]) -> f64 {
    let rhs_col = t.ncols() - 1;

    basis
        .iter()
        .enumerate()
        .map(|(i, &b)| cost[b] * t[(i, rhs_col)])
        .sum()
}

fn recover(substs: &[Subst], y: &[f64]) -> Vec<f64> {
    substs
        .iter()
        .map(|s| match *s {
            Subst::Shift { col, offset } => offset + y[col],
            Subst::Reflect { col, offset } => offset - y[col],
            Subst::Split { pos, neg } => y[pos] - y[neg],
        })
        .collect()
}
