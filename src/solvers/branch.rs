//! Branch and bound over the LP relaxation for integer variables.

use crate::error::Error;
use crate::solver::RawOutcome;
use crate::solvers::form::LpForm;
use crate::solvers::tableau::solve_relaxation;
use crate::util::{EPS, INT_EPS};

use log::{debug, trace};

/// Solve `form`, honoring integrality flags. Pure LPs go straight to the
/// relaxation. Nodes are explored depth-first, rounding-down side first,
/// and pruned against the incumbent objective. An interrupted search
/// reports `IterationLimit` even when an incumbent exists: the incumbent
/// is unproven until the tree is exhausted.
pub(crate) fn solve(
    form: &LpForm,
    max_iter: u64,
    max_nodes: u64,
    backend: &'static str,
) -> Result<RawOutcome, Error> {
    if !form.has_integer_vars() {
        return solve_relaxation(form, max_iter, backend);
    }

    // internal comparisons happen in minimization space
    let key = |objective: f64| {
        if form.maximize {
            -objective
        } else {
            objective
        }
    };

    let mut best: Option<(f64, Vec<f64>)> = None;
    let mut stack = vec![(form.lb.clone(), form.ub.clone())];
    let mut nodes = 0u64;
    let mut limit_hit = false;

    while let Some((lb, ub)) = stack.pop() {
        if nodes >= max_nodes {
            debug!("node limit {} reached", max_nodes);
            limit_hit = true;
            break;
        }

        nodes += 1;

        // branching can cross bounds over; such nodes are empty
        if lb.iter().zip(&ub).any(|(l, u)| l > u) {
            continue;
        }

        let mut node = form.clone();
        node.lb = lb;
        node.ub = ub;

        let (objective, x) = match solve_relaxation(&node, max_iter, backend)? {
            RawOutcome::Optimal { objective, x } => (objective, x),
            RawOutcome::Infeasible => continue,

            // an unbounded relaxation at any node means no integer optimum
            // can be certified; report it as the problem's outcome
            RawOutcome::Unbounded => return Ok(RawOutcome::Unbounded),

            RawOutcome::IterationLimit => {
                limit_hit = true;
                continue;
            }
        };

        if let Some((incumbent, _)) = &best {
            if key(objective) >= key(*incumbent) - EPS {
                trace!("pruned node at objective {}", objective);
                continue;
            }
        }

        let branch_var = match most_fractional(&node, &x, INT_EPS) {
            Some(j) => Some(j),

            None => {
                // integral within tolerance: snap, verify, and score exactly
                let mut snapped = x.clone();

                for (j, value) in snapped.iter_mut().enumerate() {
                    if node.integer[j] {
                        *value = value.round();
                    }
                }

                if form.is_feasible(&snapped) {
                    let objective = form.objective_value(&snapped);

                    let improved = match &best {
                        Some((incumbent, _)) => key(objective) < key(*incumbent) - EPS,
                        None => true,
                    };

                    if improved {
                        debug!("incumbent updated: {}", objective);
                        best = Some((objective, snapped));
                    }

                    None
                } else {
                    // rounding pushed the point past a tight bound or row;
                    // branch on the offending variable instead of accepting it
                    most_fractional(&node, &x, EPS)
                }
            }
        };

        if let Some(j) = branch_var {
            let floor = x[j].floor();

            let mut up_lb = node.lb.clone();
            up_lb[j] = floor + 1.;
            stack.push((up_lb, node.ub.clone()));

            let mut down_ub = node.ub.clone();
            down_ub[j] = floor;
            stack.push((node.lb.clone(), down_ub));
        }
    }

    if limit_hit {
        return Ok(RawOutcome::IterationLimit);
    }

    match best {
        Some((objective, x)) => Ok(RawOutcome::Optimal { objective, x }),
        None => Ok(RawOutcome::Infeasible),
    }
}

/// Integer variable whose relaxation value is farther than `threshold` from
/// an integer.
fn most_fractional(form: &LpForm, x: &[f64], threshold: f64) -> Option<usize> {
    let mut pick = None;
    let mut pick_frac = threshold;

    for (j, &value) in x.iter().enumerate() {
        if !form.integer[j] {
            continue;
        }

        let frac = (value - value.round()).abs();

        if frac > pick_frac {
            pick = Some(j);
            pick_frac = frac;
        }
    }

    pick
}
