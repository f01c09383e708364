use crate::error::{codes, Error};
use crate::model::{Model, Mutation, VarId};

use log::debug;

/// Solve outcome classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveStatus {
    Optimal,
    Infeasible,
    Unbounded,
    /// The backend hit its iteration or node limit before proving anything.
    IterationLimit,
    NotSolved,
}

impl SolveStatus {
    pub fn is_optimal(self) -> bool {
        matches!(self, SolveStatus::Optimal)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SolveStatus::Optimal => "optimal",
            SolveStatus::Infeasible => "infeasible",
            SolveStatus::Unbounded => "unbounded",
            SolveStatus::IterationLimit => "iteration_limit",
            SolveStatus::NotSolved => "not_solved",
        }
    }
}

impl std::fmt::Display for SolveStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Read-only snapshot of an optimal solve, stamped with the model revision
/// it was produced from.
#[derive(Debug, Clone)]
pub struct Solution {
    model: u64,
    revision: u64,
    objective: f64,
    x: Vec<f64>,
}

impl Solution {
    pub(crate) fn new(model: &Model, objective: f64, x: Vec<f64>) -> Self {
        Self {
            model: model.id(),
            revision: model.revision(),
            objective,
            x,
        }
    }

    /// Objective value in the model's own sense (maximize or minimize).
    pub fn objective_value(&self) -> f64 {
        self.objective
    }

    /// All variable values, in index order.
    pub fn values(&self) -> &[f64] {
        &self.x
    }

    /// Value of a single variable; fails if the handle belongs to a
    /// different model or to an index created after this solve.
    pub fn value(&self, var: VarId) -> Result<f64, Error> {
        if var.model() != self.model || var.index() >= self.x.len() {
            return Err(Error::Ownership {
                entity: "variable",
                index: var.index(),
            });
        }

        Ok(self.x[var.index()])
    }
}

/// Infeasible and unbounded are first-class outcomes here, not errors; only
/// backend faults (bad status codes, misuse) surface as `Err`.
#[derive(Debug, Clone)]
pub enum SolveOutcome {
    Optimal(Solution),
    Infeasible,
    Unbounded,
    IterationLimit,
}

impl SolveOutcome {
    pub fn status(&self) -> SolveStatus {
        match self {
            SolveOutcome::Optimal(..) => SolveStatus::Optimal,
            SolveOutcome::Infeasible => SolveStatus::Infeasible,
            SolveOutcome::Unbounded => SolveStatus::Unbounded,
            SolveOutcome::IterationLimit => SolveStatus::IterationLimit,
        }
    }

    pub fn solution(&self) -> Option<&Solution> {
        match self {
            SolveOutcome::Optimal(solution) => Some(solution),
            _ => None,
        }
    }
}

/// What a backend reports before the session stamps it with model identity.
#[derive(Debug, Clone)]
pub enum RawOutcome {
    Optimal { objective: f64, x: Vec<f64> },
    Infeasible,
    Unbounded,
    IterationLimit,
}

/// Contract a concrete numeric backend must satisfy.
///
/// A fresh-solve backend reconstructs its internal representation on every
/// [`SolverBackend::load`]; an incremental backend additionally accepts
/// mutation deltas through [`SolverBackend::apply`] without discarding the
/// already-loaded representation. The driving [`Session`] consults
/// [`SolverBackend::supports_incremental`] and never calls `apply` on a
/// backend that opts out.
pub trait SolverBackend {
    fn name(&self) -> &'static str;

    /// Replace the backend's internal representation with `model`.
    /// Re-validates bounds; `lb > ub` anywhere is an `InvalidBounds` error.
    fn load(&mut self, model: &Model) -> Result<(), Error>;

    fn supports_incremental(&self) -> bool {
        false
    }

    /// Apply mutation deltas to the loaded representation.
    fn apply(&mut self, _deltas: &[Mutation]) -> Result<(), Error> {
        Err(Error::Backend {
            backend: self.name(),
            code: codes::UNSUPPORTED_UPDATE,
        })
    }

    /// Solve the loaded representation. Blocks the caller; limits are
    /// backend construction parameters, not external cancellations.
    fn solve(&mut self) -> Result<RawOutcome, Error>;
}

struct Cached {
    model: u64,
    revision: u64,
    outcome: SolveOutcome,
}

/// Owns a backend exclusively and drives load/delta/solve against a model,
/// caching the last outcome keyed by the model revision.
///
/// Stale policy: any model mutation after a solve makes the cached results
/// unreadable (`StaleSolution`) until the caller re-solves explicitly. There
/// is no implicit re-solve hidden in a getter. A failed or non-optimal solve
/// leaves the model untouched and reusable.
///
/// Neither the session nor the model is thread-safe for concurrent mutation
/// and solving; callers synchronize externally or keep both on one thread.
pub struct Session<B: SolverBackend> {
    backend: B,
    synced: Option<(u64, u64)>,
    cache: Option<Cached>,
}

impl<B: SolverBackend> Session<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            synced: None,
            cache: None,
        }
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Load or update the backend as needed, solve, and cache the outcome.
    pub fn solve(&mut self, model: &Model) -> Result<&SolveOutcome, Error> {
        match self.synced {
            Some((id, revision)) if id == model.id() => {
                if revision == model.revision() {
                    debug!("backend {} in sync, re-solving", self.backend.name());
                } else if self.backend.supports_incremental() {
                    let deltas = model.journal_since(revision);
                    debug!(
                        "applying {} deltas to backend {}",
                        deltas.len(),
                        self.backend.name()
                    );
                    self.backend.apply(deltas)?;
                } else {
                    debug!("reloading backend {}", self.backend.name());
                    self.backend.load(model)?;
                }
            }

            _ => {
                debug!("loading model into backend {}", self.backend.name());
                self.backend.load(model)?;
            }
        }

        // stamp before solving: a backend fault after a successful load or
        // apply must not replay the same deltas on the next attempt
        self.synced = Some((model.id(), model.revision()));

        let raw = self.backend.solve()?;

        let outcome = match raw {
            RawOutcome::Optimal { objective, x } => {
                SolveOutcome::Optimal(Solution::new(model, objective, x))
            }
            RawOutcome::Infeasible => SolveOutcome::Infeasible,
            RawOutcome::Unbounded => SolveOutcome::Unbounded,
            RawOutcome::IterationLimit => SolveOutcome::IterationLimit,
        };

        let cached = self.cache.insert(Cached {
            model: model.id(),
            revision: model.revision(),
            outcome,
        });

        Ok(&cached.outcome)
    }

    /// The cached outcome for `model`, failing fast on stale or absent data.
    pub fn outcome(&self, model: &Model) -> Result<&SolveOutcome, Error> {
        let cached = self.cache.as_ref().ok_or(Error::NotSolved)?;

        if cached.model != model.id() || cached.revision != model.revision() {
            return Err(Error::StaleSolution);
        }

        Ok(&cached.outcome)
    }

    /// Status of the cached outcome; `NotSolved` before the first solve,
    /// `StaleSolution` error after a mutation.
    pub fn status(&self, model: &Model) -> Result<SolveStatus, Error> {
        match self.outcome(model) {
            Ok(outcome) => Ok(outcome.status()),
            Err(Error::NotSolved) => Ok(SolveStatus::NotSolved),
            Err(err) => Err(err),
        }
    }

    /// Cached objective value; `None` when the last outcome had no solution.
    pub fn objective_value(&self, model: &Model) -> Result<Option<f64>, Error> {
        Ok(self.outcome(model)?.solution().map(|s| s.objective_value()))
    }

    /// Cached value of one variable; `None` when the last outcome had no
    /// solution.
    pub fn value(&self, model: &Model, var: VarId) -> Result<Option<f64>, Error> {
        match self.outcome(model)?.solution() {
            Some(solution) => solution.value(var).map(Some),
            None => Ok(None),
        }
    }
}
