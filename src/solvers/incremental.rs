use crate::error::{codes, Error};
use crate::model::{Model, Mutation};
use crate::solver::{RawOutcome, SolverBackend};
use crate::solvers::branch;
use crate::solvers::form::LpForm;

use log::trace;

const NAME: &str = "incremental-simplex";

/// Incremental backend: keeps the loaded internal form and patches it with
/// journal deltas instead of rebuilding, so bound changes, coefficient
/// changes, integrality promotions, and appended entities each re-solve
/// without reconstructing earlier parts of the model.
pub struct IncrementalSimplexBackend {
    max_iterations: u64,
    max_nodes: u64,
    form: Option<LpForm>,
}

impl Default for IncrementalSimplexBackend {
    fn default() -> Self {
        Self {
            max_iterations: 10_000,
            max_nodes: 10_000,
            form: None,
        }
    }
}

impl IncrementalSimplexBackend {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn with_limits(max_iterations: u64, max_nodes: u64) -> Self {
        Self {
            max_iterations,
            max_nodes,
            form: None,
        }
    }
}

impl SolverBackend for IncrementalSimplexBackend {
    fn name(&self) -> &'static str {
        NAME
    }

    fn load(&mut self, model: &Model) -> Result<(), Error> {
        self.form = Some(LpForm::from_model(model)?);
        Ok(())
    }

    fn supports_incremental(&self) -> bool {
        true
    }

    fn apply(&mut self, deltas: &[Mutation]) -> Result<(), Error> {
        let form = self.form.as_mut().ok_or(Error::Backend {
            backend: NAME,
            code: codes::NOT_LOADED,
        })?;

        trace!("patching loaded form with {} deltas", deltas.len());
        form.apply(deltas)
    }

    fn solve(&mut self) -> Result<RawOutcome, Error> {
        let form = self.form.as_ref().ok_or(Error::Backend {
            backend: NAME,
            code: codes::NOT_LOADED,
        })?;

        branch::solve(form, self.max_iterations, self.max_nodes, NAME)
    }
}
