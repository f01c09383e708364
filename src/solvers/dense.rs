use crate::error::{codes, Error};
use crate::model::Model;
use crate::solver::{RawOutcome, SolverBackend};
use crate::solvers::branch;
use crate::solvers::form::LpForm;

const NAME: &str = "dense-simplex";

/// Fresh-solve backend: every load reconstructs the internal form from the
/// model, and the session reloads it after any mutation.
pub struct DenseSimplexBackend {
    max_iterations: u64,
    max_nodes: u64,
    form: Option<LpForm>,
}

impl Default for DenseSimplexBackend {
    fn default() -> Self {
        Self {
            max_iterations: 10_000,
            max_nodes: 10_000,
            form: None,
        }
    }
}

impl DenseSimplexBackend {
    pub fn new() -> Self {
        Default::default()
    }

    /// Limits are solve-budget configuration, not external cancellation.
    pub fn with_limits(max_iterations: u64, max_nodes: u64) -> Self {
        Self {
            max_iterations,
            max_nodes,
            form: None,
        }
    }
}

impl SolverBackend for DenseSimplexBackend {
    fn name(&self) -> &'static str {
        NAME
    }

    fn load(&mut self, model: &Model) -> Result<(), Error> {
        self.form = Some(LpForm::from_model(model)?);
        Ok(())
    }

    fn solve(&mut self) -> Result<RawOutcome, Error> {
        let form = self.form.as_ref().ok_or(Error::Backend {
            backend: NAME,
            code: codes::NOT_LOADED,
        })?;

        branch::solve(form, self.max_iterations, self.max_nodes, NAME)
    }
}
