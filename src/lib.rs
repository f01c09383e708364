//! A backend-agnostic linear and mixed-integer programming layer.
//!
//! Models are built incrementally through [`Model`], solved through a
//! [`Session`] wrapping any [`SolverBackend`], and read back through an
//! ownership-checked [`Solution`] view. Mutating a model after a solve
//! invalidates cached results; the next [`Session::solve`] either replays
//! the mutation journal into an incremental backend or reloads from
//! scratch. Models round-trip through free-form MPS text via the [`mps`]
//! module.

pub mod error;
pub mod model;
pub mod mps;
pub mod solver;
pub mod solvers;

mod registry;
mod util;

pub use crate::error::{codes, Error};
pub use crate::model::{ConId, Constraint, Model, Mutation, VarId, VarKind, Variable};
pub use crate::mps::{parse_mps, write_mps};
pub use crate::solver::{RawOutcome, Session, Solution, SolveOutcome, SolveStatus, SolverBackend};
pub use crate::solvers::dense::DenseSimplexBackend;
pub use crate::solvers::incremental::IncrementalSimplexBackend;
