use thiserror::Error;

/// Raw backend status codes carried by [`Error::Backend`].
///
/// Pure-Rust backends report failures through the same numeric channel a
/// foreign solver context would, so the original code survives the adapter
/// boundary verbatim.
pub mod codes {
    /// The backend hit a numerical breakdown (e.g. a singular basis).
    pub const NUMERICAL_BREAKDOWN: i32 = 1;
    /// The backend was asked to apply deltas it does not support.
    pub const UNSUPPORTED_UPDATE: i32 = 2;
    /// Solve was called before a model was loaded.
    pub const NOT_LOADED: i32 = 3;
}

#[derive(Error, Debug)]
pub enum Error {
    /// A handle was used with a model that does not own it.
    #[error("{entity} {index} does not belong to this model")]
    Ownership {
        entity: &'static str,
        index: usize,
    },

    /// A lower bound exceeded its upper bound.
    #[error("invalid bounds: lower {lb} exceeds upper {ub}")]
    InvalidBounds { lb: f64, ub: f64 },

    /// A by-name lookup matched more than one entity.
    #[error("name {name:?} is ambiguous: {count} entities share it")]
    AmbiguousName { name: String, count: usize },

    /// A backend failed with a raw status code.
    #[error("backend {backend} returned status code {code}")]
    Backend { backend: &'static str, code: i32 },

    /// The model changed since the last solve; results must not be read.
    #[error("solution is stale: the model was mutated after the last solve")]
    StaleSolution,

    /// Results were read before any solve.
    #[error("no solution available: the model has not been solved")]
    NotSolved,

    /// The exchange format could not be written or parsed.
    #[error("exchange format error: {0}")]
    Format(String),
}
