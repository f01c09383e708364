//! Bulk bound/name retrieval and by-name lookup.
//!
//! Mirrors the batch getter surface of wrapped-solver boundaries ("get all
//! variable lower bounds" in one call) so callers can audit a loaded model
//! without per-entity round trips.

use crate::error::Error;
use crate::model::{ConId, Model, VarId};

impl Model {
    pub fn num_vars(&self) -> usize {
        self.variables().len()
    }

    pub fn num_constraints(&self) -> usize {
        self.constraints().len()
    }

    /// All variable lower bounds, in index order. Infinite bounds come back
    /// as `f64::NEG_INFINITY`, never as a finite stand-in.
    pub fn var_lower_bounds(&self) -> Vec<f64> {
        self.variables().iter().map(|v| v.lb()).collect()
    }

    pub fn var_upper_bounds(&self) -> Vec<f64> {
        self.variables().iter().map(|v| v.ub()).collect()
    }

    pub fn var_names(&self) -> Vec<&str> {
        self.variables().iter().map(|v| v.name()).collect()
    }

    pub fn constraint_lower_bounds(&self) -> Vec<f64> {
        self.constraints().iter().map(|c| c.lb()).collect()
    }

    pub fn constraint_upper_bounds(&self) -> Vec<f64> {
        self.constraints().iter().map(|c| c.ub()).collect()
    }

    pub fn constraint_names(&self) -> Vec<&str> {
        self.constraints().iter().map(|c| c.name()).collect()
    }

    /// Look a variable up by name. `Ok(None)` if absent; duplicate names are
    /// legal at insertion, so a collision here is an error rather than a
    /// silent first-match.
    pub fn var_by_name(&self, name: &str) -> Result<Option<VarId>, Error> {
        let mut matches = self
            .variables()
            .iter()
            .enumerate()
            .filter(|(_, v)| v.name() == name);

        let first = match matches.next() {
            Some((index, _)) => index,
            None => return Ok(None),
        };

        let rest = matches.count();

        if rest > 0 {
            return Err(Error::AmbiguousName {
                name: name.to_string(),
                count: rest + 1,
            });
        }

        Ok(self.var_id(first))
    }

    pub fn constraint_by_name(&self, name: &str) -> Result<Option<ConId>, Error> {
        let mut matches = self
            .constraints()
            .iter()
            .enumerate()
            .filter(|(_, c)| c.name() == name);

        let first = match matches.next() {
            Some((index, _)) => index,
            None => return Ok(None),
        };

        let rest = matches.count();

        if rest > 0 {
            return Err(Error::AmbiguousName {
                name: name.to_string(),
                count: rest + 1,
            });
        }

        Ok(self.con_id(first))
    }
}
