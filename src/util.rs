/// Pivot and comparison tolerance for the dense kernels.
pub const EPS: f64 = 1e-9;

/// Feasibility tolerance for phase-1 objectives and point checks.
pub const FEAS_EPS: f64 = 1e-7;

/// Integrality tolerance for branch and bound.
pub const INT_EPS: f64 = 1e-6;
