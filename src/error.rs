//! Error types for the velocity core.
//!
//! Every failure mode of the solver is representable as a value: invalid
//! configuration is rejected before the first iteration, a failed linear
//! solve aborts the call, and non-convergence of the outer fixed-point loop
//! is *not* an error (the latest iterate is returned with a warning).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DivaError {
    /// A parameter violates its documented constraint. Raised by
    /// `DivaParams::validate` before any iteration runs.
    #[error("invalid parameter `{name}` = {value}: {constraint}")]
    InvalidParameter {
        name: &'static str,
        value: f64,
        constraint: &'static str,
    },

    /// A field was supplied with dimensions that do not match the grid.
    #[error("field `{name}` has {got} entries, grid expects {expected}")]
    GridMismatch {
        name: &'static str,
        got: usize,
        expected: usize,
    },

    /// The sparse linear solver did not reach its tolerance. This is fatal
    /// for the whole velocity solve: without a valid momentum update the
    /// fixed-point iteration cannot continue.
    #[error("linear solver failed after {iterations} iterations (relative residual {residual:.3e})")]
    LinearSolverFailure { iterations: usize, residual: f64 },

    /// Configuration file could not be read or parsed.
    #[error("failed to load parameters: {0}")]
    ConfigIo(String),
}
