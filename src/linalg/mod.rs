//! Sparse linear solvers for the depth-integrated momentum system.
//!
//! The momentum assembly produces a CSR matrix; everything here consumes it
//! through the [`Solver`] trait so the backend can be swapped per
//! configuration.

pub mod direct;
pub mod iterative;
pub mod preconditioner;
pub mod solver;

pub use direct::DirectSolver;
pub use iterative::{BiCgStab, ConjugateGradient};
pub use preconditioner::{IdentityPreconditioner, JacobiPreconditioner, Preconditioner};
pub use solver::{Solver, SolverStats};

use crate::config::{DivaParams, LinearSolverKind};

/// Instantiate the configured linear solver.
pub fn make_solver(params: &DivaParams) -> Box<dyn Solver> {
    match params.solver {
        LinearSolverKind::ConjugateGradient => Box::new(
            ConjugateGradient::new()
                .with_tolerance(params.lin_tol)
                .with_max_iterations(params.lin_max_iter),
        ),
        LinearSolverKind::BiCgStab => Box::new(
            BiCgStab::new()
                .with_tolerance(params.lin_tol)
                .with_max_iterations(params.lin_max_iter),
        ),
        LinearSolverKind::Direct => Box::new(DirectSolver::new()),
    }
}
