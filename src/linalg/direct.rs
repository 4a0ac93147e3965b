use nalgebra::{DMatrix, DVector};
use sprs::CsMat;

use super::solver::{norm, residual_norm, Solver, SolverStats};

/// Dense LU fallback.
///
/// Densifies the operator, so only sensible for small grids (idealized
/// benchmark domains); the iterative solvers are the production path.
pub struct DirectSolver;

impl DirectSolver {
    pub fn new() -> Self {
        Self
    }
}

impl Default for DirectSolver {
    fn default() -> Self {
        Self::new()
    }
}

impl Solver for DirectSolver {
    fn solve(&self, a: &CsMat<f64>, b: &[f64], _x0: Option<&[f64]>) -> (Vec<f64>, SolverStats) {
        let n = b.len();
        let mut dense = DMatrix::zeros(n, n);
        for (row, vec) in a.outer_iterator().enumerate() {
            for (col, &val) in vec.iter() {
                dense[(row, col)] = val;
            }
        }

        let lu = dense.lu();
        let rhs = DVector::from_column_slice(b);
        let x: Vec<f64> = match lu.solve(&rhs) {
            Some(sol) => sol.iter().copied().collect(),
            None => {
                return (
                    vec![0.0; n],
                    SolverStats {
                        converged: false,
                        residual_norm: norm(b),
                        relative_residual: 1.0,
                        ..Default::default()
                    },
                )
            }
        };

        let res = residual_norm(a, &x, b);
        let b_norm = norm(b);
        let rel = if b_norm > 0.0 { res / b_norm } else { 0.0 };

        (
            x,
            SolverStats {
                iterations: 0,
                residual_norm: res,
                relative_residual: rel,
                converged: rel < 1e-8,
            },
        )
    }

    fn name(&self) -> &'static str {
        "direct"
    }
}
