//! Krylov solvers for the momentum system.
//!
//! Both solvers are Jacobi-preconditioned and accept a warm-start iterate.
//! The SSA operator is symmetric, so conjugate gradients apply; BiCGSTAB is
//! the default because Dirichlet rows from the solver mask break exact
//! symmetry.

use sprs::CsMat;

use super::preconditioner::{JacobiPreconditioner, Preconditioner};
use super::solver::{dot, norm, spmv, Solver, SolverStats};

/// Conjugate Gradient for symmetric positive definite systems.
pub struct ConjugateGradient {
    max_iterations: usize,
    tolerance: f64,
    abs_tolerance: f64,
}

impl ConjugateGradient {
    pub fn new() -> Self {
        Self {
            max_iterations: 5000,
            tolerance: 1e-9,
            abs_tolerance: 1e-14,
        }
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }
}

impl Default for ConjugateGradient {
    fn default() -> Self {
        Self::new()
    }
}

impl Solver for ConjugateGradient {
    fn solve(&self, a: &CsMat<f64>, b: &[f64], x0: Option<&[f64]>) -> (Vec<f64>, SolverStats) {
        let n = b.len();
        let b_norm = norm(b);
        if b_norm < 1e-300 {
            return (
                vec![0.0; n],
                SolverStats {
                    converged: true,
                    ..Default::default()
                },
            );
        }

        let precond = JacobiPreconditioner::new(a);

        let mut x = match x0 {
            Some(guess) => guess.to_vec(),
            None => vec![0.0; n],
        };
        let ax = spmv(a, &x);
        let mut r: Vec<f64> = b.iter().zip(ax.iter()).map(|(&bi, &ai)| bi - ai).collect();

        let mut z = precond.apply(&r);
        let mut p = z.clone();
        let mut rz = dot(&r, &z);

        let mut iteration = 0;
        let mut converged = false;
        let mut r_norm = norm(&r);

        while iteration < self.max_iterations {
            if r_norm < self.tolerance * b_norm || r_norm < self.abs_tolerance {
                converged = true;
                break;
            }

            let ap = spmv(a, &p);
            let p_ap = dot(&p, &ap);
            if p_ap.abs() < 1e-300 {
                break;
            }
            let alpha = rz / p_ap;

            for i in 0..n {
                x[i] += alpha * p[i];
                r[i] -= alpha * ap[i];
            }
            r_norm = norm(&r);

            z = precond.apply(&r);
            let rz_new = dot(&r, &z);
            let beta = rz_new / rz;
            rz = rz_new;

            for i in 0..n {
                p[i] = z[i] + beta * p[i];
            }

            iteration += 1;
        }

        if r_norm < self.tolerance * b_norm || r_norm < self.abs_tolerance {
            converged = true;
        }

        (
            x,
            SolverStats {
                iterations: iteration,
                residual_norm: r_norm,
                relative_residual: r_norm / b_norm,
                converged,
            },
        )
    }

    fn name(&self) -> &'static str {
        "cg"
    }
}

/// BiCGSTAB for general (non-symmetric) systems.
pub struct BiCgStab {
    max_iterations: usize,
    tolerance: f64,
    abs_tolerance: f64,
}

impl BiCgStab {
    pub fn new() -> Self {
        Self {
            max_iterations: 5000,
            tolerance: 1e-9,
            abs_tolerance: 1e-14,
        }
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }
}

impl Default for BiCgStab {
    fn default() -> Self {
        Self::new()
    }
}

impl Solver for BiCgStab {
    fn solve(&self, a: &CsMat<f64>, b: &[f64], x0: Option<&[f64]>) -> (Vec<f64>, SolverStats) {
        let n = b.len();
        let b_norm = norm(b);
        if b_norm < 1e-300 {
            return (
                vec![0.0; n],
                SolverStats {
                    converged: true,
                    ..Default::default()
                },
            );
        }

        let precond = JacobiPreconditioner::new(a);

        let mut x = match x0 {
            Some(guess) => guess.to_vec(),
            None => vec![0.0; n],
        };
        let ax = spmv(a, &x);
        let mut r: Vec<f64> = b.iter().zip(ax.iter()).map(|(&bi, &ai)| bi - ai).collect();
        let r_hat = r.clone();

        let mut rho = 1.0;
        let mut alpha = 1.0;
        let mut omega = 1.0;
        let mut v = vec![0.0; n];
        let mut p = vec![0.0; n];

        let mut iteration = 0;
        let mut converged = false;
        let mut r_norm = norm(&r);

        while iteration < self.max_iterations {
            if r_norm < self.tolerance * b_norm || r_norm < self.abs_tolerance {
                converged = true;
                break;
            }

            let rho_new = dot(&r_hat, &r);
            if rho_new.abs() < 1e-300 {
                break; // breakdown
            }
            let beta = (rho_new / rho) * (alpha / omega);
            for i in 0..n {
                p[i] = r[i] + beta * (p[i] - omega * v[i]);
            }

            let p_hat = precond.apply(&p);
            v = spmv(a, &p_hat);
            let rhat_v = dot(&r_hat, &v);
            if rhat_v.abs() < 1e-300 {
                break;
            }
            alpha = rho_new / rhat_v;

            let s: Vec<f64> = r.iter().zip(v.iter()).map(|(&ri, &vi)| ri - alpha * vi).collect();
            let s_norm = norm(&s);
            if s_norm < self.tolerance * b_norm {
                for i in 0..n {
                    x[i] += alpha * p_hat[i];
                }
                r_norm = s_norm;
                converged = true;
                iteration += 1;
                break;
            }

            let s_hat = precond.apply(&s);
            let t = spmv(a, &s_hat);
            let t_t = dot(&t, &t);
            if t_t.abs() < 1e-300 {
                break;
            }
            omega = dot(&t, &s) / t_t;

            for i in 0..n {
                x[i] += alpha * p_hat[i] + omega * s_hat[i];
                r[i] = s[i] - omega * t[i];
            }
            r_norm = norm(&r);
            rho = rho_new;
            iteration += 1;
        }

        if r_norm < self.tolerance * b_norm || r_norm < self.abs_tolerance {
            converged = true;
        }

        (
            x,
            SolverStats {
                iterations: iteration,
                residual_norm: r_norm,
                relative_residual: r_norm / b_norm,
                converged,
            },
        )
    }

    fn name(&self) -> &'static str {
        "bicgstab"
    }
}
