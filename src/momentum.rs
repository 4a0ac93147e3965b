//! Depth-integrated momentum solver.
//!
//! Assembles the coupled SSA / shelfy-stream operator on the staggered
//! C-grid and hands the sparse system to the configured linear solver. The
//! x- and y-momentum equations are solved together: unknowns are `ux_bar`
//! on acx-nodes followed by `uy_bar` on acy-nodes.
//!
//! The continuous operator is
//!
//! ```text
//! ∂/∂x[2N(2∂u/∂x + ∂v/∂y)] + ∂/∂y[N(∂u/∂y + ∂v/∂x)] − beta_eff·u = −taud_x
//! ∂/∂y[2N(2∂v/∂y + ∂u/∂x)] + ∂/∂x[N(∂v/∂x + ∂u/∂y)] − beta_eff·v = −taud_y
//! ```
//!
//! with `N = visc_eff_int` on aa-nodes (averaged to ab-corners for the
//! mixed terms). Rows are assembled in negated form so the friction sits
//! positively on the diagonal.
//!
//! Mask semantics: a positive `ssa_mask` entry marks an unknown; zero or
//! negative entries are held fixed at their current value via a Dirichlet
//! row. The coordinator prunes converged cells from the mask between
//! iterations, which only stops them from updating.

use log::warn;
use rayon::prelude::*;
use sprs::{CsMat, TriMat};

use crate::config::{Boundaries, DivaParams};
use crate::error::DivaError;
use crate::grid::boundary::{fill_periodic_acx, fill_periodic_acy};
use crate::grid::{AaField, AcxField, AcxMask, AcyField, AcyMask, Grid};
use crate::linalg::Solver;

/// Diagnostics of one momentum solve.
#[derive(Debug, Clone)]
pub struct MomentumStats {
    /// L2 residual norm of the linear system at the returned solution
    pub residual_norm: f64,
    /// Linear solver iterations
    pub lin_iterations: usize,
    /// Number of velocity components clamped at `ssa_vel_max`
    pub n_capped: usize,
}

#[inline]
fn wrap(idx: isize, n: usize, periodic: bool) -> usize {
    if periodic {
        idx.rem_euclid(n as isize) as usize
    } else {
        idx.clamp(0, n as isize - 1) as usize
    }
}

/// Solve the depth-integrated momentum balance for `(ux_bar, uy_bar)`.
///
/// Velocities are updated in place; cells outside the mask keep their
/// values. Returns solve diagnostics, or an error if the linear solver does
/// not converge.
#[allow(clippy::too_many_arguments)]
pub fn solve_momentum(
    grid: &Grid,
    params: &DivaParams,
    visc_int: &AaField,
    beta_eff_acx: &AcxField,
    beta_eff_acy: &AcyField,
    taud_acx: &AcxField,
    taud_acy: &AcyField,
    mask_acx: &AcxMask,
    mask_acy: &AcyMask,
    solver: &dyn Solver,
    ux_bar: &mut AcxField,
    uy_bar: &mut AcyField,
) -> Result<MomentumStats, DivaError> {
    let (nx, ny) = (grid.nx, grid.ny);
    let n_nodes = nx * ny;
    let n_dofs = 2 * n_nodes;
    let periodic = params.boundaries == Boundaries::Periodic;

    let idx_u = |i: usize, j: usize| j * nx + i;
    let idx_v = |i: usize, j: usize| n_nodes + j * nx + i;

    // ab-corner viscosity for the mixed-derivative terms
    let visc_ab = |i: isize, j: isize| -> f64 {
        let i0 = wrap(i, nx, periodic);
        let j0 = wrap(j, ny, periodic);
        let i1 = wrap(i + 1, nx, periodic);
        let j1 = wrap(j + 1, ny, periodic);
        0.25
            * (visc_int[(i0, j0)]
                + visc_int[(i1, j0)]
                + visc_int[(i0, j1)]
                + visc_int[(i1, j1)])
    };

    let inv_dx2 = 1.0 / (grid.dx * grid.dx);
    let inv_dy2 = 1.0 / (grid.dy * grid.dy);
    let inv_dxdy = 1.0 / (grid.dx * grid.dy);

    // Row-parallel assembly: each row of cells collects its own triplets,
    // merged in row order afterwards.
    let row_triplets: Vec<Vec<(usize, usize, f64)>> = (0..ny)
        .into_par_iter()
        .map(|j| {
            let mut local: Vec<(usize, usize, f64)> = Vec::with_capacity(2 * nx * 9);
            let js = j as isize;

            for i in 0..nx {
                let is = i as isize;

                // ---- x-momentum row at acx(i,j) ----
                let row = idx_u(i, j);
                if mask_acx[(i, j)] <= 0 {
                    local.push((row, row, 1.0));
                } else {
                    let im1 = wrap(is - 1, nx, periodic);
                    let ip1 = wrap(is + 1, nx, periodic);
                    let jm1 = wrap(js - 1, ny, periodic);
                    let jp1 = wrap(js + 1, ny, periodic);

                    let n_w = visc_int[(i, j)];
                    let n_e = visc_int[(ip1, j)];
                    let n_n = visc_ab(is, js);
                    let n_s = visc_ab(is, js - 1);

                    let mut add = |col: usize, val: f64| local.push((row, col, -val));

                    // ∂/∂x[2N(2∂u/∂x + ∂v/∂y)]
                    add(idx_u(ip1, j), 4.0 * n_e * inv_dx2);
                    add(idx_u(i, j), -4.0 * (n_e + n_w) * inv_dx2);
                    add(idx_u(im1, j), 4.0 * n_w * inv_dx2);
                    add(idx_v(ip1, j), 2.0 * n_e * inv_dxdy);
                    add(idx_v(ip1, jm1), -2.0 * n_e * inv_dxdy);
                    add(idx_v(i, j), -2.0 * n_w * inv_dxdy);
                    add(idx_v(i, jm1), 2.0 * n_w * inv_dxdy);

                    // ∂/∂y[N(∂u/∂y + ∂v/∂x)]
                    add(idx_u(i, jp1), n_n * inv_dy2);
                    add(idx_u(i, j), -(n_n + n_s) * inv_dy2);
                    add(idx_u(i, jm1), n_s * inv_dy2);
                    add(idx_v(ip1, j), n_n * inv_dxdy);
                    add(idx_v(i, j), -n_n * inv_dxdy);
                    add(idx_v(ip1, jm1), -n_s * inv_dxdy);
                    add(idx_v(i, jm1), n_s * inv_dxdy);

                    // Friction on the diagonal (not negated)
                    local.push((row, row, beta_eff_acx[(i, j)]));
                }

                // ---- y-momentum row at acy(i,j) ----
                let row = idx_v(i, j);
                if mask_acy[(i, j)] <= 0 {
                    local.push((row, row, 1.0));
                } else {
                    let im1 = wrap(is - 1, nx, periodic);
                    let jm1 = wrap(js - 1, ny, periodic);
                    let ip1 = wrap(is + 1, nx, periodic);
                    let jp1 = wrap(js + 1, ny, periodic);

                    let n_s = visc_int[(i, j)];
                    let n_n = visc_int[(i, jp1)];
                    let n_e = visc_ab(is, js);
                    let n_w = visc_ab(is - 1, js);

                    let mut add = |col: usize, val: f64| local.push((row, col, -val));

                    // ∂/∂y[2N(2∂v/∂y + ∂u/∂x)]
                    add(idx_v(i, jp1), 4.0 * n_n * inv_dy2);
                    add(idx_v(i, j), -4.0 * (n_n + n_s) * inv_dy2);
                    add(idx_v(i, jm1), 4.0 * n_s * inv_dy2);
                    add(idx_u(i, jp1), 2.0 * n_n * inv_dxdy);
                    add(idx_u(im1, jp1), -2.0 * n_n * inv_dxdy);
                    add(idx_u(i, j), -2.0 * n_s * inv_dxdy);
                    add(idx_u(im1, j), 2.0 * n_s * inv_dxdy);

                    // ∂/∂x[N(∂v/∂x + ∂u/∂y)]
                    add(idx_v(ip1, j), n_e * inv_dx2);
                    add(idx_v(i, j), -(n_e + n_w) * inv_dx2);
                    add(idx_v(im1, j), n_w * inv_dx2);
                    add(idx_u(i, jp1), n_e * inv_dxdy);
                    add(idx_u(i, j), -n_e * inv_dxdy);
                    add(idx_u(im1, jp1), -n_w * inv_dxdy);
                    add(idx_u(im1, j), n_w * inv_dxdy);

                    local.push((row, row, beta_eff_acy[(i, j)]));
                }
            }

            local
        })
        .collect();

    let mut triplets = TriMat::new((n_dofs, n_dofs));
    for row in row_triplets {
        for (r, c, v) in row {
            triplets.add_triplet(r, c, v);
        }
    }
    let matrix: CsMat<f64> = triplets.to_csr();

    // Right-hand side: driving stress on active rows, held values elsewhere
    let mut rhs = vec![0.0; n_dofs];
    let mut x0 = vec![0.0; n_dofs];
    for j in 0..ny {
        for i in 0..nx {
            let (ru, rv) = (idx_u(i, j), idx_v(i, j));
            rhs[ru] = if mask_acx[(i, j)] > 0 {
                taud_acx[(i, j)]
            } else {
                ux_bar[(i, j)]
            };
            rhs[rv] = if mask_acy[(i, j)] > 0 {
                taud_acy[(i, j)]
            } else {
                uy_bar[(i, j)]
            };
            x0[ru] = ux_bar[(i, j)];
            x0[rv] = uy_bar[(i, j)];
        }
    }

    let (solution, stats) = solver.solve(&matrix, &rhs, Some(&x0));
    if !stats.converged {
        return Err(DivaError::LinearSolverFailure {
            iterations: stats.iterations,
            residual: stats.relative_residual,
        });
    }

    // Write back with the velocity cap
    let cap = params.ssa_vel_max;
    let mut n_capped = 0usize;
    for j in 0..ny {
        for i in 0..nx {
            if mask_acx[(i, j)] > 0 {
                let v = solution[idx_u(i, j)];
                if v.abs() > cap {
                    n_capped += 1;
                }
                ux_bar[(i, j)] = v.clamp(-cap, cap);
            }
            if mask_acy[(i, j)] > 0 {
                let v = solution[idx_v(i, j)];
                if v.abs() > cap {
                    n_capped += 1;
                }
                uy_bar[(i, j)] = v.clamp(-cap, cap);
            }
        }
    }

    if n_capped > 0 && params.ssa_write_log {
        warn!(
            "momentum solve clamped {} velocity components at {} m/a",
            n_capped, cap
        );
    }

    if periodic {
        fill_periodic_acx(ux_bar);
        fill_periodic_acy(uy_bar);
    }

    Ok(MomentumStats {
        residual_norm: stats.residual_norm,
        lin_iterations: stats.iterations,
        n_capped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linalg::BiCgStab;
    use approx::assert_relative_eq;

    fn full_mask(nx: usize, ny: usize) -> (AcxMask, AcyMask) {
        (AcxMask::filled(nx, ny, 1), AcyMask::filled(nx, ny, 1))
    }

    /// Uniform friction balance: with constant `beta_eff` and `taud` and no
    /// lateral variation, the operator reduces to `beta·u = taud` and the
    /// exact solution is uniform.
    #[test]
    fn test_uniform_drag_balance() {
        let grid = Grid::with_uniform_zeta(8, 8, 10e3, 10e3, 3).unwrap();
        let params = DivaParams::default();
        let visc_int = AaField::filled(8, 8, 1e8);
        let beta = 100.0;
        let taud = 5000.0;
        let beta_acx = AcxField::filled(8, 8, beta);
        let beta_acy = AcyField::filled(8, 8, beta);
        let taud_acx = AcxField::filled(8, 8, taud);
        let taud_acy = AcyField::zeros(8, 8);
        let (mask_x, mask_y) = full_mask(8, 8);
        let mut ux = AcxField::zeros(8, 8);
        let mut uy = AcyField::zeros(8, 8);

        let solver = BiCgStab::new().with_tolerance(1e-12);
        let stats = solve_momentum(
            &grid, &params, &visc_int, &beta_acx, &beta_acy, &taud_acx, &taud_acy,
            &mask_x, &mask_y, &solver, &mut ux, &mut uy,
        )
        .unwrap();

        assert_eq!(stats.n_capped, 0);
        for j in 0..8 {
            for i in 0..8 {
                assert_relative_eq!(ux[(i, j)], taud / beta, max_relative = 1e-8);
                assert_relative_eq!(uy[(i, j)], 0.0, epsilon = 1e-6);
            }
        }
    }

    #[test]
    fn test_masked_cells_hold_their_value() {
        let grid = Grid::with_uniform_zeta(6, 6, 10e3, 10e3, 3).unwrap();
        let params = DivaParams::default();
        let visc_int = AaField::filled(6, 6, 1e8);
        let beta_acx = AcxField::filled(6, 6, 50.0);
        let beta_acy = AcyField::filled(6, 6, 50.0);
        let taud_acx = AcxField::filled(6, 6, 1000.0);
        let taud_acy = AcyField::zeros(6, 6);
        let (mut mask_x, mask_y) = full_mask(6, 6);
        mask_x[(3, 3)] = 0;

        let mut ux = AcxField::zeros(6, 6);
        let mut uy = AcyField::zeros(6, 6);
        ux[(3, 3)] = 42.0;

        let solver = BiCgStab::new().with_tolerance(1e-12);
        solve_momentum(
            &grid, &params, &visc_int, &beta_acx, &beta_acy, &taud_acx, &taud_acy,
            &mask_x, &mask_y, &solver, &mut ux, &mut uy,
        )
        .unwrap();

        assert_relative_eq!(ux[(3, 3)], 42.0, epsilon = 1e-9);
        // Neighbors still solved
        assert!(ux[(1, 1)] > 0.0);
    }

    #[test]
    fn test_velocity_cap_applies() {
        let grid = Grid::with_uniform_zeta(6, 6, 10e3, 10e3, 3).unwrap();
        let mut params = DivaParams::default();
        params.ssa_vel_max = 10.0;
        let visc_int = AaField::filled(6, 6, 1e8);
        // Tiny drag and a large driving stress push u far beyond the cap
        let beta_acx = AcxField::filled(6, 6, 1.0);
        let beta_acy = AcyField::filled(6, 6, 1.0);
        let taud_acx = AcxField::filled(6, 6, 1e5);
        let taud_acy = AcyField::zeros(6, 6);
        let (mask_x, mask_y) = full_mask(6, 6);
        let mut ux = AcxField::zeros(6, 6);
        let mut uy = AcyField::zeros(6, 6);

        let solver = BiCgStab::new().with_tolerance(1e-12);
        let stats = solve_momentum(
            &grid, &params, &visc_int, &beta_acx, &beta_acy, &taud_acx, &taud_acy,
            &mask_x, &mask_y, &solver, &mut ux, &mut uy,
        )
        .unwrap();

        assert!(stats.n_capped > 0);
        for j in 0..6 {
            for i in 0..6 {
                assert!(ux[(i, j)].abs() <= 10.0 + 1e-12);
            }
        }
    }

    /// A translation-invariant periodic problem must return a
    /// translation-invariant solution.
    #[test]
    fn test_periodic_translation_invariance() {
        let grid = Grid::with_uniform_zeta(8, 8, 10e3, 10e3, 3).unwrap();
        let mut params = DivaParams::default();
        params.boundaries = Boundaries::Periodic;
        let visc_int = AaField::filled(8, 8, 5e7);
        let beta_acx = AcxField::filled(8, 8, 20.0);
        let beta_acy = AcyField::filled(8, 8, 20.0);
        let taud_acx = AcxField::filled(8, 8, 800.0);
        let taud_acy = AcyField::filled(8, 8, 400.0);
        let (mask_x, mask_y) = full_mask(8, 8);
        let mut ux = AcxField::zeros(8, 8);
        let mut uy = AcyField::zeros(8, 8);

        let solver = BiCgStab::new().with_tolerance(1e-12);
        solve_momentum(
            &grid, &params, &visc_int, &beta_acx, &beta_acy, &taud_acx, &taud_acy,
            &mask_x, &mask_y, &solver, &mut ux, &mut uy,
        )
        .unwrap();

        let u00 = ux[(3, 3)];
        for j in 0..8 {
            for i in 0..8 {
                assert_relative_eq!(ux[(i, j)], u00, max_relative = 1e-8);
            }
        }
    }
}
