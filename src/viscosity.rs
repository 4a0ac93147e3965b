//! Effective viscosity and strain-rate engine.
//!
//! Builds the 3-D effective viscosity from the depth-averaged velocity and
//! the vertical shear profile via Glen's flow law, together with its depth
//! integral and the F-integrals that couple basal and depth-averaged
//! velocity under DIVA.
//!
//! The viscosity is evaluated on ab (corner) nodes, where all horizontal
//! derivatives are naturally collocated, and then averaged back to
//! aa-nodes. The four-corner averaging damps the checkerboard modes that
//! appear at low strain rates and stabilizes the outer fixed-point
//! iteration.
//!
//! # References
//! - Glen (1955), "The creep of polycrystalline ice"
//! - Lipscomb et al. (2019), "Description and evaluation of the CISM v2.1"

use rayon::prelude::*;

use crate::grid::{
    integrate::{cumulative_trapezoid, trapezoid},
    AaField, AaField3, AbField, AcxField, AcxField3, AcyField, AcyField3, Grid,
};

/// Compute the 3-D effective viscosity (Pa·a) on aa-nodes.
///
/// Per layer, the effective strain rate squared on each ab-node is
///
/// ```text
/// eps_sq = dudx² + dvdy² + dudx·dvdy + ¼(dudy + dvdx)²
///        + ¼·duxdz_ab² + ¼·duydz_ab² + eps_0²
/// ```
///
/// with the longitudinal derivatives taken as 4-point averaged centered
/// differences (step `4·dx`, `4·dy`) and the vertical shear averaged from
/// the neighboring ac-nodes. Glen's law then gives
///
/// ```text
/// visc_ab = ½ · eps_sq^((1−n)/(2n)) · ATT_ab^(−1/n)
/// ```
///
/// The `eps_0²` term keeps `eps_sq` strictly positive, and every aa-node
/// value is floored at `visc_min` after unstaggering.
#[allow(clippy::too_many_arguments)]
pub fn effective_viscosity_3d(
    grid: &Grid,
    ux_bar: &AcxField,
    uy_bar: &AcyField,
    duxdz: &AcxField3,
    duydz: &AcyField3,
    att: &AaField3,
    n_glen: f64,
    eps_0: f64,
    visc_min: f64,
    visc_eff: &mut AaField3,
) {
    let layers: Vec<AaField> = (0..grid.nz)
        .into_par_iter()
        .map(|k| {
            viscosity_layer(
                grid,
                ux_bar,
                uy_bar,
                &duxdz.layer_field(k),
                &duydz.layer_field(k),
                &att.layer_field(k),
                n_glen,
                eps_0,
                visc_min,
            )
        })
        .collect();

    for (k, layer) in layers.iter().enumerate() {
        visc_eff.set_layer(k, layer);
    }
}

/// One layer of the viscosity build: strain rate and Glen's law on
/// ab-nodes, then the 4-corner average back to aa-nodes.
#[allow(clippy::too_many_arguments)]
fn viscosity_layer(
    grid: &Grid,
    ux_bar: &AcxField,
    uy_bar: &AcyField,
    duxdz_k: &AcxField,
    duydz_k: &AcyField,
    att_k: &AaField,
    n_glen: f64,
    eps_0: f64,
    visc_min: f64,
) -> AaField {
    let (nx, ny) = (grid.nx, grid.ny);
    let eps_0_sq = eps_0 * eps_0;
    let glen_exp = (1.0 - n_glen) / (2.0 * n_glen);
    let att_inv_exp = -1.0 / n_glen;

    let visc_ab = AbField::from_fn(nx, ny, |i, j| {
        let im1 = i.saturating_sub(1);
        let jm1 = j.saturating_sub(1);
        let ip1 = (i + 1).min(nx - 1);
        let jp1 = (j + 1).min(ny - 1);

        // Longitudinal stretching: 4-point averaged centered differences
        let dudx = (ux_bar[(ip1, j)] - ux_bar[(im1, j)] + ux_bar[(ip1, jp1)]
            - ux_bar[(im1, jp1)])
            / (4.0 * grid.dx);
        let dvdy = (uy_bar[(i, jp1)] - uy_bar[(i, jm1)] + uy_bar[(ip1, jp1)]
            - uy_bar[(ip1, jm1)])
            / (4.0 * grid.dy);

        // Lateral shear: the ab-node sits exactly between these ac-nodes
        let dudy = (ux_bar[(i, jp1)] - ux_bar[(i, j)]) / grid.dy;
        let dvdx = (uy_bar[(ip1, j)] - uy_bar[(i, j)]) / grid.dx;

        // Vertical shear averaged from the neighboring ac-nodes
        let duxdz_ab = 0.5 * (duxdz_k[(i, j)] + duxdz_k[(i, jp1)]);
        let duydz_ab = 0.5 * (duydz_k[(i, j)] + duydz_k[(ip1, j)]);

        let eps_sq = dudx * dudx
            + dvdy * dvdy
            + dudx * dvdy
            + 0.25 * (dudy + dvdx) * (dudy + dvdx)
            + 0.25 * duxdz_ab * duxdz_ab
            + 0.25 * duydz_ab * duydz_ab
            + eps_0_sq;

        let att_ab = 0.25
            * (att_k[(i, j)] + att_k[(ip1, j)] + att_k[(i, jp1)] + att_k[(ip1, jp1)]);

        0.5 * eps_sq.powf(glen_exp) * att_ab.powf(att_inv_exp)
    });

    let mut visc = crate::grid::stagger::ab_to_aa(&visc_ab);

    // Domain corners take the average of their two edge neighbors to
    // suppress extremes from the one-sided stencils.
    visc[(0, 0)] = 0.5 * (visc[(1, 0)] + visc[(0, 1)]);
    visc[(nx - 1, 0)] = 0.5 * (visc[(nx - 2, 0)] + visc[(nx - 1, 1)]);
    visc[(0, ny - 1)] = 0.5 * (visc[(1, ny - 1)] + visc[(0, ny - 2)]);
    visc[(nx - 1, ny - 1)] = 0.5 * (visc[(nx - 2, ny - 1)] + visc[(nx - 1, ny - 2)]);

    for v in visc.as_mut_slice() {
        *v = v.max(visc_min);
    }

    visc
}

/// Depth-integrated viscosity `∫₀¹ visc dzeta · H_ice` (Pa·a·m).
///
/// Ice-free columns keep the raw depth integral so the momentum operator
/// never sees a zero coefficient.
pub fn depth_integrated_viscosity(
    grid: &Grid,
    visc_eff: &AaField3,
    h_ice: &AaField,
) -> AaField {
    let mut column = vec![0.0; grid.nz];
    AaField::from_fn(grid.nx, grid.ny, |i, j| {
        visc_eff.column(i, j, &mut column);
        let integral = trapezoid(&grid.zeta_aa, &column);
        let h = h_ice[(i, j)];
        if h > 0.0 {
            integral * h
        } else {
            integral
        }
    })
}

/// F-integral of order `n`:
///
/// ```text
/// F_n(i,j) = ∫₀¹ (H_ice / visc_eff) · (1 − zeta)^n dzeta
/// ```
///
/// Ice-free columns are assigned the floor value obtained with unit
/// thickness and `visc_min`, which keeps `beta_eff = 1/F2` finite there.
pub fn f_integral(
    grid: &Grid,
    visc_eff: &AaField3,
    h_ice: &AaField,
    n: i32,
    visc_min: f64,
) -> AaField {
    let weights: Vec<f64> = grid
        .zeta_aa
        .iter()
        .map(|&z| (1.0 - z).powi(n))
        .collect();
    let floor = trapezoid(&grid.zeta_aa, &weights) / visc_min;

    let mut column = vec![0.0; grid.nz];
    let mut integrand = vec![0.0; grid.nz];
    AaField::from_fn(grid.nx, grid.ny, |i, j| {
        let h = h_ice[(i, j)];
        if h <= 0.0 {
            return floor;
        }
        visc_eff.column(i, j, &mut column);
        for k in 0..grid.nz {
            integrand[k] = h / column[k] * weights[k];
        }
        trapezoid(&grid.zeta_aa, &integrand)
    })
}

/// Cumulative first-order F-integral per layer:
///
/// ```text
/// F1(i,j,k) = ∫₀^{zeta_aa[k]} (H_ice / visc_eff) · (1 − zeta') dzeta'
/// ```
///
/// Used to reconstruct the 3-D horizontal velocity from the basal stress.
/// The bottom layer is identically zero.
pub fn f1_cumulative(
    grid: &Grid,
    visc_eff: &AaField3,
    h_ice: &AaField,
    visc_min: f64,
) -> AaField3 {
    let mut out = AaField3::zeros(grid.nx, grid.ny, grid.nz);
    let mut column = vec![0.0; grid.nz];
    let mut integrand = vec![0.0; grid.nz];
    let mut cum = vec![0.0; grid.nz];

    for j in 0..grid.ny {
        for i in 0..grid.nx {
            let h = h_ice[(i, j)];
            visc_eff.column(i, j, &mut column);
            for k in 0..grid.nz {
                let visc = if h > 0.0 { column[k] } else { visc_min };
                let h_eff = if h > 0.0 { h } else { 1.0 };
                integrand[k] = h_eff / visc * (1.0 - grid.zeta_aa[k]);
            }
            cumulative_trapezoid(&grid.zeta_aa, &integrand, &mut cum);
            for k in 0..grid.nz {
                out[(i, j, k)] = cum[k];
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn quiescent_setup(
        nx: usize,
        ny: usize,
        nz: usize,
        att_val: f64,
    ) -> (Grid, AcxField, AcyField, AcxField3, AcyField3, AaField3) {
        let grid = Grid::with_uniform_zeta(nx, ny, 10e3, 10e3, nz).unwrap();
        let ux = AcxField::zeros(nx, ny);
        let uy = AcyField::zeros(nx, ny);
        let duxdz = AcxField3::zeros(nx, ny, nz);
        let duydz = AcyField3::zeros(nx, ny, nz);
        let mut att = AaField3::zeros(nx, ny, nz);
        att.fill(att_val);
        (grid, ux, uy, duxdz, duydz, att)
    }

    #[test]
    fn test_quiescent_viscosity_hits_strain_floor() {
        let n_glen = 3.0;
        let eps_0 = 1e-8;
        let att_val = 1e-16;
        let (grid, ux, uy, duxdz, duydz, att) = quiescent_setup(6, 6, 5, att_val);
        let mut visc = AaField3::zeros(6, 6, 5);

        effective_viscosity_3d(
            &grid, &ux, &uy, &duxdz, &duydz, &att, n_glen, eps_0, 1e3, &mut visc,
        );

        // With zero velocity, eps_sq = eps_0² everywhere and the viscosity
        // is uniform: ½ (eps_0²)^((1-n)/2n) ATT^(-1/n)
        let expected = 0.5
            * (eps_0 * eps_0).powf((1.0 - n_glen) / (2.0 * n_glen))
            * att_val.powf(-1.0 / n_glen);
        for k in 0..5 {
            for j in 0..6 {
                for i in 0..6 {
                    assert_relative_eq!(visc[(i, j, k)], expected, max_relative = 1e-12);
                }
            }
        }
    }

    #[test]
    fn test_viscosity_floor_applied() {
        // A very soft rate factor pushes Glen viscosity below the floor
        let (grid, ux, uy, duxdz, duydz, att) = quiescent_setup(5, 5, 4, 1e6);
        let mut visc = AaField3::zeros(5, 5, 4);
        let visc_min = 1e3;
        effective_viscosity_3d(
            &grid, &ux, &uy, &duxdz, &duydz, &att, 3.0, 1e-2, visc_min, &mut visc,
        );
        for v in visc.as_slice() {
            assert!(*v >= visc_min);
        }
    }

    #[test]
    fn test_shear_raises_strain_rate() {
        let nx = 8;
        let (grid, _, uy, duxdz, duydz, att) = quiescent_setup(nx, 8, 4, 1e-16);
        // Uniform stretching: ux grows linearly in x
        let ux = AcxField::from_fn(nx, 8, |i, _| 10.0 * i as f64);
        let mut visc_stretch = AaField3::zeros(nx, 8, 4);
        let mut visc_rest = AaField3::zeros(nx, 8, 4);
        let ux0 = AcxField::zeros(nx, 8);

        effective_viscosity_3d(
            &grid, &ux, &uy, &duxdz, &duydz, &att, 3.0, 1e-8, 1e3, &mut visc_stretch,
        );
        effective_viscosity_3d(
            &grid, &ux0, &uy, &duxdz, &duydz, &att, 3.0, 1e-8, 1e3, &mut visc_rest,
        );

        // Shear thinning: straining ice is softer than quiescent ice
        assert!(visc_stretch[(4, 4, 2)] < visc_rest[(4, 4, 2)]);
    }

    #[test]
    fn test_depth_integral_uniform_column() {
        let grid = Grid::with_uniform_zeta(4, 4, 5e3, 5e3, 6).unwrap();
        let mut visc = AaField3::zeros(4, 4, 6);
        visc.fill(2e5);
        let mut h = AaField::filled(4, 4, 1000.0);
        h[(2, 2)] = 0.0;

        let vint = depth_integrated_viscosity(&grid, &visc, &h);
        // Icy column: visc * H
        assert_relative_eq!(vint[(1, 1)], 2e5 * 1000.0, max_relative = 1e-12);
        // Ice-free column keeps the raw integral
        assert_relative_eq!(vint[(2, 2)], 2e5, max_relative = 1e-12);
    }

    #[test]
    fn test_f2_uniform_column_matches_quadrature() {
        let grid = Grid::with_uniform_zeta(4, 4, 5e3, 5e3, 11).unwrap();
        let mut visc = AaField3::zeros(4, 4, 11);
        let visc_val = 1e6;
        visc.fill(visc_val);
        let h = AaField::filled(4, 4, 800.0);

        let f2 = f_integral(&grid, &visc, &h, 2, 1e3);
        // Uniform column: F2 = (H/visc) ∫ (1-z)² dz ≈ H/(3 visc), up to the
        // trapezoid error of the quadratic integrand
        let expected = 800.0 / visc_val / 3.0;
        assert_relative_eq!(f2[(2, 2)], expected, max_relative = 1e-2);
    }

    #[test]
    fn test_f1_cumulative_is_zero_at_base_and_monotone() {
        let grid = Grid::with_uniform_zeta(4, 4, 5e3, 5e3, 8).unwrap();
        let mut visc = AaField3::zeros(4, 4, 8);
        visc.fill(5e5);
        let h = AaField::filled(4, 4, 500.0);

        let f1 = f1_cumulative(&grid, &visc, &h, 1e3);
        for j in 0..4 {
            for i in 0..4 {
                assert_relative_eq!(f1[(i, j, 0)], 0.0);
                for k in 1..8 {
                    assert!(f1[(i, j, k)] >= f1[(i, j, k - 1)]);
                }
            }
        }
    }
}
