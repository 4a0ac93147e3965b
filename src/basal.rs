//! Basal-drag engine.
//!
//! Produces the scalar friction coefficient `beta` on aa-nodes from the bed
//! roughness and basal velocity, applies effective-pressure and
//! grounding-line scalings, smooths over the grounded interior, staggers to
//! the velocity nodes and forms the DIVA effective friction `beta_eff`.
//!
//! The staggering across the grounding line is the numerically delicate
//! part: the chosen policy controls how abruptly the drag shuts off between
//! the last grounded and the first floating cell.
//!
//! # References
//! - Leguy et al. (2014), "Parameterization of basal friction near grounding
//!   lines in a one-dimensional ice sheet model"
//! - Goldberg (2011), "A variationally derived, depth-integrated
//!   approximation to a higher-order glaciological flow model"
//! - Lipscomb et al. (2019), "Description and evaluation of the CISM v2.1"

use crate::config::{DivaParams, GlScaling, GlStaggering, SlidingLaw};
use crate::constants::PhysicalConstants;
use crate::grid::smooth::gaussian_smooth_masked;
use crate::grid::{Aa, AaField, AcxField, AcyField, Field2, Grid};

/// Basal velocity magnitude on aa-nodes, assembled from the neighboring
/// ac-components and floored at `u_b_min` so the sliding laws never divide
/// by zero.
pub fn basal_speed(ux_b: &AcxField, uy_b: &AcyField, u_b_min: f64) -> AaField {
    let (nx, ny) = (ux_b.nx(), ux_b.ny());
    AaField::from_fn(nx, ny, |i, j| {
        let im1 = i.saturating_sub(1);
        let jm1 = j.saturating_sub(1);
        let ux = 0.5 * (ux_b[(im1, j)] + ux_b[(i, j)]);
        let uy = 0.5 * (uy_b[(i, jm1)] + uy_b[(i, j)]);
        (ux * ux + uy * uy).sqrt().max(u_b_min)
    })
}

/// Effective pressure at the bed (bar), after Leguy et al. (2014).
///
/// The water pressure interpolates between a sealed bed (`p = 0`) and full
/// ocean connectivity (`p = 1`) through the connectivity exponent:
///
/// ```text
/// H_float = max(0, (rho_sw/rho_ice)·(z_sl − z_bed))
/// p_w     = rho_ice·g·H_ice · (1 − (1 − min(1, H_float/H_ice))^p)
/// N_eff   = 1e-5 · (rho_ice·g·H_ice − p_w)
/// ```
///
/// Where the column is thinner than the floatation thickness the water
/// pressure equals the ice pressure and `N_eff` vanishes.
pub fn effective_pressure(
    consts: &PhysicalConstants,
    h_ice: &AaField,
    z_bed: &AaField,
    z_sl: &AaField,
    p: f64,
) -> AaField {
    let (nx, ny) = (h_ice.nx(), h_ice.ny());
    AaField::from_fn(nx, ny, |i, j| {
        let h = h_ice[(i, j)];
        if h <= 0.0 {
            return 0.0;
        }
        let h_float = (consts.floatation_ratio() * (z_sl[(i, j)] - z_bed[(i, j)])).max(0.0);
        let p_ice = consts.overburden(h);
        let p_w = if h < h_float {
            p_ice
        } else {
            p_ice * (1.0 - (1.0 - (h_float / h).min(1.0)).powf(p))
        };
        (crate::constants::PA_TO_BAR * (p_ice - p_w)).max(0.0)
    })
}

/// Raw friction coefficient from the configured sliding law, before any
/// scaling or masking.
fn sliding_law_beta(law: SlidingLaw, c_bed: f64, u_b: f64) -> f64 {
    match law {
        SlidingLaw::Linear => c_bed,
        SlidingLaw::Power { q } => c_bed.powf(q) * u_b.powf(q - 1.0),
        SlidingLaw::RegularizedCoulomb { q, u_0 } => {
            c_bed * (u_b / (u_b + u_0)).powf(q) / u_b
        }
    }
}

/// Compute the aa-node friction coefficient `beta` (Pa·a/m).
///
/// Order of operations: sliding law, effective-pressure scaling,
/// grounding-line scaling, floating/ice-free masking with the grounded
/// `beta_min` floor, then grounded-only Gaussian smoothing.
#[allow(clippy::too_many_arguments)]
pub fn friction_coefficient(
    grid: &Grid,
    params: &DivaParams,
    consts: &PhysicalConstants,
    c_bed: &AaField,
    h_ice: &AaField,
    h_grnd: &AaField,
    f_grnd: &AaField,
    z_bed: &AaField,
    z_sl: &AaField,
    ux_b: &AcxField,
    uy_b: &AcyField,
    n_eff: &mut AaField,
) -> AaField {
    let (nx, ny) = (grid.nx, grid.ny);
    let u_b = basal_speed(ux_b, uy_b, params.u_b_min);
    *n_eff = effective_pressure(consts, h_ice, z_bed, z_sl, params.neff_p);

    let mut beta = AaField::from_fn(nx, ny, |i, j| {
        sliding_law_beta(params.sliding_law, c_bed[(i, j)], u_b[(i, j)])
    });

    if params.neff_scale {
        for j in 0..ny {
            for i in 0..nx {
                beta[(i, j)] *= n_eff[(i, j)];
            }
        }
    }

    apply_gl_scaling(params.gl_scaling, consts, &mut beta, h_ice, h_grnd, f_grnd, z_bed, z_sl);

    // Floating and ice-free cells carry no drag; grounded cells are floored.
    for j in 0..ny {
        for i in 0..nx {
            if f_grnd[(i, j)] <= 0.0 || h_ice[(i, j)] <= 0.0 {
                beta[(i, j)] = 0.0;
            } else {
                beta[(i, j)] = beta[(i, j)].max(params.beta_min);
            }
        }
    }

    if params.n_smooth > 0.0 {
        let include = Field2::<Aa, bool>::from_fn(nx, ny, |i, j| {
            f_grnd[(i, j)] > 0.0 && h_ice[(i, j)] > 0.0
        });
        gaussian_smooth_masked(&mut beta, &include, params.n_smooth * grid.dx, grid.dx);
    }

    beta
}

#[allow(clippy::too_many_arguments)]
fn apply_gl_scaling(
    scaling: GlScaling,
    consts: &PhysicalConstants,
    beta: &mut AaField,
    h_ice: &AaField,
    h_grnd: &AaField,
    f_grnd: &AaField,
    z_bed: &AaField,
    z_sl: &AaField,
) {
    let (nx, ny) = (beta.nx(), beta.ny());
    match scaling {
        GlScaling::None => {}
        GlScaling::Fraction { f_gl } => {
            // Damp beta on grounded cells adjacent to fully floating ice
            let scale = AaField::from_fn(nx, ny, |i, j| {
                if f_grnd[(i, j)] <= 0.0 {
                    return 1.0;
                }
                let im1 = i.saturating_sub(1);
                let jm1 = j.saturating_sub(1);
                let ip1 = (i + 1).min(nx - 1);
                let jp1 = (j + 1).min(ny - 1);
                let near_float = f_grnd[(im1, j)] <= 0.0
                    || f_grnd[(ip1, j)] <= 0.0
                    || f_grnd[(i, jm1)] <= 0.0
                    || f_grnd[(i, jp1)] <= 0.0;
                if near_float {
                    f_gl
                } else {
                    1.0
                }
            });
            for j in 0..ny {
                for i in 0..nx {
                    beta[(i, j)] *= scale[(i, j)];
                }
            }
        }
        GlScaling::OverburdenRamp { h_grnd_lim } => {
            for j in 0..ny {
                for i in 0..nx {
                    let ramp = (h_grnd[(i, j)].max(0.0)).min(h_grnd_lim) / h_grnd_lim;
                    beta[(i, j)] *= ramp;
                }
            }
        }
        GlScaling::ZStar { norm } => {
            for j in 0..ny {
                for i in 0..nx {
                    let h = h_ice[(i, j)];
                    let f_scale = if z_bed[(i, j)] >= z_sl[(i, j)] {
                        h
                    } else {
                        (h - (z_sl[(i, j)] - z_bed[(i, j)]) * consts.floatation_ratio())
                            .max(0.0)
                    };
                    beta[(i, j)] *= if norm && h > 0.0 { f_scale / h } else { f_scale };
                }
            }
        }
    }
}

/// Stagger an aa-node friction field to acx-nodes under the configured
/// grounding-line policy.
pub fn stagger_beta_acx(
    beta: &AaField,
    f_grnd: &AaField,
    f_grnd_acx: &AcxField,
    policy: GlStaggering,
) -> AcxField {
    let (nx, ny) = (beta.nx(), beta.ny());
    AcxField::from_fn(nx, ny, |i, j| {
        let ip1 = (i + 1).min(nx - 1);
        stagger_edge(
            beta[(i, j)],
            beta[(ip1, j)],
            f_grnd[(i, j)] > 0.0,
            f_grnd[(ip1, j)] > 0.0,
            f_grnd_acx[(i, j)],
            policy,
        )
    })
}

/// Stagger an aa-node friction field to acy-nodes under the configured
/// grounding-line policy.
pub fn stagger_beta_acy(
    beta: &AaField,
    f_grnd: &AaField,
    f_grnd_acy: &AcyField,
    policy: GlStaggering,
) -> AcyField {
    let (nx, ny) = (beta.nx(), beta.ny());
    AcyField::from_fn(nx, ny, |i, j| {
        let jp1 = (j + 1).min(ny - 1);
        stagger_edge(
            beta[(i, j)],
            beta[(i, jp1)],
            f_grnd[(i, j)] > 0.0,
            f_grnd[(i, jp1)] > 0.0,
            f_grnd_acy[(i, j)],
            policy,
        )
    })
}

/// One staggered edge value from its two aa-neighbors.
fn stagger_edge(
    beta_0: f64,
    beta_1: f64,
    grounded_0: bool,
    grounded_1: bool,
    f_grnd_ac: f64,
    policy: GlStaggering,
) -> f64 {
    match policy {
        GlStaggering::Simple => 0.5 * (beta_0 + beta_1),
        GlStaggering::Upstream => match (grounded_0, grounded_1) {
            (false, false) => 0.0,
            (true, false) => beta_0,
            (false, true) => beta_1,
            (true, true) => 0.5 * (beta_0 + beta_1),
        },
        GlStaggering::Subgrid => match (grounded_0, grounded_1) {
            (false, false) => 0.0,
            (true, true) => 0.5 * (beta_0 + beta_1),
            (true, false) => f_grnd_ac * beta_0 + (1.0 - f_grnd_ac) * beta_1,
            (false, true) => f_grnd_ac * beta_1 + (1.0 - f_grnd_ac) * beta_0,
        },
    }
}

/// DIVA effective friction on aa-nodes.
///
/// With sliding: `beta_eff = beta / (1 + beta·F2)` (Goldberg 2011); under
/// no-slip the basal velocity is eliminated instead and `beta_eff = 1/F2`.
pub fn effective_friction(beta: &AaField, f2: &AaField, no_slip: bool) -> AaField {
    let (nx, ny) = (beta.nx(), beta.ny());
    AaField::from_fn(nx, ny, |i, j| {
        if no_slip {
            1.0 / f2[(i, j)]
        } else {
            let b = beta[(i, j)];
            b / (1.0 + b * f2[(i, j)])
        }
    })
}

/// Diagnostic inversion of the effective friction back to a basal friction
/// coefficient. The Newton root-finder for the inverse relation is not
/// implemented; the field is returned unchanged.
pub fn diagnose_beta_diva(beta: &AaField) -> AaField {
    beta.clone()
}
