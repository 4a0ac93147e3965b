//! Marine ice-sheet tests: grounded interior feeding a floating shelf.
//!
//! The domain is split at a grounding line; everything seaward floats
//! (`f_grnd = 0`) over a deep bed. The drag model must shut off exactly on
//! the shelf, and the staggered friction on the grounding-line edge must
//! follow the configured policy.

use approx::assert_relative_eq;
use ice_dynamics::{
    DivaParams, DivaSolver, DivaState, GlStaggering, Grid, PhysicalConstants,
};

const NX: usize = 12;
const NY: usize = 6;
const NZ: usize = 11;
/// First floating column
const I_GL: usize = 4;

fn marine_state(grid: &Grid, consts: &PhysicalConstants) -> DivaState {
    let mut state = DivaState::new(grid).with_uniform_bed(2e4);
    for j in 0..NY {
        for i in 0..NX {
            if i < I_GL {
                // Grounded interior
                state.h_ice[(i, j)] = 1000.0;
                state.h_grnd[(i, j)] = 500.0;
                state.f_grnd[(i, j)] = 1.0;
                state.z_bed[(i, j)] = 200.0;
            } else {
                // Floating shelf: H_float = (rho_sw/rho_ice)·500 ≈ 565 m > 400 m
                state.h_ice[(i, j)] = 400.0;
                state.h_grnd[(i, j)] = 0.0;
                state.f_grnd[(i, j)] = 0.0;
                state.z_bed[(i, j)] = -500.0;
            }
            state.z_sl[(i, j)] = 0.0;
            state.taud_acx[(i, j)] = 2000.0;
        }
    }
    // Staggered grounded fractions: partial coverage only on the
    // grounding-line edge
    for j in 0..NY {
        for i in 0..NX {
            state.f_grnd_acx[(i, j)] = if i + 1 < I_GL {
                1.0
            } else if i == I_GL - 1 {
                0.3
            } else {
                0.0
            };
            state.f_grnd_acy[(i, j)] = if i < I_GL { 1.0 } else { 0.0 };
        }
    }
    for k in 0..NZ {
        for j in 0..NY {
            for i in 0..NX {
                state.att[(i, j, k)] = 1e-17;
            }
        }
    }
    state
}

fn marine_params(stagger: GlStaggering) -> DivaParams {
    let mut params = DivaParams::default();
    params.gl_staggering = stagger;
    params.ssa_iter_max = 50;
    params
}

#[test]
fn shelf_edges_carry_no_drag() {
    let grid = Grid::with_uniform_zeta(NX, NY, 10e3, 10e3, NZ).unwrap();
    let consts = PhysicalConstants::default();

    for stagger in [GlStaggering::Upstream, GlStaggering::Subgrid] {
        let solver = DivaSolver::new(marine_params(stagger), consts).unwrap();
        let mut state = marine_state(&grid, &consts);
        solver.solve(&grid, &mut state).unwrap();

        for j in 0..NY {
            // aa-nodes on the shelf have no friction at all
            for i in I_GL..NX {
                assert_relative_eq!(state.beta[(i, j)], 0.0, epsilon = 1e-12);
            }
            // Edges entirely within the shelf are drag-free
            for i in I_GL..NX - 1 {
                assert_relative_eq!(state.beta_acx[(i, j)], 0.0, epsilon = 1e-12);
                assert_relative_eq!(state.beta_eff_acx[(i, j)], 0.0, epsilon = 1e-12);
            }
        }
    }
}

#[test]
fn grounding_line_edge_follows_staggering_policy() {
    let grid = Grid::with_uniform_zeta(NX, NY, 10e3, 10e3, NZ).unwrap();
    let consts = PhysicalConstants::default();
    let j = NY / 2;
    let edge = I_GL - 1; // edge between the last grounded and first floating column

    let mut results = Vec::new();
    for stagger in [
        GlStaggering::Simple,
        GlStaggering::Upstream,
        GlStaggering::Subgrid,
    ] {
        let solver = DivaSolver::new(marine_params(stagger), consts).unwrap();
        let mut state = marine_state(&grid, &consts);
        solver.solve(&grid, &mut state).unwrap();
        results.push((state.beta[(edge, j)], state.beta_acx[(edge, j)]));
    }

    let (beta_g_simple, simple) = results[0];
    let (beta_g_upstream, upstream) = results[1];
    let (beta_g_subgrid, subgrid) = results[2];

    // Floating neighbor contributes zero, so each policy reduces to a known
    // multiple of the grounded aa-value
    assert_relative_eq!(simple, 0.5 * beta_g_simple, max_relative = 1e-10);
    assert_relative_eq!(upstream, beta_g_upstream, max_relative = 1e-10);
    assert_relative_eq!(subgrid, 0.3 * beta_g_subgrid, max_relative = 1e-10);
}

#[test]
fn shelf_velocity_increases_seaward() {
    let grid = Grid::with_uniform_zeta(NX, NY, 10e3, 10e3, NZ).unwrap();
    let consts = PhysicalConstants::default();
    let solver = DivaSolver::new(marine_params(GlStaggering::Subgrid), consts).unwrap();
    let mut state = marine_state(&grid, &consts);
    let stats = solver.solve(&grid, &mut state).unwrap();
    assert!(stats.converged, "marine solve should converge: {:?}", stats);

    let j = NY / 2;
    // Slow, drag-controlled flow inland; free spreading on the shelf
    assert!(state.ux_bar[(1, j)] < state.ux_bar[(NX - 2, j)]);
    for i in I_GL..NX - 2 {
        assert!(
            state.ux_bar[(i + 1, j)] >= state.ux_bar[(i, j)],
            "shelf flow should accelerate seaward at i={}",
            i
        );
    }
}

#[test]
fn effective_pressure_vanishes_on_shelf() {
    let grid = Grid::with_uniform_zeta(NX, NY, 10e3, 10e3, NZ).unwrap();
    let consts = PhysicalConstants::default();
    let solver = DivaSolver::new(marine_params(GlStaggering::Subgrid), consts).unwrap();
    let mut state = marine_state(&grid, &consts);
    solver.solve(&grid, &mut state).unwrap();

    let j = NY / 2;
    for i in I_GL..NX {
        assert_relative_eq!(state.n_eff[(i, j)], 0.0, epsilon = 1e-12);
    }
    for i in 0..I_GL {
        assert!(state.n_eff[(i, j)] > 0.0);
    }
}
