/// Validation benchmark: confined marine margin
///
/// **Problem Setup:**
/// - Grounded interior (strong drag) feeding a floating shelf over a deep
///   marine bed
/// - Uniform driving stress; drag shuts off seaward of the grounding line
///
/// **Expected Behavior:**
/// - beta = 0 everywhere on the shelf, under every staggering policy
/// - Velocity accelerates monotonically seaward of the grounding line
/// - Grounding-line edge drag follows the staggering policy exactly
use ice_dynamics::{
    DivaParams, DivaSolver, DivaState, GlStaggering, Grid, PhysicalConstants,
};

const NX: usize = 16;
const NY: usize = 8;
const NZ: usize = 11;
const I_GL: usize = 5;

fn marine_state(grid: &Grid) -> DivaState {
    let mut state = DivaState::new(grid).with_uniform_bed(2e4);
    for j in 0..NY {
        for i in 0..NX {
            if i < I_GL {
                state.h_ice[(i, j)] = 1000.0;
                state.h_grnd[(i, j)] = 500.0;
                state.f_grnd[(i, j)] = 1.0;
                state.z_bed[(i, j)] = 200.0;
            } else {
                state.h_ice[(i, j)] = 400.0;
                state.h_grnd[(i, j)] = 0.0;
                state.f_grnd[(i, j)] = 0.0;
                state.z_bed[(i, j)] = -500.0;
            }
            state.z_sl[(i, j)] = 0.0;
            state.taud_acx[(i, j)] = 2000.0;
            state.f_grnd_acx[(i, j)] = if i + 1 < I_GL {
                1.0
            } else if i == I_GL - 1 {
                0.5
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

fn main() {
    println!("═══════════════════════════════════════════════════════════════");
    println!("  DIVA Validation: Grounded Margin Feeding a Floating Shelf");
    println!("═══════════════════════════════════════════════════════════════\n");

    let grid = Grid::with_uniform_zeta(NX, NY, 10e3, 10e3, NZ).unwrap();
    let consts = PhysicalConstants::default();
    let j = NY / 2;

    for stagger in [
        GlStaggering::Simple,
        GlStaggering::Upstream,
        GlStaggering::Subgrid,
    ] {
        println!("──────────────────────────────────────────────────────────────");
        println!("  Staggering policy: {:?}", stagger);
        println!("──────────────────────────────────────────────────────────────");

        let mut params = DivaParams::default();
        params.gl_staggering = stagger;
        params.ssa_iter_max = 50;
        let solver = DivaSolver::new(params, consts).unwrap();

        let mut state = marine_state(&grid);
        let stats = solver.solve(&grid, &mut state).unwrap();

        println!(
            "  Iterations: {} (converged: {}, resid {:.2e})",
            stats.iterations, stats.converged, stats.resid
        );
        println!(
            "  GL edge beta_acx      = {:.1} Pa·a/m (grounded aa value {:.1})",
            state.beta_acx[(I_GL - 1, j)],
            state.beta[(I_GL - 1, j)]
        );
        println!(
            "  Max shelf beta_acx    = {:.2e}",
            (I_GL..NX - 1)
                .map(|i| state.beta_acx[(i, j)].abs())
                .fold(0.0_f64, f64::max)
        );

        print!("  ux_bar along centerline:");
        for i in (0..NX).step_by(3) {
            print!(" {:8.2}", state.ux_bar[(i, j)]);
        }
        println!(" m/a\n");
    }

    println!("═══════════════════════════════════════════════════════════════");
    println!("  Validation Complete");
    println!("═══════════════════════════════════════════════════════════════");
}
