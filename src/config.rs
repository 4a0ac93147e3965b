//! Solver parameters for the DIVA velocity core.
//!
//! Parameters are plain data deserialized from TOML. Physics choices are
//! tagged enums with per-variant payloads, so an option can only carry the
//! knobs that apply to it. `DivaParams::validate` rejects inconsistent
//! values before any iteration runs.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::DivaError;

/// Basal sliding law producing the friction coefficient `beta` on aa-nodes.
///
/// All laws operate on the bed roughness `c_bed` and the basal velocity
/// magnitude `|u_b|` (floored at `u_b_min`):
///
/// ```text
/// linear:   beta = c_bed
/// power:    beta = c_bed^(1/m) · |u_b|^((1-m)/m)          with q = 1/m
/// coulomb:  beta = c_bed · (|u_b|/(|u_b|+u_0))^(1/m) / |u_b|
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(tag = "law", rename_all = "snake_case")]
pub enum SlidingLaw {
    Linear,
    Power {
        /// Exponent q = 1/m of the power law
        q: f64,
    },
    RegularizedCoulomb {
        /// Exponent q = 1/m
        q: f64,
        /// Regularization velocity u_0 (m/a)
        u_0: f64,
    },
}

/// Grounding-line scaling applied multiplicatively to `beta`.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum GlScaling {
    /// No reduction near the grounding line.
    None,
    /// Damp `beta` by `f_gl ∈ [0,1]` at any grounded aa-node whose
    /// 4-neighborhood contains a fully floating cell.
    Fraction { f_gl: f64 },
    /// Ramp `beta` with the overburden above floatation:
    /// `beta ← min(H_grnd, h_grnd_lim)/h_grnd_lim · beta`.
    OverburdenRamp { h_grnd_lim: f64 },
    /// Zstar scaling: the thickness above floatation at sea level,
    /// optionally normalized by the ice thickness.
    ZStar { norm: bool },
}

/// How `beta` (and `beta_eff`) are staggered from aa- to ac-nodes across
/// the grounding line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GlStaggering {
    /// Arithmetic mean of the two adjacent aa-nodes.
    Simple,
    /// Both neighbors floating → 0; one grounded → the grounded value;
    /// else the mean.
    Upstream,
    /// One neighbor floating → blend by the staggered grounded fraction;
    /// fully grounded → mean; fully floating → 0.
    Subgrid,
}

/// Horizontal boundary treatment of the momentum solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Boundaries {
    /// Zero-gradient extrapolation at the domain edge (default).
    ZeroGradient,
    /// Wrap-around with the staggered halo layout.
    Periodic,
    /// Edge rows solve like interior cells with clamped stencils, for
    /// idealized domains much larger than the region of interest.
    Infinite,
}

/// Sparse linear solver used for the depth-integrated momentum system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LinearSolverKind {
    ConjugateGradient,
    BiCgStab,
    /// Dense LU fallback, only sensible for small grids.
    Direct,
}

/// Full parameter block consumed by the DIVA coordinator.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DivaParams {
    pub solver: LinearSolverKind,
    /// Relative tolerance of the linear solver
    pub lin_tol: f64,
    /// Iteration cap of the linear solver
    pub lin_max_iter: usize,

    pub boundaries: Boundaries,
    /// Suppress basal sliding entirely (`beta_eff = 1/F2`)
    pub no_slip: bool,

    pub sliding_law: SlidingLaw,
    pub gl_scaling: GlScaling,
    pub gl_staggering: GlStaggering,

    /// Uniform bed roughness used when no `c_bed` field is supplied
    pub beta_const: f64,
    /// Lower bound on `beta` wherever grounded (Pa·a/m)
    pub beta_min: f64,
    /// Floor on the basal velocity magnitude entering the sliding laws (m/a)
    pub u_b_min: f64,

    /// Scale `beta` by the effective pressure `N_eff`
    pub neff_scale: bool,
    /// Bed connectivity exponent p ∈ [0,1] of the Leguy (2014) water
    /// pressure: 0 = sealed bed, 1 = full ocean connection
    pub neff_p: f64,

    /// Gaussian smoothing of `beta` over grounded cells, standard deviation
    /// `n_smooth · dx`; 0 disables
    pub n_smooth: f64,

    /// Strain-rate floor eps_0 (a⁻¹), squared before entering the
    /// effective strain rate
    pub eps_0: f64,
    /// Lower bound on the effective viscosity (Pa·a)
    pub visc_min: f64,
    /// Glen flow-law exponent
    pub n_glen: f64,

    /// Cap on solved velocity components (m/a)
    pub ssa_vel_max: f64,
    /// Maximum outer (Picard) iterations
    pub ssa_iter_max: usize,
    /// Under-relaxation factor in (0, 1]
    pub ssa_iter_rel: f64,
    /// L2-relative convergence tolerance of the outer loop
    pub ssa_iter_conv: f64,
    /// Emit per-iteration convergence diagnostics through the log facade
    pub ssa_write_log: bool,
}

impl Default for DivaParams {
    fn default() -> Self {
        Self {
            solver: LinearSolverKind::BiCgStab,
            lin_tol: 1e-9,
            lin_max_iter: 5000,
            boundaries: Boundaries::ZeroGradient,
            no_slip: false,
            sliding_law: SlidingLaw::Linear,
            gl_scaling: GlScaling::None,
            gl_staggering: GlStaggering::Subgrid,
            beta_const: 1e3,
            beta_min: 10.0,
            u_b_min: 1e-3,
            neff_scale: false,
            neff_p: 1.0,
            n_smooth: 0.0,
            eps_0: 1e-8,
            visc_min: 1e3,
            n_glen: 3.0,
            ssa_vel_max: 5000.0,
            ssa_iter_max: 20,
            ssa_iter_rel: 0.7,
            ssa_iter_conv: 1e-3,
            ssa_write_log: false,
        }
    }
}

impl DivaParams {
    /// Check every parameter against its documented constraint.
    ///
    /// Called by the coordinator before the first iteration; a violation is
    /// fatal for the whole solve.
    pub fn validate(&self) -> Result<(), DivaError> {
        fn require(
            ok: bool,
            name: &'static str,
            value: f64,
            constraint: &'static str,
        ) -> Result<(), DivaError> {
            if ok {
                Ok(())
            } else {
                Err(DivaError::InvalidParameter {
                    name,
                    value,
                    constraint,
                })
            }
        }

        match self.gl_scaling {
            GlScaling::Fraction { f_gl } => {
                require(
                    (0.0..=1.0).contains(&f_gl),
                    "gl_scaling.f_gl",
                    f_gl,
                    "must lie in [0, 1]",
                )?;
            }
            GlScaling::OverburdenRamp { h_grnd_lim } => {
                require(
                    h_grnd_lim > 0.0,
                    "gl_scaling.h_grnd_lim",
                    h_grnd_lim,
                    "must be positive",
                )?;
            }
            GlScaling::None | GlScaling::ZStar { .. } => {}
        }

        match self.sliding_law {
            SlidingLaw::Power { q } => {
                require(q > 0.0, "sliding_law.q", q, "must be positive")?;
            }
            SlidingLaw::RegularizedCoulomb { q, u_0 } => {
                require(q > 0.0, "sliding_law.q", q, "must be positive")?;
                require(u_0 > 0.0, "sliding_law.u_0", u_0, "must be positive")?;
            }
            SlidingLaw::Linear => {}
        }

        require(
            self.ssa_iter_rel > 0.0 && self.ssa_iter_rel <= 1.0,
            "ssa_iter_rel",
            self.ssa_iter_rel,
            "must lie in (0, 1]",
        )?;
        require(
            self.ssa_iter_max >= 1,
            "ssa_iter_max",
            self.ssa_iter_max as f64,
            "must be at least 1",
        )?;
        require(
            self.ssa_iter_conv > 0.0,
            "ssa_iter_conv",
            self.ssa_iter_conv,
            "must be positive",
        )?;
        require(self.eps_0 > 0.0, "eps_0", self.eps_0, "must be positive")?;
        require(
            self.visc_min > 0.0,
            "visc_min",
            self.visc_min,
            "must be positive",
        )?;
        require(
            self.beta_min >= 0.0,
            "beta_min",
            self.beta_min,
            "must be non-negative",
        )?;
        require(
            self.u_b_min > 0.0,
            "u_b_min",
            self.u_b_min,
            "must be positive",
        )?;
        require(self.n_glen > 0.0, "n_glen", self.n_glen, "must be positive")?;
        require(
            (0.0..=1.0).contains(&self.neff_p),
            "neff_p",
            self.neff_p,
            "must lie in [0, 1]",
        )?;
        require(
            self.n_smooth >= 0.0,
            "n_smooth",
            self.n_smooth,
            "must be non-negative",
        )?;
        require(
            self.ssa_vel_max > 0.0,
            "ssa_vel_max",
            self.ssa_vel_max,
            "must be positive",
        )?;
        require(self.lin_tol > 0.0, "lin_tol", self.lin_tol, "must be positive")?;
        require(
            self.lin_max_iter >= 1,
            "lin_max_iter",
            self.lin_max_iter as f64,
            "must be at least 1",
        )?;

        Ok(())
    }

    /// Parse parameters from a TOML string.
    pub fn from_toml_str(contents: &str) -> Result<Self, DivaError> {
        toml::from_str(contents).map_err(|e| DivaError::ConfigIo(e.to_string()))
    }

    /// Read parameters from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, DivaError> {
        let contents = fs::read_to_string(path).map_err(|e| DivaError::ConfigIo(e.to_string()))?;
        Self::from_toml_str(&contents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(DivaParams::default().validate().is_ok());
    }

    #[test]
    fn test_bad_relaxation_rejected() {
        let mut p = DivaParams::default();
        p.ssa_iter_rel = 0.0;
        assert!(p.validate().is_err());
        p.ssa_iter_rel = 1.2;
        assert!(p.validate().is_err());
    }

    #[test]
    fn test_gl_scaling_constraints() {
        let mut p = DivaParams::default();
        p.gl_scaling = GlScaling::OverburdenRamp { h_grnd_lim: 0.0 };
        assert!(p.validate().is_err());

        p.gl_scaling = GlScaling::Fraction { f_gl: 1.5 };
        assert!(p.validate().is_err());

        p.gl_scaling = GlScaling::Fraction { f_gl: 0.5 };
        assert!(p.validate().is_ok());
    }

    #[test]
    fn test_toml_round_trip() {
        let toml_src = r#"
            no_slip = true
            ssa_iter_max = 50
            ssa_iter_rel = 0.9

            [sliding_law]
            law = "power"
            q = 0.333

            [gl_scaling]
            mode = "overburden_ramp"
            h_grnd_lim = 50.0
        "#;
        let p = DivaParams::from_toml_str(toml_src).unwrap();
        assert!(p.no_slip);
        assert_eq!(p.ssa_iter_max, 50);
        assert_eq!(
            p.gl_scaling,
            GlScaling::OverburdenRamp { h_grnd_lim: 50.0 }
        );
        match p.sliding_law {
            SlidingLaw::Power { q } => assert!((q - 0.333).abs() < 1e-12),
            other => panic!("wrong sliding law: {:?}", other),
        }
        assert!(p.validate().is_ok());
    }

    #[test]
    fn test_unknown_enum_value_rejected() {
        let toml_src = r#"
            boundaries = "reflecting"
        "#;
        assert!(DivaParams::from_toml_str(toml_src).is_err());
    }
}
