pub mod basal;
pub mod config;
pub mod constants;
pub mod diva;
pub mod error;
pub mod grid;
pub mod linalg;
pub mod momentum;
pub mod viscosity;

pub use config::{
    Boundaries, DivaParams, GlScaling, GlStaggering, LinearSolverKind, SlidingLaw,
};
pub use constants::PhysicalConstants;
pub use diva::{DivaSolver, DivaState, DivaStats};
pub use error::DivaError;
pub use grid::{
    AaField, AaField3, AbField, AcxField, AcxField3, AcxMask, AcyField, AcyField3, AcyMask,
    Field2, Field3, Grid,
};
pub use linalg::{BiCgStab, ConjugateGradient, DirectSolver, Solver, SolverStats};
pub use momentum::{solve_momentum, MomentumStats};
