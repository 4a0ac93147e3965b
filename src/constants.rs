//! Physical constants and unit conversions for ice-sheet modeling.
//!
//! The velocity core works in model units: lengths in meters, velocities in
//! meters per year, viscosities in Pa·a, the rate factor in a⁻¹ Pa⁻ⁿ and
//! effective pressure in bar. The constants here are read-only after
//! initialization and are threaded through every component as an immutable
//! struct; no component reads hidden globals.

use serde::{Deserialize, Serialize};

// ============================================================================
// Time and pressure conversions
// ============================================================================

/// Seconds per year (365.25 days)
pub const SECONDS_PER_YEAR: f64 = 365.25 * 24.0 * 3600.0;

/// Pascals per bar
pub const BAR_TO_PA: f64 = 1e5;

/// Bar per pascal
pub const PA_TO_BAR: f64 = 1e-5;

/// Convert years to seconds
#[inline]
pub fn years_to_seconds(years: f64) -> f64 {
    years * SECONDS_PER_YEAR
}

/// Convert seconds to years
#[inline]
pub fn seconds_to_years(seconds: f64) -> f64 {
    seconds / SECONDS_PER_YEAR
}

/// Convert pascals to bar
#[inline]
pub fn pa_to_bar(pa: f64) -> f64 {
    pa * PA_TO_BAR
}

/// Convert bar to pascals
#[inline]
pub fn bar_to_pa(bar: f64) -> f64 {
    bar * BAR_TO_PA
}

// ============================================================================
// Physical constants
// ============================================================================

/// Process-wide physical constants, loaded once before any solve.
///
/// Defaults are the standard values used in ice-sheet modeling
/// intercomparisons (EISMINT / ISMIP).
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
#[serde(default)]
pub struct PhysicalConstants {
    /// Gravitational acceleration (m/s²)
    pub g: f64,
    /// Density of glacial ice (kg/m³)
    pub rho_ice: f64,
    /// Density of sea water (kg/m³)
    pub rho_sw: f64,
    /// Density of fresh water (kg/m³)
    pub rho_w: f64,
    /// Melting point of ice at standard pressure (K)
    pub t0: f64,
    /// Latent heat of fusion of ice (J/kg)
    pub l_ice: f64,
    /// Seconds per year used for unit conversion
    pub sec_year: f64,
}

impl Default for PhysicalConstants {
    fn default() -> Self {
        Self {
            g: 9.81,
            rho_ice: 910.0,
            rho_sw: 1028.0,
            rho_w: 1000.0,
            t0: 273.15,
            l_ice: 3.35e5,
            sec_year: SECONDS_PER_YEAR,
        }
    }
}

impl PhysicalConstants {
    /// Ratio of sea-water to ice density, the floatation factor used in
    /// grounding-line diagnostics.
    #[inline]
    pub fn floatation_ratio(&self) -> f64 {
        self.rho_sw / self.rho_ice
    }

    /// Overburden pressure of an ice column of thickness `h_ice` (Pa).
    #[inline]
    pub fn overburden(&self, h_ice: f64) -> f64 {
        self.rho_ice * self.g * h_ice
    }
}
