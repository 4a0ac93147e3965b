//! Trapezoid integration along the sigma axis.

/// Trapezoid rule over the full column: `∫₀¹ v(zeta) dzeta`.
///
/// `zeta` and `values` are the layer-center samples; both endpoints are
/// included in the axis so no end-correction is needed.
pub fn trapezoid(zeta: &[f64], values: &[f64]) -> f64 {
    debug_assert_eq!(zeta.len(), values.len());
    let mut sum = 0.0;
    for k in 1..zeta.len() {
        sum += 0.5 * (values[k] + values[k - 1]) * (zeta[k] - zeta[k - 1]);
    }
    sum
}

/// Cumulative trapezoid integral: `out[k] = ∫₀^{zeta[k]} v dzeta`.
///
/// `out[0]` is always zero since `zeta[0]` is the lower bound.
pub fn cumulative_trapezoid(zeta: &[f64], values: &[f64], out: &mut [f64]) {
    debug_assert_eq!(zeta.len(), values.len());
    debug_assert_eq!(zeta.len(), out.len());
    out[0] = 0.0;
    for k in 1..zeta.len() {
        out[k] = out[k - 1] + 0.5 * (values[k] + values[k - 1]) * (zeta[k] - zeta[k - 1]);
    }
}
