//! Mask-restricted Gaussian smoothing on aa-nodes.

use super::{Aa, AaField, Field2};

/// Smooth `field` with a Gaussian kernel of standard deviation `sigma`
/// (meters), restricted to cells where `include` is true.
///
/// Excluded cells neither receive smoothed values nor contribute weight to
/// their neighbors, so e.g. floating or ice-free cells do not bleed into the
/// grounded interior. The kernel is truncated at two standard deviations and
/// renormalized over the included cells under its footprint.
pub fn gaussian_smooth_masked(
    field: &mut AaField,
    include: &Field2<Aa, bool>,
    sigma: f64,
    dx: f64,
) {
    if sigma <= 0.0 {
        return;
    }
    let (nx, ny) = (field.nx(), field.ny());
    let radius = (2.0 * sigma / dx).ceil() as isize;
    let inv_two_sigma_sq = 1.0 / (2.0 * sigma * sigma);

    let source = field.clone();

    for j in 0..ny {
        for i in 0..nx {
            if !include[(i, j)] {
                continue;
            }
            let mut weight_sum = 0.0;
            let mut value_sum = 0.0;
            for dj in -radius..=radius {
                for di in -radius..=radius {
                    let ii = i as isize + di;
                    let jj = j as isize + dj;
                    if ii < 0 || jj < 0 || ii >= nx as isize || jj >= ny as isize {
                        continue;
                    }
                    let (ii, jj) = (ii as usize, jj as usize);
                    if !include[(ii, jj)] {
                        continue;
                    }
                    let r_sq = ((di * di + dj * dj) as f64) * dx * dx;
                    let w = (-r_sq * inv_two_sigma_sq).exp();
                    weight_sum += w;
                    value_sum += w * source[(ii, jj)];
                }
            }
            if weight_sum > 0.0 {
                field[(i, j)] = value_sum / weight_sum;
            }
        }
    }
}
