//! Staggering maps between the node flavors of the C-grid.
//!
//! All maps clamp indices at the domain edge, which is the discrete form of
//! the zero-gradient boundary. The `_onesided` variants take the ice
//! thickness and fall back to the icy neighbor at ice margins, so that
//! ice-free cells never dilute a staggered quantity.

use super::{AaField, AbField, AcxField, AcyField};

/// aa → acx: arithmetic mean of the two cells sharing the x-face.
pub fn aa_to_acx(f: &AaField) -> AcxField {
    let (nx, ny) = (f.nx(), f.ny());
    AcxField::from_fn(nx, ny, |i, j| {
        let ip1 = (i + 1).min(nx - 1);
        0.5 * (f[(i, j)] + f[(ip1, j)])
    })
}

/// aa → acy: arithmetic mean of the two cells sharing the y-face.
pub fn aa_to_acy(f: &AaField) -> AcyField {
    let (nx, ny) = (f.nx(), f.ny());
    AcyField::from_fn(nx, ny, |i, j| {
        let jp1 = (j + 1).min(ny - 1);
        0.5 * (f[(i, j)] + f[(i, jp1)])
    })
}

/// acx → aa: mean of the two faces bounding the cell in x.
pub fn acx_to_aa(f: &AcxField) -> AaField {
    let (nx, ny) = (f.nx(), f.ny());
    AaField::from_fn(nx, ny, |i, j| {
        let im1 = i.saturating_sub(1);
        0.5 * (f[(im1, j)] + f[(i, j)])
    })
}

/// acy → aa: mean of the two faces bounding the cell in y.
pub fn acy_to_aa(f: &AcyField) -> AaField {
    let (nx, ny) = (f.nx(), f.ny());
    AaField::from_fn(nx, ny, |i, j| {
        let jm1 = j.saturating_sub(1);
        0.5 * (f[(i, jm1)] + f[(i, j)])
    })
}

/// aa → ab: 4-point average onto the corner shared by cells
/// `(i,j)`, `(i+1,j)`, `(i,j+1)`, `(i+1,j+1)`.
pub fn aa_to_ab(f: &AaField) -> AbField {
    let (nx, ny) = (f.nx(), f.ny());
    AbField::from_fn(nx, ny, |i, j| {
        let ip1 = (i + 1).min(nx - 1);
        let jp1 = (j + 1).min(ny - 1);
        0.25 * (f[(i, j)] + f[(ip1, j)] + f[(i, jp1)] + f[(ip1, jp1)])
    })
}

/// ab → aa: 4-point average of the corners surrounding a cell center.
pub fn ab_to_aa(f: &AbField) -> AaField {
    let (nx, ny) = (f.nx(), f.ny());
    AaField::from_fn(nx, ny, |i, j| {
        let im1 = i.saturating_sub(1);
        let jm1 = j.saturating_sub(1);
        0.25 * (f[(im1, jm1)] + f[(i, jm1)] + f[(im1, j)] + f[(i, j)])
    })
}

/// aa → acx with one-sided selection at ice margins: where only one of the
/// two adjacent cells carries ice, its value is used directly.
pub fn aa_to_acx_onesided(f: &AaField, h_ice: &AaField) -> AcxField {
    let (nx, ny) = (f.nx(), f.ny());
    AcxField::from_fn(nx, ny, |i, j| {
        let ip1 = (i + 1).min(nx - 1);
        let icy_w = h_ice[(i, j)] > 0.0;
        let icy_e = h_ice[(ip1, j)] > 0.0;
        match (icy_w, icy_e) {
            (true, false) => f[(i, j)],
            (false, true) => f[(ip1, j)],
            _ => 0.5 * (f[(i, j)] + f[(ip1, j)]),
        }
    })
}

/// aa → acy with one-sided selection at ice margins.
pub fn aa_to_acy_onesided(f: &AaField, h_ice: &AaField) -> AcyField {
    let (nx, ny) = (f.nx(), f.ny());
    AcyField::from_fn(nx, ny, |i, j| {
        let jp1 = (j + 1).min(ny - 1);
        let icy_s = h_ice[(i, j)] > 0.0;
        let icy_n = h_ice[(i, jp1)] > 0.0;
        match (icy_s, icy_n) {
            (true, false) => f[(i, j)],
            (false, true) => f[(i, jp1)],
            _ => 0.5 * (f[(i, j)] + f[(i, jp1)]),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn ramp(nx: usize, ny: usize) -> AaField {
        AaField::from_fn(nx, ny, |i, _| i as f64)
    }

    #[test]
    fn test_aa_to_acx_linear() {
        let f = ramp(4, 3);
        let s = aa_to_acx(&f);
        // Interior faces sit halfway between cell centers
        assert_relative_eq!(s[(0, 1)], 0.5);
        assert_relative_eq!(s[(2, 1)], 2.5);
        // Edge face clamps
        assert_relative_eq!(s[(3, 1)], 3.0);
    }

    #[test]
    fn test_round_trip_constant() {
        let f = AaField::filled(5, 5, 2.5);
        let back = acx_to_aa(&aa_to_acx(&f));
        for j in 0..5 {
            for i in 0..5 {
                assert_relative_eq!(back[(i, j)], 2.5, epsilon = 1e-14);
            }
        }
    }

    #[test]
    fn test_aa_to_ab_average() {
        let f = AaField::from_fn(3, 3, |i, j| (i + j) as f64);
        let ab = aa_to_ab(&f);
        // Corner between (0,0), (1,0), (0,1), (1,1): values 0, 1, 1, 2
        assert_relative_eq!(ab[(0, 0)], 1.0);
    }

    #[test]
    fn test_onesided_at_margin() {
        let f = AaField::from_fn(4, 1, |i, _| 10.0 + i as f64);
        let mut h = AaField::filled(4, 1, 100.0);
        h[(2, 0)] = 0.0; // ice-free cell

        let s = aa_to_acx_onesided(&f, &h);
        // Face between icy (1) and ice-free (2): take the icy side
        assert_relative_eq!(s[(1, 0)], 11.0);
        // Face between ice-free (2) and icy (3): take the icy side
        assert_relative_eq!(s[(2, 0)], 13.0);
        // Fully icy face stays a mean
        assert_relative_eq!(s[(0, 0)], 10.5);
    }
}
