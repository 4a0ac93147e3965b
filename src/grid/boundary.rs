//! Periodic halo exchange for the staggered grids.
//!
//! With periodic wrap-around, a velocity component carries a three-cell halo
//! along its own staggered axis (the face at the domain edge coincides with
//! an interior face one period away) but only a two-cell halo across it.
//! The index arithmetic therefore differs between the x- and y-components
//! and must not be symmetrized.

use super::{AaField, AcxField, AcyField};

/// Wrap an aa-node field: two-cell halo in both directions.
pub fn fill_periodic_aa(f: &mut AaField) {
    let (nx, ny) = (f.nx(), f.ny());
    for j in 0..ny {
        f[(0, j)] = f[(nx - 2, j)];
        f[(nx - 1, j)] = f[(1, j)];
    }
    for i in 0..nx {
        f[(i, 0)] = f[(i, ny - 2)];
        f[(i, ny - 1)] = f[(i, 1)];
    }
}

/// Wrap an acx-node field: three-cell halo in x, two-cell halo in y.
pub fn fill_periodic_acx(f: &mut AcxField) {
    let (nx, ny) = (f.nx(), f.ny());
    for j in 0..ny {
        f[(0, j)] = f[(nx - 3, j)];
        f[(nx - 2, j)] = f[(1, j)];
        f[(nx - 1, j)] = f[(2, j)];
    }
    for i in 0..nx {
        f[(i, 0)] = f[(i, ny - 2)];
        f[(i, ny - 1)] = f[(i, 1)];
    }
}

/// Wrap an acy-node field: two-cell halo in x, three-cell halo in y.
pub fn fill_periodic_acy(f: &mut AcyField) {
    let (nx, ny) = (f.nx(), f.ny());
    for i in 0..nx {
        f[(i, 0)] = f[(i, ny - 3)];
        f[(i, ny - 2)] = f[(i, 1)];
        f[(i, ny - 1)] = f[(i, 2)];
    }
    for j in 0..ny {
        f[(0, j)] = f[(nx - 2, j)];
        f[(nx - 1, j)] = f[(1, j)];
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_acx_halo_asymmetry() {
        let nx = 8;
        let mut f = AcxField::from_fn(nx, 4, |i, j| (10 * i + j) as f64);
        fill_periodic_acx(&mut f);
        // Along the staggered axis: three halo columns
        assert_relative_eq!(f[(0, 2)], f[(nx - 3, 2)]);
        assert_relative_eq!(f[(nx - 2, 2)], f[(1, 2)]);
        assert_relative_eq!(f[(nx - 1, 2)], f[(2, 2)]);
    }

    #[test]
    fn test_acy_matches_transposed_acx() {
        let ny = 8;
        let mut fy = AcyField::from_fn(4, ny, |i, j| (i + 10 * j) as f64);
        fill_periodic_acy(&mut fy);
        assert_relative_eq!(fy[(2, 0)], fy[(2, ny - 3)]);
        assert_relative_eq!(fy[(2, ny - 2)], fy[(2, 1)]);
        assert_relative_eq!(fy[(2, ny - 1)], fy[(2, 2)]);
    }

    #[test]
    fn test_aa_wrap() {
        let mut f = AaField::from_fn(6, 6, |i, j| (i * 6 + j) as f64);
        fill_periodic_aa(&mut f);
        assert_relative_eq!(f[(0, 3)], f[(4, 3)]);
        assert_relative_eq!(f[(5, 3)], f[(1, 3)]);
    }
}
