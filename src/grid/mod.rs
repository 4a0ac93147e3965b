//! Staggered map-plane grid and typed field storage.
//!
//! The model uses an Arakawa C-grid with four node flavors: cell centers
//! (aa), x-staggered faces (acx), y-staggered faces (acy) and corners (ab).
//! Each flavor is a distinct zero-sized marker type, so a field defined on
//! one flavor cannot be passed where another is expected. All flavors share
//! the same `nx × ny` storage extent; the last column of an acx field (and
//! the last row of an acy field) acts as a halo.
//!
//! The vertical axis is a terrain-following sigma coordinate `zeta ∈ [0,1]`
//! with 0 at the ice base and 1 at the surface. Layer centers `zeta_aa`
//! include both endpoints; interface values `zeta_ac` sit between them.

pub mod boundary;
pub mod integrate;
pub mod smooth;
pub mod stagger;

use std::fmt;
use std::marker::PhantomData;
use std::ops::{Index, IndexMut};

use crate::error::DivaError;

/// Marker trait for the staggered node flavors.
pub trait NodeKind: Copy + Clone + fmt::Debug + 'static {
    const NAME: &'static str;
}

/// Cell centers: scalars such as thickness, viscosity, bed elevation.
#[derive(Debug, Clone, Copy)]
pub struct Aa;

/// x-staggered faces: x-components of velocity, stress and flux.
#[derive(Debug, Clone, Copy)]
pub struct Acx;

/// y-staggered faces: y-components.
#[derive(Debug, Clone, Copy)]
pub struct Acy;

/// Corner nodes, used internally to stabilize the viscosity.
#[derive(Debug, Clone, Copy)]
pub struct Ab;

impl NodeKind for Aa {
    const NAME: &'static str = "aa";
}
impl NodeKind for Acx {
    const NAME: &'static str = "acx";
}
impl NodeKind for Acy {
    const NAME: &'static str = "acy";
}
impl NodeKind for Ab {
    const NAME: &'static str = "ab";
}

// ============================================================================
// 2-D fields
// ============================================================================

/// Dense 2-D field over one node flavor, row-major with `i` fastest.
#[derive(Debug, Clone)]
pub struct Field2<N: NodeKind, T = f64> {
    nx: usize,
    ny: usize,
    data: Vec<T>,
    _node: PhantomData<N>,
}

impl<N: NodeKind, T: Copy> Field2<N, T> {
    pub fn filled(nx: usize, ny: usize, value: T) -> Self {
        Self {
            nx,
            ny,
            data: vec![value; nx * ny],
            _node: PhantomData,
        }
    }

    pub fn from_fn<F: FnMut(usize, usize) -> T>(nx: usize, ny: usize, mut f: F) -> Self {
        let mut data = Vec::with_capacity(nx * ny);
        for j in 0..ny {
            for i in 0..nx {
                data.push(f(i, j));
            }
        }
        Self {
            nx,
            ny,
            data,
            _node: PhantomData,
        }
    }

    #[inline]
    pub fn nx(&self) -> usize {
        self.nx
    }

    #[inline]
    pub fn ny(&self) -> usize {
        self.ny
    }

    #[inline]
    fn idx(&self, i: usize, j: usize) -> usize {
        debug_assert!(i < self.nx && j < self.ny);
        j * self.nx + i
    }

    pub fn fill(&mut self, value: T) {
        self.data.fill(value);
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// Overwrite this field with the contents of `other`.
    pub fn assign(&mut self, other: &Self) {
        debug_assert_eq!(self.data.len(), other.data.len());
        self.data.copy_from_slice(&other.data);
    }

    /// Check that the field matches the expected grid extent.
    pub fn check_extent(
        &self,
        name: &'static str,
        nx: usize,
        ny: usize,
    ) -> Result<(), DivaError> {
        if self.nx != nx || self.ny != ny {
            return Err(DivaError::GridMismatch {
                name,
                got: self.data.len(),
                expected: nx * ny,
            });
        }
        Ok(())
    }
}

impl<N: NodeKind> Field2<N, f64> {
    pub fn zeros(nx: usize, ny: usize) -> Self {
        Self::filled(nx, ny, 0.0)
    }

    /// Maximum absolute value over the field.
    pub fn max_abs(&self) -> f64 {
        self.data.iter().fold(0.0_f64, |m, &v| m.max(v.abs()))
    }
}

impl<N: NodeKind, T: Copy> Index<(usize, usize)> for Field2<N, T> {
    type Output = T;

    #[inline]
    fn index(&self, (i, j): (usize, usize)) -> &T {
        &self.data[self.idx(i, j)]
    }
}

impl<N: NodeKind, T: Copy> IndexMut<(usize, usize)> for Field2<N, T> {
    #[inline]
    fn index_mut(&mut self, (i, j): (usize, usize)) -> &mut T {
        let idx = self.idx(i, j);
        &mut self.data[idx]
    }
}

pub type AaField = Field2<Aa>;
pub type AcxField = Field2<Acx>;
pub type AcyField = Field2<Acy>;
pub type AbField = Field2<Ab>;

pub type AcxMask = Field2<Acx, i32>;
pub type AcyMask = Field2<Acy, i32>;

// ============================================================================
// 3-D fields
// ============================================================================

/// Dense 3-D field: a stack of `nz` horizontal layers over one node flavor.
/// Layer-major storage so each layer is a contiguous 2-D slab.
#[derive(Debug, Clone)]
pub struct Field3<N: NodeKind> {
    nx: usize,
    ny: usize,
    nz: usize,
    data: Vec<f64>,
    _node: PhantomData<N>,
}

impl<N: NodeKind> Field3<N> {
    pub fn zeros(nx: usize, ny: usize, nz: usize) -> Self {
        Self {
            nx,
            ny,
            nz,
            data: vec![0.0; nx * ny * nz],
            _node: PhantomData,
        }
    }

    #[inline]
    pub fn nx(&self) -> usize {
        self.nx
    }

    #[inline]
    pub fn ny(&self) -> usize {
        self.ny
    }

    #[inline]
    pub fn nz(&self) -> usize {
        self.nz
    }

    #[inline]
    fn idx(&self, i: usize, j: usize, k: usize) -> usize {
        debug_assert!(i < self.nx && j < self.ny && k < self.nz);
        (k * self.ny + j) * self.nx + i
    }

    pub fn fill(&mut self, value: f64) {
        self.data.fill(value);
    }

    /// Copy of layer `k` as a typed 2-D field.
    pub fn layer_field(&self, k: usize) -> Field2<N> {
        let n = self.nx * self.ny;
        Field2 {
            nx: self.nx,
            ny: self.ny,
            data: self.data[k * n..(k + 1) * n].to_vec(),
            _node: PhantomData,
        }
    }

    /// Overwrite layer `k` from a typed 2-D field.
    pub fn set_layer(&mut self, k: usize, f: &Field2<N>) {
        debug_assert_eq!(f.nx, self.nx);
        debug_assert_eq!(f.ny, self.ny);
        let n = self.nx * self.ny;
        self.data[k * n..(k + 1) * n].copy_from_slice(&f.data);
    }

    /// Contiguous slice of layer `k`.
    pub fn layer(&self, k: usize) -> &[f64] {
        let n = self.nx * self.ny;
        &self.data[k * n..(k + 1) * n]
    }

    pub fn layer_mut(&mut self, k: usize) -> &mut [f64] {
        let n = self.nx * self.ny;
        &mut self.data[k * n..(k + 1) * n]
    }

    /// Vertical profile at `(i, j)` collected into `out` (length `nz`).
    pub fn column(&self, i: usize, j: usize, out: &mut [f64]) {
        debug_assert_eq!(out.len(), self.nz);
        for (k, v) in out.iter_mut().enumerate() {
            *v = self.data[self.idx(i, j, k)];
        }
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    pub fn check_extent(
        &self,
        name: &'static str,
        nx: usize,
        ny: usize,
        nz: usize,
    ) -> Result<(), DivaError> {
        if self.nx != nx || self.ny != ny || self.nz != nz {
            return Err(DivaError::GridMismatch {
                name,
                got: self.data.len(),
                expected: nx * ny * nz,
            });
        }
        Ok(())
    }
}

impl<N: NodeKind> Index<(usize, usize, usize)> for Field3<N> {
    type Output = f64;

    #[inline]
    fn index(&self, (i, j, k): (usize, usize, usize)) -> &f64 {
        &self.data[self.idx(i, j, k)]
    }
}

impl<N: NodeKind> IndexMut<(usize, usize, usize)> for Field3<N> {
    #[inline]
    fn index_mut(&mut self, (i, j, k): (usize, usize, usize)) -> &mut f64 {
        let idx = self.idx(i, j, k);
        &mut self.data[idx]
    }
}

pub type AaField3 = Field3<Aa>;
pub type AcxField3 = Field3<Acx>;
pub type AcyField3 = Field3<Acy>;

// ============================================================================
// Grid geometry
// ============================================================================

/// Regular map-plane grid with a sigma vertical axis.
#[derive(Debug, Clone)]
pub struct Grid {
    pub nx: usize,
    pub ny: usize,
    pub nz: usize,
    /// Grid spacing in x (m)
    pub dx: f64,
    /// Grid spacing in y (m)
    pub dy: f64,
    /// Layer-center sigma values, `zeta_aa[0] = 0` (base), `zeta_aa[nz-1] = 1` (surface)
    pub zeta_aa: Vec<f64>,
    /// Layer-interface sigma values (`nz - 1` entries)
    pub zeta_ac: Vec<f64>,
}

impl Grid {
    /// Build a grid from its horizontal extent and layer-center sigma axis.
    ///
    /// `zeta_aa` must be strictly increasing from 0 to 1.
    pub fn new(
        nx: usize,
        ny: usize,
        dx: f64,
        dy: f64,
        zeta_aa: Vec<f64>,
    ) -> Result<Self, DivaError> {
        if nx < 3 || ny < 3 {
            return Err(DivaError::InvalidParameter {
                name: "nx/ny",
                value: nx.min(ny) as f64,
                constraint: "grid needs at least 3 cells in each direction",
            });
        }
        if dx <= 0.0 || dy <= 0.0 {
            return Err(DivaError::InvalidParameter {
                name: "dx/dy",
                value: dx.min(dy),
                constraint: "grid spacing must be positive",
            });
        }
        let nz = zeta_aa.len();
        if nz < 2 {
            return Err(DivaError::InvalidParameter {
                name: "nz",
                value: nz as f64,
                constraint: "need at least 2 vertical layers",
            });
        }
        let monotone = zeta_aa.windows(2).all(|w| w[1] > w[0]);
        if !monotone || zeta_aa[0] != 0.0 || (zeta_aa[nz - 1] - 1.0).abs() > 1e-12 {
            return Err(DivaError::InvalidParameter {
                name: "zeta_aa",
                value: zeta_aa[0],
                constraint: "must increase strictly from 0 to 1",
            });
        }

        let zeta_ac = zeta_aa.windows(2).map(|w| 0.5 * (w[0] + w[1])).collect();

        Ok(Self {
            nx,
            ny,
            nz,
            dx,
            dy,
            zeta_aa,
            zeta_ac,
        })
    }

    /// Uniformly spaced sigma axis with `nz` layer centers.
    pub fn with_uniform_zeta(
        nx: usize,
        ny: usize,
        dx: f64,
        dy: f64,
        nz: usize,
    ) -> Result<Self, DivaError> {
        let zeta = (0..nz).map(|k| k as f64 / (nz - 1) as f64).collect();
        Self::new(nx, ny, dx, dy, zeta)
    }

    #[inline]
    pub fn n_nodes(&self) -> usize {
        self.nx * self.ny
    }
}
