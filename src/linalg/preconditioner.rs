use sprs::CsMat;

/// Approximate inverse applied inside the iterative solvers: `z ≈ A⁻¹ r`.
pub trait Preconditioner {
    fn apply(&self, r: &[f64]) -> Vec<f64>;
}

/// Diagonal (Jacobi) preconditioner.
///
/// Cheap and effective here: the friction term puts strongly varying
/// positive entries on the diagonal, so diagonal scaling already evens out
/// the grounded/floating contrast.
pub struct JacobiPreconditioner {
    diag_inv: Vec<f64>,
}

impl JacobiPreconditioner {
    pub fn new(a: &CsMat<f64>) -> Self {
        let n = a.rows();
        let mut diag_inv = vec![1.0; n];
        for i in 0..n {
            if let Some(&val) = a.get(i, i) {
                if val.abs() > 1e-300 {
                    diag_inv[i] = 1.0 / val;
                }
            }
        }
        Self { diag_inv }
    }
}

impl Preconditioner for JacobiPreconditioner {
    fn apply(&self, r: &[f64]) -> Vec<f64> {
        r.iter()
            .zip(self.diag_inv.iter())
            .map(|(&ri, &di)| ri * di)
            .collect()
    }
}

/// No preconditioning.
pub struct IdentityPreconditioner;

impl Preconditioner for IdentityPreconditioner {
    fn apply(&self, r: &[f64]) -> Vec<f64> {
        r.to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use sprs::TriMat;

    #[test]
    fn test_jacobi_inverts_diagonal() {
        let mut t = TriMat::new((3, 3));
        t.add_triplet(0, 0, 2.0);
        t.add_triplet(1, 1, 4.0);
        t.add_triplet(2, 2, 8.0);
        let a = t.to_csr();

        let p = JacobiPreconditioner::new(&a);
        let z = p.apply(&[2.0, 4.0, 8.0]);
        for zi in z {
            assert_relative_eq!(zi, 1.0, epsilon = 1e-14);
        }
    }
}
