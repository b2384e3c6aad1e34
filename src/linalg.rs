//! Dense eigenvalue routines for structural and flutter matrices
//!
//! Mass matrices are lumped, so every generalized problem `A x = lambda M x` is reduced to a
//! standard one by scaling with the diagonal of `M`.

use nalgebra::{DMatrix, DVector, Dyn, Schur, SymmetricEigen};
use num_complex::Complex64;
use thiserror::Error;

const SCHUR_ITERATIONS_PER_ROW: usize = 60;

/// Failures of the dense eigenvalue routines
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EigenError {
    /// Mass matrix has a non-positive or non-finite diagonal entry at the given index
    #[error("mass matrix entry {0} is not positive")]
    SingularMass(usize),
    /// Matrix dimensions do not agree
    #[error("dimension mismatch, {0} vs {1}")]
    DimensionMismatch(usize, usize),
    /// Schur decomposition did not converge
    #[error("Schur iteration did not converge")]
    NoConvergence,
    /// The decomposition produced NaN or infinite eigenvalues
    #[error("non-finite eigenvalue")]
    NonFinite,
}

fn check_mass(mass: &DVector<f64>, n: usize) -> Result<(), EigenError> {
    if mass.len() != n {
        return Err(EigenError::DimensionMismatch(mass.len(), n));
    }
    match mass.iter().position(|m| !(m.is_finite() && *m > 0.0)) {
        Some(i) => Err(EigenError::SingularMass(i)),
        None => Ok(()),
    }
}

/// Eigenvalues of `A x = lambda diag(mass) x` for a complex, generally non-Hermitian `A`
pub(crate) fn generalized_eigenvalues(
    a: &DMatrix<Complex64>,
    mass: &DVector<f64>,
) -> Result<Vec<Complex64>, EigenError> {
    let n = a.nrows();
    if a.ncols() != n {
        return Err(EigenError::DimensionMismatch(n, a.ncols()));
    }
    check_mass(mass, n)?;

    let mut scaled = a.clone();
    for (i, mut row) in scaled.row_iter_mut().enumerate() {
        row /= Complex64::from(mass[i]);
    }

    // Complex Schur form is upper triangular, so the eigenvalues sit on the diagonal
    let (_, triangular) = Schur::try_new(scaled, f64::EPSILON, SCHUR_ITERATIONS_PER_ROW * n)
        .ok_or(EigenError::NoConvergence)?
        .unpack();
    let eigenvalues = triangular.diagonal();

    if eigenvalues.iter().any(|l| !(l.re.is_finite() && l.im.is_finite())) {
        return Err(EigenError::NonFinite);
    }

    Ok(eigenvalues.iter().copied().collect())
}

fn symmetric_modes(
    stiffness: &DMatrix<f64>,
    mass: &DVector<f64>,
) -> Result<(DVector<f64>, SymmetricEigen<f64, Dyn>), EigenError> {
    let n = stiffness.nrows();
    if stiffness.ncols() != n {
        return Err(EigenError::DimensionMismatch(n, stiffness.ncols()));
    }
    check_mass(mass, n)?;

    let inv_sqrt = mass.map(|m| 1.0 / m.sqrt());
    let symmetric = DMatrix::from_fn(n, n, |i, j| {
        0.5 * (stiffness[(i, j)] + stiffness[(j, i)]) * inv_sqrt[i] * inv_sqrt[j]
    });

    let eigen = SymmetricEigen::new(symmetric);
    if eigen.eigenvalues.iter().any(|l| !l.is_finite()) {
        return Err(EigenError::NonFinite);
    }

    Ok((inv_sqrt, eigen))
}

/// Squared natural frequencies of `K x = omega^2 diag(mass) x`, ascending. Solved through the
/// symmetric form `M^-1/2 K M^-1/2`.
pub(crate) fn modal_analysis(
    stiffness: &DMatrix<f64>,
    mass: &DVector<f64>,
) -> Result<Vec<f64>, EigenError> {
    let (_, eigen) = symmetric_modes(stiffness, mass)?;

    let mut omega_squared: Vec<f64> = eigen.eigenvalues.iter().copied().collect();
    omega_squared.sort_by(f64::total_cmp);

    Ok(omega_squared)
}

/// The `count` lowest modes: squared frequencies, ascending, and the shapes as columns,
/// normalized to unit modal mass
pub(crate) fn modal_basis(
    stiffness: &DMatrix<f64>,
    mass: &DVector<f64>,
    count: usize,
) -> Result<(Vec<f64>, DMatrix<f64>), EigenError> {
    let (inv_sqrt, eigen) = symmetric_modes(stiffness, mass)?;

    let mut order: Vec<usize> = (0..eigen.eigenvalues.len()).collect();
    order.sort_by(|&a, &b| eigen.eigenvalues[a].total_cmp(&eigen.eigenvalues[b]));
    order.truncate(count);

    let omega_squared = order.iter().map(|&i| eigen.eigenvalues[i]).collect();
    let shapes = DMatrix::from_fn(inv_sqrt.len(), order.len(), |row, col| {
        eigen.eigenvectors[(row, order[col])] * inv_sqrt[row]
    });

    Ok((omega_squared, shapes))
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use nalgebra::{DMatrix, DVector, Matrix3};
    use num_complex::Complex64;

    use super::{generalized_eigenvalues, modal_analysis, modal_basis, EigenError};

    #[test]
    fn generalized_matches_known_spectrum() {
        // Similarity transform of diag(5, 10i, -10i)
        let eigenmatrix = Matrix3::from_row_slice(&[5., 0., 0., 0., 0., -10., 0., 10., 0.]);
        let ortho = Matrix3::from_row_slice(&[
            -0.0075541465053381,
            -0.4275523991053181,
            0.9039590039873834,
            0.9987028830428752,
            -0.048745986966488,
            -0.0147098659583176,
            -0.0503536123076048,
            -0.902675342952243,
            -0.4273660479654716,
        ]);
        let a = ortho.transpose() * eigenmatrix * ortho;
        let mass = DVector::from_vec(vec![2.0, 2.0, 2.0]);
        let a = DMatrix::from_fn(3, 3, |i, j| Complex64::from(a[(i, j)] * 2.0));

        let mut eigenvalues = generalized_eigenvalues(&a, &mass).unwrap();
        eigenvalues.sort_by(|l, r| l.im.total_cmp(&r.im));

        assert_relative_eq!(eigenvalues[0].im, -10.0, epsilon = 1e-6);
        assert_relative_eq!(eigenvalues[1].re, 5.0, epsilon = 1e-6);
        assert_relative_eq!(eigenvalues[2].im, 10.0, epsilon = 1e-6);
    }

    #[test]
    fn rejects_singular_mass() {
        let a = DMatrix::from_element(2, 2, Complex64::from(1.0));
        let mass = DVector::from_vec(vec![1.0, 0.0]);

        assert_eq!(
            generalized_eigenvalues(&a, &mass),
            Err(EigenError::SingularMass(1))
        );
    }

    #[test]
    fn two_mass_spring_chain() {
        let stiffness = DMatrix::from_row_slice(2, 2, &[2.0, -1.0, -1.0, 2.0]);
        let mass = DVector::from_vec(vec![1.0, 1.0]);

        let omega_squared = modal_analysis(&stiffness, &mass).unwrap();

        assert_relative_eq!(omega_squared[0], 1.0, epsilon = 1e-12);
        assert_relative_eq!(omega_squared[1], 3.0, epsilon = 1e-12);

        let heavy = DVector::from_vec(vec![4.0, 4.0]);
        let omega_squared = modal_analysis(&stiffness, &heavy).unwrap();
        assert_relative_eq!(omega_squared[0], 0.25, epsilon = 1e-12);
    }

    #[test]
    fn mode_shapes_have_unit_modal_mass() {
        let stiffness = DMatrix::from_row_slice(2, 2, &[2.0, -1.0, -1.0, 2.0]);
        let mass = DVector::from_vec(vec![4.0, 4.0]);

        let (omega_squared, shapes) = modal_basis(&stiffness, &mass, 1).unwrap();

        assert_eq!(omega_squared.len(), 1);
        assert_eq!(shapes.shape(), (2, 1));
        assert_relative_eq!(omega_squared[0], 0.25, epsilon = 1e-12);

        let shape = shapes.column(0);
        let modal_mass: f64 = shape.iter().zip(mass.iter()).map(|(x, m)| m * x * x).sum();
        assert_relative_eq!(modal_mass, 1.0, epsilon = 1e-12);
        assert_relative_eq!((&stiffness * shape)[0], 0.25 * 4.0 * shape[0], epsilon = 1e-12);
    }
}
