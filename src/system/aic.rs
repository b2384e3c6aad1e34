use std::f64::consts::PI;

use nalgebra::DMatrix;
use num_complex::Complex64;
use tracing::warn;

use crate::helpers::nearest_index;

use super::mesh::AerodynamicPanelMesh;

/// Highest Mach number the doublet kernel is evaluated at
pub const TRANSONIC_LIMIT: f64 = 0.98;

const SELF_INFLUENCE: f64 = -0.5;
const MIN_COMPRESSIBILITY: f64 = 0.1;
const MIN_SEPARATION: f64 = 1e-10;

/// Complex influence matrices on a Mach by reduced-frequency grid. Entry `(i, j)` is the
/// pressure coefficient at box `i` due to unit downwash on box `j`.
#[derive(Debug, Clone)]
pub struct AicMatrixSet {
    machs: Vec<f64>,
    reduced_frequencies: Vec<f64>,
    // Mach major
    matrices: Vec<DMatrix<Complex64>>,
}

impl AicMatrixSet {
    /// Evaluate the kernel at every grid point. Mach numbers at or above [TRANSONIC_LIMIT] are
    /// left out of the grid.
    pub fn build(mesh: &AerodynamicPanelMesh, machs: &[f64], reduced_frequencies: &[f64]) -> Self {
        let machs: Vec<f64> = machs
            .iter()
            .copied()
            .filter(|&mach| {
                let usable = mach < TRANSONIC_LIMIT;
                if !usable {
                    warn!(mach, "doublet lattice kernel is not valid near Mach 1, skipping");
                }
                usable
            })
            .collect();
        let reduced_frequencies = reduced_frequencies.to_vec();

        let matrices = machs
            .iter()
            .flat_map(|&mach| {
                reduced_frequencies
                    .iter()
                    .map(move |&k| influence_matrix(mesh, mach, k))
            })
            .collect();

        Self {
            machs,
            reduced_frequencies,
            matrices,
        }
    }

    /// Mach numbers in the grid
    pub fn machs(&self) -> &[f64] {
        &self.machs
    }

    /// Reduced frequencies in the grid
    pub fn reduced_frequencies(&self) -> &[f64] {
        &self.reduced_frequencies
    }

    /// Matrix at grid indices `(mach, k)`
    pub fn get(&self, mach: usize, k: usize) -> Option<&DMatrix<Complex64>> {
        if k >= self.reduced_frequencies.len() {
            return None;
        }
        self.matrices.get(mach * self.reduced_frequencies.len() + k)
    }

    /// Grid point nearest to `(mach, k)`, without interpolation
    pub fn nearest(&self, mach: f64, k: f64) -> Option<GridPoint<'_>> {
        let i = nearest_index(&self.machs, mach)?;
        let j = nearest_index(&self.reduced_frequencies, k)?;

        Some(GridPoint {
            mach: self.machs[i],
            reduced_frequency: self.reduced_frequencies[j],
            matrix: self.get(i, j)?,
        })
    }

    /// No grid point survived the transonic filter, or one of the axes is empty
    pub fn is_empty(&self) -> bool {
        self.matrices.is_empty()
    }
}

/// Influence matrix together with the grid coordinates it was evaluated at
#[derive(Debug, Clone, Copy)]
pub struct GridPoint<'a> {
    /// Grid Mach number
    pub mach: f64,
    /// Grid reduced frequency
    pub reduced_frequency: f64,
    /// Influence coefficients at this point
    pub matrix: &'a DMatrix<Complex64>,
}

fn influence_matrix(mesh: &AerodynamicPanelMesh, mach: f64, k: f64) -> DMatrix<Complex64> {
    let beta = (1.0 - mach * mach).abs().sqrt().max(MIN_COMPRESSIBILITY);
    let semi_chord = 0.5 * mesh.length;
    let n = mesh.boxes.len();

    DMatrix::from_fn(n, n, |i, j| {
        if i == j {
            return Complex64::from(SELF_INFLUENCE);
        }

        let receiver = &mesh.boxes[i];
        let sender = &mesh.boxes[j];

        // Prandtl-Glauert stretched separation
        let xi = (receiver.x - sender.x) / beta;
        let eta = receiver.y - sender.y;
        let r = xi.hypot(eta).max(MIN_SEPARATION);

        let steady = -sender.area / (4.0 * PI * beta) * (1.0 + xi / r) / (r * r);

        if k > 0.0 {
            let xi_bar = xi / semi_chord;
            let phase = Complex64::new(0.0, k * mach * xi_bar).exp();
            steady * phase * Complex64::new(1.0, k * xi_bar)
        } else {
            Complex64::from(steady)
        }
    })
}
