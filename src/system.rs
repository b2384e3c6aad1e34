//! Discretized aeroelastic systems, interface and implementations
use nalgebra::{DMatrix, DVector};
use num_complex::Complex64;

use crate::linalg::modal_basis;
use crate::model::PanelSpecification;
use crate::solver::doublet::DlmParameters;
use crate::solver::SolverError;

use self::aic::AicMatrixSet;
use self::mesh::AerodynamicPanelMesh;
use self::structure::StructuralModel;

/// Structural matrices plus a frequency dependent aerodynamic operator on the same degrees of
/// freedom. The flutter matrix is `K + i omega^2 q / (c b) Q(M, k)`.
pub(crate) trait AeroelasticSystem {
    /// Lumped mass per degree of freedom
    fn mass(&self) -> &DVector<f64>;

    fn stiffness(&self) -> &DMatrix<f64>;

    /// Chord `c`, also used to form the reduced frequency `k = omega c / 2V`
    fn reference_chord(&self) -> f64;

    /// Span `b`
    fn reference_span(&self) -> f64;

    /// Aerodynamic matrix `Q` at the grid point nearest to `(mach, k)`. `None` when no
    /// aerodynamic data exists.
    fn aerodynamics(&self, mach: f64, reduced_frequency: f64) -> Option<DMatrix<Complex64>>;
}

/// Plate bending model coupled to doublet-lattice aerodynamics, reduced to its lowest vacuum
/// modes
#[derive(Debug, Clone)]
pub struct PanelSystem {
    /// Aerodynamic boxes
    pub mesh: AerodynamicPanelMesh,
    /// Influence matrices on the aerodynamic boxes
    pub aic: AicMatrixSet,
    /// Plate bending model on the box corner nodes
    pub structure: StructuralModel,
    // Unit modal masses and diag(omega^2) of the retained modes
    modal_mass: DVector<f64>,
    modal_stiffness: DMatrix<f64>,
    // Box displacement and chordwise slope per retained mode, boxes x modes
    box_modes: DMatrix<f64>,
    box_slopes: DMatrix<f64>,
    // Lowest vacuum frequency, normalizes the aerodynamic matrix
    reference_frequency: f64,
}

impl PanelSystem {
    /// Build mesh, influence matrices, structural matrices and the modal basis for one
    /// analysis
    pub fn new(panel: &PanelSpecification, params: &DlmParameters) -> Result<Self, SolverError> {
        let mesh = AerodynamicPanelMesh::new(
            panel.length,
            panel.width,
            params.panels_chordwise,
            params.panels_spanwise,
        );
        let aic = AicMatrixSet::build(&mesh, &params.mach_numbers, &params.reduced_frequencies);
        if aic.is_empty() {
            return Err(SolverError::NoAerodynamicData);
        }

        let structure = StructuralModel::new(panel, &mesh);
        let (omega_squared, shapes) =
            modal_basis(&structure.stiffness, &structure.mass, params.basis_modes)?;
        let reference_frequency = match omega_squared.first() {
            Some(&fundamental) if fundamental > 0.0 => fundamental.sqrt(),
            _ => return Err(SolverError::NoElasticModes),
        };

        let box_modes = mesh.corner_transfer() * &shapes;
        let box_slopes = mesh.chordwise_slope() * &shapes;

        Ok(Self {
            modal_mass: DVector::from_element(omega_squared.len(), 1.0),
            modal_stiffness: DMatrix::from_diagonal(&DVector::from_vec(omega_squared)),
            mesh,
            aic,
            structure,
            box_modes,
            box_slopes,
            reference_frequency,
        })
    }

    /// Lowest vacuum angular frequency of the discretized plate \[rad/s\]
    pub fn fundamental_frequency(&self) -> f64 {
        self.reference_frequency
    }

    /// Generalized aerodynamic force `Phi^T G^T diag(A) AIC w` per unit dynamic pressure, where
    /// the downwash `w = dz/dx - i (k / b) z` is evaluated on the box centers for every
    /// retained mode
    fn generalized_forces(&self, mach: f64, reduced_frequency: f64) -> Option<DMatrix<Complex64>> {
        let point = self.aic.nearest(mach, reduced_frequency)?;
        let unsteady = point.reduced_frequency / (0.5 * self.mesh.length);

        let (boxes, modes) = self.box_modes.shape();

        let downwash = DMatrix::from_fn(boxes, modes, |r, c| {
            Complex64::new(self.box_slopes[(r, c)], -unsteady * self.box_modes[(r, c)])
        });

        let mut pressure = point.matrix * downwash;
        for (i, mut row) in pressure.row_iter_mut().enumerate() {
            row *= Complex64::from(self.mesh.boxes[i].area);
        }

        Some(self.box_modes.transpose().map(Complex64::from) * pressure)
    }
}

impl AeroelasticSystem for PanelSystem {
    fn mass(&self) -> &DVector<f64> {
        &self.modal_mass
    }

    fn stiffness(&self) -> &DMatrix<f64> {
        &self.modal_stiffness
    }

    fn reference_chord(&self) -> f64 {
        self.mesh.length
    }

    fn reference_span(&self) -> f64 {
        self.mesh.width
    }

    /// `i c b / omega_1^2` times the generalized forces, so that near the fundamental the
    /// flutter term reduces to the aerodynamic stiffness `-q Q_f`
    fn aerodynamics(&self, mach: f64, reduced_frequency: f64) -> Option<DMatrix<Complex64>> {
        let forces = self.generalized_forces(mach, reduced_frequency)?;
        let area = self.reference_chord() * self.reference_span();
        let scale = area / self.reference_frequency.powi(2);

        Some(forces * Complex64::new(0.0, scale))
    }
}

/// Aerodynamic influence coefficients on a Mach and reduced-frequency grid
pub mod aic;
/// Rectangular aerodynamic box layout
pub mod mesh;
/// Lumped mass and stencil stiffness of the plate
pub mod structure;
