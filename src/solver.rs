//! Flutter solvers and the interface they share

use thiserror::Error;

use crate::bracket::InvalidBracket;
use crate::control::{AnalysisControl, Cancelled};
use crate::dynamic_interface::Method;
use crate::linalg::EigenError;
use crate::model::{FlowState, FlutterPoint, InputError, PanelSpecification, VelocityRange};

use self::high_fidelity::HighFidelityError;

/// Errors that abort a single solver run
#[derive(Error, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum SolverError {
    /// Inputs were rejected before the solver started
    #[error("invalid input")]
    InvalidInput(#[from] InputError),
    /// The caller cancelled the run
    #[error("analysis was cancelled")]
    Cancelled,
    /// Dense eigenvalue solve failed
    #[error("eigenvalue problem failed")]
    Eigen(#[from] EigenError),
    /// Frequency iteration exceeded its budget.
    ///
    /// The parameter is the number of iterations performed.
    #[error("frequency iteration did not converge after {0} iterations")]
    NonConvergence(usize),
    /// The method is not valid at this Mach number
    #[error("method is not applicable at Mach {0:.3}")]
    RegimeNotApplicable(f64),
    /// Every influence grid point was dropped, or a grid axis is empty
    #[error("no aerodynamic data in the influence grid")]
    NoAerodynamicData,
    /// The structural model has no elastic mode to track
    #[error("no elastic modes to track")]
    NoElasticModes,
    /// Root refinement was started on a bracket without a sign change
    #[error("critical speed refinement failed")]
    Bracket(#[from] InvalidBracket),
    /// External solver failed and no fallback was attempted
    #[error("high-fidelity solver failed")]
    HighFidelity(#[from] HighFidelityError),
}

impl From<Cancelled> for SolverError {
    fn from(_: Cancelled) -> Self {
        SolverError::Cancelled
    }
}

/// Result of one solver run
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Analysis {
    /// Unstable points, ascending in velocity. Empty means no flutter in the velocity range.
    pub points: Vec<FlutterPoint>,
    /// An analytic fallback stood in for the requested method
    pub degraded: bool,
}

impl From<Vec<FlutterPoint>> for Analysis {
    fn from(points: Vec<FlutterPoint>) -> Self {
        Analysis {
            points,
            degraded: false,
        }
    }
}

/// Common interface of every flutter method
pub trait FlutterSolver {
    /// Method tag carried by the produced points
    fn method(&self) -> Method;

    /// Sweep `num_points` velocities over `range` and collect unstable points
    fn run(
        &self,
        panel: &PanelSpecification,
        flow: &FlowState,
        range: VelocityRange,
        num_points: usize,
        control: &AnalysisControl,
    ) -> Result<Analysis, SolverError>;
}

pub(crate) fn dynamic_pressure(density: f64, velocity: f64) -> f64 {
    0.5 * density * velocity * velocity
}

/// Doublet-lattice aerodynamics with K-method flutter iteration
pub mod doublet;
/// Interface to an external high-fidelity solver
pub mod high_fidelity;
/// Closed-form piston theory
pub mod piston;
