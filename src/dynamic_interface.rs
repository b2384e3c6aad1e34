//! Method tags and runtime selection of a flutter solver

use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::control::AnalysisControl;
use crate::model::{FlowState, PanelSpecification, VelocityRange};
use crate::solver::doublet::{DlmParameters, DoubletLatticeSolver};
use crate::solver::high_fidelity::{ExecutionLimits, HighFidelityAdapter, HighFidelitySolver};
use crate::solver::piston::PistonTheorySolver;
use crate::solver::{Analysis, FlutterSolver, SolverError};

/// Supported flutter methods
#[derive(
    clap::ValueEnum,
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Method {
    /// Closed-form piston theory
    PistonTheory,
    /// Doublet-lattice aerodynamics with K-method iteration
    DoubletLattice,
    /// External high-fidelity solver
    HighFidelity,
}

impl Method {
    /// Every method, in scoring order
    pub const ALL: [Method; 3] = [
        Method::PistonTheory,
        Method::DoubletLattice,
        Method::HighFidelity,
    ];

    /// Name used in reports
    pub fn label(self) -> &'static str {
        match self {
            Method::PistonTheory => "Piston Theory",
            Method::DoubletLattice => "Doublet Lattice",
            Method::HighFidelity => "High Fidelity",
        }
    }
}

impl Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Settings shared by every solver a run may construct
#[derive(Clone, Copy)]
pub struct SolverContext<'a> {
    /// External solver behind [Method::HighFidelity]
    pub high_fidelity: &'a dyn HighFidelitySolver,
    /// Limits handed to the external solver
    pub limits: &'a ExecutionLimits,
    /// Fixed doublet-lattice settings. Tuned from panel and flow when absent.
    pub dlm: Option<&'a DlmParameters>,
}

/// Type erased solver for a method chosen at runtime
pub struct ErasedSolver<'a> {
    inner: Box<dyn FlutterSolver + 'a>,
}

impl<'a> ErasedSolver<'a> {
    /// Construct the solver for `method`
    pub fn new(
        method: Method,
        panel: &PanelSpecification,
        flow: &FlowState,
        context: SolverContext<'a>,
    ) -> Self {
        let inner: Box<dyn FlutterSolver + 'a> = match method {
            Method::PistonTheory => Box::new(PistonTheorySolver),
            Method::DoubletLattice => Box::new(match context.dlm {
                Some(params) => DoubletLatticeSolver::new(params.clone()),
                None => DoubletLatticeSolver::tuned_for(panel, flow),
            }),
            Method::HighFidelity => Box::new(HighFidelityAdapter::new(
                context.high_fidelity,
                context.limits.clone(),
            )),
        };

        Self { inner }
    }

    /// Method behind this solver
    pub fn method(&self) -> Method {
        self.inner.method()
    }

    /// See [FlutterSolver::run]
    pub fn run(
        &self,
        panel: &PanelSpecification,
        flow: &FlowState,
        range: VelocityRange,
        num_points: usize,
        control: &AnalysisControl,
    ) -> Result<Analysis, SolverError> {
        self.inner.run(panel, flow, range, num_points, control)
    }
}
