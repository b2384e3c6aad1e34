use std::f64::consts::PI;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::control::AnalysisControl;
use crate::dynamic_interface::Method;
use crate::helpers::linspace;
use crate::model::{validate_sweep, FlowState, FlutterPoint, PanelSpecification, VelocityRange};

use super::piston::PistonTheorySolver;
use super::{dynamic_pressure, Analysis, FlutterSolver, SolverError};

/// Reasons an external solve produced no result
#[derive(Error, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum HighFidelityError {
    /// Solver is not installed or not configured
    #[error("high-fidelity solver unavailable: {0}")]
    Unavailable(String),
    /// Solver process failed or produced unreadable output
    #[error("high-fidelity solver failed: {0}")]
    Process(String),
    /// Solver exceeded its CPU time limit, in seconds
    #[error("high-fidelity solver timed out after {0} s")]
    Timeout(u64),
}

/// Flutter solution scheme requested from the external solver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlutterScheme {
    /// P-K method, preferred for supersonic flow
    #[serde(rename = "PK")]
    Pk,
    /// K method
    #[serde(rename = "K")]
    K,
    /// K method with reduced output
    #[serde(rename = "KE")]
    Ke,
}

/// Caller-level resource limits, kept as given
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionLimits {
    /// Memory allocation in the solver's own notation, e.g. `4gb`
    pub memory: String,
    /// CPU time limit in seconds
    pub cpu_time: u64,
}

impl Default for ExecutionLimits {
    fn default() -> Self {
        Self {
            memory: "4gb".to_owned(),
            cpu_time: 1800,
        }
    }
}

/// Everything an external solver needs beyond panel and flow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HighFidelityRequest {
    /// Flutter solution scheme
    pub scheme: FlutterScheme,
    /// Number of structural modes to retain
    pub mode_count: usize,
    /// Frequency band of interest \[Hz\]
    pub frequency_range: (f64, f64),
    /// Mach numbers handed to the aerodynamic model
    pub mach_sweep: Vec<f64>,
    /// Air density ratios relative to the flight altitude
    pub density_ratios: Vec<f64>,
    /// Velocities to evaluate \[m/s\]
    pub velocities: Vec<f64>,
    /// Limits on the external run
    pub limits: ExecutionLimits,
}

impl HighFidelityRequest {
    /// Physics parameters derived from panel and flow, merged with the caller's limits
    pub fn derive(
        panel: &PanelSpecification,
        flow: &FlowState,
        range: VelocityRange,
        num_points: usize,
        limits: ExecutionLimits,
    ) -> Self {
        let mach = flow.mach;

        let scheme = if mach > 1.1 {
            FlutterScheme::Pk
        } else if mach > 0.7 {
            FlutterScheme::K
        } else {
            FlutterScheme::Ke
        };

        let mode_count = match panel.area() {
            area if area > 1.0 => 30,
            area if area > 0.1 => 20,
            _ => 15,
        };

        let first_frequency = PI * PI / (2.0 * panel.length.powi(2))
            * (panel.flexural_rigidity() / panel.areal_density()).sqrt()
            / (2.0 * PI);

        Self {
            scheme,
            mode_count,
            frequency_range: (
                (0.1 * first_frequency).max(0.1),
                (10.0 * first_frequency).min(2000.0),
            ),
            mach_sweep: vec![
                (mach - 0.3).max(0.1),
                (mach - 0.1).max(0.0),
                mach,
                mach + 0.1,
                (mach + 0.3).min(2.0),
            ],
            density_ratios: vec![1.0],
            velocities: linspace(range.min, range.max, num_points).collect(),
            limits,
        }
    }
}

/// Raw result row from an external solver
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HighFidelityPoint {
    /// \[m/s\]
    pub velocity: f64,
    /// \[Hz\]
    pub frequency: f64,
    /// Damping ratio, negative when unstable
    pub damping: f64,
    /// Mach number of the reported root
    pub mach: f64,
    /// One-based mode index
    pub mode: usize,
}

/// External high-fidelity flutter solver. Implementations own process management and file
/// formats; the engine only sees requests and result rows.
pub trait HighFidelitySolver: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &str;

    /// Run one analysis
    fn solve(
        &self,
        panel: &PanelSpecification,
        flow: &FlowState,
        request: &HighFidelityRequest,
    ) -> Result<Vec<HighFidelityPoint>, HighFidelityError>;
}

/// Stand-in used when no external solver is configured
#[derive(Debug, Clone, Copy, Default)]
pub struct Unavailable;

impl HighFidelitySolver for Unavailable {
    fn name(&self) -> &str {
        "unavailable"
    }

    fn solve(
        &self,
        _panel: &PanelSpecification,
        _flow: &FlowState,
        _request: &HighFidelityRequest,
    ) -> Result<Vec<HighFidelityPoint>, HighFidelityError> {
        Err(HighFidelityError::Unavailable(
            "no high-fidelity solver configured".to_owned(),
        ))
    }
}

/// Runs an external solver, falling back to piston theory when it fails
pub struct HighFidelityAdapter<'a> {
    backend: &'a dyn HighFidelitySolver,
    limits: ExecutionLimits,
}

impl<'a> HighFidelityAdapter<'a> {
    /// Adapter running `backend` under `limits`
    pub fn new(backend: &'a dyn HighFidelitySolver, limits: ExecutionLimits) -> Self {
        Self { backend, limits }
    }
}

impl FlutterSolver for HighFidelityAdapter<'_> {
    fn method(&self) -> Method {
        Method::HighFidelity
    }

    fn run(
        &self,
        panel: &PanelSpecification,
        flow: &FlowState,
        range: VelocityRange,
        num_points: usize,
        control: &AnalysisControl,
    ) -> Result<Analysis, SolverError> {
        validate_sweep(panel, flow, &range, num_points)?;
        control.checkpoint()?;

        let request =
            HighFidelityRequest::derive(panel, flow, range, num_points, self.limits.clone());
        let density = flow.atmosphere().density;

        match self.backend.solve(panel, flow, &request) {
            Ok(rows) => {
                let mut points: Vec<FlutterPoint> = rows
                    .into_iter()
                    .map(|row| FlutterPoint {
                        velocity: row.velocity,
                        frequency: row.frequency,
                        damping: row.damping,
                        mode: row.mode,
                        mach: row.mach,
                        dynamic_pressure: dynamic_pressure(density, row.velocity),
                        method: Method::HighFidelity,
                        degraded: false,
                    })
                    .collect();
                points.sort_by(|a, b| a.velocity.total_cmp(&b.velocity));

                info!(
                    backend = self.backend.name(),
                    count = points.len(),
                    "high-fidelity solve finished"
                );
                control.report("high-fidelity solve", 100.0);

                Ok(points.into())
            }
            Err(err) => {
                warn!(backend = self.backend.name(), %err, "falling back to piston theory");

                let points = PistonTheorySolver
                    .analyze_flutter(panel, flow, range, num_points)?
                    .into_iter()
                    .map(|point| FlutterPoint {
                        method: Method::HighFidelity,
                        degraded: true,
                        ..point
                    })
                    .collect();
                control.report("high-fidelity fallback", 100.0);

                Ok(Analysis {
                    points,
                    degraded: true,
                })
            }
        }
    }
}
