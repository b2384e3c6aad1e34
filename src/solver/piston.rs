use std::f64::consts::PI;

use tracing::info;

use crate::control::AnalysisControl;
use crate::dynamic_interface::Method;
use crate::model::boundary::BoundaryCondition;
use crate::model::{validate_sweep, FlowState, FlutterPoint, PanelSpecification, VelocityRange};

use super::{dynamic_pressure, Analysis, FlutterSolver, SolverError};

/// Lower clamp on the predicted flutter speed \[m/s\]
pub const MIN_FLUTTER_SPEED: f64 = 50.0;
/// Upper clamp on the predicted flutter speed \[m/s\]
pub const MAX_FLUTTER_SPEED: f64 = 1000.0;

// Piston theory overestimates the aerodynamic stiffness below Mach 1
const SUBSONIC_FACTOR: f64 = 0.7;
const MIN_COMPRESSIBILITY: f64 = 1e-3;
const THICKNESS_CORRECTION: f64 = 2.5;
const FREQUENCY_COUPLING: f64 = 0.5;
const CLAMPED_FREQUENCY_RATIO: f64 = 1.5;
const CANTILEVER_COEFFICIENT: f64 = 0.56;

/// Damping reported for every piston-theory point. The closed form locates the stability
/// boundary but does not compute a damping ratio.
pub const DAMPING_SENTINEL: f64 = -0.1;

/// Closed-form flutter estimate for high-speed flow over a plate
#[derive(Debug, Clone, Copy, Default)]
pub struct PistonTheorySolver;

impl PistonTheorySolver {
    /// Fundamental angular frequency of the plate in vacuum \[rad/s\]
    pub fn fundamental_frequency(panel: &PanelSpecification) -> f64 {
        let a = panel.length;
        let b = panel.width;
        let stiffness = (panel.flexural_rigidity() / panel.areal_density()).sqrt();
        let simply_supported = PI * PI * stiffness * (1.0 / (a * a) + 1.0 / (b * b));

        match panel.boundary {
            BoundaryCondition::Ssss => simply_supported,
            BoundaryCondition::Cccc => CLAMPED_FREQUENCY_RATIO * simply_supported,
            BoundaryCondition::Cfff => CANTILEVER_COEFFICIENT * PI * PI * stiffness / (a * a),
            other => other.frequency_factor(1, 1) * simply_supported,
        }
    }

    /// Compressibility factor `sqrt(|M^2 - 1|)`, reduced below Mach 1 and kept away from zero
    pub fn compressibility(mach: f64) -> f64 {
        let beta = (mach * mach - 1.0).abs().sqrt();
        let beta = if mach < 1.0 {
            beta * SUBSONIC_FACTOR
        } else {
            beta
        };
        beta.max(MIN_COMPRESSIBILITY)
    }

    /// Critical flutter point. Never fails; inputs are expected to be validated.
    pub fn solve(&self, panel: &PanelSpecification, flow: &FlowState) -> FlutterPoint {
        let air = flow.atmosphere();
        let a = panel.length;
        let d = panel.flexural_rigidity();

        let omega = Self::fundamental_frequency(panel);
        let mass_ratio = air.density * a / (PI * panel.density * panel.thickness);
        let beta = Self::compressibility(flow.mach);

        let critical_pressure = panel.boundary.critical_coefficient() * d / (a.powi(3) * beta);
        let velocity = ((2.0 * critical_pressure / air.density).sqrt()
            * (1.0 + THICKNESS_CORRECTION * panel.thickness / a))
            .clamp(MIN_FLUTTER_SPEED, MAX_FLUTTER_SPEED);

        FlutterPoint {
            velocity,
            frequency: omega / (2.0 * PI) * (1.0 + FREQUENCY_COUPLING * mass_ratio * beta),
            damping: DAMPING_SENTINEL,
            mode: 1,
            mach: flow.mach,
            dynamic_pressure: dynamic_pressure(air.density, velocity),
            method: Method::PistonTheory,
            degraded: false,
        }
    }

    /// Same as [PistonTheorySolver::solve]
    pub fn find_critical_speed(
        &self,
        panel: &PanelSpecification,
        flow: &FlowState,
    ) -> FlutterPoint {
        self.solve(panel, flow)
    }

    /// The critical point if it falls inside `range`, otherwise nothing
    pub fn analyze_flutter(
        &self,
        panel: &PanelSpecification,
        flow: &FlowState,
        range: VelocityRange,
        num_points: usize,
    ) -> Result<Vec<FlutterPoint>, SolverError> {
        validate_sweep(panel, flow, &range, num_points)?;

        let point = self.solve(panel, flow);
        info!(
            velocity = point.velocity,
            frequency = point.frequency,
            "piston theory critical point"
        );

        if range.contains(point.velocity) {
            Ok(vec![point])
        } else {
            Ok(Vec::new())
        }
    }
}

impl FlutterSolver for PistonTheorySolver {
    fn method(&self) -> Method {
        Method::PistonTheory
    }

    fn run(
        &self,
        panel: &PanelSpecification,
        flow: &FlowState,
        range: VelocityRange,
        num_points: usize,
        control: &AnalysisControl,
    ) -> Result<Analysis, SolverError> {
        control.checkpoint()?;
        let points = self.analyze_flutter(panel, flow, range, num_points)?;
        control.report("piston theory", 100.0);
        Ok(points.into())
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use itertools::iproduct;

    use super::*;

    fn scenario() -> (PanelSpecification, FlowState) {
        (
            PanelSpecification::default(),
            FlowState {
                mach: 0.8,
                altitude: 8000.0,
            },
        )
    }

    #[test]
    fn reference_scenario() {
        let (panel, flow) = scenario();

        let point = PistonTheorySolver.find_critical_speed(&panel, &flow);

        assert!((MIN_FLUTTER_SPEED..=MAX_FLUTTER_SPEED).contains(&point.velocity));
        assert!(point.frequency > 0.0);
        assert_relative_eq!(point.velocity, 208.9, max_relative = 0.01);
        assert_relative_eq!(point.frequency, 73.55, max_relative = 0.01);
        assert_eq!(point.damping, DAMPING_SENTINEL);
        assert_eq!(point.method, Method::PistonTheory);
    }

    #[test]
    fn bounded_for_all_conditions() {
        let machs = [0.0, 0.3, 0.9, 1.0, 1.2, 2.5, 5.0];
        let altitudes = [0.0, 5000.0, 11000.0, 20000.0];
        let thicknesses = [0.0005, 0.002, 0.02];

        for (mach, altitude, thickness, boundary) in
            iproduct!(machs, altitudes, thicknesses, BoundaryCondition::ALL)
        {
            let panel = PanelSpecification {
                thickness,
                boundary,
                ..Default::default()
            };
            let point = PistonTheorySolver.solve(&panel, &FlowState { mach, altitude });

            assert!((50.0..=1000.0).contains(&point.velocity), "{point:?}");
            assert!(point.frequency > 0.0 && point.frequency.is_finite(), "{point:?}");
        }
    }

    #[test]
    fn clamped_panels_flutter_later() {
        let (panel, flow) = scenario();
        let speed = |boundary| {
            PistonTheorySolver
                .solve(
                    &PanelSpecification {
                        thickness: 0.001,
                        boundary,
                        ..panel
                    },
                    &flow,
                )
                .velocity
        };

        assert!(speed(BoundaryCondition::Cccc) > speed(BoundaryCondition::Ssss));
        assert!(speed(BoundaryCondition::Ssss) > speed(BoundaryCondition::Cfff));
    }

    #[test]
    fn out_of_range_is_empty() {
        let (panel, flow) = scenario();

        let inside = PistonTheorySolver
            .analyze_flutter(&panel, &flow, VelocityRange::new(100.0, 300.0).unwrap(), 10)
            .unwrap();
        let outside = PistonTheorySolver
            .analyze_flutter(&panel, &flow, VelocityRange::new(300.0, 600.0).unwrap(), 10)
            .unwrap();

        assert_eq!(inside.len(), 1);
        assert!(outside.is_empty());
    }

    #[test]
    fn invalid_input_fails_fast() {
        let (panel, flow) = scenario();
        let bad = PanelSpecification {
            youngs_modulus: -1.0,
            ..panel
        };

        let result = PistonTheorySolver.analyze_flutter(&bad, &flow, VelocityRange::default(), 10);

        assert!(matches!(result, Err(SolverError::InvalidInput(_))));
    }
}
