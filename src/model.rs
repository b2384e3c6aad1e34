//! Panel, flow and result types shared by every solver

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::dynamic_interface::Method;

use self::atmosphere::{AtmosphereModel, AtmosphereProperties};
use self::boundary::{BoundaryCondition, BoundaryConditionProfile};

/// Inputs that were rejected before any solver ran
#[derive(Error, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum InputError {
    /// A dimension or material property must be strictly positive and finite.
    ///
    /// The first parameter is the name of the quantity, the second its value.
    #[error("`{0}` must be positive and finite, got {1}")]
    NotPositive(&'static str, f64),
    /// Poisson's ratio outside of `[0, 0.5)`
    #[error("Poisson's ratio must lie in [0, 0.5), got {0}")]
    PoissonRatio(f64),
    /// Mach number is negative or not finite
    #[error("Mach number must be finite and non-negative, got {0}")]
    Mach(f64),
    /// Altitude is not finite
    #[error("altitude must be finite, got {0}")]
    Altitude(f64),
    /// Velocity range is empty, reversed or non-positive
    #[error("invalid velocity range [{0}, {1}]")]
    VelocityRange(f64, f64),
    /// Sweeps need at least two samples
    #[error("at least 2 velocity samples are required, got {0}")]
    TooFewPoints(usize),
}

fn positive(name: &'static str, value: f64) -> Result<(), InputError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(InputError::NotPositive(name, value))
    }
}

/// Rectangular panel geometry, material and edge support. All quantities in SI units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PanelSpecification {
    /// Chordwise length, aligned with the flow \[m\]
    pub length: f64,
    /// Spanwise width \[m\]
    pub width: f64,
    /// Thickness \[m\]
    pub thickness: f64,
    /// Young's modulus \[Pa\]
    pub youngs_modulus: f64,
    /// Poisson's ratio
    pub poisson_ratio: f64,
    /// Material density \[kg/m^3\]
    pub density: f64,
    /// Edge support code
    #[serde(default)]
    pub boundary: BoundaryCondition,
}

impl Default for PanelSpecification {
    /// 0.5 m x 0.3 m x 2 mm aluminium panel, all edges simply supported
    fn default() -> Self {
        Self {
            length: 0.5,
            width: 0.3,
            thickness: 0.002,
            youngs_modulus: 71.7e9,
            poisson_ratio: 0.33,
            density: 2810.0,
            boundary: BoundaryCondition::Ssss,
        }
    }
}

impl PanelSpecification {
    /// Construct a panel, rejecting non-physical values
    pub fn new(
        length: f64,
        width: f64,
        thickness: f64,
        youngs_modulus: f64,
        poisson_ratio: f64,
        density: f64,
        boundary: BoundaryCondition,
    ) -> Result<Self, InputError> {
        let panel = Self {
            length,
            width,
            thickness,
            youngs_modulus,
            poisson_ratio,
            density,
            boundary,
        };
        panel.validate()?;
        Ok(panel)
    }

    /// Check geometry and material against physical limits
    pub fn validate(&self) -> Result<(), InputError> {
        positive("length", self.length)?;
        positive("width", self.width)?;
        positive("thickness", self.thickness)?;
        positive("youngs_modulus", self.youngs_modulus)?;
        positive("density", self.density)?;

        if !(0.0..0.5).contains(&self.poisson_ratio) {
            return Err(InputError::PoissonRatio(self.poisson_ratio));
        }

        Ok(())
    }

    /// Plate flexural rigidity `E h^3 / (12 (1 - nu^2))`
    pub fn flexural_rigidity(&self) -> f64 {
        self.youngs_modulus * self.thickness.powi(3) / (12.0 * (1.0 - self.poisson_ratio.powi(2)))
    }

    /// Mass per unit area
    pub fn areal_density(&self) -> f64 {
        self.density * self.thickness
    }

    /// Length over width
    pub fn aspect_ratio(&self) -> f64 {
        self.length / self.width
    }

    /// Thickness over length
    pub fn thickness_ratio(&self) -> f64 {
        self.thickness / self.length
    }

    /// Planform area \[m²\]
    pub fn area(&self) -> f64 {
        self.length * self.width
    }

    /// Resolved edge constraints and stiffness multipliers
    pub fn profile(&self) -> BoundaryConditionProfile {
        self.boundary.profile()
    }
}

/// Free-stream flight condition
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FlowState {
    /// Free-stream Mach number
    pub mach: f64,
    /// Geometric altitude \[m\]
    pub altitude: f64,
}

impl FlowState {
    /// Construct a flow state, rejecting non-physical values
    pub fn new(mach: f64, altitude: f64) -> Result<Self, InputError> {
        let flow = Self { mach, altitude };
        flow.validate()?;
        Ok(flow)
    }

    /// Reject a negative or non-finite Mach number and a non-finite altitude
    pub fn validate(&self) -> Result<(), InputError> {
        if !self.mach.is_finite() || self.mach < 0.0 {
            return Err(InputError::Mach(self.mach));
        }
        if !self.altitude.is_finite() {
            return Err(InputError::Altitude(self.altitude));
        }
        Ok(())
    }

    /// Air properties at this altitude
    pub fn atmosphere(&self) -> AtmosphereProperties {
        AtmosphereModel::properties(self.altitude)
    }

    /// Free-stream velocity implied by the Mach number
    pub fn velocity(&self) -> f64 {
        self.mach * self.atmosphere().sound_speed
    }
}

/// Velocity sweep bounds \[m/s\]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VelocityRange {
    /// Lowest velocity \[m/s\]
    pub min: f64,
    /// Highest velocity \[m/s\]
    pub max: f64,
}

impl VelocityRange {
    /// Construct a range, rejecting empty or non-positive bounds
    pub fn new(min: f64, max: f64) -> Result<Self, InputError> {
        let range = Self { min, max };
        range.validate()?;
        Ok(range)
    }

    /// Require finite bounds with 0 < min < max
    pub fn validate(&self) -> Result<(), InputError> {
        if self.min.is_finite() && self.max.is_finite() && 0.0 < self.min && self.min < self.max {
            Ok(())
        } else {
            Err(InputError::VelocityRange(self.min, self.max))
        }
    }

    /// Whether `velocity` lies inside the closed range
    pub fn contains(&self, velocity: f64) -> bool {
        (self.min..=self.max).contains(&velocity)
    }
}

impl Default for VelocityRange {
    fn default() -> Self {
        Self {
            min: 50.0,
            max: 1000.0,
        }
    }
}

/// Validate everything a velocity sweep needs before it starts
pub fn validate_sweep(
    panel: &PanelSpecification,
    flow: &FlowState,
    range: &VelocityRange,
    num_points: usize,
) -> Result<(), InputError> {
    panel.validate()?;
    flow.validate()?;
    range.validate()?;
    if num_points < 2 {
        return Err(InputError::TooFewPoints(num_points));
    }
    Ok(())
}

/// A single point on a flutter boundary
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FlutterPoint {
    /// Flight velocity \[m/s\]
    pub velocity: f64,
    /// Oscillation frequency \[Hz\]
    pub frequency: f64,
    /// Damping ratio, negative is unstable
    pub damping: f64,
    /// One-based mode index
    pub mode: usize,
    /// Free-stream Mach number
    pub mach: f64,
    /// Dynamic pressure \[Pa\]
    pub dynamic_pressure: f64,
    /// Method that produced this point
    pub method: Method,
    /// Produced by an analytic fallback instead of the requested method
    #[serde(default)]
    pub degraded: bool,
}

pub mod atmosphere;
pub mod boundary;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_panel_is_valid() {
        let panel = PanelSpecification::default();

        assert!(panel.validate().is_ok());
        assert!((panel.aspect_ratio() - 5.0 / 3.0).abs() < 1e-12);
        assert!((panel.thickness_ratio() - 0.004).abs() < 1e-12);
    }

    #[test]
    fn rejects_non_physical_panels() {
        let base = PanelSpecification::default();

        let thin = PanelSpecification {
            thickness: 0.0,
            ..base
        };
        assert_eq!(
            thin.validate(),
            Err(InputError::NotPositive("thickness", 0.0))
        );

        let rubbery = PanelSpecification {
            poisson_ratio: 0.5,
            ..base
        };
        assert_eq!(rubbery.validate(), Err(InputError::PoissonRatio(0.5)));

        let nan = PanelSpecification::new(
            f64::NAN,
            0.3,
            0.002,
            7e10,
            0.3,
            2800.0,
            BoundaryCondition::Ssss,
        );
        assert!(nan.is_err());
    }

    #[test]
    fn sweep_validation() {
        let panel = PanelSpecification::default();
        let flow = FlowState::new(0.8, 8000.0).unwrap();

        assert!(validate_sweep(&panel, &flow, &VelocityRange::default(), 10).is_ok());
        assert_eq!(
            validate_sweep(&panel, &flow, &VelocityRange { min: 300.0, max: 100.0 }, 10),
            Err(InputError::VelocityRange(300.0, 100.0))
        );
        assert_eq!(
            validate_sweep(&panel, &flow, &VelocityRange::default(), 1),
            Err(InputError::TooFewPoints(1))
        );
        assert!(FlowState::new(-0.1, 0.0).is_err());
    }

    #[test]
    fn flexural_rigidity() {
        let panel = PanelSpecification::default();
        let expected = 71.7e9 * 8e-9 / (12.0 * (1.0 - 0.33 * 0.33));

        assert!((panel.flexural_rigidity() - expected).abs() < 1e-9);
    }
}
