use std::f64::consts::PI;

use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::bracket::{sign_changes, Bisection, BracketSearcher as _, Brent, Point};
use crate::control::AnalysisControl;
use crate::dynamic_interface::Method;
use crate::helpers::linspace;
use crate::linalg::{generalized_eigenvalues, modal_analysis};
use crate::model::atmosphere::AtmosphereProperties;
use crate::model::{validate_sweep, FlowState, FlutterPoint, PanelSpecification, VelocityRange};
use crate::system::aic::TRANSONIC_LIMIT;
use crate::system::{AeroelasticSystem, PanelSystem};

use super::{dynamic_pressure, Analysis, FlutterSolver, SolverError};

/// Points are only reported below this damping ratio
pub const FLUTTER_DAMPING_THRESHOLD: f64 = -0.001;

const MIN_REAL_FREQUENCY: f64 = 1e-12;
const CRITICAL_SPEED_TOLERANCE: f64 = 1e-6;

/// Mesh resolution, aerodynamic grid and iteration controls
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DlmParameters {
    /// Aerodynamic boxes along the chord
    pub panels_chordwise: usize,
    /// Aerodynamic boxes along the span
    pub panels_spanwise: usize,
    /// Reduced frequencies `k = omega c / 2V` of the influence grid
    pub reduced_frequencies: Vec<f64>,
    /// Mach numbers of the influence grid
    pub mach_numbers: Vec<f64>,
    /// Vacuum modes retained in the flutter eigenproblem
    pub basis_modes: usize,
    /// Lowest structural modes used to seed the frequency iteration
    pub tracked_modes: usize,
    /// Iteration budget per mode and velocity
    pub max_iterations: usize,
    /// Relative frequency change accepted as converged
    pub tolerance: f64,
}

impl Default for DlmParameters {
    fn default() -> Self {
        Self {
            panels_chordwise: 8,
            panels_spanwise: 6,
            reduced_frequencies: vec![0.1, 0.2, 0.3, 0.5, 0.8, 1.0, 1.5, 2.0],
            mach_numbers: vec![0.3, 0.5, 0.7, 0.85, 0.9, 0.95],
            basis_modes: 6,
            tracked_modes: 3,
            max_iterations: 10,
            tolerance: 0.01,
        }
    }
}

impl DlmParameters {
    /// Resolution adapted to the panel shape and a grid centered on the flight Mach number
    pub fn tuned_for(panel: &PanelSpecification, flow: &FlowState) -> Self {
        let base = Self::default();
        let aspect = panel.aspect_ratio();
        let mach = flow.mach;

        let (panels_chordwise, panels_spanwise) = if aspect > 2.0 {
            (
                (base.panels_chordwise as f64 * 1.2) as usize,
                ((base.panels_spanwise as f64 * 0.8) as usize).max(4),
            )
        } else if aspect < 0.8 {
            (
                ((base.panels_chordwise as f64 * 0.8) as usize).max(6),
                (base.panels_spanwise as f64 * 1.2) as usize,
            )
        } else {
            (base.panels_chordwise, base.panels_spanwise)
        };

        let reduced_frequencies = if mach > 0.8 {
            vec![0.1, 0.2, 0.3, 0.5, 0.8, 1.0, 1.2]
        } else {
            vec![0.05, 0.1, 0.2, 0.4, 0.6, 0.8, 1.0, 1.5]
        };

        let mach_numbers = vec![
            (mach - 0.2).max(0.1),
            (mach - 0.1).max(0.2),
            mach,
            (mach + 0.1).min(0.95),
            (mach + 0.2).min(0.98),
        ];

        Self {
            panels_chordwise,
            panels_spanwise,
            reduced_frequencies,
            mach_numbers,
            ..base
        }
    }
}

/// Converged root of the flutter determinant for one tracked mode
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Root {
    /// Complex angular frequency, growth when the imaginary part is positive
    pub omega: Complex64,
    /// One-based seeding mode
    pub mode: usize,
}

impl Root {
    pub fn frequency(&self) -> f64 {
        self.omega.re.abs() / (2.0 * PI)
    }

    /// `-Im(omega) / |Re(omega)|`, undefined for a vanishing real part
    pub fn damping(&self) -> Option<f64> {
        if self.omega.re.abs() > MIN_REAL_FREQUENCY {
            Some(-self.omega.im / self.omega.re.abs())
        } else {
            None
        }
    }
}

/// K-method iteration over an aeroelastic system at fixed air properties
pub(crate) struct KMethod<'s, S> {
    system: &'s S,
    air: AtmosphereProperties,
    // Vacuum angular frequencies of the tracked modes
    seeds: Vec<f64>,
    max_iterations: usize,
    tolerance: f64,
}

impl<'s, S: AeroelasticSystem> KMethod<'s, S> {
    pub fn new(
        system: &'s S,
        air: AtmosphereProperties,
        params: &DlmParameters,
    ) -> Result<Self, SolverError> {
        let seeds: Vec<f64> = modal_analysis(system.stiffness(), system.mass())?
            .into_iter()
            .filter(|&omega_squared| omega_squared > 0.0)
            .take(params.tracked_modes)
            .map(|omega_squared| omega_squared.sqrt())
            .collect();
        if seeds.is_empty() {
            return Err(SolverError::NoElasticModes);
        }

        Ok(Self {
            system,
            air,
            seeds,
            max_iterations: params.max_iterations.max(1),
            tolerance: params.tolerance,
        })
    }

    pub fn mach(&self, velocity: f64) -> f64 {
        velocity / self.air.sound_speed
    }

    /// Roots of every tracked mode at `velocity`. Failures of individual modes are returned in
    /// place; the outer error is reserved for samples the method cannot handle at all.
    pub fn roots(&self, velocity: f64) -> Result<Vec<Result<Root, SolverError>>, SolverError> {
        let mach = self.mach(velocity);
        if mach >= TRANSONIC_LIMIT {
            return Err(SolverError::RegimeNotApplicable(mach));
        }

        Ok(self
            .seeds
            .iter()
            .enumerate()
            .map(|(i, &seed)| {
                self.track(velocity, mach, seed).map(|omega| Root { omega, mode: i + 1 })
            })
            .collect())
    }

    /// Fixed-point iteration on `K + i omega^2 q / (c b) Q(k)`, with `omega` and `k` taken from
    /// the previous eigenvalue
    fn track(&self, velocity: f64, mach: f64, seed: f64) -> Result<Complex64, SolverError> {
        let chord = self.system.reference_chord();
        let aero_scale = dynamic_pressure(self.air.density, velocity)
            / (chord * self.system.reference_span());
        let stiffness = self.system.stiffness().map(Complex64::from);

        let mut omega = Complex64::from(seed);

        for iteration in 0..self.max_iterations {
            let k = omega.re.abs() * chord / (2.0 * velocity);
            let aero = self
                .system
                .aerodynamics(mach, k)
                .ok_or(SolverError::NoAerodynamicData)?;

            let flutter_matrix =
                &stiffness + aero * Complex64::new(0.0, omega.re.powi(2) * aero_scale);
            let eigenvalues = generalized_eigenvalues(&flutter_matrix, self.system.mass())?;

            let target = omega * omega;
            let lambda = eigenvalues
                .into_iter()
                .min_by(|a, b| (a - target).norm().total_cmp(&(b - target).norm()))
                .ok_or(SolverError::NonConvergence(iteration))?;
            let next = lambda.sqrt();

            if omega.norm() <= MIN_REAL_FREQUENCY {
                return Err(SolverError::NonConvergence(iteration));
            }
            if (next - omega).norm() / omega.norm() < self.tolerance {
                return Ok(next);
            }

            omega = next;
        }

        Err(SolverError::NonConvergence(self.max_iterations))
    }

    fn point(&self, velocity: f64, root: &Root, damping: f64) -> FlutterPoint {
        FlutterPoint {
            velocity,
            frequency: root.frequency(),
            damping,
            mode: root.mode,
            mach: self.mach(velocity),
            dynamic_pressure: dynamic_pressure(self.air.density, velocity),
            method: Method::DoubletLattice,
            degraded: false,
        }
    }

    /// Unstable points over a velocity sweep, ascending in velocity
    pub fn sweep(
        &self,
        range: VelocityRange,
        num_points: usize,
        control: &AnalysisControl,
    ) -> Result<Vec<FlutterPoint>, SolverError> {
        let mut points = Vec::new();

        for (i, velocity) in linspace(range.min, range.max, num_points).enumerate() {
            control.checkpoint()?;
            control.report(
                "doublet lattice sweep",
                100.0 * i as f64 / num_points as f64,
            );

            let roots = match self.roots(velocity) {
                Ok(roots) => roots,
                Err(SolverError::RegimeNotApplicable(mach)) => {
                    warn!(velocity, mach, "skipping transonic sample");
                    continue;
                }
                Err(err) => return Err(err),
            };

            for root in roots {
                match root {
                    Ok(root) => match root.damping() {
                        Some(damping) if damping < FLUTTER_DAMPING_THRESHOLD => {
                            points.push(self.point(velocity, &root, damping))
                        }
                        _ => (),
                    },
                    Err(err) => debug!(velocity, %err, "discarding sample"),
                }
            }
        }

        control.report("doublet lattice sweep", 100.0);
        points.sort_by(|a, b| a.velocity.total_cmp(&b.velocity));

        Ok(points)
    }

    /// Least stable converged root at `velocity`
    pub fn least_stable(&self, velocity: f64) -> Result<Option<(Root, f64)>, SolverError> {
        let least = self
            .roots(velocity)?
            .into_iter()
            .filter_map(|root| {
                let root = root.ok()?;
                Some((root, root.damping()?))
            })
            .min_by(|a, b| a.1.total_cmp(&b.1));

        Ok(least)
    }

    /// First velocity at which the least stable damping crosses zero, refined with Brent's
    /// method between the bracketing sweep samples
    pub fn critical_point(
        &self,
        range: VelocityRange,
        num_points: usize,
        control: &AnalysisControl,
    ) -> Result<Option<FlutterPoint>, SolverError> {
        let mut samples = Vec::new();

        for velocity in linspace(range.min, range.max, num_points) {
            control.checkpoint()?;
            match self.least_stable(velocity) {
                Ok(Some((_, damping))) => samples.push(Point {
                    x: velocity,
                    f: damping,
                }),
                Ok(None) => debug!(velocity, "no converged root"),
                Err(SolverError::RegimeNotApplicable(_)) => (),
                Err(err) => return Err(err),
            }
        }

        let Some(first) = samples.first().copied() else {
            return Ok(None);
        };

        let (velocity, fallback) = if first.f < 0.0 {
            (first.x, first.x)
        } else {
            let Some((lower, upper)) = sign_changes(samples).next() else {
                return Ok(None);
            };
            (self.refine(lower, upper), upper.x)
        };

        let least = match self.least_stable(velocity)? {
            Some(least) => Some((velocity, least)),
            None => self.least_stable(fallback)?.map(|least| (fallback, least)),
        };

        Ok(least.map(|(velocity, (root, damping))| self.point(velocity, &root, damping)))
    }

    /// Zero of the least stable damping between two sweep samples. Brent first, bisection when
    /// Brent lands on a sample without a converged root, the upper sample as a last resort.
    fn refine(&self, lower: Point, upper: Point) -> f64 {
        let damping = |velocity: f64| -> Result<f64, SolverError> {
            self.least_stable(velocity)?
                .map(|(_, damping)| damping)
                .ok_or(SolverError::NonConvergence(0))
        };

        let refined = Brent {
            rel_epsilon: CRITICAL_SPEED_TOLERANCE,
        }
        .search(lower, upper, damping)
        .or_else(|err| {
            debug!(%err, "Brent refinement failed, bisecting");
            Bisection {
                rel_epsilon: CRITICAL_SPEED_TOLERANCE,
            }
            .search(lower, upper, damping)
        });

        match refined {
            Ok(result) => result.x,
            Err(err) => {
                debug!(%err, "refinement failed, using sweep sample");
                upper.x
            }
        }
    }
}

/// Doublet-lattice flutter solver
#[derive(Debug, Clone, Default)]
pub struct DoubletLatticeSolver {
    /// Mesh, grid and iteration settings
    pub params: DlmParameters,
}

impl DoubletLatticeSolver {
    /// Solver with explicit parameters
    pub fn new(params: DlmParameters) -> Self {
        Self { params }
    }

    /// Solver with parameters from [DlmParameters::tuned_for]
    pub fn tuned_for(panel: &PanelSpecification, flow: &FlowState) -> Self {
        Self::new(DlmParameters::tuned_for(panel, flow))
    }

    /// Unstable points over a velocity sweep at the flight altitude, ascending in velocity.
    /// Each sample is evaluated at its own Mach number; samples at or above Mach 0.98 are
    /// skipped.
    pub fn analyze_flutter(
        &self,
        panel: &PanelSpecification,
        flow: &FlowState,
        range: VelocityRange,
        num_points: usize,
        control: &AnalysisControl,
    ) -> Result<Vec<FlutterPoint>, SolverError> {
        validate_sweep(panel, flow, &range, num_points)?;
        info!(
            boundary = %panel.boundary,
            mach = flow.mach,
            altitude = flow.altitude,
            "starting doublet lattice analysis"
        );

        let system = PanelSystem::new(panel, &self.params)?;
        let k_method = KMethod::new(&system, flow.atmosphere(), &self.params)?;

        let points = k_method.sweep(range, num_points, control)?;
        info!(count = points.len(), "doublet lattice analysis finished");

        Ok(points)
    }

    /// Least stable damping ratio at a single velocity
    pub fn damping_at(
        &self,
        panel: &PanelSpecification,
        flow: &FlowState,
        velocity: f64,
    ) -> Result<Option<f64>, SolverError> {
        panel.validate()?;
        flow.validate()?;

        let system = PanelSystem::new(panel, &self.params)?;
        let k_method = KMethod::new(&system, flow.atmosphere(), &self.params)?;

        Ok(k_method.least_stable(velocity)?.map(|(_, damping)| damping))
    }

    /// Lowest velocity in `range` where the least stable mode loses its damping
    pub fn find_critical_speed(
        &self,
        panel: &PanelSpecification,
        flow: &FlowState,
        range: VelocityRange,
        num_points: usize,
        control: &AnalysisControl,
    ) -> Result<Option<FlutterPoint>, SolverError> {
        validate_sweep(panel, flow, &range, num_points)?;

        let system = PanelSystem::new(panel, &self.params)?;
        let k_method = KMethod::new(&system, flow.atmosphere(), &self.params)?;

        k_method.critical_point(range, num_points, control)
    }
}

impl FlutterSolver for DoubletLatticeSolver {
    fn method(&self) -> Method {
        Method::DoubletLattice
    }

    fn run(
        &self,
        panel: &PanelSpecification,
        flow: &FlowState,
        range: VelocityRange,
        num_points: usize,
        control: &AnalysisControl,
    ) -> Result<Analysis, SolverError> {
        self.analyze_flutter(panel, flow, range, num_points, control)
            .map(Analysis::from)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use nalgebra::{DMatrix, DVector};

    use super::*;
    use crate::control::CancellationToken;
    use crate::model::atmosphere::AtmosphereModel;

    /// Two modes coupled by a skew-symmetric aerodynamic matrix. They coalesce once
    /// `omega^2 rho V^2 / 2` times the coupling exceeds the stiffness gap.
    struct Coalescing {
        mass: DVector<f64>,
        stiffness: DMatrix<f64>,
    }

    impl Coalescing {
        const COUPLING: f64 = 1e-4;

        fn scaled(factor: f64) -> Self {
            Self {
                mass: DVector::from_element(2, 1.0),
                stiffness: DMatrix::from_diagonal(&DVector::from_vec(vec![
                    1.0e4 * factor,
                    1.2e4 * factor,
                ])),
            }
        }

        fn new() -> Self {
            Self::scaled(1.0)
        }
    }

    impl AeroelasticSystem for Coalescing {
        fn mass(&self) -> &DVector<f64> {
            &self.mass
        }

        fn stiffness(&self) -> &DMatrix<f64> {
            &self.stiffness
        }

        fn reference_chord(&self) -> f64 {
            1.0
        }

        fn reference_span(&self) -> f64 {
            1.0
        }

        fn aerodynamics(&self, _mach: f64, _k: f64) -> Option<DMatrix<Complex64>> {
            let i = Complex64::i();
            let damping = Complex64::from(-0.01);
            let coupling = DMatrix::from_row_slice(2, 2, &[damping, i, -i, damping]);
            Some(coupling * Complex64::from(Self::COUPLING))
        }
    }

    fn sea_level() -> AtmosphereProperties {
        AtmosphereModel::properties(0.0)
    }

    fn small_params() -> DlmParameters {
        DlmParameters {
            panels_chordwise: 4,
            panels_spanwise: 3,
            ..Default::default()
        }
    }

    fn thin_panel() -> (PanelSpecification, FlowState) {
        (
            PanelSpecification {
                thickness: 0.001,
                ..Default::default()
            },
            FlowState {
                mach: 0.5,
                altitude: 0.0,
            },
        )
    }

    fn critical_speed(system: &Coalescing) -> f64 {
        KMethod::new(system, sea_level(), &DlmParameters::default())
            .unwrap()
            .critical_point(
                VelocityRange::new(10.0, 100.0).unwrap(),
                10,
                &AnalysisControl::default(),
            )
            .unwrap()
            .unwrap()
            .velocity
    }

    #[test]
    fn coalescence_is_detected() {
        let system = Coalescing::new();
        let k_method = KMethod::new(&system, sea_level(), &DlmParameters::default()).unwrap();
        let range = VelocityRange::new(10.0, 100.0).unwrap();

        let points = k_method
            .sweep(range, 10, &AnalysisControl::default())
            .unwrap();

        assert!(!points.is_empty());
        assert!(points.iter().all(|p| p.damping < FLUTTER_DAMPING_THRESHOLD));
        assert!(points.iter().all(|p| p.velocity > 38.0));
        assert!(points.windows(2).all(|w| w[0].velocity <= w[1].velocity));
        assert!(points.iter().all(|p| p.method == Method::DoubletLattice));
    }

    #[test]
    fn critical_speed_is_refined() {
        let air = sea_level();

        let critical = critical_speed(&Coalescing::new());

        // The modes merge at omega^2 = 11000, unstable once the coupling reaches
        // 1000 / sqrt(1 - 0.01^2)
        let expected = (2.0 * 1000.05 / (air.density * 11000.0 * Coalescing::COUPLING)).sqrt();
        assert_relative_eq!(critical, expected, max_relative = 5e-3);
    }

    #[test]
    fn critical_speed_ignores_stiffness_scale() {
        let nominal = critical_speed(&Coalescing::new());
        let stiff = critical_speed(&Coalescing::scaled(4.0));

        assert_relative_eq!(nominal, stiff, max_relative = 1e-4);
    }

    #[test]
    fn stable_below_coalescence() {
        let system = Coalescing::new();
        let k_method = KMethod::new(&system, sea_level(), &DlmParameters::default()).unwrap();

        let (_, damping) = k_method.least_stable(20.0).unwrap().unwrap();

        assert!(damping > 0.0);
    }

    #[test]
    fn thin_panel_flutters() {
        let (panel, flow) = thin_panel();

        let points = DoubletLatticeSolver::default()
            .analyze_flutter(
                &panel,
                &flow,
                VelocityRange::new(180.0, 300.0).unwrap(),
                5,
                &AnalysisControl::default(),
            )
            .unwrap();

        assert!(!points.is_empty());
        assert!(points.iter().all(|p| p.damping < FLUTTER_DAMPING_THRESHOLD));
        assert!(points.windows(2).all(|w| w[0].velocity <= w[1].velocity));
        assert!(points.iter().all(|p| p.frequency > 0.0 && p.mach < 0.98));
        assert!(points.iter().all(|p| (1..=3).contains(&p.mode)));
    }

    #[test]
    fn damping_changes_sign_with_speed() {
        let (panel, flow) = thin_panel();
        let solver = DoubletLatticeSolver::default();

        let slow = solver.damping_at(&panel, &flow, 40.0).unwrap().unwrap();
        let fast = solver.damping_at(&panel, &flow, 200.0).unwrap().unwrap();

        assert!(slow > 0.01, "{slow}");
        assert!(fast < -0.01, "{fast}");
    }

    #[test]
    fn thin_panel_critical_speed() {
        let (panel, flow) = thin_panel();

        let critical = DoubletLatticeSolver::default()
            .find_critical_speed(
                &panel,
                &flow,
                VelocityRange::new(40.0, 300.0).unwrap(),
                14,
                &AnalysisControl::default(),
            )
            .unwrap()
            .unwrap();

        assert!((160.0..=180.0).contains(&critical.velocity), "{critical:?}");
        assert!(critical.frequency > 0.0);
        assert_eq!(critical.method, Method::DoubletLattice);
    }

    #[test]
    fn no_crossing_below_flutter() {
        let (panel, flow) = thin_panel();

        let critical = DoubletLatticeSolver::default()
            .find_critical_speed(
                &panel,
                &flow,
                VelocityRange::new(40.0, 140.0).unwrap(),
                6,
                &AnalysisControl::default(),
            )
            .unwrap();

        assert_eq!(critical, None);
    }

    #[test]
    fn transonic_sweep_is_empty() {
        let solver = DoubletLatticeSolver::new(small_params());
        let flow = FlowState {
            mach: 0.99,
            altitude: 0.0,
        };

        let points = solver
            .analyze_flutter(
                &PanelSpecification::default(),
                &flow,
                VelocityRange::new(340.0, 400.0).unwrap(),
                4,
                &AnalysisControl::default(),
            )
            .unwrap();

        assert!(points.is_empty());
    }

    #[test]
    fn unusable_setup_is_an_error() {
        let (panel, flow) = thin_panel();
        let run = |params: DlmParameters| {
            DoubletLatticeSolver::new(params).analyze_flutter(
                &panel,
                &flow,
                VelocityRange::new(50.0, 150.0).unwrap(),
                3,
                &AnalysisControl::default(),
            )
        };

        let transonic_grid = run(DlmParameters {
            mach_numbers: vec![0.99],
            ..small_params()
        });
        let no_frequencies = run(DlmParameters {
            reduced_frequencies: Vec::new(),
            ..small_params()
        });
        let no_modes = run(DlmParameters {
            tracked_modes: 0,
            ..small_params()
        });

        assert_eq!(transonic_grid, Err(SolverError::NoAerodynamicData));
        assert_eq!(no_frequencies, Err(SolverError::NoAerodynamicData));
        assert_eq!(no_modes, Err(SolverError::NoElasticModes));
    }

    #[test]
    fn cancellation_stops_sweep() {
        let token = CancellationToken::new();
        token.cancel();
        let control = AnalysisControl::new(token);

        let result = DoubletLatticeSolver::new(small_params()).analyze_flutter(
            &PanelSpecification::default(),
            &FlowState {
                mach: 0.5,
                altitude: 0.0,
            },
            VelocityRange::default(),
            5,
            &control,
        );

        assert_eq!(result, Err(SolverError::Cancelled));
    }

    #[test]
    fn tuning_follows_shape_and_mach() {
        let slender = PanelSpecification {
            length: 1.0,
            width: 0.3,
            ..Default::default()
        };
        let params = DlmParameters::tuned_for(
            &slender,
            &FlowState {
                mach: 0.85,
                altitude: 0.0,
            },
        );

        assert_eq!((params.panels_chordwise, params.panels_spanwise), (9, 4));
        assert_eq!(params.reduced_frequencies.len(), 7);
        assert_relative_eq!(params.mach_numbers[4], 0.98);
        assert_relative_eq!(params.mach_numbers[3], 0.95);

        let wide = PanelSpecification {
            length: 0.2,
            width: 0.5,
            ..Default::default()
        };
        let params = DlmParameters::tuned_for(
            &wide,
            &FlowState {
                mach: 0.2,
                altitude: 0.0,
            },
        );

        assert_eq!((params.panels_chordwise, params.panels_spanwise), (6, 7));
        assert_eq!(params.reduced_frequencies[0], 0.05);
        assert_relative_eq!(params.mach_numbers[0], 0.1);
        assert_relative_eq!(params.mach_numbers[1], 0.2);
    }
}
