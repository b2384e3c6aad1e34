//! Parametric batch studies over panel and flow variations

use std::collections::BTreeMap;
use std::path::Path;

use itertools::iproduct;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::control::AnalysisControl;
use crate::dynamic_interface::{Method, SolverContext};
use crate::framework::{MethodOutcome, MultiSolverFramework};
use crate::model::boundary::BoundaryCondition;
use crate::model::{FlowState, FlutterPoint, PanelSpecification, VelocityRange};
use crate::postprocessing::ComparisonResult;
use crate::selector::Requirements;
use crate::solver::doublet::DlmParameters;
use crate::solver::high_fidelity::{ExecutionLimits, HighFidelitySolver};

/// Failure to read or write a study configuration
#[derive(Error, Debug)]
pub enum StudyError {
    /// Reading or writing the file failed
    #[error("could not access study file")]
    Io(#[from] std::io::Error),
    /// The file is not a valid configuration
    #[error("malformed study configuration")]
    Json(#[from] serde_json::Error),
}

/// Values swept in a study. An empty list keeps the base value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StudyParameters {
    /// Mach numbers
    pub machs: Vec<f64>,
    /// \[m\]
    pub altitudes: Vec<f64>,
    /// \[m\]
    pub thicknesses: Vec<f64>,
    /// Boundary conditions
    pub boundaries: Vec<BoundaryCondition>,
}

/// Complete description of a study, stored as JSON
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StudyConfig {
    /// Label carried into the report
    pub name: String,
    /// Panel every case starts from
    pub panel: PanelSpecification,
    /// Flow every case starts from
    pub flow: FlowState,
    /// Values varied around the base case
    pub sweep: StudyParameters,
    /// Methods to run per case. The recommended ones when absent.
    pub methods: Option<Vec<Method>>,
    /// Velocities searched in every case
    pub velocity_range: VelocityRange,
    /// Velocity samples per method
    pub num_points: usize,
    /// Preferences handed to the selector
    pub requirements: Requirements,
    /// Limits handed to the high-fidelity solver
    pub limits: ExecutionLimits,
    /// Fixed doublet-lattice settings, tuned per case when absent
    pub dlm: Option<DlmParameters>,
}

impl Default for StudyConfig {
    fn default() -> Self {
        Self {
            name: "study".to_owned(),
            panel: PanelSpecification::default(),
            flow: FlowState {
                mach: 0.8,
                altitude: 8000.0,
            },
            sweep: StudyParameters::default(),
            methods: None,
            velocity_range: VelocityRange::default(),
            num_points: 20,
            requirements: Requirements::default(),
            limits: ExecutionLimits::default(),
            dlm: None,
        }
    }
}

/// One panel and flow combination of a study
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StudyCase {
    /// Position in expansion order
    pub index: usize,
    /// Panel for this case
    pub panel: PanelSpecification,
    /// Flight condition for this case
    pub flow: FlowState,
}

fn or_base<T: Clone>(values: &[T], base: T) -> Vec<T> {
    if values.is_empty() {
        vec![base]
    } else {
        values.to_vec()
    }
}

impl StudyConfig {
    /// Load a configuration from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, StudyError> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Save the configuration as pretty-printed JSON
    pub fn to_file(&self, path: impl AsRef<Path>) -> Result<(), StudyError> {
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Every combination of the swept values, Mach varying slowest
    pub fn cases(&self) -> Vec<StudyCase> {
        let machs = or_base(&self.sweep.machs, self.flow.mach);
        let altitudes = or_base(&self.sweep.altitudes, self.flow.altitude);
        let thicknesses = or_base(&self.sweep.thicknesses, self.panel.thickness);
        let boundaries = or_base(&self.sweep.boundaries, self.panel.boundary);

        iproduct!(machs, altitudes, thicknesses, boundaries)
            .enumerate()
            .map(|(index, (mach, altitude, thickness, boundary))| StudyCase {
                index,
                panel: PanelSpecification {
                    thickness,
                    boundary,
                    ..self.panel
                },
                flow: FlowState { mach, altitude },
            })
            .collect()
    }
}

/// How a study case ended
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum CaseStatus {
    /// All requested methods ran, possibly with individual failures
    Completed,
    /// The case inputs were rejected
    Invalid(String),
    /// Skipped or interrupted by cancellation
    Cancelled,
}

/// Result of a single study case
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudyCaseResult {
    /// Case that was run
    pub case: StudyCase,
    /// How the case ended
    pub status: CaseStatus,
    /// Method picked by the selector, when the case was valid
    pub recommended: Option<Method>,
    /// Outcome of every method run
    pub outcomes: BTreeMap<Method, MethodOutcome>,
    /// Present when at least two methods produced points
    pub comparison: Option<ComparisonResult>,
}

impl StudyCaseResult {
    fn skipped(case: StudyCase, status: CaseStatus) -> Self {
        Self {
            case,
            status,
            recommended: None,
            outcomes: BTreeMap::new(),
            comparison: None,
        }
    }

    /// Lowest-velocity point over all methods of this case
    pub fn critical(&self) -> Option<&FlutterPoint> {
        self.outcomes
            .values()
            .flat_map(|outcome| outcome.points.first())
            .min_by(|a, b| a.velocity.total_cmp(&b.velocity))
    }
}

/// Results of every case in expansion order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudyReport {
    /// Study name
    pub name: String,
    /// Results in case order
    pub cases: Vec<StudyCaseResult>,
}

impl StudyReport {
    /// Case with the lowest critical speed
    pub fn governing(&self) -> Option<&StudyCaseResult> {
        self.cases
            .iter()
            .filter_map(|case| Some((case, case.critical()?.velocity)))
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(case, _)| case)
    }

    /// True if cancellation cut the study short
    pub fn cancelled(&self) -> bool {
        self.cases
            .iter()
            .any(|case| case.status == CaseStatus::Cancelled)
    }
}

/// Run every case of `config` in order. Invalid cases are recorded and skipped. After
/// cancellation the remaining cases are recorded as [CaseStatus::Cancelled].
pub fn run_study(
    config: &StudyConfig,
    high_fidelity: &dyn HighFidelitySolver,
    control: &AnalysisControl,
) -> StudyReport {
    let cases = config.cases();
    let total = cases.len();
    info!(name = %config.name, cases = total, "starting study");

    let framework = MultiSolverFramework::new(SolverContext {
        high_fidelity,
        limits: &config.limits,
        dlm: config.dlm.as_ref(),
    });
    // Per-case runs share the token but not the study's progress callback
    let case_control = AnalysisControl::new(control.token().clone());

    let mut results = Vec::with_capacity(total);
    for case in cases {
        if control.checkpoint().is_err() {
            results.push(StudyCaseResult::skipped(case, CaseStatus::Cancelled));
            continue;
        }
        control.report(
            &format!("case {} of {total}", case.index + 1),
            100.0 * case.index as f64 / total as f64,
        );

        let run = framework.run_multiple(
            &case.panel,
            &case.flow,
            config.methods.as_deref(),
            config.velocity_range,
            config.num_points,
            &config.requirements,
            &case_control,
        );

        let result = match run {
            Ok(run) => StudyCaseResult {
                case,
                status: if run.cancelled() {
                    CaseStatus::Cancelled
                } else {
                    CaseStatus::Completed
                },
                recommended: Some(run.recommendation.method),
                comparison: run.compare(),
                outcomes: run.outcomes,
            },
            Err(err) => {
                warn!(case = case.index, %err, "skipping invalid case");
                StudyCaseResult::skipped(case, CaseStatus::Invalid(err.to_string()))
            }
        };
        results.push(result);
    }

    control.report("study", 100.0);
    info!(name = %config.name, "study finished");

    StudyReport {
        name: config.name.clone(),
        cases: results,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::CancellationToken;
    use crate::solver::high_fidelity::Unavailable;

    fn config() -> StudyConfig {
        StudyConfig {
            name: "thickness trade".to_owned(),
            flow: FlowState {
                mach: 1.5,
                altitude: 10_000.0,
            },
            sweep: StudyParameters {
                machs: vec![1.5, 2.0],
                thicknesses: vec![0.0015, 0.002],
                ..Default::default()
            },
            methods: Some(vec![Method::PistonTheory]),
            num_points: 10,
            ..Default::default()
        }
    }

    #[test]
    fn cases_cover_every_combination() {
        let cases = config().cases();

        assert_eq!(cases.len(), 4);
        assert_eq!(cases[1].flow.mach, 1.5);
        assert_eq!(cases[1].panel.thickness, 0.002);
        assert_eq!(cases[2].flow.mach, 2.0);
        assert!(cases.iter().all(|case| case.flow.altitude == 10_000.0));
        assert!(cases.iter().enumerate().all(|(i, case)| case.index == i));

        assert_eq!(StudyConfig::default().cases().len(), 1);
    }

    #[test]
    fn json_round_trip() {
        let config = StudyConfig {
            dlm: Some(DlmParameters::default()),
            sweep: StudyParameters {
                boundaries: vec![BoundaryCondition::Cccc, BoundaryCondition::Cfff],
                ..config().sweep
            },
            ..config()
        };
        let path = std::env::temp_dir()
            .join(format!("panel-flutter-study-{}.json", std::process::id()));

        config.to_file(&path).unwrap();
        let loaded = StudyConfig::from_file(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(loaded, config);
    }

    #[test]
    fn partial_json_uses_defaults() {
        let json = r#"{ "sweep": { "machs": [1.2, 1.8] }, "methods": ["piston_theory"] }"#;
        let config: StudyConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.cases().len(), 2);
        assert_eq!(config.methods, Some(vec![Method::PistonTheory]));
        assert_eq!(config.num_points, 20);
    }

    #[test]
    fn runs_every_case() {
        let report = run_study(&config(), &Unavailable, &AnalysisControl::default());

        assert_eq!(report.cases.len(), 4);
        assert!(report
            .cases
            .iter()
            .all(|case| case.status == CaseStatus::Completed));
        assert!(!report.cancelled());

        let governing = report.governing().unwrap();
        assert_eq!(governing.case.panel.thickness, 0.0015);
        assert_eq!(governing.case.flow.mach, 2.0);
    }

    #[test]
    fn invalid_case_is_recorded() {
        let config = StudyConfig {
            sweep: StudyParameters {
                thicknesses: vec![-0.001, 0.002],
                ..Default::default()
            },
            ..config()
        };

        let report = run_study(&config, &Unavailable, &AnalysisControl::default());

        assert!(matches!(report.cases[0].status, CaseStatus::Invalid(_)));
        assert_eq!(report.cases[1].status, CaseStatus::Completed);
    }

    #[test]
    fn cancellation_stops_the_study() {
        let token = CancellationToken::new();
        token.cancel();

        let report = run_study(&config(), &Unavailable, &AnalysisControl::new(token));

        assert!(report.cancelled());
        assert!(report
            .cases
            .iter()
            .all(|case| case.status == CaseStatus::Cancelled && case.outcomes.is_empty()));
    }
}
