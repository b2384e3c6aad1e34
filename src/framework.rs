//! Running several flutter methods on the same case

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{info, warn};

use crate::control::AnalysisControl;
use crate::dynamic_interface::{ErasedSolver, Method, SolverContext};
use crate::model::{
    validate_sweep, FlowState, FlutterPoint, InputError, PanelSpecification, VelocityRange,
};
use crate::postprocessing::{compare, ComparisonResult};
use crate::selector::{Requirements, SolverRecommendation, SolverSelector};
use crate::solver::SolverError;

/// Methods run by default: the recommendation plus its best alternative
const DEFAULT_METHOD_COUNT: usize = 2;

/// How a single method's run ended
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum MethodStatus {
    /// Produced its own results
    Completed,
    /// Produced results through an analytic fallback
    Degraded,
    /// Aborted with the given error
    Failed(String),
    /// Not run, or stopped, because of cancellation
    Cancelled,
}

/// Result of one method within a multi-method run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MethodOutcome {
    /// Method that produced this outcome
    pub method: Method,
    /// How the run ended
    pub status: MethodStatus,
    /// Unstable points, empty unless the method completed or degraded
    pub points: Vec<FlutterPoint>,
}

impl MethodOutcome {
    fn empty(method: Method, status: MethodStatus) -> Self {
        Self {
            method,
            status,
            points: Vec::new(),
        }
    }
}

/// Outcomes of every requested method
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MultiSolverRun {
    /// Selector output for the case, computed even when methods were given explicitly
    pub recommendation: SolverRecommendation,
    /// One outcome per requested method
    pub outcomes: BTreeMap<Method, MethodOutcome>,
}

impl MultiSolverRun {
    /// Points per method, including methods without results
    pub fn points(&self) -> BTreeMap<Method, Vec<FlutterPoint>> {
        self.outcomes
            .iter()
            .map(|(&method, outcome)| (method, outcome.points.clone()))
            .collect()
    }

    /// Compare the methods that produced points
    pub fn compare(&self) -> Option<ComparisonResult> {
        compare(&self.points())
    }

    /// True if any method stopped because of cancellation
    pub fn cancelled(&self) -> bool {
        self.outcomes
            .values()
            .any(|outcome| outcome.status == MethodStatus::Cancelled)
    }
}

/// Runs the selected methods one after another on the same case
pub struct MultiSolverFramework<'a> {
    selector: SolverSelector,
    context: SolverContext<'a>,
}

impl<'a> MultiSolverFramework<'a> {
    /// Framework dispatching to the solvers in `context`
    pub fn new(context: SolverContext<'a>) -> Self {
        Self {
            selector: SolverSelector,
            context,
        }
    }

    /// Methods to run when the caller named none
    pub fn default_methods(recommendation: &SolverRecommendation) -> Vec<Method> {
        std::iter::once(recommendation.method)
            .chain(recommendation.alternatives.iter().copied())
            .take(DEFAULT_METHOD_COUNT)
            .collect()
    }

    /// Run `methods`, or the recommended ones when `None`.
    ///
    /// Invalid input fails the whole run. A failing method is recorded as [MethodStatus::Failed]
    /// and the remaining methods still run. After cancellation every method not yet finished is
    /// recorded as [MethodStatus::Cancelled].
    #[allow(clippy::too_many_arguments)]
    pub fn run_multiple(
        &self,
        panel: &PanelSpecification,
        flow: &FlowState,
        methods: Option<&[Method]>,
        range: VelocityRange,
        num_points: usize,
        requirements: &Requirements,
        control: &AnalysisControl,
    ) -> Result<MultiSolverRun, InputError> {
        validate_sweep(panel, flow, &range, num_points)?;

        let recommendation = self.selector.recommend(panel, flow, requirements);
        let mut selected = match methods {
            Some(methods) => methods.to_vec(),
            None => Self::default_methods(&recommendation),
        };
        selected.dedup();

        info!(
            recommended = %recommendation.method,
            methods = ?selected,
            "running flutter methods"
        );

        let mut outcomes = BTreeMap::new();
        let total = selected.len().max(1) as f64;

        for (i, &method) in selected.iter().enumerate() {
            if outcomes.contains_key(&method) {
                continue;
            }

            if control.checkpoint().is_err() {
                outcomes.insert(method, MethodOutcome::empty(method, MethodStatus::Cancelled));
                continue;
            }

            control.report(method.label(), 100.0 * i as f64 / total);

            let solver = ErasedSolver::new(method, panel, flow, self.context);
            let outcome = match solver.run(panel, flow, range, num_points, control) {
                Ok(analysis) => MethodOutcome {
                    method,
                    status: if analysis.degraded {
                        MethodStatus::Degraded
                    } else {
                        MethodStatus::Completed
                    },
                    points: analysis.points,
                },
                Err(SolverError::Cancelled) => {
                    MethodOutcome::empty(method, MethodStatus::Cancelled)
                }
                Err(err) => {
                    warn!(%method, %err, "flutter method failed");
                    MethodOutcome::empty(method, MethodStatus::Failed(err.to_string()))
                }
            };

            info!(
                %method,
                status = ?outcome.status,
                points = outcome.points.len(),
                "method finished"
            );
            outcomes.insert(method, outcome);
        }

        control.report("done", 100.0);

        Ok(MultiSolverRun {
            recommendation,
            outcomes,
        })
    }
}
