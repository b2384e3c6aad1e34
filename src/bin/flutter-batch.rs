use std::collections::BTreeMap;
use std::io::{self, BufRead};

use clap::ValueEnum;
use color_eyre::eyre::{eyre, Context};
use color_eyre::Result;
use serde::Serialize;

use panel_flutter::control::AnalysisControl;
use panel_flutter::dynamic_interface::{ErasedSolver, Method, SolverContext};
use panel_flutter::model::boundary::BoundaryCondition;
use panel_flutter::model::{FlowState, FlutterPoint, PanelSpecification, VelocityRange};
use panel_flutter::postprocessing::compare;
use panel_flutter::solver::high_fidelity::{ExecutionLimits, Unavailable};

#[derive(Serialize)]
struct Solution {
    method: Method,
    panel: PanelSpecification,
    flow: FlowState,
    degraded: bool,
    points: Vec<FlutterPoint>,
}

fn arg<T: std::str::FromStr>(args: &[&str], index: usize, name: &str) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    args.get(index)
        .ok_or_else(|| eyre!("Missing argument `{name}` for '{}'", args[0]))?
        .parse()
        .wrap_err_with(|| format!("Invalid `{name}` for '{}'", args[0]))
}

fn main() -> Result<()> {
    color_eyre::install()?;

    let limits = ExecutionLimits::default();
    let context = SolverContext {
        high_fidelity: &Unavailable,
        limits: &limits,
        dlm: None,
    };

    let mut panel = PanelSpecification::default();
    let mut flow: Option<FlowState> = None;
    let mut solutions: Vec<Solution> = Vec::new();

    for line in io::stdin().lock().lines() {
        let line = line?;

        for command in line.split(';') {
            let args: Vec<&str> = command.split_whitespace().collect();
            let Some(&name) = args.first() else {
                continue;
            };

            match name {
                "panel" => {
                    panel = PanelSpecification::new(
                        arg(&args, 1, "length")?,
                        arg(&args, 2, "width")?,
                        arg(&args, 3, "thickness")?,
                        arg(&args, 4, "youngs_modulus")?,
                        arg(&args, 5, "poisson_ratio")?,
                        arg(&args, 6, "density")?,
                        BoundaryCondition::resolve_code(args.get(7).copied().unwrap_or("SSSS")),
                    )?;
                }
                "flow" => {
                    flow = Some(FlowState::new(
                        arg(&args, 1, "mach")?,
                        arg(&args, 2, "altitude")?,
                    )?);
                }
                "scan" => {
                    let method_name: String = arg(&args, 1, "method")?;
                    let method = Method::from_str(&method_name, true)
                        .map_err(|err| eyre!("Unknown method '{method_name}': {err}"))?;
                    let range =
                        VelocityRange::new(arg(&args, 2, "vmin")?, arg(&args, 3, "vmax")?)?;
                    let steps: usize = arg(&args, 4, "steps")?;
                    let flow = flow.ok_or_else(|| eyre!("'scan' needs a preceding 'flow'"))?;

                    let analysis = ErasedSolver::new(method, &panel, &flow, context)
                        .run(&panel, &flow, range, steps, &AnalysisControl::default())
                        .wrap_err("Velocity scan failed")?;

                    solutions.push(Solution {
                        method,
                        panel,
                        flow,
                        degraded: analysis.degraded,
                        points: analysis.points,
                    });
                }
                "compare" => {
                    let results: BTreeMap<Method, Vec<FlutterPoint>> = solutions
                        .iter()
                        .map(|solution| (solution.method, solution.points.clone()))
                        .collect();

                    match compare(&results) {
                        Some(comparison) => println!("{comparison}"),
                        None => println!("Fewer than two methods found flutter"),
                    }
                }
                "output" => {
                    let path: String = arg(&args, 1, "path")?;
                    let json = serde_json::to_string_pretty(&solutions)?;
                    std::fs::write(&path, json)
                        .wrap_err_with(|| format!("Could not write {path}"))?;
                    solutions.clear();
                }
                other => return Err(eyre!("Unknown command '{other}'")),
            }
        }
    }

    Ok(())
}
