use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::Context;
use color_eyre::Result;
use serde::Serialize;
use tracing::{debug, Level};
use tracing_subscriber::FmtSubscriber;

use panel_flutter::control::AnalysisControl;
use panel_flutter::dynamic_interface::{ErasedSolver, Method, SolverContext};
use panel_flutter::framework::{MethodStatus, MultiSolverFramework};
use panel_flutter::model::boundary::{AnalysisIntent, BoundaryCondition};
use panel_flutter::model::{FlowState, FlutterPoint, PanelSpecification, VelocityRange};
use panel_flutter::selector::{Requirements, SolverSelector};
use panel_flutter::solver::high_fidelity::{ExecutionLimits, Unavailable};
use panel_flutter::study::{run_study, CaseStatus, StudyConfig};

/// Flutter screening of rectangular panels
#[derive(Parser)]
#[command(name = "panel-flutter", version, about, long_about = None)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sweep a velocity range with a single method
    Analyze {
        #[command(flatten)]
        panel: PanelArgs,
        #[command(flatten)]
        flow: FlowArgs,
        #[command(flatten)]
        sweep: SweepArgs,
        #[arg(short, long, value_enum, default_value_t = Method::PistonTheory)]
        method: Method,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Score the methods for a panel and flight condition
    Recommend {
        #[command(flatten)]
        panel: PanelArgs,
        #[command(flatten)]
        flow: FlowArgs,
        #[command(flatten)]
        requirements: RequirementArgs,
        /// Also suggest a boundary condition for this purpose
        #[arg(long, value_enum)]
        intent: Option<AnalysisIntent>,
        #[arg(long)]
        json: bool,
    },
    /// Run several methods and reconcile their critical speeds
    Compare {
        #[command(flatten)]
        panel: PanelArgs,
        #[command(flatten)]
        flow: FlowArgs,
        #[command(flatten)]
        sweep: SweepArgs,
        #[command(flatten)]
        requirements: RequirementArgs,
        /// Methods to run, the recommended ones when omitted
        #[arg(short, long, value_enum, value_delimiter = ',')]
        methods: Vec<Method>,
        #[arg(long)]
        json: bool,
    },
    /// Run a parametric study described by a JSON file
    Study {
        config: PathBuf,
        /// Write the full report as JSON
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Args)]
struct PanelArgs {
    /// Chordwise length [m]
    #[arg(long, default_value_t = 0.5)]
    length: f64,
    /// Spanwise width [m]
    #[arg(long, default_value_t = 0.3)]
    width: f64,
    /// Thickness [m]
    #[arg(long, default_value_t = 0.002)]
    thickness: f64,
    /// Young's modulus [Pa]
    #[arg(long, default_value_t = 71.7e9)]
    youngs_modulus: f64,
    #[arg(long, default_value_t = 0.33)]
    poisson_ratio: f64,
    /// Material density [kg/m^3]
    #[arg(long, default_value_t = 2810.0)]
    density: f64,
    /// Edge support code, leading/trailing/left/right edge, e.g. SSSS or CFFF
    #[arg(short, long, default_value = "SSSS")]
    boundary: String,
}

impl PanelArgs {
    fn panel(&self) -> Result<PanelSpecification> {
        Ok(PanelSpecification::new(
            self.length,
            self.width,
            self.thickness,
            self.youngs_modulus,
            self.poisson_ratio,
            self.density,
            BoundaryCondition::resolve_code(&self.boundary),
        )?)
    }
}

#[derive(Args)]
struct FlowArgs {
    #[arg(long, default_value_t = 0.8)]
    mach: f64,
    /// Altitude [m]
    #[arg(long, default_value_t = 8000.0)]
    altitude: f64,
}

impl FlowArgs {
    fn flow(&self) -> Result<FlowState> {
        Ok(FlowState::new(self.mach, self.altitude)?)
    }
}

#[derive(Args)]
struct SweepArgs {
    /// Lowest velocity [m/s]
    #[arg(long, default_value_t = 50.0)]
    v_min: f64,
    /// Highest velocity [m/s]
    #[arg(long, default_value_t = 1000.0)]
    v_max: f64,
    /// Number of velocity samples
    #[arg(short = 'n', long, default_value_t = 20)]
    points: usize,
}

impl SweepArgs {
    fn range(&self) -> Result<VelocityRange> {
        Ok(VelocityRange::new(self.v_min, self.v_max)?)
    }
}

#[derive(Args)]
struct RequirementArgs {
    /// Favor fast methods
    #[arg(long)]
    speed: bool,
    /// Favor accurate methods
    #[arg(long)]
    accuracy: bool,
    /// Not an early design study
    #[arg(long)]
    detailed: bool,
}

impl RequirementArgs {
    fn requirements(&self) -> Requirements {
        Requirements {
            speed_priority: self.speed,
            accuracy_priority: self.accuracy,
            preliminary_design: !self.detailed,
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_points(points: &[FlutterPoint]) {
    if points.is_empty() {
        println!("No flutter in the velocity range");
        return;
    }

    println!(
        "{:>12}{:>12}{:>12}{:>6}{:>8}{:>14}",
        "V [m/s]", "f [Hz]", "g", "mode", "Mach", "q [Pa]"
    );
    for point in points {
        let tag = if point.degraded { " *" } else { "" };
        println!(
            "{:>12.1}{:>12.2}{:>12.4}{:>6}{:>8.3}{:>14.1}{tag}",
            point.velocity,
            point.frequency,
            point.damping,
            point.mode,
            point.mach,
            point.dynamic_pressure
        );
    }
}

fn control<'a>() -> AnalysisControl<'a> {
    AnalysisControl::default().with_progress(|step, percent| debug!(step, percent, "progress"))
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();

    let level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let limits = ExecutionLimits::default();
    let context = SolverContext {
        high_fidelity: &Unavailable,
        limits: &limits,
        dlm: None,
    };

    match cli.command {
        Commands::Analyze {
            panel,
            flow,
            sweep,
            method,
            json,
        } => {
            let panel = panel.panel()?;
            let flow = flow.flow()?;

            for advisory in panel.boundary.advisories() {
                debug!(boundary = %panel.boundary, "{advisory}");
            }

            let analysis = ErasedSolver::new(method, &panel, &flow, context)
                .run(&panel, &flow, sweep.range()?, sweep.points, &control())
                .wrap_err_with(|| format!("{method} analysis failed"))?;

            if json {
                print_json(&analysis.points)?;
            } else {
                println!("{method}, {} at Mach {}", panel.boundary, flow.mach);
                if analysis.degraded {
                    println!("* analytic fallback, external solver unavailable");
                }
                print_points(&analysis.points);
            }
        }
        Commands::Recommend {
            panel,
            flow,
            requirements,
            intent,
            json,
        } => {
            let panel = panel.panel()?;
            let flow = flow.flow()?;
            let recommendation =
                SolverSelector.recommend(&panel, &flow, &requirements.requirements());

            if json {
                print_json(&recommendation)?;
            } else {
                println!(
                    "{} (confidence {:.2})",
                    recommendation.method, recommendation.confidence
                );
                println!("{}", recommendation.justification);
                for (method, score) in &recommendation.scores {
                    println!("  {:<18}{score:>6.2}", method.label());
                }
            }

            if let Some(intent) = intent {
                let boundary = BoundaryCondition::recommend_for(intent);
                println!("Suggested boundary condition: {boundary}");
                for advisory in boundary.advisories() {
                    println!("  {advisory}");
                }
            }
        }
        Commands::Compare {
            panel,
            flow,
            sweep,
            requirements,
            methods,
            json,
        } => {
            let panel = panel.panel()?;
            let flow = flow.flow()?;
            let methods = (!methods.is_empty()).then_some(methods.as_slice());

            let run = MultiSolverFramework::new(context).run_multiple(
                &panel,
                &flow,
                methods,
                sweep.range()?,
                sweep.points,
                &requirements.requirements(),
                &control(),
            )?;

            if json {
                print_json(&run)?;
            } else {
                for outcome in run.outcomes.values() {
                    match &outcome.status {
                        MethodStatus::Failed(reason) => {
                            println!("{}: failed, {reason}", outcome.method)
                        }
                        status => println!(
                            "{}: {status:?}, {} unstable points",
                            outcome.method,
                            outcome.points.len()
                        ),
                    }
                }
                println!();

                match run.compare() {
                    Some(comparison) => println!("{comparison}"),
                    None => println!("Fewer than two methods found flutter, nothing to compare"),
                }
            }
        }
        Commands::Study { config, output } => {
            let study = StudyConfig::from_file(&config)
                .wrap_err_with(|| format!("Could not load {}", config.display()))?;
            let report = run_study(&study, &Unavailable, &control());

            for case in &report.cases {
                let label = format!(
                    "#{:<4} M {:<6} h {:<8} t {:<8} {}",
                    case.case.index,
                    case.case.flow.mach,
                    case.case.flow.altitude,
                    case.case.panel.thickness,
                    case.case.panel.boundary
                );
                match (&case.status, case.critical()) {
                    (CaseStatus::Invalid(reason), _) => println!("{label}  invalid: {reason}"),
                    (CaseStatus::Cancelled, _) => println!("{label}  cancelled"),
                    (CaseStatus::Completed, Some(point)) => println!(
                        "{label}  {:.1} m/s at {:.1} Hz ({})",
                        point.velocity, point.frequency, point.method
                    ),
                    (CaseStatus::Completed, None) => println!("{label}  no flutter"),
                }
            }

            if let Some(output) = output {
                std::fs::write(&output, serde_json::to_string_pretty(&report)?)
                    .wrap_err_with(|| format!("Could not write {}", output.display()))?;
            }

            match report
                .governing()
                .and_then(|case| Some((case.case.index, case.critical()?)))
            {
                Some((index, point)) => {
                    println!("Governing case #{index}: {:.1} m/s", point.velocity)
                }
                None => println!("No case of study `{}` found flutter", report.name),
            }
        }
    }

    Ok(())
}
