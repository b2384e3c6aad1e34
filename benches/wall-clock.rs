use panel_flutter::{
    control::AnalysisControl,
    model::{FlowState, PanelSpecification, VelocityRange},
    selector::{Requirements, SolverSelector},
    solver::{
        doublet::{DlmParameters, DoubletLatticeSolver},
        piston::PistonTheorySolver,
    },
};
use tango_bench::{benchmark_fn, tango_benchmarks, tango_main, IntoBenchmarks};

fn flow(mach: f64) -> FlowState {
    FlowState {
        mach,
        altitude: 8000.0,
    }
}

pub fn dlm(chordwise: usize, spanwise: usize) -> DoubletLatticeSolver {
    DoubletLatticeSolver::new(DlmParameters {
        panels_chordwise: chordwise,
        panels_spanwise: spanwise,
        ..Default::default()
    })
}

pub fn run_sweep(solver: &DoubletLatticeSolver, points: usize) -> usize {
    solver
        .analyze_flutter(
            &PanelSpecification::default(),
            &flow(0.8),
            VelocityRange::new(50.0, 300.0).unwrap(),
            points,
            &AnalysisControl::default(),
        )
        .map(|points| points.len())
        .unwrap_or_default()
}

fn analytic_benchmark() -> impl IntoBenchmarks {
    [
        benchmark_fn("piston_solve", |b| {
            let panel = PanelSpecification::default();
            b.iter(move || PistonTheorySolver.solve(&panel, &flow(1.5)))
        }),
        benchmark_fn("selector_recommend", |b| {
            let panel = PanelSpecification::default();
            b.iter(move || SolverSelector.recommend(&panel, &flow(0.8), &Requirements::default()))
        }),
    ]
}

fn doublet_benchmark() -> impl IntoBenchmarks {
    [
        benchmark_fn("dlm_sweep_4x3", |b| {
            let solver = dlm(4, 3);
            b.iter(move || run_sweep(&solver, 5))
        }),
        benchmark_fn("dlm_sweep_8x6", |b| {
            let solver = dlm(8, 6);
            b.iter(move || run_sweep(&solver, 5))
        }),
        benchmark_fn("dlm_damping_8x6", |b| {
            let solver = dlm(8, 6);
            let panel = PanelSpecification::default();
            b.iter(move || solver.damping_at(&panel, &flow(0.8), 200.0))
        }),
    ]
}

tango_benchmarks!(analytic_benchmark(), doublet_benchmark());
tango_main!();
