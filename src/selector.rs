//! Heuristic choice of a flutter method for a panel and flight condition

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::dynamic_interface::Method;
use crate::model::{FlowState, PanelSpecification};

/// What the caller cares about when choosing a method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Requirements {
    /// Favor fast methods
    pub speed_priority: bool,
    /// Favor accurate methods
    pub accuracy_priority: bool,
    /// Early design trade study
    pub preliminary_design: bool,
}

impl Default for Requirements {
    fn default() -> Self {
        Self {
            speed_priority: false,
            accuracy_priority: false,
            preliminary_design: true,
        }
    }
}

/// Chosen method with the evidence behind it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SolverRecommendation {
    /// Highest scoring method
    pub method: Method,
    /// Winning score clamped to `[0, 1]`
    pub confidence: f64,
    /// First three scoring reasons, joined
    pub justification: String,
    /// Other methods scoring above 0.3, best first
    pub alternatives: Vec<Method>,
    /// Raw score of every method
    pub scores: BTreeMap<Method, f64>,
}

const ALTERNATIVE_THRESHOLD: f64 = 0.3;
const JUSTIFICATION_REASONS: usize = 3;

struct Scorecard {
    scores: BTreeMap<Method, f64>,
    reasons: Vec<&'static str>,
}

impl Scorecard {
    fn new() -> Self {
        Self {
            scores: Method::ALL.into_iter().map(|method| (method, 0.0)).collect(),
            reasons: Vec::new(),
        }
    }

    fn add(&mut self, reason: &'static str, awards: &[(Method, f64)]) {
        for &(method, score) in awards {
            *self.scores.entry(method).or_default() += score;
        }
        self.reasons.push(reason);
    }
}

/// Scores every method and picks the best
#[derive(Debug, Clone, Copy, Default)]
pub struct SolverSelector;

impl SolverSelector {
    /// Rank the methods for this panel and flight condition
    pub fn recommend(
        &self,
        panel: &PanelSpecification,
        flow: &FlowState,
        requirements: &Requirements,
    ) -> SolverRecommendation {
        use Method::*;

        let mut card = Scorecard::new();
        let mach = flow.mach;

        if mach > 1.2 {
            card.add(
                "Supersonic flow suits piston theory",
                &[(PistonTheory, 0.4), (HighFidelity, 0.3), (DoubletLattice, -0.2)],
            );
        } else if (0.3..=0.95).contains(&mach) {
            card.add(
                "Subsonic compressible flow suits doublet lattice",
                &[(DoubletLattice, 0.4), (HighFidelity, 0.35), (PistonTheory, 0.1)],
            );
        } else if mach < 0.3 {
            card.add(
                "Low-speed flow suits panel methods",
                &[(DoubletLattice, 0.2), (HighFidelity, 0.25)],
            );
        }

        let aspect = panel.aspect_ratio();
        if aspect > 3.0 {
            card.add("High aspect ratio panel", &[(PistonTheory, 0.2)]);
        } else if aspect < 1.5 {
            card.add("Low aspect ratio panel", &[(DoubletLattice, 0.2)]);
        }

        if panel.thickness_ratio() < 0.01 {
            card.add(
                "Thin panel assumption holds",
                &[(PistonTheory, 0.2), (DoubletLattice, 0.3)],
            );
        } else {
            card.add("Thick panel needs full structural model", &[(HighFidelity, 0.2)]);
        }

        if requirements.speed_priority {
            card.add("Speed priority", &[(PistonTheory, 0.3)]);
        }
        if requirements.accuracy_priority {
            card.add(
                "Accuracy priority",
                &[(DoubletLattice, 0.2), (HighFidelity, 0.3)],
            );
        }
        if requirements.preliminary_design {
            card.add(
                "Preliminary design favors quick methods",
                &[(PistonTheory, 0.2), (DoubletLattice, 0.1)],
            );
        }

        card.add("High-fidelity reference", &[(HighFidelity, 0.1)]);

        let preferred = if mach > 1.0 { PistonTheory } else { DoubletLattice };
        let mut ranked: Vec<(Method, f64)> = card.scores.iter().map(|(&m, &s)| (m, s)).collect();
        ranked.sort_by(|a, b| {
            b.1.total_cmp(&a.1)
                .then_with(|| (b.0 == preferred).cmp(&(a.0 == preferred)))
        });

        let (method, top) = ranked[0];
        let alternatives = ranked[1..]
            .iter()
            .filter(|(_, score)| *score > ALTERNATIVE_THRESHOLD)
            .map(|&(method, _)| method)
            .collect();

        debug!(?ranked, "solver scores");

        SolverRecommendation {
            method,
            confidence: top.clamp(0.0, 1.0),
            justification: card
                .reasons
                .iter()
                .take(JUSTIFICATION_REASONS)
                .copied()
                .collect::<Vec<_>>()
                .join("; "),
            alternatives,
            scores: card.scores,
        }
    }
}
