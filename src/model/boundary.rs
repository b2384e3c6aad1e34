//! Edge constraints and the stiffness/frequency corrections they imply
//!
//! A boundary condition is written as four letters, one per edge in the order leading,
//! trailing, left, right. `S` is simply supported, `C` clamped, `F` free and `E` elastic.

use std::fmt::Display;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Constraint applied along a single panel edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EdgeConstraint {
    /// No constraint
    Free,
    /// Zero displacement, free rotation
    SimplySupported,
    /// Zero displacement and rotation
    Clamped,
    /// Spring-supported edge
    Elastic,
}

impl EdgeConstraint {
    fn from_letter(letter: char) -> Option<Self> {
        match letter {
            'F' => Some(Self::Free),
            'S' => Some(Self::SimplySupported),
            'C' => Some(Self::Clamped),
            'E' => Some(Self::Elastic),
            _ => None,
        }
    }

    /// Letter used in boundary-condition codes
    pub fn letter(self) -> char {
        match self {
            Self::Free => 'F',
            Self::SimplySupported => 'S',
            Self::Clamped => 'C',
            Self::Elastic => 'E',
        }
    }

    /// Diagonal multiplier applied to boundary nodes of the discretized stiffness matrix
    pub fn penalty(self) -> f64 {
        match self {
            Self::Free => 0.1,
            Self::SimplySupported => 1.0,
            Self::Clamped => 10.0,
            Self::Elastic => 2.0,
        }
    }
}

/// Panel edges, in code order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    /// Upstream edge, `x = 0`
    Leading,
    /// Downstream edge, `x = length`
    Trailing,
    /// Spanwise edge at `y = 0`
    Left,
    /// Spanwise edge at `y = width`
    Right,
}

impl Edge {
    /// All edges in the order their letters appear in a code
    pub const ALL: [Edge; 4] = [Edge::Leading, Edge::Trailing, Edge::Left, Edge::Right];
}

/// Multipliers on the bending stiffness terms relative to all edges simply supported
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StiffnessFactors {
    /// Chordwise bending
    pub kxx: f64,
    /// Spanwise bending
    pub kyy: f64,
    /// Twisting
    pub kxy: f64,
}

/// Qualitative tendency of a configuration to flutter at low speed
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum FlutterTendency {
    /// Stiff enough to resist flutter
    Low,
    /// Typical simply supported behaviour
    Medium,
    /// Free edges lower the onset speed
    MediumHigh,
    /// Flutters readily
    High,
}

/// Expected difficulty of getting the eigenvalue iteration to converge
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ConvergenceDifficulty {
    /// Well separated modes
    Easy,
    /// Some mode crossing
    Medium,
    /// Closely spaced or rigid-like modes
    Difficult,
}

/// Descriptive metadata for a boundary condition
#[derive(Debug, Clone, Copy)]
pub struct ConditionInfo {
    /// Human readable name
    pub name: &'static str,
    /// One-line description of the constraint layout
    pub description: &'static str,
    /// Tendency to flutter at low speed
    pub flutter_tendency: FlutterTendency,
    /// Structural stiffness relative to all edges clamped
    pub relative_stiffness: f64,
    /// How hard the eigenvalue iteration converges
    pub convergence: ConvergenceDifficulty,
    /// Engineering remark shown alongside results
    pub notes: &'static str,
}

/// Why a boundary condition is being chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisIntent {
    /// Everyday screening
    General,
    /// Highest flutter speeds
    Conservative,
    /// Lowest flutter speeds
    Critical,
    /// Representative of a riveted skin panel
    Realistic,
    /// Skin panel on a wing box
    WingPanel,
    /// Hinged control surface
    ControlSurface,
    /// Comparison against published results
    Validation,
}

/// Canonical boundary-condition codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum BoundaryCondition {
    /// All edges simply supported
    #[default]
    Ssss,
    /// All edges clamped
    Cccc,
    /// Cantilever, clamped at the leading edge
    Cfff,
    /// Clamped leading edge, others simply supported
    Csss,
    /// Clamped chordwise edges, simply supported spanwise edges
    Ccss,
    /// Leading and left edges clamped, trailing and right edges free
    Cfcf,
    /// Simply supported with a free right edge
    Sssf,
    /// Clamped with a free right edge
    Cccf,
    /// Simply supported with a free trailing edge
    Sfss,
    /// Clamped with a free trailing edge
    Cfcc,
    /// All edges free
    Ffff,
}

impl BoundaryCondition {
    /// Every canonical code
    pub const ALL: [BoundaryCondition; 11] = [
        Self::Ssss,
        Self::Cccc,
        Self::Cfff,
        Self::Csss,
        Self::Ccss,
        Self::Cfcf,
        Self::Sssf,
        Self::Cccf,
        Self::Sfss,
        Self::Cfcc,
        Self::Ffff,
    ];

    /// Four-letter code
    pub fn code(self) -> &'static str {
        match self {
            Self::Ssss => "SSSS",
            Self::Cccc => "CCCC",
            Self::Cfff => "CFFF",
            Self::Csss => "CSSS",
            Self::Ccss => "CCSS",
            Self::Cfcf => "CFCF",
            Self::Sssf => "SSSF",
            Self::Cccf => "CCCF",
            Self::Sfss => "SFSS",
            Self::Cfcc => "CFCC",
            Self::Ffff => "FFFF",
        }
    }

    /// Parse a canonical code, ignoring case and surrounding whitespace
    pub fn from_code(code: &str) -> Option<Self> {
        let code = code.trim().to_ascii_uppercase();
        Self::ALL.into_iter().find(|bc| bc.code() == code)
    }

    /// Parse a code, falling back to [BoundaryCondition::Ssss] for anything unsupported
    pub fn resolve_code(code: &str) -> Self {
        Self::from_code(code).unwrap_or_else(|| {
            warn!(code, "unsupported boundary condition, using SSSS");
            Self::Ssss
        })
    }

    /// Canonical code whose edges match `edges`, if there is one
    pub fn from_edges(edges: [EdgeConstraint; 4]) -> Option<Self> {
        let code: String = edges.iter().map(|edge| edge.letter()).collect();
        Self::from_code(&code)
    }

    /// Constraint on each edge, in [Edge::ALL] order
    pub fn edges(self) -> [EdgeConstraint; 4] {
        let mut edges = [EdgeConstraint::SimplySupported; 4];
        for (edge, letter) in edges.iter_mut().zip(self.code().chars()) {
            if let Some(constraint) = EdgeConstraint::from_letter(letter) {
                *edge = constraint;
            }
        }
        edges
    }

    /// Constraint on a single edge
    pub fn edge(self, edge: Edge) -> EdgeConstraint {
        self.edges()[edge as usize]
    }

    /// Stiffness multipliers relative to [BoundaryCondition::Ssss]
    pub fn stiffness_factors(self) -> StiffnessFactors {
        let (kxx, kyy, kxy) = match self {
            Self::Ssss => (1.0, 1.0, 1.0),
            Self::Cccc => (2.56, 2.56, 1.8),
            Self::Cfff => (0.25, 0.1, 0.2),
            Self::Csss => (1.8, 1.2, 1.1),
            Self::Ccss => (2.0, 1.5, 1.3),
            Self::Cfcf => (1.5, 0.8, 0.9),
            Self::Sssf | Self::Sfss => (0.7, 1.0, 0.8),
            Self::Cccf | Self::Cfcc => (1.6, 2.2, 1.4),
            Self::Ffff => (0.05, 0.05, 0.05),
        };
        StiffnessFactors { kxx, kyy, kxy }
    }

    /// Natural frequency of mode `(m, n)` relative to the same mode with all edges simply
    /// supported. Modes without a tabulated value return 1.
    pub fn frequency_factor(self, m: u32, n: u32) -> f64 {
        match (self, (m, n)) {
            (Self::Ssss, (1, 1)) => 1.0,
            (Self::Ssss, (1, 2) | (2, 1)) => 2.25,
            (Self::Ssss, (2, 2)) => 4.0,
            (Self::Ssss, (1, 3) | (3, 1)) => 4.84,

            (Self::Cccc, (1, 1)) => 1.596,
            (Self::Cccc, (1, 2) | (2, 1)) => 2.93,
            (Self::Cccc, (2, 2)) => 4.64,
            (Self::Cccc, (1, 3) | (3, 1)) => 5.78,

            (Self::Cfff, (1, 0)) => 0.160,
            (Self::Cfff, (2, 0)) => 1.004,
            (Self::Cfff, (3, 0)) => 2.790,
            (Self::Cfff, (0, 1)) => 0.455,
            (Self::Cfff, (1, 1)) => 0.582,

            (Self::Csss, (1, 1)) => 1.248,
            (Self::Csss, (1, 2) | (2, 1)) => 2.68,
            (Self::Csss, (2, 2)) => 4.32,

            (Self::Ccss, (1, 1)) => 1.435,
            (Self::Ccss, (1, 2)) => 2.87,
            (Self::Ccss, (2, 1)) => 3.24,
            (Self::Ccss, (2, 2)) => 4.58,

            (Self::Sssf | Self::Sfss, (1, 1)) => 0.895,
            (Self::Sssf | Self::Sfss, (1, 2)) => 2.01,
            (Self::Sssf | Self::Sfss, (2, 1)) => 2.12,
            (Self::Sssf | Self::Sfss, (2, 2)) => 3.65,
            (Self::Sssf | Self::Sfss, (1, 0)) => 0.354,

            (Self::Cccf | Self::Cfcc, (1, 1)) => 1.127,
            (Self::Cccf | Self::Cfcc, (1, 2)) => 2.45,
            (Self::Cccf | Self::Cfcc, (2, 1)) => 2.89,
            (Self::Cccf | Self::Cfcc, (2, 2)) => 4.12,
            (Self::Cccf | Self::Cfcc, (1, 0)) => 0.428,

            _ => 1.0,
        }
    }

    /// Empirical critical dynamic pressure coefficient used by piston theory
    pub fn critical_coefficient(self) -> f64 {
        match self {
            Self::Ssss => 11.0,
            Self::Cccc => 15.0,
            Self::Cfff => 3.5,
            Self::Csss => 12.5,
            Self::Ccss => 13.5,
            Self::Cfcf => 9.0,
            Self::Sssf | Self::Sfss => 8.0,
            Self::Cccf | Self::Cfcc => 10.5,
            Self::Ffff => 2.0,
        }
    }

    /// Descriptive metadata
    pub fn info(self) -> ConditionInfo {
        use ConvergenceDifficulty as Conv;
        use FlutterTendency as Tend;

        let (name, description, flutter_tendency, relative_stiffness, convergence, notes) =
            match self {
                Self::Ssss => (
                    "Simply supported, all edges",
                    "Every edge simply supported",
                    Tend::Medium,
                    0.5,
                    Conv::Easy,
                    "Baseline configuration with well-known closed-form results",
                ),
                Self::Cccc => (
                    "Clamped, all edges",
                    "Every edge clamped, stiffest configuration",
                    Tend::Low,
                    1.0,
                    Conv::Easy,
                    "Gives the highest flutter speeds",
                ),
                Self::Cfff => (
                    "Cantilever",
                    "Leading edge clamped, remaining edges free",
                    Tend::High,
                    0.2,
                    Conv::Difficult,
                    "Gives the lowest flutter speeds",
                ),
                Self::Csss => (
                    "Clamped leading edge",
                    "Leading edge clamped, remaining edges simply supported",
                    Tend::Medium,
                    0.7,
                    Conv::Easy,
                    "Reasonable stand-in for a fastened skin panel",
                ),
                Self::Ccss => (
                    "Clamped chordwise edges",
                    "Leading and trailing edges clamped, spanwise edges simply supported",
                    Tend::Medium,
                    0.8,
                    Conv::Easy,
                    "Spanwise bending modes dominate",
                ),
                Self::Cfcf => (
                    "Clamped leading and left edges",
                    "Leading and left edges clamped, trailing and right edges free",
                    Tend::Medium,
                    0.6,
                    Conv::Medium,
                    "Behaves like an infinite strip",
                ),
                Self::Sssf => (
                    "Simply supported, free right edge",
                    "Right edge free, remaining edges simply supported",
                    Tend::High,
                    0.4,
                    Conv::Medium,
                    "The free edge drives flutter to low speeds",
                ),
                Self::Cccf => (
                    "Clamped, free right edge",
                    "Right edge free, remaining edges clamped",
                    Tend::MediumHigh,
                    0.6,
                    Conv::Medium,
                    "Stiff root with a flexible free edge",
                ),
                Self::Sfss => (
                    "Simply supported, free trailing edge",
                    "Trailing edge free, remaining edges simply supported",
                    Tend::High,
                    0.4,
                    Conv::Medium,
                    "The free trailing edge drives flutter to low speeds",
                ),
                Self::Cfcc => (
                    "Clamped, free trailing edge",
                    "Trailing edge free, remaining edges clamped",
                    Tend::MediumHigh,
                    0.6,
                    Conv::Medium,
                    "Stiff root with a flexible trailing edge",
                ),
                Self::Ffff => (
                    "Free, all edges",
                    "No edge constrained, validation use only",
                    Tend::High,
                    0.1,
                    Conv::Difficult,
                    "Rigid-body modes are present",
                ),
            };

        ConditionInfo {
            name,
            description,
            flutter_tendency,
            relative_stiffness,
            convergence,
            notes,
        }
    }

    /// Warnings an engineer should see before trusting results for this condition
    pub fn advisories(self) -> Vec<String> {
        let info = self.info();
        let mut advisories = Vec::new();

        if info.flutter_tendency == FlutterTendency::High {
            advisories.push("High flutter tendency, expect low flutter speeds".to_owned());
        }
        if info.convergence == ConvergenceDifficulty::Difficult {
            advisories.push("Convergence may be difficult, use a fine velocity sweep".to_owned());
        }
        match self {
            Self::Ffff => advisories
                .push("Free-free panel has rigid-body modes, results are indicative".to_owned()),
            Self::Cfff => {
                advisories.push("Cantilever is the most flutter-critical layout".to_owned())
            }
            _ => (),
        }
        advisories.push(info.notes.to_owned());

        advisories
    }

    /// Suggested boundary condition for an analysis intent
    pub fn recommend_for(intent: AnalysisIntent) -> Self {
        match intent {
            AnalysisIntent::General | AnalysisIntent::Validation => Self::Ssss,
            AnalysisIntent::Conservative => Self::Cccc,
            AnalysisIntent::Critical => Self::Cfff,
            AnalysisIntent::Realistic | AnalysisIntent::WingPanel => Self::Csss,
            AnalysisIntent::ControlSurface => Self::Ccss,
        }
    }

    /// Full profile for this code
    pub fn profile(self) -> BoundaryConditionProfile {
        BoundaryConditionProfile {
            condition: self,
            edges: self.edges(),
            stiffness: self.stiffness_factors(),
        }
    }
}

impl Display for BoundaryCondition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

impl From<String> for BoundaryCondition {
    fn from(code: String) -> Self {
        Self::resolve_code(&code)
    }
}

impl From<BoundaryCondition> for String {
    fn from(bc: BoundaryCondition) -> Self {
        bc.code().to_owned()
    }
}

/// Edge constraints and stiffness multipliers resolved from a code
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundaryConditionProfile {
    /// Canonical condition this profile was built from
    pub condition: BoundaryCondition,
    /// Constraint per edge, in [Edge::ALL] order
    pub edges: [EdgeConstraint; 4],
    /// Coefficients of the edge stiffness
    pub stiffness: StiffnessFactors,
}

impl BoundaryConditionProfile {
    /// Re-encode the edge constraints as a four-letter code
    pub fn code(&self) -> String {
        self.edges.iter().map(|edge| edge.letter()).collect()
    }

    /// See [BoundaryCondition::frequency_factor]
    pub fn frequency_factor(&self, m: u32, n: u32) -> f64 {
        self.condition.frequency_factor(m, n)
    }
}

/// Resolve a code to its profile. Unsupported codes resolve to all edges simply supported.
pub fn resolve(code: &str) -> BoundaryConditionProfile {
    BoundaryCondition::resolve_code(code).profile()
}

/// Stiffness multipliers for a code, with the same fallback as [resolve]
pub fn stiffness_factors(code: &str) -> StiffnessFactors {
    BoundaryCondition::resolve_code(code).stiffness_factors()
}

/// Modal frequency multiplier for a code, with the same fallback as [resolve]
pub fn frequency_factor(code: &str, m: u32, n: u32) -> f64 {
    BoundaryCondition::resolve_code(code).frequency_factor(m, n)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_round_trip() {
        for bc in BoundaryCondition::ALL {
            assert_eq!(resolve(bc.code()).code(), bc.code());
            assert_eq!(BoundaryCondition::from_edges(bc.edges()), Some(bc));
        }
    }

    #[test]
    fn unknown_code_falls_back() {
        let profile = resolve("XQZW");

        assert_eq!(profile.condition, BoundaryCondition::Ssss);
        assert_eq!(profile.edges, [EdgeConstraint::SimplySupported; 4]);
        assert_eq!(stiffness_factors("").kxx, 1.0);
    }

    #[test]
    fn codes_are_case_insensitive() {
        assert_eq!(BoundaryCondition::from_code(" cfff "), Some(BoundaryCondition::Cfff));
    }

    #[test]
    fn stiffness_ordering() {
        let clamped = stiffness_factors("CCCC");
        let simple = stiffness_factors("SSSS");
        let cantilever = stiffness_factors("CFFF");

        assert!(clamped.kxx > simple.kxx && simple.kxx > cantilever.kxx);
        assert!(clamped.kyy > simple.kyy && simple.kyy > cantilever.kyy);
        assert!(clamped.kxy > simple.kxy && simple.kxy > cantilever.kxy);
    }

    #[test]
    fn edges_follow_letters() {
        let cantilever = BoundaryCondition::Cfff;

        assert_eq!(cantilever.edge(Edge::Leading), EdgeConstraint::Clamped);
        assert_eq!(cantilever.edge(Edge::Trailing), EdgeConstraint::Free);
        assert_eq!(cantilever.edge(Edge::Right), EdgeConstraint::Free);
    }

    #[test]
    fn frequency_factors() {
        assert_eq!(frequency_factor("SSSS", 2, 1), 2.25);
        assert_eq!(frequency_factor("CFFF", 1, 0), 0.160);
        assert_eq!(frequency_factor("CCCC", 5, 5), 1.0);
    }

    #[test]
    fn serde_uses_codes() {
        let json = serde_json::to_string(&BoundaryCondition::Ccss).unwrap();
        assert_eq!(json, "\"CCSS\"");

        let parsed: BoundaryCondition = serde_json::from_str("\"bogus\"").unwrap();
        assert_eq!(parsed, BoundaryCondition::Ssss);
    }

    #[test]
    fn free_panel_warns_about_rigid_body_modes() {
        let advisories = BoundaryCondition::Ffff.advisories();
        assert!(advisories.iter().any(|a| a.contains("rigid-body")));
        assert_eq!(
            BoundaryCondition::recommend_for(AnalysisIntent::ControlSurface),
            BoundaryCondition::Ccss
        );
    }
}
