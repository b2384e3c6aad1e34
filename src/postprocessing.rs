//! Reconciliation of critical points reported by different methods

use std::collections::BTreeMap;
use std::fmt::Display;

use serde::Serialize;

use crate::dynamic_interface::Method;
use crate::model::FlutterPoint;

/// Agreement between methods, judged on the largest deviation from the mean critical speed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ConfidenceLevel {
    /// Below 5 %
    High,
    /// Below 15 %
    Medium,
    /// Below 30 %
    Low,
    /// 30 % or more
    VeryLow,
}

impl ConfidenceLevel {
    /// Classify a deviation in percent
    pub fn from_deviation(percent: f64) -> Self {
        if percent < 5.0 {
            Self::High
        } else if percent < 15.0 {
            Self::Medium
        } else if percent < 30.0 {
            Self::Low
        } else {
            Self::VeryLow
        }
    }
}

impl Display for ConfidenceLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::High => "High",
            Self::Medium => "Medium",
            Self::Low => "Low",
            Self::VeryLow => "Very Low",
        })
    }
}

/// Critical point of a single method
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MethodSummary {
    /// Method that reported the point
    pub method: Method,
    /// Lowest-velocity point reported by the method
    pub critical: FlutterPoint,
    /// Distance from the cross-method mean velocity in percent
    pub deviation: f64,
}

/// Outcome of comparing two or more methods
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonResult {
    /// One entry per method with results, in method order
    pub methods: Vec<MethodSummary>,
    /// Mean critical velocity \[m/s\]
    pub mean_velocity: f64,
    /// Largest deviation in percent
    pub max_deviation: f64,
    /// Agreement between the methods
    pub confidence: ConfidenceLevel,
    /// Most conservative critical point over all methods
    pub governing: FlutterPoint,
}

/// Compare the lowest-velocity point of every method. At least two methods must have reported
/// points.
pub fn compare(results: &BTreeMap<Method, Vec<FlutterPoint>>) -> Option<ComparisonResult> {
    let criticals: Vec<(Method, FlutterPoint)> = results
        .iter()
        .filter_map(|(&method, points)| {
            points
                .iter()
                .min_by(|a, b| a.velocity.total_cmp(&b.velocity))
                .map(|point| (method, *point))
        })
        .collect();

    if criticals.len() < 2 {
        return None;
    }

    let mean_velocity =
        criticals.iter().map(|(_, p)| p.velocity).sum::<f64>() / criticals.len() as f64;

    let methods: Vec<MethodSummary> = criticals
        .iter()
        .map(|&(method, critical)| MethodSummary {
            method,
            critical,
            deviation: (critical.velocity - mean_velocity).abs() / mean_velocity * 100.0,
        })
        .collect();

    let max_deviation = methods.iter().map(|m| m.deviation).fold(0.0, f64::max);
    let governing = criticals
        .iter()
        .map(|(_, p)| *p)
        .min_by(|a, b| a.velocity.total_cmp(&b.velocity))?;

    Some(ComparisonResult {
        methods,
        mean_velocity,
        max_deviation,
        confidence: ConfidenceLevel::from_deviation(max_deviation),
        governing,
    })
}

impl Display for ComparisonResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Flutter method comparison")?;
        writeln!(f, "=========================")?;
        writeln!(
            f,
            "{:<18}{:>14}{:>14}{:>12}",
            "Method", "Speed [m/s]", "Freq [Hz]", "Dev [%]"
        )?;

        for summary in &self.methods {
            let tag = if summary.critical.degraded {
                " (fallback)"
            } else {
                ""
            };
            writeln!(
                f,
                "{:<18}{:>14.1}{:>14.1}{:>12.1}{tag}",
                summary.method.label(),
                summary.critical.velocity,
                summary.critical.frequency,
                summary.deviation,
            )?;
        }

        writeln!(f)?;
        writeln!(f, "Mean critical speed: {:.1} m/s", self.mean_velocity)?;
        writeln!(
            f,
            "Agreement: {} (max deviation {:.1} %)",
            self.confidence, self.max_deviation
        )?;
        write!(
            f,
            "Governing result: {:.1} m/s at {:.1} Hz from {}",
            self.governing.velocity, self.governing.frequency, self.governing.method
        )
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    fn point(method: Method, velocity: f64) -> FlutterPoint {
        FlutterPoint {
            velocity,
            frequency: 80.0,
            damping: -0.05,
            mode: 1,
            mach: 0.8,
            dynamic_pressure: 0.5 * 0.5 * velocity * velocity,
            method,
            degraded: false,
        }
    }

    #[test]
    fn two_methods() {
        let results = BTreeMap::from([
            (
                Method::PistonTheory,
                vec![point(Method::PistonTheory, 150.0)],
            ),
            (
                Method::DoubletLattice,
                vec![
                    point(Method::DoubletLattice, 260.0),
                    point(Method::DoubletLattice, 210.0),
                ],
            ),
        ]);

        let comparison = compare(&results).unwrap();

        assert_relative_eq!(comparison.mean_velocity, 180.0);
        for summary in &comparison.methods {
            assert_relative_eq!(summary.deviation, 100.0 / 6.0, epsilon = 1e-9);
        }
        assert_eq!(comparison.confidence, ConfidenceLevel::Low);
        assert_eq!(comparison.governing.velocity, 150.0);
        assert_eq!(comparison.governing.method, Method::PistonTheory);

        let report = comparison.to_string();
        assert!(report.contains("Agreement: Low"));
        assert!(report.contains("Governing result: 150.0 m/s"));
    }

    #[test]
    fn needs_two_methods_with_points() {
        let results = BTreeMap::from([
            (
                Method::PistonTheory,
                vec![point(Method::PistonTheory, 150.0)],
            ),
            (Method::DoubletLattice, Vec::new()),
        ]);

        assert!(compare(&results).is_none());
        assert!(compare(&BTreeMap::new()).is_none());
    }

    #[test]
    fn confidence_bands() {
        assert_eq!(ConfidenceLevel::from_deviation(4.9), ConfidenceLevel::High);
        assert_eq!(ConfidenceLevel::from_deviation(5.0), ConfidenceLevel::Medium);
        assert_eq!(ConfidenceLevel::from_deviation(29.9), ConfidenceLevel::Low);
        assert_eq!(ConfidenceLevel::from_deviation(30.0), ConfidenceLevel::VeryLow);
    }
}
