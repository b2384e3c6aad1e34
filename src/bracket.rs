//! Root refinement inside a sign-changing bracket
//!
//! Used to pin down the velocity at which the least-stable damping crosses zero.

use itertools::Itertools;
use thiserror::Error;

/// Bracket endpoints have the same sign, so no root is enclosed
#[derive(Error, Debug, Clone, Copy, PartialEq)]
#[error("bracket [{0}, {1}] does not enclose a sign change")]
pub struct InvalidBracket(pub f64, pub f64);

/// Function sample
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    /// Abscissa
    pub x: f64,
    /// Function value at `x`
    pub f: f64,
}

/// Refined root and the number of extra function evaluations it took
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BracketResult {
    /// Located root
    pub x: f64,
    /// Function evaluations spent
    pub evals: u64,
}

/// Shrinks a bracket until its relative width drops below a tolerance
pub trait BracketSearcher<E: From<InvalidBracket>> {
    /// Locate the root of `f` between `lower` and `upper`
    fn search<F: FnMut(f64) -> Result<f64, E>>(
        &self,
        lower: Point,
        upper: Point,
        f: F,
    ) -> Result<BracketResult, E>;
}

fn check_bracket(lower: Point, upper: Point) -> Result<(), InvalidBracket> {
    if lower.f.signum() == upper.f.signum() && lower.f != 0.0 && upper.f != 0.0 {
        Err(InvalidBracket(lower.x, upper.x))
    } else {
        Ok(())
    }
}

/// Consecutive samples between which `f` changes sign
pub fn sign_changes(
    points: impl IntoIterator<Item = Point>,
) -> impl Iterator<Item = (Point, Point)> {
    points
        .into_iter()
        .tuple_windows()
        .filter(|(a, b)| a.f.signum() != b.f.signum())
}

/// Interval halving
#[derive(Debug, Clone, Copy)]
pub struct Bisection {
    /// Relative tolerance on the root
    pub rel_epsilon: f64,
}

impl<E: From<InvalidBracket>> BracketSearcher<E> for Bisection {
    fn search<F: FnMut(f64) -> Result<f64, E>>(
        &self,
        mut lower: Point,
        mut upper: Point,
        mut f: F,
    ) -> Result<BracketResult, E> {
        check_bracket(lower, upper)?;

        let mut evals = 0;

        loop {
            let delta = (upper.x - lower.x).abs();
            let x = lower.x + 0.5 * (upper.x - lower.x);

            if delta <= f64::max(upper.x.abs(), lower.x.abs()) * (self.rel_epsilon + f64::EPSILON) {
                return Ok(BracketResult { x, evals });
            }

            let next = Point { x, f: f(x)? };

            evals += 1;

            if next.f == 0.0 {
                return Ok(BracketResult { x, evals });
            }

            if upper.f.signum() == next.f.signum() {
                upper = next;
            } else {
                lower = next;
            }
        }
    }
}

/// Brent's method, mixing inverse quadratic interpolation, secant steps and bisection
#[derive(Debug, Clone, Copy)]
pub struct Brent {
    /// Relative tolerance on the root
    pub rel_epsilon: f64,
}

impl<E: From<InvalidBracket>> BracketSearcher<E> for Brent {
    fn search<F: FnMut(f64) -> Result<f64, E>>(
        &self,
        lower: Point,
        upper: Point,
        mut f: F,
    ) -> Result<BracketResult, E> {
        check_bracket(lower, upper)?;

        let mut previous = lower;
        let mut current = upper;
        let mut counterpoint = current;
        let mut d = 0.0;
        let mut e = 0.0;
        let mut evals = 0;

        loop {
            if counterpoint.f.signum() == current.f.signum() {
                counterpoint = previous;
                d = current.x - previous.x;
                e = d;
            }

            if counterpoint.f.abs() < current.f.abs() {
                previous = current;
                (counterpoint, current) = (current, counterpoint);
            }

            let accuracy = 0.5 * (counterpoint.x - current.x);
            let tolerance =
                (f64::EPSILON + self.rel_epsilon) * f64::max(current.x.abs(), counterpoint.x.abs());

            if accuracy.abs() <= tolerance || current.f == 0.0 {
                return Ok(BracketResult {
                    x: current.x + accuracy,
                    evals,
                });
            }

            if e.abs() >= tolerance && previous.f.abs() >= current.f.abs() {
                let slope = current.f / previous.f;
                let mut p;
                let mut q;

                if previous.f == counterpoint.f {
                    // Secant
                    p = 2.0 * accuracy * slope;
                    q = 1.0 - slope;
                } else {
                    // Inverse quadratic
                    let slope_ac = previous.f / counterpoint.f;
                    let slope_bc = current.f / counterpoint.f;

                    p = slope
                        * (2.0 * accuracy * slope_ac * (slope_ac - slope_bc)
                            - (current.x - previous.x) * (slope_bc - 1.0));
                    q = (slope_ac - 1.0) * (slope_bc - 1.0) * (slope - 1.0);
                }

                if p > 0.0 {
                    q = -q;
                } else {
                    p = -p;
                }

                let min1 = 3.0 * accuracy * q - (tolerance * q).abs();
                let min2 = (e * q).abs();

                if 2.0 * p < f64::min(min1, min2) {
                    e = d;
                    d = p / q;
                } else {
                    d = accuracy;
                    e = d;
                }
            } else {
                d = accuracy;
                e = d;
            }

            previous = current;

            current.x += d;
            current.f = f(current.x)?;
            evals += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    fn cubic(x: f64) -> Result<f64, InvalidBracket> {
        Ok((x - 1.5) * (x * x + 1.0))
    }

    #[test]
    fn brent_finds_root() {
        let lower = Point { x: 0.0, f: -1.5 };
        let upper = Point { x: 4.0, f: cubic(4.0).unwrap() };

        let result = Brent { rel_epsilon: 1e-12 }.search(lower, upper, cubic).unwrap();

        assert_relative_eq!(result.x, 1.5, epsilon = 1e-10);
        assert!(result.evals < 30);
    }

    #[test]
    fn bisection_finds_root() {
        let lower = Point { x: 0.0, f: -1.5 };
        let upper = Point { x: 4.0, f: cubic(4.0).unwrap() };

        let result = Bisection { rel_epsilon: 1e-10 }.search(lower, upper, cubic).unwrap();

        assert_relative_eq!(result.x, 1.5, epsilon = 1e-8);
    }

    #[test]
    fn same_sign_is_rejected() {
        let lower = Point { x: 2.0, f: 1.0 };
        let upper = Point { x: 3.0, f: 2.0 };

        let result = Brent { rel_epsilon: 1e-12 }.search(lower, upper, cubic);

        assert_eq!(result, Err(InvalidBracket(2.0, 3.0)));
    }

    #[test]
    fn finds_sign_changes() {
        let points = [-1.0, 1.0, 2.0, -3.0]
            .into_iter()
            .enumerate()
            .map(|(x, f)| Point { x: x as f64, f });

        let changes: Vec<_> = sign_changes(points).map(|(a, b)| (a.x, b.x)).collect();

        assert_eq!(changes, vec![(0.0, 1.0), (2.0, 3.0)]);
    }
}
