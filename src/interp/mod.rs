//! Per-mode coefficient interpolants over the (velocity, angle) plane.
//!
//! The offline stage fits one function per basis mode and regime; this module
//! only evaluates them. Concrete fitting methods (rectilinear grids, radial
//! basis expansions) sit behind the [`Interpolant`] trait so the evaluator never
//! depends on a specific interpolation algorithm.

mod grid;
mod rbf;
mod spec;

use std::f64::consts::TAU;

use glam::DVec2;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use grid::GridInterpolant;
pub use rbf::{RbfInterpolant, RbfKernel};
pub use spec::InterpolantSpec;

/// A point in parameter space: wind speed (m/s) and wind angle (radians).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParamPoint {
    pub velocity: f64,
    pub angle: f64,
}

impl ParamPoint {
    pub fn new(velocity: f64, angle: f64) -> Self {
        Self { velocity, angle }
    }

    /// Builds a point from an angle in degrees, the unit the UI reports.
    pub fn from_degrees(velocity: f64, angle_deg: f64) -> Self {
        Self::new(velocity, angle_deg.to_radians())
    }

    pub fn as_dvec2(&self) -> DVec2 {
        DVec2::new(self.velocity, self.angle)
    }
}

/// The parameter region an interpolant was fitted over.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamDomain {
    pub velocity: (f64, f64),
    pub angle: (f64, f64),
    /// The angle axis covers exactly one full turn, closing on itself.
    pub periodic_angle: bool,
}

impl ParamDomain {
    /// True if `point` lies inside the fitted region.
    ///
    /// Periodic domains reduce the angle into the fitted turn first.
    pub fn contains(&self, point: ParamPoint) -> bool {
        let (v_lo, v_hi) = self.velocity;
        let (a_lo, a_hi) = self.angle;
        let angle = if self.periodic_angle {
            wrap_angle(point.angle, a_lo)
        } else {
            point.angle
        };
        point.velocity >= v_lo && point.velocity <= v_hi && angle >= a_lo && angle <= a_hi
    }
}

/// Reduces `angle` into `[origin, origin + 2π)`.
pub fn wrap_angle(angle: f64, origin: f64) -> f64 {
    origin + (angle - origin).rem_euclid(TAU)
}

/// Errors raised when constructing an interpolant from fitted data.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InterpolantError {
    #[error("{0} axis is empty")]
    EmptyAxis(&'static str),
    #[error("{0} axis must be strictly increasing and finite")]
    AxisNotIncreasing(&'static str),
    #[error("expected {expected} grid values, found {found}")]
    ValueCount { expected: usize, found: usize },
    #[error("{centers} centers but {weights} weights")]
    WeightCount { centers: usize, weights: usize },
    #[error("no centers")]
    NoCenters,
    #[error("shape parameter must be positive and finite, got {0}")]
    InvalidEpsilon(f64),
    #[error("axis scale must be positive and finite, got {0:?}")]
    InvalidScale([f64; 2]),
}

/// An offline-fitted scalar function of a parameter point.
///
/// Implementations must be deterministic and must not panic for any input,
/// including points outside the fitted region; how they extrapolate is their
/// own policy.
pub trait Interpolant: Send + Sync {
    /// Evaluates the coefficient at `point`.
    fn evaluate(&self, point: ParamPoint) -> f64;

    /// The region the function was fitted over, if it has one.
    fn domain(&self) -> Option<ParamDomain> {
        None
    }
}

/// Boxed interpolant as stored in regime tables.
pub type BoxedInterpolant = Box<dyn Interpolant>;

impl<F> Interpolant for F
where
    F: Fn(f64, f64) -> f64 + Send + Sync,
{
    fn evaluate(&self, point: ParamPoint) -> f64 {
        self(point.velocity, point.angle)
    }
}

/// A mode whose coefficient does not depend on the parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstantInterpolant(pub f64);

impl Interpolant for ConstantInterpolant {
    fn evaluate(&self, _point: ParamPoint) -> f64 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn degrees_are_converted_to_radians() {
        let p = ParamPoint::from_degrees(10.0, 180.0);
        assert!((p.angle - PI).abs() < 1e-12);
        assert_eq!(p.as_dvec2(), DVec2::new(10.0, p.angle));
    }

    #[test]
    fn wrap_angle_reduces_into_one_turn() {
        assert!((wrap_angle(-PI / 2.0, 0.0) - 1.5 * PI).abs() < 1e-12);
        assert!(wrap_angle(TAU, 0.0).abs() < 1e-12);
        assert!((wrap_angle(5.0 * PI, 0.0) - PI).abs() < 1e-12);
    }

    #[test]
    fn periodic_domain_accepts_any_angle() {
        let domain = ParamDomain {
            velocity: (5.0, 15.0),
            angle: (0.0, TAU),
            periodic_angle: true,
        };
        assert!(domain.contains(ParamPoint::new(10.0, 7.0 * PI)));
        assert!(domain.contains(ParamPoint::new(10.0, -1.0)));
        assert!(!domain.contains(ParamPoint::new(4.0, 1.0)));
        assert!(!domain.contains(ParamPoint::new(f64::NAN, 1.0)));
    }

    #[test]
    fn bounded_domain_rejects_out_of_range_angles() {
        let domain = ParamDomain {
            velocity: (5.0, 15.0),
            angle: (0.0, PI),
            periodic_angle: false,
        };
        assert!(domain.contains(ParamPoint::new(5.0, PI)));
        assert!(!domain.contains(ParamPoint::new(5.0, PI + 0.1)));
    }

    #[test]
    fn closures_are_interpolants() {
        let f: BoxedInterpolant = Box::new(|v: f64, a: f64| v + a);
        assert_eq!(f.evaluate(ParamPoint::new(2.0, 0.5)), 2.5);
        assert!(f.domain().is_none());
        assert_eq!(ConstantInterpolant(3.0).evaluate(ParamPoint::new(0.0, 0.0)), 3.0);
    }
}
