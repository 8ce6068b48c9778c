//! Bilinear interpolation over a rectilinear (velocity, angle) grid.

use std::f64::consts::TAU;

use super::{wrap_angle, Interpolant, InterpolantError, ParamDomain, ParamPoint};

/// Angle axes spanning one turn to within this tolerance are treated as periodic.
const PERIOD_TOLERANCE: f64 = 1e-6;

/// Coefficient samples on a rectilinear simulation grid.
///
/// Extrapolation policy: velocities outside the sampled range are clamped to
/// the nearest edge. If the angle axis closes on itself (last sample = first +
/// 2π) angles are wrapped into that turn; otherwise they are clamped too.
#[derive(Debug, Clone, PartialEq)]
pub struct GridInterpolant {
    velocities: Vec<f64>,
    angles: Vec<f64>,
    /// Velocity-major: `values[i * angles.len() + j]`.
    values: Vec<f64>,
    periodic: bool,
}

impl GridInterpolant {
    /// Creates an interpolant from sampled values in velocity-major order.
    pub fn new(velocities: Vec<f64>, angles: Vec<f64>, values: Vec<f64>) -> Result<Self, InterpolantError> {
        check_axis(&velocities, "velocity")?;
        check_axis(&angles, "angle")?;

        let expected = velocities.len() * angles.len();
        if values.len() != expected {
            return Err(InterpolantError::ValueCount {
                expected,
                found: values.len(),
            });
        }

        let periodic = angles.len() > 1
            && (angles[angles.len() - 1] - angles[0] - TAU).abs() < PERIOD_TOLERANCE;

        Ok(Self {
            velocities,
            angles,
            values,
            periodic,
        })
    }

    /// Samples `f(velocity, angle)` at every grid node.
    pub fn from_fn<F>(velocities: Vec<f64>, angles: Vec<f64>, f: F) -> Result<Self, InterpolantError>
    where
        F: Fn(f64, f64) -> f64,
    {
        let values = velocities
            .iter()
            .flat_map(|&v| angles.iter().map(move |&a| (v, a)))
            .map(|(v, a)| f(v, a))
            .collect();
        Self::new(velocities, angles, values)
    }

    pub fn velocities(&self) -> &[f64] {
        &self.velocities
    }

    pub fn angles(&self) -> &[f64] {
        &self.angles
    }

    /// Grid values in velocity-major order.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// True if the angle axis wraps around.
    pub fn is_periodic(&self) -> bool {
        self.periodic
    }

    fn node(&self, i: usize, j: usize) -> f64 {
        self.values[i * self.angles.len() + j]
    }
}

impl Interpolant for GridInterpolant {
    fn evaluate(&self, point: ParamPoint) -> f64 {
        let a_lo = self.angles[0];
        let a_hi = self.angles[self.angles.len() - 1];

        let angle = if self.periodic {
            wrap_angle(point.angle, a_lo)
        } else {
            point.angle
        };

        let (i0, i1, tv) = locate(&self.velocities, point.velocity);
        let (j0, j1, ta) = locate(&self.angles, angle.clamp(a_lo, a_hi));

        let low = self.node(i0, j0) * (1.0 - ta) + self.node(i0, j1) * ta;
        let high = self.node(i1, j0) * (1.0 - ta) + self.node(i1, j1) * ta;
        low * (1.0 - tv) + high * tv
    }

    fn domain(&self) -> Option<ParamDomain> {
        Some(ParamDomain {
            velocity: (self.velocities[0], self.velocities[self.velocities.len() - 1]),
            angle: (self.angles[0], self.angles[self.angles.len() - 1]),
            periodic_angle: self.periodic,
        })
    }
}

fn check_axis(axis: &[f64], name: &'static str) -> Result<(), InterpolantError> {
    if axis.is_empty() {
        return Err(InterpolantError::EmptyAxis(name));
    }
    let finite = axis.iter().all(|x| x.is_finite());
    let increasing = axis.windows(2).all(|w| w[0] < w[1]);
    if !finite || !increasing {
        return Err(InterpolantError::AxisNotIncreasing(name));
    }
    Ok(())
}

/// Finds the bracketing interval `(lo, hi, t)` for `x`, clamped to the axis ends.
fn locate(axis: &[f64], x: f64) -> (usize, usize, f64) {
    let n = axis.len();
    if n == 1 {
        return (0, 0, 0.0);
    }
    let hi = axis.partition_point(|&s| s <= x).clamp(1, n - 1);
    let lo = hi - 1;
    let t = ((x - axis[lo]) / (axis[hi] - axis[lo])).clamp(0.0, 1.0);
    (lo, hi, t)
}
