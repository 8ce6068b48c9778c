//! Radial basis function expansions fitted offline over scattered samples.

use glam::DVec2;
use serde::{Deserialize, Serialize};

use super::{Interpolant, InterpolantError, ParamDomain, ParamPoint};

/// Radial kernel `φ(r)`; `epsilon` is the shape parameter where one applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RbfKernel {
    /// r
    Linear,
    /// r^3
    Cubic,
    /// r^5
    Quintic,
    /// r^2 ln(r)
    ThinPlate,
    /// exp(-(r/ε)^2)
    Gaussian,
    /// sqrt(1 + (r/ε)^2)
    Multiquadric,
    /// 1 / sqrt(1 + (r/ε)^2)
    InverseMultiquadric,
}

impl RbfKernel {
    pub fn apply(self, r: f64, epsilon: f64) -> f64 {
        match self {
            RbfKernel::Linear => r,
            RbfKernel::Cubic => r * r * r,
            RbfKernel::Quintic => r.powi(5),
            RbfKernel::ThinPlate => {
                if r > 0.0 {
                    r * r * r.ln()
                } else {
                    0.0
                }
            }
            RbfKernel::Gaussian => (-(r / epsilon).powi(2)).exp(),
            RbfKernel::Multiquadric => (1.0 + (r / epsilon).powi(2)).sqrt(),
            RbfKernel::InverseMultiquadric => 1.0 / (1.0 + (r / epsilon).powi(2)).sqrt(),
        }
    }

    /// Whether the kernel reads the shape parameter.
    pub fn uses_epsilon(self) -> bool {
        matches!(
            self,
            RbfKernel::Gaussian | RbfKernel::Multiquadric | RbfKernel::InverseMultiquadric
        )
    }
}

/// `f(p) = Σ w_i φ(|S (p - c_i)|) + c0 + cv·v + ca·a`
///
/// `S` is a per-axis scale applied before distances are taken, so that
/// velocity (m/s) and angle (rad) can be weighted against each other. The
/// expansion is evaluated as-is outside the centers' bounding box.
#[derive(Debug, Clone, PartialEq)]
pub struct RbfInterpolant {
    centers: Vec<DVec2>,
    weights: Vec<f64>,
    kernel: RbfKernel,
    epsilon: f64,
    polynomial: Option<[f64; 3]>,
    scale: DVec2,
}

impl RbfInterpolant {
    pub fn new(
        centers: Vec<DVec2>,
        weights: Vec<f64>,
        kernel: RbfKernel,
        epsilon: f64,
    ) -> Result<Self, InterpolantError> {
        if centers.is_empty() {
            return Err(InterpolantError::NoCenters);
        }
        if centers.len() != weights.len() {
            return Err(InterpolantError::WeightCount {
                centers: centers.len(),
                weights: weights.len(),
            });
        }
        if kernel.uses_epsilon() && !(epsilon.is_finite() && epsilon > 0.0) {
            return Err(InterpolantError::InvalidEpsilon(epsilon));
        }
        Ok(Self {
            centers,
            weights,
            kernel,
            epsilon,
            polynomial: None,
            scale: DVec2::ONE,
        })
    }

    /// Adds a linear polynomial tail `[c0, cv, ca]`.
    pub fn with_polynomial(mut self, coefficients: [f64; 3]) -> Self {
        self.polynomial = Some(coefficients);
        self
    }

    /// Sets the per-axis distance scale `[velocity, angle]`.
    pub fn with_scale(mut self, scale: [f64; 2]) -> Result<Self, InterpolantError> {
        if !scale.iter().all(|s| s.is_finite() && *s > 0.0) {
            return Err(InterpolantError::InvalidScale(scale));
        }
        self.scale = DVec2::from_array(scale);
        Ok(self)
    }

    pub fn kernel(&self) -> RbfKernel {
        self.kernel
    }

    pub fn center_count(&self) -> usize {
        self.centers.len()
    }
}

impl Interpolant for RbfInterpolant {
    fn evaluate(&self, point: ParamPoint) -> f64 {
        let p = point.as_dvec2();
        let radial: f64 = self
            .centers
            .iter()
            .zip(&self.weights)
            .map(|(c, w)| w * self.kernel.apply(((p - *c) * self.scale).length(), self.epsilon))
            .sum();

        let tail = self
            .polynomial
            .map_or(0.0, |[c0, cv, ca]| c0 + cv * point.velocity + ca * point.angle);

        radial + tail
    }

    fn domain(&self) -> Option<ParamDomain> {
        let min = self.centers.iter().fold(DVec2::splat(f64::INFINITY), |m, c| m.min(*c));
        let max = self.centers.iter().fold(DVec2::splat(f64::NEG_INFINITY), |m, c| m.max(*c));
        Some(ParamDomain {
            velocity: (min.x, max.x),
            angle: (min.y, max.y),
            periodic_angle: false,
        })
    }
}
