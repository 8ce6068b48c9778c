//! Serialized form of fitted interpolants, as written by the offline stage.

use glam::DVec2;
use serde::{Deserialize, Serialize};

use super::{
    BoxedInterpolant, ConstantInterpolant, GridInterpolant, InterpolantError, RbfInterpolant,
    RbfKernel,
};

fn default_epsilon() -> f64 {
    1.0
}

fn unit_scale() -> [f64; 2] {
    [1.0, 1.0]
}

/// One fitted interpolant, tagged by `kind` in JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InterpolantSpec {
    /// Samples on a rectilinear grid; `values` is velocity-major.
    Grid {
        velocities: Vec<f64>,
        angles: Vec<f64>,
        values: Vec<f64>,
    },
    /// Radial basis expansion over scattered `[velocity, angle]` centers.
    Rbf {
        centers: Vec<[f64; 2]>,
        weights: Vec<f64>,
        kernel: RbfKernel,
        #[serde(default = "default_epsilon")]
        epsilon: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        polynomial: Option<[f64; 3]>,
        #[serde(default = "unit_scale")]
        scale: [f64; 2],
    },
    /// Parameter-independent coefficient.
    Constant { value: f64 },
}

impl InterpolantSpec {
    /// Builds the evaluable interpolant.
    pub fn build(&self) -> Result<BoxedInterpolant, InterpolantError> {
        match self {
            InterpolantSpec::Grid {
                velocities,
                angles,
                values,
            } => Ok(Box::new(GridInterpolant::new(
                velocities.clone(),
                angles.clone(),
                values.clone(),
            )?)),
            InterpolantSpec::Rbf {
                centers,
                weights,
                kernel,
                epsilon,
                polynomial,
                scale,
            } => {
                let centers = centers.iter().map(|c| DVec2::from_array(*c)).collect();
                let mut rbf = RbfInterpolant::new(centers, weights.clone(), *kernel, *epsilon)?
                    .with_scale(*scale)?;
                if let Some(poly) = polynomial {
                    rbf = rbf.with_polynomial(*poly);
                }
                Ok(Box::new(rbf))
            }
            InterpolantSpec::Constant { value } => Ok(Box::new(ConstantInterpolant(*value))),
        }
    }
}

impl From<&GridInterpolant> for InterpolantSpec {
    fn from(grid: &GridInterpolant) -> Self {
        InterpolantSpec::Grid {
            velocities: grid.velocities().to_vec(),
            angles: grid.angles().to_vec(),
            values: grid.values().to_vec(),
        }
    }
}
