//! Advisory diagnostics for queries outside the fitted parameter region.

use std::fmt;

use crate::interp::{BoxedInterpolant, ParamDomain, ParamPoint};

/// A query landed outside the region some interpolants were fitted over.
///
/// Purely informational: the interpolants' own extrapolation policy decided
/// the coefficients and reconstruction went ahead.
#[derive(Debug, Clone, PartialEq)]
pub struct DomainAdvisory {
    pub point: ParamPoint,
    /// Number of evaluated modes whose domain excludes the point.
    pub modes_outside: usize,
    /// Domain of the lowest such mode.
    pub domain: ParamDomain,
}

impl fmt::Display for DomainAdvisory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "point (v={:.3}, angle={:.4} rad) outside fitted domain v∈[{}, {}], angle∈[{:.4}, {:.4}] for {} mode(s)",
            self.point.velocity,
            self.point.angle,
            self.domain.velocity.0,
            self.domain.velocity.1,
            self.domain.angle.0,
            self.domain.angle.1,
            self.modes_outside
        )
    }
}

/// Checks `point` against each interpolant's fitted domain.
///
/// Interpolants without a domain never trigger an advisory.
pub fn domain_advisory(interpolants: &[BoxedInterpolant], point: ParamPoint) -> Option<DomainAdvisory> {
    let mut outside = interpolants
        .iter()
        .filter_map(|f| f.domain())
        .filter(|d| !d.contains(point));

    let first = outside.next()?;
    Some(DomainAdvisory {
        point,
        modes_outside: 1 + outside.count(),
        domain: first,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interp::{ConstantInterpolant, GridInterpolant};
    use std::f64::consts::TAU;

    fn grid_mode() -> BoxedInterpolant {
        let angles: Vec<f64> = (0..20).map(|i| TAU * i as f64 / 19.0).collect();
        Box::new(GridInterpolant::from_fn(vec![5.0, 10.0, 15.0], angles, |v, _| v).unwrap())
    }

    #[test]
    fn inside_grid_has_no_advisory() {
        let modes = vec![grid_mode(), grid_mode()];
        assert!(domain_advisory(&modes, ParamPoint::from_degrees(10.0, 360.0)).is_none());
    }

    #[test]
    fn outside_grid_counts_modes() {
        let modes = vec![grid_mode(), Box::new(ConstantInterpolant(1.0)) as BoxedInterpolant, grid_mode()];
        let advisory = domain_advisory(&modes, ParamPoint::new(20.0, 1.0)).unwrap();
        assert_eq!(advisory.modes_outside, 2);
        assert_eq!(advisory.domain.velocity, (5.0, 15.0));
        assert!(advisory.to_string().contains("outside fitted domain"));
    }
}
