//! Coefficient evaluation and field reconstruction.

use std::ops::Range;

use rayon::prelude::*;

use crate::basis::BasisMatrix;
use crate::error::{LoadError, RomError};
use crate::field::Field;
use crate::interp::{BoxedInterpolant, ParamPoint};

/// Mode counts at or above this are evaluated on the rayon pool.
pub const PARALLEL_MODE_THRESHOLD: usize = 16;

/// Reconstructs the field at `point` from the first `modes` basis columns.
///
/// Pure and deterministic. `modes` must lie in `[1, min(M, interpolants.len())]`;
/// anything else is rejected with [`RomError::InvalidModeCount`] rather than
/// clamped. Out-of-grid points are passed straight to the interpolants.
pub fn reconstruct(
    mean: &[f64],
    basis: &BasisMatrix,
    interpolants: &[BoxedInterpolant],
    point: ParamPoint,
    modes: usize,
) -> Result<Field, RomError> {
    check_inputs(mean, basis, interpolants, modes)?;
    let coefficients = evaluate_coefficients(&interpolants[..modes], point);
    Ok(combine(mean, basis, &coefficients))
}

/// Same result as [`reconstruct`], computed on the calling thread only.
///
/// For callers that hold a lock while reconstructing on a rayon worker:
/// the parallel path could steal a task that waits on that same lock.
pub fn reconstruct_sequential(
    mean: &[f64],
    basis: &BasisMatrix,
    interpolants: &[BoxedInterpolant],
    point: ParamPoint,
    modes: usize,
) -> Result<Field, RomError> {
    check_inputs(mean, basis, interpolants, modes)?;
    let coefficients: Vec<f64> = interpolants[..modes].iter().map(|f| f.evaluate(point)).collect();
    let values = mean
        .iter()
        .zip(basis.as_slice().chunks_exact(basis.modes()))
        .map(|(m, row)| m + dot(&row[..modes], &coefficients))
        .collect();
    Ok(Field::from_values(values))
}

fn check_inputs(
    mean: &[f64],
    basis: &BasisMatrix,
    interpolants: &[BoxedInterpolant],
    modes: usize,
) -> Result<(), RomError> {
    let max = basis.modes().min(interpolants.len());
    if modes == 0 || modes > max {
        return Err(RomError::InvalidModeCount {
            requested: modes,
            max,
        });
    }
    if mean.len() != basis.rows() {
        return Err(LoadError::ShapeMismatch(format!(
            "mean field has {} points but basis has {} rows",
            mean.len(),
            basis.rows()
        ))
        .into());
    }
    Ok(())
}

/// Evaluates every interpolant at `point`; slot `i` always holds mode `i`.
pub fn evaluate_coefficients(interpolants: &[BoxedInterpolant], point: ParamPoint) -> Vec<f64> {
    if interpolants.len() >= PARALLEL_MODE_THRESHOLD {
        // Indexed collect keeps mode order regardless of completion order.
        interpolants.par_iter().map(|f| f.evaluate(point)).collect()
    } else {
        interpolants.iter().map(|f| f.evaluate(point)).collect()
    }
}

/// Computes `mean + basis[:, :k] · coefficients` with `k = coefficients.len()`.
///
/// Rows are independent and run in parallel; each row accumulates its modes
/// in index order, so the result does not depend on the thread count.
pub fn combine(mean: &[f64], basis: &BasisMatrix, coefficients: &[f64]) -> Field {
    let k = coefficients.len();
    debug_assert!(k <= basis.modes());

    let values = mean
        .par_iter()
        .zip(basis.as_slice().par_chunks_exact(basis.modes()))
        .map(|(m, row)| m + dot(&row[..k], coefficients))
        .collect();

    Field::from_values(values)
}

/// Per-point contribution of the modes in `range`, i.e.
/// `basis[:, range] · coefficients[range]`.
pub fn mode_contribution(basis: &BasisMatrix, coefficients: &[f64], range: Range<usize>) -> Vec<f64> {
    let coefficients = &coefficients[range.clone()];
    basis
        .as_slice()
        .par_chunks_exact(basis.modes())
        .map(|row| dot(&row[range.clone()], coefficients))
        .collect()
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basis::BasisStore;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    const TOL: f64 = 1e-9;

    fn toy_basis() -> (Vec<f64>, BasisMatrix) {
        let basis = BasisMatrix::from_rows(&[vec![1.0, 0.0], vec![0.0, 1.0], vec![1.0, 1.0]]).unwrap();
        (vec![10.0, 10.0, 10.0], basis)
    }

    fn toy_interpolants() -> Vec<BoxedInterpolant> {
        vec![
            Box::new(|v: f64, _a: f64| v) as BoxedInterpolant,
            Box::new(|_v: f64, a: f64| a / 10.0) as BoxedInterpolant,
        ]
    }

    /// Random store plus smooth random interpolants, `modes` of each.
    fn random_model(points: usize, modes: usize, seed: u64) -> (BasisStore, Vec<BoxedInterpolant>) {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mean = (0..points).map(|_| 300.0 + rng.random::<f64>() * 20.0).collect();
        let data = (0..points * modes).map(|_| rng.random::<f64>() * 2.0 - 1.0).collect();
        let basis = BasisMatrix::from_row_major(points, modes, data).unwrap();
        let store = BasisStore::new(mean, basis).unwrap();

        let interpolants = (0..modes)
            .map(|i| {
                let (a, b) = (rng.random::<f64>(), rng.random::<f64>());
                let scale = 1.0 / (i + 1) as f64;
                Box::new(move |v: f64, ang: f64| scale * (a * v + b * ang.sin())) as BoxedInterpolant
            })
            .collect();
        (store, interpolants)
    }

    #[test]
    fn test_end_to_end_small_field() {
        let (mean, basis) = toy_basis();
        let field = reconstruct(&mean, &basis, &toy_interpolants(), ParamPoint::new(10.0, 20.0), 2).unwrap();
        assert_eq!(field.values(), &[20.0, 12.0, 22.0]);
    }

    #[test]
    fn test_single_mode_is_mean_plus_first_column() {
        let (store, interpolants) = random_model(64, 8, 7);
        let point = ParamPoint::new(12.5, 1.1);
        let c0 = interpolants[0].evaluate(point);

        let field = reconstruct(store.mean(), store.basis(), &interpolants, point, 1).unwrap();
        for (i, value) in field.values().iter().enumerate() {
            let expected = store.mean()[i] + store.basis().get(i, 0) * c0;
            assert!((value - expected).abs() < TOL);
        }
    }

    #[test]
    fn test_adding_modes_only_adds_their_contribution() {
        let (store, interpolants) = random_model(128, 24, 11);
        let point = ParamPoint::new(7.0, 4.0);
        let coefficients = evaluate_coefficients(&interpolants, point);

        for (k1, k2) in [(1, 2), (3, 17), (10, 24)] {
            let low = reconstruct(store.mean(), store.basis(), &interpolants, point, k1).unwrap();
            let high = reconstruct(store.mean(), store.basis(), &interpolants, point, k2).unwrap();
            let extra = mode_contribution(store.basis(), &coefficients, k1..k2);
            for i in 0..store.field_len() {
                assert!((high.values()[i] - (low.values()[i] + extra[i])).abs() < TOL);
            }
        }
    }

    #[test]
    fn test_mode_count_bounds() {
        let (mean, basis) = toy_basis();
        let interpolants = toy_interpolants();
        let point = ParamPoint::new(10.0, 0.0);

        for k in [0, 3] {
            match reconstruct(&mean, &basis, &interpolants, point, k) {
                Err(RomError::InvalidModeCount { requested, max }) => {
                    assert_eq!(requested, k);
                    assert_eq!(max, 2);
                }
                other => panic!("expected InvalidModeCount, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_short_interpolant_list_limits_modes() {
        let (mean, basis) = toy_basis();
        let interpolants = vec![Box::new(|v: f64, _a: f64| v) as BoxedInterpolant];
        let result = reconstruct(&mean, &basis, &interpolants, ParamPoint::new(10.0, 0.0), 2);
        assert!(matches!(result, Err(RomError::InvalidModeCount { max: 1, .. })));
    }

    #[test]
    fn test_parallel_and_sequential_coefficients_agree() {
        let (_, interpolants) = random_model(4, PARALLEL_MODE_THRESHOLD * 3, 3);
        let point = ParamPoint::new(9.0, 2.0);
        let parallel = evaluate_coefficients(&interpolants, point);
        let sequential: Vec<f64> = interpolants.iter().map(|f| f.evaluate(point)).collect();
        assert_eq!(parallel, sequential);
    }

    #[test]
    fn test_sequential_reconstruction_is_bit_identical() {
        let (store, interpolants) = random_model(512, 32, 13);
        let point = ParamPoint::new(8.5, 3.3);
        for k in [1, 15, 16, 32] {
            let parallel = reconstruct(store.mean(), store.basis(), &interpolants, point, k).unwrap();
            let sequential = reconstruct_sequential(store.mean(), store.basis(), &interpolants, point, k).unwrap();
            assert_eq!(parallel, sequential);
        }
        assert!(matches!(
            reconstruct_sequential(store.mean(), store.basis(), &interpolants, point, 0),
            Err(RomError::InvalidModeCount { .. })
        ));
    }

    #[test]
    fn test_reconstruction_is_deterministic() {
        let (store, interpolants) = random_model(2048, 40, 5);
        let point = ParamPoint::new(14.0, 5.5);
        let a = reconstruct(store.mean(), store.basis(), &interpolants, point, 40).unwrap();
        let b = reconstruct(store.mean(), store.basis(), &interpolants, point, 40).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_out_of_grid_points_do_not_fail() {
        let (mean, basis) = toy_basis();
        let field = reconstruct(&mean, &basis, &toy_interpolants(), ParamPoint::new(-100.0, 1e6), 2);
        assert!(field.is_ok());
    }
}
