//! Reduced-order-model evaluation.
//!
//! A field is reconstructed as `mean + basis[:, :k] · c`, where `c[i]` is the
//! i-th interpolant of the active regime evaluated at the parameter point.

mod advisory;
mod evaluator;

pub use advisory::{domain_advisory, DomainAdvisory};
pub use evaluator::{
    combine, evaluate_coefficients, mode_contribution, reconstruct, reconstruct_sequential,
    PARALLEL_MODE_THRESHOLD,
};
