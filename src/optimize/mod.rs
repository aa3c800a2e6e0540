//! Constrained optimization
//!
//! Minimizes a scalar objective over the bounded simplex
//! `{w : sum(w) = 1, min <= w_i <= max}`.

mod projected;

pub use projected::ProjectedGradientSolver;

use crate::error::{RiskError, RiskResult};
use serde::{Deserialize, Serialize};

/// Box bounds shared by every weight, plus the full-investment constraint
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimplexBounds {
    pub min: f64,
    pub max: f64,
    pub dimension: usize,
}

impl SimplexBounds {
    /// Validate that the bounded simplex is non-empty for `dimension` weights
    pub fn new(min: f64, max: f64, dimension: usize) -> RiskResult<Self> {
        if dimension == 0 {
            return Err(RiskError::config("optimization needs at least one asset"));
        }
        if !(0.0..=1.0).contains(&min) || !(0.0..=1.0).contains(&max) || min > max {
            return Err(RiskError::config(format!(
                "weight bounds must satisfy 0 <= min <= max <= 1, got [{}, {}]",
                min, max
            )));
        }
        let n = dimension as f64;
        if n * min > 1.0 + 1e-12 || n * max < 1.0 - 1e-12 {
            return Err(RiskError::config(format!(
                "weight bounds [{}, {}] cannot sum to 1 across {} assets",
                min, max, dimension
            )));
        }
        Ok(Self { min, max, dimension })
    }

    /// Euclidean projection onto the bounded simplex
    ///
    /// Finds the shift `tau` with `sum(clip(v_i - tau, min, max)) = 1` by
    /// bisection; the clipped sum is monotone in `tau`.
    pub fn project(&self, v: &[f64]) -> Vec<f64> {
        let clipped_sum =
            |tau: f64| -> f64 { v.iter().map(|x| (x - tau).clamp(self.min, self.max)).sum() };

        let v_min = v.iter().copied().fold(f64::INFINITY, f64::min);
        let v_max = v.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let mut lo = v_min - self.max;
        let mut hi = v_max - self.min;

        for _ in 0..200 {
            let mid = 0.5 * (lo + hi);
            if clipped_sum(mid) > 1.0 {
                lo = mid;
            } else {
                hi = mid;
            }
            if hi - lo < 1e-15 {
                break;
            }
        }

        let tau = 0.5 * (lo + hi);
        v.iter()
            .map(|x| (x - tau).clamp(self.min, self.max))
            .collect()
    }

    /// Equal weights, which are always feasible for valid bounds
    pub fn equal_weights(&self) -> Vec<f64> {
        vec![1.0 / self.dimension as f64; self.dimension]
    }
}

/// Outcome of a solver run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolverOutcome {
    pub weights: Vec<f64>,
    pub objective: f64,
    pub iterations: usize,
    pub converged: bool,
}

/// Minimizer over the bounded simplex
pub trait ConstrainedSolver: Send + Sync {
    /// Minimize `objective` starting from `x0`
    fn minimize(
        &self,
        objective: &dyn Fn(&[f64]) -> f64,
        x0: &[f64],
        bounds: &SimplexBounds,
    ) -> SolverOutcome;

    /// Solver name for logging
    fn name(&self) -> &'static str;
}
