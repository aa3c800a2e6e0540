//! Projected gradient descent with Armijo backtracking

use super::{ConstrainedSolver, SimplexBounds, SolverOutcome};

/// Projected gradient solver with finite-difference gradients
///
/// Each iteration takes a gradient step, projects back onto the bounded
/// simplex and backtracks until the Armijo condition holds. The run stops
/// when the objective or the iterate stops moving, or at `max_iterations`.
#[derive(Debug, Clone)]
pub struct ProjectedGradientSolver {
    /// Iteration cap
    pub max_iterations: usize,
    /// Relative objective change treated as converged
    pub tolerance: f64,
    /// Finite-difference step for the gradient
    pub gradient_step: f64,
}

impl ProjectedGradientSolver {
    pub fn new(max_iterations: usize, tolerance: f64) -> Self {
        Self {
            max_iterations,
            tolerance,
            gradient_step: 1e-7,
        }
    }

    fn gradient(&self, objective: &dyn Fn(&[f64]) -> f64, x: &[f64]) -> Vec<f64> {
        let h = self.gradient_step;
        let mut probe = x.to_vec();
        (0..x.len())
            .map(|i| {
                probe[i] = x[i] + h;
                let up = objective(&probe);
                probe[i] = x[i] - h;
                let down = objective(&probe);
                probe[i] = x[i];
                (up - down) / (2.0 * h)
            })
            .collect()
    }
}

impl Default for ProjectedGradientSolver {
    fn default() -> Self {
        Self::new(1000, 1e-12)
    }
}

const ARMIJO_C: f64 = 1e-4;
const MAX_BACKTRACKS: usize = 60;
const MAX_STEP: f64 = 1e4;
const STEP_TOLERANCE: f64 = 1e-10;

impl ConstrainedSolver for ProjectedGradientSolver {
    fn minimize(
        &self,
        objective: &dyn Fn(&[f64]) -> f64,
        x0: &[f64],
        bounds: &SimplexBounds,
    ) -> SolverOutcome {
        let mut x = bounds.project(x0);
        let mut fx = objective(&x);
        let mut step = 1.0;

        for iteration in 1..=self.max_iterations {
            let grad = self.gradient(objective, &x);

            let mut accepted = None;
            let mut trial_step = step;
            for _ in 0..MAX_BACKTRACKS {
                let candidate: Vec<f64> = x
                    .iter()
                    .zip(&grad)
                    .map(|(xi, gi)| xi - trial_step * gi)
                    .collect();
                let candidate = bounds.project(&candidate);
                let decrease: f64 = grad
                    .iter()
                    .zip(x.iter().zip(&candidate))
                    .map(|(g, (xi, ci))| g * (xi - ci))
                    .sum();
                let f_candidate = objective(&candidate);
                if f_candidate.is_finite() && f_candidate <= fx - ARMIJO_C * decrease {
                    accepted = Some((candidate, f_candidate));
                    break;
                }
                trial_step *= 0.5;
            }

            let Some((next, f_next)) = accepted else {
                // no descent direction left at working precision
                return SolverOutcome {
                    weights: x,
                    objective: fx,
                    iterations: iteration,
                    converged: true,
                };
            };

            let moved = x
                .iter()
                .zip(&next)
                .map(|(a, b)| (a - b).abs())
                .fold(0.0, f64::max);
            let change = (fx - f_next).abs();

            x = next;
            fx = f_next;
            step = (trial_step * 2.0).min(MAX_STEP);

            if change <= self.tolerance * fx.abs().max(1.0) || moved <= STEP_TOLERANCE {
                return SolverOutcome {
                    weights: x,
                    objective: fx,
                    iterations: iteration,
                    converged: true,
                };
            }
        }

        SolverOutcome {
            weights: x,
            objective: fx,
            iterations: self.max_iterations,
            converged: false,
        }
    }

    fn name(&self) -> &'static str {
        "projected-gradient"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimizes_quadratic() {
        // minimize sum (w_i - t_i)^2 with a feasible target
        let target = [0.2, 0.3, 0.5];
        let objective = |w: &[f64]| -> f64 {
            w.iter()
                .zip(&target)
                .map(|(a, b)| (a - b).powi(2))
                .sum()
        };
        let bounds = SimplexBounds::new(0.0, 1.0, 3).unwrap();
        let outcome = ProjectedGradientSolver::default().minimize(&objective, &[1.0 / 3.0; 3], &bounds);
        assert!(outcome.converged);
        for (w, t) in outcome.weights.iter().zip(&target) {
            assert!((w - t).abs() < 1e-5, "{} vs {}", w, t);
        }
    }

    #[test]
    fn test_respects_upper_bound() {
        // push all weight to asset 0, capped at 0.6
        let objective = |w: &[f64]| -> f64 { -w[0] };
        let bounds = SimplexBounds::new(0.0, 0.6, 2).unwrap();
        let outcome = ProjectedGradientSolver::default().minimize(&objective, &[0.5, 0.5], &bounds);
        assert!((outcome.weights[0] - 0.6).abs() < 1e-6);
        assert!((outcome.weights[1] - 0.4).abs() < 1e-6);
    }

    #[test]
    fn test_iteration_cap_reports_non_convergence() {
        let objective = |w: &[f64]| -> f64 { (w[0] - 0.9).powi(2) };
        let bounds = SimplexBounds::new(0.0, 1.0, 2).unwrap();
        let solver = ProjectedGradientSolver {
            max_iterations: 0,
            ..ProjectedGradientSolver::default()
        };
        let outcome = solver.minimize(&objective, &[0.5, 0.5], &bounds);
        assert!(!outcome.converged);
        assert_eq!(outcome.iterations, 0);
    }
}
