//! Step calculation for the Levenberg-Marquardt algorithm.
//!
//! This module provides functionality for computing the Levenberg-Marquardt step,
//! which blends the Gauss-Newton and gradient descent steps.

use crate::error::{Result, SpectroError};
use crate::lm::trust_region::TrustRegion;
use ndarray::{Array1, Array2};

/// Result of a Levenberg-Marquardt step calculation.
#[derive(Debug, Clone)]
pub struct StepResult {
    /// The calculated step vector
    pub step: Array1<f64>,

    /// The predicted reduction in cost function value
    pub predicted_reduction: f64,
}

/// Handles step calculation for the Levenberg-Marquardt algorithm.
pub struct LmStep;

impl LmStep {
    /// Calculates the Levenberg-Marquardt step.
    ///
    /// Solves `(JᵀJ + λ·diag(JᵀJ)) δ = -Jᵀr` by Cholesky decomposition. When
    /// the damped matrix is not positive definite the step falls back to a
    /// damped gradient descent direction.
    ///
    /// # Arguments
    ///
    /// * `jacobian` - The Jacobian matrix at the current position
    /// * `residuals` - The residuals at the current position
    /// * `trust_region` - The trust region controller
    pub fn calculate_step(
        jacobian: &Array2<f64>,
        residuals: &Array1<f64>,
        trust_region: &TrustRegion,
    ) -> Result<StepResult> {
        if jacobian.nrows() != residuals.len() {
            return Err(SpectroError::DimensionMismatch(format!(
                "Jacobian has {} rows but there are {} residuals",
                jacobian.nrows(),
                residuals.len()
            )));
        }

        let j_t_j = jacobian.t().dot(jacobian);
        let j_t_r = jacobian.t().dot(residuals);

        // Marquardt scaling: damp each direction by its own curvature
        let mut augmented = j_t_j;
        for i in 0..augmented.nrows() {
            augmented[[i, i]] += trust_region.lambda * augmented[[i, i]].max(1e-10);
        }

        let rhs = -&j_t_r;
        let step = match Self::solve_cholesky(&augmented, &rhs) {
            Ok(step) => step,
            Err(_) => rhs * (1.0 / (trust_region.lambda + 1.0)),
        };

        let predicted_reduction = Self::predicted_reduction(jacobian, residuals, &step);

        Ok(StepResult {
            step,
            predicted_reduction,
        })
    }

    /// Solves the symmetric positive definite system `A x = b`.
    pub fn solve_cholesky(a: &Array2<f64>, b: &Array1<f64>) -> Result<Array1<f64>> {
        let n = a.nrows();
        if a.ncols() != n || b.len() != n {
            return Err(SpectroError::DimensionMismatch(format!(
                "Expected a square {n}x{n} system, got {:?} with rhs of length {}",
                a.shape(),
                b.len()
            )));
        }

        // Lower triangular factor, stored in place
        let mut l = a.clone();
        for k in 0..n {
            for j in 0..k {
                l[[k, k]] -= l[[k, j]] * l[[k, j]];
            }

            if !(l[[k, k]] > 0.0) {
                return Err(SpectroError::LinearAlgebraError(
                    "Matrix is not positive definite".to_string(),
                ));
            }

            let lkk = l[[k, k]].sqrt();
            l[[k, k]] = lkk;

            for i in k + 1..n {
                for j in 0..k {
                    l[[i, k]] -= l[[i, j]] * l[[k, j]];
                }
                l[[i, k]] /= lkk;
            }
        }

        // Forward substitution (L * y = b)
        let mut y = b.clone();
        for i in 0..n {
            for j in 0..i {
                y[i] -= l[[i, j]] * y[j];
            }
            y[i] /= l[[i, i]];
        }

        // Backward substitution (L^T * x = y)
        let mut x = Array1::zeros(n);
        for i in (0..n).rev() {
            x[i] = y[i];
            for j in (i + 1)..n {
                x[i] -= l[[j, i]] * x[j];
            }
            x[i] /= l[[i, i]];
        }

        Ok(x)
    }

    /// Cost reduction predicted by the local linear model, `‖r‖² - ‖r + Jδ‖²`.
    fn predicted_reduction(jacobian: &Array2<f64>, residuals: &Array1<f64>, step: &Array1<f64>) -> f64 {
        let linearized = residuals + &jacobian.dot(step);
        let current: f64 = residuals.iter().map(|r| r * r).sum();
        let predicted: f64 = linearized.iter().map(|r| r * r).sum();
        current - predicted
    }
}
