//! Implementation of the Levenberg-Marquardt algorithm.
//!
//! This module contains the driver loop for nonlinear least-squares
//! optimization: evaluate, step, accept or reject, test for convergence.

use ndarray::{Array1, Array2};
use std::fmt;

use crate::error::{Result, SpectroError};
use crate::problem::Problem;

use super::config::LmConfig;
use super::convergence::{ConvergenceCriteria, ConvergenceStatus};
use super::step::{LmStep, StepResult};
use super::trust_region::TrustRegion;

/// Result of the Levenberg-Marquardt optimization.
#[derive(Debug, Clone)]
pub struct LmResult {
    /// Optimized parameter values
    pub params: Array1<f64>,

    /// Residuals at the solution
    pub residuals: Array1<f64>,

    /// Sum of squared residuals
    pub cost: f64,

    /// Number of accepted steps
    pub iterations: usize,

    /// Number of function evaluations
    pub func_evals: usize,

    /// Terminal state of the run
    pub status: ConvergenceStatus,

    /// Whether the optimization converged
    pub success: bool,

    /// A message describing the result
    pub message: String,
}

impl fmt::Display for LmResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Optimization Result:")?;
        writeln!(f, "  Success: {}", self.success)?;
        writeln!(f, "  Message: {}", self.message)?;
        writeln!(f, "  Cost: {:.6e}", self.cost)?;
        writeln!(f, "  Iterations: {}", self.iterations)?;
        writeln!(f, "  Function evaluations: {}", self.func_evals)?;
        writeln!(f, "  Parameters: {:?}", self.params)?;
        Ok(())
    }
}

/// The Levenberg-Marquardt optimizer.
#[derive(Debug, Clone)]
pub struct LevenbergMarquardt {
    /// Configuration options
    config: LmConfig,
}

impl Default for LevenbergMarquardt {
    fn default() -> Self {
        Self::new()
    }
}

impl LevenbergMarquardt {
    /// Create a new Levenberg-Marquardt optimizer with default configuration.
    pub fn new() -> Self {
        Self {
            config: LmConfig::default(),
        }
    }

    /// Create a new Levenberg-Marquardt optimizer with the given configuration.
    pub fn with_config(config: LmConfig) -> Self {
        Self { config }
    }

    /// The active configuration.
    pub fn config(&self) -> &LmConfig {
        &self.config
    }

    /// Set the maximum number of iterations.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.config.max_iterations = max_iterations;
        self
    }

    /// Set the tolerance for change in the cost.
    pub fn with_ftol(mut self, ftol: f64) -> Self {
        self.config.ftol = ftol;
        self
    }

    /// Set the tolerance for change in parameter values.
    pub fn with_xtol(mut self, xtol: f64) -> Self {
        self.config.xtol = xtol;
        self
    }

    /// Set the tolerance for gradient norm.
    pub fn with_gtol(mut self, gtol: f64) -> Self {
        self.config.gtol = gtol;
        self
    }

    /// Set the initial value for the damping parameter.
    pub fn with_lambda(mut self, lambda: f64) -> Self {
        self.config.initial_lambda = lambda;
        self
    }

    /// Minimize the sum of squared residuals for the given problem.
    ///
    /// Running out of iterations or damping is reported through
    /// [`LmResult::status`] rather than as an error; errors are reserved for
    /// invalid input and failing problem evaluations.
    ///
    /// # Arguments
    ///
    /// * `problem` - The problem to solve
    /// * `initial_params` - Initial guess for the parameter values
    pub fn minimize<P: Problem>(&self, problem: &P, initial_params: Array1<f64>) -> Result<LmResult> {
        let n_params = problem.parameter_count();
        if initial_params.len() != n_params {
            return Err(SpectroError::DimensionMismatch(format!(
                "Expected {} parameters, got {}",
                n_params,
                initial_params.len()
            )));
        }

        let criteria = ConvergenceCriteria::new(
            self.config.xtol,
            self.config.ftol,
            self.config.gtol,
            self.config.max_iterations,
        );
        let mut trust_region = TrustRegion::from_config(&self.config);
        let jacobian_evals = if problem.has_custom_jacobian() { 0 } else { n_params };

        let mut params = initial_params;
        let mut residuals = problem.eval(&params)?;
        let mut cost = sum_of_squares(&residuals);
        let mut func_evals = 1;
        if !cost.is_finite() {
            return Err(SpectroError::NumericalError(
                "Residuals are not finite at the initial parameters".to_string(),
            ));
        }

        let mut jacobian = problem.jacobian(&params)?;
        func_evals += jacobian_evals;
        let mut gradient_norm = gradient_inf_norm(&jacobian, &residuals);

        let mut iterations = 0;
        let mut status = if criteria.gradient_converged(gradient_norm) {
            ConvergenceStatus::GradientConvergence
        } else if self.config.max_iterations == 0 {
            ConvergenceStatus::MaxIterationsReached
        } else {
            ConvergenceStatus::Running
        };

        while !status.is_terminated() {
            let StepResult {
                step,
                predicted_reduction,
            } = LmStep::calculate_step(&jacobian, &residuals, &trust_region)?;

            let new_params = &params + &step;
            let new_residuals = problem.eval(&new_params)?;
            func_evals += 1;
            let new_cost = sum_of_squares(&new_residuals);

            if !new_cost.is_finite() {
                trust_region.increase();
                if trust_region.is_saturated() {
                    status = ConvergenceStatus::NumericalError;
                }
                continue;
            }

            // Both the actual and the predicted relative reduction are below ftol
            let negligible = (cost - new_cost).abs() <= self.config.ftol * cost
                && predicted_reduction <= self.config.ftol * cost;

            let gain = TrustRegion::gain_ratio(cost, new_cost, predicted_reduction);
            if trust_region.update_lambda(gain) {
                iterations += 1;
                let next = criteria.check(
                    &params,
                    &new_params,
                    cost,
                    new_cost,
                    predicted_reduction,
                    gain,
                    gradient_norm,
                    iterations,
                );

                params = new_params;
                residuals = new_residuals;
                cost = new_cost;

                jacobian = problem.jacobian(&params)?;
                func_evals += jacobian_evals;
                gradient_norm = gradient_inf_norm(&jacobian, &residuals);

                status = if !next.is_converged() && criteria.gradient_converged(gradient_norm) {
                    ConvergenceStatus::GradientConvergence
                } else {
                    next
                };
            } else if negligible {
                status = ConvergenceStatus::FunctionValueConvergence;
            } else if trust_region.is_saturated() {
                status = ConvergenceStatus::DampingSaturated;
            }
        }

        let message = match status {
            ConvergenceStatus::GradientConvergence => format!(
                "{}: ||g|| = {:.2e} < {:.2e}",
                status, gradient_norm, self.config.gtol
            ),
            ConvergenceStatus::MaxIterationsReached => {
                format!("{} ({})", status, self.config.max_iterations)
            }
            _ => status.to_string(),
        };

        Ok(LmResult {
            params,
            residuals,
            cost,
            iterations,
            func_evals,
            success: status.is_converged(),
            status,
            message,
        })
    }
}

fn sum_of_squares(residuals: &Array1<f64>) -> f64 {
    residuals.iter().map(|r| r * r).sum()
}

/// Infinity norm of the gradient `Jᵀr`.
fn gradient_inf_norm(jacobian: &Array2<f64>, residuals: &Array1<f64>) -> f64 {
    jacobian
        .t()
        .dot(residuals)
        .iter()
        .fold(0.0, |acc, g| acc.max(g.abs()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    /// A simple linear model for testing: f(x) = a * x + b
    struct LinearModel {
        x_data: Array1<f64>,
        y_data: Array1<f64>,
    }

    impl Problem for LinearModel {
        fn eval(&self, params: &Array1<f64>) -> Result<Array1<f64>> {
            let (a, b) = (params[0], params[1]);
            Ok(self
                .x_data
                .iter()
                .zip(self.y_data.iter())
                .map(|(x, y)| a * x + b - y)
                .collect())
        }

        fn parameter_count(&self) -> usize {
            2
        }

        fn residual_count(&self) -> usize {
            self.x_data.len()
        }

        fn jacobian(&self, _params: &Array1<f64>) -> Result<Array2<f64>> {
            let n = self.x_data.len();
            let mut jac = Array2::zeros((n, 2));
            for i in 0..n {
                jac[[i, 0]] = self.x_data[i];
                jac[[i, 1]] = 1.0;
            }
            Ok(jac)
        }

        fn has_custom_jacobian(&self) -> bool {
            true
        }
    }

    /// Exponential decay y = a * exp(-k x), Jacobian by finite differences.
    struct DecayModel {
        x_data: Array1<f64>,
        y_data: Array1<f64>,
    }

    impl Problem for DecayModel {
        fn eval(&self, params: &Array1<f64>) -> Result<Array1<f64>> {
            let (a, k) = (params[0], params[1]);
            Ok(self
                .x_data
                .iter()
                .zip(self.y_data.iter())
                .map(|(x, y)| a * (-k * x).exp() - y)
                .collect())
        }

        fn parameter_count(&self) -> usize {
            2
        }

        fn residual_count(&self) -> usize {
            self.x_data.len()
        }
    }

    #[test]
    fn test_linear_fit() {
        // Approximately y = 2x + 3
        let model = LinearModel {
            x_data: array![1.0, 2.0, 3.0, 4.0, 5.0],
            y_data: array![5.1, 7.0, 8.9, 11.2, 13.0],
        };

        let lm = LevenbergMarquardt::new();
        let result = lm.minimize(&model, array![1.0, 1.0]).unwrap();

        assert!(result.success, "{}", result);
        assert_relative_eq!(result.params[0], 2.0, epsilon = 0.1);
        assert_relative_eq!(result.params[1], 3.0, epsilon = 0.1);
        assert!(result.cost < 0.1);
    }

    #[test]
    fn test_exact_linear_fit() {
        let x = Array1::linspace(0.0, 10.0, 21);
        let y = x.mapv(|v| 0.5 * v - 4.0);
        let model = LinearModel { x_data: x, y_data: y };

        let result = LevenbergMarquardt::new().minimize(&model, array![1.0, 1.0]).unwrap();

        assert!(result.success);
        assert_relative_eq!(result.params[0], 0.5, epsilon = 1e-9);
        assert_relative_eq!(result.params[1], -4.0, epsilon = 1e-8);
        assert!(result.cost < 1e-16);
    }

    #[test]
    fn test_nonlinear_fit_with_numeric_jacobian() {
        let x = Array1::linspace(0.0, 4.0, 30);
        let y = x.mapv(|v: f64| 3.0 * (-0.7 * v).exp());
        let model = DecayModel { x_data: x, y_data: y };

        let result = LevenbergMarquardt::new().minimize(&model, array![1.0, 1.0]).unwrap();

        assert!(result.success, "{}", result);
        assert_relative_eq!(result.params[0], 3.0, epsilon = 1e-5);
        assert_relative_eq!(result.params[1], 0.7, epsilon = 1e-5);
        assert!(result.func_evals > result.iterations);
    }

    #[test]
    fn test_already_at_minimum() {
        let model = LinearModel {
            x_data: array![1.0, 2.0, 3.0],
            y_data: array![3.0, 5.0, 7.0],
        };

        let result = LevenbergMarquardt::new().minimize(&model, array![2.0, 1.0]).unwrap();
        assert_eq!(result.status, ConvergenceStatus::GradientConvergence);
        assert_eq!(result.iterations, 0);
    }

    #[test]
    fn test_iteration_limit_is_reported() {
        let x = Array1::linspace(0.0, 4.0, 30);
        let y = x.mapv(|v: f64| 3.0 * (-0.7 * v).exp());
        let model = DecayModel { x_data: x, y_data: y };

        let result = LevenbergMarquardt::new()
            .with_max_iterations(1)
            .minimize(&model, array![10.0, 5.0])
            .unwrap();

        assert!(!result.success);
        assert_eq!(result.status, ConvergenceStatus::MaxIterationsReached);
    }

    #[test]
    fn test_parameter_count_mismatch() {
        let model = LinearModel {
            x_data: array![1.0, 2.0],
            y_data: array![1.0, 2.0],
        };
        let result = LevenbergMarquardt::new().minimize(&model, array![1.0]);
        assert!(matches!(result, Err(SpectroError::DimensionMismatch(_))));
    }
}
