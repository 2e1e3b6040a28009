//! Concentrations from measured spectra by linear-mixture fitting.
//!
//! Each measurement is modelled as `m ≈ Σ_j c_j S_j` where `S_j` are the
//! reference spectra. The coefficients `c_j` are solved per measurement with
//! the Levenberg-Marquardt solver and reported in moles. The opt-in
//! non-negative mode wraps those solves in an active-set loop.

use log::{debug, info, warn};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use rayon::prelude::*;

use crate::data::{ExperimentRecord, ReferenceSpectrum};
use crate::error::{Result, SpectroError};
use crate::lm::{LevenbergMarquardt, LmResult};
use crate::problem::Problem;

/// Fitted coefficients are micromolar; reported concentrations are molar.
pub const MICROMOLAR_TO_MOLAR: f64 = 1e-6;

/// Starting value of every coefficient.
pub const INITIAL_COEFFICIENT: f64 = 1.0;

/// Gradient threshold, relative to `max |Bᵀm|`, for a species to enter the
/// free set in non-negative mode.
const ACTIVE_SET_TOLERANCE: f64 = 1e-10;

/// Outer active-set rounds allowed per species.
const ACTIVE_SET_ROUNDS: usize = 3;

/// Residuals of one measurement against a weighted sum of reference spectra.
///
/// `basis` holds one reference spectrum per column.
pub struct MixtureProblem<'a> {
    basis: ArrayView2<'a, f64>,
    measurement: ArrayView1<'a, f64>,
}

impl<'a> MixtureProblem<'a> {
    pub fn new(basis: ArrayView2<'a, f64>, measurement: ArrayView1<'a, f64>) -> Result<Self> {
        if basis.nrows() != measurement.len() {
            return Err(SpectroError::DimensionMismatch(format!(
                "Reference spectra have {} values but the measurement has {}",
                basis.nrows(),
                measurement.len()
            )));
        }
        Ok(Self { basis, measurement })
    }
}

impl Problem for MixtureProblem<'_> {
    fn eval(&self, params: &Array1<f64>) -> Result<Array1<f64>> {
        if params.len() != self.basis.ncols() {
            return Err(SpectroError::DimensionMismatch(format!(
                "Expected {} coefficients, got {}",
                self.basis.ncols(),
                params.len()
            )));
        }
        Ok(self.basis.dot(params) - &self.measurement)
    }

    fn parameter_count(&self) -> usize {
        self.basis.ncols()
    }

    fn residual_count(&self) -> usize {
        self.measurement.len()
    }

    fn jacobian(&self, _params: &Array1<f64>) -> Result<Array2<f64>> {
        Ok(self.basis.to_owned())
    }

    fn has_custom_jacobian(&self) -> bool {
        true
    }
}

/// Stack reference spectra as the columns of a `(frequencies, species)` matrix.
pub fn reference_basis(references: &[ReferenceSpectrum]) -> Result<Array2<f64>> {
    let n_freq = references.first().map_or(0, |r| r.values.len());
    if let Some(bad) = references.iter().find(|r| r.values.len() != n_freq) {
        return Err(SpectroError::DimensionMismatch(format!(
            "Reference spectrum '{}' has {} values, expected {}",
            bad.name,
            bad.values.len(),
            n_freq
        )));
    }

    Ok(Array2::from_shape_fn((n_freq, references.len()), |(i, j)| {
        references[j].values[i]
    }))
}

/// Concentrations shaped `(species, time)`.
#[derive(Debug, Clone, PartialEq)]
pub struct ConcentrationMatrix {
    names: Vec<String>,
    values: Array2<f64>,
}

impl ConcentrationMatrix {
    /// One row per name; fails if the row count differs from `names.len()`.
    pub fn new(names: Vec<String>, values: Array2<f64>) -> Result<Self> {
        if values.nrows() != names.len() {
            return Err(SpectroError::DimensionMismatch(format!(
                "{} species names for {} concentration rows",
                names.len(),
                values.nrows()
            )));
        }
        Ok(Self { names, values })
    }

    pub fn species(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    pub fn row(&self, index: usize) -> Option<ArrayView1<'_, f64>> {
        (index < self.values.nrows()).then(|| self.values.row(index))
    }

    /// The concentration series of the species called `name`.
    pub fn series(&self, name: &str) -> Option<ArrayView1<'_, f64>> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| self.values.row(i))
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// `(species, samples)`
    pub fn shape(&self) -> (usize, usize) {
        self.values.dim()
    }

    pub fn as_array(&self) -> &Array2<f64> {
        &self.values
    }

    pub fn species_count(&self) -> usize {
        self.values.nrows()
    }

    pub fn sample_count(&self) -> usize {
        self.values.ncols()
    }
}

/// Fits every measurement of a record against its reference spectra.
#[derive(Debug, Clone, Default)]
pub struct ConcentrationEstimator {
    /// Solver used for each measurement
    pub lm: LevenbergMarquardt,

    /// Constrain coefficients to be non-negative
    pub non_negative: bool,

    /// Fit measurements on the rayon thread pool
    pub parallel: bool,
}

impl ConcentrationEstimator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_solver(mut self, lm: LevenbergMarquardt) -> Self {
        self.lm = lm;
        self
    }

    pub fn with_non_negative(mut self, non_negative: bool) -> Self {
        self.non_negative = non_negative;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Concentrations in moles for every species and measurement.
    ///
    /// A measurement whose fit does not converge aborts the whole estimate
    /// with [`SpectroError::FitNonConvergent`].
    pub fn estimate(&self, record: &ExperimentRecord) -> Result<ConcentrationMatrix> {
        let basis = reference_basis(record.reference_spectra())?;
        let measurements = record.measurements();
        info!(
            "Fitting {} measurements against {} reference spectra{}",
            measurements.len(),
            basis.ncols(),
            if self.parallel { " in parallel" } else { "" }
        );

        let coefficients: Vec<Array1<f64>> = if self.parallel {
            measurements
                .par_iter()
                .enumerate()
                .map(|(sample, m)| self.fit_with_basis(sample, basis.view(), m.view()))
                .collect::<Result<_>>()?
        } else {
            measurements
                .iter()
                .enumerate()
                .map(|(sample, m)| self.fit_with_basis(sample, basis.view(), m.view()))
                .collect::<Result<_>>()?
        };

        let names: Vec<String> = record.species_names().into_iter().map(String::from).collect();
        let mut values = Array2::zeros((names.len(), coefficients.len()));
        for (mut column, c) in values.axis_iter_mut(Axis(1)).zip(&coefficients) {
            column.assign(&(c * MICROMOLAR_TO_MOLAR));
        }

        ConcentrationMatrix::new(names, values)
    }

    /// Fit a single measurement, returning the unscaled coefficients in
    /// reference order.
    pub fn fit_measurement(
        &self,
        references: &[ReferenceSpectrum],
        measurement: &Array1<f64>,
    ) -> Result<Array1<f64>> {
        let basis = reference_basis(references)?;
        self.fit_with_basis(0, basis.view(), measurement.view())
    }

    fn fit_with_basis<'a>(
        &self,
        sample: usize,
        basis: ArrayView2<'a, f64>,
        measurement: ArrayView1<'a, f64>,
    ) -> Result<Array1<f64>> {
        let coefficients = if self.non_negative {
            self.fit_non_negative(sample, basis, measurement)?
        } else {
            self.solve(sample, basis, measurement)?
        };

        if coefficients.iter().any(|&c| c < 0.0) {
            warn!("Measurement {} has negative fitted coefficients: {}", sample, coefficients);
        }

        Ok(coefficients)
    }

    /// Unconstrained least squares of `measurement` against the columns of `basis`.
    fn solve<'a>(
        &self,
        sample: usize,
        basis: ArrayView2<'a, f64>,
        measurement: ArrayView1<'a, f64>,
    ) -> Result<Array1<f64>> {
        let problem = MixtureProblem::new(basis, measurement)?;
        let initial = Array1::from_elem(problem.parameter_count(), INITIAL_COEFFICIENT);
        let result = self.lm.minimize(&problem, initial)?;

        check_converged(sample, &result)?;
        debug!(
            "Measurement {}: {} iterations, cost {:.3e}, coefficients {}",
            sample, result.iterations, result.cost, result.params
        );

        Ok(result.params)
    }

    /// Lawson-Hanson active set: species enter the free set while the
    /// gradient `Bᵀ(m - Bc)` favours them, and leave it when the
    /// unconstrained subset solve would drive them below zero.
    fn fit_non_negative<'a>(
        &self,
        sample: usize,
        basis: ArrayView2<'a, f64>,
        measurement: ArrayView1<'a, f64>,
    ) -> Result<Array1<f64>> {
        let n = basis.ncols();
        let initial_gradient = basis.t().dot(&measurement);
        let tolerance = ACTIVE_SET_TOLERANCE
            * initial_gradient.iter().fold(0.0_f64, |acc, g| acc.max(g.abs())).max(1.0);

        let mut coefficients = Array1::<f64>::zeros(n);
        let mut free = vec![false; n];

        for _ in 0..ACTIVE_SET_ROUNDS * n.max(1) {
            let residual = &measurement - &basis.dot(&coefficients);
            let gradient = basis.t().dot(&residual);
            let entering = (0..n)
                .filter(|&j| !free[j] && gradient[j] > tolerance)
                .max_by(|&a, &b| gradient[a].total_cmp(&gradient[b]));
            let Some(entering) = entering else {
                debug!(
                    "Measurement {}: non-negative coefficients {}",
                    sample, coefficients
                );
                return Ok(coefficients);
            };
            free[entering] = true;

            // Each pass either accepts the subset solution or drops a species
            for _ in 0..n {
                let columns: Vec<usize> = (0..n).filter(|&j| free[j]).collect();
                if columns.is_empty() {
                    break;
                }
                let subset = basis.select(Axis(1), &columns);
                let z = self.solve(sample, subset.view(), measurement.view())?;

                if z.iter().all(|&v| v > 0.0) {
                    for (&j, &v) in columns.iter().zip(z.iter()) {
                        coefficients[j] = v;
                    }
                    break;
                }

                // Step toward z until the first coefficient reaches zero
                let (leaving, alpha) = columns
                    .iter()
                    .zip(z.iter())
                    .filter(|(_, &v)| !(v > 0.0))
                    .map(|(&j, &v)| {
                        let gap = coefficients[j] - v;
                        (j, if gap > 0.0 { coefficients[j] / gap } else { 0.0 })
                    })
                    .fold((columns[0], f64::INFINITY), |best, candidate| {
                        if candidate.1 < best.1 {
                            candidate
                        } else {
                            best
                        }
                    });
                for (&j, &v) in columns.iter().zip(z.iter()) {
                    coefficients[j] += alpha * (v - coefficients[j]);
                    if coefficients[j] <= 0.0 {
                        coefficients[j] = 0.0;
                        free[j] = false;
                    }
                }
                coefficients[leaving] = 0.0;
                free[leaving] = false;
            }
        }

        Err(SpectroError::FitNonConvergent {
            sample,
            message: format!(
                "Active set did not settle within {} rounds",
                ACTIVE_SET_ROUNDS * n.max(1)
            ),
        })
    }
}

fn check_converged(sample: usize, result: &LmResult) -> Result<()> {
    if result.success {
        Ok(())
    } else {
        Err(SpectroError::FitNonConvergent {
            sample,
            message: result.message.clone(),
        })
    }
}
