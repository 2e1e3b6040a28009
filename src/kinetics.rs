//! Effective reaction-rate constant from concentration trajectories.
//!
//! Species whose concentration ends higher than it started are products;
//! every other species is a reactant. The rate is the product's formation
//! rate divided by the product of the reactant concentrations, averaged over
//! the consecutive sample intervals. Only the first product in species order
//! is used.

use std::fmt;

use log::{debug, info};
use ndarray::{s, Array1, ArrayView1};

use crate::concentration::ConcentrationMatrix;
use crate::error::{Result, SpectroError};

/// Role of a species in the reaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeciesRole {
    Product,
    Reactant,
}

impl fmt::Display for SpeciesRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpeciesRole::Product => write!(f, "product"),
            SpeciesRole::Reactant => write!(f, "reactant"),
        }
    }
}

/// Whether the last value of `series` is strictly greater than the first.
pub fn is_product(series: ArrayView1<'_, f64>) -> bool {
    let n = series.len();
    n > 1 && series[n - 1] > series[0]
}

/// Role of every species, in species order.
pub fn classify(matrix: &ConcentrationMatrix) -> Vec<SpeciesRole> {
    matrix
        .as_array()
        .rows()
        .into_iter()
        .map(|row| {
            if is_product(row) {
                SpeciesRole::Product
            } else {
                SpeciesRole::Reactant
            }
        })
        .collect()
}

/// A rate estimate with the species it was derived from.
#[derive(Debug, Clone, PartialEq)]
pub struct RateEstimate {
    pub product: String,
    pub reactants: Vec<String>,

    /// Mean of `instantaneous`
    pub rate: f64,

    /// Rate over each consecutive sample interval
    pub instantaneous: Array1<f64>,
}

/// Scalar reaction rate of the first product species.
pub fn reaction_rate(matrix: &ConcentrationMatrix, timeline: &Array1<f64>) -> Result<f64> {
    estimate_rate(matrix, timeline).map(|estimate| estimate.rate)
}

/// Reaction rate together with the product, reactants and per-interval rates.
///
/// Fails with [`SpectroError::NoProductFound`] when no species increases,
/// [`SpectroError::InvalidInput`] with fewer than two samples or a timeline
/// of the wrong length, and [`SpectroError::DegenerateRate`] on a zero time
/// step, a zero reactant concentration or a non-finite mean.
pub fn estimate_rate(matrix: &ConcentrationMatrix, timeline: &Array1<f64>) -> Result<RateEstimate> {
    let (_, samples) = matrix.shape();
    if timeline.len() != samples {
        return Err(SpectroError::InvalidInput(format!(
            "Timeline has {} entries for {} samples",
            timeline.len(),
            samples
        )));
    }
    if samples < 2 {
        return Err(SpectroError::InvalidInput(format!(
            "At least two samples are needed for a rate, got {samples}"
        )));
    }

    let roles = classify(matrix);
    let product_index = roles
        .iter()
        .position(|&role| role == SpeciesRole::Product)
        .ok_or(SpectroError::NoProductFound)?;

    let values = matrix.as_array();
    let product = values.row(product_index);
    let intervals = samples - 1;

    let mut derivative = Array1::zeros(intervals);
    for i in 0..intervals {
        let dt = timeline[i + 1] - timeline[i];
        if dt == 0.0 {
            return Err(SpectroError::DegenerateRate(format!(
                "Samples {} and {} share the time {} s",
                i,
                i + 1,
                timeline[i]
            )));
        }
        derivative[i] = (product[i + 1] - product[i]) / dt;
    }

    let mut reactant_product = Array1::<f64>::ones(intervals);
    let mut reactants = Vec::new();
    for (j, role) in roles.iter().enumerate() {
        if *role == SpeciesRole::Reactant {
            reactant_product *= &values.slice(s![j, ..intervals]);
            reactants.push(species_name(matrix, j));
        }
    }

    if let Some(i) = reactant_product.iter().position(|&v| v == 0.0) {
        return Err(SpectroError::DegenerateRate(format!(
            "Reactant concentration product is zero at sample {i}"
        )));
    }

    let instantaneous = derivative / &reactant_product;
    let rate = instantaneous.mean().unwrap_or(f64::NAN);
    if !rate.is_finite() {
        return Err(SpectroError::DegenerateRate(format!(
            "Mean rate is not finite ({rate})"
        )));
    }

    let product = species_name(matrix, product_index);
    debug!("Instantaneous rates for {}: {}", product, instantaneous);
    info!(
        "Reaction rate {:e} from product '{}' and reactants {:?}",
        rate, product, reactants
    );

    Ok(RateEstimate {
        product,
        reactants,
        rate,
        instantaneous,
    })
}

fn species_name(matrix: &ConcentrationMatrix, index: usize) -> String {
    matrix.species(index).unwrap_or_default().to_string()
}
