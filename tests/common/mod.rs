//! Synthetic experiments shared by the integration tests.

#![allow(dead_code)]

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};

use spectro_kinetics::data::{NamedSpectra, RawExperiment, RawMeasurement};

pub const FREQUENCY_MIN: f64 = 400.0;
pub const FREQUENCY_MAX: f64 = 500.0;
pub const FREQUENCY_STEP: f64 = 0.5;

/// First-order rate constant of the synthetic A -> B reaction, per second.
pub const RATE: f64 = 1.5e-4;

/// Initial concentration of A, micromolar.
pub const INITIAL: f64 = 200.0;

pub fn frequencies() -> Vec<f64> {
    let n = ((FREQUENCY_MAX - FREQUENCY_MIN) / FREQUENCY_STEP).ceil() as usize;
    (0..n).map(|i| FREQUENCY_MIN + i as f64 * FREQUENCY_STEP).collect()
}

fn band(frequencies: &[f64], center: f64, width: f64, height: f64) -> Vec<f64> {
    frequencies
        .iter()
        .map(|f| height * (-((f - center) / width).powi(2) / 2.0).exp())
        .collect()
}

/// Micromolar concentrations of A and B after `hours`.
pub fn concentrations_at(hours: f64) -> (f64, f64) {
    let a = INITIAL * (-RATE * hours * 3600.0).exp();
    (a, INITIAL - a)
}

/// An A -> B experiment sampled every `interval` hours.
///
/// `noise` is the standard deviation of additive Gaussian noise; zero gives
/// exact mixtures.
pub fn a_to_b_experiment(samples: usize, interval: f64, noise: f64, seed: u64) -> RawExperiment {
    let freqs = frequencies();
    let spectrum_a = band(&freqs, 430.0, 6.0, 0.01);
    let spectrum_b = band(&freqs, 470.0, 8.0, 0.008);

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let normal = Normal::new(0.0, noise).unwrap();

    let measurements = (0..samples)
        .map(|i| {
            let hours = i as f64 * interval;
            let (a, b) = concentrations_at(hours);
            let data = spectrum_a
                .iter()
                .zip(&spectrum_b)
                .map(|(sa, sb)| a * sa + b * sb + normal.sample(&mut rng))
                .collect();
            RawMeasurement { data, time: hours }
        })
        .collect();

    RawExperiment {
        title: "A to B".to_string(),
        frequency_max: FREQUENCY_MAX,
        frequency_min: FREQUENCY_MIN,
        frequency_step: FREQUENCY_STEP,
        pure_spectra: NamedSpectra(vec![
            ("A".to_string(), spectrum_a),
            ("B".to_string(), spectrum_b),
        ]),
        measurements,
    }
}

/// The rate the estimator reports for exact first-order data sampled every
/// `interval` hours.
pub fn expected_rate(interval: f64) -> f64 {
    let dt = interval * 3600.0;
    (1.0 - (-RATE * dt).exp()) / dt
}
