//! Writes a synthetic A -> B experiment file.
//!
//! A decays with first-order kinetics into B. Both species have Gaussian
//! absorption bands; measurements are their concentration-weighted sums plus
//! optional Gaussian noise.
//!
//! Usage:
//! ```bash
//! cargo run --bin generate_sample -- --output data.json --noise 0.002
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};

use spectro_kinetics::data::{frequency_grid, write_experiment, NamedSpectra, RawExperiment, RawMeasurement};

#[derive(Parser)]
#[command(name = "generate_sample")]
#[command(version, about = "Generate a synthetic A -> B experiment file", long_about = None)]
struct Cli {
    /// Output file
    #[arg(short, long, default_value = "data.json")]
    output: PathBuf,

    /// Number of measurements
    #[arg(long, default_value = "25")]
    samples: usize,

    /// Hours between measurements
    #[arg(long, default_value = "0.25")]
    interval: f64,

    /// First-order rate constant of A -> B, per second
    #[arg(long, default_value = "2e-4")]
    rate: f64,

    /// Initial concentration of A, micromolar
    #[arg(long, default_value = "150.0")]
    initial: f64,

    /// Standard deviation of the additive noise
    #[arg(long, default_value = "0.0")]
    noise: f64,

    /// Random seed
    #[arg(long, default_value = "42")]
    seed: u64,
}

const FREQUENCY_MIN: f64 = 400.0;
const FREQUENCY_MAX: f64 = 700.0;
const FREQUENCY_STEP: f64 = 0.5;

fn gaussian(x: f64, mu: f64, sigma: f64, amplitude: f64) -> f64 {
    amplitude * (-(x - mu).powi(2) / (2.0 * sigma.powi(2))).exp()
}

fn band_spectrum(frequencies: &[f64], bands: &[(f64, f64, f64)]) -> Vec<f64> {
    frequencies
        .iter()
        .map(|&f| bands.iter().map(|&(mu, sigma, amp)| gaussian(f, mu, sigma, amp)).sum())
        .collect()
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let noise = Normal::new(0.0, cli.noise).context("noise must be a finite, non-negative value")?;
    let mut rng = StdRng::seed_from_u64(cli.seed);

    let frequencies = frequency_grid(FREQUENCY_MIN, FREQUENCY_MAX, FREQUENCY_STEP)?.to_vec();
    let spectrum_a = band_spectrum(&frequencies, &[(480.0, 12.0, 0.010), (610.0, 20.0, 0.004)]);
    let spectrum_b = band_spectrum(&frequencies, &[(540.0, 15.0, 0.008), (650.0, 10.0, 0.006)]);

    let measurements = (0..cli.samples)
        .map(|i| {
            let hours = i as f64 * cli.interval;
            let a = cli.initial * (-cli.rate * hours * 3600.0).exp();
            let b = cli.initial - a;
            let data = spectrum_a
                .iter()
                .zip(&spectrum_b)
                .map(|(sa, sb)| a * sa + b * sb + noise.sample(&mut rng))
                .collect();
            RawMeasurement { data, time: hours }
        })
        .collect();

    let experiment = RawExperiment {
        title: "Synthetic A -> B".to_string(),
        frequency_max: FREQUENCY_MAX,
        frequency_min: FREQUENCY_MIN,
        frequency_step: FREQUENCY_STEP,
        pure_spectra: NamedSpectra(vec![
            ("A".to_string(), spectrum_a),
            ("B".to_string(), spectrum_b),
        ]),
        measurements,
    };

    write_experiment(&cli.output, &experiment)
        .with_context(|| format!("writing {}", cli.output.display()))?;
    log::info!(
        "Wrote {} measurements over {} frequencies to {}",
        cli.samples,
        frequencies.len(),
        cli.output.display()
    );

    Ok(())
}
