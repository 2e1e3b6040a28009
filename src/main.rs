//! Spectro-kinetics command line.
//!
//! Loads an experiment, prints the peaks of every reference spectrum and the
//! reaction rate estimated from the fitted concentrations.
//!
//! Usage:
//! ```bash
//! cargo run -- --input data.json --save-figures --figures-dir Figures
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::debug;

use spectro_kinetics::report::{format_peaks, format_rate};
use spectro_kinetics::{pipeline, AnalysisConfig, RunOutcome};

#[derive(Parser)]
#[command(name = "spectro-kinetics")]
#[command(version, about = "Concentrations and reaction rate from time-resolved spectra", long_about = None)]
struct Cli {
    /// Experiment file (JSON)
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Configuration file (JSON); flags override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory for saved figure data
    #[arg(long)]
    figures_dir: Option<PathBuf>,

    /// Save figure data as CSV instead of logging it
    #[arg(long)]
    save_figures: bool,

    /// Constrain fitted concentrations to be non-negative
    #[arg(long)]
    non_negative: bool,

    /// Fit measurements in parallel
    #[arg(long)]
    parallel: bool,

    /// Iteration limit of each fit
    #[arg(long)]
    max_iterations: Option<usize>,

    /// Log level: trace, debug, info, warn, error (RUST_LOG takes precedence)
    #[arg(long, default_value = "warn")]
    log_level: String,
}

impl Cli {
    fn analysis_config(&self) -> Result<AnalysisConfig> {
        let mut config = match &self.config {
            Some(path) => AnalysisConfig::from_file(path)
                .with_context(|| format!("reading configuration {}", path.display()))?,
            None => AnalysisConfig::default(),
        };

        if let Some(input) = &self.input {
            config.input = input.clone();
        }
        if let Some(dir) = &self.figures_dir {
            config.figures_dir = dir.clone();
        }
        if let Some(max_iterations) = self.max_iterations {
            config.fit.max_iterations = max_iterations;
        }
        config.save_figures |= self.save_figures;
        config.fit.non_negative |= self.non_negative;
        config.fit.parallel |= self.parallel;

        Ok(config)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&cli.log_level))
        .init();

    let config = cli.analysis_config()?;
    debug!("{:?}", config);

    match pipeline::run(&config).with_context(|| format!("analyzing {}", config.input.display()))? {
        RunOutcome::MissingInput(_) => {
            println!("Couldn't read data. Terminating...");
        }
        RunOutcome::Completed(report) => {
            print!("{}", format_peaks(&report.peaks));
            println!("{}", format_rate(report.rate.rate));
        }
    }

    Ok(())
}
