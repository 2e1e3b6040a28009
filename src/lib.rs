//! # spectro-kinetics
//!
//! `spectro-kinetics` turns a time series of measured spectra into species
//! concentrations and an effective reaction-rate constant.
//!
//! The library provides:
//! - An experiment file loader with validation ([`data`])
//! - Peak detection on reference spectra ([`peaks`])
//! - Linear-mixture concentration fitting on a Levenberg-Marquardt solver
//!   ([`concentration`], [`lm`])
//! - A reaction-rate estimator ([`kinetics`])
//! - Figure data and console formatting ([`report`])
//!
//! ## Basic Usage
//!
//! ```no_run
//! use spectro_kinetics::{pipeline, AnalysisConfig, RunOutcome};
//!
//! let config = AnalysisConfig::default().with_input("data.json");
//! if let RunOutcome::Completed(report) = pipeline::run(&config)? {
//!     println!("{}", report.peaks);
//!     println!("{}", spectro_kinetics::report::format_rate(report.rate.rate));
//! }
//! # Ok::<(), spectro_kinetics::SpectroError>(())
//! ```

// Public modules
pub mod error;

// Solver
pub mod lm;
pub mod problem;
pub mod utils;

// Analysis stages
pub mod concentration;
pub mod data;
pub mod kinetics;
pub mod peaks;

pub mod config;
pub mod pipeline;
pub mod report;

// Re-exports for convenience
pub use concentration::{ConcentrationEstimator, ConcentrationMatrix};
pub use config::{AnalysisConfig, FitConfig};
pub use data::{ExperimentRecord, ReferenceSpectrum};
pub use error::{Result, SpectroError};
pub use kinetics::{reaction_rate, RateEstimate};
pub use lm::LevenbergMarquardt;
pub use peaks::PeakMap;
pub use pipeline::{AnalysisReport, RunOutcome};
pub use problem::Problem;

/// Version of the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
