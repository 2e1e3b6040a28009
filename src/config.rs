//! Run configuration.
//!
//! Every field has a default, so a configuration file only needs to name the
//! values it changes:
//!
//! ```json
//! { "save_figures": true, "fit": { "non_negative": true } }
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::concentration::ConcentrationEstimator;
use crate::error::{Result, SpectroError};
use crate::lm::{LevenbergMarquardt, LmConfig};

/// Options of the per-measurement mixture fit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FitConfig {
    /// Iteration limit of each Levenberg-Marquardt run
    pub max_iterations: usize,

    /// Constrain fitted concentrations to be non-negative
    pub non_negative: bool,

    /// Fit measurements in parallel
    pub parallel: bool,
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            max_iterations: LmConfig::default().max_iterations,
            non_negative: false,
            parallel: false,
        }
    }
}

impl FitConfig {
    /// Build the estimator these options describe.
    pub fn estimator(&self) -> ConcentrationEstimator {
        ConcentrationEstimator::new()
            .with_solver(LevenbergMarquardt::new().with_max_iterations(self.max_iterations))
            .with_non_negative(self.non_negative)
            .with_parallel(self.parallel)
    }
}

/// Everything a pipeline run needs besides the experiment itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Experiment file
    pub input: PathBuf,

    /// Directory receiving figure data when `save_figures` is set
    pub figures_dir: PathBuf,

    /// Write figure data to `figures_dir` instead of displaying it
    pub save_figures: bool,

    pub fit: FitConfig,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::from("./data.json"),
            figures_dir: PathBuf::from("./Figures"),
            save_figures: false,
            fit: FitConfig::default(),
        }
    }
}

impl AnalysisConfig {
    /// Read a configuration from a JSON file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SpectroError::FileNotFound(path.to_path_buf()));
        }
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn with_input(mut self, input: impl Into<PathBuf>) -> Self {
        self.input = input.into();
        self
    }

    pub fn with_figures_dir(mut self, figures_dir: impl Into<PathBuf>) -> Self {
        self.figures_dir = figures_dir.into();
        self
    }

    pub fn with_save_figures(mut self, save_figures: bool) -> Self {
        self.save_figures = save_figures;
        self
    }
}
