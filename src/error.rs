use std::path::PathBuf;

use thiserror::Error;

/// Error types for the spectro-kinetics library.
#[derive(Error, Debug)]
pub enum SpectroError {
    /// The experiment file does not exist.
    #[error("Experiment file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// The persisted record is missing keys, has wrong types or violates
    /// a record invariant.
    #[error("Invalid experiment record: {0}")]
    SchemaInvalid(String),

    /// Error indicating a mismatch in vector or matrix dimensions.
    #[error("Dimension mismatch: {0}")]
    DimensionMismatch(String),

    /// The mixture fit for one measurement did not converge.
    #[error("Fit for measurement {sample} did not converge: {message}")]
    FitNonConvergent { sample: usize, message: String },

    /// Every species was classified as a reactant.
    #[error("No product species found: every concentration series is non-increasing")]
    NoProductFound,

    /// The rate computation hit a zero denominator or a non-finite value.
    #[error("Degenerate reaction rate: {0}")]
    DegenerateRate(String),

    /// Invalid input data.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Linear algebra error.
    #[error("Linear algebra error: {0}")]
    LinearAlgebraError(String),

    /// Non-finite values produced during optimization.
    #[error("Numerical error: {0}")]
    NumericalError(String),

    /// I/O error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV export error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Result type alias for spectro-kinetics operations.
pub type Result<T> = std::result::Result<T, SpectroError>;
