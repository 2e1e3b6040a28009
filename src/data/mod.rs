//! Experiment data: frequency axis, validated records and file I/O.

pub mod grid;
pub mod loader;
pub mod record;

pub use grid::frequency_grid;
pub use loader::{
    load_experiment, read_experiment, write_experiment, NamedSpectra, RawExperiment, RawMeasurement,
};
pub use record::{ExperimentRecord, ReferenceSpectrum};
