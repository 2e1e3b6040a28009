//! In-memory representation of one experiment run.

use std::collections::HashSet;

use ndarray::Array1;

use crate::error::{Result, SpectroError};

/// The pure-component spectrum of one species.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceSpectrum {
    /// Species name, unique within a record
    pub name: String,

    /// Intensity at each frequency of the record's axis
    pub values: Array1<f64>,
}

impl ReferenceSpectrum {
    pub fn new(name: impl Into<String>, values: Array1<f64>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }
}

/// An immutable, validated snapshot of one experiment.
///
/// Invariants, checked by [`ExperimentRecord::new`]:
/// - the frequency axis is non-empty;
/// - every reference spectrum and every measurement has one value per frequency;
/// - there is at least one reference spectrum and species names are unique;
/// - `timeline[i]` is the elapsed time of `measurements[i]`, in seconds, and
///   the timeline never decreases;
/// - every value is finite.
#[derive(Debug, Clone, PartialEq)]
pub struct ExperimentRecord {
    title: String,
    frequencies: Array1<f64>,
    reference_spectra: Vec<ReferenceSpectrum>,
    measurements: Vec<Array1<f64>>,
    timeline: Array1<f64>,
}

impl ExperimentRecord {
    pub fn new(
        title: impl Into<String>,
        frequencies: Array1<f64>,
        reference_spectra: Vec<ReferenceSpectrum>,
        measurements: Vec<Array1<f64>>,
        timeline: Array1<f64>,
    ) -> Result<Self> {
        let n_freq = frequencies.len();
        if n_freq == 0 {
            return Err(SpectroError::SchemaInvalid(
                "Frequency axis is empty".to_string(),
            ));
        }
        ensure_finite("frequencies", &frequencies)?;

        if reference_spectra.is_empty() {
            return Err(SpectroError::SchemaInvalid(
                "At least one reference spectrum is required".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for spectrum in &reference_spectra {
            if !seen.insert(spectrum.name.as_str()) {
                return Err(SpectroError::SchemaInvalid(format!(
                    "Duplicate reference spectrum '{}'",
                    spectrum.name
                )));
            }
            if spectrum.values.len() != n_freq {
                return Err(SpectroError::DimensionMismatch(format!(
                    "Reference spectrum '{}' has {} values but the frequency axis has {}",
                    spectrum.name,
                    spectrum.values.len(),
                    n_freq
                )));
            }
            ensure_finite(&format!("reference spectrum '{}'", spectrum.name), &spectrum.values)?;
        }

        for (i, measurement) in measurements.iter().enumerate() {
            if measurement.len() != n_freq {
                return Err(SpectroError::DimensionMismatch(format!(
                    "Measurement {} has {} values but the frequency axis has {}",
                    i,
                    measurement.len(),
                    n_freq
                )));
            }
            ensure_finite(&format!("measurement {i}"), measurement)?;
        }

        if timeline.len() != measurements.len() {
            return Err(SpectroError::DimensionMismatch(format!(
                "Timeline has {} entries for {} measurements",
                timeline.len(),
                measurements.len()
            )));
        }
        ensure_finite("timeline", &timeline)?;
        if let Some(i) = (1..timeline.len()).find(|&i| timeline[i] < timeline[i - 1]) {
            return Err(SpectroError::SchemaInvalid(format!(
                "Timeline decreases at measurement {i} ({} s after {} s)",
                timeline[i],
                timeline[i - 1]
            )));
        }

        Ok(Self {
            title: title.into(),
            frequencies,
            reference_spectra,
            measurements,
            timeline,
        })
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn frequencies(&self) -> &Array1<f64> {
        &self.frequencies
    }

    /// Reference spectra in declaration order.
    pub fn reference_spectra(&self) -> &[ReferenceSpectrum] {
        &self.reference_spectra
    }

    pub fn species_names(&self) -> Vec<&str> {
        self.reference_spectra.iter().map(|s| s.name.as_str()).collect()
    }

    /// Measurement vectors in time order.
    pub fn measurements(&self) -> &[Array1<f64>] {
        &self.measurements
    }

    /// Elapsed time of each measurement in seconds.
    pub fn timeline(&self) -> &Array1<f64> {
        &self.timeline
    }

    pub fn species_count(&self) -> usize {
        self.reference_spectra.len()
    }

    pub fn sample_count(&self) -> usize {
        self.measurements.len()
    }
}

fn ensure_finite(what: &str, values: &Array1<f64>) -> Result<()> {
    match values.iter().position(|v| !v.is_finite()) {
        Some(i) => Err(SpectroError::SchemaInvalid(format!(
            "Non-finite value in {what} at index {i}"
        ))),
        None => Ok(()),
    }
}
