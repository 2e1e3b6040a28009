//! Reading and writing experiment files.
//!
//! An experiment file is a JSON document:
//!
//! ```json
//! {
//!   "Title": "A to B",
//!   "Frequency Max": 700.0,
//!   "Frequency Min": 400.0,
//!   "Frequency Step": 0.5,
//!   "Pure Spectrums": { "A": [...], "B": [...] },
//!   "Measurements": [ { "Data": [...], "Time": 0.25 }, ... ]
//! }
//! ```
//!
//! `Time` is stored in hours and converted to seconds on load. The order of
//! the `Pure Spectrums` entries is kept as the species order.

use std::fmt;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use log::{debug, info};
use ndarray::Array1;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::grid::frequency_grid;
use super::record::{ExperimentRecord, ReferenceSpectrum};
use crate::error::{Result, SpectroError};

/// Seconds per hour, the unit conversion applied to measurement times.
pub const SECONDS_PER_HOUR: f64 = 3600.0;

/// One timed measurement as persisted on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawMeasurement {
    #[serde(rename = "Data")]
    pub data: Vec<f64>,

    /// Elapsed time in hours
    #[serde(rename = "Time")]
    pub time: f64,
}

/// Named spectra in file order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NamedSpectra(pub Vec<(String, Vec<f64>)>);

impl Serialize for NamedSpectra {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, values) in &self.0 {
            map.serialize_entry(name, values)?;
        }
        map.end()
    }
}

struct NamedSpectraVisitor;

impl<'de> Visitor<'de> for NamedSpectraVisitor {
    type Value = NamedSpectra;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a map from species name to an array of intensities")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> std::result::Result<Self::Value, A::Error> {
        let mut spectra = Vec::with_capacity(access.size_hint().unwrap_or(0));
        while let Some((name, values)) = access.next_entry::<String, Vec<f64>>()? {
            spectra.push((name, values));
        }
        Ok(NamedSpectra(spectra))
    }
}

impl<'de> Deserialize<'de> for NamedSpectra {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_map(NamedSpectraVisitor)
    }
}

/// The persisted form of an experiment, before validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawExperiment {
    #[serde(rename = "Title")]
    pub title: String,

    #[serde(rename = "Frequency Max")]
    pub frequency_max: f64,

    #[serde(rename = "Frequency Min")]
    pub frequency_min: f64,

    #[serde(rename = "Frequency Step")]
    pub frequency_step: f64,

    #[serde(rename = "Pure Spectrums")]
    pub pure_spectra: NamedSpectra,

    #[serde(rename = "Measurements")]
    pub measurements: Vec<RawMeasurement>,
}

impl RawExperiment {
    /// Validate and convert into an [`ExperimentRecord`].
    pub fn into_record(self) -> Result<ExperimentRecord> {
        let frequencies =
            frequency_grid(self.frequency_min, self.frequency_max, self.frequency_step)?;

        let reference_spectra = self
            .pure_spectra
            .0
            .into_iter()
            .map(|(name, values)| ReferenceSpectrum::new(name, Array1::from(values)))
            .collect();

        let timeline: Array1<f64> = self
            .measurements
            .iter()
            .map(|m| m.time * SECONDS_PER_HOUR)
            .collect();
        let measurements = self
            .measurements
            .into_iter()
            .map(|m| Array1::from(m.data))
            .collect();

        ExperimentRecord::new(self.title, frequencies, reference_spectra, measurements, timeline)
    }
}

/// Load an experiment, returning `Ok(None)` when `path` does not exist.
pub fn load_experiment<P: AsRef<Path>>(path: P) -> Result<Option<ExperimentRecord>> {
    let path = path.as_ref();
    if !path.exists() {
        info!("No experiment file at {}", path.display());
        return Ok(None);
    }
    read_experiment(path).map(Some)
}

/// Read and validate the experiment stored at `path`.
pub fn read_experiment<P: AsRef<Path>>(path: P) -> Result<ExperimentRecord> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(SpectroError::FileNotFound(path.to_path_buf()));
    }

    let reader = BufReader::new(File::open(path)?);
    let raw: RawExperiment = serde_json::from_reader(reader)
        .map_err(|e| SpectroError::SchemaInvalid(format!("{}: {}", path.display(), e)))?;
    debug!(
        "Decoded '{}': {} reference spectra, {} measurements",
        raw.title,
        raw.pure_spectra.0.len(),
        raw.measurements.len()
    );

    let record = raw.into_record()?;
    info!(
        "Loaded '{}' from {}: {} frequencies, {} species, {} measurements",
        record.title(),
        path.display(),
        record.frequencies().len(),
        record.species_count(),
        record.sample_count()
    );
    Ok(record)
}

/// Write `experiment` to `path` in the experiment file format.
pub fn write_experiment<P: AsRef<Path>>(path: P, experiment: &RawExperiment) -> Result<()> {
    let path = path.as_ref();
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, experiment)?;
    writer.flush()?;
    debug!("Wrote experiment '{}' to {}", experiment.title, path.display());
    Ok(())
}
