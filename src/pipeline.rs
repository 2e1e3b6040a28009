//! End-to-end analysis of one experiment file.

use std::path::PathBuf;

use log::info;

use crate::concentration::ConcentrationMatrix;
use crate::config::AnalysisConfig;
use crate::data::{load_experiment, ExperimentRecord};
use crate::error::Result;
use crate::kinetics::{estimate_rate, RateEstimate};
use crate::peaks::{find_all_peaks, PeakMap};
use crate::report::{
    concentration_curves, spectrum_curves, CsvFigureWriter, FigureSink, LogFigureSink,
    CONCENTRATION_TITLE,
};

/// Products of a completed run.
#[derive(Debug, Clone)]
pub struct AnalysisReport {
    pub title: String,
    pub peaks: PeakMap,
    pub concentrations: ConcentrationMatrix,
    pub timeline: ndarray::Array1<f64>,
    pub rate: RateEstimate,
}

/// How a run ended.
#[derive(Debug, Clone)]
pub enum RunOutcome {
    /// The input file does not exist; nothing was done.
    MissingInput(PathBuf),
    Completed(AnalysisReport),
}

/// Run the analysis described by `config`, presenting figures as configured.
pub fn run(config: &AnalysisConfig) -> Result<RunOutcome> {
    if config.save_figures {
        let mut sink = CsvFigureWriter::new(&config.figures_dir);
        run_with_sink(config, &mut sink)
    } else {
        run_with_sink(config, &mut LogFigureSink)
    }
}

/// Run the analysis, sending every figure to `sink`.
pub fn run_with_sink<S: FigureSink>(config: &AnalysisConfig, sink: &mut S) -> Result<RunOutcome> {
    let Some(record) = load_experiment(&config.input)? else {
        return Ok(RunOutcome::MissingInput(config.input.clone()));
    };

    analyze(&record, config, sink).map(RunOutcome::Completed)
}

/// Analyze an already loaded record.
pub fn analyze<S: FigureSink>(
    record: &ExperimentRecord,
    config: &AnalysisConfig,
    sink: &mut S,
) -> Result<AnalysisReport> {
    info!("Analyzing '{}'", record.title());

    for curve in spectrum_curves(record) {
        let name = curve.title.clone();
        sink.present(&[curve], &name)?;
    }

    let peaks = find_all_peaks(record);
    info!("Found peaks for {} species", peaks.len());

    let concentrations = config.fit.estimator().estimate(record)?;
    sink.present(
        &concentration_curves(&concentrations, record.timeline()),
        CONCENTRATION_TITLE,
    )?;

    let rate = estimate_rate(&concentrations, record.timeline())?;

    Ok(AnalysisReport {
        title: record.title().to_string(),
        peaks,
        concentrations,
        timeline: record.timeline().clone(),
        rate,
    })
}
