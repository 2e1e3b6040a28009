//! End-to-end tests of a pipeline run.

mod common;

use std::fs;

use approx::assert_relative_eq;
use spectro_kinetics::data::write_experiment;
use spectro_kinetics::report::format_rate;
use spectro_kinetics::{pipeline, AnalysisConfig, RunOutcome, SpectroError};

#[test]
fn test_full_run_saves_figures() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("data.json");
    write_experiment(&input, &common::a_to_b_experiment(9, 0.5, 0.0, 1)).unwrap();

    let config = AnalysisConfig::default()
        .with_input(&input)
        .with_figures_dir(dir.path().join("Figures"))
        .with_save_figures(true);

    let report = match pipeline::run(&config).unwrap() {
        RunOutcome::Completed(report) => report,
        RunOutcome::MissingInput(path) => panic!("input {} not found", path.display()),
    };

    assert_eq!(report.title, "A to B");
    // Band centres at 430 and 470 on a grid starting at 400 with step 0.5
    assert_eq!(report.peaks.get("A"), Some(&[60usize][..]));
    assert_eq!(report.peaks.get("B"), Some(&[140usize][..]));
    assert_eq!(report.concentrations.shape(), (2, 9));
    assert_relative_eq!(report.rate.rate, common::expected_rate(0.5), max_relative = 1e-6);
    assert!(format_rate(report.rate.rate).starts_with("Reaction rate: "));

    for name in ["A's Spectrum", "B's Spectrum", "Concentrations"] {
        let path = dir.path().join("Figures").join(format!("{name}.csv"));
        assert!(path.exists(), "{} missing", path.display());
    }
    let spectrum = fs::read_to_string(dir.path().join("Figures").join("A's Spectrum.csv")).unwrap();
    assert_eq!(spectrum.lines().count(), common::frequencies().len() + 1);
}

#[test]
fn test_display_mode_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("data.json");
    write_experiment(&input, &common::a_to_b_experiment(4, 0.5, 0.0, 1)).unwrap();

    let config = AnalysisConfig::default()
        .with_input(&input)
        .with_figures_dir(dir.path().join("Figures"));

    assert!(matches!(pipeline::run(&config).unwrap(), RunOutcome::Completed(_)));
    assert!(!dir.path().join("Figures").exists());
}

#[test]
fn test_missing_input_stops_early() {
    let dir = tempfile::tempdir().unwrap();
    let config = AnalysisConfig::default()
        .with_input(dir.path().join("absent.json"))
        .with_figures_dir(dir.path().join("Figures"))
        .with_save_figures(true);

    assert!(matches!(pipeline::run(&config).unwrap(), RunOutcome::MissingInput(_)));
    assert!(!dir.path().join("Figures").exists());
}

#[test]
fn test_reaction_without_product_fails() {
    // Identical measurements give constant concentrations
    let mut raw = common::a_to_b_experiment(3, 0.5, 0.0, 1);
    let first = raw.measurements[0].data.clone();
    for m in raw.measurements.iter_mut() {
        m.data = first.clone();
    }

    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("data.json");
    write_experiment(&input, &raw).unwrap();

    let config = AnalysisConfig::default().with_input(&input);
    assert!(matches!(pipeline::run(&config), Err(SpectroError::NoProductFound)));
}
