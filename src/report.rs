//! Presentation data products: figure curves and console text.
//!
//! Curves are plain data. Where they go is decided by a [`FigureSink`]:
//! [`CsvFigureWriter`] saves one CSV file per figure, [`LogFigureSink`]
//! only reports them through the log.

use std::fs;
use std::path::{Path, PathBuf};

use log::info;
use ndarray::Array1;

use crate::concentration::ConcentrationMatrix;
use crate::data::ExperimentRecord;
use crate::error::{Result, SpectroError};
use crate::peaks::PeakMap;

pub const SPECTRUM_X_LABEL: &str = "Frequencies, Hz";
pub const SPECTRUM_Y_LABEL: &str = "Intensity, a.u.";
pub const CONCENTRATION_TITLE: &str = "Concentrations";
pub const CONCENTRATION_X_LABEL: &str = "Elapsed time, seconds";
pub const CONCENTRATION_Y_LABEL: &str = "Concentrations, moles";

/// One plotted series.
#[derive(Debug, Clone, PartialEq)]
pub struct Curve {
    /// Title of the figure the curve belongs to
    pub title: String,

    /// Legend label of the series
    pub label: String,

    pub x_label: String,
    pub y_label: String,
    pub x: Array1<f64>,
    pub y: Array1<f64>,
}

/// One curve per reference spectrum, titled `"{name}'s Spectrum"`.
pub fn spectrum_curves(record: &ExperimentRecord) -> Vec<Curve> {
    record
        .reference_spectra()
        .iter()
        .map(|spectrum| Curve {
            title: format!("{}'s Spectrum", spectrum.name),
            label: spectrum.name.clone(),
            x_label: SPECTRUM_X_LABEL.to_string(),
            y_label: SPECTRUM_Y_LABEL.to_string(),
            x: record.frequencies().clone(),
            y: spectrum.values.clone(),
        })
        .collect()
}

/// One curve per species of `matrix`, all in the `Concentrations` figure.
pub fn concentration_curves(matrix: &ConcentrationMatrix, timeline: &Array1<f64>) -> Vec<Curve> {
    matrix
        .names()
        .iter()
        .zip(matrix.as_array().rows())
        .map(|(name, row)| Curve {
            title: CONCENTRATION_TITLE.to_string(),
            label: name.clone(),
            x_label: CONCENTRATION_X_LABEL.to_string(),
            y_label: CONCENTRATION_Y_LABEL.to_string(),
            x: timeline.clone(),
            y: row.to_owned(),
        })
        .collect()
}

/// The peak map as printed on the console.
pub fn format_peaks(peaks: &PeakMap) -> String {
    peaks.to_string()
}

/// `Reaction rate: {k}` with two significant digits.
pub fn format_rate(rate: f64) -> String {
    format!("Reaction rate: {}", format_significant(rate, 2))
}

/// Format `value` with `digits` significant digits.
///
/// Fixed notation is used for decimal exponents in `-4..digits - 1`, scientific
/// notation (`1.2e-07`) otherwise. Trailing zeros are dropped, but fixed
/// notation keeps at least one digit after the point.
pub fn format_significant(value: f64, digits: usize) -> String {
    if !value.is_finite() {
        return if value.is_nan() {
            "nan".to_string()
        } else if value > 0.0 {
            "inf".to_string()
        } else {
            "-inf".to_string()
        };
    }
    if value == 0.0 {
        return "0.0".to_string();
    }

    let digits = digits.max(1);
    let scientific = format!("{:.*e}", digits - 1, value);
    let (mantissa, exponent) = match scientific.split_once('e') {
        Some((m, e)) => (m, e.parse::<i32>().unwrap_or(0)),
        None => (scientific.as_str(), 0),
    };

    if exponent < -4 || exponent >= digits as i32 - 1 {
        let mantissa = trim_fraction(mantissa);
        let sign = if exponent < 0 { '-' } else { '+' };
        format!("{}e{}{:02}", mantissa, sign, exponent.abs())
    } else {
        let decimals = (digits as i32 - 1 - exponent).max(1) as usize;
        let fixed = format!("{:.*}", decimals, value);
        let trimmed = trim_fraction(&fixed);
        if trimmed.contains('.') {
            trimmed.to_string()
        } else {
            format!("{trimmed}.0")
        }
    }
}

fn trim_fraction(number: &str) -> &str {
    if number.contains('.') {
        number.trim_end_matches('0').trim_end_matches('.')
    } else {
        number
    }
}

/// Destination for figures.
pub trait FigureSink {
    /// Present the curves of the figure called `name`.
    fn present(&mut self, curves: &[Curve], name: &str) -> Result<()>;
}

/// Writes each figure to `{figures_dir}/{name}.csv`.
///
/// The first column holds the shared x values; each curve adds one column
/// headed by its label.
#[derive(Debug, Clone)]
pub struct CsvFigureWriter {
    figures_dir: PathBuf,
    written: Vec<PathBuf>,
}

impl CsvFigureWriter {
    pub fn new(figures_dir: impl Into<PathBuf>) -> Self {
        Self {
            figures_dir: figures_dir.into(),
            written: Vec::new(),
        }
    }

    pub fn figures_dir(&self) -> &Path {
        &self.figures_dir
    }

    /// Files written so far.
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }
}

impl FigureSink for CsvFigureWriter {
    fn present(&mut self, curves: &[Curve], name: &str) -> Result<()> {
        let Some(first) = curves.first() else {
            return Ok(());
        };
        if let Some(other) = curves.iter().find(|c| c.x != first.x || c.y.len() != first.x.len()) {
            return Err(SpectroError::DimensionMismatch(format!(
                "Curve '{}' of figure '{}' does not share the x values of '{}'",
                other.label, name, first.label
            )));
        }

        fs::create_dir_all(&self.figures_dir)?;
        let path = self.figures_dir.join(format!("{}.csv", file_stem(name)));
        let mut writer = csv::Writer::from_path(&path)?;

        let mut header = vec![first.x_label.clone()];
        header.extend(curves.iter().map(|c| c.label.clone()));
        writer.write_record(&header)?;

        for (i, x) in first.x.iter().enumerate() {
            let mut row = vec![x.to_string()];
            row.extend(curves.iter().map(|c| c.y[i].to_string()));
            writer.write_record(&row)?;
        }
        writer.flush()?;

        info!("Saved figure '{}' to {}", name, path.display());
        self.written.push(path);
        Ok(())
    }
}

/// Figure names come from species names; separators would escape `figures_dir`.
fn file_stem(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '\0' => '_',
            c => c,
        })
        .collect()
}

/// Reports figures through the log without writing files.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogFigureSink;

impl FigureSink for LogFigureSink {
    fn present(&mut self, curves: &[Curve], name: &str) -> Result<()> {
        info!("Figure '{}' ({} curves)", name, curves.len());
        for curve in curves {
            let (lo, hi) = curve
                .y
                .iter()
                .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
            info!(
                "  {}: {} points, {} in [{:e}, {:e}]",
                curve.label,
                curve.y.len(),
                curve.y_label,
                lo,
                hi
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::ReferenceSpectrum;
    use ndarray::array;

    #[test]
    fn test_format_significant_matches_console_output() {
        let cases = [
            (0.0012, "0.0012"),
            (1.2e-7, "1.2e-07"),
            (1.0, "1.0"),
            (10.0, "1e+01"),
            (12.0, "1.2e+01"),
            (0.1, "0.1"),
            (5.0, "5.0"),
            (0.0, "0.0"),
            (99.9, "1e+02"),
            (0.99999, "1.0"),
            (1e-4, "0.0001"),
            (123456.0, "1.2e+05"),
            (-0.00345, "-0.0034"),
        ];
        for (value, expected) in cases {
            assert_eq!(format_significant(value, 2), expected, "formatting {value}");
        }
        assert_eq!(format_significant(f64::NAN, 2), "nan");
    }

    #[test]
    fn test_format_rate() {
        assert_eq!(format_rate(0.0012345), "Reaction rate: 0.0012");
    }

    fn record() -> ExperimentRecord {
        ExperimentRecord::new(
            "report",
            array![1.0, 2.0, 3.0],
            vec![
                ReferenceSpectrum::new("A", array![0.0, 1.0, 0.0]),
                ReferenceSpectrum::new("B", array![1.0, 0.0, 1.0]),
            ],
            vec![array![1.0, 1.0, 1.0], array![1.0, 0.5, 1.0]],
            array![0.0, 60.0],
        )
        .unwrap()
    }

    #[test]
    fn test_spectrum_curves() {
        let curves = spectrum_curves(&record());
        assert_eq!(curves.len(), 2);
        assert_eq!(curves[0].title, "A's Spectrum");
        assert_eq!(curves[1].x_label, "Frequencies, Hz");
        assert_eq!(curves[1].y_label, "Intensity, a.u.");
        assert_eq!(curves[1].y, array![1.0, 0.0, 1.0]);
    }

    #[test]
    fn test_concentration_curves_and_csv() {
        let matrix = ConcentrationMatrix::new(
            vec!["A".to_string(), "B".to_string()],
            array![[1e-6, 0.5e-6], [0.0, 0.5e-6]],
        )
        .unwrap();
        let timeline = array![0.0, 60.0];
        let curves = concentration_curves(&matrix, &timeline);
        assert_eq!(curves.len(), 2);
        assert!(curves.iter().all(|c| c.title == "Concentrations"));
        assert_eq!(curves[0].x_label, "Elapsed time, seconds");
        assert_eq!(curves[0].y_label, "Concentrations, moles");

        let dir = tempfile::tempdir().unwrap();
        let mut writer = CsvFigureWriter::new(dir.path().join("Figures"));
        writer.present(&curves, CONCENTRATION_TITLE).unwrap();

        let path = dir.path().join("Figures").join("Concentrations.csv");
        assert_eq!(writer.written(), &[path.clone()]);
        let text = fs::read_to_string(path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "\"Elapsed time, seconds\",A,B");
        assert!(lines[1].starts_with("0,"));
    }

    #[test]
    fn test_csv_rejects_mismatched_axes() {
        let mut curves = spectrum_curves(&record());
        curves[1].x = array![9.0, 9.0, 9.0];

        let dir = tempfile::tempdir().unwrap();
        let mut writer = CsvFigureWriter::new(dir.path());
        assert!(matches!(
            writer.present(&curves, "mixed"),
            Err(SpectroError::DimensionMismatch(_))
        ));
    }

    #[test]
    fn test_csv_keeps_species_names_inside_figures_dir() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = CsvFigureWriter::new(dir.path().join("Figures"));
        let curve = Curve {
            title: "a/b's Spectrum".to_string(),
            label: "a/b".to_string(),
            x_label: SPECTRUM_X_LABEL.to_string(),
            y_label: SPECTRUM_Y_LABEL.to_string(),
            x: array![1.0, 2.0],
            y: array![0.5, 0.25],
        };

        writer.present(&[curve], "../a/b's Spectrum").unwrap();

        let expected = dir.path().join("Figures").join(".._a_b's Spectrum.csv");
        assert_eq!(writer.written(), &[expected.clone()][..]);
        assert!(expected.exists());
        assert_eq!(file_stem("C:\\x"), "C__x");
    }

    #[test]
    fn test_log_sink_accepts_any_figure() {
        let mut sink = LogFigureSink;
        assert!(sink.present(&spectrum_curves(&record()), "spectra").is_ok());
        assert!(sink.present(&[], "empty").is_ok());
    }
}
