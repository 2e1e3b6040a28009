//! Local maxima of reference spectra.

use std::fmt;

use log::debug;

use crate::data::ExperimentRecord;

/// Peak indices per species, in species order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PeakMap {
    entries: Vec<(String, Vec<usize>)>,
}

impl PeakMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the peaks of one species.
    pub fn insert(&mut self, name: impl Into<String>, peaks: Vec<usize>) {
        self.entries.push((name.into(), peaks));
    }

    pub fn get(&self, name: &str) -> Option<&[usize]> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, peaks)| peaks.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[usize])> {
        self.entries.iter().map(|(n, p)| (n.as_str(), p.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Display for PeakMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, peaks) in self.iter() {
            let indices: Vec<String> = peaks.iter().map(|i| i.to_string()).collect();
            writeln!(f, "{}: [{}]", name, indices.join(", "))?;
        }
        Ok(())
    }
}

/// Indices of the local maxima of `values`.
///
/// A sample is a peak when both neighbours are strictly lower. A flat top
/// that is strictly higher than the samples on either side counts once, at
/// its middle index (rounded down). The first and last samples are never
/// peaks.
pub fn find_peaks(values: &[f64]) -> Vec<usize> {
    let mut peaks = Vec::new();
    if values.len() < 3 {
        return peaks;
    }

    let last = values.len() - 1;
    let mut i = 1;
    while i < last {
        if values[i - 1] < values[i] {
            let mut ahead = i + 1;
            while ahead < last && values[ahead] == values[i] {
                ahead += 1;
            }

            if values[ahead] < values[i] {
                peaks.push((i + ahead - 1) / 2);
                i = ahead;
            }
        }
        i += 1;
    }

    peaks
}

/// Peaks of every reference spectrum in `record`.
pub fn find_all_peaks(record: &ExperimentRecord) -> PeakMap {
    let mut map = PeakMap::new();
    for spectrum in record.reference_spectra() {
        let peaks = match spectrum.values.as_slice() {
            Some(values) => find_peaks(values),
            None => find_peaks(&spectrum.values.to_vec()),
        };
        debug!("{}: {} peaks", spectrum.name, peaks.len());
        map.insert(spectrum.name.clone(), peaks);
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::ReferenceSpectrum;
    use ndarray::array;

    #[test]
    fn test_simple_peaks() {
        assert_eq!(find_peaks(&[0.0, 1.0, 0.0, 2.0, 0.0]), vec![1, 3]);
    }

    #[test]
    fn test_monotone_has_no_peaks() {
        assert!(find_peaks(&[1.0, 2.0, 3.0, 4.0]).is_empty());
        assert!(find_peaks(&[4.0, 3.0, 2.0]).is_empty());
    }

    #[test]
    fn test_endpoints_are_never_peaks() {
        assert_eq!(find_peaks(&[5.0, 1.0, 2.0, 1.0, 5.0]), vec![2]);
    }

    #[test]
    fn test_short_input() {
        assert!(find_peaks(&[]).is_empty());
        assert!(find_peaks(&[1.0]).is_empty());
        assert!(find_peaks(&[1.0, 2.0]).is_empty());
    }

    #[test]
    fn test_plateau_reports_middle() {
        assert_eq!(find_peaks(&[0.0, 1.0, 1.0, 0.0]), vec![1]);
        assert_eq!(find_peaks(&[0.0, 1.0, 1.0, 1.0, 0.0]), vec![2]);
    }

    #[test]
    fn test_plateau_without_descent_is_not_a_peak() {
        assert!(find_peaks(&[0.0, 1.0, 1.0, 2.0]).is_empty());
        assert!(find_peaks(&[0.0, 1.0, 1.0, 1.0]).is_empty());
    }

    #[test]
    fn test_find_all_peaks_keeps_species_order() {
        let record = ExperimentRecord::new(
            "peaks",
            array![0.0, 1.0, 2.0, 3.0, 4.0],
            vec![
                ReferenceSpectrum::new("B", array![0.0, 0.0, 0.0, 3.0, 0.0]),
                ReferenceSpectrum::new("A", array![0.0, 2.0, 0.0, 0.0, 0.0]),
            ],
            vec![],
            array![],
        )
        .unwrap();

        let map = find_all_peaks(&record);
        let names: Vec<&str> = map.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["B", "A"]);
        assert_eq!(map.get("A"), Some(&[1usize][..]));
        assert_eq!(map.get("C"), None);
        assert_eq!(map.to_string(), "B: [3]\nA: [1]\n");
    }
}
