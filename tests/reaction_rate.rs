//! Integration tests for the reaction-rate estimator on fitted concentrations.

mod common;

use approx::assert_relative_eq;
use ndarray::{array, Array2};
use spectro_kinetics::kinetics::{classify, estimate_rate, SpeciesRole};
use spectro_kinetics::{reaction_rate, ConcentrationEstimator, ConcentrationMatrix, SpectroError};

#[test]
fn test_rate_from_fitted_first_order_data() {
    let record = common::a_to_b_experiment(10, 0.5, 0.0, 1).into_record().unwrap();
    let matrix = ConcentrationEstimator::new().estimate(&record).unwrap();

    assert_eq!(classify(&matrix), vec![SpeciesRole::Reactant, SpeciesRole::Product]);

    let estimate = estimate_rate(&matrix, record.timeline()).unwrap();
    assert_eq!(estimate.product, "B");
    assert_eq!(estimate.reactants, vec!["A".to_string()]);
    assert_eq!(estimate.instantaneous.len(), 9);
    assert_relative_eq!(estimate.rate, common::expected_rate(0.5), max_relative = 1e-6);
}

#[test]
fn test_rate_is_scale_free_for_one_reactant() {
    let timeline = array![0.0, 100.0, 200.0];
    let values = array![[4.0, 2.0, 1.0], [0.0, 2.0, 3.0]];

    let base = ConcentrationMatrix::new(vec!["A".into(), "B".into()], values.clone()).unwrap();
    let scaled = ConcentrationMatrix::new(vec!["A".into(), "B".into()], values * 1e-6).unwrap();

    assert_relative_eq!(
        reaction_rate(&base, &timeline).unwrap(),
        reaction_rate(&scaled, &timeline).unwrap(),
        max_relative = 1e-12
    );
}

#[test]
fn test_constant_series_are_reactants() {
    let matrix = ConcentrationMatrix::new(
        vec!["A".into(), "B".into()],
        Array2::from_elem((2, 3), 1.0),
    )
    .unwrap();

    assert_eq!(classify(&matrix), vec![SpeciesRole::Reactant, SpeciesRole::Reactant]);
    assert!(matches!(
        reaction_rate(&matrix, &array![0.0, 1.0, 2.0]),
        Err(SpectroError::NoProductFound)
    ));
}

#[test]
fn test_single_sample_cannot_give_a_rate() {
    let record = common::a_to_b_experiment(1, 0.5, 0.0, 1).into_record().unwrap();
    let matrix = ConcentrationEstimator::new().estimate(&record).unwrap();

    assert!(matches!(
        reaction_rate(&matrix, record.timeline()),
        Err(SpectroError::InvalidInput(_))
    ));
}
