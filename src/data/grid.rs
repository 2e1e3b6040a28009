//! Evenly spaced frequency axis.

use ndarray::Array1;

use crate::error::{Result, SpectroError};

/// Generate the frequency axis `min, min + step, ...` up to but excluding `max`.
///
/// The axis has `ceil((max - min) / step)` points; `max <= min` gives an
/// empty axis. A non-positive or non-finite step is rejected.
pub fn frequency_grid(min: f64, max: f64, step: f64) -> Result<Array1<f64>> {
    if !(min.is_finite() && max.is_finite() && step.is_finite()) {
        return Err(SpectroError::SchemaInvalid(format!(
            "Frequency bounds must be finite (min = {min}, max = {max}, step = {step})"
        )));
    }
    if step <= 0.0 {
        return Err(SpectroError::SchemaInvalid(format!(
            "Frequency step must be positive, got {step}"
        )));
    }

    let len = grid_len(min, max, step);
    Ok(Array1::from_shape_fn(len, |i| min + i as f64 * step))
}

/// Number of grid points in `[min, max)` at spacing `step`.
pub fn grid_len(min: f64, max: f64, step: f64) -> usize {
    let span = (max - min) / step;
    if span > 0.0 {
        span.ceil() as usize
    } else {
        0
    }
}
