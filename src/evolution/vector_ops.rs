//! Fixed-length elementwise helpers. Every binary operation checks that both
//! operands have the same length instead of broadcasting.
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
#[error("{what} has length {found}, expected {expected}")]
pub struct DimensionMismatch {
    pub what: &'static str,
    pub expected: usize,
    pub found: usize,
}

pub fn ensure_len(what: &'static str, values: &[f64], expected: usize) -> Result<(), DimensionMismatch> {
    if values.len() != expected {
        return Err(DimensionMismatch {
            what,
            expected,
            found: values.len(),
        });
    }
    Ok(())
}

fn zip_with(
    what: &'static str,
    left: &[f64],
    right: &[f64],
    op: impl Fn(f64, f64) -> f64,
) -> Result<Vec<f64>, DimensionMismatch> {
    ensure_len(what, right, left.len())?;
    Ok(left.iter().zip(right).map(|(&l, &r)| op(l, r)).collect())
}

pub fn add(left: &[f64], right: &[f64]) -> Result<Vec<f64>, DimensionMismatch> {
    zip_with("addend", left, right, |l, r| l + r)
}

/// In-place version of [`add`], used to accumulate sums without reallocating.
pub fn add_assign(accumulator: &mut [f64], other: &[f64]) -> Result<(), DimensionMismatch> {
    ensure_len("addend", other, accumulator.len())?;
    accumulator
        .iter_mut()
        .zip(other)
        .for_each(|(acc, &value)| *acc += value);
    Ok(())
}

pub fn multiply(left: &[f64], right: &[f64]) -> Result<Vec<f64>, DimensionMismatch> {
    zip_with("factor", left, right, |l, r| l * r)
}

pub fn divide(numerator: &[f64], denominator: &[f64]) -> Result<Vec<f64>, DimensionMismatch> {
    zip_with("denominator", numerator, denominator, |n, d| n / d)
}

pub fn scale(values: &[f64], factor: f64) -> Vec<f64> {
    values.iter().map(|v| v * factor).collect()
}

pub fn clip(value: f64, min: f64, max: f64) -> f64 {
    value.max(min).min(max)
}

pub fn clip_all(values: &[f64], min: f64, max: f64) -> Vec<f64> {
    values.iter().map(|&v| clip(v, min, max)).collect()
}

pub fn logistic(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Arithmetic mean; zero for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}
