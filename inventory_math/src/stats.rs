//! Descriptive statistics over slices that may contain missing values
//!
//! Every function here ignores `NaN` entries. Functions whose result is
//! undefined for the remaining values return `NaN` rather than an error,
//! matching the way aggregate columns carry missing values downstream.

use crate::{MathError, Result};

/// Collect the non-missing values of a slice
pub fn valid_values(values: &[f64]) -> Vec<f64> {
    values.iter().copied().filter(|v| !v.is_nan()).collect()
}

/// Number of non-missing values
pub fn count(values: &[f64]) -> usize {
    values.iter().filter(|v| !v.is_nan()).count()
}

/// Number of missing values
pub fn count_missing(values: &[f64]) -> usize {
    values.len() - count(values)
}

/// Sum of the non-missing values (0.0 when there are none)
pub fn sum(values: &[f64]) -> f64 {
    values.iter().filter(|v| !v.is_nan()).sum()
}

/// Arithmetic mean of the non-missing values
pub fn mean(values: &[f64]) -> f64 {
    let n = count(values);
    if n == 0 {
        return f64::NAN;
    }
    sum(values) / n as f64
}

/// Minimum of the non-missing values
pub fn min(values: &[f64]) -> f64 {
    values
        .iter()
        .copied()
        .filter(|v| !v.is_nan())
        .fold(f64::NAN, |acc, v| if acc.is_nan() || v < acc { v } else { acc })
}

/// Maximum of the non-missing values
pub fn max(values: &[f64]) -> f64 {
    values
        .iter()
        .copied()
        .filter(|v| !v.is_nan())
        .fold(f64::NAN, |acc, v| if acc.is_nan() || v > acc { v } else { acc })
}

/// Sample standard deviation (denominator `n - 1`)
///
/// Fewer than two non-missing values yield `NaN`.
pub fn sample_std(values: &[f64]) -> f64 {
    let valid = valid_values(values);
    let n = valid.len();
    if n < 2 {
        return f64::NAN;
    }
    let m = valid.iter().sum::<f64>() / n as f64;
    let ss: f64 = valid.iter().map(|v| (v - m).powi(2)).sum();
    (ss / (n as f64 - 1.0)).sqrt()
}

/// Quantile with linear interpolation between the two nearest order statistics
///
/// `q` must lie in `[0, 1]`. Returns `NaN` when no value is present.
pub fn quantile(values: &[f64], q: f64) -> Result<f64> {
    if !(0.0..=1.0).contains(&q) {
        return Err(MathError::InvalidInput(format!(
            "Quantile must be between 0 and 1, got {}",
            q
        )));
    }

    let mut sorted = valid_values(values);
    if sorted.is_empty() {
        return Ok(f64::NAN);
    }
    sorted.sort_by(|a, b| a.total_cmp(b));

    let position = q * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let fraction = position - lower as f64;

    Ok(sorted[lower] + (sorted[upper] - sorted[lower]) * fraction)
}

/// Percentile in `[0, 100]`, same interpolation as [`quantile`]
pub fn percentile(values: &[f64], p: f64) -> Result<f64> {
    if !(0.0..=100.0).contains(&p) {
        return Err(MathError::InvalidInput(format!(
            "Percentile must be between 0 and 100, got {}",
            p
        )));
    }
    quantile(values, p / 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_missing_values_are_skipped() {
        let values = [1.0, f64::NAN, 3.0];
        assert_eq!(count(&values), 2);
        assert_relative_eq!(sum(&values), 4.0);
        assert_relative_eq!(mean(&values), 2.0);
        assert_relative_eq!(min(&values), 1.0);
        assert_relative_eq!(max(&values), 3.0);
    }

    #[test]
    fn test_empty_statistics() {
        let values = [f64::NAN, f64::NAN];
        assert_eq!(sum(&values), 0.0);
        assert!(mean(&values).is_nan());
        assert!(min(&values).is_nan());
        assert!(max(&values).is_nan());
        assert!(sample_std(&values).is_nan());
    }

    #[test]
    fn test_sample_std() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        // Population std is 2.0, sample std is sqrt(32 / 7)
        assert_relative_eq!(sample_std(&values), (32.0f64 / 7.0).sqrt(), epsilon = 1e-12);
        assert!(sample_std(&[5.0]).is_nan());
    }

    #[test]
    fn test_quantile_interpolates() {
        let values = [1.0, 2.0, 3.0, 4.0];
        assert_relative_eq!(quantile(&values, 0.25).unwrap(), 1.75);
        assert_relative_eq!(quantile(&values, 0.5).unwrap(), 2.5);
        assert_relative_eq!(quantile(&values, 0.75).unwrap(), 3.25);
        assert_relative_eq!(quantile(&values, 1.0).unwrap(), 4.0);
        assert_relative_eq!(percentile(&values, 10.0).unwrap(), 1.3, epsilon = 1e-12);
    }

    #[test]
    fn test_quantile_rejects_out_of_range() {
        assert!(quantile(&[1.0], 1.5).is_err());
        assert!(percentile(&[1.0], -1.0).is_err());
    }
}
