//! Summary statistics over price slices
//!
//! Non-finite values are ignored by every function in this module, so a
//! stray `NaN` from an upstream parse never poisons an aggregate.

use crate::{MathError, Result};

fn finite(values: &[f64]) -> Vec<f64> {
    values.iter().copied().filter(|v| v.is_finite()).collect()
}

/// Median of the finite values; the mean of the two middle values for even counts
pub fn median(values: &[f64]) -> Result<f64> {
    let mut sorted = finite(values);
    if sorted.is_empty() {
        return Err(MathError::InsufficientData(
            "Median requires at least one finite value".to_string(),
        ));
    }

    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;

    if sorted.len() % 2 == 0 {
        Ok((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Ok(sorted[mid])
    }
}

/// Arithmetic mean of the finite values
pub fn mean(values: &[f64]) -> Result<f64> {
    let data = finite(values);
    if data.is_empty() {
        return Err(MathError::InsufficientData(
            "Mean requires at least one finite value".to_string(),
        ));
    }

    Ok(data.iter().sum::<f64>() / data.len() as f64)
}

/// Sample standard deviation (n - 1 denominator)
pub fn sample_std_dev(values: &[f64]) -> Result<f64> {
    let data = finite(values);
    if data.len() < 2 {
        return Err(MathError::InsufficientData(format!(
            "Sample standard deviation needs at least 2 values, have {}",
            data.len()
        )));
    }

    let avg = data.iter().sum::<f64>() / data.len() as f64;
    let variance = data.iter().map(|v| (v - avg).powi(2)).sum::<f64>() / (data.len() - 1) as f64;

    Ok(variance.sqrt())
}

/// Differences between consecutive entries: `out[i] = values[i + 1] - values[i]`
pub fn day_over_day(values: &[f64]) -> Vec<f64> {
    values.windows(2).map(|w| w[1] - w[0]).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_median_odd_and_even() {
        assert_eq!(median(&[3.0, 1.0, 2.0]).unwrap(), 2.0);
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]).unwrap(), 2.5);
    }

    #[test]
    fn test_median_resists_outlier() {
        let prices = [179.9, 180.1, 180.0, 999.9];
        assert_approx_eq!(median(&prices).unwrap(), 180.05, 1e-9);
    }

    #[test]
    fn test_median_skips_nan() {
        assert_eq!(median(&[f64::NAN, 5.0]).unwrap(), 5.0);
        assert!(median(&[f64::NAN]).is_err());
        assert!(median(&[]).is_err());
    }

    #[test]
    fn test_sample_std_dev() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_approx_eq!(sample_std_dev(&values).unwrap(), 2.138089935, 1e-6);
        assert!(sample_std_dev(&[1.0]).is_err());
    }

    #[test]
    fn test_mean() {
        assert_approx_eq!(mean(&[1.0, 2.0, 3.0, 4.0]).unwrap(), 2.5);
    }

    #[test]
    fn test_day_over_day() {
        assert_eq!(day_over_day(&[160.0, 161.0, 190.0]), vec![1.0, 29.0]);
        assert!(day_over_day(&[160.0]).is_empty());
    }
}
