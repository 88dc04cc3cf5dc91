//! Genomic inflation factor.
//!
//! Statistics are first brought onto the chi-squared(1) scale according to
//! the [`InputMode`], then lambda is the ratio of their median to the median
//! of chi-squared(1), floored at 1.

use statrs::distribution::{ContinuousCDF, Normal};

use crate::error::{LambdaError, Result};
use crate::types::{InputMode, Sidedness};

/// Median of the chi-squared distribution with one degree of freedom.
pub const EXPECTED_MEDIAN: f64 = 0.454_936_423_119_572_7;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Inflation {
    /// Median of the statistics on the chi-squared(1) scale.
    pub median_chi2: f64,
    pub lambda: f64,
}

pub fn compute_inflation(values: &[f64], mode: InputMode) -> Result<f64> {
    inflation_summary(values, mode).map(|inflation| inflation.lambda)
}

pub fn inflation_summary(values: &[f64], mode: InputMode) -> Result<Inflation> {
    if values.is_empty() {
        return Err(LambdaError::EmptyInput);
    }
    let chi = to_chi_squared(values, mode)?;
    let median_chi2 = median(&chi).ok_or(LambdaError::EmptyInput)?;
    Ok(Inflation {
        median_chi2,
        lambda: floored_ratio(median_chi2),
    })
}

/// Ratio of the observed median to [`EXPECTED_MEDIAN`], never below 1.
fn floored_ratio(observed_median: f64) -> f64 {
    (observed_median / EXPECTED_MEDIAN).max(1.0)
}

pub fn to_chi_squared(values: &[f64], mode: InputMode) -> Result<Vec<f64>> {
    match mode {
        InputMode::RawChiSquared => Ok(values.to_vec()),
        InputMode::RawZOrT => Ok(values.iter().map(|v| v * v).collect()),
        InputMode::PValue(sided) => {
            let normal = Normal::standard();
            values
                .iter()
                .enumerate()
                .map(|(index, &p)| {
                    let z = p_to_z(&normal, p, sided)
                        .ok_or(LambdaError::InvalidPValue { index, value: p })?;
                    Ok(z * z)
                })
                .collect()
        }
    }
}

/// Upper-tail normal quantile of a p-value, `Φ⁻¹(1 - p)`.
///
/// Evaluated as `-Φ⁻¹(p)` so that p-values far below machine epsilon keep
/// their magnitude instead of collapsing `1 - p` to 1.
fn p_to_z(normal: &Normal, p: f64, sided: Sidedness) -> Option<f64> {
    if !(p > 0.0 && p < 1.0) {
        return None;
    }
    let p = match sided {
        Sidedness::TwoSided => 0.5 * p,
        Sidedness::OneSided => p,
    };
    Some(-normal.inverse_cdf(p))
}

pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len().is_multiple_of(2) {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}
