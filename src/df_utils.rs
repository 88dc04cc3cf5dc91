use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use polars::prelude::*;

use crate::error::LambdaError;

pub fn ensure_utf8(mut df: DataFrame, cols: &[&str]) -> Result<DataFrame> {
    for col in cols {
        if let Ok(column) = df.column(col)
            && let Some(series) = column.as_series()
            && series.dtype() != &DataType::String
        {
            let mut casted = series.cast(&DataType::String)?;
            casted.rename((*col).into());
            df.with_column(casted)?;
        }
    }
    Ok(df)
}

/// Casts `cols` to `Float64`; tokens that do not parse become null.
pub fn ensure_f64(mut df: DataFrame, cols: &[&str]) -> Result<DataFrame> {
    for col in cols {
        if let Ok(column) = df.column(col)
            && let Some(series) = column.as_series()
            && series.dtype() != &DataType::Float64
        {
            let mut casted = series.cast(&DataType::Float64)?;
            casted.rename((*col).into());
            df.with_column(casted)?;
        }
    }
    Ok(df)
}

/// Casts the string column `col` to `Float64`, failing on the first present
/// value that is not a number. Missing tokens must already be null.
pub fn ensure_f64_strict(df: DataFrame, col: &str, path: &Path) -> Result<DataFrame> {
    let raw = df.column(col)?.as_series().context(col.to_string())?.clone();
    let df = ensure_f64(df, &[col])?;
    if raw.dtype() != &DataType::String {
        return Ok(df);
    }

    let raw = raw.str()?;
    let bad = {
        let casted = df.column(col)?.as_series().context(col.to_string())?.f64()?;
        raw.into_iter()
            .zip(casted)
            .position(|(token, value)| token.is_some() && value.is_none())
    };
    if let Some(row) = bad {
        let token = raw.get(row).unwrap_or_default();
        return Err(LambdaError::InputFile {
            path: path.to_path_buf(),
            message: format!("non-numeric value '{token}' in field '{col}' (data row {})", row + 1),
        }
        .into());
    }
    Ok(df)
}

/// Drops every row holding a null (or a NaN, for float columns) in any of
/// `cols`. Returns the filtered frame and the number of rows removed.
pub fn filter_missing(mut df: DataFrame, cols: &[&str]) -> Result<(DataFrame, usize)> {
    let before = df.height();
    let mut mask = BooleanChunked::full("mask".into(), true, before);
    for col in cols {
        let series = df.column(col)?.as_series().context("series")?;
        let present = match series.dtype() {
            DataType::Float64 => series.is_not_null() & series.f64()?.is_not_nan(),
            _ => series.is_not_null(),
        };
        mask = mask & present;
    }
    df = df.filter(&mask)?;
    let removed = before.saturating_sub(df.height());
    Ok((df, removed))
}

/// Keeps the rows whose `marker_col` value belongs to `markers`. Returns the
/// filtered frame and the number of rows kept.
pub fn filter_markers(
    mut df: DataFrame,
    marker_col: &str,
    markers: &HashSet<String>,
) -> Result<(DataFrame, usize)> {
    let ids = df
        .column(marker_col)?
        .as_series()
        .context(marker_col.to_string())?
        .str()?;
    let mask: BooleanChunked = ids
        .into_iter()
        .map(|id| id.is_some_and(|id| markers.contains(id)))
        .collect();
    df = df.filter(&mask)?;
    let kept = df.height();
    Ok((df, kept))
}

pub fn column_values(df: &DataFrame, col: &str) -> Result<Vec<f64>> {
    let values = df
        .column(col)?
        .as_series()
        .context(col.to_string())?
        .f64()?
        .into_iter()
        .map(|v| v.unwrap_or(f64::NAN))
        .collect();
    Ok(values)
}
