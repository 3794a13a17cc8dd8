//! Column extraction and ordered evaluation over panel DataFrames.
//!
//! These helpers pull typed columns out of a DataFrame (treating NaN as
//! null), build date series back, and evaluate window expressions in a
//! key order while returning rows in the order the caller supplied.

use crate::types::columns;
use crate::{Date, ReversoError, Result};
use chrono::Datelike;
use polars::prelude::*;

/// Days between 0001-01-01 (CE day 1) and the Unix epoch.
pub const CE_TO_UNIX_EPOCH_DAYS: i32 = 719_163;

const ROW_INDEX: &str = "__row";

/// Converts a polars physical date (days since epoch) to a [`Date`].
pub fn date_from_days(days: i32) -> Result<Date> {
    Date::from_num_days_from_ce_opt(days + CE_TO_UNIX_EPOCH_DAYS)
        .ok_or_else(|| ReversoError::InvalidDate(format!("day offset {days} is out of range")))
}

/// Converts a [`Date`] to polars physical days since epoch.
pub fn days_from_date(date: Date) -> i32 {
    date.num_days_from_ce() - CE_TO_UNIX_EPOCH_DAYS
}

fn column<'a>(df: &'a DataFrame, name: &str) -> Result<&'a Column> {
    df.column(name)
        .map_err(|_| ReversoError::MissingColumn(name.to_string()))
}

/// Extracts a numeric column as `f64`, mapping NaN to `None`.
pub fn f64_values(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    let series = column(df, name)?
        .as_materialized_series()
        .cast(&DataType::Float64)?;
    Ok(series
        .f64()?
        .into_iter()
        .map(|v| v.filter(|x| !x.is_nan()))
        .collect())
}

/// Extracts a string column.
pub fn str_values(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    let series = column(df, name)?
        .as_materialized_series()
        .cast(&DataType::String)?;
    Ok(series
        .str()?
        .into_iter()
        .map(|s| s.map(str::to_string))
        .collect())
}

/// Extracts a date column.
///
/// Accepts a polars `Date` column or a `YYYY-MM-DD` string column.
pub fn date_values(df: &DataFrame, name: &str) -> Result<Vec<Option<Date>>> {
    let series = column(df, name)?.as_materialized_series();
    match series.dtype() {
        DataType::String => series
            .str()?
            .into_iter()
            .map(|s| {
                s.map(|s| {
                    Date::parse_from_str(s, "%Y-%m-%d")
                        .map_err(|e| ReversoError::InvalidDate(format!("'{s}': {e}")))
                })
                .transpose()
            })
            .collect(),
        _ => {
            let days = series.cast(&DataType::Date)?.cast(&DataType::Int32)?;
            days.i32()?
                .into_iter()
                .map(|d| d.map(date_from_days).transpose())
                .collect()
        }
    }
}

/// Builds a polars `Date` series from optional dates.
pub fn date_series(name: &str, dates: &[Option<Date>]) -> Result<Series> {
    let days: Vec<Option<i32>> = dates.iter().map(|d| d.map(days_from_date)).collect();
    Ok(Series::new(name.into(), days).cast(&DataType::Date)?)
}

/// Replaces a `YYYY-MM-DD` string `date` column with a polars `Date` column.
///
/// Frames whose `date` is already a date pass through untouched, so joins
/// on `date` line up regardless of how the source file stored it.
pub fn with_date_column(mut df: DataFrame) -> Result<DataFrame> {
    if column(&df, columns::DATE)?.dtype() != &DataType::Date {
        let parsed = date_values(&df, columns::DATE)?;
        df.with_column(date_series(columns::DATE, &parsed)?)?;
    }
    Ok(df)
}

/// Evaluates `exprs` with rows sorted by `keys`, returning the frame in its
/// original row order with the new columns appended.
///
/// Window expressions (`shift`, `rolling_*`, `ewm_mean`, `cum_sum`) see each
/// group in key order; the caller's row order is restored afterwards.
pub fn with_sorted_columns(df: &DataFrame, keys: &[&str], exprs: Vec<Expr>) -> Result<DataFrame> {
    for key in keys {
        column(df, key)?;
    }
    let keys: Vec<PlSmallStr> = keys.iter().map(|k| PlSmallStr::from(*k)).collect();
    let out = df
        .clone()
        .lazy()
        .with_row_index(ROW_INDEX, None)
        .sort(keys, SortMultipleOptions::default().with_maintain_order(true))
        .with_columns(exprs)
        .sort([ROW_INDEX], SortMultipleOptions::default())
        .drop([ROW_INDEX])
        .collect()?;
    Ok(out)
}

/// Evaluates per-security time-series `exprs` in date order.
///
/// Each expression should end in `.over([col("barrid")])` so that one
/// security's history never leaks into another's.
///
/// # Errors
///
/// Fails if either key is null or a (date, barrid) pair repeats.
pub fn with_security_columns(df: &DataFrame, exprs: Vec<Expr>) -> Result<DataFrame> {
    check_panel_keys(df)?;
    with_sorted_columns(df, &[columns::BARRID, columns::DATE], exprs)
}

/// Checks that every row has a `barrid` and `date` and no pair repeats.
pub fn check_panel_keys(df: &DataFrame) -> Result<()> {
    let keys = [col(columns::DATE), col(columns::BARRID)];
    column(df, columns::DATE)?;
    column(df, columns::BARRID)?;

    let nulls = df
        .clone()
        .lazy()
        .filter(col(columns::DATE).is_null().or(col(columns::BARRID).is_null()))
        .collect()?
        .height();
    if nulls > 0 {
        return Err(ReversoError::InvalidData(format!(
            "{nulls} rows have a null barrid or date"
        )));
    }

    let duplicates = df
        .clone()
        .lazy()
        .group_by(keys)
        .agg([len().alias("records")])
        .filter(col("records").gt(lit(1)))
        .collect()?;
    if let Some(barrid) = str_values(&duplicates, columns::BARRID)?.into_iter().flatten().next() {
        return Err(ReversoError::InvalidData(format!(
            "duplicate records for barrid {barrid}"
        )));
    }
    Ok(())
}
