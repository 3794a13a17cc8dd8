//! Panel loading and parquet/CSV checkpoints.
//!
//! Output layout under a project root:
//!
//! ```text
//! temp/alphas.parquet                     alpha checkpoint
//! temp/experiment.json                    configuration read by array tasks
//! weights/{signal}/{gamma}/{year}.parquet per-year optimizer output
//! ```

use crate::config::ExperimentConfig;
use polars::prelude::*;
use reverso_traits::{Date, Panel, ReversoError, Result, columns, frame};
use std::fs::{self, File};
use std::path::{Path, PathBuf};

/// Columns stored in percent units by the data vendor.
pub const PERCENT_COLUMNS: [&str; 3] = [
    columns::RETURN,
    columns::SPECIFIC_RETURN,
    columns::SPECIFIC_RISK,
];

/// Which slice of a panel file to load.
#[derive(Debug, Clone, Default)]
pub struct PanelQuery {
    /// First date (inclusive)
    pub start: Option<Date>,
    /// Last date (inclusive)
    pub end: Option<Date>,
    /// Columns to keep besides `date` and `barrid`; all when `None`
    pub columns: Option<Vec<String>>,
    /// Keep universe members only (requires `in_universe`)
    pub in_universe: bool,
    /// Divide [`PERCENT_COLUMNS`] by 100
    pub percent_to_decimal: bool,
}

impl PanelQuery {
    /// The date range and universe flag of `config`, converting percent
    /// columns and keeping every column.
    pub fn from_config(config: &ExperimentConfig) -> Self {
        Self {
            start: config.start,
            end: config.end,
            columns: None,
            in_universe: config.in_universe,
            percent_to_decimal: true,
        }
    }
}

/// Loads a panel from parquet and applies `query`.
///
/// Rows whose `daily_volume` is null or at most 1 are dropped when the
/// column is present. String dates are parsed to a date column.
pub fn read_panel(path: impl AsRef<Path>, query: &PanelQuery) -> Result<Panel> {
    let path = path.as_ref();
    let df = read_parquet(path)?;
    let loaded = df.height();

    let df = frame::with_date_column(df)?;

    let mut keep = col(columns::DATE).is_not_null();
    if let Some(start) = query.start {
        keep = keep.and(col(columns::DATE).gt_eq(lit(start)));
    }
    if let Some(end) = query.end {
        keep = keep.and(col(columns::DATE).lt_eq(lit(end)));
    }
    if query.in_universe {
        if df.column(columns::IN_UNIVERSE).is_err() {
            return Err(ReversoError::MissingColumn(columns::IN_UNIVERSE.into()));
        }
        keep = keep.and(col(columns::IN_UNIVERSE).fill_null(lit(false)));
    }
    if df.column(columns::DAILY_VOLUME).is_ok() {
        keep = keep.and(
            col(columns::DAILY_VOLUME)
                .cast(DataType::Float64)
                .gt(lit(1.0))
                .fill_null(lit(false)),
        );
    }
    let mut selection = vec![col("*")];
    if let Some(wanted) = &query.columns {
        let keys = [columns::DATE, columns::BARRID];
        selection = keys
            .iter()
            .map(|k| (*k).to_string())
            .chain(wanted.iter().filter(|c| !keys.contains(&c.as_str())).cloned())
            .map(col)
            .collect();
    }
    let present = |name: &str| {
        df.column(name).is_ok()
            && query
                .columns
                .as_ref()
                .is_none_or(|w| w.iter().any(|c| c == name))
    };
    let scaled: Vec<Expr> = if query.percent_to_decimal {
        PERCENT_COLUMNS
            .iter()
            .filter(|name| present(name))
            .map(|name| (col(*name).cast(DataType::Float64) / lit(100.0)).alias(*name))
            .collect()
    } else {
        Vec::new()
    };
    let df = df
        .lazy()
        .filter(keep)
        .select(selection)
        .with_columns(scaled)
        .collect()?;

    tracing::info!(path = %path.display(), loaded, kept = df.height(), "loaded panel");
    Ok(Panel::new(df))
}

/// Reads a parquet file.
pub fn read_parquet(path: impl AsRef<Path>) -> Result<DataFrame> {
    let file = File::open(path.as_ref())?;
    Ok(ParquetReader::new(file).finish()?)
}

/// Writes `df` to a parquet file, creating parent directories.
pub fn write_parquet(df: &mut DataFrame, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    ParquetWriter::new(File::create(path)?).finish(df)?;
    tracing::debug!(path = %path.display(), rows = df.height(), "wrote parquet");
    Ok(())
}

/// Reads a CSV file with a header row.
pub fn read_csv(path: impl AsRef<Path>) -> Result<DataFrame> {
    Ok(CsvReadOptions::default()
        .with_has_header(true)
        .try_into_reader_with_file_path(Some(path.as_ref().to_path_buf()))?
        .finish()?)
}

/// Writes `df` as CSV, creating parent directories.
pub fn write_csv(df: &mut DataFrame, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    CsvWriter::new(File::create(path)?)
        .include_header(true)
        .finish(df)?;
    Ok(())
}

/// Alpha checkpoint location under a project root.
pub fn alphas_path(project_root: impl AsRef<Path>) -> PathBuf {
    project_root.as_ref().join("temp").join("alphas.parquet")
}

/// Experiment configuration shared by the tasks of a job array.
pub fn experiment_path(project_root: impl AsRef<Path>) -> PathBuf {
    project_root.as_ref().join("temp").join("experiment.json")
}

/// Writes `config` as pretty-printed JSON, creating parent directories.
pub fn write_experiment(config: &ExperimentConfig, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(config)
        .map_err(|e| ReversoError::Config(format!("cannot serialize experiment config: {e}")))?;
    fs::write(path, json)?;
    tracing::debug!(path = %path.display(), "wrote experiment config");
    Ok(())
}

/// Directory of per-year weights for one (signal, gamma).
pub fn weights_dir(project_root: impl AsRef<Path>, signal: &str, gamma: f64) -> PathBuf {
    project_root
        .as_ref()
        .join("weights")
        .join(signal)
        .join(gamma.to_string())
}

/// Per-year weights file inside a weights directory.
pub fn year_path(dir: impl AsRef<Path>, year: i32) -> PathBuf {
    dir.as_ref().join(format!("{year}.parquet"))
}

/// Concatenates every `*.parquet` file of a weights directory, in file
/// name order.
pub fn read_weights_dir(dir: impl AsRef<Path>) -> Result<DataFrame> {
    let dir = dir.as_ref();
    let mut files: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.extension().is_some_and(|ext| ext == "parquet"))
        .collect();
    files.sort();

    let mut frames = files.iter().map(read_parquet);
    let mut combined = frames.next().ok_or_else(|| {
        ReversoError::InsufficientData(format!("no parquet files in {}", dir.display()))
    })??;
    for df in frames {
        combined.vstack_mut(&df?)?;
    }
    tracing::info!(
        dir = %dir.display(),
        files = files.len(),
        rows = combined.height(),
        "read weights"
    );
    Ok(combined)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use tempfile::tempdir;

    fn d(day: u32) -> Option<Date> {
        Date::from_ymd_opt(2024, 1, day)
    }

    fn raw_panel() -> DataFrame {
        let mut df = df! {
            "barrid" => &["A", "B", "A", "B", "A"],
            "return" => &[1.5, -2.0, 0.5, 1.0, 3.0],
            "price" => &[10.0, 20.0, 11.0, 21.0, 12.0],
            "daily_volume" => &[Some(1000.0), Some(1.0), None, Some(500.0), Some(800.0)],
            "in_universe" => &[true, true, true, false, true],
        }
        .unwrap();
        df.with_column(frame::date_series("date", &[d(1), d(1), d(2), d(2), d(3)]).unwrap())
            .unwrap();
        df
    }

    #[test]
    fn test_read_panel_applies_query() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("panel.parquet");
        write_parquet(&mut raw_panel(), &path).unwrap();

        let query = PanelQuery {
            start: d(1),
            end: d(2),
            columns: Some(vec!["return".into(), "price".into()]),
            in_universe: true,
            percent_to_decimal: true,
        };
        let panel = read_panel(&path, &query).unwrap();

        // Row 1 fails the volume floor, row 2 has no volume, row 3 is out of
        // the universe and row 4 is past the end date.
        assert_eq!(panel.len(), 1);
        assert_eq!(panel.columns(), vec!["date", "barrid", "return", "price"]);
        let returns = frame::f64_values(panel.data(), "return").unwrap();
        assert_relative_eq!(returns[0].unwrap(), 0.015, epsilon = 1e-12);
    }

    #[test]
    fn test_read_panel_string_dates_all_columns() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("panel.parquet");
        let mut df = df! {
            "date" => &["2024-01-03", "2024-01-02"],
            "barrid" => &["A", "A"],
            "specific_risk" => &[25.0, 30.0],
        }
        .unwrap();
        write_parquet(&mut df, &path).unwrap();

        let query = PanelQuery {
            start: d(3),
            percent_to_decimal: true,
            ..PanelQuery::default()
        };
        let panel = read_panel(&path, &query).unwrap();

        assert_eq!(panel.len(), 1);
        assert_eq!(panel.data().column("date").unwrap().dtype(), &DataType::Date);
        let risk = frame::f64_values(panel.data(), "specific_risk").unwrap();
        assert_relative_eq!(risk[0].unwrap(), 0.25, epsilon = 1e-12);
    }

    #[test]
    fn test_read_panel_universe_requires_column() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("panel.parquet");
        let mut df = df! { "date" => &["2024-01-02"], "barrid" => &["A"] }.unwrap();
        write_parquet(&mut df, &path).unwrap();

        let query = PanelQuery {
            in_universe: true,
            ..PanelQuery::default()
        };
        assert!(matches!(read_panel(&path, &query), Err(ReversoError::MissingColumn(_))));
    }

    #[test]
    fn test_read_weights_dir_concatenates_years() {
        let dir = tempdir().unwrap();
        let weights = weights_dir(dir.path(), "reversal", 50.0);
        for (year, n) in [(2023, 2usize), (2024, 3)] {
            let mut df = df! { "barrid" => vec!["A"; n], "weight" => vec![0.1; n] }.unwrap();
            write_parquet(&mut df, year_path(&weights, year)).unwrap();
        }

        let combined = read_weights_dir(&weights).unwrap();
        assert_eq!(combined.height(), 5);
        assert!(weights.ends_with("weights/reversal/50"));
    }

    #[test]
    fn test_empty_weights_dir() {
        let dir = tempdir().unwrap();
        assert!(read_weights_dir(dir.path()).is_err());
    }

    #[test]
    fn test_csv_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out").join("returns.csv");
        let mut df = df! { "portfolio" => &["0", "spread"], "return" => &[0.01, 0.02] }.unwrap();
        write_csv(&mut df, &path).unwrap();
        let back = read_csv(&path).unwrap();
        assert_eq!(back.shape(), (2, 2));
    }
}
