//! Forward returns, portfolio returns and cumulative log returns.

use polars::prelude::*;
use reverso_traits::{Panel, ReversoError, Result, columns, frame};

/// Appends `forward_return`: the next period's `return_column` of the same
/// security, attached to the current record.
///
/// The last record of every security has no forward return and stays null.
pub fn forward_returns(panel: &Panel, return_column: &str) -> Result<Panel> {
    panel.require_columns(&[columns::BARRID, columns::DATE, return_column])?;
    let out = frame::with_security_columns(
        panel.data(),
        vec![
            col(return_column)
                .shift(lit(-1))
                .over([col(columns::BARRID)])
                .alias(columns::FORWARD_RETURN),
        ],
    )?;
    let forward = out
        .column(columns::FORWARD_RETURN)?
        .as_materialized_series()
        .clone();
    panel.clone().with_derived(forward)
}

/// Weight-dot-forward-return per (date[, partition]).
///
/// `weights` holds `date`, `barrid`, `weight` and optionally the partition
/// column; `panel` must carry `forward_return`. Holdings without a forward
/// return are skipped; a date where no holding has one is dropped. The
/// output has `date`, the partition column when given, and `return`,
/// sorted by partition then date.
pub fn portfolio_returns(
    weights: &DataFrame,
    panel: &Panel,
    partition: Option<&str>,
) -> Result<DataFrame> {
    panel.require_columns(&[columns::DATE, columns::BARRID, columns::FORWARD_RETURN])?;
    for name in [columns::DATE, columns::BARRID, columns::WEIGHT]
        .into_iter()
        .chain(partition)
    {
        if weights.column(name).is_err() {
            return Err(ReversoError::MissingColumn(name.to_string()));
        }
    }

    let keys = [col(columns::DATE), col(columns::BARRID)];
    let mut held = vec![col(columns::DATE), col(columns::BARRID), col(columns::WEIGHT)];
    let mut group = vec![col(columns::DATE)];
    let mut order = vec![columns::DATE];
    if let Some(name) = partition {
        held.push(col(name));
        group.insert(0, col(name));
        order.insert(0, name);
    }

    let forward = frame::with_date_column(panel.data().clone())?
        .lazy()
        .select([
            col(columns::DATE),
            col(columns::BARRID),
            col(columns::FORWARD_RETURN),
        ])
        .filter(col(columns::FORWARD_RETURN).is_not_null());
    let matched = frame::with_date_column(weights.clone())?
        .lazy()
        .select(held)
        .filter(col(columns::WEIGHT).is_not_null())
        .join(forward, keys.clone(), keys, JoinArgs::new(JoinType::Inner))
        .collect()?;
    tracing::debug!(
        holdings = weights.height(),
        matched = matched.height(),
        "matched holdings to forward returns"
    );

    let mut select = group.clone();
    select.push(col(columns::RETURN));
    let out = matched
        .lazy()
        .group_by(group)
        .agg([(col(columns::WEIGHT) * col(columns::FORWARD_RETURN))
            .sum()
            .alias(columns::RETURN)])
        .sort(order, SortMultipleOptions::default())
        .select(select)
        .collect()?;
    Ok(out)
}

/// Appends `cum_log_return`: the running sum of `ln(1 + r)` in date order,
/// restarting within each partition.
///
/// The first date of each partition carries `ln(1 + r)` itself. A null
/// return yields a null row and the sum resumes from its previous value.
/// Rows keep their input order.
pub fn cumulative_log_returns(
    df: &DataFrame,
    partition: Option<&str>,
    return_column: &str,
) -> Result<DataFrame> {
    let running = col(return_column).log1p().cum_sum(false);
    let (keys, expr) = match partition {
        Some(name) => (vec![name, columns::DATE], running.over([col(name)])),
        None => (vec![columns::DATE], running),
    };
    frame::with_sorted_columns(df, &keys, vec![expr.alias(columns::CUM_LOG_RETURN)])
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use reverso_traits::Date;

    fn d(day: u32) -> Option<Date> {
        Date::from_ymd_opt(2024, 1, day)
    }

    fn panel() -> Panel {
        let mut df = df! {
            "barrid" => &["A", "B", "A", "B", "A", "B"],
            "return" => &[0.01, 0.02, 0.03, -0.01, 0.05, 0.00],
        }
        .unwrap();
        df.with_column(frame::date_series("date", &[d(1), d(1), d(2), d(2), d(3), d(3)]).unwrap())
            .unwrap();
        Panel::new(df)
    }

    #[test]
    fn test_forward_returns_lead_per_security() {
        let out = forward_returns(&panel(), "return").unwrap();
        let fwd = frame::f64_values(out.data(), "forward_return").unwrap();
        assert_eq!(
            fwd,
            vec![Some(0.03), Some(-0.01), Some(0.05), Some(0.00), None, None]
        );
    }

    #[test]
    fn test_portfolio_returns() {
        let panel = forward_returns(&panel(), "return").unwrap();
        let mut weights = df! {
            "barrid" => &["A", "B", "A", "B"],
            "weight" => &[0.5, 0.5, 1.0, -1.0],
            "portfolio" => &["long", "long", "ls", "ls"],
        }
        .unwrap();
        weights
            .with_column(frame::date_series("date", &[d(1), d(1), d(2), d(2)]).unwrap())
            .unwrap();

        let out = portfolio_returns(&weights, &panel, Some("portfolio")).unwrap();
        let labels = frame::str_values(&out, "portfolio").unwrap();
        let returns = frame::f64_values(&out, "return").unwrap();
        assert_eq!(labels, vec![Some("long".to_string()), Some("ls".to_string())]);
        assert_relative_eq!(returns[0].unwrap(), 0.5 * 0.03 + 0.5 * -0.01, epsilon = 1e-12);
        assert_relative_eq!(returns[1].unwrap(), 0.05, epsilon = 1e-12);
    }

    #[test]
    fn test_portfolio_returns_skips_missing_forward() {
        // Day 3 has no forward return for anyone, so it drops out.
        let panel = forward_returns(&panel(), "return").unwrap();
        let mut weights = df! {
            "barrid" => &["A", "B", "A"],
            "weight" => &[1.0, 1.0, 1.0],
        }
        .unwrap();
        weights
            .with_column(frame::date_series("date", &[d(2), d(2), d(3)]).unwrap())
            .unwrap();

        let out = portfolio_returns(&weights, &panel, None).unwrap();
        assert_eq!(out.height(), 1);
        let returns = frame::f64_values(&out, "return").unwrap();
        assert_relative_eq!(returns[0].unwrap(), 0.05 + 0.00, epsilon = 1e-12);
    }

    #[test]
    fn test_portfolio_returns_requires_weight() {
        let panel = forward_returns(&panel(), "return").unwrap();
        let weights = df! { "barrid" => &["A"] }.unwrap();
        assert!(portfolio_returns(&weights, &panel, None).is_err());
    }

    #[test]
    fn test_cumulative_log_recursion() {
        // Partitions interleaved and dates unsorted.
        let mut df = df! {
            "portfolio" => &["x", "y", "x", "y", "x"],
            "return" => &[Some(0.02), Some(0.10), Some(0.01), Some(-0.05), None],
        }
        .unwrap();
        df.with_column(frame::date_series("date", &[d(2), d(1), d(1), d(2), d(3)]).unwrap())
            .unwrap();

        let out = cumulative_log_returns(&df, Some("portfolio"), "return").unwrap();
        let cum = frame::f64_values(&out, "cum_log_return").unwrap();

        let x1 = 0.01_f64.ln_1p();
        assert_relative_eq!(cum[2].unwrap(), x1, epsilon = 1e-12);
        assert_relative_eq!(cum[0].unwrap(), x1 + 0.02_f64.ln_1p(), epsilon = 1e-12);
        assert_eq!(cum[4], None);

        let y1 = 0.10_f64.ln_1p();
        assert_relative_eq!(cum[1].unwrap(), y1, epsilon = 1e-12);
        assert_relative_eq!(cum[3].unwrap(), y1 + (-0.05_f64).ln_1p(), epsilon = 1e-12);
    }
}
