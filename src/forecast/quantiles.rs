//! Quantile resolution, forecast column naming and column descriptions.

use super::predictor::QuantileCapability;

const MEDIAN: f64 = 0.5;

/// Quantiles to extract from the forecasts, sorted ascending.
///
/// With a fixed capability each requested quantile is snapped to the
/// closest available level (the first one on a tie), then duplicates are
/// dropped.
pub fn resolve_quantiles(requested: &[f64], capability: &QuantileCapability) -> Vec<f64> {
    let mut resolved: Vec<f64> = match capability {
        QuantileCapability::Flexible => requested.to_vec(),
        QuantileCapability::Fixed(levels) if levels.is_empty() => requested.to_vec(),
        QuantileCapability::Fixed(levels) => requested
            .iter()
            .filter_map(|&q| {
                levels
                    .iter()
                    .copied()
                    .min_by(|a, b| (a - q).abs().total_cmp(&(b - q).abs()))
            })
            .collect(),
    };
    resolved.sort_by(f64::total_cmp);
    resolved.dedup();
    resolved
}

/// `forecast_<target>` for the median, `forecast_lower_<target>` below it,
/// `forecast_upper_<target>` above it.
pub fn forecast_column_name(target_name: &str, quantile: f64) -> String {
    if quantile < MEDIAN {
        format!("forecast_lower_{}", target_name)
    } else if quantile > MEDIAN {
        format!("forecast_upper_{}", target_name)
    } else {
        format!("forecast_{}", target_name)
    }
}

/// Width in percent of the interval between the lowest and highest quantile.
pub fn confidence_interval(quantiles: &[f64]) -> u32 {
    let (lower, upper) = bounds(quantiles);
    ((upper - lower) * 100.0).round() as u32
}

/// Whether the lowest and highest quantiles are symmetric around the
/// median, compared at two decimals of a percent.
pub fn is_centered(quantiles: &[f64]) -> bool {
    let (lower, upper) = bounds(quantiles);
    ((1.0 - upper) * 10_000.0).round() == (lower * 10_000.0).round()
}

/// Quantiles whose column is overwritten by a later quantile on the same
/// side of the median.
pub fn overwritten_quantiles(quantiles: &[f64]) -> Vec<f64> {
    let lower: Vec<f64> = quantiles.iter().copied().filter(|q| *q < MEDIAN).collect();
    let upper: Vec<f64> = quantiles.iter().copied().filter(|q| *q > MEDIAN).collect();
    let mut overwritten = Vec::new();
    for side in [lower, upper] {
        if let Some((_, earlier)) = side.split_last() {
            overwritten.extend_from_slice(earlier);
        }
    }
    overwritten
}

/// Human readable description of a forecast column, if `column` follows the
/// forecast naming convention.
pub fn describe_forecast_column(column: &str, confidence_interval: u32) -> Option<String> {
    if column.starts_with("forecast_lower_") {
        Some(format!(
            "Lower bound of the {}% forecasts confidence interval.",
            confidence_interval
        ))
    } else if column.starts_with("forecast_upper_") {
        Some(format!(
            "Upper bound of the {}% forecasts confidence interval.",
            confidence_interval
        ))
    } else if column.starts_with("forecast_") {
        Some("Median of probabilistic forecasts".to_string())
    } else {
        None
    }
}

fn bounds(quantiles: &[f64]) -> (f64, f64) {
    let lower = quantiles.iter().copied().fold(f64::INFINITY, f64::min);
    let upper = quantiles.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if quantiles.is_empty() {
        (MEDIAN, MEDIAN)
    } else {
        (lower, upper)
    }
}
