//! Reassembly of per-series quantile forecasts into one wide table.

pub mod models;
pub mod output;
pub mod params;
pub mod predictor;
pub mod quantiles;
pub mod table_writer;

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, info, warn};

use crate::common::types::SeriesDataset;
use crate::error::{Result, TimeseriesError};
use output::{ForecastTable, RowOrigin, TimeFrame, ROW_ORIGIN_COLUMN};
use params::PredictParams;
use predictor::{Predictor, QuantileForecast};

/// Name of the constant session column.
pub const SESSION_COLUMN: &str = "session";
/// Name of the constant model label column.
pub const MODEL_COLUMN: &str = "model";

/// Output of one prediction call.
#[derive(Debug, Clone, PartialEq)]
pub struct Reconstruction {
    pub table: ForecastTable,
    /// Quantiles actually extracted, after snapping to the predictor's levels.
    pub quantiles: Vec<f64>,
    /// Width in percent of the forecast interval.
    pub confidence_interval: u32,
    /// Human readable description per column, in column order.
    pub descriptions: Vec<(String, String)>,
    /// Non-fatal conditions met while reconstructing.
    pub warnings: Vec<String>,
}

impl Reconstruction {
    pub fn description(&self, column: &str) -> Option<&str> {
        self.descriptions
            .iter()
            .find(|(c, _)| c == column)
            .map(|(_, d)| d.as_str())
    }

    /// Append a constant text column.
    fn push_label(&mut self, column: &str, value: &str, description: &str) {
        let rows = self.table.num_rows();
        self.table
            .label_columns
            .push((column.to_string(), vec![value.to_string(); rows]));
        self.descriptions
            .push((column.to_string(), description.to_string()));
    }
}

/// Runs a predictor on a dataset and reconstructs its forecasts.
///
/// The forecasting horizon is checked against the predictor once, when the
/// reconstructor is created.
#[derive(Debug, Clone)]
pub struct ForecastReconstructor<P: Predictor> {
    predictor: P,
    params: PredictParams,
    prediction_length: usize,
}

impl<P: Predictor> ForecastReconstructor<P> {
    pub fn new(predictor: P, mut params: PredictParams) -> Result<Self> {
        params.validate()?;
        let prediction_length = params.resolve_horizon(predictor.max_horizon())?;
        Ok(ForecastReconstructor {
            predictor,
            params,
            prediction_length,
        })
    }

    /// Effective forecasting horizon.
    pub fn prediction_length(&self) -> usize {
        self.prediction_length
    }

    pub fn predictor(&self) -> &P {
        &self.predictor
    }

    pub fn predict(&self, dataset: &SeriesDataset) -> Result<Reconstruction> {
        let forecasts = self.predictor.predict(dataset)?;
        let mut reconstruction = reconstruct(
            &forecasts,
            dataset,
            &self.params.quantiles,
            self.prediction_length,
            self.params.include_history,
        )?;
        if let Some(session) = &self.params.session {
            reconstruction.push_label(SESSION_COLUMN, session, "Timestamp of the prediction session");
        }
        if let Some(model_label) = &self.params.model_label {
            reconstruction.push_label(
                MODEL_COLUMN,
                model_label,
                "Label of the model that produced the forecasts",
            );
        }
        info!(
            series = dataset.len(),
            rows = reconstruction.table.num_rows(),
            prediction_length = self.prediction_length,
            "Reconstructed forecasts"
        );
        Ok(reconstruction)
    }
}

/// Assemble `forecasts` (one per record of `dataset`, in record order) into
/// a wide table with one row per identifier group and timestamp.
///
/// With `include_history` the observed targets, and external features when
/// present, are merged in on timestamp and identifiers.
pub fn reconstruct<F: QuantileForecast>(
    forecasts: &[F],
    dataset: &SeriesDataset,
    quantiles: &[f64],
    prediction_length: usize,
    include_history: bool,
) -> Result<Reconstruction> {
    if forecasts.len() != dataset.len() {
        return Err(TimeseriesError::Shape {
            expected: format!("{} forecasts, one per series", dataset.len()),
            actual: format!("{} forecasts", forecasts.len()),
        });
    }
    let Some(time_column) = dataset.time_column_name() else {
        return Err(TimeseriesError::Config(
            "No time series to reconstruct".to_string(),
        ));
    };
    let frequency = dataset.frequency;

    let resolved = match forecasts.first() {
        Some(first) => quantiles::resolve_quantiles(quantiles, &first.quantile_capability()),
        None => quantiles.to_vec(),
    };

    let mut warnings = Vec::new();
    let overwritten = quantiles::overwritten_quantiles(&resolved);
    if !overwritten.is_empty() {
        warnings.push(format!(
            "Quantiles {:?} share their forecast column with a later quantile on the same side of the median and are not in the output",
            overwritten
        ));
    }
    if !quantiles::is_centered(&resolved) {
        let lower = resolved.first().copied().unwrap_or(0.5);
        let upper = resolved.last().copied().unwrap_or(0.5);
        warnings.push(format!(
            "The output confidence interval is not centered around the median. Lower and upper quantiles are [{}, {}]",
            lower, upper
        ));
    }
    for message in &warnings {
        warn!("{}", message);
    }

    let mut forecast_frames: BTreeMap<Vec<String>, TimeFrame> = BTreeMap::new();
    for (record, forecast) in dataset.records.iter().zip(forecasts) {
        let index = record.forecast_index(&frequency, prediction_length)?;
        let frame = forecast_frames.entry(record.group_key()).or_default();
        for &q in &resolved {
            let trajectory = forecast.quantile(q)?;
            if trajectory.len() < prediction_length {
                return Err(TimeseriesError::Shape {
                    expected: format!("forecasts of at least {} steps", prediction_length),
                    actual: format!("{} steps for {}", trajectory.len(), record.target_name),
                });
            }
            let name = quantiles::forecast_column_name(&record.target_name, q);
            frame.insert(&name, &index, &trajectory[..prediction_length]);
        }
    }

    let mut history_frames: BTreeMap<Vec<String>, TimeFrame> = BTreeMap::new();
    if include_history {
        for record in &dataset.records {
            let steps = record.len() + prediction_length;
            let index = frequency.date_range(record.start, steps)?;
            let frame = history_frames.entry(record.group_key()).or_default();

            if let Some(features) = &record.external_features {
                if !features.names.iter().all(|n| frame.names().contains(n)) {
                    if features.steps() < steps {
                        return Err(TimeseriesError::Shape {
                            expected: format!("external features covering {} time steps", steps),
                            actual: format!("{} time steps", features.steps()),
                        });
                    }
                    for (name, row) in features.names.iter().zip(features.values.rows()) {
                        let values: Vec<f64> = row.iter().take(steps).copied().collect();
                        frame.insert(name, &index, &values);
                    }
                }
            }

            let mut target = record.target.clone();
            target.resize(steps, f64::NAN);
            frame.insert(&record.target_name, &index, &target);
        }
    }

    let table = assemble(
        time_column,
        &dataset.identifier_columns(),
        &forecast_frames,
        include_history.then_some(&history_frames),
    );

    let confidence_interval = quantiles::confidence_interval(&resolved);
    let mut descriptions: Vec<(String, String)> = table
        .value_columns()
        .iter()
        .filter(|(name, _)| forecast_frames.values().any(|f| f.names().contains(name)))
        .filter_map(|(name, _)| {
            quantiles::describe_forecast_column(name, confidence_interval).map(|d| (name.clone(), d))
        })
        .collect();
    descriptions.push((
        ROW_ORIGIN_COLUMN.to_string(),
        "Origin of the row: history, forecast or both (forecast period with available history)"
            .to_string(),
    ));

    debug!(
        quantiles = ?resolved,
        confidence_interval,
        include_history,
        rows = table.num_rows(),
        "Assembled forecast table"
    );

    Ok(Reconstruction {
        table,
        quantiles: resolved,
        confidence_interval,
        descriptions,
        warnings,
    })
}

/// Merge the per-group frames into one table, identifier groups ascending
/// and most recent timestamps first.
fn assemble(
    time_column: &str,
    identifier_columns: &[String],
    forecast_frames: &BTreeMap<Vec<String>, TimeFrame>,
    history_frames: Option<&BTreeMap<Vec<String>, TimeFrame>>,
) -> ForecastTable {
    let mut history_names: Vec<String> = Vec::new();
    let mut forecast_names: Vec<String> = Vec::new();
    for frame in history_frames.into_iter().flat_map(|frames| frames.values()) {
        for name in frame.names() {
            if !history_names.contains(name) {
                history_names.push(name.clone());
            }
        }
    }
    for frame in forecast_frames.values() {
        for name in frame.names() {
            if !forecast_names.contains(name) {
                forecast_names.push(name.clone());
            }
        }
    }

    let mut keys: BTreeSet<&Vec<String>> = forecast_frames.keys().collect();
    if let Some(frames) = history_frames {
        keys.extend(frames.keys());
    }

    let empty = TimeFrame::default();
    let mut timestamps = Vec::new();
    let mut identifier_values: Vec<Vec<String>> = vec![Vec::new(); identifier_columns.len()];
    let mut history_values: Vec<Vec<f64>> = vec![Vec::new(); history_names.len()];
    let mut forecast_values: Vec<Vec<f64>> = vec![Vec::new(); forecast_names.len()];
    let mut row_origin = Vec::new();

    for key in keys {
        let forecast = forecast_frames.get(key).unwrap_or(&empty);
        let history = history_frames.and_then(|frames| frames.get(key));

        let mut group_times: BTreeSet<_> = forecast.timestamps().copied().collect();
        if let Some(history) = history {
            group_times.extend(history.timestamps().copied());
        }

        for ts in group_times.into_iter().rev() {
            let origin = match history {
                Some(history) => match (history.contains(&ts), forecast.contains(&ts)) {
                    (true, true) => RowOrigin::Both,
                    (true, false) => RowOrigin::History,
                    _ => RowOrigin::Forecast,
                },
                None => RowOrigin::Forecast,
            };
            timestamps.push(ts);
            row_origin.push(origin);
            for (column, value) in identifier_values.iter_mut().zip(key.iter()) {
                column.push(value.clone());
            }
            for (column, name) in history_values.iter_mut().zip(&history_names) {
                column.push(history.map(|h| h.value(&ts, name)).unwrap_or(f64::NAN));
            }
            for (column, name) in forecast_values.iter_mut().zip(&forecast_names) {
                column.push(forecast.value(&ts, name));
            }
        }
    }

    ForecastTable {
        time_column: time_column.to_string(),
        timestamps,
        identifier_columns: identifier_columns
            .iter()
            .cloned()
            .zip(identifier_values)
            .collect(),
        value_columns: history_names
            .into_iter()
            .zip(history_values)
            .chain(forecast_names.into_iter().zip(forecast_values))
            .collect(),
        row_origin,
        label_columns: Vec::new(),
    }
}
