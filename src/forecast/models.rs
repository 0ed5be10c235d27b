use augurs_core::{Fit, Predict};
use augurs_ets::AutoETS;
use statrs::distribution::{ContinuousCDF, Normal};
use tracing::debug;

use super::predictor::{GaussianForecast, Predictor};
use crate::common::types::{SeriesDataset, SeriesRecord};
use crate::error::{Result, TimeseriesError};

/// Minimum number of observations required to fit a series.
pub const MIN_DATA_POINTS: usize = 4;

/// Reference predictor fitting an automatic ETS model to every series.
///
/// The predictive distribution at each step is taken as normal, centred on
/// the point forecast, with a spread recovered from the prediction interval
/// at `interval_level`.
#[derive(Debug, Clone, PartialEq)]
pub struct EtsPredictor {
    horizon: usize,
    interval_level: f64,
    season_length: Option<usize>,
}

impl EtsPredictor {
    /// Non-seasonal ETS ("ZZN") emitting up to `horizon` steps.
    pub fn new(horizon: usize) -> Self {
        EtsPredictor {
            horizon,
            interval_level: 0.95,
            season_length: None,
        }
    }

    /// Search over all error/trend/seasonality components ("ZZZ") with the
    /// given seasonal period.
    pub fn seasonal(horizon: usize, season_length: usize) -> Self {
        EtsPredictor {
            season_length: Some(season_length),
            ..Self::new(horizon)
        }
    }

    /// Level of the augurs prediction interval the spread is derived from.
    pub fn with_interval_level(mut self, level: f64) -> Result<Self> {
        if level <= 0.0 || level >= 1.0 {
            return Err(TimeseriesError::Config(
                "Interval level must be between 0.0 and 1.0 (exclusive)".to_string(),
            ));
        }
        self.interval_level = level;
        Ok(self)
    }

    fn forecast_record(&self, record: &SeriesRecord) -> Result<GaussianForecast> {
        if record.len() < MIN_DATA_POINTS {
            return Err(TimeseriesError::Predictor(format!(
                "Need at least {} data points for ETS forecasting, got {}",
                MIN_DATA_POINTS,
                record.len()
            )));
        }
        if record.target.iter().any(|v| !v.is_finite()) {
            return Err(TimeseriesError::Predictor(format!(
                "Target {} contains missing values",
                record.target_name
            )));
        }

        let model = match self.season_length {
            Some(season_length) if season_length > 1 => AutoETS::new(season_length, "ZZZ")
                .map_err(|e| TimeseriesError::Predictor(format!("Failed to create seasonal ETS model: {}", e)))?,
            _ => AutoETS::non_seasonal(),
        };
        let fitted = model
            .fit(&record.target)
            .map_err(|e| TimeseriesError::Predictor(format!("ETS model fitting failed: {}", e)))?;
        let forecast = fitted
            .predict(self.horizon, self.interval_level)
            .map_err(|e| TimeseriesError::Predictor(format!("ETS prediction failed: {}", e)))?;

        // No intervals means no spread: the forecast degenerates to the point.
        let std_dev = match forecast.intervals {
            Some(intervals) => {
                let z = standard_normal()?.inverse_cdf(0.5 + self.interval_level / 2.0);
                intervals
                    .lower
                    .iter()
                    .zip(&intervals.upper)
                    .map(|(lo, hi)| ((hi - lo) / (2.0 * z)).max(0.0))
                    .collect()
            }
            None => vec![0.0; forecast.point.len()],
        };
        GaussianForecast::new(forecast.point, std_dev)
    }
}

impl Predictor for EtsPredictor {
    type Forecast = GaussianForecast;

    fn max_horizon(&self) -> usize {
        self.horizon
    }

    fn predict(&self, dataset: &SeriesDataset) -> Result<Vec<GaussianForecast>> {
        let forecasts = dataset
            .records
            .iter()
            .map(|record| self.forecast_record(record))
            .collect::<Result<Vec<_>>>()?;
        debug!(
            series = forecasts.len(),
            horizon = self.horizon,
            seasonal = self.season_length.is_some(),
            "Fitted ETS models"
        );
        Ok(forecasts)
    }
}

fn standard_normal() -> Result<Normal> {
    Normal::new(0.0, 1.0).map_err(|e| TimeseriesError::Predictor(e.to_string()))
}
