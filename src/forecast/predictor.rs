//! Boundary between the reconstructor and a forecasting backend.

use statrs::distribution::{ContinuousCDF, Normal};

use crate::common::types::SeriesDataset;
use crate::error::{Result, TimeseriesError};

/// Which quantile levels a forecast can produce.
#[derive(Debug, Clone, PartialEq)]
pub enum QuantileCapability {
    /// Only the listed levels, as emitted by the trained model.
    Fixed(Vec<f64>),
    /// Any level in [0, 1].
    Flexible,
}

/// Probabilistic forecast of one series.
pub trait QuantileForecast {
    /// Number of forecast steps.
    fn horizon(&self) -> usize;

    fn quantile_capability(&self) -> QuantileCapability;

    /// Trajectory of the `level` quantile, one value per step.
    fn quantile(&self, level: f64) -> Result<Vec<f64>>;
}

/// Opaque forecasting model.
pub trait Predictor {
    type Forecast: QuantileForecast;

    /// Longest horizon the model can emit.
    fn max_horizon(&self) -> usize;

    /// One forecast per record of `dataset`, in record order.
    fn predict(&self, dataset: &SeriesDataset) -> Result<Vec<Self::Forecast>>;
}

/// Forecast made of a discrete set of quantile trajectories.
#[derive(Debug, Clone, PartialEq)]
pub struct FixedQuantileForecast {
    levels: Vec<f64>,
    values: Vec<Vec<f64>>,
}

impl FixedQuantileForecast {
    /// `values[i]` is the trajectory of `levels[i]`.
    pub fn new(levels: Vec<f64>, values: Vec<Vec<f64>>) -> Result<Self> {
        if levels.is_empty() || levels.len() != values.len() {
            return Err(TimeseriesError::Shape {
                expected: format!("one trajectory per quantile level ({})", levels.len()),
                actual: format!("{} trajectories", values.len()),
            });
        }
        let horizon = values[0].len();
        if values.iter().any(|v| v.len() != horizon) {
            return Err(TimeseriesError::Shape {
                expected: format!("trajectories of {} steps", horizon),
                actual: "trajectories of different lengths".to_string(),
            });
        }
        Ok(FixedQuantileForecast { levels, values })
    }
}

impl QuantileForecast for FixedQuantileForecast {
    fn horizon(&self) -> usize {
        self.values.first().map(Vec::len).unwrap_or(0)
    }

    fn quantile_capability(&self) -> QuantileCapability {
        QuantileCapability::Fixed(self.levels.clone())
    }

    fn quantile(&self, level: f64) -> Result<Vec<f64>> {
        self.levels
            .iter()
            .position(|l| (l - level).abs() < 1e-9)
            .map(|i| self.values[i].clone())
            .ok_or_else(|| {
                TimeseriesError::Predictor(format!("Quantile {} is not available in this forecast", level))
            })
    }
}

/// Forecast made of sampled trajectories.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleForecast {
    /// One row per sample path.
    samples: Vec<Vec<f64>>,
}

impl SampleForecast {
    pub fn new(samples: Vec<Vec<f64>>) -> Result<Self> {
        let Some(first) = samples.first() else {
            return Err(TimeseriesError::Shape {
                expected: "at least one sample path".to_string(),
                actual: "no samples".to_string(),
            });
        };
        let horizon = first.len();
        if samples.iter().any(|s| s.len() != horizon) {
            return Err(TimeseriesError::Shape {
                expected: format!("sample paths of {} steps", horizon),
                actual: "sample paths of different lengths".to_string(),
            });
        }
        Ok(SampleForecast { samples })
    }

    pub fn num_samples(&self) -> usize {
        self.samples.len()
    }
}

impl QuantileForecast for SampleForecast {
    fn horizon(&self) -> usize {
        self.samples.first().map(Vec::len).unwrap_or(0)
    }

    fn quantile_capability(&self) -> QuantileCapability {
        QuantileCapability::Flexible
    }

    /// Empirical quantile: the sample at index `round((n - 1) * level)` of
    /// the sorted samples of each step.
    fn quantile(&self, level: f64) -> Result<Vec<f64>> {
        check_level(level)?;
        let n = self.samples.len();
        let index = ((n - 1) as f64 * level).round() as usize;
        Ok((0..self.horizon())
            .map(|step| {
                let mut column: Vec<f64> = self.samples.iter().map(|s| s[step]).collect();
                column.sort_by(f64::total_cmp);
                column[index]
            })
            .collect())
    }
}

/// Forecast with a normal predictive distribution at every step.
#[derive(Debug, Clone, PartialEq)]
pub struct GaussianForecast {
    mean: Vec<f64>,
    std_dev: Vec<f64>,
}

impl GaussianForecast {
    pub fn new(mean: Vec<f64>, std_dev: Vec<f64>) -> Result<Self> {
        if mean.len() != std_dev.len() {
            return Err(TimeseriesError::Shape {
                expected: format!("{} standard deviations", mean.len()),
                actual: format!("{}", std_dev.len()),
            });
        }
        if let Some(sd) = std_dev.iter().find(|sd| sd.is_nan() || **sd < 0.0) {
            return Err(TimeseriesError::Predictor(format!(
                "Standard deviation must be non-negative, got {}",
                sd
            )));
        }
        Ok(GaussianForecast { mean, std_dev })
    }

    pub fn mean(&self) -> &[f64] {
        &self.mean
    }
}

impl QuantileForecast for GaussianForecast {
    fn horizon(&self) -> usize {
        self.mean.len()
    }

    fn quantile_capability(&self) -> QuantileCapability {
        QuantileCapability::Flexible
    }

    fn quantile(&self, level: f64) -> Result<Vec<f64>> {
        check_level(level)?;
        self.mean
            .iter()
            .zip(&self.std_dev)
            .map(|(&mean, &sd)| {
                if sd == 0.0 {
                    return Ok(mean);
                }
                let dist = Normal::new(mean, sd)
                    .map_err(|e| TimeseriesError::Predictor(format!("Invalid normal distribution: {}", e)))?;
                Ok(dist.inverse_cdf(level))
            })
            .collect()
    }
}

fn check_level(level: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&level) {
        return Err(TimeseriesError::Config(
            "Quantiles must be between 0 and 1.".to_string(),
        ));
    }
    Ok(())
}
