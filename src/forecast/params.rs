use serde::Deserialize;

use crate::error::{Result, TimeseriesError};

fn default_prediction_length() -> i64 {
    -1
}

fn default_quantiles() -> Vec<f64> {
    vec![0.1, 0.5, 0.9]
}

/// Parsed and validated parameters of a prediction run.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PredictParams {
    /// Number of steps to forecast; -1 uses the predictor's horizon.
    #[serde(default = "default_prediction_length")]
    pub prediction_length: i64,
    #[serde(default = "default_quantiles")]
    pub quantiles: Vec<f64>,
    #[serde(default)]
    pub include_history: bool,
    /// Written to a constant `session` column when set.
    #[serde(default)]
    pub session: Option<String>,
    /// Written to a constant `model` column when set.
    #[serde(default)]
    pub model_label: Option<String>,
}

impl Default for PredictParams {
    fn default() -> Self {
        PredictParams {
            prediction_length: default_prediction_length(),
            quantiles: default_quantiles(),
            include_history: false,
            session: None,
            model_label: None,
        }
    }
}

impl PredictParams {
    /// Parse from JSON and validate.
    pub fn from_json(json: &str) -> Result<Self> {
        let mut params: PredictParams = serde_json::from_str(json)?;
        params.validate()?;
        Ok(params)
    }

    /// Check the quantiles and horizon, sorting the quantiles ascending.
    pub fn validate(&mut self) -> Result<()> {
        if self.quantiles.is_empty() {
            return Err(TimeseriesError::Config(
                "At least one quantile is required.".to_string(),
            ));
        }
        if self.quantiles.iter().any(|q| !(0.0..=1.0).contains(q)) {
            return Err(TimeseriesError::Config(
                "Quantiles must be between 0 and 1.".to_string(),
            ));
        }
        self.quantiles.sort_by(f64::total_cmp);
        if self.prediction_length == 0 || self.prediction_length < -1 {
            return Err(TimeseriesError::Config(format!(
                "Prediction length must be a positive integer or -1, got {}",
                self.prediction_length
            )));
        }
        Ok(())
    }

    /// Effective horizon given the longest horizon the predictor can emit.
    pub fn resolve_horizon(&self, max_horizon: usize) -> Result<usize> {
        let requested = match self.prediction_length {
            -1 => max_horizon,
            n if n > 0 => n as usize,
            n => {
                return Err(TimeseriesError::Config(format!(
                    "Prediction length must be a positive integer or -1, got {}",
                    n
                )))
            }
        };
        if requested > max_horizon {
            return Err(TimeseriesError::HorizonTooLong {
                requested,
                max: max_horizon,
            });
        }
        Ok(requested)
    }
}
