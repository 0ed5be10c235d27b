use serde::Deserialize;

use super::frequency::{Frequency, TimeUnit};
use crate::dataset::DatasetBuilder;
use crate::error::{Result, TimeseriesError};

/// Training-side dataset selection, as configured by the host.
///
/// Parsed from JSON, then checked against the columns of the input table
/// with [`DatasetParams::validate`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DatasetParams {
    pub time_column: String,
    pub target_columns: Vec<String>,
    #[serde(default)]
    pub timeseries_identifiers: Vec<String>,
    #[serde(default)]
    pub external_feature_columns: Vec<String>,
    pub time_granularity_unit: String,
    #[serde(default)]
    pub time_granularity_step: Option<u32>,
    #[serde(default)]
    pub prediction_length: Option<usize>,
}

impl DatasetParams {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Check the selection against the columns available in the input table.
    pub fn validate(&self, columns: &[&str]) -> Result<()> {
        let has = |name: &str| columns.contains(&name);

        if self.time_column.is_empty() || !has(&self.time_column) {
            return Err(TimeseriesError::Config(
                "Invalid time column selection".to_string(),
            ));
        }
        if self.target_columns.is_empty() || self.target_columns.iter().any(|c| !has(c)) {
            return Err(TimeseriesError::Config(
                "Invalid target column(s) selection".to_string(),
            ));
        }
        if let Some(c) = self.timeseries_identifiers.iter().find(|c| !has(c)) {
            return Err(TimeseriesError::Config(format!(
                "Invalid time series identifiers selection: {}",
                c
            )));
        }
        if let Some(c) = self.external_feature_columns.iter().find(|c| !has(c)) {
            return Err(TimeseriesError::Config(format!(
                "Invalid external features selection: {}",
                c
            )));
        }
        if let Some(c) = self
            .target_columns
            .iter()
            .find(|c| self.timeseries_identifiers.contains(*c) || **c == self.time_column)
        {
            return Err(TimeseriesError::Config(format!(
                "Column {} cannot be both a target and a time or identifier column",
                c
            )));
        }
        if self.time_granularity_step.is_none() {
            return Err(TimeseriesError::Config(
                "Time granularity step is not set.".to_string(),
            ));
        }
        if self.prediction_length.is_none() {
            return Err(TimeseriesError::Config(
                "Prediction length is not set.".to_string(),
            ));
        }
        self.frequency()?;
        Ok(())
    }

    /// Frequency built from the granularity unit and step.
    pub fn frequency(&self) -> Result<Frequency> {
        let unit = TimeUnit::from_code(&self.time_granularity_unit).ok_or_else(|| {
            TimeseriesError::Config(format!(
                "Invalid time granularity unit '{}'",
                self.time_granularity_unit
            ))
        })?;
        Frequency::new(self.time_granularity_step.unwrap_or(1), unit)
    }

    /// Dataset builder configured with this selection.
    pub fn builder(&self) -> Result<DatasetBuilder> {
        Ok(
            DatasetBuilder::new(self.time_column.clone(), self.frequency()?, self.target_columns.clone())
                .with_identifiers(self.timeseries_identifiers.clone())
                .with_external_features(self.external_feature_columns.clone()),
        )
    }

    /// Every column the builder reads, time column first.
    pub fn columns_to_keep(&self) -> Vec<String> {
        let mut columns = vec![self.time_column.clone()];
        columns.extend(self.timeseries_identifiers.iter().cloned());
        columns.extend(self.target_columns.iter().cloned());
        columns.extend(self.external_feature_columns.iter().cloned());
        columns
    }
}
