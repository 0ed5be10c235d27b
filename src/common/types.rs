use chrono::NaiveDateTime;
use ndarray::Array2;

use super::frequency::Frequency;
use crate::error::Result;

/// Identifier values of one series, in identifier-column order.
///
/// For example, with `timeseries_identifiers = ["region", "product"]` one
/// series might carry `[("region", "US"), ("product", "Widget")]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identifiers(Vec<(String, String)>);

impl Identifiers {
    /// Pair identifier column names with the values of a group key.
    pub fn from_key(columns: &[String], key: &[String]) -> Self {
        Identifiers(columns.iter().cloned().zip(key.iter().cloned()).collect())
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(c, _)| c == column)
            .map(|(_, v)| v.as_str())
    }

    pub fn columns(&self) -> Vec<String> {
        self.0.iter().map(|(c, _)| c.clone()).collect()
    }

    /// Group key: the identifier values in column order.
    pub fn key(&self) -> Vec<String> {
        self.0.iter().map(|(_, v)| v.clone()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(c, v)| (c.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for Identifiers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let pairs: Vec<String> = self.0.iter().map(|(c, v)| format!("{}={}", c, v)).collect();
        write!(f, "({})", pairs.join(", "))
    }
}

/// Dynamic real-valued covariates of a series.
///
/// `values` has one row per entry of `names` and one column per time step.
/// It may hold more time steps than the target when future values have been
/// attached.
#[derive(Debug, Clone, PartialEq)]
pub struct ExternalFeatures {
    pub names: Vec<String>,
    pub values: Array2<f64>,
}

impl ExternalFeatures {
    /// Number of time steps covered.
    pub fn steps(&self) -> usize {
        self.values.ncols()
    }
}

/// One univariate time series: a single target column of one identifier
/// group.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesRecord {
    /// Timestamp of the first observation.
    pub start: NaiveDateTime,
    pub target: Vec<f64>,
    /// Name of the target column this series was taken from.
    pub target_name: String,
    /// Name of the source time column, used to label the output table.
    pub time_column_name: String,
    pub external_features: Option<ExternalFeatures>,
    pub identifiers: Option<Identifiers>,
}

impl SeriesRecord {
    /// Number of observed time steps.
    pub fn len(&self) -> usize {
        self.target.len()
    }

    pub fn is_empty(&self) -> bool {
        self.target.is_empty()
    }

    pub fn external_feature_names(&self) -> Option<&[String]> {
        self.external_features.as_ref().map(|f| f.names.as_slice())
    }

    /// Group key of this series; empty when it has no identifiers.
    pub fn group_key(&self) -> Vec<String> {
        self.identifiers.as_ref().map(|i| i.key()).unwrap_or_default()
    }

    /// Timestamps of the `horizon` steps following the last observation.
    pub fn forecast_index(&self, frequency: &Frequency, horizon: usize) -> Result<Vec<NaiveDateTime>> {
        let full = frequency.date_range(self.start, self.len() + horizon)?;
        Ok(full[self.len()..].to_vec())
    }
}

/// Series records built from one table, sharing one frequency.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesDataset {
    pub frequency: Frequency,
    pub records: Vec<SeriesRecord>,
}

impl SeriesDataset {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Identifier columns, taken from the first record.
    pub fn identifier_columns(&self) -> Vec<String> {
        self.records
            .first()
            .and_then(|r| r.identifiers.as_ref())
            .map(|i| i.columns())
            .unwrap_or_default()
    }

    /// Time column name, taken from the first record.
    pub fn time_column_name(&self) -> Option<&str> {
        self.records.first().map(|r| r.time_column_name.as_str())
    }

    /// Whether the series were built with external features.
    pub fn has_external_features(&self) -> bool {
        self.records
            .first()
            .map(|r| r.external_features.is_some())
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn make_record(len: usize) -> SeriesRecord {
        SeriesRecord {
            start: NaiveDate::from_ymd_opt(2020, 1, 31)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
            target: (0..len).map(|i| i as f64).collect(),
            target_name: "sales".to_string(),
            time_column_name: "date".to_string(),
            external_features: None,
            identifiers: Some(Identifiers::from_key(
                &["store".to_string(), "item".to_string()],
                &["A".to_string(), "7".to_string()],
            )),
        }
    }

    #[test]
    fn test_identifiers_accessors() {
        let record = make_record(3);
        let ids = record.identifiers.as_ref().unwrap();
        assert_eq!(ids.get("item"), Some("7"));
        assert_eq!(ids.get("missing"), None);
        assert_eq!(ids.columns(), vec!["store", "item"]);
        assert_eq!(record.group_key(), vec!["A", "7"]);
        assert_eq!(ids.to_string(), "(store=A, item=7)");
    }

    #[test]
    fn test_forecast_index_follows_last_observation() {
        let record = make_record(3);
        let freq: Frequency = "1M".parse().unwrap();
        let index = record.forecast_index(&freq, 2).unwrap();
        let expected: Vec<NaiveDateTime> = [(2020, 4, 30), (2020, 5, 31)]
            .iter()
            .map(|&(y, m, d)| NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(0, 0, 0).unwrap())
            .collect();
        assert_eq!(index, expected);
    }
}
