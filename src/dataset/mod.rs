//! Conversion of long- or wide-format tables into validated per-series
//! records.

pub mod external_features;

use ndarray::Array2;
use tracing::debug;

use crate::common::frequency::Frequency;
use crate::common::grouping::group_rows;
use crate::common::table::Table;
use crate::common::time_grid::{validate_time_grid, GridAnchor};
use crate::common::types::{ExternalFeatures, Identifiers, SeriesDataset, SeriesRecord};
use crate::error::{Result, TimeseriesError};

pub use external_features::{attach_future_features, check_external_features, check_future_schema};

/// Builds one [`SeriesRecord`] per (identifier group, target column) pair.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetBuilder {
    time_column: String,
    frequency: Frequency,
    target_columns: Vec<String>,
    identifier_columns: Vec<String>,
    feature_columns: Vec<String>,
}

impl DatasetBuilder {
    pub fn new(
        time_column: impl Into<String>,
        frequency: Frequency,
        target_columns: Vec<String>,
    ) -> Self {
        DatasetBuilder {
            time_column: time_column.into(),
            frequency,
            target_columns,
            identifier_columns: Vec::new(),
            feature_columns: Vec::new(),
        }
    }

    /// Columns identifying multiple series in a long-format table.
    pub fn with_identifiers(mut self, columns: Vec<String>) -> Self {
        self.identifier_columns = columns;
        self
    }

    /// Columns of dynamic real-valued covariates.
    pub fn with_external_features(mut self, columns: Vec<String>) -> Self {
        self.feature_columns = columns;
        self
    }

    pub fn frequency(&self) -> Frequency {
        self.frequency
    }

    /// Build the series records of `table`.
    ///
    /// Every identifier group must form a regular time grid, and all groups
    /// must share the start date and length of the first group. When
    /// `cut_length` is set, the last `cut_length` steps of each target (and
    /// of its external features) are dropped.
    pub fn build(&self, table: &Table, cut_length: Option<usize>) -> Result<SeriesDataset> {
        if self.target_columns.is_empty() {
            return Err(TimeseriesError::Config(
                "Invalid target column(s) selection".to_string(),
            ));
        }

        let timestamps = table.timestamps(&self.time_column)?;
        let targets = self
            .target_columns
            .iter()
            .map(|c| table.numbers(c))
            .collect::<Result<Vec<_>>>()?;
        let features = self
            .feature_columns
            .iter()
            .map(|c| table.numbers(c))
            .collect::<Result<Vec<_>>>()?;

        let groups = group_rows(table, &self.identifier_columns)?;
        let mut anchor: Option<GridAnchor> = None;
        let mut records = Vec::with_capacity(groups.len() * self.target_columns.len());

        for group in groups {
            let mut rows = group.rows;
            if rows.is_empty() {
                continue;
            }
            rows.sort_by_key(|&row| timestamps[row]);
            let group_times: Vec<_> = rows.iter().map(|&row| timestamps[row]).collect();

            let identifiers = if self.identifier_columns.is_empty() {
                None
            } else {
                Some(Identifiers::from_key(&self.identifier_columns, &group.key))
            };

            validate_time_grid(&group_times, &self.frequency, &self.time_column, anchor.as_ref())
                .map_err(|e| match &identifiers {
                    Some(ids) => e.for_series(ids.to_string()),
                    None => e,
                })?;
            if anchor.is_none() && identifiers.is_some() {
                anchor = Some(GridAnchor {
                    start: group_times[0],
                    periods: group_times.len(),
                });
            }

            let kept = rows.len().saturating_sub(cut_length.unwrap_or(0));
            let kept_rows = &rows[..kept];

            let external_features = if self.feature_columns.is_empty() {
                None
            } else {
                let values = Array2::from_shape_fn((features.len(), kept), |(f, t)| {
                    features[f][kept_rows[t]]
                });
                Some(ExternalFeatures {
                    names: self.feature_columns.clone(),
                    values,
                })
            };

            for (target_name, values) in self.target_columns.iter().zip(&targets) {
                records.push(SeriesRecord {
                    start: group_times[0],
                    target: kept_rows.iter().map(|&row| values[row]).collect(),
                    target_name: target_name.clone(),
                    time_column_name: self.time_column.clone(),
                    external_features: external_features.clone(),
                    identifiers: identifiers.clone(),
                });
            }
        }

        debug!(
            series = records.len(),
            frequency = %self.frequency,
            cut_length = cut_length.unwrap_or(0),
            "Built series dataset"
        );

        Ok(SeriesDataset {
            frequency: self.frequency,
            records,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::common::table::Column;
    use chrono::NaiveDateTime;

    pub(crate) fn monthly(start: &str, n: usize) -> Vec<NaiveDateTime> {
        let freq: Frequency = "1M".parse().unwrap();
        let start = crate::common::table::parse_timestamp(start).unwrap();
        freq.date_range(start, n).unwrap()
    }

    /// Long-format table: `stores` x `n` monthly rows with sales, returns
    /// and a price feature.
    pub(crate) fn make_store_table(stores: &[&str], n: usize) -> Table {
        let dates = monthly("2020-01-31", n);
        let mut store_col = Vec::new();
        let mut date_col = Vec::new();
        let mut sales = Vec::new();
        let mut returns = Vec::new();
        let mut price = Vec::new();
        for (s, store) in stores.iter().enumerate() {
            for (i, date) in dates.iter().enumerate() {
                store_col.push(store.to_string());
                date_col.push(*date);
                sales.push(100.0 * (s + 1) as f64 + i as f64);
                returns.push(i as f64 / 2.0);
                price.push(10.0 + i as f64);
            }
        }
        Table::new()
            .with_column("date", Column::Timestamp(date_col))
            .unwrap()
            .with_column("store", Column::Text(store_col))
            .unwrap()
            .with_column("sales", Column::Float(sales))
            .unwrap()
            .with_column("returns", Column::Float(returns))
            .unwrap()
            .with_column("price", Column::Float(price))
            .unwrap()
    }

    fn strings(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_single_series_without_identifiers() {
        let table = Table::new()
            .with_column("date", Column::Timestamp(monthly("2019-01-31", 24)))
            .unwrap()
            .with_column("sales", Column::Float((0..24).map(|i| i as f64).collect()))
            .unwrap();
        let builder = DatasetBuilder::new("date", "1M".parse().unwrap(), strings(&["sales"]));
        let dataset = builder.build(&table, None).unwrap();

        assert_eq!(dataset.len(), 1);
        let record = &dataset.records[0];
        assert_eq!(record.target.len(), 24);
        assert!(record.identifiers.is_none());
        assert!(record.external_features.is_none());
        assert_eq!(record.target_name, "sales");
        assert_eq!(record.time_column_name, "date");
    }

    #[test]
    fn test_one_record_per_store_and_target() {
        let table = make_store_table(&["s1", "s2"], 12);
        let builder = DatasetBuilder::new("date", "1M".parse().unwrap(), strings(&["sales", "returns"]))
            .with_identifiers(strings(&["store"]));
        let dataset = builder.build(&table, None).unwrap();

        assert_eq!(dataset.len(), 4);
        let names: Vec<(&str, &str)> = dataset
            .records
            .iter()
            .map(|r| {
                (
                    r.identifiers.as_ref().unwrap().get("store").unwrap(),
                    r.target_name.as_str(),
                )
            })
            .collect();
        assert_eq!(
            names,
            vec![("s1", "sales"), ("s1", "returns"), ("s2", "sales"), ("s2", "returns")]
        );
        for record in &dataset.records {
            assert_eq!(record.identifiers.as_ref().unwrap().len(), 1);
            assert_eq!(record.target.len(), 12);
        }
        assert_eq!(dataset.records[2].target[0], 200.0);
    }

    #[test]
    fn test_unsorted_groups_are_sorted_by_time() {
        let table = make_store_table(&["s1"], 6);
        let shuffled = table.take(&[3, 0, 5, 1, 4, 2]);
        let builder = DatasetBuilder::new("date", "1M".parse().unwrap(), strings(&["sales"]))
            .with_identifiers(strings(&["store"]));
        let dataset = builder.build(&shuffled, None).unwrap();
        assert_eq!(dataset.records[0].target, vec![100.0, 101.0, 102.0, 103.0, 104.0, 105.0]);
    }

    #[test]
    fn test_cut_length_truncates_target_and_features() {
        let table = make_store_table(&["s1", "s2"], 12);
        let builder = DatasetBuilder::new("date", "1M".parse().unwrap(), strings(&["sales"]))
            .with_identifiers(strings(&["store"]))
            .with_external_features(strings(&["price"]));
        let dataset = builder.build(&table, Some(3)).unwrap();

        let record = &dataset.records[0];
        assert_eq!(record.target.len(), 9);
        assert_eq!(*record.target.last().unwrap(), 108.0);
        let features = record.external_features.as_ref().unwrap();
        assert_eq!(features.values.dim(), (1, 9));
        assert_eq!(features.names, vec!["price"]);
        assert_eq!(features.values[[0, 8]], 18.0);
    }

    #[test]
    fn test_cut_length_of_full_series_gives_empty_target() {
        let table = make_store_table(&["s1"], 12);
        let builder = DatasetBuilder::new("date", "1M".parse().unwrap(), strings(&["sales"]))
            .with_external_features(strings(&["price"]));
        let dataset = builder.build(&table, Some(12)).unwrap();
        assert!(dataset.records[0].target.is_empty());
        assert_eq!(dataset.records[0].external_features.as_ref().unwrap().steps(), 0);
    }

    #[test]
    fn test_groups_must_share_start_and_length() {
        let full = make_store_table(&["s1", "s2"], 12);
        // Drop the first month of s2.
        let rows: Vec<usize> = (0..24).filter(|&r| r != 12).collect();
        let table = full.take(&rows);
        let builder = DatasetBuilder::new("date", "1M".parse().unwrap(), strings(&["sales"]))
            .with_identifiers(strings(&["store"]));
        let err = builder.build(&table, None).unwrap_err();
        let msg = err.to_string();
        assert!(matches!(err, TimeseriesError::TimeContinuity { .. }));
        assert!(msg.contains("(store=s2)"), "{}", msg);
        assert!(msg.contains("same date"), "{}", msg);
    }

    #[test]
    fn test_gap_in_series_is_rejected() {
        let full = make_store_table(&["s1"], 12);
        let rows: Vec<usize> = (0..12).filter(|&r| r != 5).collect();
        let builder = DatasetBuilder::new("date", "1M".parse().unwrap(), strings(&["sales"]));
        assert!(builder.build(&full.take(&rows), None).is_err());
    }

    #[test]
    fn test_empty_targets_is_a_config_error() {
        let table = make_store_table(&["s1"], 3);
        let builder = DatasetBuilder::new("date", "1M".parse().unwrap(), vec![]);
        let err = builder.build(&table, None).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Configuration);
    }

    #[test]
    fn test_multiple_identifier_columns() {
        let table = make_store_table(&["s1", "s2"], 4);
        let region: Vec<String> = (0..8).map(|i| if i < 4 { "north" } else { "south" }.to_string()).collect();
        let table = table.with_column("region", Column::Text(region)).unwrap();
        let builder = DatasetBuilder::new("date", "1M".parse().unwrap(), strings(&["sales"]))
            .with_identifiers(strings(&["region", "store"]));
        let dataset = builder.build(&table, None).unwrap();
        assert_eq!(dataset.len(), 2);
        let ids = dataset.records[1].identifiers.as_ref().unwrap();
        assert_eq!(ids.get("region"), Some("south"));
        assert_eq!(ids.get("store"), Some("s2"));
        assert_eq!(dataset.identifier_columns(), vec!["region", "store"]);
    }
}
