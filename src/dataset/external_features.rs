//! Alignment of future external feature values with training series.

use std::collections::BTreeSet;

use ndarray::{concatenate, Array2, Axis};
use tracing::debug;

use crate::common::frequency::Frequency;
use crate::common::grouping::matching_rows;
use crate::common::table::Table;
use crate::common::time_grid::validate_time_grid;
use crate::common::types::{ExternalFeatures, SeriesDataset, SeriesRecord};
use crate::error::{Result, TimeseriesError};

/// Append `prediction_length` future feature steps to every record.
///
/// Records carrying identifiers take the rows of `future` whose identifier
/// columns match; records without identifiers take the whole table. Each
/// slice must form a regular grid of exactly `prediction_length` steps.
/// The input records are left untouched; records without external
/// features are returned as they are.
pub fn attach_future_features(
    records: &[SeriesRecord],
    future: &Table,
    prediction_length: usize,
    frequency: &Frequency,
) -> Result<Vec<SeriesRecord>> {
    records
        .iter()
        .map(|record| attach_to_record(record, future, prediction_length, frequency))
        .collect()
}

fn attach_to_record(
    record: &SeriesRecord,
    future: &Table,
    prediction_length: usize,
    frequency: &Frequency,
) -> Result<SeriesRecord> {
    let Some(features) = &record.external_features else {
        return Ok(record.clone());
    };

    let mut rows = match &record.identifiers {
        Some(ids) => matching_rows(future, &ids.columns(), &ids.key())?,
        None => (0..future.num_rows()).collect(),
    };
    let timestamps = future.timestamps(&record.time_column_name)?;
    rows.sort_by_key(|&row| timestamps[row]);
    let slice_times: Vec<_> = rows.iter().map(|&row| timestamps[row]).collect();

    validate_time_grid(&slice_times, frequency, &record.time_column_name, None).map_err(|e| {
        match &record.identifiers {
            Some(ids) => e.for_series(ids.to_string()),
            None => e,
        }
    })?;
    if rows.len() != prediction_length {
        return Err(TimeseriesError::HorizonMismatch {
            expected: prediction_length,
            actual: rows.len(),
        });
    }

    let columns = features
        .names
        .iter()
        .map(|name| future.numbers(name))
        .collect::<Result<Vec<_>>>()?;
    let future_values = Array2::from_shape_fn((columns.len(), rows.len()), |(f, t)| {
        columns[f][rows[t]]
    });
    let values = concatenate(Axis(1), &[features.values.view(), future_values.view()])?;

    Ok(SeriesRecord {
        external_features: Some(ExternalFeatures {
            names: features.names.clone(),
            values,
        }),
        ..record.clone()
    })
}

impl SeriesDataset {
    /// Copy of this dataset with future feature values attached to every
    /// record. See [`attach_future_features`].
    pub fn with_future_features(&self, future: &Table, prediction_length: usize) -> Result<SeriesDataset> {
        let records = attach_future_features(&self.records, future, prediction_length, &self.frequency)?;
        debug!(
            series = records.len(),
            prediction_length,
            "Attached future external features"
        );
        Ok(SeriesDataset {
            frequency: self.frequency,
            records,
        })
    }
}

/// Check that future feature values are supplied exactly when the series
/// were built with external features. Returns whether they are used.
pub fn check_external_features(dataset: &SeriesDataset, future: Option<&Table>) -> Result<bool> {
    match (dataset.has_external_features(), future.is_some()) {
        (true, false) => Err(TimeseriesError::MissingExternalFeatures),
        (false, true) => Err(TimeseriesError::UnexpectedExternalFeatures),
        (used, _) => Ok(used),
    }
}

/// Check that the future-features table holds exactly the time column, the
/// training feature columns and the identifier columns of `record`.
pub fn check_future_schema(record: &SeriesRecord, future: &Table) -> Result<()> {
    let mut expected = vec![record.time_column_name.clone()];
    if let Some(names) = record.external_feature_names() {
        expected.extend(names.iter().cloned());
    }
    if let Some(ids) = &record.identifiers {
        expected.extend(ids.columns());
    }

    let expected_set: BTreeSet<&str> = expected.iter().map(String::as_str).collect();
    let actual_set: BTreeSet<&str> = future.column_names().into_iter().collect();
    if expected_set != actual_set {
        return Err(TimeseriesError::Schema { expected });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::table::Column;
    use crate::dataset::tests::{make_store_table, monthly};
    use crate::dataset::DatasetBuilder;

    fn make_dataset() -> SeriesDataset {
        DatasetBuilder::new("date", "1M".parse().unwrap(), vec!["sales".to_string()])
            .with_identifiers(vec!["store".to_string()])
            .with_external_features(vec!["price".to_string()])
            .build(&make_store_table(&["s1", "s2"], 12), None)
            .unwrap()
    }

    /// Future prices for `stores`, three months after the training window.
    fn make_future(stores: &[&str]) -> Table {
        let dates = monthly("2021-01-31", 3);
        let mut store_col = Vec::new();
        let mut date_col = Vec::new();
        let mut price = Vec::new();
        for (s, store) in stores.iter().enumerate() {
            for (i, date) in dates.iter().enumerate() {
                store_col.push(store.to_string());
                date_col.push(*date);
                price.push(100.0 * (s + 1) as f64 + i as f64);
            }
        }
        Table::new()
            .with_column("date", Column::Timestamp(date_col))
            .unwrap()
            .with_column("store", Column::Text(store_col))
            .unwrap()
            .with_column("price", Column::Float(price))
            .unwrap()
    }

    #[test]
    fn test_attach_extends_features_per_store() {
        let dataset = make_dataset();
        let extended = dataset.with_future_features(&make_future(&["s1", "s2"]), 3).unwrap();

        for (before, after) in dataset.records.iter().zip(&extended.records) {
            let after_features = after.external_features.as_ref().unwrap();
            assert_eq!(after_features.values.dim(), (1, 15));
            assert_eq!(after_features.names, vec!["price"]);
            assert_eq!(after.target, before.target);
        }
        let s2 = extended.records[1].external_features.as_ref().unwrap();
        assert_eq!(s2.values[[0, 11]], 21.0);
        assert_eq!(s2.values[[0, 12]], 200.0);
        assert_eq!(s2.values[[0, 14]], 202.0);
        // Source records are unchanged.
        assert_eq!(dataset.records[0].external_features.as_ref().unwrap().steps(), 12);
    }

    #[test]
    fn test_attach_is_idempotent_on_copies() {
        let dataset = make_dataset();
        let future = make_future(&["s1", "s2"]);
        let first = attach_future_features(&dataset.records, &future, 3, &dataset.frequency).unwrap();
        let second = attach_future_features(&dataset.records, &future, 3, &dataset.frequency).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_missing_group_is_a_horizon_mismatch() {
        let dataset = make_dataset();
        let err = dataset.with_future_features(&make_future(&["s1"]), 3).unwrap_err();
        assert!(matches!(
            err,
            TimeseriesError::HorizonMismatch {
                expected: 3,
                actual: 0
            }
        ));
        assert!(err.to_string().starts_with("Please provide 3 future values"));
    }

    #[test]
    fn test_irregular_future_slice_is_rejected() {
        let dataset = make_dataset();
        let future = make_future(&["s1", "s2"]).take(&[0, 2, 3, 4, 5]);
        let err = dataset.with_future_features(&future, 2).unwrap_err();
        assert!(err.to_string().contains("for time series (store=s1)"), "{}", err);
    }

    #[test]
    fn test_check_external_features_both_directions() {
        let with = make_dataset();
        let without = DatasetBuilder::new("date", "1M".parse().unwrap(), vec!["sales".to_string()])
            .build(&make_store_table(&["s1"], 12), None)
            .unwrap();
        let future = make_future(&["s1"]);

        assert!(check_external_features(&with, Some(&future)).unwrap());
        assert!(!check_external_features(&without, None).unwrap());
        assert!(matches!(
            check_external_features(&with, None),
            Err(TimeseriesError::MissingExternalFeatures)
        ));
        assert!(matches!(
            check_external_features(&without, Some(&future)),
            Err(TimeseriesError::UnexpectedExternalFeatures)
        ));
    }

    #[test]
    fn test_future_schema_must_match_exactly() {
        let dataset = make_dataset();
        let record = &dataset.records[0];
        let future = make_future(&["s1"]);
        assert!(check_future_schema(record, &future).is_ok());

        let extra = future
            .clone()
            .with_column("weather", Column::Float(vec![0.0; 3]))
            .unwrap();
        let err = check_future_schema(record, &extra).unwrap_err();
        assert_eq!(
            err.to_string(),
            "The dataset of future values of external features must contain exactly the following columns: date, price, store"
        );

        let missing = future.take(&[0, 1, 2]);
        let missing = Table::new()
            .with_column("date", missing.column("date").unwrap().clone())
            .unwrap();
        assert!(check_future_schema(record, &missing).is_err());
    }
}
