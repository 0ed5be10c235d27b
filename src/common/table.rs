use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};

use super::time_grid::normalize_timestamps;
use crate::error::{Result, TimeseriesError};

/// Values of a single table column.
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    /// Timezone-naive timestamps.
    Timestamp(Vec<NaiveDateTime>),
    /// Timezone-aware timestamps, normalized to local wall-clock time on read.
    TimestampTz(Vec<DateTime<FixedOffset>>),
    /// Numeric values; NaN marks a missing value.
    Float(Vec<f64>),
    Text(Vec<String>),
}

impl Column {
    pub fn len(&self) -> usize {
        match self {
            Column::Timestamp(v) => v.len(),
            Column::TimestampTz(v) => v.len(),
            Column::Float(v) => v.len(),
            Column::Text(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Text rendering of one cell. Identifier values are compared through
    /// this rendering.
    pub fn label(&self, row: usize) -> String {
        match self {
            Column::Timestamp(v) => v[row].to_string(),
            Column::TimestampTz(v) => v[row].naive_local().to_string(),
            Column::Float(v) => v[row].to_string(),
            Column::Text(v) => v[row].clone(),
        }
    }

    fn take(&self, rows: &[usize]) -> Column {
        match self {
            Column::Timestamp(v) => Column::Timestamp(rows.iter().map(|&i| v[i]).collect()),
            Column::TimestampTz(v) => Column::TimestampTz(rows.iter().map(|&i| v[i]).collect()),
            Column::Float(v) => Column::Float(rows.iter().map(|&i| v[i]).collect()),
            Column::Text(v) => Column::Text(rows.iter().map(|&i| v[i].clone()).collect()),
        }
    }
}

/// Ordered collection of named, equally long columns.
///
/// This is the input shape of the dataset builder and the future-features
/// aligner. Tables can be assembled in memory or read from DuckDB with
/// [`crate::common::table_reader::read_table`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<(String, Column)>,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`Table::push_column`].
    pub fn with_column(mut self, name: impl Into<String>, column: Column) -> Result<Self> {
        self.push_column(name, column)?;
        Ok(self)
    }

    /// Append a column. Fails if a column of that name exists or if its
    /// length differs from the existing columns.
    pub fn push_column(&mut self, name: impl Into<String>, column: Column) -> Result<()> {
        let name = name.into();
        if self.columns.iter().any(|(n, _)| *n == name) {
            return Err(TimeseriesError::InvalidColumn {
                column: name,
                reason: "is defined twice".to_string(),
            });
        }
        if let Some((_, first)) = self.columns.first() {
            if first.len() != column.len() {
                return Err(TimeseriesError::Shape {
                    expected: format!("{} rows", first.len()),
                    actual: format!("{} rows in column {}", column.len(), name),
                });
            }
        }
        self.columns.push((name, column));
        Ok(())
    }

    pub fn num_rows(&self) -> usize {
        self.columns.first().map(|(_, c)| c.len()).unwrap_or(0)
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|(n, _)| n.as_str()).collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|(n, _)| n == name)
    }

    pub fn column(&self, name: &str) -> Result<&Column> {
        self.columns
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, c)| c)
            .ok_or_else(|| TimeseriesError::ColumnNotFound(name.to_string()))
    }

    /// Timestamps of a time column, normalized to naive wall-clock time.
    /// Text columns are parsed.
    pub fn timestamps(&self, name: &str) -> Result<Vec<NaiveDateTime>> {
        match self.column(name)? {
            Column::Timestamp(v) => Ok(v.clone()),
            Column::TimestampTz(v) => Ok(normalize_timestamps(v)),
            Column::Text(v) => v
                .iter()
                .map(|s| {
                    parse_timestamp(s).ok_or_else(|| TimeseriesError::InvalidTimestamp {
                        column: name.to_string(),
                        value: s.clone(),
                    })
                })
                .collect(),
            Column::Float(_) => Err(TimeseriesError::InvalidColumn {
                column: name.to_string(),
                reason: "must contain timestamps".to_string(),
            }),
        }
    }

    /// Values of a numeric column.
    pub fn numbers(&self, name: &str) -> Result<&[f64]> {
        match self.column(name)? {
            Column::Float(v) => Ok(v),
            _ => Err(TimeseriesError::InvalidColumn {
                column: name.to_string(),
                reason: "must be numeric".to_string(),
            }),
        }
    }

    /// Text rendering of every cell of a column.
    pub fn labels(&self, name: &str) -> Result<Vec<String>> {
        let column = self.column(name)?;
        Ok((0..column.len()).map(|row| column.label(row)).collect())
    }

    /// New table holding only `rows`, in the given order.
    pub fn take(&self, rows: &[usize]) -> Table {
        Table {
            columns: self
                .columns
                .iter()
                .map(|(n, c)| (n.clone(), c.take(rows)))
                .collect(),
        }
    }
}

/// Parse a timestamp cell. Offsets are dropped after conversion to local
/// wall-clock time, like [`normalize_timestamps`].
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.naive_local());
    }
    if let Ok(dt) = DateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%:z") {
        return Some(dt.naive_local());
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(ts) = NaiveDateTime::parse_from_str(value, format) {
            return Some(ts);
        }
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_timestamp_formats() {
        let expected = NaiveDate::from_ymd_opt(2021, 3, 31)
            .unwrap()
            .and_hms_opt(12, 30, 0)
            .unwrap();
        assert_eq!(parse_timestamp("2021-03-31 12:30:00"), Some(expected));
        assert_eq!(parse_timestamp("2021-03-31T12:30:00"), Some(expected));
        assert_eq!(parse_timestamp("2021-03-31T12:30:00+02:00"), Some(expected));
        assert_eq!(parse_timestamp("2021-03-31 12:30:00+05:00"), Some(expected));
        assert_eq!(
            parse_timestamp("2021-03-31"),
            NaiveDate::from_ymd_opt(2021, 3, 31).unwrap().and_hms_opt(0, 0, 0)
        );
        assert_eq!(parse_timestamp("yesterday"), None);
    }

    #[test]
    fn test_push_column_checks_length() {
        let table = Table::new()
            .with_column("a", Column::Float(vec![1.0, 2.0]))
            .unwrap();
        let err = table
            .clone()
            .with_column("b", Column::Float(vec![1.0]))
            .unwrap_err();
        assert!(matches!(err, TimeseriesError::Shape { .. }));
        let err = table
            .with_column("a", Column::Float(vec![3.0, 4.0]))
            .unwrap_err();
        assert!(matches!(err, TimeseriesError::InvalidColumn { .. }));
    }

    #[test]
    fn test_timestamps_from_text_column() {
        let table = Table::new()
            .with_column(
                "date",
                Column::Text(vec!["2021-01-01".to_string(), "bad".to_string()]),
            )
            .unwrap();
        let err = table.timestamps("date").unwrap_err();
        assert_eq!(err.to_string(), "Invalid timestamp 'bad' in column date");
    }

    #[test]
    fn test_take_and_labels() {
        let table = Table::new()
            .with_column(
                "store",
                Column::Text(vec!["a".to_string(), "b".to_string(), "c".to_string()]),
            )
            .unwrap()
            .with_column("id", Column::Float(vec![1.0, 2.0, 3.5]))
            .unwrap();
        let subset = table.take(&[2, 0]);
        assert_eq!(subset.num_rows(), 2);
        assert_eq!(subset.labels("store").unwrap(), vec!["c", "a"]);
        assert_eq!(subset.labels("id").unwrap(), vec!["3.5", "1"]);
        assert!(table.numbers("store").is_err());
        assert!(matches!(
            table.column("missing"),
            Err(TimeseriesError::ColumnNotFound(_))
        ));
    }
}
