use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDateTime;

/// Where a row of the forecast table comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RowOrigin {
    /// Observed values only.
    History,
    /// Forecasts only.
    Forecast,
    /// Forecasts with history available at the same timestamp.
    Both,
}

impl RowOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            RowOrigin::History => "history",
            RowOrigin::Forecast => "forecast",
            RowOrigin::Both => "both",
        }
    }
}

impl fmt::Display for RowOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Named numeric series of one identifier group, aligned on timestamps.
#[derive(Debug, Clone, Default)]
pub(crate) struct TimeFrame {
    names: Vec<String>,
    rows: BTreeMap<NaiveDateTime, Vec<f64>>,
}

impl TimeFrame {
    /// Add `values` indexed by `index` as column `name`, replacing any
    /// column of that name. Timestamps missing on either side get NaN.
    pub(crate) fn insert(&mut self, name: &str, index: &[NaiveDateTime], values: &[f64]) {
        let position = match self.names.iter().position(|n| n == name) {
            Some(position) => {
                for row in self.rows.values_mut() {
                    row[position] = f64::NAN;
                }
                position
            }
            None => {
                self.names.push(name.to_string());
                for row in self.rows.values_mut() {
                    row.push(f64::NAN);
                }
                self.names.len() - 1
            }
        };
        let width = self.names.len();
        for (ts, value) in index.iter().zip(values) {
            let row = self.rows.entry(*ts).or_insert_with(|| vec![f64::NAN; width]);
            row[position] = *value;
        }
    }

    pub(crate) fn names(&self) -> &[String] {
        &self.names
    }

    pub(crate) fn contains(&self, ts: &NaiveDateTime) -> bool {
        self.rows.contains_key(ts)
    }

    pub(crate) fn timestamps(&self) -> impl Iterator<Item = &NaiveDateTime> {
        self.rows.keys()
    }

    /// Value of column `name` at `ts`, NaN when absent.
    pub(crate) fn value(&self, ts: &NaiveDateTime, name: &str) -> f64 {
        match (self.names.iter().position(|n| n == name), self.rows.get(ts)) {
            (Some(position), Some(row)) => row[position],
            _ => f64::NAN,
        }
    }
}

/// Wide forecast table: time column, identifier columns, value columns,
/// then text label columns.
///
/// Rows are sorted by identifier values ascending, then by timestamp
/// descending.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastTable {
    pub(crate) time_column: String,
    pub(crate) timestamps: Vec<NaiveDateTime>,
    pub(crate) identifier_columns: Vec<(String, Vec<String>)>,
    pub(crate) value_columns: Vec<(String, Vec<f64>)>,
    pub(crate) row_origin: Vec<RowOrigin>,
    pub(crate) label_columns: Vec<(String, Vec<String>)>,
}

/// Name of the row origin column.
pub const ROW_ORIGIN_COLUMN: &str = "row_origin";

impl ForecastTable {
    pub fn num_rows(&self) -> usize {
        self.timestamps.len()
    }

    pub fn time_column(&self) -> &str {
        &self.time_column
    }

    /// Every column name in output order.
    pub fn column_names(&self) -> Vec<&str> {
        let mut names = vec![self.time_column.as_str()];
        names.extend(self.identifier_columns.iter().map(|(n, _)| n.as_str()));
        names.extend(self.value_columns.iter().map(|(n, _)| n.as_str()));
        names.push(ROW_ORIGIN_COLUMN);
        names.extend(self.label_columns.iter().map(|(n, _)| n.as_str()));
        names
    }

    pub fn timestamps(&self) -> &[NaiveDateTime] {
        &self.timestamps
    }

    pub fn identifier_values(&self, column: &str) -> Option<&[String]> {
        self.identifier_columns
            .iter()
            .find(|(n, _)| n == column)
            .map(|(_, v)| v.as_slice())
    }

    /// Numeric column (history, feature or forecast values).
    pub fn value_column(&self, column: &str) -> Option<&[f64]> {
        self.value_columns
            .iter()
            .find(|(n, _)| n == column)
            .map(|(_, v)| v.as_slice())
    }

    pub fn value_column_names(&self) -> Vec<&str> {
        self.value_columns.iter().map(|(n, _)| n.as_str()).collect()
    }

    pub fn row_origin(&self) -> &[RowOrigin] {
        &self.row_origin
    }

    /// Constant text column such as `session` or `model`.
    pub fn label_column(&self, column: &str) -> Option<&[String]> {
        self.label_columns
            .iter()
            .find(|(n, _)| n == column)
            .map(|(_, v)| v.as_slice())
    }

    pub(crate) fn identifier_columns(&self) -> &[(String, Vec<String>)] {
        &self.identifier_columns
    }

    pub(crate) fn value_columns(&self) -> &[(String, Vec<f64>)] {
        &self.value_columns
    }

    pub(crate) fn label_columns(&self) -> &[(String, Vec<String>)] {
        &self.label_columns
    }
}
