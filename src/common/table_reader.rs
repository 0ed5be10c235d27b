use chrono::NaiveDateTime;
use duckdb::Connection;
use tracing::debug;

use super::params::DatasetParams;
use super::table::{Column, Table};
use crate::error::Result;

/// Read the columns needed to build series from a DuckDB table.
///
/// Executes a query like:
/// `SELECT CAST("ds" AS TIMESTAMP), CAST("store" AS VARCHAR), CAST("sales" AS DOUBLE) FROM "t" ORDER BY "store", "ds"`
///
/// Rows with a NULL timestamp or identifier are skipped. NULL values are
/// read as NaN.
pub fn read_table(
    conn: &Connection,
    table_name: &str,
    time_column: &str,
    identifier_columns: &[String],
    value_columns: &[String],
) -> Result<Table> {
    let mut select = vec![format!("CAST(\"{}\" AS TIMESTAMP)", escape_identifier(time_column))];
    select.extend(
        identifier_columns
            .iter()
            .map(|c| format!("CAST(\"{}\" AS VARCHAR)", escape_identifier(c))),
    );
    select.extend(
        value_columns
            .iter()
            .map(|c| format!("CAST(\"{}\" AS DOUBLE)", escape_identifier(c))),
    );
    let mut order: Vec<String> = identifier_columns
        .iter()
        .map(|c| format!("\"{}\"", escape_identifier(c)))
        .collect();
    order.push(format!("\"{}\"", escape_identifier(time_column)));

    let sql = format!(
        "SELECT {} FROM \"{}\" ORDER BY {}",
        select.join(", "),
        escape_identifier(table_name),
        order.join(", "),
    );

    let mut timestamps: Vec<NaiveDateTime> = Vec::new();
    let mut identifiers: Vec<Vec<String>> = vec![Vec::new(); identifier_columns.len()];
    let mut values: Vec<Vec<f64>> = vec![Vec::new(); value_columns.len()];
    let mut skipped = 0usize;

    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([])?;
    'rows: while let Some(row) = rows.next()? {
        let ts: Option<NaiveDateTime> = row.get(0)?;
        let Some(ts) = ts else {
            skipped += 1;
            continue;
        };
        let mut key = Vec::with_capacity(identifier_columns.len());
        for g in 0..identifier_columns.len() {
            let value: Option<String> = row.get(1 + g)?;
            match value {
                Some(v) => key.push(v),
                None => {
                    skipped += 1;
                    continue 'rows;
                }
            }
        }

        timestamps.push(ts);
        for (column, value) in identifiers.iter_mut().zip(key) {
            column.push(value);
        }
        let offset = 1 + identifier_columns.len();
        for (v, column) in values.iter_mut().enumerate() {
            let value: Option<f64> = row.get(offset + v)?;
            column.push(value.unwrap_or(f64::NAN));
        }
    }

    debug!(
        table = table_name,
        rows = timestamps.len(),
        skipped,
        "Read input table"
    );

    let mut table = Table::new().with_column(time_column, Column::Timestamp(timestamps))?;
    for (name, column) in identifier_columns.iter().zip(identifiers) {
        table.push_column(name.clone(), Column::Text(column))?;
    }
    for (name, column) in value_columns.iter().zip(values) {
        table.push_column(name.clone(), Column::Float(column))?;
    }
    Ok(table)
}

/// Read every column a [`DatasetParams`] selection needs.
pub fn read_training_table(conn: &Connection, table_name: &str, params: &DatasetParams) -> Result<Table> {
    let mut value_columns = params.target_columns.clone();
    value_columns.extend(params.external_feature_columns.iter().cloned());
    read_table(
        conn,
        table_name,
        &params.time_column,
        &params.timeseries_identifiers,
        &value_columns,
    )
}

/// Escape a SQL identifier by doubling any internal double quotes.
pub(crate) fn escape_identifier(name: &str) -> String {
    name.replace('"', "\"\"")
}
