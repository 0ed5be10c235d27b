use duckdb::types::{TimeUnit, Value};
use duckdb::{appender_params_from_iter, Connection};
use tracing::debug;

use super::output::ROW_ORIGIN_COLUMN;
use super::Reconstruction;
use crate::common::table_reader::escape_identifier;
use crate::error::Result;

/// Write a reconstructed forecast table to DuckDB, replacing any table of
/// the same name. Returns the number of rows written.
///
/// Timestamps are stored as TIMESTAMP, identifiers and labels as VARCHAR
/// and values as DOUBLE, with NaN stored as NULL. Column descriptions are
/// attached as column comments.
pub fn write_forecast_table(conn: &Connection, table_name: &str, reconstruction: &Reconstruction) -> Result<usize> {
    let table = &reconstruction.table;
    let quoted_table = format!("\"{}\"", escape_identifier(table_name));

    let mut definitions = vec![format!("\"{}\" TIMESTAMP", escape_identifier(table.time_column()))];
    definitions.extend(
        table
            .identifier_columns()
            .iter()
            .map(|(name, _)| format!("\"{}\" VARCHAR", escape_identifier(name))),
    );
    definitions.extend(
        table
            .value_columns()
            .iter()
            .map(|(name, _)| format!("\"{}\" DOUBLE", escape_identifier(name))),
    );
    definitions.push(format!("\"{}\" VARCHAR", ROW_ORIGIN_COLUMN));
    definitions.extend(
        table
            .label_columns()
            .iter()
            .map(|(name, _)| format!("\"{}\" VARCHAR", escape_identifier(name))),
    );
    conn.execute_batch(&format!(
        "CREATE OR REPLACE TABLE {} ({})",
        quoted_table,
        definitions.join(", ")
    ))?;

    {
        let mut appender = conn.appender(table_name)?;
        for row in 0..table.num_rows() {
            let mut values = Vec::with_capacity(definitions.len());
            values.push(Value::Timestamp(
                TimeUnit::Microsecond,
                table.timestamps()[row].and_utc().timestamp_micros(),
            ));
            for (_, column) in table.identifier_columns() {
                values.push(Value::Text(column[row].clone()));
            }
            for (_, column) in table.value_columns() {
                let value = column[row];
                values.push(if value.is_nan() { Value::Null } else { Value::Double(value) });
            }
            values.push(Value::Text(table.row_origin()[row].as_str().to_string()));
            for (_, column) in table.label_columns() {
                values.push(Value::Text(column[row].clone()));
            }
            appender.append_row(appender_params_from_iter(values))?;
        }
        appender.flush()?;
    }

    for (column, description) in &reconstruction.descriptions {
        conn.execute_batch(&format!(
            "COMMENT ON COLUMN {}.\"{}\" IS '{}'",
            quoted_table,
            escape_identifier(column),
            description.replace('\'', "''")
        ))?;
    }

    debug!(
        table = table_name,
        rows = table.num_rows(),
        columns = definitions.len(),
        "Wrote forecast table"
    );
    Ok(table.num_rows())
}
