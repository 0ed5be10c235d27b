use std::collections::BTreeMap;

use super::table::Table;
use crate::error::Result;

/// Rows of a table sharing one combination of identifier values.
///
/// For example, with identifier columns `["region", "product"]` one group
/// might have `key = ["US", "Widget"]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowGroup {
    /// The values for each identifier column, e.g. ["US", "Widget"].
    pub key: Vec<String>,
    /// Row positions in the source table, in table order.
    pub rows: Vec<usize>,
}

/// Split the rows of `table` by the unique combinations of
/// `identifier_columns`.
///
/// Groups come back in ascending key order. Without identifier columns the
/// whole table is a single group with an empty key.
pub fn group_rows(table: &Table, identifier_columns: &[String]) -> Result<Vec<RowGroup>> {
    if identifier_columns.is_empty() {
        return Ok(vec![RowGroup {
            key: vec![],
            rows: (0..table.num_rows()).collect(),
        }]);
    }

    let labels = identifier_columns
        .iter()
        .map(|c| table.labels(c))
        .collect::<Result<Vec<_>>>()?;

    // BTreeMap keyed by Vec<String> for deterministic group ordering.
    let mut groups: BTreeMap<Vec<String>, Vec<usize>> = BTreeMap::new();
    for row in 0..table.num_rows() {
        let key: Vec<String> = labels.iter().map(|col| col[row].clone()).collect();
        groups.entry(key).or_default().push(row);
    }

    Ok(groups
        .into_iter()
        .map(|(key, rows)| RowGroup { key, rows })
        .collect())
}

/// Positions of the rows whose identifier columns equal every value of
/// `key`.
pub fn matching_rows(table: &Table, identifier_columns: &[String], key: &[String]) -> Result<Vec<usize>> {
    let labels = identifier_columns
        .iter()
        .map(|c| table.labels(c))
        .collect::<Result<Vec<_>>>()?;
    Ok((0..table.num_rows())
        .filter(|&row| labels.iter().zip(key).all(|(col, value)| col[row] == *value))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::table::Column;

    fn make_table() -> Table {
        let text = |v: &[&str]| Column::Text(v.iter().map(|s| s.to_string()).collect());
        Table::new()
            .with_column("region", text(&["US", "EU", "US", "EU", "US"]))
            .unwrap()
            .with_column("product", text(&["b", "a", "a", "a", "b"]))
            .unwrap()
            .with_column("value", Column::Float(vec![1.0, 2.0, 3.0, 4.0, 5.0]))
            .unwrap()
    }

    #[test]
    fn test_group_rows_by_composite_key() {
        let table = make_table();
        let groups = group_rows(&table, &["region".to_string(), "product".to_string()]).unwrap();
        let keys: Vec<Vec<String>> = groups.iter().map(|g| g.key.clone()).collect();
        assert_eq!(
            keys,
            vec![
                vec!["EU".to_string(), "a".to_string()],
                vec!["US".to_string(), "a".to_string()],
                vec!["US".to_string(), "b".to_string()],
            ]
        );
        assert_eq!(groups[0].rows, vec![1, 3]);
        assert_eq!(groups[2].rows, vec![0, 4]);
    }

    #[test]
    fn test_group_rows_without_identifiers() {
        let table = make_table();
        let groups = group_rows(&table, &[]).unwrap();
        assert_eq!(groups.len(), 1);
        assert!(groups[0].key.is_empty());
        assert_eq!(groups[0].rows.len(), 5);
    }

    #[test]
    fn test_matching_rows() {
        let table = make_table();
        let cols = ["region".to_string(), "product".to_string()];
        let rows = matching_rows(&table, &cols, &["US".to_string(), "b".to_string()]).unwrap();
        assert_eq!(rows, vec![0, 4]);
        let rows = matching_rows(&table, &cols, &["FR".to_string(), "b".to_string()]).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn test_unknown_identifier_column() {
        let table = make_table();
        assert!(group_rows(&table, &["store".to_string()]).is_err());
    }
}
