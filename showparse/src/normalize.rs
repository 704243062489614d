//! Conversion of parsed rows into flat records.

use indexmap::IndexMap;
use log::warn;

use crate::engine::{FieldValue, ParsedTable};

/// One output record: lower-cased field name to captured value, in
/// template column order.
pub type Record = IndexMap<String, FieldValue>;

/// Zip lower-cased headers with each row positionally.
///
/// Never fails; a short row simply yields fewer fields.
pub fn normalize(rows: &[Vec<FieldValue>], headers: &[String]) -> Vec<Record> {
    let headers: Vec<String> = headers.iter().map(|h| h.to_lowercase()).collect();
    rows.iter()
        .map(|row| {
            headers
                .iter()
                .cloned()
                .zip(row.iter().cloned())
                .collect::<Record>()
        })
        .collect()
}

/// Normalize a whole table.
pub fn normalize_table(table: &ParsedTable) -> Vec<Record> {
    normalize(&table.rows, &table.header)
}

/// Add the columns of `other` that `base` lacks.
///
/// With `keys`, each base row takes its new columns from the first row of
/// `other` whose key values are equal; base rows without a partner keep
/// empty cells. Without keys, rows are joined by position.
pub fn merge_tables(base: &mut ParsedTable, other: &ParsedTable, keys: &[String]) {
    let new_columns: Vec<usize> = other
        .header
        .iter()
        .enumerate()
        .filter(|(_, name)| !base.header.contains(name))
        .map(|(i, _)| i)
        .collect();
    if new_columns.is_empty() {
        return;
    }

    for &i in &new_columns {
        base.header.push(other.header[i].clone());
    }
    for row in &mut base.rows {
        row.resize(row.len() + new_columns.len(), FieldValue::default());
    }
    let offset = base.header.len() - new_columns.len();

    if keys.is_empty() {
        for (row, source) in base.rows.iter_mut().zip(&other.rows) {
            for (j, &i) in new_columns.iter().enumerate() {
                row[offset + j] = source[i].clone();
            }
        }
        return;
    }

    let positions: Option<Vec<(usize, usize)>> = keys
        .iter()
        .map(|k| Some((base.column(k)?, other.column(k)?)))
        .collect();
    let Some(positions) = positions else {
        warn!("merge keys {keys:?} missing from one of the tables, columns left empty");
        return;
    };

    for row in &mut base.rows {
        let partner = other
            .rows
            .iter()
            .find(|source| positions.iter().all(|&(b, o)| row[b] == source[o]));
        if let Some(source) = partner {
            for (j, &i) in new_columns.iter().enumerate() {
                row[offset + j] = source[i].clone();
            }
        }
    }
}
